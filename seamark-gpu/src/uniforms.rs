/*!
# Per-Frame Uniform Provider

Computes the uniform set for a render pass from the current [`FrameState`]:
the camera eye position in split-float form, the screen-space projection
transform, and the selected-feature identifier. Uniform rules are an
ordered list resolved at setup; the per-frame path iterates it directly,
no name lookup.

Values are recomputed every frame: view state changes continuously during
interaction, so nothing here is cached.
*/

use crate::error::RenderResult;
use crate::selection::SelectionRegister;
use crate::FrameState;
use seamark_core::{encode_id, split};

/// Uniform names shared with the shader programs.
pub const U_EYE_POS: &str = "u_eyepos";
pub const U_EYE_POS_LOW: &str = "u_eyeposlow";
pub const U_PROJ_TRANSFORM: &str = "u_projTransform";
pub const U_SELECTED_ID: &str = "u_selectedId";

/// Value produced by a uniform rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    /// 2×3 affine transform as three column vectors (`mat3x2` on the GPU)
    Mat2x3([f32; 6]),
}

type UniformFn = dyn Fn(&FrameState) -> RenderResult<UniformValue> + Send + Sync;

/// A named, pure per-frame uniform computation.
pub struct UniformRule {
    name: String,
    eval: Box<UniformFn>,
}

impl UniformRule {
    pub fn new<S, F>(name: S, eval: F) -> Self
    where
        S: Into<String>,
        F: Fn(&FrameState) -> RenderResult<UniformValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            eval: Box::new(eval),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, frame: &FrameState) -> RenderResult<UniformValue> {
        (self.eval)(frame)
    }
}

impl std::fmt::Debug for UniformRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformRule").field("name", &self.name).finish()
    }
}

/// Evaluate the uniform set for one frame. Fails fast on malformed view
/// state rather than letting NaN transforms through silently.
pub fn evaluate_uniforms<'a>(
    frame: &FrameState,
    rules: &'a [UniformRule],
) -> RenderResult<Vec<(&'a str, UniformValue)>> {
    frame.validate()?;
    rules
        .iter()
        .map(|rule| Ok((rule.name(), rule.evaluate(frame)?)))
        .collect()
}

/// High words of the split camera eye position, `(center.x, center.y)`.
pub fn eye_position_rule() -> UniformRule {
    UniformRule::new(U_EYE_POS, |frame: &FrameState| {
        let x = split(frame.center[0])?;
        let y = split(frame.center[1])?;
        Ok(UniformValue::Vec2([x.high, y.high]))
    })
}

/// Low words of the split camera eye position. Shaders compute
/// `(position - eye_high) - eye_low` to recover precision lost to `f32`.
pub fn eye_position_low_rule() -> UniformRule {
    UniformRule::new(U_EYE_POS_LOW, |frame: &FrameState| {
        let x = split(frame.center[0])?;
        let y = split(frame.center[1])?;
        Ok(UniformValue::Vec2([x.low, y.low]))
    })
}

/// World-to-NDC transform carrying scale and rotation only. Translation is
/// deliberately zero: it happens in the eye-relative vertex arithmetic, so
/// baking `-center` in here would apply it twice.
pub fn projection_rule() -> UniformRule {
    UniformRule::new(U_PROJ_TRANSFORM, |frame: &FrameState| {
        let sx = 2.0 / (frame.resolution * frame.size[0] as f64);
        let sy = 2.0 / (frame.resolution * frame.size[1] as f64);
        let (sin, cos) = (-frame.rotation).sin_cos();
        Ok(UniformValue::Mat2x3([
            (sx * cos) as f32,
            (sy * sin) as f32,
            (-sx * sin) as f32,
            (sy * cos) as f32,
            0.0,
            0.0,
        ]))
    })
}

/// Currently selected feature identifier, bit-reinterpreted to `f32` the
/// same way the hit pass encodes the `id` attribute, so the visible-pass
/// shader can compare the two patterns directly.
pub fn selected_id_rule(selection: SelectionRegister) -> UniformRule {
    UniformRule::new(U_SELECTED_ID, move |_frame: &FrameState| {
        Ok(UniformValue::Float(encode_id(selection.get())))
    })
}

/// The full standard uniform set for the visible pass.
pub fn standard_uniforms(selection: SelectionRegister) -> Vec<UniformRule> {
    vec![
        eye_position_rule(),
        eye_position_low_rule(),
        projection_rule(),
        selected_id_rule(selection),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use seamark_core::decode_id;
    use std::f64::consts::FRAC_PI_2;

    fn mat(value: &UniformValue) -> [f32; 6] {
        match value {
            UniformValue::Mat2x3(m) => *m,
            other => panic!("expected Mat2x3, got {other:?}"),
        }
    }

    #[test]
    fn test_projection_axis_aligned() {
        let frame = FrameState::new([0.0, 0.0], 1.0, 0.0, [100, 100]);
        let m = mat(&projection_rule().evaluate(&frame).unwrap());
        assert_eq!(m, [0.02, 0.0, 0.0, 0.02, 0.0, 0.0]);
    }

    #[test]
    fn test_projection_quarter_turn() {
        // rotation = pi/2 means theta = -pi/2, cos = 0, sin = -1
        let frame = FrameState::new([0.0, 0.0], 1.0, FRAC_PI_2, [100, 100]);
        let m = mat(&projection_rule().evaluate(&frame).unwrap());
        assert!(m[0].abs() < 1.0e-8);
        assert_eq!(m[1], -0.02);
        assert_eq!(m[2], 0.02);
        assert!(m[3].abs() < 1.0e-8);
        assert_eq!(m[4], 0.0);
        assert_eq!(m[5], 0.0);
    }

    #[test]
    fn test_eye_position_splits_center() {
        let frame = FrameState::new([6378137.0, -6378137.0], 10.0, 0.0, [800, 600]);
        let high = eye_position_rule().evaluate(&frame).unwrap();
        let low = eye_position_low_rule().evaluate(&frame).unwrap();
        assert_eq!(high, UniformValue::Vec2([6378130.0, -6378130.0]));
        assert_eq!(low, UniformValue::Vec2([7.0, -7.0]));
    }

    #[test]
    fn test_selected_id_is_bit_encoded() {
        let selection = SelectionRegister::new();
        let rule = selected_id_rule(selection.clone());
        let frame = FrameState::new([0.0, 0.0], 1.0, 0.0, [100, 100]);

        selection.set(12345);
        match rule.evaluate(&frame).unwrap() {
            UniformValue::Float(v) => {
                assert_eq!(decode_id(v), 12345);
                // a numeric cast would have produced 12345.0
                assert_ne!(v, 12345.0);
            }
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_rejects_malformed_frame() {
        let selection = SelectionRegister::new();
        let rules = standard_uniforms(selection);
        let bad = FrameState::new([0.0, 0.0], 0.0, 0.0, [100, 100]);
        assert!(evaluate_uniforms(&bad, &rules).is_err());
    }

    #[test]
    fn test_evaluation_is_bit_identical_across_frames() {
        let selection = SelectionRegister::new();
        selection.set(-1);
        let rules = standard_uniforms(selection);
        let frame = FrameState::new(
            [20037508.342789244, -3456789.123],
            152.87,
            0.35,
            [1920, 1080],
        );

        let a = evaluate_uniforms(&frame, &rules).unwrap();
        let b = evaluate_uniforms(&frame, &rules).unwrap();
        assert_eq!(a.len(), b.len());
        for ((name_a, va), (name_b, vb)) in a.iter().zip(b.iter()) {
            assert_eq!(name_a, name_b);
            let bits = |v: &UniformValue| -> Vec<u32> {
                match v {
                    UniformValue::Float(f) => vec![f.to_bits()],
                    UniformValue::Vec2(v) => v.iter().map(|f| f.to_bits()).collect(),
                    UniformValue::Mat2x3(m) => m.iter().map(|f| f.to_bits()).collect(),
                }
            };
            assert_eq!(bits(va), bits(vb), "uniform {name_a} not bit-identical");
        }
    }
}
