/*!
# Seamark GPU Pipeline

Two-pass GPU point rendering for large, dynamically attributed geospatial
feature sets: a visible pass drawing styled vessel markers and a hit pass
encoding feature identifiers into pixels for GPU-assisted picking.

## Architecture

Per frame, the [`FrameOrchestrator`] marshals features through the attribute
evaluator into packed per-feature records, computes per-frame uniforms from
the current [`FrameState`] (camera eye position in split-float form for
precision at deep zoom), and drives both passes through one
[`RenderBackend`]. Pointer-move events feed the shared
[`SelectionRegister`], which flows back into the visible pass as the
`u_selectedId` uniform to highlight the picked feature.

The `webgpu` feature (off by default) enables a headless wgpu reference
backend with hit-target readback.
*/

use seamark_core::Extent;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod render;
pub mod selection;
pub mod uniforms;

#[cfg(feature = "webgpu")]
pub mod pipeline;
#[cfg(feature = "webgpu")]
pub mod shaders;

pub use error::{RenderError, RenderResult};
pub use render::{
    FeatureProbe, FrameOrchestrator, PassDescriptor, PassKind, PickedFeature, RenderBackend,
    ShaderPair,
};
pub use selection::{SelectionRegister, NO_SELECTION};
pub use uniforms::{evaluate_uniforms, standard_uniforms, UniformRule, UniformValue};

#[cfg(feature = "webgpu")]
pub use pipeline::{GpuContext, PointPipeline};

/// Version information for the Seamark GPU library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Snapshot of the external view state for one frame.
///
/// Supplied by the host map framework per rendered frame; never cached
/// across frames by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameState {
    /// View center in projected world coordinates
    pub center: [f64; 2],
    /// World units per pixel
    pub resolution: f64,
    /// View rotation in radians
    pub rotation: f64,
    /// Viewport size in pixels
    pub size: [u32; 2],
}

impl FrameState {
    pub fn new(center: [f64; 2], resolution: f64, rotation: f64, size: [u32; 2]) -> Self {
        Self {
            center,
            resolution,
            rotation,
            size,
        }
    }

    /// Reject malformed view state before it can propagate NaN transforms
    /// into uniforms. Contract violations come from the external view
    /// layer, so the message names the offending field.
    pub fn validate(&self) -> RenderResult<()> {
        if !self.center[0].is_finite() || !self.center[1].is_finite() {
            return Err(RenderError::invalid_frame(format!(
                "non-finite center ({}, {})",
                self.center[0], self.center[1]
            )));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(RenderError::invalid_frame(format!(
                "resolution must be finite and positive, got {}",
                self.resolution
            )));
        }
        if !self.rotation.is_finite() {
            return Err(RenderError::invalid_frame(format!(
                "non-finite rotation {}",
                self.rotation
            )));
        }
        if self.size[0] == 0 || self.size[1] == 0 {
            return Err(RenderError::invalid_frame(format!(
                "degenerate viewport {}x{}",
                self.size[0], self.size[1]
            )));
        }
        Ok(())
    }

    /// World-space extent covered by the viewport: the axis-aligned box
    /// enclosing the (possibly rotated) visible rectangle.
    pub fn visible_extent(&self) -> Extent {
        let w = self.resolution * self.size[0] as f64;
        let h = self.resolution * self.size[1] as f64;
        let (sin, cos) = self.rotation.sin_cos();
        let half_w = (w * cos.abs() + h * sin.abs()) / 2.0;
        let half_h = (w * sin.abs() + h * cos.abs()) / 2.0;
        Extent::new(
            self.center[0] - half_w,
            self.center[1] - half_h,
            self.center[0] + half_w,
            self.center[1] + half_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_validate_accepts_sane_state() {
        let frame = FrameState::new([0.0, 0.0], 10.0, 0.0, [800, 600]);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_contract_violations() {
        let good = FrameState::new([0.0, 0.0], 10.0, 0.0, [800, 600]);

        let mut bad = good;
        bad.center[0] = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.resolution = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.resolution = -2.0;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.rotation = f64::INFINITY;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.size = [0, 600];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_visible_extent_unrotated() {
        let frame = FrameState::new([1000.0, 2000.0], 2.0, 0.0, [100, 50]);
        let extent = frame.visible_extent();
        assert_eq!(extent.min_x, 900.0);
        assert_eq!(extent.max_x, 1100.0);
        assert_eq!(extent.min_y, 1950.0);
        assert_eq!(extent.max_y, 2050.0);
    }

    #[test]
    fn test_visible_extent_quarter_turn_swaps_axes() {
        let frame = FrameState::new(
            [0.0, 0.0],
            1.0,
            std::f64::consts::FRAC_PI_2,
            [100, 50],
        );
        let extent = frame.visible_extent();
        assert!((extent.width() - 50.0).abs() < 1.0e-9);
        assert!((extent.height() - 100.0).abs() < 1.0e-9);
    }
}
