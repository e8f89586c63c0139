/*!
# Frame Orchestration and Picking

Drives the visible and hit render passes through a single code path
parameterized by [`PassDescriptor`], and owns the pointer-move picking
protocol that feeds the shared [`SelectionRegister`].

The GPU itself sits behind the [`RenderBackend`] trait: an ordered attribute
layout plus a packed per-feature buffer, a named uniform set recomputed per
frame, and a draw call. Shader programs are opaque text supplied at setup.
*/

use crate::error::{RenderError, RenderResult};
use crate::selection::SelectionRegister;
use crate::uniforms::{evaluate_uniforms, UniformRule, UniformValue};
use crate::FrameState;
use log::debug;
use seamark_core::{evaluate_batch, AttributeRule, Feature, FeatureSource, PropertyValue};
use std::collections::HashMap;

/// Opaque shader program pair for one pass, supplied at setup. Compilation
/// is the backend's concern; failures surface before the first frame.
#[derive(Debug, Clone)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderPair {
    pub fn new<S: Into<String>>(vertex: S, fragment: S) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Everything one render pass needs: its attribute rules, uniform rules,
/// and shader pair. The visible and hit passes differ only in their
/// descriptors.
pub struct PassDescriptor {
    pub attributes: Vec<AttributeRule>,
    pub uniforms: Vec<UniformRule>,
    pub shaders: ShaderPair,
}

impl PassDescriptor {
    pub fn new(
        attributes: Vec<AttributeRule>,
        uniforms: Vec<UniformRule>,
        shaders: ShaderPair,
    ) -> Self {
        Self {
            attributes,
            uniforms,
            shaders,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Visible,
    Hit,
}

impl PassKind {
    pub fn label(self) -> &'static str {
        match self {
            PassKind::Visible => "visible",
            PassKind::Hit => "hit",
        }
    }
}

/// GPU upload surface, implemented by the host (or by the `webgpu`
/// reference backend). All calls arrive on the render thread.
///
/// Buffer layout contract: for each feature, geometry `x`, `y` followed by
/// one `f32` per attribute rule, in rule order. Consumers address values
/// by position, never by name lookup.
pub trait RenderBackend {
    fn upload_attributes(
        &mut self,
        pass: PassKind,
        names: &[&str],
        buffer: &[f32],
    ) -> anyhow::Result<()>;

    fn set_uniforms(
        &mut self,
        pass: PassKind,
        uniforms: &[(&str, UniformValue)],
    ) -> anyhow::Result<()>;

    fn draw(&mut self, pass: PassKind, feature_count: usize) -> anyhow::Result<()>;
}

/// Feature-at-pixel probe of the external data layer.
///
/// Contract: iterate candidates topmost-by-draw-order and early-return the
/// first hit. That makes overlap resolution deterministic; the orchestrator
/// adds no ordering of its own.
pub trait FeatureProbe {
    fn first_feature_at(&self, pixel: [f64; 2]) -> Option<&Feature>;
}

/// What a successful pick hands back to the host: the parsed identifier and
/// a snapshot of the feature's properties (for info panels and the like).
#[derive(Debug, Clone, PartialEq)]
pub struct PickedFeature {
    pub feature_ref: seamark_core::FeatureRef,
    pub properties: HashMap<String, PropertyValue>,
}

/// Drives both render passes and owns the picking protocol.
pub struct FrameOrchestrator {
    visible: PassDescriptor,
    hit: PassDescriptor,
    selection: SelectionRegister,
}

impl FrameOrchestrator {
    /// The selection register is injected, not created here: the caller
    /// builds it first so the visible pass's `u_selectedId` rule can hold
    /// the same handle.
    pub fn new(
        visible: PassDescriptor,
        hit: PassDescriptor,
        selection: SelectionRegister,
    ) -> Self {
        Self {
            visible,
            hit,
            selection,
        }
    }

    pub fn selection(&self) -> &SelectionRegister {
        &self.selection
    }

    pub fn visible_pass(&self) -> &PassDescriptor {
        &self.visible
    }

    pub fn hit_pass(&self) -> &PassDescriptor {
        &self.hit
    }

    /// Render one frame: visible pass, then hit pass, sequentially on the
    /// calling thread.
    pub fn render_frame<B: RenderBackend>(
        &self,
        backend: &mut B,
        features: &[Feature],
        frame: &FrameState,
    ) -> RenderResult<()> {
        frame.validate()?;
        self.render_pass(backend, PassKind::Visible, features, frame)?;
        self.render_pass(backend, PassKind::Hit, features, frame)?;
        Ok(())
    }

    /// Render a single pass: evaluate attributes, evaluate uniforms,
    /// upload both, draw.
    pub fn render_pass<B: RenderBackend>(
        &self,
        backend: &mut B,
        kind: PassKind,
        features: &[Feature],
        frame: &FrameState,
    ) -> RenderResult<()> {
        let desc = match kind {
            PassKind::Visible => &self.visible,
            PassKind::Hit => &self.hit,
        };

        let buffer = pack_features(features, &desc.attributes)?;
        let names: Vec<&str> = desc.attributes.iter().map(|r| r.name()).collect();
        backend
            .upload_attributes(kind, &names, &buffer)
            .map_err(RenderError::backend)?;

        let uniforms = evaluate_uniforms(frame, &desc.uniforms)?;
        backend
            .set_uniforms(kind, &uniforms)
            .map_err(RenderError::backend)?;

        backend
            .draw(kind, features.len())
            .map_err(RenderError::backend)?;

        debug!(
            "{} pass: {} features, {} attributes, {} uniforms",
            kind.label(),
            features.len(),
            desc.attributes.len(),
            desc.uniforms.len()
        );
        Ok(())
    }

    /// Pointer-move handling:
    ///
    /// 1. reset the selection register to "none";
    /// 2. probe for the first feature under the pixel;
    /// 3. on a hit, parse the identifier's numeric suffix into the
    ///    register (a malformed identifier fails the pick explicitly);
    /// 4. re-render the visible pass so the highlight tracks the pointer
    ///    (also when the pointer left all features and the highlight must
    ///    clear).
    pub fn pointer_move<B: RenderBackend, P: FeatureProbe>(
        &self,
        backend: &mut B,
        probe: &P,
        features: &[Feature],
        frame: &FrameState,
        pixel: [f64; 2],
    ) -> RenderResult<Option<PickedFeature>> {
        self.selection.clear();

        let outcome = match probe.first_feature_at(pixel) {
            Some(feature) => {
                let feature_ref = feature.feature_ref()?;
                self.selection.set(feature_ref.index);
                debug!("picked {} at ({}, {})", feature_ref, pixel[0], pixel[1]);
                Some(PickedFeature {
                    feature_ref,
                    properties: feature.properties().clone(),
                })
            }
            None => None,
        };

        self.render_pass(backend, PassKind::Visible, features, frame)?;
        Ok(outcome)
    }

    /// Moveend handling: count features in the current visible extent.
    /// Pure delegation to the data layer's spatial index.
    pub fn visible_feature_count<S: FeatureSource>(
        &self,
        source: &S,
        frame: &FrameState,
    ) -> RenderResult<usize> {
        frame.validate()?;
        Ok(source.features_in_extent(&frame.visible_extent()).len())
    }
}

/// Pack features into the per-pass upload buffer: geometry `x`, `y`, then
/// one value per rule, per feature. Attribute evaluation fans out across
/// rayon; the returned buffer is consumed on the render thread.
fn pack_features(features: &[Feature], rules: &[AttributeRule]) -> RenderResult<Vec<f32>> {
    let stride = rules.len();
    let mut buffer = Vec::with_capacity(features.len() * (2 + stride));
    if stride == 0 {
        for feature in features {
            let [x, y] = feature.geometry();
            buffer.push(x as f32);
            buffer.push(y as f32);
        }
    } else {
        let values = evaluate_batch(features, rules)?;
        for (feature, record) in features.iter().zip(values.chunks(stride)) {
            let [x, y] = feature.geometry();
            buffer.push(x as f32);
            buffer.push(y as f32);
            buffer.extend_from_slice(record);
        }
    }
    Ok(buffer)
}
