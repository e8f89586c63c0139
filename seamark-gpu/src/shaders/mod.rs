/*!
# Reference WGSL Shaders

Shader pairs for the visible and hit passes over the standard vessel
attribute set (`size`, `iscircle`, `id`, `cosangle`, `sinangle`). The
pipeline treats these as opaque text; hosts with their own marker styling
supply their own pairs.

Both vertex stages share the eye-relative transform: vertex positions
arrive as `f32` world coordinates and the camera position arrives split
into high and low words, so `(position - eye_high) - eye_low` recovers
precision a single `f32` subtraction would lose.
*/

/// Visible-pass vertex shader
pub const VESSEL_VERTEX_SHADER: &str = include_str!("vessel.vert.wgsl");

/// Visible-pass fragment shader (selected-feature highlight)
pub const VESSEL_FRAGMENT_SHADER: &str = include_str!("vessel.frag.wgsl");

/// Hit-pass vertex shader
pub const HIT_VERTEX_SHADER: &str = include_str!("hit.vert.wgsl");

/// Hit-pass fragment shader (identifier-to-pixel encoding)
pub const HIT_FRAGMENT_SHADER: &str = include_str!("hit.frag.wgsl");
