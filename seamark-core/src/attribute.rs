/*!
# Per-Feature Attribute Evaluation

Turns a feature plus an ordered list of attribute rules into the packed
per-feature record uploaded to the GPU. Rule order is the wire contract:
consumers address values by position in the record, never by name lookup, so
the output of [`evaluate`] is positional and the rules themselves carry the
names.

Rules are pure functions of the feature. Evaluation holds no state, so
disjoint features can be evaluated in parallel ([`evaluate_batch`]) before a
single synchronous upload on the render thread.
*/

use crate::error::CoreResult;
use crate::types::Feature;
use rayon::prelude::*;

/// Value produced by an attribute rule. Booleans coerce to 0/1 on packing;
/// anything else is unrepresentable here, so a non-numeric rule result is
/// caught at the rule boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Bool(bool),
    /// A pre-encoded single-precision value forwarded bit-for-bit, without
    /// any widening round trip. The identifier-encoding rule needs this:
    /// some identifier bit patterns are signaling NaNs, which an
    /// `f32 → f64 → f32` conversion would quiet.
    Raw(f32),
}

impl AttrValue {
    pub fn to_f32(self) -> f32 {
        match self {
            AttrValue::Number(v) => v as f32,
            AttrValue::Bool(true) => 1.0,
            AttrValue::Bool(false) => 0.0,
            AttrValue::Raw(v) => v,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Raw(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

type AttrFn = dyn Fn(&Feature) -> CoreResult<AttrValue> + Send + Sync;

/// A named, pure per-feature attribute computation with stage flags.
///
/// `per_vertex_only` excludes the attribute from secondary shader-template
/// encoding; `to_fragment` additionally interpolates it into the fragment
/// stage. Both are setup-time metadata; every rule in a pass is evaluated
/// and uploaded regardless.
pub struct AttributeRule {
    name: String,
    eval: Box<AttrFn>,
    per_vertex_only: bool,
    to_fragment: bool,
}

impl AttributeRule {
    pub fn new<S, F, V>(name: S, eval: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Feature) -> CoreResult<V> + Send + Sync + 'static,
        V: Into<AttrValue>,
    {
        Self {
            name: name.into(),
            eval: Box::new(move |feature| eval(feature).map(Into::into)),
            per_vertex_only: false,
            to_fragment: false,
        }
    }

    pub fn per_vertex_only(mut self) -> Self {
        self.per_vertex_only = true;
        self
    }

    pub fn to_fragment(mut self) -> Self {
        self.to_fragment = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_per_vertex_only(&self) -> bool {
        self.per_vertex_only
    }

    pub fn is_to_fragment(&self) -> bool {
        self.to_fragment
    }

    pub fn evaluate(&self, feature: &Feature) -> CoreResult<f32> {
        (self.eval)(feature).map(AttrValue::to_f32)
    }
}

impl std::fmt::Debug for AttributeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeRule")
            .field("name", &self.name)
            .field("per_vertex_only", &self.per_vertex_only)
            .field("to_fragment", &self.to_fragment)
            .finish()
    }
}

/// Evaluate one feature against an ordered rule list.
///
/// Position `i` of the output corresponds to `rules[i]`. Any rule failure
/// aborts the whole record.
pub fn evaluate(feature: &Feature, rules: &[AttributeRule]) -> CoreResult<Vec<f32>> {
    rules.iter().map(|rule| rule.evaluate(feature)).collect()
}

/// Evaluate many features into one flat buffer with stride `rules.len()`,
/// feature order preserved. Evaluation fans out across a rayon pool; the
/// caller performs the GPU upload on the render thread.
pub fn evaluate_batch(features: &[Feature], rules: &[AttributeRule]) -> CoreResult<Vec<f32>> {
    let records: Vec<Vec<f32>> = features
        .par_iter()
        .map(|feature| evaluate(feature, rules))
        .collect::<CoreResult<_>>()?;
    Ok(records.into_iter().flatten().collect())
}

/// Rules that participate in shader-template encoding (everything not
/// flagged `per_vertex_only`).
pub fn template_rules(rules: &[AttributeRule]) -> Vec<&AttributeRule> {
    rules.iter().filter(|r| !r.per_vertex_only).collect()
}

/// Rules whose values must also reach the fragment stage.
pub fn fragment_rules(rules: &[AttributeRule]) -> Vec<&AttributeRule> {
    rules.iter().filter(|r| r.to_fragment).collect()
}
