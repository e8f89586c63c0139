//! Seamark Core Library
//!
//! Feature model, attribute evaluation, and the two precision-critical
//! encoders (double-float coordinates, hit-test identifiers) behind the
//! Seamark GPU point renderer.

pub mod attribute;
pub mod error;
pub mod hitcode;
pub mod split;
pub mod types;

// Re-export commonly used types and functions
pub use attribute::{
    evaluate, evaluate_batch, fragment_rules, template_rules, AttrValue, AttributeRule,
};
pub use error::{CoreError, CoreResult};
pub use hitcode::{decode_id, decode_pixel, encode_id, encode_pixel};
pub use split::{split, SplitFloat, SIGNIFICANT_DIGITS};
pub use types::{Extent, Feature, FeatureRef, FeatureSource, PropertyValue};

/// Version information for the Seamark core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
