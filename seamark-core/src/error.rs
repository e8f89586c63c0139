//! Error handling for the Seamark core library

use thiserror::Error;

/// Main error type for feature and encoding operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("non-finite coordinate: {value}")]
    NonFiniteCoordinate { value: f64 },

    #[error("feature {feature}: missing property '{name}'")]
    MissingProperty { feature: String, name: String },

    #[error("feature {feature}: property '{name}' is not numeric")]
    NonNumericProperty { feature: String, name: String },

    #[error("malformed feature identifier: '{id}'")]
    MalformedFeatureId { id: String },
}

impl CoreError {
    pub fn non_finite(value: f64) -> Self {
        Self::NonFiniteCoordinate { value }
    }

    pub fn missing_property<S: Into<String>>(feature: S, name: S) -> Self {
        Self::MissingProperty {
            feature: feature.into(),
            name: name.into(),
        }
    }

    pub fn non_numeric_property<S: Into<String>>(feature: S, name: S) -> Self {
        Self::NonNumericProperty {
            feature: feature.into(),
            name: name.into(),
        }
    }

    pub fn malformed_id<S: Into<String>>(id: S) -> Self {
        Self::MalformedFeatureId { id: id.into() }
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::missing_property("ais.7", "sog");
        assert_eq!(err.to_string(), "feature ais.7: missing property 'sog'");

        let err = CoreError::malformed_id("ais");
        assert_eq!(err.to_string(), "malformed feature identifier: 'ais'");
    }
}
