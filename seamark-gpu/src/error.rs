//! Error handling for the Seamark GPU pipeline

use seamark_core::CoreError;
use thiserror::Error;

/// Main error type for frame rendering and picking operations
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid frame state: {message}")]
    InvalidFrameState { message: String },

    #[error("shader setup failed for {pass} pass: {message}")]
    ShaderSetup { pass: String, message: String },

    #[error("uniform '{name}' not supported by this backend")]
    UnknownUniform { name: String },

    #[error("backend error: {source}")]
    Backend {
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RenderError {
    pub fn invalid_frame<S: Into<String>>(message: S) -> Self {
        Self::InvalidFrameState {
            message: message.into(),
        }
    }

    pub fn shader_setup<S: Into<String>>(pass: S, message: S) -> Self {
        Self::ShaderSetup {
            pass: pass.into(),
            message: message.into(),
        }
    }

    pub fn unknown_uniform<S: Into<String>>(name: S) -> Self {
        Self::UnknownUniform { name: name.into() }
    }

    pub fn backend(source: anyhow::Error) -> Self {
        Self::Backend { source }
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RenderError::invalid_frame("resolution must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "invalid frame state: resolution must be positive, got 0"
        );

        let err = RenderError::from(CoreError::malformed_id("ais"));
        assert_eq!(err.to_string(), "malformed feature identifier: 'ais'");
    }
}
