use thiserror::Error;

use crate::types::ShapeId;

/// Failures raised by the shape store and the tool handlers that drive it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error("invalid shape: {0}")]
    Validation(String),

    #[error("no shape with id {0}")]
    NotFound(ShapeId),

    #[error("shape id {0} is already in use")]
    DuplicateId(ShapeId),
}

/// Failures talking to the external assistant service.
///
/// Any of these ends the current run.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {message}")]
    Transport { service: String, message: String },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode { service: String, message: String },

    #[error("unexpected response from {service}: {message}")]
    Unexpected { service: String, message: String },
}

impl ServiceError {
    pub fn unexpected(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            service: service.into(),
            message: message.into(),
        }
    }
}
