use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Service Error: {0}")]
    Service(#[from] ServiceError),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
}

// Malformed request or response payloads. These are recoverable at the
// controller boundary and reported as stage failures, never panics.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Recommended frame shapes must not be empty")]
    EmptyFrameShapes,
    #[error("Price must be non-negative, got {0}")]
    NegativePrice(f64),
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

// Upstream failures: unreachable services, declared failures, bad queries.
// A search that matches nothing is an empty result, not a ServiceError.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} is unreachable: {message}")]
    Unreachable {
        service: &'static str,
        message: String,
    },
    #[error("{service} reported failure: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}
