use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate lane id: {0}")]
    DuplicateLane(String),
}

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("document: {0}")]
    Document(#[from] DocumentError),
    /// Geometry was requested from a lane before any pass gave it a scale
    /// with a measured pixel range. This is a construction-order bug in the
    /// host, not a data problem.
    #[error("lane {0} has no established scale; set the surface width first")]
    ScaleNotEstablished(String),
    #[error("no lane at index {0}")]
    UnknownLane(usize),
}
