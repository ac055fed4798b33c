/// Errors reported by chart elements.
///
/// None of these are fatal: an element that fails to draw keeps its dirty
/// state, so fixing the configuration and drawing again recovers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    /// The element has no scale to take ticks from.
    ScaleNotSet,

    /// The scale produced no ticks, so no angular sweep exists.
    EmptyScale,

    /// A configuration value was rejected.
    InvalidConfig(String),

    /// Configuration could not be encoded or decoded.
    Serialization(String),
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::ScaleNotSet => write!(f, "Scale is not set"),
            ChartError::EmptyScale => write!(f, "Scale has no ticks"),
            ChartError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ChartError::Serialization(msg) => write!(f, "Serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for ChartError {}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        ChartError::Serialization(err.to_string())
    }
}

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;
