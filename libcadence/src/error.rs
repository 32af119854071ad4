//! Error types for Cadence

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CadenceError>;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CadenceError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CadenceError::InvalidInput(_) => 3,
            CadenceError::Api(ApiError::Authentication(_)) => 2,
            CadenceError::Api(_) => 1,
            CadenceError::Config(_) => 1,
            CadenceError::Output(_) => 1,
        }
    }

    /// Whether this error only affects the follower being collected
    ///
    /// API faults are isolated to a single follower; everything else aborts the run.
    pub fn is_per_follower(&self) -> bool {
        matches!(self, CadenceError::Api(e) if e.is_transient())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Rate limit snapshot has no entry for endpoint {0}")]
    MissingEndpoint(String),
}

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Protected, suspended or deleted timeline
    #[error("Timeline unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    /// Transient faults abort one follower's collection but never the run.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_)
            | ApiError::RateLimit(_)
            | ApiError::Decode(_)
            | ApiError::Unavailable(_) => true,
            ApiError::Authentication(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize row: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Malformed row at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
