/// Error type for calls against the NAS backend API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend answered {path} with HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Backend rejected {path}: {message}")]
    Rejected { path: String, message: String },

    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Backend returned no data for {0}")]
    MissingData(String),
}

/// Error type for startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Result type alias for backend calls.
pub type ClientResult<T> = Result<T, ClientError>;
