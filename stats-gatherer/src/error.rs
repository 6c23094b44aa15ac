/// A failure tied to a single monitored node.
///
/// Every variant carries the node it belongs to so that errors surfaced
/// through the [`Accumulator`](crate::Accumulator) can be traced back to a
/// configured server.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The server address or its TLS material cannot be used.
    #[error("invalid configuration for '{address}': {reason}")]
    Config { address: String, reason: String },

    /// The request never received a response (connect failure or timeout).
    #[error("{host}: no response from endpoint '{endpoint}': {source}")]
    Network {
        host: String,
        endpoint: String,
        source: reqwest::Error,
    },

    /// Any other failure while sending the request or reading the body.
    #[error("{host}: transport failure for endpoint '{endpoint}': {source}")]
    Transport {
        host: String,
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{host}: endpoint '{endpoint}', invalid response code: '{code}'")]
    HttpStatus { host: String, endpoint: String, code: u16 },

    #[error("{host}: cannot decode response of endpoint '{endpoint}': {source}")]
    Decode {
        host: String,
        endpoint: String,
        source: serde_json::Error,
    },

    /// A fetch or publish task panicked or was cancelled.
    #[error("{host}: collection task failed: {reason}")]
    Task { host: String, reason: String },
}

impl CollectError {
    pub(crate) fn config(address: impl Into<String>, reason: impl ToString) -> Self {
        CollectError::Config {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// The server address or base URL the error belongs to.
    pub fn host(&self) -> &str {
        match self {
            CollectError::Config { address, .. } => address,
            CollectError::Network { host, .. }
            | CollectError::Transport { host, .. }
            | CollectError::HttpStatus { host, .. }
            | CollectError::Decode { host, .. }
            | CollectError::Task { host, .. } => host,
        }
    }

    /// The requested path, for errors raised by a fetch.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            CollectError::Network { endpoint, .. }
            | CollectError::Transport { endpoint, .. }
            | CollectError::HttpStatus { endpoint, .. }
            | CollectError::Decode { endpoint, .. } => Some(endpoint),
            CollectError::Config { .. } | CollectError::Task { .. } => None,
        }
    }
}

pub type Result<T, E = CollectError> = std::result::Result<T, E>;
