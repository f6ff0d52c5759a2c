/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between the view model and the backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (connection refused, DNS, TLS...).
    #[error("network error calling {url}: {reason}")]
    Network { url: String, reason: String },

    /// Non-2xx response. `message` is the server's `error` field when present.
    #[error("HTTP {status} from {url}")]
    Http {
        url: String,
        status: u16,
        message: Option<String>,
    },

    /// The body was not the JSON shape the endpoint promises.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Input rejected before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// The endpoint answered but there was nothing to show.
    #[error("no data: {0}")]
    NoData(String),

    /// A route needed by the operation is not configured.
    #[error("route not configured: {0}")]
    MissingRoute(&'static str),

    #[error("local storage: {0}")]
    Cache(String),

    #[error("config: {0}")]
    Config(String),

    /// Superseded by a newer request before it completed.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Text suitable for a banner or status line.
    ///
    /// Prefers what the server said; falls back to `fallback` for transport
    /// and decoding failures the user can't act on.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Http {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.trim().to_string(),
            Error::Validation(m) | Error::NoData(m) => m.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
