use http::Method;
use thiserror::Error;

pub type Result<T, E = MeshError> = std::result::Result<T, E>;

/// Longest remote body kept inside a [`MeshError::Remote`].
pub const BODY_SNIPPET_LIMIT: usize = 512;

/// Flat classification of a [`MeshError`], cheap to copy and match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Registry,
    NoInstances,
    Transport,
    Remote,
    Decode,
    Encode,
    InvalidHeader,
    BreakerOpen,
    Canceled,
    DeadlineExceeded,
    InvalidAddress,
    Config,
}

#[derive(Debug, Error)]
pub enum MeshError {
    //-------------------------------------------------------------------------
    // Discovery
    //-------------------------------------------------------------------------
    #[error("registry {op} failed: {message}")]
    Registry {
        op: &'static str,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("no healthy instances of service '{service}'")]
    NoInstances { service: String },

    //-------------------------------------------------------------------------
    // Exchange
    //-------------------------------------------------------------------------
    #[error("transport error on {method} {url} (service '{service}'): {source}")]
    Transport {
        service: String,
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("service '{service}' answered {method} {url} with HTTP {status}: {body}")]
    Remote {
        service: String,
        method: Method,
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response to {method} {url} (service '{service}'): {source}")]
    Decode {
        service: String,
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request for {method} {path} (service '{service}'): {source}")]
    Encode {
        service: String,
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("context value '{name}' cannot be sent as a request header: {reason}")]
    InvalidHeader { name: String, reason: &'static str },

    //-------------------------------------------------------------------------
    // Gates
    //-------------------------------------------------------------------------
    #[error("circuit breaker open for service '{service}'")]
    BreakerOpen { service: String },

    #[error("call canceled")]
    Canceled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    //-------------------------------------------------------------------------
    // Setup
    //-------------------------------------------------------------------------
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: &'static str },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::Registry { .. } => ErrorKind::Registry,
            MeshError::NoInstances { .. } => ErrorKind::NoInstances,
            MeshError::Transport { .. } => ErrorKind::Transport,
            MeshError::Remote { .. } => ErrorKind::Remote,
            MeshError::Decode { .. } => ErrorKind::Decode,
            MeshError::Encode { .. } => ErrorKind::Encode,
            MeshError::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            MeshError::BreakerOpen { .. } => ErrorKind::BreakerOpen,
            MeshError::Canceled => ErrorKind::Canceled,
            MeshError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            MeshError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            MeshError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Stock predicate for [`RetryPolicy::run_if`](crate::traffic::RetryPolicy::run_if):
    /// network failures, 5xx and 429 answers.
    pub fn is_retryable(&self) -> bool {
        match self {
            MeshError::Transport { .. } => true,
            MeshError::Remote { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether this outcome moves the circuit breaker towards open.
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::Remote | ErrorKind::Decode
        )
    }

    pub fn is_context_error(&self) -> bool {
        matches!(self, MeshError::Canceled | MeshError::DeadlineExceeded)
    }

    pub fn registry(op: &'static str, message: impl Into<String>) -> Self {
        Self::Registry {
            op,
            message: message.into(),
            source: None,
        }
    }

    pub fn registry_io(op: &'static str, source: reqwest::Error) -> Self {
        Self::Registry {
            op,
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Truncates `body` to at most [`BODY_SNIPPET_LIMIT`] bytes on a char boundary.
pub fn body_snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }

    let mut end = BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
