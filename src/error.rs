//! Error types for smartermail-provider

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response envelope reported `success: false`.
    #[error("{message}")]
    Api { message: String },

    #[error("Authentication failed for {scope}: {message}")]
    Auth { scope: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A public operation failed; `context` is the human-readable
    /// description shown to the platform.
    #[error("{context}: {source}")]
    Operation {
        context: &'static str,
        #[source]
        source: Box<Self>,
    },

    /// A create failed part way through. The compensating delete has
    /// already been attempted; its outcome is in `compensation`.
    #[error("{context}: {source}")]
    Create {
        context: &'static str,
        #[source]
        source: Box<Self>,
        compensation: Compensation,
    },
}

impl Error {
    pub(crate) fn context(context: &'static str) -> impl FnOnce(Self) -> Self {
        move |source| Self::Operation {
            context,
            source: Box::new(source),
        }
    }

    pub(crate) fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// The innermost error, skipping the operation wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } | Self::Create { source, .. } => source.root(),
            other => other,
        }
    }

    /// The remote envelope message, if the root cause was a
    /// `success: false` response.
    #[must_use]
    pub fn api_message(&self) -> Option<&str> {
        match self.root() {
            Self::Api { message } => Some(message),
            _ => None,
        }
    }

    /// Outcome of the compensating delete, for failed creates.
    #[must_use]
    pub const fn compensation(&self) -> Option<&Compensation> {
        match self {
            Self::Create { compensation, .. } => Some(compensation),
            _ => None,
        }
    }
}

/// What happened to a partially created entity after a failed create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Nothing was left behind on the server.
    NotNeeded,
    /// The leftover entity was deleted.
    RolledBack,
    /// The existence check or the delete failed; the server may hold
    /// a partial entity.
    Failed(String),
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNeeded => f.write_str("nothing to roll back"),
            Self::RolledBack => f.write_str("rolled back"),
            Self::Failed(reason) => write!(f, "rollback failed: {reason}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
