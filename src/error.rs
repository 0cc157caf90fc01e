//! Error types
//!
//! Every fallible operation in the library returns [`VaultError`]. The
//! variants follow the failure taxonomy of the vault API: transport problems,
//! envelopes flagged as failed, uniqueness (cardinality) violations on
//! name-based lookups, missing preconditions, rejected permission input and
//! decode failures.

/// Broad classification of a [`VaultError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or HTTP-level failure
    Transport,
    /// The response envelope reported `success: false`
    Envelope,
    /// A lookup that must match exactly one row matched zero or several
    Cardinality,
    /// An operation was invoked without a required identifier or attribute
    Precondition,
    /// Permission input (principal type or right name) was rejected
    Validation,
    /// A payload could not be decoded into the expected shape
    Decode,
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid tenant URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("POST to {method} failed")]
    Network {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("POST to {method} failed with code {status}")]
    Status { method: String, status: u16 },

    /// Body was not a decodable envelope
    #[error("failed to decode response envelope from {method}")]
    MalformedEnvelope {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// Message and exception text reported by the service
    #[error("{0}")]
    Api(String),

    #[error("Query returns 0 object")]
    NotFound,

    #[error("Query returns too many objects (found {0}, expected 1)")]
    TooMany(usize),

    #[error("Missing ID for {0}")]
    MissingId(&'static str),

    #[error("Missing required attribute {attribute} for {kind}")]
    MissingAttribute {
        kind: &'static str,
        attribute: &'static str,
    },

    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: &'static str,
        operation: &'static str,
    },

    #[error("Invalid PrincipalType {0}")]
    InvalidPrincipalType(String),

    #[error("Invalid right {0}")]
    InvalidRight(String),

    #[error("field '{field}': {message}")]
    Field { field: String, message: String },

    #[error("unexpected result from {method}: {message}")]
    Result { method: String, message: String },
}

impl VaultError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client(_)
            | Self::InvalidUrl { .. }
            | Self::Network { .. }
            | Self::Status { .. } => ErrorKind::Transport,
            Self::Api(_) => ErrorKind::Envelope,
            Self::NotFound | Self::TooMany(_) => ErrorKind::Cardinality,
            Self::MissingId(_) | Self::MissingAttribute { .. } | Self::Unsupported { .. } => {
                ErrorKind::Precondition
            }
            Self::InvalidPrincipalType(_) | Self::InvalidRight(_) => ErrorKind::Validation,
            Self::MalformedEnvelope { .. } | Self::Field { .. } | Self::Result { .. } => {
                ErrorKind::Decode
            }
        }
    }

    pub(crate) fn field(field: &str, message: impl std::fmt::Display) -> Self {
        Self::Field {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = VaultError> = std::result::Result<T, E>;
