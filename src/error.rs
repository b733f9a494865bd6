/// Failure taxonomy for bridge operations
///
/// Every failure a backend or the router can hit is one of these variants.
/// None of them crosses the channel boundary by name: the encoder flattens
/// them to `false` / an empty list, except `Unimplemented`, which becomes the
/// channel's not-implemented reply.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`BridgeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingOrMalformedArgument,
    ResolutionFailure,
    CapabilityUnavailable,
    TransactionFailed,
    PartialFailure,
    Unimplemented,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    // ========== Argument extraction ==========
    #[error("missing argument `{0}`")]
    MissingArgument(&'static str),

    #[error("argument `{name}` is not a {expected}")]
    MalformedArgument {
        name: &'static str,
        expected: &'static str,
    },

    // ========== Resolution ==========
    /// Identifier or album name did not resolve to anything in the store
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid album name: {0:?}")]
    InvalidAlbumName(String),

    // ========== Capability ==========
    #[error("{feature} is not available on this platform build")]
    CapabilityUnavailable { feature: &'static str },

    #[error("`{0}` is not implemented by this backend")]
    Unimplemented(String),

    // ========== Mutation ==========
    #[error("transaction failed during {phase}: {reason}")]
    TransactionFailed { phase: &'static str, reason: String },

    /// A multi-phase operation committed `completed` before failing
    #[error("partial failure after {completed}: {source}")]
    PartialFailure {
        completed: &'static str,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),
}

impl BridgeError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn transaction(phase: &'static str, reason: impl Into<String>) -> Self {
        Self::TransactionFailed {
            phase,
            reason: reason.into(),
        }
    }

    pub fn partial(completed: &'static str, source: BridgeError) -> Self {
        Self::PartialFailure {
            completed,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingArgument(_) | Self::MalformedArgument { .. } => {
                FailureKind::MissingOrMalformedArgument
            }
            Self::NotFound { .. } | Self::InvalidAlbumName(_) => FailureKind::ResolutionFailure,
            Self::CapabilityUnavailable { .. } => FailureKind::CapabilityUnavailable,
            Self::Unimplemented(_) => FailureKind::Unimplemented,
            Self::TransactionFailed { .. } | Self::Io { .. } | Self::Catalog(_) => {
                FailureKind::TransactionFailed
            }
            Self::PartialFailure { .. } => FailureKind::PartialFailure,
        }
    }
}

/// Convenience type alias for backend results
pub type BackendResult<T> = Result<T, BridgeError>;

/// Errors raised while loading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
