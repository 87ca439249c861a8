//! Errors reading and writing persisted build state.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a state file was rejected before its body was looked at.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatProblem {
    #[error("not a build state file (magic {found:02x?})")]
    BadMagic { found: [u8; 4] },

    #[error("state format version mismatch: found {found}, expected {expected}")]
    UnsupportedVersion { found: u16, expected: u16 },
}

/// Failure to load or persist a `BuildState`.
#[derive(Error, Debug)]
pub enum StateError {
    /// The bytes are not a state file this engine can read.
    #[error("unreadable build state: {0}")]
    Format(#[from] FormatProblem),

    /// The header matched but the contents are structurally invalid.
    #[error("corrupt build state: {reason}")]
    Corruption { reason: String },

    /// The in-memory state could not be encoded.
    #[error("failed to encode build state: {0}")]
    Encode(#[source] bincode::Error),

    #[error("build state I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StateError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        StateError::Corruption {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StateError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors a full rebuild recovers from: the persisted state is
    /// simply discarded.
    pub fn is_recoverable_by_full_build(&self) -> bool {
        matches!(self, StateError::Format(_) | StateError::Corruption { .. })
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StateError::Format(_) => "format",
            StateError::Corruption { .. } => "corruption",
            StateError::Encode(_) => "encode",
            StateError::Io { .. } => "io",
        }
    }
}

pub type StateResult<T> = Result<T, StateError>;
