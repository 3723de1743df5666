use thiserror::Error;

/// Failure reported by a [`crate::remote::ContentStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("could not reach content store for {path}: {message}")]
    Connectivity { path: String, message: String },
    #[error("{path} does not exist in the content store")]
    NotFound { path: String },
}

impl RemoteError {
    pub fn path(&self) -> &str {
        match self {
            RemoteError::Connectivity { path, .. } | RemoteError::NotFound { path } => path,
        }
    }

    /// Only connectivity failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Connectivity { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("no fixtures scheduled for round {round}")]
    EmptyRound { round: u32 },
    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] RemoteError),
    #[error("table '{table}' is malformed: {reason}")]
    MalformedTable { table: String, reason: String },
    #[error("player '{player}' not found in '{table}'")]
    PlayerNotFound { player: String, table: String },
    #[error("{player} has no recorded games against {opponent}")]
    NoHistory { player: String, opponent: String },
    #[error("folder '{folder}' does not belong to any fixture this round")]
    UnknownFolder { folder: String },
    #[error("player '{player}' has no URL slug mapping")]
    UnmappedPlayer { player: String },
    #[error("no match has been selected")]
    NoMatchSelected,
    #[error("no table named '{name}' in the selected match folder")]
    TableMissing { name: String },
}

impl PipelineError {
    pub(crate) fn malformed(table: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::MalformedTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Everything except an empty round can be shown as an empty state and the
    /// session carries on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PipelineError::EmptyRound { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
