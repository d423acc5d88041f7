use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
	#[error("required tool `{0}` not found on PATH")]
	ToolNotFound(String),

	#[error("source history query failed: {0}")]
	SourceQueryFailed(String),

	#[error("malformed history record: {0}")]
	MalformedHistory(String),

	#[error("invalid changeset range: {0}")]
	InvalidRange(String),

	#[error("changeset range not found in history: {0}")]
	RangeNotFound(String),

	#[error("failed to materialize changeset {id}: {reason}")]
	MaterializeFailed { id: u64, reason: String },

	#[error("failed to commit changeset {id}: {reason}")]
	CommitFailed { id: u64, reason: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Git(#[from] git2::Error),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
