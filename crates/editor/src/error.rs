use std::path::PathBuf;

use vigil_primitives::DocumentId;

use crate::buffer::OutOfBounds;

/// Errors returned by [`Editor`](crate::Editor) commands.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
	/// No analysis service is configured, or it cannot be reached.
	#[error("analysis service unavailable")]
	ServiceUnavailable,
	#[error("unknown document {0}")]
	UnknownDocument(DocumentId),
	#[error(transparent)]
	OutOfBounds(#[from] OutOfBounds),
	#[error("{}: {error}", path.display())]
	Io { path: PathBuf, error: std::io::Error },
	/// The service rejected a request.
	#[error(transparent)]
	Analysis(#[from] vigil_analysis::Error),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
