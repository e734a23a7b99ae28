//! Capabilities the surrounding editor provides.

use std::path::Path;

use vigil_primitives::{DocumentId, Span};

/// Callbacks into the host editor.
///
/// All methods have no-op defaults so hosts only implement what they support.
pub trait EditorHost: Send + Sync {
	/// True while a completion or selection popup is open for `doc`. Motion
	/// queries are skipped while this holds.
	fn completion_active(&self, _doc: DocumentId) -> bool {
		false
	}

	/// Runs the host's own next/previous error command when there are no
	/// analysis errors to visit.
	fn fallback_error_step(&self, _doc: DocumentId, _delta: isize) {}

	/// Moves the cursor to `span` in `file`.
	fn navigate(&self, _file: &Path, _span: Span) {}

	/// Shows a one-line message.
	fn show_message(&self, _message: &str) {}
}

/// Host that supports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHost;

impl EditorHost for NoOpHost {}
