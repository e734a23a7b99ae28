//! Multi-file rename transaction.
//!
//! A rename runs in strict phases: the rename sites are queried once, every
//! file is edited with change notifications suppressed, every edited file is
//! saved, and only then is each saved session re-analyzed. A failure on one
//! file abandons that file and is recorded in the report; files that went
//! through stay renamed.
//!
//! # Phases
//!
//! | Phase         | Work                                                   |
//! |---------------|--------------------------------------------------------|
//! | `Querying`    | `rename-query` at the cursor                           |
//! | `Applying`    | open missing files, replace sites through markers      |
//! | `Saving`      | persist every edited file                              |
//! | `Reanalyzing` | one full re-analysis per saved session                 |
//!
//! The phase returns to `Idle` when the transaction ends, including when the
//! future is dropped part way.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use vigil_analysis::{FileRenameGroup, RequestKind};
use vigil_primitives::{CharIdx, DocumentId, SessionId, Span, TextEdit};

use crate::editor::Editor;
use crate::error::EditorError;

/// Where a rename transaction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenamePhase {
	#[default]
	Idle,
	Querying,
	Applying,
	Saving,
	Reanalyzing,
}

/// Step at which a file dropped out of a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenameStage {
	Open,
	Edit,
	Save,
}

impl std::fmt::Display for RenameStage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::Open => "open",
			Self::Edit => "edit",
			Self::Save => "save",
		})
	}
}

/// A file the rename could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFailure {
	pub path: PathBuf,
	pub stage: RenameStage,
	pub reason: String,
}

impl RenameFailure {
	fn new(path: &Path, stage: RenameStage, reason: impl ToString) -> Self {
		Self {
			path: path.to_path_buf(),
			stage,
			reason: reason.to_string(),
		}
	}
}

impl std::fmt::Display for RenameFailure {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({} failed): {}", self.path.display(), self.stage, self.reason)
	}
}

/// Outcome of a rename that got past the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
	/// Number of sites replaced.
	pub substitutions: usize,
	/// Files saved, in order.
	pub saved: Vec<PathBuf>,
	/// Files for which a re-analysis was sent.
	pub reanalyzed: Vec<PathBuf>,
	/// Files that dropped out, with the stage that failed.
	pub failures: Vec<RenameFailure>,
}

impl RenameReport {
	/// True if some file could not be renamed.
	pub fn is_partial(&self) -> bool {
		!self.failures.is_empty()
	}
}

/// A rename that could not start.
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
	#[error("no renameable identifier at the cursor")]
	NotARenameSite,
	#[error("analysis service unavailable")]
	ServiceUnavailable,
	#[error("unknown document {0}")]
	UnknownDocument(DocumentId),
	#[error(transparent)]
	Analysis(vigil_analysis::Error),
	#[error(transparent)]
	Editor(EditorError),
}

impl From<EditorError> for RenameError {
	fn from(err: EditorError) -> Self {
		match err {
			EditorError::ServiceUnavailable => Self::ServiceUnavailable,
			EditorError::UnknownDocument(doc) => Self::UnknownDocument(doc),
			EditorError::Analysis(err) => Self::Analysis(err),
			other => Self::Editor(other),
		}
	}
}

impl Editor {
	/// Renames the identifier at `point` everywhere the service reports it.
	///
	/// Returns `Err` only when nothing was changed. Per-file failures are
	/// listed in the report.
	pub async fn rename(&mut self, doc: DocumentId, point: CharIdx, new_name: &str) -> Result<RenameReport, RenameError> {
		let mut transaction = Transaction {
			editor: self,
			suppressed: Vec::new(),
		};
		transaction.run(doc, point, new_name).await
	}
}

/// Borrow of the editor for the duration of one rename.
///
/// Dropping it lifts change suppression and returns the phase to `Idle`.
struct Transaction<'a> {
	editor: &'a mut Editor,
	suppressed: Vec<SessionId>,
}

impl Transaction<'_> {
	fn enter(&mut self, phase: RenamePhase) {
		debug!(phase = ?phase, "analysis.rename.phase");
		self.editor.rename_phase = phase;
	}

	async fn run(&mut self, doc: DocumentId, point: CharIdx, new_name: &str) -> Result<RenameReport, RenameError> {
		self.enter(RenamePhase::Querying);
		let group = self.query(doc, point).await?;
		if group.is_empty() {
			return Err(RenameError::NotARenameSite);
		}
		info!(files = group.file_count(), sites = group.site_count(), new_name, "analysis.rename.start");

		self.enter(RenamePhase::Applying);
		let mut report = RenameReport::default();
		let mut edited = Vec::with_capacity(group.file_count());
		for (path, spans) in group.files() {
			match self.apply_file(path, spans.iter().copied(), new_name, &mut report).await {
				Ok(doc) => edited.push(doc),
				Err(failure) => {
					warn!(path = ?failure.path, stage = %failure.stage, reason = %failure.reason, "analysis.rename.file_failed");
					report.failures.push(failure);
				}
			}
		}

		self.enter(RenamePhase::Saving);
		let mut saved = Vec::with_capacity(edited.len());
		for doc in edited {
			match self.save(doc).await {
				Ok(path) => {
					report.saved.push(path);
					saved.push(doc);
				}
				Err(failure) => {
					warn!(path = ?failure.path, reason = %failure.reason, "analysis.rename.save_failed");
					report.failures.push(failure);
				}
			}
		}

		self.enter(RenamePhase::Reanalyzing);
		for doc in saved {
			let Some(id) = self.editor.sessions.for_document(doc) else {
				continue;
			};
			if self.editor.request_full_analysis(id)
				&& let Some(document) = self.editor.documents.get(&doc)
			{
				report.reanalyzed.push(document.path().to_path_buf());
			}
		}

		info!(
			substitutions = report.substitutions,
			saved = report.saved.len(),
			failures = report.failures.len(),
			"analysis.rename.done"
		);
		Ok(report)
	}

	async fn query(&mut self, doc: DocumentId, point: CharIdx) -> Result<FileRenameGroup, RenameError> {
		let (service, remote) = self.editor.query_target(doc).await?;
		match service.rename_query(remote, point).await {
			Ok(group) => Ok(group),
			Err(err) => Err(self.editor.query_failed(RequestKind::RenameQuery, err).into()),
		}
	}

	/// Opens `path` if needed and replaces every site in it.
	async fn apply_file(
		&mut self,
		path: &Path,
		spans: impl Iterator<Item = Span>,
		new_name: &str,
		report: &mut RenameReport,
	) -> Result<DocumentId, RenameFailure> {
		let doc = match self.editor.document_by_path(path) {
			Some(doc) => doc,
			None => {
				let text = self
					.editor
					.store
					.load(path)
					.await
					.map_err(|err| RenameFailure::new(path, RenameStage::Open, err))?;
				self.editor.open_with(path.to_path_buf(), &text, false).await
			}
		};
		self.suppress(doc);

		let document = self
			.editor
			.documents
			.get_mut(&doc)
			.ok_or_else(|| RenameFailure::new(path, RenameStage::Open, "document closed"))?;
		let len = document.len_chars();
		let spans: Vec<Span> = spans.collect();
		if let Some(bad) = spans.iter().find(|span| span.end > len) {
			return Err(RenameFailure::new(path, RenameStage::Edit, format!("site {bad} outside document of length {len}")));
		}
		let markers: Vec<_> = spans.iter().map(|span| (document.add_marker(span.start), document.add_marker(span.end))).collect();

		let mut result = Ok(doc);
		for &(start, end) in &markers {
			let span = self
				.editor
				.documents
				.get(&doc)
				.and_then(|document| Some(Span::new(document.marker(start)?, document.marker(end)?)));
			let Some(span) = span else {
				result = Err(RenameFailure::new(path, RenameStage::Edit, "document closed"));
				break;
			};
			if let Err(err) = self.editor.apply_local_edit(doc, &TextEdit::new(span, new_name)) {
				result = Err(RenameFailure::new(path, RenameStage::Edit, err));
				break;
			}
			report.substitutions += 1;
		}

		if let Some(document) = self.editor.documents.get_mut(&doc) {
			for (start, end) in markers {
				document.remove_marker(start);
				document.remove_marker(end);
			}
		}
		result
	}

	async fn save(&mut self, doc: DocumentId) -> Result<PathBuf, RenameFailure> {
		let Some(document) = self.editor.documents.get(&doc) else {
			return Err(RenameFailure::new(Path::new(""), RenameStage::Save, format!("document {doc} closed")));
		};
		let path = document.path().to_path_buf();
		let text = document.contents();
		self.editor
			.store
			.save(&path, &text)
			.await
			.map_err(|err| RenameFailure::new(&path, RenameStage::Save, err))?;
		if let Some(document) = self.editor.documents.get_mut(&doc) {
			document.mark_saved();
		}
		Ok(path)
	}

	/// Stops edits to `doc` from arming its change lane until the transaction ends.
	fn suppress(&mut self, doc: DocumentId) {
		let Some(id) = self.editor.sessions.for_document(doc) else {
			return;
		};
		if let Some(session) = self.editor.sessions.get_mut(id)
			&& !session.suppress_changes
		{
			session.suppress_changes = true;
			session.change.cancel();
			self.suppressed.push(id);
		}
	}
}

impl Drop for Transaction<'_> {
	fn drop(&mut self) {
		for id in self.suppressed.drain(..) {
			if let Some(session) = self.editor.sessions.get_mut(id) {
				session.suppress_changes = false;
			}
		}
		if self.editor.rename_phase != RenamePhase::Idle {
			debug!("analysis.rename.idle");
			self.editor.rename_phase = RenamePhase::Idle;
		}
	}
}
