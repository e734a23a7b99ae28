//! Analysis state of one open document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use vigil_analysis::FullAnalysis;
use vigil_config::SchedulerConfig;
use vigil_primitives::{CharIdx, DocumentId, RemoteSessionId, SessionId, Viewport};

use crate::decoration::{DecorationSet, DecorationState, Layer, LayerContents};
use crate::events::EditorEvent;
use crate::generation::GenerationTracker;
use crate::navigator::ErrorNavigator;
use crate::scheduler::{DebounceScheduler, Lane};
use crate::status::{Status, StatusMachine};

/// Everything the editor tracks for one analyzed document.
#[derive(Debug)]
pub struct Session {
	pub(crate) id: SessionId,
	pub(crate) doc: DocumentId,
	pub(crate) path: PathBuf,
	pub(crate) remote: Option<RemoteSessionId>,
	pub(crate) generation: GenerationTracker,
	pub(crate) status: StatusMachine,
	pub(crate) decorations: DecorationState,
	pub(crate) errors: ErrorNavigator,
	pub(crate) completions: Vec<String>,
	pub(crate) change: DebounceScheduler,
	pub(crate) motion: DebounceScheduler,
	pub(crate) cursor: CharIdx,
	pub(crate) viewport: Viewport,
	/// Bumped on every cursor or viewport change; point results carry the value they were sent under.
	pub(crate) motion_epoch: u64,
	/// Set while a rename transaction edits this document.
	pub(crate) suppress_changes: bool,
}

impl Session {
	pub(crate) fn new(
		id: SessionId,
		doc: DocumentId,
		path: PathBuf,
		reachable: bool,
		scheduler: &SchedulerConfig,
		events: &mpsc::UnboundedSender<EditorEvent>,
	) -> Self {
		Self {
			id,
			doc,
			path,
			remote: None,
			generation: GenerationTracker::new(),
			status: StatusMachine::new(id, reachable),
			decorations: DecorationState::new(),
			errors: ErrorNavigator::new(),
			completions: Vec::new(),
			change: DebounceScheduler::new(id, Lane::Change, scheduler.change_delay, events.clone()),
			motion: DebounceScheduler::new(id, Lane::Motion, scheduler.motion_delay, events.clone()),
			cursor: 0,
			viewport: Viewport::default(),
			motion_epoch: 0,
			suppress_changes: false,
		}
	}

	#[inline]
	pub fn id(&self) -> SessionId {
		self.id
	}

	#[inline]
	pub fn document(&self) -> DocumentId {
		self.doc
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn remote(&self) -> Option<RemoteSessionId> {
		self.remote
	}

	pub fn generation(&self) -> &GenerationTracker {
		&self.generation
	}

	pub fn status(&self) -> Status {
		self.status.current()
	}

	pub fn decorations(&self) -> Arc<DecorationSet> {
		self.decorations.snapshot()
	}

	pub fn errors(&self) -> &ErrorNavigator {
		&self.errors
	}

	pub fn completions(&self) -> &[String] {
		&self.completions
	}

	pub fn cursor(&self) -> CharIdx {
		self.cursor
	}

	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	pub(crate) fn scheduler_mut(&mut self, lane: Lane) -> &mut DebounceScheduler {
		match lane {
			Lane::Change => &mut self.change,
			Lane::Motion => &mut self.motion,
		}
	}

	/// Installs an accepted full analysis. The caller has already passed the generation gate.
	pub(crate) fn apply_analysis(&mut self, analysis: FullAnalysis) {
		let own = LayerContents::from_errors(analysis.errors.iter().filter(|error| self.owns(error.source_file.as_deref())));
		self.decorations.replace_all(Layer::Analysis, own);
		self.status.on_applied(analysis.errors.len());
		self.errors.rebuild(analysis.errors);
		self.completions = analysis.completions;
	}

	fn owns(&self, file: Option<&Path>) -> bool {
		file.is_none_or(|file| file == self.path)
	}
}
