//! The single owner of documents and their analysis sessions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vigil_analysis::{DocLink, ErrorRecord, RequestKind, ServiceHandle};
use vigil_config::SchedulerConfig;
use vigil_primitives::{CharIdx, DocumentId, RemoteSessionId, SessionId, TextEdit, Viewport};

use crate::buffer::Document;
use crate::correlator::SerialQueue;
use crate::decoration::{DecorationSet, HoverAnchor, Layer, hover_anchor};
use crate::error::{EditorError, Result};
use crate::events::EditorEvent;
use crate::host::{EditorHost, NoOpHost};
use crate::navigator::ErrorStep;
use crate::registry::{SessionRegistry, allocate_session_id};
use crate::rename::RenamePhase;
use crate::scheduler::Lane;
use crate::session::Session;
use crate::status::Status;
use crate::store::DocumentStore;
use crate::tokenizer::TokenizerSession;

/// Owns open documents, their analysis sessions and the event channel that
/// timers and service calls report back on.
///
/// All state changes go through `&mut self`. Service calls run as spawned
/// tasks; their results come back as [`EditorEvent`]s which the embedding
/// loop feeds to [`handle_event`](Self::handle_event).
pub struct Editor {
	pub(crate) service: Option<ServiceHandle>,
	pub(crate) store: Arc<dyn DocumentStore>,
	pub(crate) host: Arc<dyn EditorHost>,
	scheduler: SchedulerConfig,
	pub(crate) documents: HashMap<DocumentId, Document>,
	pub(crate) sessions: SessionRegistry,
	pub(crate) tokenizers: HashMap<DocumentId, TokenizerSession>,
	pub(crate) events_tx: mpsc::UnboundedSender<EditorEvent>,
	events_rx: mpsc::UnboundedReceiver<EditorEvent>,
	pub(crate) serial: Option<SerialQueue>,
	pub(crate) reachable: bool,
	pub(crate) rename_phase: RenamePhase,
	next_document: u64,
	watching_status: bool,
}

impl Editor {
	/// Creates an editor. `service` of `None` leaves every session unavailable.
	pub fn new(service: Option<ServiceHandle>, store: Arc<dyn DocumentStore>) -> Self {
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		Self {
			reachable: service.is_some(),
			service,
			store,
			host: Arc::new(NoOpHost),
			scheduler: SchedulerConfig::default(),
			documents: HashMap::new(),
			sessions: SessionRegistry::new(),
			tokenizers: HashMap::new(),
			events_tx,
			events_rx,
			serial: None,
			rename_phase: RenamePhase::Idle,
			next_document: 1,
			watching_status: false,
		}
	}

	#[must_use]
	pub fn with_host(mut self, host: Arc<dyn EditorHost>) -> Self {
		self.host = host;
		self
	}

	/// Sets the debounce delays used by sessions opened afterwards.
	#[must_use]
	pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
		self.scheduler = scheduler;
		self
	}

	/// Opens the file at `path` through the document store.
	///
	/// Returns the existing document if the file is already open.
	pub async fn open_document(&mut self, path: impl AsRef<Path>) -> Result<DocumentId> {
		let path = path.as_ref();
		if let Some(doc) = self.document_by_path(path) {
			return Ok(doc);
		}
		let text = self.store.load(path).await.map_err(|error| EditorError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Ok(self.open_with(path.to_path_buf(), &text, true).await)
	}

	/// Opens a document with the given contents.
	pub async fn open_text(&mut self, path: impl Into<PathBuf>, text: &str) -> DocumentId {
		self.open_with(path.into(), text, true).await
	}

	/// Registers a document and its session. When `analyze` is set, the
	/// change lane is armed so the new document gets an initial analysis.
	pub(crate) async fn open_with(&mut self, path: PathBuf, text: &str, analyze: bool) -> DocumentId {
		self.watch_service_status();
		if !self.reachable {
			self.probe_service().await;
		}

		let doc = DocumentId(self.next_document);
		self.next_document += 1;
		self.documents.insert(doc, Document::new(doc, path.clone(), text));

		let id = allocate_session_id();
		debug!(session = id.0, doc = doc.0, path = ?path, "analysis.session.open");
		self.sessions.insert(Session::new(id, doc, path, self.reachable, &self.scheduler, &self.events_tx));
		self.tokenizers.insert(doc, TokenizerSession::new(doc));

		if self.reachable {
			self.connect_session(id, text.to_string()).await;
		}
		if self.reachable {
			self.tokenizer_create(doc, text.to_string());
		}
		if analyze && self.reachable && let Some(session) = self.sessions.get_mut(id) {
			session.change.arm();
		}
		doc
	}

	/// Creates the service-side session for `id`.
	async fn connect_session(&mut self, id: SessionId, text: String) -> Option<RemoteSessionId> {
		let service = self.service.clone()?;
		match service.create_session(text).await {
			Ok(remote) => {
				debug!(session = id.0, remote = remote.0, "analysis.session.connected");
				if let Some(session) = self.sessions.get_mut(id) {
					session.remote = Some(remote);
				}
				Some(remote)
			}
			Err(err) => {
				self.service_failed(RequestKind::CreateSession, &err);
				None
			}
		}
	}

	/// Closes a document, destroying its session.
	///
	/// Responses still in flight for the session are dropped when they arrive.
	pub fn close_document(&mut self, doc: DocumentId) -> Result<()> {
		self.documents.remove(&doc).ok_or(EditorError::UnknownDocument(doc))?;
		self.tokenizers.remove(&doc);

		let Some(session) = self.sessions.for_document(doc).and_then(|id| self.sessions.remove(id)) else {
			return Ok(());
		};
		debug!(session = session.id.0, doc = doc.0, "analysis.session.close");
		if let Some(remote) = session.remote
			&& self.reachable
			&& let Some(service) = self.service.clone()
		{
			self.enqueue(RequestKind::DeleteSession, async move { service.delete_session(remote).await });
		}
		Ok(())
	}

	/// Applies a local edit.
	///
	/// Bumps the session generation, clears its decorations, marks it
	/// outdated and re-arms the change lane.
	pub fn edit(&mut self, doc: DocumentId, edit: TextEdit) -> Result<()> {
		self.apply_local_edit(doc, &edit)
	}

	pub(crate) fn apply_local_edit(&mut self, doc: DocumentId, edit: &TextEdit) -> Result<()> {
		let document = self.documents.get_mut(&doc).ok_or(EditorError::UnknownDocument(doc))?;
		let applied = document.apply(edit)?;

		if let Some(id) = self.sessions.for_document(doc)
			&& let Some(session) = self.sessions.get_mut(id)
		{
			let generation = session.generation.bump();
			session.decorations.clear_all();
			session.status.on_edit();
			if !session.suppress_changes {
				session.change.arm();
			}
			debug!(
				session = id.0,
				generation = generation.0,
				suppressed = session.suppress_changes,
				"analysis.session.edit"
			);
		}

		self.tokenizer_edit(doc, applied);
		Ok(())
	}

	/// Sends a full re-analysis of `doc` now instead of waiting for the change lane.
	pub fn reanalyze(&mut self, doc: DocumentId) -> Result<()> {
		let session = self.session_mut(doc)?;
		session.change.cancel();
		let id = session.id;
		if self.request_full_analysis(id) {
			Ok(())
		} else {
			Err(EditorError::ServiceUnavailable)
		}
	}

	/// Records a cursor or viewport change.
	///
	/// Clears the point-derived decorations and re-arms the motion lane.
	pub fn move_cursor(&mut self, doc: DocumentId, point: CharIdx, viewport: Viewport) -> Result<()> {
		let session = self.session_mut(doc)?;
		session.cursor = point;
		session.viewport = viewport;
		session.motion_epoch += 1;
		session.decorations.clear_layer(Layer::Point);
		session.motion.arm();
		Ok(())
	}

	/// Processes one event.
	pub fn handle_event(&mut self, event: EditorEvent) {
		match event {
			EditorEvent::TimerFired { session, lane, arm } => self.on_timer(session, lane, arm),
			EditorEvent::Response(delivery) => self.on_response(delivery),
			EditorEvent::Tokens(delivery) => self.on_tokens(delivery),
			EditorEvent::RequestFailed { kind, error } => self.service_failed(kind, &error),
			EditorEvent::Service(status) => {
				if !status.is_running() {
					self.mark_unreachable(&format!("transport {status:?}"));
				}
			}
		}
	}

	/// Processes every event that is already queued. Returns how many there were.
	pub fn drain_events(&mut self) -> usize {
		let mut handled = 0;
		while let Ok(event) = self.events_rx.try_recv() {
			self.handle_event(event);
			handled += 1;
		}
		handled
	}

	/// Waits for the next event without processing it.
	pub async fn next_event(&mut self) -> Option<EditorEvent> {
		self.events_rx.recv().await
	}

	/// Waits for the next event and processes it.
	pub async fn pump(&mut self) -> bool {
		match self.events_rx.recv().await {
			Some(event) => {
				self.handle_event(event);
				true
			}
			None => false,
		}
	}

	fn on_timer(&mut self, id: SessionId, lane: Lane, arm: u64) {
		let Some(session) = self.sessions.get_mut(id) else {
			return;
		};
		if !session.scheduler_mut(lane).on_fire(arm) {
			return;
		}
		match lane {
			Lane::Change => {
				self.request_full_analysis(id);
			}
			Lane::Motion => self.run_motion_query(id),
		}
	}

	/// Steps through the errors of the last applied analysis.
	///
	/// With no errors the host's own error navigation runs instead and `None` is returned.
	pub fn next_error(&mut self, doc: DocumentId, delta: isize) -> Result<Option<ErrorRecord>> {
		let id = self.sessions.for_document(doc).ok_or(EditorError::UnknownDocument(doc))?;
		let session = self.sessions.get_mut(id).ok_or(EditorError::UnknownDocument(doc))?;
		let own_path = session.path.clone();

		match session.errors.step(delta) {
			ErrorStep::Target(record) => {
				let record = record.clone();
				let file = record.source_file.as_deref().unwrap_or(&own_path);
				self.host.navigate(file, record.span);
				self.host.show_message(&record.message);
				Ok(Some(record))
			}
			ErrorStep::Fallback => {
				self.host.fallback_error_step(doc, delta);
				Ok(None)
			}
		}
	}

	/// Describes the identifier at `point`. Waits for the service.
	pub async fn describe(&mut self, doc: DocumentId, point: CharIdx) -> Result<Option<String>> {
		let (service, remote) = self.query_target(doc).await?;
		match service.describe(remote, point).await {
			Ok(text) => Ok(text),
			Err(err) => Err(self.query_failed(RequestKind::Describe, err)),
		}
	}

	/// Resolves the documentation link for the identifier at `point`. Waits for the service.
	pub async fn doc_link(&mut self, doc: DocumentId, point: CharIdx) -> Result<Option<DocLink>> {
		let (service, remote) = self.query_target(doc).await?;
		match service.doc_link_query(remote, point).await {
			Ok(link) => Ok(link),
			Err(err) => Err(self.query_failed(RequestKind::DocLinkQuery, err)),
		}
	}

	/// Service handle and remote session for a blocking query, probing the service first.
	pub(crate) async fn query_target(&mut self, doc: DocumentId) -> Result<(ServiceHandle, RemoteSessionId)> {
		let id = self.sessions.for_document(doc).ok_or(EditorError::UnknownDocument(doc))?;
		if !self.probe_service().await {
			return Err(EditorError::ServiceUnavailable);
		}
		let service = self.service.clone().ok_or(EditorError::ServiceUnavailable)?;
		let remote = self.sessions.get(id).and_then(|session| session.remote).ok_or(EditorError::ServiceUnavailable)?;
		Ok((service, remote))
	}

	pub(crate) fn query_failed(&mut self, kind: RequestKind, err: vigil_analysis::Error) -> EditorError {
		if err.is_unreachable() {
			self.mark_unreachable(&err.to_string());
			EditorError::ServiceUnavailable
		} else {
			warn!(kind = %kind, error = %err, "analysis.query.failed");
			EditorError::Analysis(err)
		}
	}

	/// Checks reachability, restoring every session if the service answers.
	pub async fn probe_service(&mut self) -> bool {
		let Some(service) = self.service.clone() else {
			return false;
		};
		if self.reachable {
			if self.sessions.iter().any(|session| session.remote.is_none()) {
				self.reconnect_sessions().await;
			}
			return self.reachable;
		}
		match service.ping().await {
			Ok(()) => {
				self.on_restored().await;
				self.reachable
			}
			Err(err) => {
				debug!(error = %err, "analysis.service.probe_failed");
				false
			}
		}
	}

	async fn on_restored(&mut self) {
		info!(sessions = self.sessions.len(), "analysis.service.restored");
		self.reachable = true;
		self.reconnect_sessions().await;
		if !self.reachable {
			return;
		}
		// Edits made while unreachable never reached the service's tokenizer copies.
		let docs: Vec<DocumentId> = self.tokenizers.keys().copied().collect();
		for doc in docs {
			self.tokenizer_resync(doc);
		}
	}

	/// Creates missing service-side sessions and lifts their sticky unavailability.
	///
	/// A session whose create is rejected stays unavailable and is retried by
	/// the next probe. Stops early if the service drops again.
	async fn reconnect_sessions(&mut self) {
		for id in self.sessions.ids() {
			let Some(session) = self.sessions.get(id) else {
				continue;
			};
			if session.remote.is_none() {
				let text = self.documents.get(&session.doc).map(Document::contents).unwrap_or_default();
				if self.connect_session(id, text).await.is_none() {
					if !self.reachable {
						return;
					}
					continue;
				}
			}
			if let Some(session) = self.sessions.get_mut(id)
				&& session.status.restore()
			{
				session.change.arm();
			}
		}
	}

	/// Routes a failed request: transport failures mark the service unreachable.
	pub(crate) fn service_failed(&mut self, kind: RequestKind, err: &vigil_analysis::Error) {
		if err.is_unreachable() {
			self.mark_unreachable(&err.to_string());
		} else {
			warn!(kind = %kind, error = %err, "analysis.request.rejected");
		}
	}

	pub(crate) fn mark_unreachable(&mut self, reason: &str) {
		if self.reachable {
			warn!(reason, sessions = self.sessions.len(), "analysis.service.unreachable");
		}
		self.reachable = false;
		for session in self.sessions.iter_mut() {
			session.status.set_unavailable();
		}
	}

	fn watch_service_status(&mut self) {
		if self.watching_status {
			return;
		}
		self.watching_status = true;
		let Some(mut status) = self.service.as_ref().and_then(ServiceHandle::status) else {
			return;
		};
		let events = self.events_tx.clone();
		tokio::spawn(async move {
			while status.changed().await.is_ok() {
				let current = *status.borrow_and_update();
				if events.send(EditorEvent::Service(current)).is_err() {
					break;
				}
			}
		});
	}

	fn session_mut(&mut self, doc: DocumentId) -> Result<&mut Session> {
		self.sessions
			.for_document(doc)
			.and_then(|id| self.sessions.get_mut(id))
			.ok_or(EditorError::UnknownDocument(doc))
	}

	/// Open document with the given path.
	pub fn document_by_path(&self, path: &Path) -> Option<DocumentId> {
		self.documents.values().find(|document| document.path() == path).map(Document::id)
	}

	pub fn document(&self, doc: DocumentId) -> Option<&Document> {
		self.documents.get(&doc)
	}

	pub fn documents(&self) -> impl Iterator<Item = &Document> {
		self.documents.values()
	}

	/// Session analyzing `doc`.
	pub fn session(&self, doc: DocumentId) -> Option<&Session> {
		self.sessions.for_document(doc).and_then(|id| self.sessions.get(id))
	}

	pub fn status(&self, doc: DocumentId) -> Option<Status> {
		self.session(doc).map(Session::status)
	}

	/// Current decoration snapshot of `doc`.
	pub fn decorations(&self, doc: DocumentId) -> Option<Arc<DecorationSet>> {
		self.session(doc).map(Session::decorations)
	}

	pub fn completions(&self, doc: DocumentId) -> &[String] {
		self.session(doc).map(Session::completions).unwrap_or_default()
	}

	/// Where to attach the current hover of `doc`, if there is one.
	pub fn hover_anchor(&self, doc: DocumentId) -> Option<HoverAnchor> {
		let session = self.session(doc)?;
		let document = self.documents.get(&doc)?;
		let decorations = session.decorations();
		let hover = decorations.hover()?;
		Some(hover_anchor(hover.span, document.text().slice(..), session.viewport))
	}

	/// Returns false once a transport failure was seen, until a probe succeeds.
	pub fn is_reachable(&self) -> bool {
		self.reachable
	}

	pub fn rename_phase(&self) -> RenamePhase {
		self.rename_phase
	}
}
