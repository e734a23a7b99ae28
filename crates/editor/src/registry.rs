//! Lookup table from session ids to live sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use vigil_primitives::{DocumentId, SessionId};

use crate::session::Session;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a session id that is unique for the lifetime of the process.
pub fn allocate_session_id() -> SessionId {
	SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Live sessions, indexed by id and by document.
#[derive(Debug, Default)]
pub struct SessionRegistry {
	sessions: HashMap<SessionId, Session>,
	by_document: HashMap<DocumentId, SessionId>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a session, replacing any previous session of the same document.
	pub fn insert(&mut self, session: Session) -> Option<Session> {
		let previous = self.by_document.insert(session.doc, session.id).and_then(|old| self.sessions.remove(&old));
		self.sessions.insert(session.id, session);
		previous
	}

	/// Removes a session. Responses that arrive for it later find nothing.
	pub fn remove(&mut self, id: SessionId) -> Option<Session> {
		let session = self.sessions.remove(&id)?;
		self.by_document.remove(&session.doc);
		Some(session)
	}

	pub fn get(&self, id: SessionId) -> Option<&Session> {
		self.sessions.get(&id)
	}

	pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
		self.sessions.get_mut(&id)
	}

	/// Session analyzing `doc`.
	pub fn for_document(&self, doc: DocumentId) -> Option<SessionId> {
		self.by_document.get(&doc).copied()
	}

	pub fn ids(&self) -> Vec<SessionId> {
		self.sessions.keys().copied().collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Session> {
		self.sessions.values()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
		self.sessions.values_mut()
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}
}
