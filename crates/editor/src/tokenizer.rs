//! Incremental tokenizer sub-protocol.
//!
//! The service keeps its own copy of each document for tokenization,
//! indentation and structural motion. Every local edit is forwarded as a
//! `tok-update` stamped with the document's tokenizer generation; queries
//! are stamped the same way and their answers only count when the echo
//! matches.

use tokio::sync::oneshot;
use tracing::debug;
use vigil_analysis::{GroupingDirection, RequestKind, Token};
use vigil_primitives::{CharIdx, DocumentId, Generation, Span};

use crate::buffer::AppliedEdit;
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::events::{EditorEvent, TokenDelivery};
use crate::generation::GenerationTracker;

/// Tokenizer-side state of one document.
#[derive(Debug)]
pub struct TokenizerSession {
	doc: DocumentId,
	generation: GenerationTracker,
	tokens: Vec<Token>,
	range: Option<Span>,
}

impl TokenizerSession {
	pub fn new(doc: DocumentId) -> Self {
		Self {
			doc,
			generation: GenerationTracker::new(),
			tokens: Vec::new(),
			range: None,
		}
	}

	pub fn generation(&self) -> &GenerationTracker {
		&self.generation
	}

	/// Invalidates cached tokens and returns the generation of the edit.
	pub fn on_edit(&mut self) -> Generation {
		self.tokens.clear();
		self.range = None;
		self.generation.bump()
	}

	/// Installs tokens for `range` if `generation` is current.
	pub fn accept(&mut self, generation: Generation, range: Span, tokens: Vec<Token>) -> bool {
		if !self.generation.mark_applied(generation) {
			debug!(doc = self.doc.0, generation = generation.0, "analysis.tokenizer.stale");
			return false;
		}
		self.tokens = tokens;
		self.range = Some(range);
		true
	}

	/// Cached tokens and the range they cover.
	pub fn tokens(&self) -> (&[Token], Option<Span>) {
		(&self.tokens, self.range)
	}
}

impl Editor {
	pub(crate) fn tokenizer_create(&mut self, doc: DocumentId, text: String) {
		let Some(service) = self.service.clone() else {
			return;
		};
		self.enqueue(RequestKind::TokCreate, async move { service.tok_create(doc, text).await });
	}

	/// Re-creates the service's copy of `doc` from the current contents.
	///
	/// Bumps the tokenizer generation so answers computed on the previous
	/// copy are discarded.
	pub(crate) fn tokenizer_resync(&mut self, doc: DocumentId) {
		let Some(text) = self.documents.get(&doc).map(|document| document.contents()) else {
			return;
		};
		let Some(tokenizer) = self.tokenizers.get_mut(&doc) else {
			return;
		};
		let generation = tokenizer.on_edit();
		debug!(doc = doc.0, generation = generation.0, "analysis.tokenizer.resync");
		self.tokenizer_create(doc, text);
	}

	pub(crate) fn tokenizer_edit(&mut self, doc: DocumentId, edit: AppliedEdit) {
		let Some(tokenizer) = self.tokenizers.get_mut(&doc) else {
			return;
		};
		let generation = tokenizer.on_edit();
		let Some(service) = self.service.clone().filter(|_| self.reachable) else {
			return;
		};
		let AppliedEdit { pos, delete_len, inserted } = edit;
		self.enqueue(RequestKind::TokUpdate, async move {
			service.tok_update(doc, generation, pos, delete_len, inserted).await.map(drop)
		});
	}

	/// Requests tokens for `range`. The result arrives as an event.
	pub fn request_tokens(&mut self, doc: DocumentId, range: Span) -> Result<()> {
		let tokenizer = self.tokenizers.get(&doc).ok_or(EditorError::UnknownDocument(doc))?;
		let stamp = tokenizer.generation().requested();
		let service = self.service.clone().filter(|_| self.reachable).ok_or(EditorError::ServiceUnavailable)?;
		let events = self.events_tx.clone();
		self.enqueue_job(async move {
			let (generation, result) = match service.get_tokens(doc, stamp, range.start, range.end).await {
				Ok((generation, tokens)) => (generation, Ok(tokens)),
				Err(err) => (stamp, Err(err)),
			};
			let _ = events.send(EditorEvent::Tokens(TokenDelivery {
				doc,
				generation,
				range,
				result,
			}));
		});
		Ok(())
	}

	pub(crate) fn on_tokens(&mut self, delivery: TokenDelivery) {
		let TokenDelivery {
			doc,
			generation,
			range,
			result,
		} = delivery;
		match result {
			Ok(tokens) => {
				if let Some(tokenizer) = self.tokenizers.get_mut(&doc) {
					tokenizer.accept(generation, range, tokens);
				}
			}
			Err(err) => self.service_failed(RequestKind::GetTokens, &err),
		}
	}

	/// Tokens last received for `doc`, if they are still current.
	pub fn tokens(&self, doc: DocumentId) -> Option<&[Token]> {
		let tokenizer = self.tokenizers.get(&doc)?;
		tokenizer.generation().is_up_to_date().then(|| tokenizer.tokens().0)
	}

	/// Indentation column for the line containing `point`. `None` when the
	/// service answered for an older version of the document.
	pub async fn indent_amount(&mut self, doc: DocumentId, point: CharIdx) -> Result<Option<u32>> {
		let stamp = self.tokenizer_stamp(doc)?;
		let service = self.service.clone().filter(|_| self.reachable).ok_or(EditorError::ServiceUnavailable)?;
		let (tx, rx) = oneshot::channel();
		self.enqueue_job(async move {
			let _ = tx.send(service.indent_amount(doc, stamp, point).await);
		});
		let answer = rx.await.map_err(|_| EditorError::ServiceUnavailable)?;
		match answer {
			Ok((generation, column)) => Ok(self.if_current(doc, generation, column)),
			Err(err) => Err(self.query_failed(RequestKind::IndentAmount, err)),
		}
	}

	/// Destination of moving over `count` bracket groups from `point`. `None`
	/// when the service answered for an older version of the document.
	pub async fn grouping_move(&mut self, doc: DocumentId, point: CharIdx, direction: GroupingDirection, count: u32) -> Result<Option<CharIdx>> {
		let stamp = self.tokenizer_stamp(doc)?;
		let service = self.service.clone().filter(|_| self.reachable).ok_or(EditorError::ServiceUnavailable)?;
		let (tx, rx) = oneshot::channel();
		self.enqueue_job(async move {
			let _ = tx.send(service.grouping_move(doc, stamp, point, direction, count).await);
		});
		let answer = rx.await.map_err(|_| EditorError::ServiceUnavailable)?;
		match answer {
			Ok((generation, target)) => Ok(self.if_current(doc, generation, target)),
			Err(err) => Err(self.query_failed(RequestKind::GroupingMove, err)),
		}
	}

	fn tokenizer_stamp(&self, doc: DocumentId) -> Result<Generation> {
		self.tokenizers
			.get(&doc)
			.map(|tokenizer| tokenizer.generation().requested())
			.ok_or(EditorError::UnknownDocument(doc))
	}

	fn if_current<T>(&self, doc: DocumentId, generation: Generation, value: T) -> Option<T> {
		let current = self.tokenizers.get(&doc).is_some_and(|tokenizer| tokenizer.generation().is_current(generation));
		if !current {
			debug!(doc = doc.0, generation = generation.0, "analysis.tokenizer.stale_answer");
		}
		current.then_some(value)
	}
}
