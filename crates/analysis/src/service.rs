//! Transport-agnostic service trait and its typed handle.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use vigil_primitives::{CharIdx, DocumentId, Generation, RemoteSessionId};

use crate::protocol::{DocLink, FileRenameGroup, FullAnalysis, GroupingDirection, PointInfo, Request, RequestKind, Response, Token};
use crate::{Error, Result};

/// Reachability of the analysis service as seen by its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
	/// The service is accepting requests.
	Running,
	/// The service exited cleanly or its channel reached EOF.
	Stopped,
	/// The service failed (write failure, decode failure, crash).
	Crashed,
}

impl ServiceStatus {
	/// Returns true if requests can be sent.
	pub fn is_running(self) -> bool {
		self == Self::Running
	}
}

/// A single logical analysis service.
///
/// Implementations must answer every stamped request with a response that
/// echoes the request's generation unchanged. Responses may complete in any
/// order relative to the order calls were made.
#[async_trait]
pub trait AnalysisService: Send + Sync + 'static {
	/// Sends `request` and waits for its response.
	async fn call(&self, request: Request) -> Result<Response>;

	/// Subscribes to reachability changes, when the transport can observe them.
	fn status(&self) -> Option<watch::Receiver<ServiceStatus>> {
		None
	}
}

/// Cloneable, typed handle to an [`AnalysisService`].
#[derive(Clone)]
pub struct ServiceHandle {
	inner: Arc<dyn AnalysisService>,
}

impl std::fmt::Debug for ServiceHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServiceHandle").finish_non_exhaustive()
	}
}

fn unexpected(expected: RequestKind, got: &Response) -> Error {
	Error::UnexpectedResponse { expected, got: got.name() }
}

impl ServiceHandle {
	/// Wraps a service implementation.
	pub fn new(service: impl AnalysisService) -> Self {
		Self { inner: Arc::new(service) }
	}

	/// Sends a raw request.
	pub async fn call(&self, request: Request) -> Result<Response> {
		let kind = request.kind();
		tracing::trace!(%kind, "analysis.call");
		self.inner.call(request).await
	}

	/// Subscribes to reachability changes, if the transport reports them.
	pub fn status(&self) -> Option<watch::Receiver<ServiceStatus>> {
		self.inner.status()
	}

	/// Probes reachability.
	pub async fn ping(&self) -> Result<()> {
		match self.call(Request::Ping).await? {
			Response::Pong | Response::Ack => Ok(()),
			other => Err(unexpected(RequestKind::Ping, &other)),
		}
	}

	/// Creates a server-side session seeded with `text`.
	pub async fn create_session(&self, text: String) -> Result<RemoteSessionId> {
		match self.call(Request::CreateSession { text }).await? {
			Response::SessionCreated { session } => Ok(session),
			other => Err(unexpected(RequestKind::CreateSession, &other)),
		}
	}

	/// Releases a server-side session.
	pub async fn delete_session(&self, session: RemoteSessionId) -> Result<()> {
		match self.call(Request::DeleteSession { session }).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected(RequestKind::DeleteSession, &other)),
		}
	}

	/// Re-analyzes `text`, returning the echoed generation with the result.
	pub async fn full_reanalyze(&self, session: RemoteSessionId, generation: Generation, text: String) -> Result<(Generation, FullAnalysis)> {
		match self.call(Request::FullReanalyze { session, generation, text }).await? {
			Response::Analysis { generation, analysis } => Ok((generation, analysis)),
			other => Err(unexpected(RequestKind::FullReanalyze, &other)),
		}
	}

	/// Queries hover and highlights at `point`.
	pub async fn point_query(
		&self,
		session: RemoteSessionId,
		generation: Generation,
		point: CharIdx,
		viewport: (CharIdx, CharIdx),
	) -> Result<(Generation, PointInfo)> {
		let request = Request::PointQuery {
			session,
			generation,
			point,
			viewport_start: viewport.0,
			viewport_end: viewport.1,
		};
		match self.call(request).await? {
			Response::Point { generation, info } => Ok((generation, info)),
			other => Err(unexpected(RequestKind::PointQuery, &other)),
		}
	}

	/// Fetches every rename site for the identifier at `point`.
	pub async fn rename_query(&self, session: RemoteSessionId, point: CharIdx) -> Result<FileRenameGroup> {
		match self.call(Request::RenameQuery { session, point }).await? {
			Response::RenameGroup { group } => Ok(group),
			other => Err(unexpected(RequestKind::RenameQuery, &other)),
		}
	}

	/// Looks up documentation for the identifier at `point`.
	pub async fn doc_link_query(&self, session: RemoteSessionId, point: CharIdx) -> Result<Option<DocLink>> {
		match self.call(Request::DocLinkQuery { session, point }).await? {
			Response::DocLink { link } => Ok(link),
			other => Err(unexpected(RequestKind::DocLinkQuery, &other)),
		}
	}

	/// Describes the identifier at `point`.
	pub async fn describe(&self, session: RemoteSessionId, point: CharIdx) -> Result<Option<String>> {
		match self.call(Request::Describe { session, point }).await? {
			Response::Description { text } => Ok(text),
			other => Err(unexpected(RequestKind::Describe, &other)),
		}
	}

	/// Creates a tokenizer document.
	pub async fn tok_create(&self, doc: DocumentId, text: String) -> Result<()> {
		match self.call(Request::TokCreate { doc, text }).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected(RequestKind::TokCreate, &other)),
		}
	}

	/// Sends an incremental tokenizer update, returning the echoed generation.
	pub async fn tok_update(&self, doc: DocumentId, generation: Generation, pos: CharIdx, delete_len: usize, inserted: String) -> Result<Generation> {
		let request = Request::TokUpdate {
			doc,
			generation,
			pos,
			delete_len,
			inserted,
		};
		match self.call(request).await? {
			Response::TokenUpdated { generation } => Ok(generation),
			other => Err(unexpected(RequestKind::TokUpdate, &other)),
		}
	}

	/// Fetches tokens for `[beg, end)`.
	pub async fn get_tokens(&self, doc: DocumentId, generation: Generation, beg: CharIdx, end: CharIdx) -> Result<(Generation, Vec<Token>)> {
		match self.call(Request::GetTokens { doc, generation, beg, end }).await? {
			Response::Tokens { generation, tokens } => Ok((generation, tokens)),
			other => Err(unexpected(RequestKind::GetTokens, &other)),
		}
	}

	/// Queries the indentation column for the line at `point`.
	pub async fn indent_amount(&self, doc: DocumentId, generation: Generation, point: CharIdx) -> Result<(Generation, u32)> {
		match self.call(Request::IndentAmount { doc, generation, point }).await? {
			Response::Indent { generation, column } => Ok((generation, column)),
			other => Err(unexpected(RequestKind::IndentAmount, &other)),
		}
	}

	/// Moves over `count` bracket groups from `point`.
	pub async fn grouping_move(
		&self,
		doc: DocumentId,
		generation: Generation,
		point: CharIdx,
		direction: GroupingDirection,
		count: u32,
	) -> Result<(Generation, CharIdx)> {
		let request = Request::GroupingMove {
			doc,
			generation,
			point,
			direction,
			count,
		};
		match self.call(request).await? {
			Response::Moved { generation, point } => Ok((generation, point)),
			other => Err(unexpected(RequestKind::GroupingMove, &other)),
		}
	}
}
