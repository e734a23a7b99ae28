//! Messages posted to the editor's event channel by timers and service calls.

use vigil_analysis::{FullAnalysis, PointInfo, RequestKind, ServiceStatus, Token};
use vigil_primitives::{DocumentId, Generation, SessionId, Span};

use crate::scheduler::Lane;

/// Everything that can wake the editor outside of direct user input.
#[derive(Debug)]
pub enum EditorEvent {
	/// A debounce lane went idle.
	TimerFired { session: SessionId, lane: Lane, arm: u64 },
	/// A session-scoped analysis request completed.
	Response(Delivery),
	/// A token request completed.
	Tokens(TokenDelivery),
	/// A fire-and-forget request failed.
	RequestFailed { kind: RequestKind, error: vigil_analysis::Error },
	/// The service transport reported a status change.
	Service(ServiceStatus),
}

/// Payload of a successful session-scoped response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	Analysis(FullAnalysis),
	/// Point result and the cursor epoch the query was sent under.
	Point { info: PointInfo, motion: u64 },
}

/// A completed request, routed back to its session.
#[derive(Debug)]
pub struct Delivery {
	pub session: SessionId,
	pub kind: RequestKind,
	/// Echoed generation on success, the stamped generation on failure.
	pub generation: Generation,
	pub result: Result<Outcome, vigil_analysis::Error>,
}

impl Delivery {
	/// A successful full re-analysis.
	pub fn analysis(session: SessionId, generation: Generation, analysis: FullAnalysis) -> Self {
		Self {
			session,
			kind: RequestKind::FullReanalyze,
			generation,
			result: Ok(Outcome::Analysis(analysis)),
		}
	}

	/// A successful point query sent while the cursor epoch was `motion`.
	pub fn point(session: SessionId, generation: Generation, motion: u64, info: PointInfo) -> Self {
		Self {
			session,
			kind: RequestKind::PointQuery,
			generation,
			result: Ok(Outcome::Point { info, motion }),
		}
	}
}

/// A completed `get-tokens` request.
#[derive(Debug)]
pub struct TokenDelivery {
	pub doc: DocumentId,
	pub generation: Generation,
	pub range: Span,
	pub result: Result<Vec<Token>, vigil_analysis::Error>,
}
