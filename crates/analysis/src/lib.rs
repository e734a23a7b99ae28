//! Client side of the analysis service protocol.
//!
//! The analysis service (tokenizer, checker, indentation engine) is a black
//! box reached through request/response messages. This crate defines:
//!
//! - [`protocol`]: the request and response message types, including the
//!   generation stamps that every content-dependent request carries and the
//!   service echoes back unchanged.
//! - [`AnalysisService`]: the transport-agnostic service trait, and
//!   [`ServiceHandle`], a cloneable typed wrapper around it.
//! - [`codec`]: newline-delimited JSON envelopes for byte-stream transports.
//! - [`process`]: a transport that spawns the service as a child process and
//!   talks to it over stdio.
//!
//! ## Cargo features
//!
//! - `process`: child-process transport [`process::ProcessService`].
//!   *Enabled by default.*
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod codec;
pub mod protocol;
mod service;

#[cfg(feature = "process")]
#[cfg_attr(docsrs, doc(cfg(feature = "process")))]
pub mod process;

pub use protocol::{
	DocLink, ErrorRecord, FileRenameGroup, FullAnalysis, GroupingDirection, Hover, PointInfo, RenameSite, Request, RequestKind, Response, Token,
};
pub use service::{AnalysisService, ServiceHandle, ServiceStatus};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The service stopped or its transport closed.
	#[error("analysis service stopped")]
	ServiceStopped,
	/// The service could not be spawned.
	#[error("failed to spawn analysis service {command}: {reason}")]
	Spawn {
		/// Command that failed to start.
		command: String,
		/// Underlying failure.
		reason: String,
	},
	/// The service did not answer within the configured timeout.
	#[error("analysis request {kind} timed out")]
	Timeout {
		/// Kind of the request that timed out.
		kind: RequestKind,
	},
	/// Input/output errors from the underlying channel.
	#[error("analysis transport i/o: {0}")]
	Io(String),
	/// A message could not be encoded or decoded.
	#[error("analysis codec: {0}")]
	Codec(String),
	/// The service answered with an error.
	#[error("analysis service error: {message}")]
	Remote {
		/// Message reported by the service.
		message: String,
	},
	/// The service answered with a response of the wrong kind.
	#[error("unexpected response to {expected}: got {got}")]
	UnexpectedResponse {
		/// Kind of request that was sent.
		expected: RequestKind,
		/// Name of the response variant received.
		got: &'static str,
	},
}

impl Error {
	/// Returns true when the failure means the service cannot be reached,
	/// as opposed to a single request being rejected.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, Self::ServiceStopped | Self::Spawn { .. } | Self::Io(_) | Self::Timeout { .. })
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err.to_string())
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Codec(err.to_string())
	}
}
