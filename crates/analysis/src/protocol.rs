//! Request and response messages exchanged with the analysis service.
//!
//! Every request that depends on buffer contents carries the [`Generation`]
//! it was issued against. The service must echo that generation unchanged in
//! its response; the editor relies on the echo to discard stale results.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vigil_primitives::{CharIdx, DocumentId, Generation, RemoteSessionId, Span};

/// Kind of an analysis request, used for routing and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
	/// Reachability probe.
	Ping,
	/// Create a server-side session for a buffer.
	CreateSession,
	/// Release a server-side session.
	DeleteSession,
	/// Re-tokenize and re-check the whole buffer.
	FullReanalyze,
	/// Hover and highlight information at the cursor.
	PointQuery,
	/// Cross-file rename sites for the identifier at the cursor.
	RenameQuery,
	/// Documentation link for the identifier at the cursor.
	DocLinkQuery,
	/// Interactive description of the identifier at the cursor.
	Describe,
	/// Create a tokenizer document.
	TokCreate,
	/// Incremental tokenizer update.
	TokUpdate,
	/// Tokens for a character range.
	GetTokens,
	/// Indentation column for a line.
	IndentAmount,
	/// Structural motion over bracket groups.
	GroupingMove,
}

impl std::fmt::Display for RequestKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Ping => "ping",
			Self::CreateSession => "create-session",
			Self::DeleteSession => "delete-session",
			Self::FullReanalyze => "full-reanalyze",
			Self::PointQuery => "point-query",
			Self::RenameQuery => "rename-query",
			Self::DocLinkQuery => "doc-link-query",
			Self::Describe => "describe",
			Self::TokCreate => "tok-create",
			Self::TokUpdate => "tok-update",
			Self::GetTokens => "get-tokens",
			Self::IndentAmount => "indent-amount",
			Self::GroupingMove => "grouping-move",
		};
		f.write_str(name)
	}
}

/// Direction of a structural grouping move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingDirection {
	/// Towards the end of the buffer.
	Forward,
	/// Towards the start of the buffer.
	Backward,
}

/// A request to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Request {
	/// Reachability probe.
	Ping,
	/// Create a session seeded with the buffer text.
	CreateSession {
		/// Full buffer text.
		text: String,
	},
	/// Release a session and its server-side resources.
	DeleteSession {
		/// Session to release.
		session: RemoteSessionId,
	},
	/// Re-analyze the full buffer text.
	FullReanalyze {
		/// Target session.
		session: RemoteSessionId,
		/// Generation of `text`.
		generation: Generation,
		/// Full buffer text.
		text: String,
	},
	/// Hover/highlight query at a point.
	PointQuery {
		/// Target session.
		session: RemoteSessionId,
		/// Generation the point refers to.
		generation: Generation,
		/// Cursor position.
		point: CharIdx,
		/// First visible character.
		viewport_start: CharIdx,
		/// One past the last visible character.
		viewport_end: CharIdx,
	},
	/// Rename sites for the identifier at a point.
	RenameQuery {
		/// Target session.
		session: RemoteSessionId,
		/// Cursor position.
		point: CharIdx,
	},
	/// Documentation link for the identifier at a point.
	DocLinkQuery {
		/// Target session.
		session: RemoteSessionId,
		/// Cursor position.
		point: CharIdx,
	},
	/// Description of the identifier at a point.
	Describe {
		/// Target session.
		session: RemoteSessionId,
		/// Cursor position.
		point: CharIdx,
	},
	/// Create a tokenizer document.
	TokCreate {
		/// Tokenizer document.
		doc: DocumentId,
		/// Full buffer text.
		text: String,
	},
	/// Incremental tokenizer update.
	TokUpdate {
		/// Tokenizer document.
		doc: DocumentId,
		/// Generation after this update.
		generation: Generation,
		/// Start of the replaced range.
		pos: CharIdx,
		/// Number of characters removed at `pos`.
		delete_len: usize,
		/// Text inserted at `pos`.
		inserted: String,
	},
	/// Tokens for `[beg, end)`.
	GetTokens {
		/// Tokenizer document.
		doc: DocumentId,
		/// Generation the range refers to.
		generation: Generation,
		/// Range start.
		beg: CharIdx,
		/// Range end.
		end: CharIdx,
	},
	/// Indentation column for the line containing `point`.
	IndentAmount {
		/// Tokenizer document.
		doc: DocumentId,
		/// Generation the point refers to.
		generation: Generation,
		/// Position on the line to indent.
		point: CharIdx,
	},
	/// Move over `count` bracket groups.
	GroupingMove {
		/// Tokenizer document.
		doc: DocumentId,
		/// Generation the point refers to.
		generation: Generation,
		/// Start position.
		point: CharIdx,
		/// Direction of travel.
		direction: GroupingDirection,
		/// Number of groups to cross.
		count: u32,
	},
}

impl Request {
	/// Returns the kind of this request.
	pub fn kind(&self) -> RequestKind {
		match self {
			Self::Ping => RequestKind::Ping,
			Self::CreateSession { .. } => RequestKind::CreateSession,
			Self::DeleteSession { .. } => RequestKind::DeleteSession,
			Self::FullReanalyze { .. } => RequestKind::FullReanalyze,
			Self::PointQuery { .. } => RequestKind::PointQuery,
			Self::RenameQuery { .. } => RequestKind::RenameQuery,
			Self::DocLinkQuery { .. } => RequestKind::DocLinkQuery,
			Self::Describe { .. } => RequestKind::Describe,
			Self::TokCreate { .. } => RequestKind::TokCreate,
			Self::TokUpdate { .. } => RequestKind::TokUpdate,
			Self::GetTokens { .. } => RequestKind::GetTokens,
			Self::IndentAmount { .. } => RequestKind::IndentAmount,
			Self::GroupingMove { .. } => RequestKind::GroupingMove,
		}
	}

	/// Generation stamp carried by this request, if it has one.
	pub fn generation(&self) -> Option<Generation> {
		match self {
			Self::FullReanalyze { generation, .. }
			| Self::PointQuery { generation, .. }
			| Self::TokUpdate { generation, .. }
			| Self::GetTokens { generation, .. }
			| Self::IndentAmount { generation, .. }
			| Self::GroupingMove { generation, .. } => Some(*generation),
			_ => None,
		}
	}
}

/// A response from the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Response {
	/// Answer to [`Request::Ping`].
	Pong,
	/// Acknowledgement with no payload.
	Ack,
	/// Answer to [`Request::CreateSession`].
	SessionCreated {
		/// Service-side handle.
		session: RemoteSessionId,
	},
	/// Answer to [`Request::FullReanalyze`].
	Analysis {
		/// Echoed generation.
		generation: Generation,
		/// Diagnostics and completions.
		analysis: FullAnalysis,
	},
	/// Answer to [`Request::PointQuery`].
	Point {
		/// Echoed generation.
		generation: Generation,
		/// Hover and highlight information.
		info: PointInfo,
	},
	/// Answer to [`Request::RenameQuery`].
	RenameGroup {
		/// Every site to rename.
		group: FileRenameGroup,
	},
	/// Answer to [`Request::DocLinkQuery`].
	DocLink {
		/// Link target, if any.
		link: Option<DocLink>,
	},
	/// Answer to [`Request::Describe`].
	Description {
		/// Description text, if any.
		text: Option<String>,
	},
	/// Answer to [`Request::TokUpdate`].
	TokenUpdated {
		/// Echoed generation.
		generation: Generation,
	},
	/// Answer to [`Request::GetTokens`].
	Tokens {
		/// Echoed generation.
		generation: Generation,
		/// Tokens overlapping the requested range.
		tokens: Vec<Token>,
	},
	/// Answer to [`Request::IndentAmount`].
	Indent {
		/// Echoed generation.
		generation: Generation,
		/// Target indentation column.
		column: u32,
	},
	/// Answer to [`Request::GroupingMove`].
	Moved {
		/// Echoed generation.
		generation: Generation,
		/// Destination position.
		point: CharIdx,
	},
}

impl Response {
	/// Echoed generation, for stamped responses.
	pub fn generation(&self) -> Option<Generation> {
		match self {
			Self::Analysis { generation, .. }
			| Self::Point { generation, .. }
			| Self::TokenUpdated { generation }
			| Self::Tokens { generation, .. }
			| Self::Indent { generation, .. }
			| Self::Moved { generation, .. } => Some(*generation),
			_ => None,
		}
	}

	/// Variant name, for error reporting.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Pong => "pong",
			Self::Ack => "ack",
			Self::SessionCreated { .. } => "session-created",
			Self::Analysis { .. } => "analysis",
			Self::Point { .. } => "point",
			Self::RenameGroup { .. } => "rename-group",
			Self::DocLink { .. } => "doc-link",
			Self::Description { .. } => "description",
			Self::TokenUpdated { .. } => "token-updated",
			Self::Tokens { .. } => "tokens",
			Self::Indent { .. } => "indent",
			Self::Moved { .. } => "moved",
		}
	}
}

/// An error reported by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
	/// Location of the error.
	pub span: Span,
	/// File the error belongs to; `None` means the analyzed buffer itself.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_file: Option<PathBuf>,
	/// Human-readable message.
	pub message: String,
}

impl ErrorRecord {
	/// Creates an error located in the analyzed buffer.
	pub fn new(span: impl Into<Span>, message: impl Into<String>) -> Self {
		Self {
			span: span.into(),
			source_file: None,
			message: message.into(),
		}
	}

	/// Sets the file the error belongs to.
	#[must_use]
	pub fn in_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.source_file = Some(path.into());
		self
	}
}

/// Result of a full re-analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullAnalysis {
	/// Syntax and type errors.
	#[serde(default)]
	pub errors: Vec<ErrorRecord>,
	/// Completion candidates for the buffer.
	#[serde(default)]
	pub completions: Vec<String>,
}

/// Hover text attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
	/// Span the hover describes.
	pub span: Span,
	/// Text to show.
	pub text: String,
}

/// Result of a point query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointInfo {
	/// Hover text for the identifier under the cursor.
	#[serde(default)]
	pub hover: Option<Hover>,
	/// Definition site of the identifier under the cursor.
	#[serde(default)]
	pub def_site: Option<Span>,
	/// Use sites of the identifier under the cursor.
	#[serde(default)]
	pub use_sites: Vec<Span>,
	/// Unused bindings within the viewport.
	#[serde(default)]
	pub unused: Vec<Span>,
}

/// A documentation link target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLink {
	/// Documentation file.
	pub path: PathBuf,
	/// Anchor within the file.
	#[serde(default)]
	pub anchor: Option<String>,
}

/// A token reported by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Token extent.
	pub span: Span,
	/// Token classes, most specific last.
	pub kinds: Vec<String>,
}

/// One site of a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameSite<'a> {
	/// File containing the site.
	pub file: &'a Path,
	/// Extent of the identifier.
	pub span: Span,
}

/// Every site touched by one rename, grouped by file.
///
/// Files iterate in path order and spans within a file in start order, which
/// gives the rename transaction a deterministic application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRenameGroup {
	files: BTreeMap<PathBuf, BTreeSet<Span>>,
}

impl FileRenameGroup {
	/// Creates an empty group.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a site.
	pub fn insert(&mut self, file: impl Into<PathBuf>, span: impl Into<Span>) {
		self.files.entry(file.into()).or_default().insert(span.into());
	}

	/// Returns true if the group has no sites.
	pub fn is_empty(&self) -> bool {
		self.files.values().all(BTreeSet::is_empty)
	}

	/// Number of files touched.
	pub fn file_count(&self) -> usize {
		self.files.values().filter(|spans| !spans.is_empty()).count()
	}

	/// Total number of sites across files.
	pub fn site_count(&self) -> usize {
		self.files.values().map(BTreeSet::len).sum()
	}

	/// Iterates files with their ordered spans.
	pub fn files(&self) -> impl Iterator<Item = (&Path, &BTreeSet<Span>)> {
		self.files.iter().filter(|(_, spans)| !spans.is_empty()).map(|(path, spans)| (path.as_path(), spans))
	}

	/// Iterates every site.
	pub fn sites(&self) -> impl Iterator<Item = RenameSite<'_>> {
		self.files().flat_map(|(file, spans)| spans.iter().map(move |&span| RenameSite { file, span }))
	}
}

impl<P: Into<PathBuf>, S: Into<Span>> FromIterator<(P, S)> for FileRenameGroup {
	fn from_iter<I: IntoIterator<Item = (P, S)>>(iter: I) -> Self {
		let mut group = Self::new();
		for (file, span) in iter {
			group.insert(file, span);
		}
		group
	}
}

#[cfg(test)]
mod tests;
