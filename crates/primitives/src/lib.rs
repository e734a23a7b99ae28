//! Core types shared by the analysis protocol and the editor: spans, generations, and ids.

/// Text edit descriptions.
pub mod edit;
/// Generation counters for staleness detection.
pub mod generation;
/// Identifier types for sessions and documents.
pub mod ids;
/// Rope utilities for line and viewport lookups.
pub mod rope;
/// Half-open character spans.
pub mod span;

pub use edit::TextEdit;
pub use generation::Generation;
pub use ids::{DocumentId, RemoteSessionId, SessionId};
pub use rope::{Viewport, line_of};
pub use ropey::{Rope, RopeSlice};
pub use span::{CharIdx, CharLen, Span};
