//! Editor side of the incremental analysis protocol.
//!
//! An [`Editor`] owns open documents and one analysis [`Session`] per
//! document. It keeps what is shown for a document (error markers,
//! highlights, hover, status) consistent with the document's *current*
//! contents while an external analysis service answers slowly and out of
//! order:
//!
//! - Every local edit bumps the session's generation, clears its
//!   decorations and re-arms the change lane of the debounce scheduler.
//! - When a lane goes idle, the editor sends a request stamped with
//!   the current generation. Responses are applied only if their echoed
//!   generation is still current ([`GenerationTracker`]).
//! - Cursor motion drives an independent motion lane that queries hover and
//!   highlight information once the last full analysis is up to date.
//! - [`Editor::rename`] applies a multi-file rename as one transaction.
//!
//! Timers and service calls report back over a single channel; the
//! embedding loop passes each [`EditorEvent`] to [`Editor::handle_event`].

mod buffer;
mod correlator;
mod decoration;
mod editor;
mod error;
mod events;
mod generation;
mod host;
mod navigator;
mod registry;
mod rename;
mod scheduler;
mod session;
mod status;
mod store;
mod tokenizer;

#[cfg(test)]
mod test_support;

pub use buffer::{AppliedEdit, Document, MarkerId, OutOfBounds};
pub use decoration::{Decoration, DecorationKind, DecorationSet, DecorationState, HoverAnchor, Layer, LayerContents, hover_anchor};
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use events::{Delivery, EditorEvent, Outcome, TokenDelivery};
pub use generation::GenerationTracker;
pub use host::{EditorHost, NoOpHost};
pub use navigator::{ErrorNavigator, ErrorStep};
pub use registry::SessionRegistry;
pub use rename::{RenameError, RenameFailure, RenamePhase, RenameReport, RenameStage};
pub use scheduler::{DebounceScheduler, Lane};
pub use session::Session;
pub use status::{Status, StatusMachine};
pub use store::{DocumentStore, FsStore, MemoryStore};
pub use tokenizer::TokenizerSession;
