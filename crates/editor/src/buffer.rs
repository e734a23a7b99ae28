//! Text documents with movable position markers.
//!
//! A [`Document`] is the editor-side text of one file. Markers are positions
//! that follow edits: anything before an edit stays put, anything after it
//! shifts by the edit's length delta, and anything inside the replaced range
//! collapses to its start. The rename transaction relies on this to apply
//! many replacements in one file without recomputing offsets.

use std::path::{Path, PathBuf};

use ropey::Rope;
use slab::Slab;
use vigil_primitives::{CharIdx, DocumentId, Span, TextEdit};

/// Handle to a position marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(usize);

/// An edit that was applied, in the form the tokenizer protocol uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
	pub pos: CharIdx,
	pub delete_len: usize,
	pub inserted: String,
}

/// Edit rejected by [`Document::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("edit {span} out of bounds for document of length {len}")]
pub struct OutOfBounds {
	pub span: Span,
	pub len: usize,
}

/// Text of one open file.
#[derive(Debug)]
pub struct Document {
	id: DocumentId,
	path: PathBuf,
	text: Rope,
	modified: bool,
	markers: Slab<CharIdx>,
}

impl Document {
	pub fn new(id: DocumentId, path: impl Into<PathBuf>, text: &str) -> Self {
		Self {
			id,
			path: path.into(),
			text: Rope::from_str(text),
			modified: false,
			markers: Slab::new(),
		}
	}

	#[inline]
	pub fn id(&self) -> DocumentId {
		self.id
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn text(&self) -> &Rope {
		&self.text
	}

	/// Full contents as a string.
	pub fn contents(&self) -> String {
		self.text.to_string()
	}

	pub fn len_chars(&self) -> usize {
		self.text.len_chars()
	}

	/// Returns true if the buffer changed since it was loaded or last saved.
	pub fn is_modified(&self) -> bool {
		self.modified
	}

	pub fn mark_saved(&mut self) {
		self.modified = false;
	}

	/// Replaces `edit.span` with `edit.text` and moves markers.
	pub fn apply(&mut self, edit: &TextEdit) -> Result<AppliedEdit, OutOfBounds> {
		let len = self.text.len_chars();
		let Span { start, end } = edit.span;
		if end > len {
			return Err(OutOfBounds { span: edit.span, len });
		}

		self.text.remove(start..end);
		self.text.insert(start, &edit.text);
		self.modified = true;

		let inserted = edit.text.chars().count();
		for (_, pos) in self.markers.iter_mut() {
			*pos = shift(*pos, start, end, inserted);
		}

		Ok(AppliedEdit {
			pos: start,
			delete_len: end - start,
			inserted: edit.text.clone(),
		})
	}

	/// Places a marker, clamped to the end of the document.
	pub fn add_marker(&mut self, pos: CharIdx) -> MarkerId {
		MarkerId(self.markers.insert(pos.min(self.text.len_chars())))
	}

	pub fn marker(&self, id: MarkerId) -> Option<CharIdx> {
		self.markers.get(id.0).copied()
	}

	pub fn remove_marker(&mut self, id: MarkerId) -> Option<CharIdx> {
		self.markers.try_remove(id.0)
	}

	pub fn marker_count(&self) -> usize {
		self.markers.len()
	}
}

/// New position of `pos` after `[start, end)` is replaced by `inserted` characters.
fn shift(pos: CharIdx, start: CharIdx, end: CharIdx, inserted: usize) -> CharIdx {
	if pos <= start {
		pos
	} else if pos >= end {
		pos - (end - start) + inserted
	} else {
		start
	}
}
