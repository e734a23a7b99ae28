use serde::{Deserialize, Serialize};

use crate::span::Span;

/// A single replacement of `span` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
	/// Character range being replaced (pre-edit coordinates).
	pub span: Span,
	/// Replacement text.
	pub text: String,
}

impl TextEdit {
	pub fn new(span: impl Into<Span>, text: impl Into<String>) -> Self {
		Self {
			span: span.into(),
			text: text.into(),
		}
	}

	/// Pure insertion at `pos`.
	pub fn insert(pos: usize, text: impl Into<String>) -> Self {
		Self::new(Span::point(pos), text)
	}

	/// Pure deletion of `span`.
	pub fn delete(span: impl Into<Span>) -> Self {
		Self::new(span, String::new())
	}

	/// Net change in document length, in characters.
	pub fn delta(&self) -> isize {
		self.text.chars().count() as isize - self.span.len() as isize
	}
}
