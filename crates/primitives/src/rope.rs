//! Rope utilities for line and viewport lookups.

use ropey::RopeSlice;

use crate::span::CharIdx;

/// Visible region of a buffer, as a half-open range of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
	/// First visible line.
	pub start_line: usize,
	/// One past the last visible line.
	pub end_line: usize,
}

impl Viewport {
	pub const fn new(start_line: usize, end_line: usize) -> Self {
		Self { start_line, end_line }
	}

	/// Returns true if `line` is on screen.
	#[inline]
	pub fn contains_line(&self, line: usize) -> bool {
		self.start_line <= line && line < self.end_line
	}

	/// Character range covered by the viewport in `text`.
	pub fn char_bounds(&self, text: RopeSlice) -> (CharIdx, CharIdx) {
		let lines = text.len_lines();
		let start = text.line_to_char(self.start_line.min(lines));
		let end = text.line_to_char(self.end_line.min(lines));
		(start, end)
	}
}

/// Returns the line containing `pos`, clamping past-the-end positions.
#[inline]
pub fn line_of(text: RopeSlice, pos: CharIdx) -> usize {
	text.char_to_line(pos.min(text.len_chars()))
}
