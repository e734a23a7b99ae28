use serde::{Deserialize, Serialize};

/// A position in the text, measured in characters (not bytes).
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
pub type CharLen = usize;

/// A half-open `[start, end)` range of character offsets.
///
/// Spans are what the analysis service reports for errors, definition and
/// use sites, hover targets and rename sites. They are always normalized so
/// that `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Span {
	/// First character covered by the span.
	pub start: CharIdx,
	/// One past the last character covered by the span.
	pub end: CharIdx,
}

impl Span {
	/// Creates a span, swapping the bounds if they arrive reversed.
	pub fn new(start: CharIdx, end: CharIdx) -> Self {
		if start <= end { Self { start, end } } else { Self { start: end, end: start } }
	}

	/// Creates an empty span at `pos`.
	pub const fn point(pos: CharIdx) -> Self {
		Self { start: pos, end: pos }
	}

	/// Number of characters covered.
	#[inline]
	pub fn len(&self) -> CharLen {
		self.end - self.start
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Returns true if `pos` lies inside the span.
	///
	/// An empty span contains its own position so that cursor queries on a
	/// zero-width site still match.
	pub fn contains(&self, pos: CharIdx) -> bool {
		if self.is_empty() { pos == self.start } else { self.start <= pos && pos < self.end }
	}

	/// Returns true if the two spans share at least one character.
	pub fn overlaps(&self, other: &Span) -> bool {
		self.start < other.end && other.start < self.end
	}
}

impl From<std::ops::Range<CharIdx>> for Span {
	fn from(range: std::ops::Range<CharIdx>) -> Self {
		Self::new(range.start, range.end)
	}
}

impl std::fmt::Display for Span {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}..{}", self.start, self.end)
	}
}
