//! Derived decoration state.
//!
//! Decorations are never patched: each applied response replaces a whole
//! layer, and edits clear everything. The current [`DecorationSet`] lives in
//! an [`ArcSwap`] so renderers can take a snapshot at any time and see either
//! the previous or the next set, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use ropey::RopeSlice;
use vigil_analysis::{ErrorRecord, Hover, PointInfo};
use vigil_primitives::{CharIdx, Span, Viewport, line_of};

/// What a decorated span means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DecorationKind {
	Definition,
	Use,
	Unused,
	Error,
}

/// A highlighted span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
	pub span: Span,
	pub kind: DecorationKind,
}

impl Decoration {
	pub fn new(span: Span, kind: DecorationKind) -> Self {
		Self { span, kind }
	}
}

/// Source of a group of decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
	/// Error markers from the last full analysis.
	Analysis,
	/// Definition, use and unused highlights plus hover from the last point query.
	Point,
}

/// Contents of one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerContents {
	pub decorations: Vec<Decoration>,
	pub hover: Option<Hover>,
}

impl LayerContents {
	/// Error markers for the errors that belong to the analyzed buffer.
	pub fn from_errors<'a>(errors: impl IntoIterator<Item = &'a ErrorRecord>) -> Self {
		let decorations = errors
			.into_iter()
			.map(|error| Decoration::new(error.span, DecorationKind::Error))
			.collect();
		Self { decorations, hover: None }
	}

	/// Highlights and hover from a point query.
	pub fn from_point(info: PointInfo) -> Self {
		let mut decorations = Vec::with_capacity(info.use_sites.len() + info.unused.len() + 1);
		decorations.extend(info.def_site.map(|span| Decoration::new(span, DecorationKind::Definition)));
		decorations.extend(info.use_sites.into_iter().map(|span| Decoration::new(span, DecorationKind::Use)));
		decorations.extend(info.unused.into_iter().map(|span| Decoration::new(span, DecorationKind::Unused)));
		Self {
			decorations,
			hover: info.hover,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.decorations.is_empty() && self.hover.is_none()
	}
}

/// Immutable snapshot of every decoration of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
	analysis: LayerContents,
	point: LayerContents,
}

impl DecorationSet {
	pub fn layer(&self, layer: Layer) -> &LayerContents {
		match layer {
			Layer::Analysis => &self.analysis,
			Layer::Point => &self.point,
		}
	}

	fn layer_mut(&mut self, layer: Layer) -> &mut LayerContents {
		match layer {
			Layer::Analysis => &mut self.analysis,
			Layer::Point => &mut self.point,
		}
	}

	/// Every decoration, analysis layer first.
	pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
		self.analysis.decorations.iter().chain(&self.point.decorations)
	}

	/// Decorations of one kind.
	pub fn of_kind(&self, kind: DecorationKind) -> impl Iterator<Item = &Decoration> {
		self.iter().filter(move |decoration| decoration.kind == kind)
	}

	/// The hover slot.
	pub fn hover(&self) -> Option<&Hover> {
		self.point.hover.as_ref().or(self.analysis.hover.as_ref())
	}

	pub fn is_empty(&self) -> bool {
		self.analysis.is_empty() && self.point.is_empty()
	}
}

/// Swappable decoration set of one session.
#[derive(Debug, Default)]
pub struct DecorationState {
	current: ArcSwap<DecorationSet>,
}

impl DecorationState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current decorations.
	pub fn snapshot(&self) -> Arc<DecorationSet> {
		self.current.load_full()
	}

	/// Replaces one layer, leaving the other untouched.
	pub fn replace_all(&self, layer: Layer, contents: LayerContents) {
		let mut next = DecorationSet::clone(&self.current.load());
		*next.layer_mut(layer) = contents;
		self.current.store(Arc::new(next));
	}

	/// Empties every layer.
	pub fn clear_all(&self) {
		self.current.store(Arc::new(DecorationSet::default()));
	}

	/// Empties one layer.
	pub fn clear_layer(&self, layer: Layer) {
		if !self.current.load().layer(layer).is_empty() {
			self.replace_all(layer, LayerContents::default());
		}
	}
}

/// Where a hover popup is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverAnchor {
	/// At a character position inside the viewport.
	At(CharIdx),
	/// At the start of a line, used when the hovered span is off screen.
	Line(usize),
}

/// Picks the hover anchor: the span end if visible, else its start, else the
/// line just above the viewport.
pub fn hover_anchor(span: Span, text: RopeSlice, viewport: Viewport) -> HoverAnchor {
	if viewport.contains_line(line_of(text, span.end)) {
		HoverAnchor::At(span.end)
	} else if viewport.contains_line(line_of(text, span.start)) {
		HoverAnchor::At(span.start)
	} else {
		HoverAnchor::Line(viewport.start_line.saturating_sub(1))
	}
}

#[cfg(test)]
mod tests;
