use pretty_assertions::assert_eq;
use ropey::Rope;

use super::*;

fn point_info() -> PointInfo {
	PointInfo {
		hover: Some(Hover {
			span: Span::new(4, 7),
			text: "int".into(),
		}),
		def_site: Some(Span::new(4, 7)),
		use_sites: vec![Span::new(12, 15), Span::new(20, 23)],
		unused: vec![Span::new(30, 31)],
	}
}

#[test]
fn point_layer_kinds() {
	let contents = LayerContents::from_point(point_info());
	let kinds: Vec<_> = contents.decorations.iter().map(|d| d.kind).collect();
	assert_eq!(
		kinds,
		vec![DecorationKind::Definition, DecorationKind::Use, DecorationKind::Use, DecorationKind::Unused]
	);
	assert_eq!(contents.hover.as_ref().map(|h| h.text.as_str()), Some("int"));
}

#[test]
fn replacing_a_layer_keeps_the_other() {
	let state = DecorationState::new();
	let errors = [ErrorRecord::new(Span::new(0, 2), "bad")];
	state.replace_all(Layer::Analysis, LayerContents::from_errors(&errors));
	state.replace_all(Layer::Point, LayerContents::from_point(point_info()));

	let snapshot = state.snapshot();
	assert_eq!(snapshot.of_kind(DecorationKind::Error).count(), 1);
	assert_eq!(snapshot.of_kind(DecorationKind::Use).count(), 2);

	state.clear_layer(Layer::Point);
	let cleared = state.snapshot();
	assert_eq!(cleared.of_kind(DecorationKind::Error).count(), 1);
	assert!(cleared.layer(Layer::Point).is_empty());
	assert!(cleared.hover().is_none());

	// Old snapshots are unaffected.
	assert_eq!(snapshot.of_kind(DecorationKind::Use).count(), 2);
}

#[test]
fn replace_is_idempotent() {
	let state = DecorationState::new();
	state.replace_all(Layer::Point, LayerContents::from_point(point_info()));
	let once = state.snapshot();
	state.replace_all(Layer::Point, LayerContents::from_point(point_info()));
	assert_eq!(*state.snapshot(), *once);
}

#[test]
fn clear_all_empties_everything() {
	let state = DecorationState::new();
	state.replace_all(Layer::Analysis, LayerContents::from_errors(&[ErrorRecord::new(Span::new(1, 2), "x")]));
	state.replace_all(Layer::Point, LayerContents::from_point(point_info()));
	state.clear_all();
	assert!(state.snapshot().is_empty());
}

#[test]
fn hover_anchor_prefers_visible_end_then_start() {
	// Five lines of "abcd\n".
	let text = Rope::from("abcd\n".repeat(5));
	let text = text.slice(..);
	let viewport = Viewport::new(1, 3);

	// Entirely on line 1.
	assert_eq!(hover_anchor(Span::new(6, 8), text, viewport), HoverAnchor::At(8));
	// Starts on line 2, ends on line 4.
	assert_eq!(hover_anchor(Span::new(11, 21), text, viewport), HoverAnchor::At(11));
	// Starts on line 0, ends on line 4.
	assert_eq!(hover_anchor(Span::new(1, 21), text, viewport), HoverAnchor::Line(0));
	// Off screen at the top of the buffer.
	assert_eq!(hover_anchor(Span::new(21, 22), text, Viewport::new(0, 2)), HoverAnchor::Line(0));
}
