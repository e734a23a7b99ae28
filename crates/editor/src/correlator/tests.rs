use pretty_assertions::assert_eq;
use vigil_analysis::{ErrorRecord, FullAnalysis, Hover, PointInfo};
use vigil_primitives::{Generation, Span, TextEdit, Viewport};

use super::*;
use crate::decoration::DecorationKind;
use crate::status::Status;
use crate::test_support::Harness;

fn analysis(errors: &[(usize, usize, &str)]) -> FullAnalysis {
	FullAnalysis {
		errors: errors.iter().map(|&(s, e, m)| ErrorRecord::new(Span::new(s, e), m)).collect(),
		completions: vec!["count".into()],
	}
}

#[tokio::test(start_paused = true)]
async fn stale_analysis_never_mutates_visible_state() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "let x = 1").await;
	let id = h.editor.session(doc).unwrap().id();
	h.editor.edit(doc, TextEdit::insert(9, "\n")).unwrap();

	let before = h.editor.decorations(doc).unwrap();
	h.editor.on_response(Delivery::analysis(id, Generation(1), analysis(&[(0, 3, "old")])));

	let session = h.editor.session(doc).unwrap();
	assert_eq!(*session.decorations(), *before);
	assert!(session.errors().is_empty());
	assert!(session.completions().is_empty());
	assert_eq!(session.status(), Status::Outdated);
	assert_eq!(session.generation().applied(), None);
}

#[tokio::test(start_paused = true)]
async fn current_analysis_installs_errors_completions_and_status() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "let x = y").await;
	let id = h.editor.session(doc).unwrap().id();

	h.editor.on_response(Delivery::analysis(id, Generation(1), analysis(&[(8, 9, "unbound y")])));

	let session = h.editor.session(doc).unwrap();
	assert!(session.generation().is_up_to_date());
	assert_eq!(session.status(), Status::Err);
	assert_eq!(session.errors().len(), 1);
	assert_eq!(session.completions(), ["count".to_string()]);
	assert_eq!(session.decorations().of_kind(DecorationKind::Error).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn errors_in_other_files_are_navigable_but_not_decorated() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "open B").await;
	let id = h.editor.session(doc).unwrap().id();

	let mut result = analysis(&[(0, 4, "here")]);
	result.errors.push(ErrorRecord::new(Span::new(2, 3), "there").in_file("/src/b.ml"));
	h.editor.on_response(Delivery::analysis(id, Generation(1), result));

	let session = h.editor.session(doc).unwrap();
	assert_eq!(session.errors().len(), 2);
	assert_eq!(session.decorations().iter().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn out_of_order_responses_keep_the_newest() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "x").await;
	let id = h.editor.session(doc).unwrap().id();
	h.editor.edit(doc, TextEdit::insert(1, "y")).unwrap();
	h.editor.edit(doc, TextEdit::insert(2, "z")).unwrap();

	h.editor.on_response(Delivery::analysis(id, Generation(3), analysis(&[])));
	h.editor.on_response(Delivery::analysis(id, Generation(2), analysis(&[(0, 1, "late")])));
	// Duplicate delivery of the applied generation is harmless.
	h.editor.on_response(Delivery::analysis(id, Generation(3), analysis(&[])));

	let session = h.editor.session(doc).unwrap();
	assert_eq!(session.generation().applied(), Some(Generation(3)));
	assert_eq!(session.status(), Status::Ok);
	assert!(session.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn future_generation_is_refused() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "x").await;
	let id = h.editor.session(doc).unwrap().id();

	h.editor.on_response(Delivery::analysis(id, Generation(9), analysis(&[(0, 1, "future")])));

	let session = h.editor.session(doc).unwrap();
	assert_eq!(session.generation().applied(), None);
	assert!(session.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn point_result_needs_current_generation() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "let x = x").await;
	let id = h.editor.session(doc).unwrap().id();
	let info = PointInfo {
		hover: Some(Hover {
			span: Span::new(4, 5),
			text: "int".into(),
		}),
		def_site: Some(Span::new(4, 5)),
		use_sites: vec![Span::new(8, 9)],
		unused: Vec::new(),
	};

	h.editor.edit(doc, TextEdit::insert(9, " ")).unwrap();
	h.editor.on_response(Delivery::point(id, Generation(1), 0, info.clone()));
	assert!(h.editor.decorations(doc).unwrap().is_empty());

	h.editor.on_response(Delivery::point(id, Generation(2), 0, info));
	let decorations = h.editor.decorations(doc).unwrap();
	assert_eq!(decorations.of_kind(DecorationKind::Definition).count(), 1);
	assert_eq!(decorations.of_kind(DecorationKind::Use).count(), 1);
	assert_eq!(decorations.hover().map(|h| h.text.as_str()), Some("int"));
	// Point results never claim the full analysis is current.
	assert!(!h.editor.session(doc).unwrap().generation().is_up_to_date());
}

#[tokio::test(start_paused = true)]
async fn response_for_destroyed_session_is_dropped() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "x").await;
	let id = h.editor.session(doc).unwrap().id();
	h.editor.close_document(doc).unwrap();

	h.editor.on_response(Delivery::analysis(id, Generation(1), analysis(&[(0, 1, "gone")])));
	assert!(h.editor.session(doc).is_none());
	assert!(h.editor.is_reachable());
}

#[tokio::test(start_paused = true)]
async fn rejected_request_does_not_leave_session_running() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "x").await;
	let id = h.editor.session(doc).unwrap().id();
	h.editor.request_full_analysis(id);
	assert_eq!(h.editor.status(doc), Some(Status::Running));

	h.editor.on_response(Delivery {
		session: id,
		kind: RequestKind::FullReanalyze,
		generation: Generation(1),
		result: Err(vigil_analysis::Error::Remote {
			message: "parser crashed".into(),
		}),
	});
	assert_eq!(h.editor.status(doc), Some(Status::Outdated));
	assert!(h.editor.is_reachable());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_marks_every_session_unavailable() {
	let mut h = Harness::new();
	let a = h.editor.open_text("/src/a.ml", "x").await;
	let b = h.editor.open_text("/src/b.ml", "y").await;
	let id = h.editor.session(a).unwrap().id();

	h.editor.on_response(Delivery {
		session: id,
		kind: RequestKind::FullReanalyze,
		generation: Generation(1),
		result: Err(vigil_analysis::Error::ServiceStopped),
	});

	assert!(!h.editor.is_reachable());
	assert_eq!(h.editor.status(a), Some(Status::Unavailable));
	assert_eq!(h.editor.status(b), Some(Status::Unavailable));

	// Further sends are no-ops while unreachable.
	assert!(!h.editor.request_full_analysis(id));
	h.editor.edit(a, TextEdit::insert(1, "1")).unwrap();
	assert_eq!(h.editor.status(a), Some(Status::Unavailable));
}

#[tokio::test(start_paused = true)]
async fn motion_query_sends_viewport_bounds() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "one\ntwo\nthree\n").await;
	let id = h.editor.session(doc).unwrap().id();
	h.editor.on_response(Delivery::analysis(id, Generation(1), analysis(&[])));

	h.editor.move_cursor(doc, 5, Viewport::new(1, 2)).unwrap();
	h.editor.run_motion_query(id);
	h.settle().await;

	let queries = h.service.requests(RequestKind::PointQuery);
	assert_eq!(queries.len(), 1);
	match &queries[0] {
		vigil_analysis::Request::PointQuery {
			point,
			viewport_start,
			viewport_end,
			generation,
			..
		} => {
			assert_eq!((*point, *viewport_start, *viewport_end), (5, 4, 8));
			assert_eq!(*generation, Generation(1));
		}
		other => panic!("unexpected request {other:?}"),
	}
}

#[tokio::test(start_paused = true)]
async fn point_result_for_earlier_cursor_is_dropped() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "let x = 1\nlet y = x\n").await;
	let id = h.editor.session(doc).unwrap().id();
	h.editor.on_response(Delivery::analysis(id, Generation(1), analysis(&[])));
	let info = PointInfo {
		hover: Some(Hover {
			span: Span::new(4, 5),
			text: "x : int".into(),
		}),
		def_site: Some(Span::new(4, 5)),
		use_sites: Vec::new(),
		unused: Vec::new(),
	};

	h.editor.move_cursor(doc, 4, Viewport::new(1, 2)).unwrap();
	let sent_at = h.editor.session(doc).unwrap().motion_epoch;
	h.editor.move_cursor(doc, 14, Viewport::new(1, 2)).unwrap();

	h.editor.on_response(Delivery::point(id, Generation(1), sent_at, info.clone()));
	assert!(h.editor.decorations(doc).unwrap().hover().is_none());
	assert!(h.editor.decorations(doc).unwrap().is_empty());

	let current = h.editor.session(doc).unwrap().motion_epoch;
	h.editor.on_response(Delivery::point(id, Generation(1), current, info));
	assert_eq!(h.editor.decorations(doc).unwrap().hover().map(|h| h.text.as_str()), Some("x : int"));
}

#[tokio::test(start_paused = true)]
async fn duplicate_analysis_keeps_navigation_position() {
	let mut h = Harness::new();
	let doc = h.editor.open_text("/src/a.ml", "let x = y + z").await;
	let id = h.editor.session(doc).unwrap().id();
	let result = analysis(&[(8, 9, "unbound y"), (12, 13, "unbound z")]);

	h.editor.on_response(Delivery::analysis(id, Generation(1), result.clone()));
	h.editor.next_error(doc, 1).unwrap();
	h.editor.next_error(doc, 1).unwrap();
	assert_eq!(h.editor.session(doc).unwrap().errors().cursor(), Some(1));

	h.editor.on_response(Delivery::analysis(id, Generation(1), result));
	assert_eq!(h.editor.session(doc).unwrap().errors().cursor(), Some(1));
	assert_eq!(h.editor.status(doc), Some(Status::Err));
}
