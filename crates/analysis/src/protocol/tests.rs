use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[test]
fn request_serializes_with_kind_tag() {
	let request = Request::FullReanalyze {
		session: RemoteSessionId(4),
		generation: Generation(7),
		text: "let x".into(),
	};
	assert_eq!(
		serde_json::to_value(&request).unwrap(),
		json!({"kind": "full-reanalyze", "session": 4, "generation": 7, "text": "let x"})
	);
	assert_eq!(request.kind(), RequestKind::FullReanalyze);
	assert_eq!(request.generation(), Some(Generation(7)));
}

#[test]
fn unstamped_requests_have_no_generation() {
	assert_eq!(Request::Ping.generation(), None);
	assert_eq!(
		Request::RenameQuery {
			session: RemoteSessionId(1),
			point: 3
		}
		.generation(),
		None
	);
}

#[test]
fn point_response_tolerates_missing_fields() {
	let response: Response = serde_json::from_value(json!({
		"kind": "point",
		"generation": 3,
		"info": {"use_sites": [{"start": 1, "end": 2}]}
	}))
	.unwrap();

	assert_eq!(
		response,
		Response::Point {
			generation: Generation(3),
			info: PointInfo {
				use_sites: vec![Span::new(1, 2)],
				..PointInfo::default()
			},
		}
	);
	assert_eq!(response.generation(), Some(Generation(3)));
}

#[test]
fn error_record_omits_missing_source_file() {
	let record = ErrorRecord::new(Span::new(0, 2), "unexpected token");
	assert_eq!(
		serde_json::to_value(&record).unwrap(),
		json!({"span": {"start": 0, "end": 2}, "message": "unexpected token"})
	);
}

#[test]
fn rename_group_orders_files_and_sites() {
	let group: FileRenameGroup = [
		("b.src", Span::new(10, 11)),
		("a.src", Span::new(8, 9)),
		("a.src", Span::new(2, 3)),
		("a.src", Span::new(2, 3)),
	].into_iter().collect();

	assert_eq!(group.file_count(), 2);
	assert_eq!(group.site_count(), 3);

	let sites: Vec<_> = group.sites().map(|site| (site.file.to_path_buf(), site.span)).collect();
	assert_eq!(
		sites,
		vec![
			(PathBuf::from("a.src"), Span::new(2, 3)),
			(PathBuf::from("a.src"), Span::new(8, 9)),
			(PathBuf::from("b.src"), Span::new(10, 11)),
		]
	);
}

#[test]
fn rename_group_round_trips_as_file_map() {
	let group: FileRenameGroup = [("a.src", Span::new(0, 1))].into_iter().collect();
	let value = serde_json::to_value(&group).unwrap();
	assert_eq!(value, json!({"a.src": [{"start": 0, "end": 1}]}));
	assert_eq!(serde_json::from_value::<FileRenameGroup>(value).unwrap(), group);
}

#[test]
fn empty_group_is_empty() {
	assert!(FileRenameGroup::new().is_empty());
	assert_eq!(FileRenameGroup::new().site_count(), 0);
}
