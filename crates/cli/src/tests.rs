use std::path::Path;

use async_trait::async_trait;
use clap::Parser;
use pretty_assertions::assert_eq;
use vigil_analysis::{AnalysisService, ErrorRecord, FileRenameGroup, FullAnalysis, Request, Response};
use vigil_editor::{Document, RenameFailure, RenameReport, RenameStage};
use vigil_primitives::{DocumentId, RemoteSessionId, Rope, Span};

use super::*;
use crate::report::{format_error, format_rename, line_col};

/// Answers every request immediately with fixed results.
#[derive(Default)]
struct FixedService {
	analysis: FullAnalysis,
	group: FileRenameGroup,
}

#[async_trait]
impl AnalysisService for FixedService {
	async fn call(&self, request: Request) -> vigil_analysis::Result<Response> {
		Ok(match request {
			Request::Ping => Response::Pong,
			Request::CreateSession { .. } => Response::SessionCreated {
				session: RemoteSessionId(1),
			},
			Request::FullReanalyze { generation, .. } => Response::Analysis {
				generation,
				analysis: self.analysis.clone(),
			},
			Request::RenameQuery { .. } => Response::RenameGroup { group: self.group.clone() },
			Request::TokUpdate { generation, .. } => Response::TokenUpdated { generation },
			_ => Response::Ack,
		})
	}
}

#[test]
fn parses_check_with_global_flags_after_subcommand() {
	let cli = Cli::try_parse_from(["vigil", "check", "a.ml", "b.ml", "--verbose", "--config", "/etc/vigil.toml"]).unwrap();
	assert!(cli.verbose);
	assert_eq!(cli.config, Some(PathBuf::from("/etc/vigil.toml")));
	match cli.command {
		Command::Check { files } => assert_eq!(files, vec![PathBuf::from("a.ml"), PathBuf::from("b.ml")]),
		other => panic!("unexpected command {other:?}"),
	}
}

#[test]
fn check_requires_files() {
	assert!(Cli::try_parse_from(["vigil", "check"]).is_err());
}

#[test]
fn parses_rename() {
	let cli = Cli::try_parse_from(["vigil", "-v", "rename", "src/a.ml", "42", "count"]).unwrap();
	match cli.command {
		Command::Rename { file, offset, new_name } => {
			assert_eq!(file, PathBuf::from("src/a.ml"));
			assert_eq!(offset, 42);
			assert_eq!(new_name, "count");
		}
		other => panic!("unexpected command {other:?}"),
	}
	assert!(Cli::try_parse_from(["vigil", "rename", "a.ml", "-3", "x"]).is_err());
}

#[test]
fn line_col_is_one_based_and_clamped() {
	let text = Rope::from_str("ab\ncd\n");
	assert_eq!(line_col(&text, 0), (1, 1));
	assert_eq!(line_col(&text, 4), (2, 2));
	assert_eq!(line_col(&text, 99), (3, 1));
}

#[test]
fn errors_format_against_their_own_file() {
	let document = Document::new(DocumentId(1), "/src/a.ml", "let x = 1\nlet y = z\n");
	let here = ErrorRecord::new(Span::new(18, 19), "unbound z");
	let there = ErrorRecord::new(Span::new(7, 8), "type mismatch").in_file("/src/b.ml");
	let same = ErrorRecord::new(Span::new(4, 5), "unused x").in_file("/src/a.ml");

	assert_eq!(format_error(&document, &here), "/src/a.ml:2:9: unbound z");
	assert_eq!(format_error(&document, &there), "/src/b.ml:@7: type mismatch");
	assert_eq!(format_error(&document, &same), "/src/a.ml:1:5: unused x");
}

#[test]
fn rename_report_lists_saves_and_failures() {
	let report = RenameReport {
		substitutions: 3,
		saved: vec![PathBuf::from("/p/a.ml")],
		reanalyzed: vec![PathBuf::from("/p/a.ml")],
		failures: vec![RenameFailure {
			path: PathBuf::from("/p/b.ml"),
			stage: RenameStage::Save,
			reason: "read-only file system".into(),
		}],
	};
	assert_eq!(
		format_rename(&report),
		"renamed 3 site(s)\nsaved /p/a.ml\nfailed /p/b.ml (save failed): read-only file system\n"
	);
}

#[tokio::test]
async fn check_counts_errors_from_one_analysis_per_file() {
	let dir = tempfile::tempdir().unwrap();
	let a = dir.path().join("a.ml");
	let b = dir.path().join("b.ml");
	std::fs::write(&a, "let x = y\n").unwrap();
	std::fs::write(&b, "let z = 2\n").unwrap();

	let service = FixedService {
		analysis: FullAnalysis {
			errors: vec![ErrorRecord::new(Span::new(8, 9), "unbound y")],
			completions: Vec::new(),
		},
		..Default::default()
	};
	let mut editor = batch_editor(ServiceHandle::new(service));
	let shutdown = CancellationToken::new();

	let problems = check(&mut editor, &[a.clone(), b], &shutdown).await.unwrap();
	assert_eq!(problems, 2);
	let doc = editor.document_by_path(&a).unwrap();
	assert_eq!(editor.status(doc), Some(Status::Err));
	assert_eq!(editor.session(doc).unwrap().generation().applied(), Some(vigil_primitives::Generation(1)));
}

#[tokio::test]
async fn check_reports_missing_file() {
	let dir = tempfile::tempdir().unwrap();
	let mut editor = batch_editor(ServiceHandle::new(FixedService::default()));
	let err = check(&mut editor, &[dir.path().join("missing.ml")], &CancellationToken::new())
		.await
		.unwrap_err();
	assert!(err.to_string().contains("missing.ml"));
}

#[tokio::test]
async fn rename_rewrites_files_on_disk() {
	let dir = tempfile::tempdir().unwrap();
	let a = dir.path().join("a.ml");
	let b = dir.path().join("b.ml");
	std::fs::write(&a, "let x = 1\nlet y = x\n").unwrap();
	std::fs::write(&b, "A.x\n").unwrap();

	let service = FixedService {
		group: [(a.clone(), Span::new(4, 5)), (a.clone(), Span::new(18, 19)), (b.clone(), Span::new(2, 3))]
			.into_iter()
			.collect(),
		..Default::default()
	};
	let mut editor = batch_editor(ServiceHandle::new(service));

	let complete = rename(&mut editor, &a, 4, "n", &CancellationToken::new()).await.unwrap();
	assert!(complete);
	assert_eq!(std::fs::read_to_string(&a).unwrap(), "let n = 1\nlet y = n\n");
	assert_eq!(std::fs::read_to_string(Path::new(&b)).unwrap(), "A.n\n");
	let doc = editor.document_by_path(&b).unwrap();
	assert_eq!(editor.status(doc), Some(Status::Ok));
}
