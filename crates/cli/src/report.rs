//! Plain-text rendering of check results and rename reports.

use std::fmt::Write as _;

use vigil_analysis::ErrorRecord;
use vigil_editor::{Document, RenameReport};
use vigil_primitives::{CharIdx, Rope};

/// One-based line and column of `pos`, clamped to the end of `text`.
pub fn line_col(text: &Rope, pos: CharIdx) -> (usize, usize) {
	let pos = pos.min(text.len_chars());
	let line = text.char_to_line(pos);
	(line + 1, pos - text.line_to_char(line) + 1)
}

/// Formats an error as `path:line:col: message`.
///
/// Errors located in another file have no text to resolve against and are
/// printed with their character offset instead.
pub fn format_error(document: &Document, record: &ErrorRecord) -> String {
	match &record.source_file {
		Some(file) if file != document.path() => {
			format!("{}:@{}: {}", file.display(), record.span.start, record.message)
		}
		_ => {
			let (line, col) = line_col(document.text(), record.span.start);
			format!("{}:{line}:{col}: {}", document.path().display(), record.message)
		}
	}
}

pub fn format_rename(report: &RenameReport) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "renamed {} site(s)", report.substitutions);
	for path in &report.saved {
		let _ = writeln!(out, "saved {}", path.display());
	}
	for failure in &report.failures {
		let _ = writeln!(out, "failed {failure}");
	}
	out
}
