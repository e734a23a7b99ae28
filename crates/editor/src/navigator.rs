//! Next/previous error navigation over the last applied analysis.

use vigil_analysis::ErrorRecord;

/// Result of one navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStep<'a> {
	/// Jump to this record.
	Target(&'a ErrorRecord),
	/// No analysis errors; the host's own error navigation should run.
	Fallback,
}

/// Error records sorted by position with a circular cursor.
#[derive(Debug, Clone, Default)]
pub struct ErrorNavigator {
	records: Vec<ErrorRecord>,
	cursor: Option<usize>,
}

impl ErrorNavigator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the records and resets the cursor to "not started".
	pub fn rebuild(&mut self, mut records: Vec<ErrorRecord>) {
		records.sort_by_key(|record| record.span.start);
		self.records = records;
		self.cursor = None;
	}

	/// Moves `delta` records, wrapping around in both directions.
	///
	/// From "not started" a forward step lands on the first record and a
	/// backward step on the last.
	pub fn step(&mut self, delta: isize) -> ErrorStep<'_> {
		if self.records.is_empty() {
			return ErrorStep::Fallback;
		}
		let len = self.records.len() as isize;
		let base = match self.cursor {
			Some(index) => index as isize,
			None if delta > 0 => -1,
			None => 0,
		};
		let index = (base + delta.rem_euclid(len)).rem_euclid(len) as usize;
		self.cursor = Some(index);
		ErrorStep::Target(&self.records[index])
	}

	pub fn records(&self) -> &[ErrorRecord] {
		&self.records
	}

	/// Index of the last visited record.
	pub fn cursor(&self) -> Option<usize> {
		self.cursor
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
