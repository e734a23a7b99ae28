//! Per-session analysis status indicator.

use tracing::debug;
use vigil_primitives::SessionId;

/// What the status line shows for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
	/// The analysis service cannot be reached.
	Unavailable,
	/// The buffer changed since the last analysis.
	Outdated,
	/// A full analysis is in flight.
	Running,
	/// The latest analysis reported no errors.
	Ok,
	/// The latest analysis reported at least one error.
	Err,
}

impl Status {
	/// Short label for status lines and logs.
	pub fn label(self) -> &'static str {
		match self {
			Self::Unavailable => "unavailable",
			Self::Outdated => "outdated",
			Self::Running => "running",
			Self::Ok => "ok",
			Self::Err => "err",
		}
	}
}

impl std::fmt::Display for Status {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label())
	}
}

/// Status transitions for one session.
///
/// `Unavailable` is sticky: every transition except [`restore`](Self::restore)
/// is ignored until the service is reachable again.
#[derive(Debug, Clone)]
pub struct StatusMachine {
	session: SessionId,
	current: Status,
}

impl StatusMachine {
	pub fn new(session: SessionId, reachable: bool) -> Self {
		let current = if reachable { Status::Outdated } else { Status::Unavailable };
		Self { session, current }
	}

	#[inline]
	pub fn current(&self) -> Status {
		self.current
	}

	/// A local edit happened.
	pub fn on_edit(&mut self) {
		self.transition(Status::Outdated);
	}

	/// A full-reanalyze request was sent.
	pub fn on_request_sent(&mut self) {
		self.transition(Status::Running);
	}

	/// A full-reanalyze result was applied.
	pub fn on_applied(&mut self, error_count: usize) {
		self.transition(if error_count == 0 { Status::Ok } else { Status::Err });
	}

	/// A full-reanalyze request was rejected by the service.
	pub fn on_request_failed(&mut self) {
		if self.current == Status::Running {
			self.transition(Status::Outdated);
		}
	}

	/// The service became unreachable.
	pub fn set_unavailable(&mut self) {
		if self.current != Status::Unavailable {
			debug!(session = self.session.0, from = self.current.label(), "analysis.status.unavailable");
			self.current = Status::Unavailable;
		}
	}

	/// The service is reachable again. Returns true if the session was unavailable.
	pub fn restore(&mut self) -> bool {
		if self.current != Status::Unavailable {
			return false;
		}
		debug!(session = self.session.0, "analysis.status.restored");
		self.current = Status::Outdated;
		true
	}

	fn transition(&mut self, next: Status) {
		if self.current == Status::Unavailable || self.current == next {
			return;
		}
		debug!(session = self.session.0, from = self.current.label(), to = next.label(), "analysis.status.transition");
		self.current = next;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn machine() -> StatusMachine {
		StatusMachine::new(SessionId(1), true)
	}

	#[test]
	fn normal_cycle() {
		let mut status = machine();
		assert_eq!(status.current(), Status::Outdated);
		status.on_request_sent();
		assert_eq!(status.current(), Status::Running);
		status.on_applied(0);
		assert_eq!(status.current(), Status::Ok);
		status.on_edit();
		assert_eq!(status.current(), Status::Outdated);
		status.on_request_sent();
		status.on_applied(2);
		assert_eq!(status.current(), Status::Err);
	}

	#[test]
	fn unavailable_overrides_until_restored() {
		let mut status = machine();
		status.set_unavailable();
		status.on_edit();
		status.on_request_sent();
		status.on_applied(0);
		assert_eq!(status.current(), Status::Unavailable);

		assert!(status.restore());
		assert_eq!(status.current(), Status::Outdated);
		assert!(!status.restore());
	}

	#[test]
	fn failed_request_returns_to_outdated() {
		let mut status = machine();
		status.on_request_sent();
		status.on_request_failed();
		assert_eq!(status.current(), Status::Outdated);

		status.on_applied(0);
		status.on_request_failed();
		assert_eq!(status.current(), Status::Ok);
	}

	#[test]
	fn unreachable_at_creation() {
		let status = StatusMachine::new(SessionId(3), false);
		assert_eq!(status.current(), Status::Unavailable);
		assert_eq!(status.current().to_string(), "unavailable");
	}
}
