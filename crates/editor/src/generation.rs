//! Per-session generation bookkeeping.
//!
//! [`GenerationTracker`] holds the generation of the most recent local edit
//! (`requested`) and the generation of the last full analysis that was
//! accepted (`applied`). A response is only allowed to change visible state
//! when its echoed generation equals `requested`.

use tracing::warn;
use vigil_primitives::Generation;

/// Requested/applied generation pair for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTracker {
	requested: Generation,
	applied: Option<Generation>,
}

impl Default for GenerationTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl GenerationTracker {
	/// Starts at [`Generation::INITIAL`] with nothing applied yet.
	pub fn new() -> Self {
		Self {
			requested: Generation::INITIAL,
			applied: None,
		}
	}

	/// Records a local edit and returns the new generation.
	pub fn bump(&mut self) -> Generation {
		self.requested = self.requested.next();
		self.requested
	}

	/// Accepts a full-analysis result stamped with `generation`.
	///
	/// Returns false, leaving the tracker untouched, for anything but the
	/// current generation. Older stamps are ordinary staleness; newer stamps
	/// can only come from a misbehaving service and are logged.
	pub fn mark_applied(&mut self, generation: Generation) -> bool {
		if generation > self.requested {
			warn!(requested = self.requested.0, received = generation.0, "analysis.generation.from_future");
			return false;
		}
		if generation != self.requested {
			return false;
		}
		self.applied = Some(generation);
		true
	}

	/// Returns true if `generation` matches the latest edit, without marking anything applied.
	#[inline]
	pub fn is_current(&self, generation: Generation) -> bool {
		generation == self.requested
	}

	/// Returns true when the last accepted full analysis reflects the latest edit.
	#[inline]
	pub fn is_up_to_date(&self) -> bool {
		self.applied == Some(self.requested)
	}

	#[inline]
	pub fn requested(&self) -> Generation {
		self.requested
	}

	#[inline]
	pub fn applied(&self) -> Option<Generation> {
		self.applied
	}
}
