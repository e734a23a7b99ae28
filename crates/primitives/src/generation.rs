use serde::{Deserialize, Serialize};

/// Monotonic version counter for a session's edit history.
///
/// Every request that depends on buffer contents is stamped with the
/// generation it was computed against, and the analysis service echoes it
/// back unchanged. Comparing the echo with the session's current generation
/// is how stale results are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
	/// Generation assigned to a freshly created session.
	pub const INITIAL: Self = Self(1);

	/// Returns the following generation.
	#[must_use]
	pub const fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

impl Default for Generation {
	fn default() -> Self {
		Self::INITIAL
	}
}

impl std::fmt::Display for Generation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "g{}", self.0)
	}
}
