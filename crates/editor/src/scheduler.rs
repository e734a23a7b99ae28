//! Idle-delay debounce lanes.
//!
//! Each session owns two [`DebounceScheduler`]s: the change lane, armed by
//! every local edit, and the motion lane, armed by every cursor or viewport
//! change. Arming cancels the pending timer and starts a new one, so a burst
//! of activity produces a single [`EditorEvent::TimerFired`] once the lane
//! has been idle for its delay.
//!
//! A timer task can finish just as the lane is re-armed, leaving a stale
//! `TimerFired` in the event channel. Every arm therefore carries a
//! monotonically increasing arm generation and [`DebounceScheduler::on_fire`]
//! only accepts the latest one.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use vigil_config::IdleDelay;
use vigil_primitives::SessionId;

use crate::events::EditorEvent;

/// The two independent debounce timelines of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
	/// Re-analysis after edits.
	Change,
	/// Hover and highlight queries after cursor motion.
	Motion,
}

impl Lane {
	pub fn name(self) -> &'static str {
		match self {
			Self::Change => "change",
			Self::Motion => "motion",
		}
	}
}

/// One debounce lane of one session.
#[derive(Debug)]
pub struct DebounceScheduler {
	session: SessionId,
	lane: Lane,
	delay: IdleDelay,
	arm: u64,
	pending: Option<CancellationToken>,
	events: mpsc::UnboundedSender<EditorEvent>,
}

impl DebounceScheduler {
	pub fn new(session: SessionId, lane: Lane, delay: IdleDelay, events: mpsc::UnboundedSender<EditorEvent>) -> Self {
		Self {
			session,
			lane,
			delay,
			arm: 0,
			pending: None,
			events,
		}
	}

	/// Restarts the idle delay. Returns the new arm generation, or `None` if the lane is off.
	///
	/// Must be called from within a tokio runtime.
	pub fn arm(&mut self) -> Option<u64> {
		let delay = self.delay.duration()?;
		self.cancel();
		self.arm += 1;

		let token = CancellationToken::new();
		let cancelled = token.clone();
		let events = self.events.clone();
		let (session, lane, arm) = (self.session, self.lane, self.arm);
		tokio::spawn(async move {
			tokio::select! {
				_ = cancelled.cancelled() => {}
				_ = tokio::time::sleep(delay) => {
					trace!(session = session.0, lane = lane.name(), arm, "analysis.scheduler.fired");
					let _ = events.send(EditorEvent::TimerFired { session, lane, arm });
				}
			}
		});

		trace!(session = self.session.0, lane = self.lane.name(), arm = self.arm, delay_ms = delay.as_millis() as u64, "analysis.scheduler.armed");
		self.pending = Some(token);
		Some(self.arm)
	}

	/// Accepts a fired timer. True exactly once for the latest arm.
	pub fn on_fire(&mut self, arm: u64) -> bool {
		if self.pending.is_none() || arm != self.arm {
			trace!(session = self.session.0, lane = self.lane.name(), arm, current = self.arm, "analysis.scheduler.stale_fire");
			return false;
		}
		self.pending = None;
		true
	}

	/// Drops the pending timer, if any.
	pub fn cancel(&mut self) {
		if let Some(token) = self.pending.take() {
			token.cancel();
		}
	}

	#[inline]
	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	#[inline]
	pub fn lane(&self) -> Lane {
		self.lane
	}

	#[inline]
	pub fn delay(&self) -> IdleDelay {
		self.delay
	}
}

impl Drop for DebounceScheduler {
	fn drop(&mut self) {
		self.cancel();
	}
}
