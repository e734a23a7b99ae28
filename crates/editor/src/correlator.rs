//! Sending generation-stamped requests and routing their responses.
//!
//! Requests are stamped with the session's `requested` generation and run as
//! spawned tasks. Their results come back through the editor's event channel
//! as [`Delivery`] values, in whatever order the service finishes them, and
//! [`Editor::on_response`] decides per delivery whether it still describes
//! the current buffer.
//!
//! Requests whose relative order matters to the service (tokenizer updates,
//! session deletion, tokenizer queries) go through a [`SerialQueue`] instead,
//! which runs one call at a time in submission order.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;
use vigil_analysis::RequestKind;
use vigil_primitives::{Generation, SessionId};

use crate::decoration::{Layer, LayerContents};
use crate::editor::Editor;
use crate::events::{Delivery, EditorEvent, Outcome};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs submitted service calls one after another.
#[derive(Debug)]
pub(crate) struct SerialQueue {
	jobs: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
	fn spawn() -> Self {
		let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
		tokio::spawn(async move {
			while let Some(job) = rx.recv().await {
				job.await;
			}
		});
		Self { jobs }
	}
}

impl Editor {
	/// Spawns a session-scoped request and posts its result as a [`Delivery`].
	pub(crate) fn dispatch<F>(&self, session: SessionId, kind: RequestKind, stamp: Generation, call: F)
	where
		F: Future<Output = vigil_analysis::Result<(Generation, Outcome)>> + Send + 'static,
	{
		let events = self.events_tx.clone();
		tokio::spawn(async move {
			let delivery = match call.await {
				Ok((generation, outcome)) => Delivery {
					session,
					kind,
					generation,
					result: Ok(outcome),
				},
				Err(err) => Delivery {
					session,
					kind,
					generation: stamp,
					result: Err(err),
				},
			};
			let _ = events.send(EditorEvent::Response(delivery));
		});
	}

	/// Queues an ordered call whose only interesting outcome is failure.
	pub(crate) fn enqueue<F>(&mut self, kind: RequestKind, call: F)
	where
		F: Future<Output = vigil_analysis::Result<()>> + Send + 'static,
	{
		let events = self.events_tx.clone();
		self.enqueue_job(async move {
			if let Err(error) = call.await {
				let _ = events.send(EditorEvent::RequestFailed { kind, error });
			}
		});
	}

	/// Queues an ordered job.
	pub(crate) fn enqueue_job(&mut self, job: impl Future<Output = ()> + Send + 'static) {
		let queue = self.serial.get_or_insert_with(SerialQueue::spawn);
		if let Err(mpsc::error::SendError(job)) = queue.jobs.send(Box::pin(job)) {
			// Worker gone with its runtime; start over.
			let queue = SerialQueue::spawn();
			let _ = queue.jobs.send(job);
			self.serial = Some(queue);
		}
	}

	/// Sends a full re-analysis of the session's document. Returns false when
	/// nothing was sent because the service or session is not available.
	pub(crate) fn request_full_analysis(&mut self, id: SessionId) -> bool {
		let Some(service) = self.service.clone().filter(|_| self.reachable) else {
			debug!(session = id.0, "analysis.correlator.unavailable");
			return false;
		};
		let Some(session) = self.sessions.get_mut(id) else {
			return false;
		};
		let Some(remote) = session.remote else {
			debug!(session = id.0, "analysis.correlator.no_remote");
			return false;
		};
		let Some(document) = self.documents.get(&session.doc) else {
			return false;
		};

		let generation = session.generation.requested();
		let text = document.contents();
		session.status.on_request_sent();
		debug!(session = id.0, generation = generation.0, chars = document.len_chars(), "analysis.correlator.full_reanalyze");

		self.dispatch(id, RequestKind::FullReanalyze, generation, async move {
			let (generation, analysis) = service.full_reanalyze(remote, generation, text).await?;
			Ok((generation, Outcome::Analysis(analysis)))
		});
		true
	}

	/// Runs the motion lane's action for a session.
	///
	/// Skipped while the host shows a completion popup. When the last full
	/// analysis is not up to date there is nothing reliable to query, so the
	/// point layer is emptied instead.
	pub(crate) fn run_motion_query(&mut self, id: SessionId) {
		let reachable = self.reachable;
		let service = self.service.clone();
		let Some(session) = self.sessions.get_mut(id) else {
			return;
		};
		if self.host.completion_active(session.doc) {
			debug!(session = id.0, "analysis.motion.completion_active");
			return;
		}

		let ready = session.generation.is_up_to_date() && reachable;
		let target = session.remote.zip(service).filter(|_| ready);
		let Some((remote, service)) = target else {
			debug!(session = id.0, up_to_date = session.generation.is_up_to_date(), reachable, "analysis.motion.not_ready");
			session.decorations.replace_all(Layer::Point, LayerContents::default());
			return;
		};
		let Some(document) = self.documents.get(&session.doc) else {
			return;
		};

		let viewport = session.viewport.char_bounds(document.text().slice(..));
		let point = session.cursor;
		let motion = session.motion_epoch;
		let generation = session.generation.requested();
		debug!(session = id.0, generation = generation.0, point, motion, "analysis.correlator.point_query");

		self.dispatch(id, RequestKind::PointQuery, generation, async move {
			let (generation, info) = service.point_query(remote, generation, point, viewport).await?;
			Ok((generation, Outcome::Point { info, motion }))
		});
	}

	/// Applies or discards a completed request.
	///
	/// Full analyses pass through [`mark_applied`](crate::GenerationTracker::mark_applied).
	/// Point results must match the current generation and must have been
	/// sent for the current cursor position. Anything else is stale and
	/// dropped without side effects.
	pub fn on_response(&mut self, delivery: Delivery) {
		let Delivery {
			session: id,
			kind,
			generation,
			result,
		} = delivery;

		let outcome = match result {
			Ok(outcome) => outcome,
			Err(error) => {
				if kind == RequestKind::FullReanalyze
					&& let Some(session) = self.sessions.get_mut(id)
					&& session.generation.is_current(generation)
				{
					session.status.on_request_failed();
				}
				self.service_failed(kind, &error);
				return;
			}
		};

		let Some(session) = self.sessions.get_mut(id) else {
			debug!(session = id.0, kind = %kind, "analysis.correlator.unknown_session");
			return;
		};

		match outcome {
			Outcome::Analysis(analysis) => {
				if session.generation.applied() == Some(generation) {
					debug!(session = id.0, generation = generation.0, "analysis.correlator.duplicate");
					return;
				}
				if !session.generation.mark_applied(generation) {
					debug!(
						session = id.0,
						generation = generation.0,
						requested = session.generation.requested().0,
						"analysis.correlator.stale"
					);
					return;
				}
				debug!(session = id.0, generation = generation.0, errors = analysis.errors.len(), "analysis.correlator.applied");
				session.apply_analysis(analysis);
			}
			Outcome::Point { info, motion } => {
				if !session.generation.is_current(generation) || motion != session.motion_epoch {
					debug!(
						session = id.0,
						generation = generation.0,
						requested = session.generation.requested().0,
						motion,
						current_motion = session.motion_epoch,
						"analysis.correlator.stale_point"
					);
					return;
				}
				session.decorations.replace_all(Layer::Point, LayerContents::from_point(info));
			}
		}
	}
}

#[cfg(test)]
mod tests;
