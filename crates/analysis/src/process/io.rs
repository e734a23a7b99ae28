use std::collections::HashMap;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};

use super::Outbound;
use crate::codec::{ReplyEnvelope, read_message, write_message};
use crate::protocol::Response;
use crate::service::ServiceStatus;
use crate::{Error, Result};

/// Reader outcome forwarded to the I/O loop.
type Inbound = Result<Option<ReplyEnvelope>>;

/// Runs the I/O loop for one service connection.
///
/// Writes are processed strictly in queue order. Replies are matched to
/// pending requests by id and may arrive in any order. Reading happens on a
/// separate task so a write never interrupts a partially received line.
pub(super) async fn run_io<R, W>(
	name: String,
	reader: R,
	mut writer: W,
	mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
	status_tx: watch::Sender<ServiceStatus>,
) where
	R: AsyncBufRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send,
{
	let mut pending: HashMap<u64, oneshot::Sender<Result<Response>>> = HashMap::new();
	let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
	let reader_task = tokio::spawn(read_replies(reader, inbound_tx));

	let final_status = loop {
		tokio::select! {
			out = outbound_rx.recv() => {
				let Some(Outbound { envelope, reply }) = out else {
					tracing::debug!(service = %name, "analysis.io.handle_dropped");
					break ServiceStatus::Stopped;
				};
				match write_message(&mut writer, &envelope).await {
					Ok(()) => {
						pending.insert(envelope.id, reply);
					}
					Err(e) => {
						tracing::error!(service = %name, error = %e, "analysis.io.write_failed");
						let _ = reply.send(Err(e));
						break ServiceStatus::Crashed;
					}
				}
			}

			msg = inbound_rx.recv() => {
				match msg.unwrap_or(Ok(None)) {
					Ok(Some(reply)) => match pending.remove(&reply.id) {
						Some(tx) => {
							let _ = tx.send(reply.into_result());
						}
						None => tracing::debug!(service = %name, id = reply.id, "analysis.io.orphan_reply"),
					},
					Ok(None) => {
						tracing::info!(service = %name, "analysis.io.eof");
						break ServiceStatus::Stopped;
					}
					Err(e) => {
						tracing::error!(service = %name, error = %e, "analysis.io.read_failed");
						break ServiceStatus::Crashed;
					}
				}
			}
		}
	};

	reader_task.abort();
	let _ = status_tx.send(final_status);

	for (_, tx) in pending {
		let _ = tx.send(Err(Error::ServiceStopped));
	}
	while let Ok(out) = outbound_rx.try_recv() {
		let _ = out.reply.send(Err(Error::ServiceStopped));
	}
}

/// Decodes replies until end of stream or the first failure, which is forwarded last.
async fn read_replies<R>(mut reader: R, inbound_tx: mpsc::UnboundedSender<Inbound>)
where
	R: AsyncBufRead + Unpin,
{
	let mut buf = String::new();
	loop {
		let msg = read_message::<ReplyEnvelope, _>(&mut reader, &mut buf).await;
		let last = !matches!(msg, Ok(Some(_)));
		if inbound_tx.send(msg).is_err() || last {
			return;
		}
	}
}
