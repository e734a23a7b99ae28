//! Newline-delimited JSON framing for byte-stream transports.
//!
//! Each message is one JSON object on its own line. Requests travel as
//! [`RequestEnvelope`]s and replies as [`ReplyEnvelope`]s, correlated by `id`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{Request, Response};
use crate::{Error, Result};

/// Outbound request with its correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
	/// Correlation id, unique per transport.
	pub id: u64,
	/// The request itself.
	pub request: Request,
}

/// Inbound reply: exactly one of `response` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
	/// Correlation id copied from the request.
	pub id: u64,
	/// Successful response.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response: Option<Response>,
	/// Failure message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ReplyEnvelope {
	/// Builds a successful reply.
	pub fn ok(id: u64, response: Response) -> Self {
		Self {
			id,
			response: Some(response),
			error: None,
		}
	}

	/// Builds an error reply.
	pub fn err(id: u64, message: impl Into<String>) -> Self {
		Self {
			id,
			response: None,
			error: Some(message.into()),
		}
	}

	/// Converts the envelope into the request outcome.
	pub fn into_result(self) -> Result<Response> {
		match (self.response, self.error) {
			(_, Some(message)) => Err(Error::Remote { message }),
			(Some(response), None) => Ok(response),
			(None, None) => Err(Error::Codec(format!("reply {} has neither response nor error", self.id))),
		}
	}
}

/// Reads the next message, skipping blank lines.
///
/// Returns `Ok(None)` at end of stream.
pub async fn read_message<T, R>(reader: &mut R, buf: &mut String) -> Result<Option<T>>
where
	T: DeserializeOwned,
	R: AsyncBufRead + Unpin,
{
	loop {
		buf.clear();
		if reader.read_line(buf).await? == 0 {
			return Ok(None);
		}
		let line = buf.trim();
		if line.is_empty() {
			continue;
		}
		return Ok(Some(serde_json::from_str(line)?));
	}
}

/// Writes one message followed by a newline and flushes.
pub async fn write_message<T, W>(writer: &mut W, msg: &T) -> Result<()>
where
	T: Serialize,
	W: AsyncWrite + Unpin,
{
	let mut line = serde_json::to_vec(msg)?;
	line.push(b'\n');
	writer.write_all(&line).await?;
	writer.flush().await?;
	Ok(())
}
