//! Child-process transport for the analysis service.
//!
//! Spawns the configured command and exchanges newline-delimited JSON
//! envelopes (see [`crate::codec`]) over its stdin/stdout. One I/O task per
//! process owns both pipes; callers talk to it through an unbounded queue
//! and receive replies on per-request oneshot channels.

mod io;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};

use crate::codec::RequestEnvelope;
use crate::protocol::{Request, Response};
use crate::service::{AnalysisService, ServiceStatus};
use crate::{Error, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for spawning the analysis service.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
	/// Command to spawn.
	pub command: String,
	/// Arguments to pass to the command.
	pub args: Vec<String>,
	/// Environment variables to set.
	pub env: HashMap<String, String>,
	/// Working directory for the process.
	pub cwd: Option<PathBuf>,
	/// Per-request timeout.
	pub timeout: Duration,
}

impl ProcessConfig {
	/// Create a new process configuration.
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			args: Vec::new(),
			env: HashMap::new(),
			cwd: None,
			timeout: DEFAULT_TIMEOUT,
		}
	}

	/// Add command line arguments.
	pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	/// Add environment variables.
	pub fn env(mut self, env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
		self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
		self
	}

	/// Set the working directory.
	pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}

	/// Set the request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

/// A request queued for the I/O task.
pub(super) struct Outbound {
	pub(super) envelope: RequestEnvelope,
	pub(super) reply: oneshot::Sender<Result<Response>>,
}

/// Analysis service reached over a byte stream, usually a child process.
pub struct ProcessService {
	name: String,
	outbound_tx: mpsc::UnboundedSender<Outbound>,
	next_id: AtomicU64,
	timeout: Duration,
	status_rx: watch::Receiver<ServiceStatus>,
	/// Held so the process is killed when the service is dropped.
	child: Mutex<Option<Child>>,
}

impl std::fmt::Debug for ProcessService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProcessService")
			.field("name", &self.name)
			.field("status", &*self.status_rx.borrow())
			.finish_non_exhaustive()
	}
}

impl ProcessService {
	/// Spawns the service process. Must be called within a tokio runtime.
	pub fn spawn(cfg: &ProcessConfig) -> Result<Self> {
		let mut cmd = Command::new(&cfg.command);
		cmd.args(&cfg.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);

		for (key, value) in &cfg.env {
			cmd.env(key, value);
		}
		if let Some(cwd) = &cfg.cwd {
			cmd.current_dir(cwd);
		}

		let mut child = cmd.spawn().map_err(|e| Error::Spawn {
			command: cfg.command.clone(),
			reason: e.to_string(),
		})?;

		let stdin = child.stdin.take().ok_or_else(|| Error::Spawn {
			command: cfg.command.clone(),
			reason: "failed to capture stdin".into(),
		})?;
		let stdout = child.stdout.take().ok_or_else(|| Error::Spawn {
			command: cfg.command.clone(),
			reason: "failed to capture stdout".into(),
		})?;

		tracing::info!(command = %cfg.command, args = ?cfg.args, "analysis.process.spawned");

		let service = Self::from_io(cfg.command.clone(), BufReader::new(stdout), stdin, cfg.timeout);
		*service.child.lock() = Some(child);
		Ok(service)
	}

	/// Connects to a service over an already established byte stream.
	pub fn from_io<R, W>(name: impl Into<String>, reader: R, writer: W, timeout: Duration) -> Self
	where
		R: AsyncBufRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let name = name.into();
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (status_tx, status_rx) = watch::channel(ServiceStatus::Running);

		tokio::spawn(io::run_io(name.clone(), reader, writer, outbound_rx, status_tx));

		Self {
			name,
			outbound_tx,
			next_id: AtomicU64::new(1),
			timeout,
			status_rx,
			child: Mutex::new(None),
		}
	}

	/// Current reachability.
	pub fn current_status(&self) -> ServiceStatus {
		*self.status_rx.borrow()
	}
}

#[async_trait]
impl AnalysisService for ProcessService {
	async fn call(&self, request: Request) -> Result<Response> {
		if !self.current_status().is_running() {
			return Err(Error::ServiceStopped);
		}

		let kind = request.kind();
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let (reply, reply_rx) = oneshot::channel();
		self.outbound_tx
			.send(Outbound {
				envelope: RequestEnvelope { id, request },
				reply,
			})
			.map_err(|_| Error::ServiceStopped)?;

		match tokio::time::timeout(self.timeout, reply_rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(Error::ServiceStopped),
			Err(_) => {
				tracing::warn!(service = %self.name, id, %kind, "analysis.process.timeout");
				Err(Error::Timeout { kind })
			}
		}
	}

	fn status(&self) -> Option<watch::Receiver<ServiceStatus>> {
		Some(self.status_rx.clone())
	}
}
