//! Scripted service, journaled store and recording host for editor tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use vigil_analysis::{AnalysisService, Error, FileRenameGroup, FullAnalysis, PointInfo, Request, RequestKind, Response, ServiceHandle};
use vigil_config::{IdleDelay, SchedulerConfig};
use vigil_primitives::{DocumentId, Generation, RemoteSessionId, Span};

use crate::editor::Editor;
use crate::host::EditorHost;
use crate::store::{DocumentStore, MemoryStore};

/// One observable side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Entry {
	Request(Request),
	Saved(PathBuf),
}

#[derive(Default)]
struct Script {
	journal: Vec<Entry>,
	analysis: FullAnalysis,
	point: PointInfo,
	rename: FileRenameGroup,
	description: Option<String>,
	indent: u32,
	down: bool,
	rejected_create: Option<String>,
	next_remote: u64,
}

/// In-memory service that answers immediately from a script and journals every request.
#[derive(Clone, Default)]
pub(crate) struct ScriptedService {
	script: Arc<Mutex<Script>>,
}

impl ScriptedService {
	pub(crate) fn handle(&self) -> ServiceHandle {
		ServiceHandle::new(self.clone())
	}

	pub(crate) fn set_analysis(&self, analysis: FullAnalysis) {
		self.script.lock().analysis = analysis;
	}

	pub(crate) fn set_point(&self, point: PointInfo) {
		self.script.lock().point = point;
	}

	pub(crate) fn set_rename(&self, group: FileRenameGroup) {
		self.script.lock().rename = group;
	}

	pub(crate) fn set_description(&self, text: &str) {
		self.script.lock().description = Some(text.to_string());
	}

	pub(crate) fn set_indent(&self, column: u32) {
		self.script.lock().indent = column;
	}

	/// Makes every call fail as if the transport closed.
	pub(crate) fn set_down(&self, down: bool) {
		self.script.lock().down = down;
	}

	/// Rejects `create-session` for a buffer with exactly this text.
	pub(crate) fn reject_create_for(&self, text: Option<&str>) {
		self.script.lock().rejected_create = text.map(str::to_string);
	}

	pub(crate) fn record_save(&self, path: &Path) {
		self.script.lock().journal.push(Entry::Saved(path.to_path_buf()));
	}

	pub(crate) fn journal(&self) -> Vec<Entry> {
		self.script.lock().journal.clone()
	}

	pub(crate) fn requests(&self, kind: RequestKind) -> Vec<Request> {
		self.journal()
			.into_iter()
			.filter_map(|entry| match entry {
				Entry::Request(request) if request.kind() == kind => Some(request),
				_ => None,
			})
			.collect()
	}

	/// Generations of the full-reanalyze requests sent so far.
	pub(crate) fn reanalyzed_generations(&self) -> Vec<Generation> {
		self.requests(RequestKind::FullReanalyze)
			.iter()
			.filter_map(Request::generation)
			.collect()
	}
}

#[async_trait]
impl AnalysisService for ScriptedService {
	async fn call(&self, request: Request) -> vigil_analysis::Result<Response> {
		let mut script = self.script.lock();
		if script.down {
			return Err(Error::ServiceStopped);
		}
		script.journal.push(Entry::Request(request.clone()));
		let response = match request {
			Request::Ping => Response::Pong,
			Request::CreateSession { text } if script.rejected_create.as_deref() == Some(text.as_str()) => {
				return Err(Error::Remote {
					message: "cannot create session".into(),
				});
			}
			Request::CreateSession { .. } => {
				script.next_remote += 1;
				Response::SessionCreated {
					session: RemoteSessionId(script.next_remote),
				}
			}
			Request::DeleteSession { .. } | Request::TokCreate { .. } => Response::Ack,
			Request::FullReanalyze { generation, .. } => Response::Analysis {
				generation,
				analysis: script.analysis.clone(),
			},
			Request::PointQuery { generation, .. } => Response::Point {
				generation,
				info: script.point.clone(),
			},
			Request::RenameQuery { .. } => Response::RenameGroup {
				group: script.rename.clone(),
			},
			Request::DocLinkQuery { .. } => Response::DocLink { link: None },
			Request::Describe { .. } => Response::Description {
				text: script.description.clone(),
			},
			Request::TokUpdate { generation, .. } => Response::TokenUpdated { generation },
			Request::GetTokens { generation, .. } => Response::Tokens {
				generation,
				tokens: Vec::new(),
			},
			Request::IndentAmount { generation, .. } => Response::Indent {
				generation,
				column: script.indent,
			},
			Request::GroupingMove {
				generation, point, count, ..
			} => Response::Moved {
				generation,
				point: point + count as usize,
			},
		};
		Ok(response)
	}
}

/// Memory store that also journals successful saves into the service journal.
pub(crate) struct JournalStore {
	pub(crate) files: Arc<MemoryStore>,
	service: ScriptedService,
}

#[async_trait]
impl DocumentStore for JournalStore {
	async fn load(&self, path: &Path) -> io::Result<String> {
		self.files.load(path).await
	}

	async fn save(&self, path: &Path, text: &str) -> io::Result<()> {
		self.files.save(path, text).await?;
		self.service.record_save(path);
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCall {
	Fallback(isize),
	Navigate(PathBuf, Span),
	Message(String),
}

/// Host that records every callback.
#[derive(Default)]
pub(crate) struct RecordingHost {
	pub(crate) completion: AtomicBool,
	calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
	pub(crate) fn calls(&self) -> Vec<HostCall> {
		self.calls.lock().clone()
	}
}

impl EditorHost for RecordingHost {
	fn completion_active(&self, _doc: DocumentId) -> bool {
		self.completion.load(Ordering::SeqCst)
	}

	fn fallback_error_step(&self, _doc: DocumentId, delta: isize) {
		self.calls.lock().push(HostCall::Fallback(delta));
	}

	fn navigate(&self, file: &Path, span: Span) {
		self.calls.lock().push(HostCall::Navigate(file.to_path_buf(), span));
	}

	fn show_message(&self, message: &str) {
		self.calls.lock().push(HostCall::Message(message.to_string()));
	}
}

/// Delays used by editor tests: long enough to tell bursts apart under paused time.
pub(crate) const CHANGE_DELAY_MS: u64 = 500;
pub(crate) const MOTION_DELAY_MS: u64 = 200;

pub(crate) struct Harness {
	pub(crate) editor: Editor,
	pub(crate) service: ScriptedService,
	pub(crate) files: Arc<MemoryStore>,
	pub(crate) host: Arc<RecordingHost>,
}

impl Harness {
	pub(crate) fn new() -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
		let service = ScriptedService::default();
		let files = Arc::new(MemoryStore::new());
		let host = Arc::new(RecordingHost::default());
		let store = JournalStore {
			files: files.clone(),
			service: service.clone(),
		};
		let editor = Editor::new(Some(service.handle()), Arc::new(store))
			.with_host(host.clone())
			.with_scheduler(SchedulerConfig {
				change_delay: IdleDelay::millis(CHANGE_DELAY_MS),
				motion_delay: IdleDelay::millis(MOTION_DELAY_MS),
			});
		Self {
			editor,
			service,
			files,
			host,
		}
	}

	/// Lets spawned service calls finish and handles their events, without advancing time.
	pub(crate) async fn settle(&mut self) {
		loop {
			for _ in 0..8 {
				tokio::task::yield_now().await;
			}
			if self.editor.drain_events() == 0 {
				break;
			}
		}
	}

	/// Waits for the next timer (advancing paused time), handles it, then settles.
	pub(crate) async fn fire_next(&mut self) {
		self.editor.pump().await;
		self.settle().await;
	}
}
