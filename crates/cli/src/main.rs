//! Vigil command-line driver.
//!
//! Runs the editor core without a UI: `check` opens files and prints the
//! errors of one full analysis each, `rename` runs a rename transaction
//! against files on disk.

mod cli;
mod report;
#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_analysis::ServiceHandle;
use vigil_analysis::process::{ProcessConfig, ProcessService};
use vigil_config::{Config, IdleDelay, SchedulerConfig, ServiceConfig};
use vigil_editor::{Editor, FsStore, Status};
use vigil_primitives::{CharIdx, DocumentId};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	let config = match &cli.config {
		Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => Config::load_default()?,
	};
	let service = spawn_service(&config.service)?;
	let mut editor = batch_editor(service);

	let shutdown = CancellationToken::new();
	let interrupt = shutdown.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			interrupt.cancel();
		}
	});

	let failed = match cli.command {
		Command::Check { files } => check(&mut editor, &files, &shutdown).await? > 0,
		Command::Rename { file, offset, new_name } => !rename(&mut editor, &file, offset, &new_name, &shutdown).await?,
	};

	Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn spawn_service(config: &ServiceConfig) -> anyhow::Result<ServiceHandle> {
	let command = config
		.command
		.as_deref()
		.context("no analysis service configured; set `command` under [service]")?;
	let mut process = ProcessConfig::new(command).args(&config.args).env(&config.env).timeout(config.timeout());
	if let Some(cwd) = &config.cwd {
		process = process.cwd(cwd);
	}
	Ok(ServiceHandle::new(ProcessService::spawn(&process)?))
}

/// Editor with both debounce lanes off; batch commands request analyses explicitly.
fn batch_editor(service: ServiceHandle) -> Editor {
	Editor::new(Some(service), Arc::new(FsStore)).with_scheduler(SchedulerConfig {
		change_delay: IdleDelay::Off,
		motion_delay: IdleDelay::Off,
	})
}

/// Analyzes every file once and prints its errors. Returns the number of problems found.
async fn check(editor: &mut Editor, files: &[PathBuf], shutdown: &CancellationToken) -> anyhow::Result<usize> {
	let mut docs = Vec::with_capacity(files.len());
	for path in files {
		let doc = editor
			.open_document(path)
			.await
			.with_context(|| format!("opening {}", path.display()))?;
		docs.push(doc);
	}
	for &doc in &docs {
		editor.reanalyze(doc)?;
	}
	settle(editor, &docs, shutdown).await?;

	let mut problems = 0;
	for &doc in &docs {
		let (Some(document), Some(session)) = (editor.document(doc), editor.session(doc)) else {
			continue;
		};
		match session.status() {
			Status::Unavailable => bail!("analysis service became unavailable"),
			Status::Outdated => {
				eprintln!("{}: analysis failed", document.path().display());
				problems += 1;
			}
			_ => {}
		}
		for record in session.errors().records() {
			println!("{}", report::format_error(document, record));
			problems += 1;
		}
	}
	info!(files = docs.len(), problems, "cli.check.done");
	Ok(problems)
}

/// Runs a rename transaction and prints its report. Returns false if some file was left out.
async fn rename(editor: &mut Editor, file: &Path, offset: CharIdx, new_name: &str, shutdown: &CancellationToken) -> anyhow::Result<bool> {
	let doc = editor
		.open_document(file)
		.await
		.with_context(|| format!("opening {}", file.display()))?;
	let report = editor.rename(doc, offset, new_name).await?;
	print!("{}", report::format_rename(&report));

	let docs: Vec<DocumentId> = editor.documents().map(|document| document.id()).collect();
	if let Err(err) = settle(editor, &docs, shutdown).await {
		warn!(error = %err, "cli.rename.reanalysis_incomplete");
	}
	Ok(!report.is_partial())
}

/// Handles editor events until none of `docs` has an analysis in flight.
async fn settle(editor: &mut Editor, docs: &[DocumentId], shutdown: &CancellationToken) -> anyhow::Result<()> {
	while docs.iter().any(|&doc| editor.status(doc) == Some(Status::Running)) {
		tokio::select! {
			_ = shutdown.cancelled() => bail!("interrupted"),
			event = editor.next_event() => match event {
				Some(event) => editor.handle_event(event),
				None => break,
			},
		}
	}
	debug!(docs = docs.len(), "cli.settled");
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_env("VIGIL_LOG").unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("vigil=debug,vigil_editor=debug,vigil_analysis=debug,info")
			} else {
				EnvFilter::new("warn")
			}
		})
	};

	if let Some(log_dir) = std::env::var("VIGIL_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("vigil.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_span_events(FmtSpan::CLOSE)
				.with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).init();
			info!(path = %log_path.display(), "cli.tracing.file");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}
