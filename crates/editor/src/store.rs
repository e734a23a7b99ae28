//! Document persistence.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// Loads and saves document contents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
	async fn load(&self, path: &Path) -> io::Result<String>;
	async fn save(&self, path: &Path, text: &str) -> io::Result<()>;
}

/// Store backed by the local filesystem.
///
/// Saves write a sibling temporary file and rename it over the target, so a
/// failed save never leaves a truncated file behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

#[async_trait]
impl DocumentStore for FsStore {
	async fn load(&self, path: &Path) -> io::Result<String> {
		tokio::fs::read_to_string(path).await
	}

	async fn save(&self, path: &Path, text: &str) -> io::Result<()> {
		let file_name = path
			.file_name()
			.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("not a file path: {}", path.display())))?;
		let mut temp_name = file_name.to_os_string();
		temp_name.push(".vigil-save");
		let temp = path.with_file_name(temp_name);

		tokio::fs::write(&temp, text).await?;
		if let Err(err) = tokio::fs::rename(&temp, path).await {
			let _ = tokio::fs::remove_file(&temp).await;
			return Err(err);
		}
		debug!(path = ?path, bytes = text.len(), "analysis.store.saved");
		Ok(())
	}
}

/// In-memory store with injectable save failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
	files: Mutex<HashMap<PathBuf, String>>,
	failing: Mutex<HashSet<PathBuf>>,
	saves: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces a file.
	pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
		self.files.lock().insert(path.into(), text.into());
	}

	pub fn get(&self, path: &Path) -> Option<String> {
		self.files.lock().get(path).cloned()
	}

	/// Makes every later save of `path` fail.
	pub fn fail_saves_to(&self, path: impl Into<PathBuf>) {
		self.failing.lock().insert(path.into());
	}

	/// Paths successfully saved, in order.
	pub fn saves(&self) -> Vec<PathBuf> {
		self.saves.lock().clone()
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn load(&self, path: &Path) -> io::Result<String> {
		self.get(path)
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
	}

	async fn save(&self, path: &Path, text: &str) -> io::Result<()> {
		if self.failing.lock().contains(path) {
			return Err(io::Error::new(io::ErrorKind::PermissionDenied, format!("{} is read-only", path.display())));
		}
		self.files.lock().insert(path.to_path_buf(), text.to_string());
		self.saves.lock().push(path.to_path_buf());
		Ok(())
	}
}
