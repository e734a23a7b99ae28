//! Configuration system for Vigil.
//!
//! Configuration is written in TOML. Every section and key is optional:
//!
//! ```toml
//! [service]
//! command = "vigil-analyzer"
//! args = ["--stdio"]
//! timeout_secs = 30
//!
//! [service.env]
//! ANALYZER_LOG = "warn"
//!
//! [scheduler]
//! change_delay_ms = 500   # idle time after an edit before re-analysis
//! motion_delay_ms = "off" # disable hover/highlight queries entirely
//! ```
//!
//! # Configuration Files
//!
//! Vigil looks for `$XDG_CONFIG_HOME/vigil/config.toml` (or the platform
//! equivalent) unless an explicit path is given.

pub mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::{ConfigError, Result};
use serde::Deserialize;

/// Default idle delay after an edit before a full re-analysis is requested.
pub const DEFAULT_CHANGE_DELAY: Duration = Duration::from_millis(500);

/// Default idle delay after cursor motion before a point query is issued.
pub const DEFAULT_MOTION_DELAY: Duration = Duration::from_millis(200);

/// Default analysis request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parsed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// How to reach the analysis service.
	pub service: ServiceConfig,
	/// Debounce timings.
	pub scheduler: SchedulerConfig,
}

/// Analysis service process settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
	/// Command that starts the service. `None` leaves analysis unavailable.
	pub command: Option<String>,
	/// Arguments to pass to the command.
	pub args: Vec<String>,
	/// Environment variables to set.
	pub env: HashMap<String, String>,
	/// Working directory for the service.
	pub cwd: Option<PathBuf>,
	/// Request timeout in seconds.
	pub timeout_secs: u64,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			command: None,
			args: Vec::new(),
			env: HashMap::new(),
			cwd: None,
			timeout_secs: DEFAULT_TIMEOUT_SECS,
		}
	}
}

impl ServiceConfig {
	/// Request timeout as a duration.
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

/// Idle delays for the two debounce lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
	/// Delay after the last edit before re-analysis.
	#[serde(rename = "change_delay_ms")]
	pub change_delay: IdleDelay,
	/// Delay after the last cursor or viewport motion before a point query.
	#[serde(rename = "motion_delay_ms")]
	pub motion_delay: IdleDelay,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			change_delay: IdleDelay::After(DEFAULT_CHANGE_DELAY),
			motion_delay: IdleDelay::After(DEFAULT_MOTION_DELAY),
		}
	}
}

/// Idle delay of a debounce lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDelay")]
pub enum IdleDelay {
	/// The lane never schedules anything.
	Off,
	/// Fire once the lane has been idle for this long.
	After(Duration),
}

impl IdleDelay {
	/// Returns the delay, or `None` when the lane is disabled.
	pub fn duration(self) -> Option<Duration> {
		match self {
			Self::Off => None,
			Self::After(delay) => Some(delay),
		}
	}

	/// Shorthand for [`IdleDelay::After`] in milliseconds.
	pub const fn millis(ms: u64) -> Self {
		Self::After(Duration::from_millis(ms))
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDelay {
	Millis(u64),
	Flag(bool),
	Word(String),
}

impl TryFrom<RawDelay> for IdleDelay {
	type Error = ConfigError;

	fn try_from(raw: RawDelay) -> Result<Self> {
		match raw {
			RawDelay::Millis(ms) => Ok(Self::millis(ms)),
			RawDelay::Flag(false) => Ok(Self::Off),
			RawDelay::Word(word) if word.eq_ignore_ascii_case("off") || word.eq_ignore_ascii_case("none") => Ok(Self::Off),
			RawDelay::Flag(true) => Err(ConfigError::InvalidDelay("true".into())),
			RawDelay::Word(word) => Err(ConfigError::InvalidDelay(word)),
		}
	}
}

impl Config {
	/// Parses configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	/// Loads configuration from a file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Loads the user configuration file, falling back to defaults if it does not exist.
	pub fn load_default() -> Result<Self> {
		match Self::default_path() {
			Some(path) if path.exists() => Self::load(&path),
			_ => Ok(Self::default()),
		}
	}

	/// Location of the user configuration file.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("vigil").join("config.toml"))
	}
}
