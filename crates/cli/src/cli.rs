use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vigil_primitives::CharIdx;

#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Drive an incremental analysis service from the command line")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (defaults to the user config location)
	#[arg(long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Analyze files once and print their errors
	Check {
		/// Files to analyze.
		#[arg(required = true)]
		files: Vec<PathBuf>,
	},
	/// Rename the identifier at a character offset across all files
	Rename {
		/// File containing the identifier.
		file: PathBuf,
		/// Character offset of the identifier.
		offset: CharIdx,
		/// Replacement name.
		new_name: String,
	},
}
