use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// holdall - portable application bundle packager
#[derive(Parser)]
#[command(name = "holdall")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Accept an empty destination value; clap's default `PathBuf` parser
/// rejects empty strings, but an empty destination is a documented input
/// (routes to local storage, handled downstream in `cmd_import`).
fn parse_destination(value: &str) -> Result<PathBuf, std::convert::Infallible> {
  Ok(PathBuf::from(value))
}

#[derive(Subcommand)]
enum Commands {
  /// Import a bundle archive into local storage
  Import {
    /// Path to the gzipped tar archive
    source: PathBuf,

    /// Location to unpack the bundle (omitted or empty: local storage only)
    #[arg(short, long, value_parser = parse_destination)]
    destination: Option<PathBuf>,
  },

  /// Export an extracted bundle layout as a gzipped tar archive
  Export {
    /// Path to an extracted bundle directory (bundle.json + images/)
    bundle_dir: PathBuf,

    /// Directory to write the archive into (default: current directory)
    #[arg(short, long)]
    destination: Option<PathBuf>,
  },

  /// List bundles in local storage
  List,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .without_time()
    .init();

  match cli.command {
    Commands::Import { source, destination } => cmd::cmd_import(&source, destination.as_deref(), cli.verbose),
    Commands::Export {
      bundle_dir,
      destination,
    } => cmd::cmd_export(&bundle_dir, destination.as_deref()),
    Commands::List => cmd::cmd_list(),
  }
}
