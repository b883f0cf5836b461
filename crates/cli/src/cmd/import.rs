//! Implementation of the `holdall import` command.
//!
//! Extracts a gzipped tar archive, validates the embedded bundle
//! definition, and commits it to local storage. An omitted or empty
//! destination keeps only the store copy; an explicit destination also
//! retains the unpacked archive there.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::info;

use holdall_lib::home::Home;
use holdall_lib::imagestore::archive::ArchiveLayoutBuilder;
use holdall_lib::packager::Importer;

use crate::output::symbols;

/// Execute the import command.
pub fn cmd_import(source: &Path, destination: Option<&Path>, verbose: bool) -> Result<()> {
  // An empty destination routes to local storage, same as omitting it.
  let destination = destination.filter(|dir| !dir.as_os_str().is_empty());

  let home = Home::default_home();
  home.ensure().context("failed to initialize local storage")?;

  let importer = Importer::new(source, destination, verbose)?;

  let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  rt.block_on(importer.import(&home, Box::new(ArchiveLayoutBuilder::new())))?;

  info!(home = %home.root().display(), "bundle stored");
  println!("{} imported {}", symbols::SUCCESS.green(), source.display());
  Ok(())
}
