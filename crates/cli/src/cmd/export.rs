//! Implementation of the `holdall export` command.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;

use holdall_lib::imagestore::archive::ArchiveLayoutBuilder;
use holdall_lib::packager::Exporter;

use crate::output::symbols;

/// Execute the export command.
///
/// Packs an extracted bundle layout into `<name>-<version>.tgz` at the
/// destination (default: the current directory).
pub fn cmd_export(bundle_dir: &Path, destination: Option<&Path>) -> Result<()> {
  let exporter = Exporter::new(bundle_dir, destination)?;
  let archive = exporter.export(Box::new(ArchiveLayoutBuilder::new()))?;

  println!(
    "{} {} {} {}",
    symbols::SUCCESS.green(),
    bundle_dir.display(),
    symbols::ARROW,
    archive.display()
  );
  Ok(())
}
