//! Implementation of the `holdall list` command.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use holdall_lib::home::Home;
use holdall_lib::home::repositories::RepositoryIndex;

use crate::output::truncate_hash;

/// Execute the list command.
///
/// Prints each stored bundle's `name-version` key and a shortened digest.
pub fn cmd_list() -> Result<()> {
  let home = Home::default_home();
  home.ensure().context("failed to initialize local storage")?;

  let index = RepositoryIndex::load(&home.repositories())?;
  if index.is_empty() {
    println!("no bundles in local storage");
    return Ok(());
  }

  for (key, digest) in index.iter() {
    println!("{}  {}", key, truncate_hash(digest).dimmed());
  }
  Ok(())
}
