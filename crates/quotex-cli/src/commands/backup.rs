//! Backup command handlers
//!
//! Backups use the flat legacy row layout, so files written by older
//! versions can be imported and vice versa.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quotex_core::storage::{read_backup, write_backup};
use quotex_core::Store;

use crate::output::Output;

/// Write every promise (and every empty node) to a backup
///
/// Without a file the JSON goes to stdout.
pub fn export(store: &Store, file: Option<PathBuf>, output: &Output) -> Result<()> {
    let rows = store.export_rows().context("Failed to export promises")?;

    match file {
        Some(path) => {
            write_backup(&path, &rows)
                .with_context(|| format!("Failed to write backup: {:?}", path))?;
            output.success(&format!("Exported {} row(s) to {}", rows.len(), path.display()));
        }
        None => {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("Failed to serialize backup")?
            );
        }
    }
    Ok(())
}

/// Merge a backup into the store
pub fn import(store: &mut Store, file: PathBuf, output: &Output) -> Result<()> {
    let rows =
        read_backup(&file).with_context(|| format!("Failed to read backup: {:?}", file))?;
    let report = store
        .import_rows(&rows)
        .context("Failed to import backup")?;
    output.print_import_report(&report);
    Ok(())
}
