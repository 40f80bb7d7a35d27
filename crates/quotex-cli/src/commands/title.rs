//! Title command handlers

use anyhow::{Context, Result};

use quotex_core::Store;

use super::{confirmed, find_category, find_title};
use crate::output::Output;

/// List the titles of a category
pub fn list(store: &Store, category: String, output: &Output) -> Result<()> {
    let category = find_category(store, &category)?;
    let titles = store.titles(category.id)?;
    output.print_titles(&titles);
    Ok(())
}

/// Create a title under an existing category
pub fn add(store: &mut Store, category: String, name: String, output: &Output) -> Result<()> {
    let category = find_category(store, &category)?;
    let title = store
        .create_title(category.id, &name)
        .context("Failed to create title")?;
    output.success(&format!("Created title: {} / {}", category.name, title.name));
    Ok(())
}

/// Rename a title within its category
pub fn rename(
    store: &mut Store,
    category: String,
    name: String,
    new_name: String,
    output: &Output,
) -> Result<()> {
    let title = find_title(store, &category, &name)?;
    let renamed = store
        .rename_title(title.id, &new_name)
        .context("Failed to rename title")?;
    output.success(&format!("Renamed title: {} → {}", title.name, renamed.name));
    Ok(())
}

/// Delete a title with its subtitles and promises
pub fn delete(
    store: &mut Store,
    category: String,
    name: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let title = find_title(store, &category, &name)?;

    let prompt = format!(
        "Delete title '{} / {}' with all of its subtitles and promises",
        category, title.name
    );
    if !confirmed(&prompt, yes, output)? {
        return Ok(());
    }

    let removed = store
        .delete_title(title.id)
        .context("Failed to delete title")?;
    output.success(&format!(
        "Deleted title: {} ({} promise(s) removed)",
        title.name, removed
    ));
    Ok(())
}
