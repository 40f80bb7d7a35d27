//! Category command handlers

use anyhow::{Context, Result};

use quotex_core::Store;

use super::{confirmed, find_category};
use crate::output::Output;

/// List all categories
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let categories = store.categories()?;
    output.print_categories(&categories);
    Ok(())
}

/// Create a new, empty category
pub fn add(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let category = store
        .create_category(&name)
        .context("Failed to create category")?;
    output.success(&format!("Created category: {}", category.name));
    Ok(())
}

/// Rename a category; its titles, subtitles and promises follow
pub fn rename(store: &mut Store, name: String, new_name: String, output: &Output) -> Result<()> {
    let category = find_category(store, &name)?;
    let renamed = store
        .rename_category(category.id, &new_name)
        .context("Failed to rename category")?;
    output.success(&format!("Renamed category: {} → {}", category.name, renamed.name));
    Ok(())
}

/// Delete a category and everything under it
pub fn delete(store: &mut Store, name: String, yes: bool, output: &Output) -> Result<()> {
    let category = find_category(store, &name)?;

    let prompt = format!(
        "Delete category '{}' with all of its titles, subtitles and promises",
        category.name
    );
    if !confirmed(&prompt, yes, output)? {
        return Ok(());
    }

    let removed = store
        .delete_category(category.id)
        .context("Failed to delete category")?;
    output.success(&format!(
        "Deleted category: {} ({} promise(s) removed)",
        category.name, removed
    ));
    Ok(())
}
