//! Subtitle command handlers

use anyhow::{Context, Result};

use quotex_core::Store;

use super::{confirmed, find_subtitle, find_title};
use crate::output::Output;

/// List the subtitles of a title
pub fn list(store: &Store, category: String, title: String, output: &Output) -> Result<()> {
    let title = find_title(store, &category, &title)?;
    let subtitles = store.subtitles(title.id)?;
    output.print_subtitles(&subtitles);
    Ok(())
}

/// Create a subtitle under an existing title
pub fn add(
    store: &mut Store,
    category: String,
    title: String,
    name: String,
    output: &Output,
) -> Result<()> {
    let parent = find_title(store, &category, &title)?;
    let subtitle = store
        .create_subtitle(parent.id, &name)
        .context("Failed to create subtitle")?;
    output.success(&format!(
        "Created subtitle: {} / {} / {}",
        category, parent.name, subtitle.name
    ));
    Ok(())
}

/// Rename a subtitle within its title
pub fn rename(
    store: &mut Store,
    category: String,
    title: String,
    name: String,
    new_name: String,
    output: &Output,
) -> Result<()> {
    let subtitle = find_subtitle(store, &category, &title, &name)?;
    let renamed = store
        .rename_subtitle(subtitle.id, &new_name)
        .context("Failed to rename subtitle")?;
    output.success(&format!(
        "Renamed subtitle: {} → {}",
        subtitle.name, renamed.name
    ));
    Ok(())
}

/// Delete a subtitle and its promises
pub fn delete(
    store: &mut Store,
    category: String,
    title: String,
    name: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let subtitle = find_subtitle(store, &category, &title, &name)?;

    let prompt = format!(
        "Delete subtitle '{} / {} / {}' with all of its promises",
        category, title, subtitle.name
    );
    if !confirmed(&prompt, yes, output)? {
        return Ok(());
    }

    let removed = store
        .delete_subtitle(subtitle.id)
        .context("Failed to delete subtitle")?;
    output.success(&format!(
        "Deleted subtitle: {} ({} promise(s) removed)",
        subtitle.name, removed
    ));
    Ok(())
}
