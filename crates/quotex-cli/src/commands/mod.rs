//! Command handlers

pub mod backup;
pub mod category;
pub mod config;
pub mod promise;
pub mod quote;
pub mod status;
pub mod subtitle;
pub mod title;
pub mod watch;

use anyhow::{anyhow, Result};

use quotex_core::{Category, Store, Subtitle, Title};

use crate::output::Output;
use crate::prompt::confirm;

/// Look up a category by exact name
pub(crate) fn find_category(store: &Store, name: &str) -> Result<Category> {
    store
        .category_by_name(name)?
        .ok_or_else(|| anyhow!("Category not found: {}", name))
}

/// Look up a title by exact category and title names
pub(crate) fn find_title(store: &Store, category: &str, title: &str) -> Result<Title> {
    let category = find_category(store, category)?;
    store
        .title_by_name(category.id, title)?
        .ok_or_else(|| anyhow!("Title not found: {} / {}", category.name, title))
}

/// Look up a subtitle by exact names at all three levels
pub(crate) fn find_subtitle(
    store: &Store,
    category: &str,
    title: &str,
    subtitle: &str,
) -> Result<Subtitle> {
    let parent = find_title(store, category, title)?;
    store
        .subtitle_by_name(parent.id, subtitle)?
        .ok_or_else(|| anyhow!("Subtitle not found: {} / {} / {}", category, title, subtitle))
}

/// Ask before a destructive change unless `yes` was given
///
/// JSON and quiet output never prompt.
pub(crate) fn confirmed(what: &str, yes: bool, output: &Output) -> Result<bool> {
    if yes || !output.should_prompt() {
        return Ok(true);
    }
    println!("{}", what);
    if confirm("Are you sure?")? {
        Ok(true)
    } else {
        println!("Cancelled.");
        Ok(false)
    }
}
