//! Promise command handlers

use anyhow::{anyhow, Context, Result};

use quotex_core::{NodePath, PromiseId, Store};

use super::{confirmed, find_subtitle};
use crate::output::Output;

/// List promises, either under one subtitle or all of them
pub fn list(store: &Store, path: Option<NodePath>, output: &Output) -> Result<()> {
    let promises = match path {
        Some(path) => {
            let subtitle = find_subtitle(store, &path.category, &path.title, &path.subtitle)?;
            store.promises(subtitle.id)?
        }
        None => store.all_promises()?,
    };
    output.print_promises(&promises);
    Ok(())
}

/// Show one promise
pub fn show(store: &Store, id: i64, output: &Output) -> Result<()> {
    let id = PromiseId(id);
    let promise = store
        .get_promise(id)?
        .ok_or_else(|| anyhow!("Promise not found: {}", id))?;
    let path = store.promise_path(id)?;
    output.print_promise(&promise, path.as_ref());
    Ok(())
}

/// File a new promise under an existing subtitle
pub fn add(
    store: &mut Store,
    path: NodePath,
    verse: String,
    title: Option<String>,
    reference: Option<String>,
    output: &Output,
) -> Result<()> {
    let promise = store
        .create_promise_at(
            &path,
            title.as_deref().unwrap_or_default(),
            &verse,
            reference.as_deref().unwrap_or_default(),
        )
        .context("Failed to create promise")?;

    output.success(&format!("Created promise: {}", promise.id));
    output.print_promise(&promise, Some(&path));
    Ok(())
}

/// Change a promise's title, verse or reference
pub fn edit(
    store: &mut Store,
    id: i64,
    verse: Option<String>,
    title: Option<String>,
    reference: Option<String>,
    output: &Output,
) -> Result<()> {
    let id = PromiseId(id);
    let mut promise = store
        .get_promise(id)?
        .ok_or_else(|| anyhow!("Promise not found: {}", id))?;

    if verse.is_none() && title.is_none() && reference.is_none() {
        output.message("Nothing to change.");
        return Ok(());
    }
    if let Some(verse) = verse {
        promise.verse = verse;
    }
    if let Some(title) = title {
        promise.title = title;
    }
    if let Some(reference) = reference {
        promise.reference = reference;
    }

    store
        .update_promise(&promise)
        .context("Failed to update promise")?;
    output.success(&format!("Updated promise: {}", id));
    Ok(())
}

/// File a promise under a different subtitle
pub fn move_to(store: &mut Store, id: i64, path: NodePath, output: &Output) -> Result<()> {
    let subtitle = find_subtitle(store, &path.category, &path.title, &path.subtitle)?;
    store
        .move_promise(PromiseId(id), subtitle.id)
        .context("Failed to move promise")?;
    output.success(&format!("Moved promise {} to {}", id, path));
    Ok(())
}

/// Delete a promise
pub fn delete(store: &mut Store, id: i64, yes: bool, output: &Output) -> Result<()> {
    let id = PromiseId(id);
    let promise = store
        .get_promise(id)?
        .ok_or_else(|| anyhow!("Promise not found: {}", id))?;

    let label = if promise.title.is_empty() {
        &promise.verse
    } else {
        &promise.title
    };
    if !confirmed(&format!("Delete promise {}: {}", id, label), yes, output)? {
        return Ok(());
    }

    store
        .delete_promise(id)
        .context("Failed to delete promise")?;
    output.success(&format!("Deleted promise: {}", id));
    Ok(())
}

/// Search promises by text, reference or any ancestor name
pub fn search(store: &Store, query: String, output: &Output) -> Result<()> {
    let mut hits = Vec::new();
    for promise in store.search(&query)? {
        let Some(path) = store.promise_path(promise.id)? else {
            continue;
        };
        hits.push((promise, path));
    }
    hits.sort_by(|(a, a_path), (b, b_path)| {
        a_path
            .to_string()
            .cmp(&b_path.to_string())
            .then(a.id.0.cmp(&b.id.0))
    });
    output.print_search_results(&hits);
    Ok(())
}
