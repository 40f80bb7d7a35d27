//! Status command handler

use anyhow::Result;

use quotex_core::{Config, Store};

use crate::output::{Output, OutputFormat};

/// Show storage location and row counts
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let counts = store.counts()?;
    let database = config.sqlite_path();
    let database_size = std::fs::metadata(&database).map(|m| m.len()).unwrap_or(0);
    let corpus = config
        .corpus_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(bundled)".to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": database,
                    "database_size": database_size,
                    "corpus": corpus,
                    "chapter_cache_ttl_secs": config.chapter_cache_ttl_secs,
                    "counts": counts,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", counts.promises);
        }
        OutputFormat::Human => {
            println!("QuoteX Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Database: {}", database.display());
            println!("  Size:     {}", human_size(database_size));
            println!();
            println!("Proverbs:");
            println!("  Corpus:    {}", corpus);
            println!("  Cache TTL: {}s", config.chapter_cache_ttl_secs);
            println!();
            println!("Contents:");
            println!("  Categories: {}", counts.categories);
            println!("  Titles:     {}", counts.titles);
            println!("  Subtitles:  {}", counts.subtitles);
            println!("  Promises:   {}", counts.promises);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
