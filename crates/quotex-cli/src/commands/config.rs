//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quotex_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "corpus_path": config.corpus_path,
                    "chapter_cache_ttl_secs": config.chapter_cache_ttl_secs,
                    "log_level": config.log_level,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:               {}", config.data_dir.display());
            println!(
                "  corpus_path:            {}",
                display_or_unset(config.corpus_path.as_ref().map(|p| p.display().to_string()))
            );
            println!(
                "  chapter_cache_ttl_secs: {}",
                config.chapter_cache_ttl_secs
            );
            println!("  log_level:              {}", config.log_level);
            println!(
                "  log_file:               {}",
                display_or_unset(config.log_file.as_ref().map(|p| p.display().to_string()))
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value and save the config file
pub fn set(mut config: Config, key: String, value: String, output: &Output) -> Result<()> {
    apply(&mut config, &key, &value)?;
    config.save().context("Failed to save configuration")?;
    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "corpus_path" => {
            config.corpus_path = optional(value).map(PathBuf::from);
        }
        "chapter_cache_ttl_secs" => {
            config.chapter_cache_ttl_secs = value
                .parse()
                .context("Invalid value for chapter_cache_ttl_secs. Use a number of seconds.")?;
        }
        "log_level" => {
            const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
            if !LEVELS.contains(&value) {
                bail!("Invalid log_level '{}'. Use one of: {}", value, LEVELS.join(", "));
            }
            config.log_level = value.to_string();
        }
        "log_file" => {
            config.log_file = optional(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, corpus_path, chapter_cache_ttl_secs, log_level, log_file",
                key
            );
        }
    }
    Ok(())
}

/// Empty or "none" clears an optional value
fn optional(value: &str) -> Option<&str> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value)
    }
}

fn display_or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "corpus_path", "/tmp/proverbs.json").unwrap();
        assert_eq!(config.corpus_path, Some(PathBuf::from("/tmp/proverbs.json")));

        apply(&mut config, "corpus_path", "none").unwrap();
        assert_eq!(config.corpus_path, None);

        apply(&mut config, "chapter_cache_ttl_secs", "60").unwrap();
        assert_eq!(config.chapter_cache_ttl_secs, 60);

        apply(&mut config, "log_level", "debug").unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "chapter_cache_ttl_secs", "soon").is_err());
        assert!(apply(&mut config, "log_level", "loud").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
        assert_eq!(config.chapter_cache_ttl_secs, 3600);
        assert_eq!(config.log_level, "info");
    }
}
