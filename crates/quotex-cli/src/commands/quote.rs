//! Proverbs quote command handlers

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;

use quotex_core::corpus::CHAPTER_COUNT;
use quotex_core::{Config, Corpus};

use crate::output::Output;

fn load_corpus(config: &Config) -> Result<Corpus> {
    Corpus::load_or_bundled(config.corpus_path.as_deref()).context("Failed to load Proverbs corpus")
}

/// Print the quote of the day
pub fn today(
    config: &Config,
    date: Option<String>,
    seed: Option<u64>,
    output: &Output,
) -> Result<()> {
    let date = match date {
        Some(date) => parse_date(&date)?,
        None => Local::now().date_naive(),
    };
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let quote = load_corpus(config)?.daily_quote(date, &mut rng);
    output.print_quote(&quote);
    Ok(())
}

/// Print a whole chapter
pub fn chapter(config: &Config, number: u32, output: &Output) -> Result<()> {
    let corpus = load_corpus(config)?;
    let chapter = corpus
        .chapter(number)
        .ok_or_else(|| anyhow!("Chapter must be between 1 and {}", CHAPTER_COUNT))?;
    output.print_chapter(chapter);
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}
