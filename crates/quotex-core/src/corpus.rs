//! Proverbs corpus
//!
//! 31 chapters, one per day of the month. The bundled corpus is compiled
//! into the binary; a different file can be loaded from disk as long as it
//! has the same shape:
//!
//! ```json
//! { "chapters": [ { "chapter": 1, "verses": [ { "verseNumber": 7, "text": "..." } ] } ] }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Number of chapters, and the largest day of any month
pub const CHAPTER_COUNT: u32 = 31;

const BUNDLED: &str = include_str!("../assets/proverbs.json");

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read corpus '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid corpus JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Chapter {0} is outside 1..=31")]
    OutOfRange(u32),

    #[error("Chapter {0} appears more than once")]
    Duplicate(u32),

    #[error("Chapter {0} is missing")]
    Missing(u32),

    #[error("Chapter {0} has no verses")]
    Empty(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    #[serde(rename = "verseNumber")]
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter: u32,
    pub verses: Vec<Verse>,
}

#[derive(Deserialize)]
struct CorpusFile {
    chapters: Vec<Chapter>,
}

/// A verse picked for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

impl Quote {
    /// e.g. "Proverbs 3:5"
    pub fn reference(&self) -> String {
        format!("Proverbs {}:{}", self.chapter, self.verse)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.reference())
    }
}

/// Chapter to read on a given day of the month
pub fn chapter_for(day_of_month: u32) -> u32 {
    day_of_month.clamp(1, CHAPTER_COUNT)
}

/// All 31 chapters, ordered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    chapters: Vec<Chapter>,
}

impl Corpus {
    /// The corpus shipped with the crate
    pub fn bundled() -> Result<Self, CorpusError> {
        Self::from_json(BUNDLED)
    }

    /// Load a corpus file from disk
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded corpus from {:?}", path);
        Self::from_json(&content)
    }

    /// Load `path` if given, the bundled corpus otherwise
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, CorpusError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    /// Parse and validate corpus JSON
    ///
    /// Every chapter 1..=31 must appear exactly once with at least one verse.
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let file: CorpusFile = serde_json::from_str(json)?;
        let mut slots: Vec<Option<Chapter>> = vec![None; CHAPTER_COUNT as usize];

        for chapter in file.chapters {
            let n = chapter.chapter;
            if !(1..=CHAPTER_COUNT).contains(&n) {
                return Err(CorpusError::OutOfRange(n));
            }
            if chapter.verses.is_empty() {
                return Err(CorpusError::Empty(n));
            }
            let slot = &mut slots[(n - 1) as usize];
            if slot.is_some() {
                return Err(CorpusError::Duplicate(n));
            }
            *slot = Some(chapter);
        }

        let chapters = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or(CorpusError::Missing(i as u32 + 1)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { chapters })
    }

    /// Verses of chapter `n`, in order
    pub fn chapter(&self, n: u32) -> Option<&Chapter> {
        if n == 0 {
            return None;
        }
        self.chapters.get((n - 1) as usize)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// A random verse from chapter `n`
    pub fn random_verse<R: Rng + ?Sized>(&self, n: u32, rng: &mut R) -> Option<Quote> {
        let chapter = self.chapter(n)?;
        let verse = chapter.verses.choose(rng)?;
        Some(Quote {
            chapter: chapter.chapter,
            verse: verse.number,
            text: verse.text.clone(),
        })
    }

    /// Quote of the day: a random verse from the chapter matching the day of the month
    pub fn daily_quote<R: Rng + ?Sized>(&self, date: NaiveDate, rng: &mut R) -> Quote {
        let n = chapter_for(date.day());
        // Validation guarantees every chapter has a verse
        self.random_verse(n, rng).unwrap_or_else(|| Quote {
            chapter: n,
            verse: 0,
            text: String::new(),
        })
    }
}
