//! QuoteX Core Library
//!
//! This crate provides the core functionality for QuoteX, a collection of
//! scripture promises filed under a three-level taxonomy
//! (category → title → subtitle), plus a daily Proverbs quote shown on the
//! lock screen.
//!
//! # Architecture
//!
//! - **SQLite**: one table per taxonomy level, promises at the leaves
//! - **Legacy rows**: the old flat encoding, kept for JSON backups
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = Store::open(&config)?;
//!
//! let faith = store.create_category("Faith")?;
//! let strength = store.create_title(faith.id, "Strength")?;
//! let daily = store.create_subtitle(strength.id, "Daily")?;
//! store.create_promise(&NewPromise::new(daily.id, "Be strong and courageous"))?;
//! ```
//!
//! # Modules
//!
//! - `store`: Promise tree queries and mutations (main entry point)
//! - `service`: Async wrapper around the store with a live promise stream
//! - `models`: Taxonomy nodes and promises
//! - `encoding`: Flat title/reference encoding and input validation
//! - `selection`: Step-by-step browsing state
//! - `corpus`: The Proverbs chapters and the quote of the day
//! - `cache`: Time-limited corpus cache
//! - `overlay`: Lock-screen quote display loop
//! - `storage`: Schema, errors and legacy backups
//! - `config`: Application configuration

pub mod cache;
pub mod config;
pub mod corpus;
pub mod encoding;
pub mod models;
pub mod overlay;
pub mod selection;
pub mod service;
pub mod storage;
pub mod store;

pub use cache::{ChapterCache, Clock, ManualClock, SystemClock};
pub use config::Config;
pub use corpus::{chapter_for, Corpus, CorpusError, Quote};
pub use encoding::{EncodingError, ValidationError};
pub use models::{
    Category, CategoryId, Counts, NewPromise, NodeKind, NodePath, Promise, PromiseId, Subtitle,
    SubtitleId, Title, TitleId,
};
pub use overlay::{monitor, OverlayService, QuoteSink, ScreenEvent};
pub use selection::{Selection, SelectionState};
pub use service::PromiseService;
pub use storage::{LegacyRow, StorageError, StorageResult};
pub use store::{ImportReport, Store};
