//! Storage layer
//!
//! - `schema`: SQLite tables for the promise tree
//! - `error`: typed storage errors
//! - `legacy`: flat-row backups (import/export format)

pub mod error;
pub mod legacy;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use legacy::{read_backup, write_backup, LegacyRow, PLACEHOLDER_TITLE};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
