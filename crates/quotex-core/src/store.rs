//! Promise store
//!
//! The `Store` owns the SQLite connection and exposes the promise tree:
//!
//! - queries: categories, titles, subtitles, promises, search
//! - mutations: create / rename / delete at every level
//! - backups: import and export of flat legacy rows
//!
//! Every mutation runs in one transaction, so a rename or delete either
//! touches every affected row or none of them. Node ids are stable for the
//! life of the database.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open(&config)?;
//!
//! let faith = store.create_category("Faith")?;
//! let strength = store.create_title(faith.id, "Strength")?;
//! let daily = store.create_subtitle(strength.id, "Daily")?;
//! store.create_promise(&NewPromise::new(daily.id, "Be strong and courageous"))?;
//!
//! let promises = store.promises_at("Faith", "Strength", "Daily")?;
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::encoding::{check_name, check_reserved, fold_case, ValidationError};
use crate::models::{
    Category, CategoryId, Counts, NewPromise, NodeKind, NodePath, Promise, PromiseId, Subtitle,
    SubtitleId, Title, TitleId,
};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::legacy::{DecodedRow, LegacyRow};
use crate::storage::schema::{init_schema, needs_init};

/// Outcome of importing a backup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    /// Promises inserted
    pub promises: usize,
    /// Categories, titles and subtitles that did not exist before
    pub nodes_created: usize,
    /// Rows that could not be placed in the tree
    pub skipped: usize,
    /// Promises already present under the same subtitle, left as they were
    pub duplicates: usize,
}

/// One table of the tree
struct Level {
    kind: NodeKind,
    table: &'static str,
    parent_column: Option<&'static str>,
}

const CATEGORIES: Level = Level {
    kind: NodeKind::Category,
    table: "categories",
    parent_column: None,
};

const TITLES: Level = Level {
    kind: NodeKind::Title,
    table: "titles",
    parent_column: Some("category_id"),
};

const SUBTITLES: Level = Level {
    kind: NodeKind::Subtitle,
    table: "subtitles",
    parent_column: Some("title_id"),
};

const PROMISE_COLUMNS: &str =
    "p.id, p.subtitle_id, p.title, p.verse, p.reference, p.created_at, p.updated_at";

/// SQLite-backed promise store
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store at the configured location, creating it if needed
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create a database file
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let mut store = Self::from_connection(conn)?;
        store.path = Some(path.to_path_buf());
        info!("Opened promise store at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self { conn, path: None })
    }

    /// Database file, if not in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ==================== Category Operations ====================

    /// All categories, alphabetical
    pub fn categories(&self) -> StorageResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name_key, name")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: CategoryId(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Listed {} categories", categories.len());
        Ok(categories)
    }

    pub fn category(&self, id: CategoryId) -> StorageResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE id = ?",
                params![id.0],
                |row| {
                    Ok(Category {
                        id: CategoryId(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    /// Find a category by exact name
    pub fn category_by_name(&self, name: &str) -> StorageResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE name = ?",
                params![name],
                |row| {
                    Ok(Category {
                        id: CategoryId(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    /// Create a category
    ///
    /// Fails if the name is blank, contains a reserved separator, or matches
    /// an existing category ignoring case.
    pub fn create_category(&mut self, name: &str) -> StorageResult<Category> {
        let name = check_name(NodeKind::Category, name)?;
        let tx = self.conn.transaction()?;
        ensure_unique(&tx, &CATEGORIES, None, &name, None)?;
        let id = insert_node(&tx, &CATEGORIES, None, &name)?;
        tx.commit()?;

        info!("Created category '{}' ({})", name, id);
        Ok(Category {
            id: CategoryId(id),
            name,
        })
    }

    /// Rename a category; everything below it follows
    pub fn rename_category(&mut self, id: CategoryId, new_name: &str) -> StorageResult<Category> {
        let name = check_name(NodeKind::Category, new_name)?;
        let tx = self.conn.transaction()?;
        rename_node(&tx, &CATEGORIES, id.0, &name)?;
        tx.commit()?;

        info!("Renamed category {} to '{}'", id, name);
        Ok(Category { id, name })
    }

    /// Delete a category with all its titles, subtitles and promises
    ///
    /// Returns the number of promises removed.
    pub fn delete_category(&mut self, id: CategoryId) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = delete_node(&tx, &CATEGORIES, id.0)?;
        tx.commit()?;

        info!("Deleted category {} ({} promises)", id, removed);
        Ok(removed)
    }

    // ==================== Title Operations ====================

    /// Titles under a category, alphabetical
    pub fn titles(&self, category_id: CategoryId) -> StorageResult<Vec<Title>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, category_id, name FROM titles WHERE category_id = ? ORDER BY name_key, name",
        )?;
        let titles = stmt
            .query_map(params![category_id.0], title_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(titles)
    }

    /// Titles under the category with this exact name; empty if it does not exist
    pub fn titles_named(&self, category: &str) -> StorageResult<Vec<Title>> {
        match self.category_by_name(category)? {
            Some(category) => self.titles(category.id),
            None => Ok(Vec::new()),
        }
    }

    pub fn title(&self, id: TitleId) -> StorageResult<Option<Title>> {
        let title = self
            .conn
            .query_row(
                "SELECT id, category_id, name FROM titles WHERE id = ?",
                params![id.0],
                title_from_row,
            )
            .optional()?;
        Ok(title)
    }

    pub fn title_by_name(&self, category_id: CategoryId, name: &str) -> StorageResult<Option<Title>> {
        let title = self
            .conn
            .query_row(
                "SELECT id, category_id, name FROM titles WHERE category_id = ? AND name = ?",
                params![category_id.0, name],
                title_from_row,
            )
            .optional()?;
        Ok(title)
    }

    /// Create a title under a category
    pub fn create_title(&mut self, category_id: CategoryId, name: &str) -> StorageResult<Title> {
        let name = check_name(NodeKind::Title, name)?;
        let tx = self.conn.transaction()?;
        if !node_exists(&tx, &CATEGORIES, category_id.0)? {
            return Err(StorageError::not_found(NodeKind::Category, category_id.0));
        }
        ensure_unique(&tx, &TITLES, Some(category_id.0), &name, None)?;
        let id = insert_node(&tx, &TITLES, Some(category_id.0), &name)?;
        tx.commit()?;

        info!("Created title '{}' ({}) in category {}", name, id, category_id);
        Ok(Title {
            id: TitleId(id),
            category_id,
            name,
        })
    }

    /// Rename a title; names only need to be unique within the category
    pub fn rename_title(&mut self, id: TitleId, new_name: &str) -> StorageResult<Title> {
        let name = check_name(NodeKind::Title, new_name)?;
        let tx = self.conn.transaction()?;
        let category_id = rename_node(&tx, &TITLES, id.0, &name)?;
        tx.commit()?;

        info!("Renamed title {} to '{}'", id, name);
        Ok(Title {
            id,
            category_id: CategoryId(category_id.unwrap_or_default()),
            name,
        })
    }

    /// Delete a title with its subtitles and promises
    pub fn delete_title(&mut self, id: TitleId) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = delete_node(&tx, &TITLES, id.0)?;
        tx.commit()?;

        info!("Deleted title {} ({} promises)", id, removed);
        Ok(removed)
    }

    // ==================== Subtitle Operations ====================

    /// Subtitles under a title, alphabetical
    pub fn subtitles(&self, title_id: TitleId) -> StorageResult<Vec<Subtitle>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title_id, name FROM subtitles WHERE title_id = ? ORDER BY name_key, name",
        )?;
        let subtitles = stmt
            .query_map(params![title_id.0], subtitle_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subtitles)
    }

    /// Subtitles under (category, title) by exact names
    pub fn subtitles_named(&self, category: &str, title: &str) -> StorageResult<Vec<Subtitle>> {
        let Some(category) = self.category_by_name(category)? else {
            return Ok(Vec::new());
        };
        match self.title_by_name(category.id, title)? {
            Some(title) => self.subtitles(title.id),
            None => Ok(Vec::new()),
        }
    }

    pub fn subtitle(&self, id: SubtitleId) -> StorageResult<Option<Subtitle>> {
        let subtitle = self
            .conn
            .query_row(
                "SELECT id, title_id, name FROM subtitles WHERE id = ?",
                params![id.0],
                subtitle_from_row,
            )
            .optional()?;
        Ok(subtitle)
    }

    pub fn subtitle_by_name(&self, title_id: TitleId, name: &str) -> StorageResult<Option<Subtitle>> {
        let subtitle = self
            .conn
            .query_row(
                "SELECT id, title_id, name FROM subtitles WHERE title_id = ? AND name = ?",
                params![title_id.0, name],
                subtitle_from_row,
            )
            .optional()?;
        Ok(subtitle)
    }

    /// Create a subtitle under a title
    pub fn create_subtitle(&mut self, title_id: TitleId, name: &str) -> StorageResult<Subtitle> {
        let name = check_name(NodeKind::Subtitle, name)?;
        let tx = self.conn.transaction()?;
        if !node_exists(&tx, &TITLES, title_id.0)? {
            return Err(StorageError::not_found(NodeKind::Title, title_id.0));
        }
        ensure_unique(&tx, &SUBTITLES, Some(title_id.0), &name, None)?;
        let id = insert_node(&tx, &SUBTITLES, Some(title_id.0), &name)?;
        tx.commit()?;

        info!("Created subtitle '{}' ({}) in title {}", name, id, title_id);
        Ok(Subtitle {
            id: SubtitleId(id),
            title_id,
            name,
        })
    }

    pub fn rename_subtitle(&mut self, id: SubtitleId, new_name: &str) -> StorageResult<Subtitle> {
        let name = check_name(NodeKind::Subtitle, new_name)?;
        let tx = self.conn.transaction()?;
        let title_id = rename_node(&tx, &SUBTITLES, id.0, &name)?;
        tx.commit()?;

        info!("Renamed subtitle {} to '{}'", id, name);
        Ok(Subtitle {
            id,
            title_id: TitleId(title_id.unwrap_or_default()),
            name,
        })
    }

    /// Delete a subtitle with its promises
    pub fn delete_subtitle(&mut self, id: SubtitleId) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = delete_node(&tx, &SUBTITLES, id.0)?;
        tx.commit()?;

        info!("Deleted subtitle {} ({} promises)", id, removed);
        Ok(removed)
    }

    // ==================== Promise Operations ====================

    /// Promises under a subtitle, oldest first
    pub fn promises(&self, subtitle_id: SubtitleId) -> StorageResult<Vec<Promise>> {
        let sql = format!(
            "SELECT {PROMISE_COLUMNS} FROM promises p WHERE p.subtitle_id = ? ORDER BY p.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let promises = stmt
            .query_map(params![subtitle_id.0], promise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(promises)
    }

    /// Promises at (category, title, subtitle) by exact names
    ///
    /// Empty if any level does not exist.
    pub fn promises_at(
        &self,
        category: &str,
        title: &str,
        subtitle: &str,
    ) -> StorageResult<Vec<Promise>> {
        match self.resolve(&NodePath::new(category, title, subtitle))? {
            Ok(subtitle_id) => self.promises(subtitle_id),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Every promise, oldest first
    pub fn all_promises(&self) -> StorageResult<Vec<Promise>> {
        let sql = format!("SELECT {PROMISE_COLUMNS} FROM promises p ORDER BY p.id");
        let mut stmt = self.conn.prepare(&sql)?;
        let promises = stmt
            .query_map([], promise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(promises)
    }

    pub fn get_promise(&self, id: PromiseId) -> StorageResult<Option<Promise>> {
        let sql = format!("SELECT {PROMISE_COLUMNS} FROM promises p WHERE p.id = ?");
        let promise = self
            .conn
            .query_row(&sql, params![id.0], promise_from_row)
            .optional()?;
        Ok(promise)
    }

    /// Case-insensitive substring search
    ///
    /// Matches the promise title, verse, scripture reference, and the names
    /// of the promise's category, title and subtitle. Case is folded in Rust
    /// because SQLite's `lower()` leaves non-ASCII letters alone.
    pub fn search(&self, query: &str) -> StorageResult<Vec<Promise>> {
        let needle = fold_case(query);
        let sql = format!(
            r#"
            SELECT {PROMISE_COLUMNS}, c.name, t.name, s.name
            FROM promises p
            JOIN subtitles s ON p.subtitle_id = s.id
            JOIN titles t ON s.title_id = t.id
            JOIN categories c ON t.category_id = c.id
            ORDER BY p.id
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let names: [String; 3] = [row.get(7)?, row.get(8)?, row.get(9)?];
            Ok((promise_from_row(row)?, names))
        })?;

        let mut promises = Vec::new();
        for row in rows {
            let (promise, names) = row?;
            let matched = [&promise.title, &promise.verse, &promise.reference]
                .into_iter()
                .chain(names.iter())
                .any(|field| fold_case(field).contains(needle.as_str()));
            if matched {
                promises.push(promise);
            }
        }
        debug!("Search '{}' matched {} promises", query, promises.len());
        Ok(promises)
    }

    /// Names of the category, title and subtitle a promise is filed under
    pub fn promise_path(&self, id: PromiseId) -> StorageResult<Option<NodePath>> {
        let path = self
            .conn
            .query_row(
                r#"
                SELECT c.name, t.name, s.name
                FROM promises p
                JOIN subtitles s ON p.subtitle_id = s.id
                JOIN titles t ON s.title_id = t.id
                JOIN categories c ON t.category_id = c.id
                WHERE p.id = ?
                "#,
                params![id.0],
                |row| {
                    Ok(NodePath::new(
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        Ok(path)
    }

    /// Create a promise under an existing subtitle
    pub fn create_promise(&mut self, promise: &NewPromise) -> StorageResult<Promise> {
        validate_promise(&promise.title, &promise.verse, &promise.reference)?;

        let tx = self.conn.transaction()?;
        if !node_exists(&tx, &SUBTITLES, promise.subtitle_id.0)? {
            return Err(ValidationError::MissingAncestor(NodeKind::Subtitle).into());
        }
        let now = Utc::now();
        tx.execute(
            r#"
            INSERT INTO promises (subtitle_id, title, verse, reference, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                promise.subtitle_id.0,
                promise.title.trim(),
                promise.verse.trim(),
                promise.reference.trim(),
                now.timestamp_millis(),
                now.timestamp_millis(),
            ],
        )?;
        let id = PromiseId(tx.last_insert_rowid());
        tx.commit()?;

        info!("Created promise {} in subtitle {}", id, promise.subtitle_id);
        self.get_promise(id)?
            .ok_or_else(|| StorageError::not_found(NodeKind::Promise, id.0))
    }

    /// Create a promise addressed by ancestor names
    ///
    /// Fails with a missing-ancestor error naming the first level that
    /// does not exist.
    pub fn create_promise_at(
        &mut self,
        path: &NodePath,
        promise_title: &str,
        verse: &str,
        reference: &str,
    ) -> StorageResult<Promise> {
        let subtitle_id = self.resolve(path)?.map_err(ValidationError::MissingAncestor)?;
        self.create_promise(
            &NewPromise::new(subtitle_id, verse)
                .with_title(promise_title)
                .with_reference(reference),
        )
    }

    /// Save edits to a promise's title, verse and reference
    pub fn update_promise(&mut self, promise: &Promise) -> StorageResult<()> {
        validate_promise(&promise.title, &promise.verse, &promise.reference)?;

        let changed = self.conn.execute(
            "UPDATE promises SET title = ?, verse = ?, reference = ?, updated_at = ? WHERE id = ?",
            params![
                promise.title.trim(),
                promise.verse.trim(),
                promise.reference.trim(),
                Utc::now().timestamp_millis(),
                promise.id.0,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found(NodeKind::Promise, promise.id.0));
        }

        info!("Updated promise {}", promise.id);
        Ok(())
    }

    /// File a promise under a different subtitle
    pub fn move_promise(&mut self, id: PromiseId, subtitle_id: SubtitleId) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        if !node_exists(&tx, &SUBTITLES, subtitle_id.0)? {
            return Err(StorageError::not_found(NodeKind::Subtitle, subtitle_id.0));
        }
        let changed = tx.execute(
            "UPDATE promises SET subtitle_id = ?, updated_at = ? WHERE id = ?",
            params![subtitle_id.0, Utc::now().timestamp_millis(), id.0],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found(NodeKind::Promise, id.0));
        }
        tx.commit()?;

        info!("Moved promise {} to subtitle {}", id, subtitle_id);
        Ok(())
    }

    pub fn delete_promise(&mut self, id: PromiseId) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM promises WHERE id = ?", params![id.0])?;
        if changed == 0 {
            return Err(StorageError::not_found(NodeKind::Promise, id.0));
        }

        info!("Deleted promise {}", id);
        Ok(())
    }

    // ==================== Backups ====================

    /// Flatten the whole tree into legacy rows
    ///
    /// Empty nodes become placeholder rows.
    pub fn export_rows(&self) -> StorageResult<Vec<LegacyRow>> {
        let mut rows = Vec::new();

        for category in self.categories()? {
            let titles = self.titles(category.id)?;
            if titles.is_empty() {
                rows.push(LegacyRow::placeholder(
                    0,
                    &NodePath::new(&category.name, "", ""),
                )?);
            }

            for title in titles {
                let subtitles = self.subtitles(title.id)?;
                if subtitles.is_empty() {
                    rows.push(LegacyRow::placeholder(
                        0,
                        &NodePath::new(&category.name, &title.name, ""),
                    )?);
                }

                for subtitle in subtitles {
                    let path = NodePath::new(&category.name, &title.name, &subtitle.name);
                    let promises = self.promises(subtitle.id)?;
                    if promises.is_empty() {
                        rows.push(LegacyRow::placeholder(0, &path)?);
                    }
                    for promise in promises {
                        rows.push(LegacyRow::encode(
                            promise.id.0,
                            &path,
                            &promise.title,
                            &promise.verse,
                            &promise.reference,
                        )?);
                    }
                }
            }
        }

        info!("Exported {} rows", rows.len());
        Ok(rows)
    }

    /// Merge legacy rows into the tree
    ///
    /// Nodes are matched by name ignoring case and created when missing.
    /// A row is checked in full before any of its nodes are created, so a
    /// skipped row leaves nothing behind. Promises identical to one already
    /// filed under the same subtitle are not inserted again, which makes
    /// re-importing a backup harmless. Runs in a single transaction.
    pub fn import_rows(&mut self, rows: &[LegacyRow]) -> StorageResult<ImportReport> {
        let mut report = ImportReport::default();
        let tx = self.conn.transaction()?;
        let now = Utc::now().timestamp_millis();

        for row in rows {
            let decoded = row.decode();
            let placement = match place_row(&decoded) {
                Ok(placement) => placement,
                Err(e) => {
                    warn!("Skipping row {}: {}", row.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let category_id =
                get_or_create(&tx, &CATEGORIES, None, &placement.category, &mut report)?;
            let Some(title) = &placement.title else {
                continue;
            };
            let title_id = get_or_create(&tx, &TITLES, Some(category_id), title, &mut report)?;
            let Some(subtitle) = &placement.subtitle else {
                continue;
            };
            let subtitle_id =
                get_or_create(&tx, &SUBTITLES, Some(title_id), subtitle, &mut report)?;
            if !placement.promise {
                continue;
            }

            let promise_title = decoded.promise_title.trim();
            let verse = decoded.verse.trim();
            let scripture = decoded.scripture.trim();
            if promise_exists(&tx, subtitle_id, promise_title, verse, scripture)? {
                debug!("Row {} is already filed under subtitle {}", row.id, subtitle_id);
                report.duplicates += 1;
                continue;
            }

            tx.execute(
                r#"
                INSERT INTO promises (subtitle_id, title, verse, reference, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![subtitle_id, promise_title, verse, scripture, now, now],
            )?;
            report.promises += 1;
        }

        tx.commit()?;
        info!(
            "Imported {} promises ({} new nodes, {} skipped, {} duplicates)",
            report.promises, report.nodes_created, report.skipped, report.duplicates
        );
        Ok(report)
    }

    // ==================== Stats ====================

    pub fn counts(&self) -> StorageResult<Counts> {
        let count = |table: &str| -> StorageResult<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok(Counts {
            categories: count("categories")?,
            titles: count("titles")?,
            subtitles: count("subtitles")?,
            promises: count("promises")?,
        })
    }

    // ==================== Private helpers ====================

    /// Resolve names to a subtitle id, or report the first missing level
    fn resolve(&self, path: &NodePath) -> StorageResult<Result<SubtitleId, NodeKind>> {
        let Some(category) = self.category_by_name(&path.category)? else {
            return Ok(Err(NodeKind::Category));
        };
        let Some(title) = self.title_by_name(category.id, &path.title)? else {
            return Ok(Err(NodeKind::Title));
        };
        let Some(subtitle) = self.subtitle_by_name(title.id, &path.subtitle)? else {
            return Ok(Err(NodeKind::Subtitle));
        };
        Ok(Ok(subtitle.id))
    }
}

// ==================== Row mapping ====================

fn title_from_row(row: &Row) -> rusqlite::Result<Title> {
    Ok(Title {
        id: TitleId(row.get(0)?),
        category_id: CategoryId(row.get(1)?),
        name: row.get(2)?,
    })
}

fn subtitle_from_row(row: &Row) -> rusqlite::Result<Subtitle> {
    Ok(Subtitle {
        id: SubtitleId(row.get(0)?),
        title_id: TitleId(row.get(1)?),
        name: row.get(2)?,
    })
}

fn promise_from_row(row: &Row) -> rusqlite::Result<Promise> {
    let created_at: i64 = row.get(5)?;
    let updated_at: i64 = row.get(6)?;
    Ok(Promise {
        id: PromiseId(row.get(0)?),
        subtitle_id: SubtitleId(row.get(1)?),
        title: row.get(2)?,
        verse: row.get(3)?,
        reference: row.get(4)?,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
    })
}

// ==================== Transaction helpers ====================

fn validate_promise(title: &str, verse: &str, reference: &str) -> Result<(), ValidationError> {
    if verse.trim().is_empty() {
        return Err(ValidationError::BlankVerse);
    }
    check_reserved(NodeKind::Promise, title)?;
    check_reserved(NodeKind::Promise, reference)?;
    Ok(())
}

/// Where an imported row lands, checked before anything is written
struct RowPlacement {
    category: String,
    title: Option<String>,
    subtitle: Option<String>,
    promise: bool,
}

/// Check every name and field of a row
///
/// Placeholder rows may stop at any level; promise rows need all three
/// names and a valid promise.
fn place_row(decoded: &DecodedRow) -> Result<RowPlacement, ValidationError> {
    let path = &decoded.path;
    let placeholder = decoded.is_placeholder();

    let category = check_name(NodeKind::Category, &path.category)?;
    if placeholder && path.title.trim().is_empty() {
        return Ok(RowPlacement {
            category,
            title: None,
            subtitle: None,
            promise: false,
        });
    }
    let title = check_name(NodeKind::Title, &path.title)?;
    if placeholder && path.subtitle.trim().is_empty() {
        return Ok(RowPlacement {
            category,
            title: Some(title),
            subtitle: None,
            promise: false,
        });
    }
    let subtitle = check_name(NodeKind::Subtitle, &path.subtitle)?;
    if !placeholder {
        validate_promise(&decoded.promise_title, &decoded.verse, &decoded.scripture)?;
    }

    Ok(RowPlacement {
        category,
        title: Some(title),
        subtitle: Some(subtitle),
        promise: !placeholder,
    })
}

fn promise_exists(
    conn: &Connection,
    subtitle_id: i64,
    title: &str,
    verse: &str,
    reference: &str,
) -> StorageResult<bool> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM promises WHERE subtitle_id = ? AND title = ? AND verse = ? AND reference = ?",
    )?;
    Ok(stmt.exists(params![subtitle_id, title, verse, reference])?)
}

fn node_exists(conn: &Connection, level: &Level, id: i64) -> StorageResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", level.table);
    Ok(conn.prepare(&sql)?.exists(params![id])?)
}

/// Id of a sibling whose folded name matches, other than `except`
fn find_sibling(
    conn: &Connection,
    level: &Level,
    parent_id: Option<i64>,
    name: &str,
    except: Option<i64>,
) -> StorageResult<Option<i64>> {
    let key = fold_case(name);
    let id = match level.parent_column {
        Some(parent) => conn
            .query_row(
                &format!(
                    "SELECT id FROM {} WHERE {} = ?1 AND name_key = ?2 AND id != ?3",
                    level.table, parent
                ),
                params![parent_id.unwrap_or_default(), key, except.unwrap_or(-1)],
                |row| row.get(0),
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT id FROM {} WHERE name_key = ?1 AND id != ?2",
                    level.table
                ),
                params![key, except.unwrap_or(-1)],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(id)
}

fn ensure_unique(
    conn: &Connection,
    level: &Level,
    parent_id: Option<i64>,
    name: &str,
    except: Option<i64>,
) -> StorageResult<()> {
    if find_sibling(conn, level, parent_id, name, except)?.is_some() {
        return Err(ValidationError::Duplicate {
            kind: level.kind,
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

fn insert_node(
    conn: &Connection,
    level: &Level,
    parent_id: Option<i64>,
    name: &str,
) -> StorageResult<i64> {
    match level.parent_column {
        Some(parent) => conn.execute(
            &format!(
                "INSERT INTO {} ({}, name, name_key) VALUES (?, ?, ?)",
                level.table, parent
            ),
            params![parent_id.unwrap_or_default(), name, fold_case(name)],
        )?,
        None => conn.execute(
            &format!("INSERT INTO {} (name, name_key) VALUES (?, ?)", level.table),
            params![name, fold_case(name)],
        )?,
    };
    Ok(conn.last_insert_rowid())
}

fn get_or_create(
    conn: &Connection,
    level: &Level,
    parent_id: Option<i64>,
    name: &str,
    report: &mut ImportReport,
) -> StorageResult<i64> {
    if let Some(id) = find_sibling(conn, level, parent_id, name, None)? {
        return Ok(id);
    }
    report.nodes_created += 1;
    insert_node(conn, level, parent_id, name)
}

/// Rename a node in place; returns its parent id
fn rename_node(
    conn: &Connection,
    level: &Level,
    id: i64,
    name: &str,
) -> StorageResult<Option<i64>> {
    let parent_id: Option<i64> = match level.parent_column {
        Some(parent) => {
            let sql = format!("SELECT {} FROM {} WHERE id = ?", parent, level.table);
            let parent_id = conn
                .query_row(&sql, params![id], |row| row.get(0))
                .optional()?
                .ok_or_else(|| StorageError::not_found(level.kind, id))?;
            Some(parent_id)
        }
        None => {
            if !node_exists(conn, level, id)? {
                return Err(StorageError::not_found(level.kind, id));
            }
            None
        }
    };

    ensure_unique(conn, level, parent_id, name, Some(id))?;
    conn.execute(
        &format!("UPDATE {} SET name = ?, name_key = ? WHERE id = ?", level.table),
        params![name, fold_case(name), id],
    )?;
    Ok(parent_id)
}

/// Delete a node and everything below it; returns the number of promises removed
fn delete_node(conn: &Connection, level: &Level, id: i64) -> StorageResult<usize> {
    let count_sql = match level.kind {
        NodeKind::Category => {
            r#"
            SELECT COUNT(*) FROM promises p
            JOIN subtitles s ON p.subtitle_id = s.id
            JOIN titles t ON s.title_id = t.id
            WHERE t.category_id = ?
            "#
        }
        NodeKind::Title => {
            r#"
            SELECT COUNT(*) FROM promises p
            JOIN subtitles s ON p.subtitle_id = s.id
            WHERE s.title_id = ?
            "#
        }
        _ => "SELECT COUNT(*) FROM promises WHERE subtitle_id = ?",
    };
    let promises: i64 = conn.query_row(count_sql, params![id], |row| row.get(0))?;

    let changed = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?", level.table),
        params![id],
    )?;
    if changed == 0 {
        return Err(StorageError::not_found(level.kind, id));
    }
    Ok(promises as usize)
}
