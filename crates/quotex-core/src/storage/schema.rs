//! SQLite schema for the promise tree
//!
//! Each level of the tree is its own table with a stable integer key and a
//! foreign key to its parent. Deleting a node cascades to everything below it.
//!
//! Node names carry a `name_key` column holding the Unicode-lowercased name.
//! Uniqueness is enforced on that key, since SQLite's own `NOCASE` only folds
//! ASCII letters.

use rusqlite::{params, Connection, Result};

use crate::encoding::fold_case;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 2;

/// Tables holding named tree nodes
const NODE_TABLES: [&str; 3] = ["categories", "titles", "subtitles"];

/// Initialize the database schema, upgrading older layouts in place
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS titles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS subtitles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            FOREIGN KEY (title_id) REFERENCES titles(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS promises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subtitle_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            verse TEXT NOT NULL,
            reference TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (subtitle_id) REFERENCES subtitles(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_promises_subtitle_id ON promises(subtitle_id);
        "#,
    )?;

    // Version 1 had no name_key and compared names with NOCASE
    for table in NODE_TABLES {
        if !has_column(conn, table, "name_key")? {
            add_name_keys(conn, table)?;
        }
    }

    conn.execute_batch(
        r#"
        DROP INDEX IF EXISTS idx_categories_name;
        DROP INDEX IF EXISTS idx_titles_name;
        DROP INDEX IF EXISTS idx_subtitles_name;

        -- Names are unique per parent, ignoring case
        CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_name_key
            ON categories(name_key);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_titles_name_key
            ON titles(category_id, name_key);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_subtitles_name_key
            ON subtitles(title_id, name_key);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!(
        "SELECT 1 FROM pragma_table_info('{table}') WHERE name = ?"
    ))?;
    stmt.exists([column])
}

/// Add the name_key column and fill it from the existing names
fn add_name_keys(conn: &Connection, table: &str) -> Result<()> {
    conn.execute(
        &format!("ALTER TABLE {table} ADD COLUMN name_key TEXT NOT NULL DEFAULT ''"),
        [],
    )?;

    let mut select = conn.prepare(&format!("SELECT id, name FROM {table}"))?;
    let names = select
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>>>()?;

    let mut update = conn.prepare(&format!("UPDATE {table} SET name_key = ? WHERE id = ?"))?;
    for (id, name) in names {
        update.execute(params![fold_case(&name), id])?;
    }
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in ["categories", "titles", "subtitles", "promises", "schema_info"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_init(&conn));

        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        assert!(!needs_init(&conn));
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_category_name_keys_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO categories (name, name_key) VALUES ('Émunah', 'émunah')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO categories (name, name_key) VALUES ('émunah', 'émunah')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_upgrade_from_version_1_fills_name_keys() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE schema_info (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO schema_info (key, value) VALUES ('version', '1');
            CREATE TABLE categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );
            CREATE UNIQUE INDEX idx_categories_name ON categories(name COLLATE NOCASE);
            CREATE TABLE titles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                name TEXT NOT NULL
            );
            CREATE TABLE subtitles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title_id INTEGER NOT NULL,
                name TEXT NOT NULL
            );
            INSERT INTO categories (id, name) VALUES (1, 'ÉMUNAH');
            INSERT INTO titles (id, category_id, name) VALUES (1, 1, 'Strength');
            "#,
        )
        .unwrap();
        assert!(needs_init(&conn));

        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        let key: String = conn
            .query_row("SELECT name_key FROM categories WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(key, "émunah");
        let title_key: String = conn
            .query_row("SELECT name_key FROM titles WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(title_key, "strength");
        // Old NOCASE index is gone, the key index takes over
        let dup = conn.execute(
            "INSERT INTO categories (name, name_key) VALUES ('émunah', 'émunah')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_cascade_delete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        init_schema(&conn).unwrap();

        conn.execute_batch(
            r#"
            INSERT INTO categories (id, name, name_key) VALUES (1, 'Faith', 'faith');
            INSERT INTO titles (id, category_id, name, name_key)
                VALUES (1, 1, 'Strength', 'strength');
            INSERT INTO subtitles (id, title_id, name, name_key) VALUES (1, 1, 'Daily', 'daily');
            INSERT INTO promises (subtitle_id, title, verse, reference, created_at, updated_at)
                VALUES (1, 'Courage', 'Be strong', 'Josh 1:9', 0, 0);
            DELETE FROM categories WHERE id = 1;
            "#,
        )
        .unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM promises", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
