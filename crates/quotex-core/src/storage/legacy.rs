//! Flat-row backups
//!
//! A backup is a JSON array of rows in the old single-table layout
//! (`id`, packed `title`, `verse`, packed `reference`). Nodes without any
//! promise are written as placeholder rows so that importing a backup
//! re-creates the same tree.
//!
//! Files are written atomically (temp file, sync, rename).

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoding::{decode_reference, decode_title, encode_reference, encode_title, EncodingError};
use crate::models::NodePath;
use crate::storage::error::{StorageError, StorageResult};

/// Promise title of rows that exist only to keep an empty node alive
pub const PLACEHOLDER_TITLE: &str = "Initial Title Placeholder";

/// One row of the flat layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRow {
    pub id: i64,
    pub title: String,
    pub verse: String,
    pub reference: String,
}

/// A flat row split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    pub path: NodePath,
    pub promise_title: String,
    pub verse: String,
    pub scripture: String,
}

impl LegacyRow {
    /// Pack a promise into a flat row
    pub fn encode(
        id: i64,
        path: &NodePath,
        promise_title: &str,
        verse: &str,
        scripture: &str,
    ) -> Result<Self, EncodingError> {
        Ok(Self {
            id,
            title: encode_title(&path.category, promise_title)?,
            verse: verse.to_string(),
            reference: encode_reference(&path.title, &path.subtitle, scripture)?,
        })
    }

    /// Row that only marks a node as existing
    ///
    /// Empty `title`/`subtitle` in `path` mean the placeholder stops at a
    /// higher level.
    pub fn placeholder(id: i64, path: &NodePath) -> Result<Self, EncodingError> {
        Self::encode(id, path, PLACEHOLDER_TITLE, "", "")
    }

    pub fn decode(&self) -> DecodedRow {
        let (category, promise_title) = decode_title(&self.title);
        let (title, subtitle, scripture) = decode_reference(&self.reference);
        DecodedRow {
            path: NodePath::new(category, title, subtitle),
            promise_title,
            verse: self.verse.clone(),
            scripture,
        }
    }
}

impl DecodedRow {
    pub fn is_placeholder(&self) -> bool {
        self.promise_title == PLACEHOLDER_TITLE && self.verse.trim().is_empty()
    }
}

/// Read a backup file
pub fn read_backup(path: &Path) -> StorageResult<Vec<LegacyRow>> {
    let content =
        fs::read_to_string(path).map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;
    serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

/// Write a backup file atomically
pub fn write_backup(path: &Path, rows: &[LegacyRow]) -> StorageResult<()> {
    let data = serde_json::to_vec_pretty(rows).map_err(|e| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    atomic_write(path, &data)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encode_and_decode_row() {
        let path = NodePath::new("Faith", "Strength", "Daily");
        let row = LegacyRow::encode(1, &path, "Courage", "Be strong", "Josh 1:9").unwrap();
        assert_eq!(row.title, "Faith¦Courage");
        assert_eq!(row.reference, "Strength§Daily§Josh 1:9");

        let decoded = row.decode();
        assert_eq!(decoded.path, path);
        assert_eq!(decoded.promise_title, "Courage");
        assert_eq!(decoded.scripture, "Josh 1:9");
        assert!(!decoded.is_placeholder());
    }

    #[test]
    fn test_placeholder_row() {
        let row = LegacyRow::placeholder(0, &NodePath::new("Hope", "", "")).unwrap();
        let decoded = row.decode();
        assert!(decoded.is_placeholder());
        assert_eq!(decoded.path.category, "Hope");
        assert!(decoded.path.title.is_empty());
    }

    #[test]
    fn test_malformed_row_decodes_to_defaults() {
        let row = LegacyRow {
            id: 9,
            title: "Loose".to_string(),
            verse: "text".to_string(),
            reference: String::new(),
        };
        let decoded = row.decode();
        assert_eq!(decoded.path, NodePath::new("Loose", "", ""));
        assert!(decoded.promise_title.is_empty());
    }

    #[test]
    fn test_backup_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("backup.json");

        let rows = vec![
            LegacyRow::encode(1, &NodePath::new("A", "B", "C"), "P", "V", "R").unwrap(),
            LegacyRow::placeholder(0, &NodePath::new("D", "", "")).unwrap(),
        ];
        write_backup(&path, &rows).unwrap();
        assert!(!path.with_extension("tmp").exists());

        assert_eq!(read_backup(&path).unwrap(), rows);
    }

    #[test]
    fn test_read_backup_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            read_backup(&missing),
            Err(StorageError::NotFoundPath { .. })
        ));

        let garbage = temp_dir.path().join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert!(matches!(
            read_backup(&garbage),
            Err(StorageError::InvalidFormat { .. })
        ));
    }
}
