//! SQLite table destination
//!
//! This module provides a SQLite-based implementation of the Destination trait.

use crate::record::{Record, RecordField};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Destination, StoreError, StoreResult};
use rusqlite::{params_from_iter, Connection};
use std::fs;
use std::path::{Path, PathBuf};

/// SQLite destination backed by a single `listings` table
pub struct SqliteDestination {
    conn: Connection,
    path: PathBuf,
}

impl SqliteDestination {
    /// Opens or creates the database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteDestination)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    fn column_list() -> String {
        RecordField::ALL
            .iter()
            .map(|f| f.column())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Destination for SqliteDestination {
    fn load(&mut self) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM listings ORDER BY rowid",
            Self::column_list()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let records = stmt
            .query_map([], |row| {
                let mut record = Record::default();
                for (i, field) in RecordField::ALL.iter().enumerate() {
                    if let Some(value) = row.get::<_, Option<String>>(i)? {
                        record.set(*field, value);
                    }
                }
                Ok(record)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn append(&mut self, records: &[Record]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let placeholders = (1..=RecordField::ALL.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO listings ({}) VALUES ({})",
            Self::column_list(),
            placeholders
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                stmt.execute(params_from_iter(
                    RecordField::ALL.iter().map(|f| record.get(*f)),
                ))?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
