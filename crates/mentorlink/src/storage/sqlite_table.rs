//! Indexed table backend.
//!
//! All tables share one `SQLite` database. Every operation opens its own
//! connection, so a table value can be shared freely between threads and
//! several processes can use the same database. Appends run inside an
//! immediate transaction, which takes the database write lock before the
//! guard reads the current rows.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use tracing::{debug, info};

use super::{ensure_parent_dir, migrations, AppendGuard, Record, RecordTable};
use crate::error::{Error, Result};

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`RecordTable`] stored in a `SQLite` database.
#[derive(Debug)]
pub struct SqliteTable<T> {
    /// Path to the database file.
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SqliteTable<T> {
    /// Open (creating if needed) the database at `path` and make sure the
    /// schema is current.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path)?;

        let conn = Self::connect(&path)?;
        // WAL is a property of the database file, so set it once here.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Opened {} table in {}", T::TABLE, path.display());
        Ok(Self {
            path,
            _record: PhantomData,
        })
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn select_all(&self, conn: &Connection) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            T::COLUMNS.join(", "),
            T::TABLE
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                (0..T::COLUMNS.len())
                    .map(|i| row.get::<_, String>(i))
                    .collect::<rusqlite::Result<Vec<String>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.iter()
            .enumerate()
            .map(|(index, fields)| {
                T::from_row(fields).map_err(|message| {
                    Error::corrupt(
                        &self.path,
                        format!("{} row {}: {message}", T::TABLE, index + 1),
                    )
                })
            })
            .collect()
    }
}

impl<T: Record> RecordTable<T> for SqliteTable<T> {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<T>> {
        let conn = Self::connect(&self.path)?;
        self.select_all(&conn)
    }

    fn append_checked(&self, record: &T, guard: AppendGuard<'_, T>) -> Result<()> {
        let mut conn = Self::connect(&self.path)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = self.select_all(&tx)?;
        guard(&existing)?;

        let placeholders = (1..=T::COLUMNS.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            T::TABLE,
            T::COLUMNS.join(", ")
        );
        tx.execute(&sql, params_from_iter(record.to_row()?))?;
        tx.commit()?;

        debug!("Appended to {} ({} records)", T::TABLE, existing.len() + 1);
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let conn = Self::connect(&self.path)?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", T::TABLE), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
