//! Storage layer for mentorlink.
//!
//! Every persisted collection sits behind [`RecordTable`], an append/scan
//! interface over one [`Record`] type. Two implementations exist:
//! [`CsvTable`] keeps one flat file per table (header row plus one row per
//! record) and [`SqliteTable`] keeps all tables in a single `SQLite`
//! database. Both serialise appends with an exclusive lock, so concurrent
//! sessions never lose each other's records.

pub mod csv_table;
pub mod migrations;
pub mod schema;
pub mod sqlite_table;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::error::{Error, Result};
use crate::models::{Account, FeedbackNote, Profile};

pub use csv_table::CsvTable;
pub use sqlite_table::SqliteTable;

/// A typed row of a named table.
///
/// `COLUMNS` is the schema: stored rows must have exactly these fields in
/// this order, and [`Record::from_row`] rejects any row whose values do not
/// parse.
pub trait Record: fmt::Debug + Clone + Send + Sync + 'static {
    /// Table name.
    const TABLE: &'static str;
    /// Column names, in storage order.
    const COLUMNS: &'static [&'static str];

    /// Render this record as one field per column.
    ///
    /// # Errors
    ///
    /// Returns an error if a structured field cannot be serialised.
    fn to_row(&self) -> Result<Vec<String>>;

    /// Parse a stored row, describing the problem on failure.
    ///
    /// # Errors
    ///
    /// Returns a message when the row does not match the schema.
    fn from_row(row: &[String]) -> std::result::Result<Self, String>;
}

/// Guard run against the current contents of a table before an append.
pub type AppendGuard<'a, T> = &'a dyn Fn(&[T]) -> Result<()>;

/// Durable append/scan storage for one record type.
pub trait RecordTable<T: Record>: fmt::Debug + Send + Sync {
    /// Where the table lives (file or database path).
    fn location(&self) -> &Path;

    /// Every stored record in insertion order.
    ///
    /// A table that has never been written is empty, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageCorrupt`] if stored rows do not match the
    /// schema, or an I/O or database error.
    fn load(&self) -> Result<Vec<T>>;

    /// Append `record` after `guard` has accepted the current contents.
    ///
    /// The guard and the write happen under the same exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns whatever `guard` returns, or a storage error.
    fn append_checked(&self, record: &T, guard: AppendGuard<'_, T>) -> Result<()>;

    /// Append `record` at the end of the table.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read or written.
    fn append(&self, record: &T) -> Result<()> {
        self.append_checked(record, &|_: &[T]| Ok(()))
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read.
    fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}

/// All signed-up users.
pub type AccountTable = dyn RecordTable<Account>;
/// Submitted student details.
pub type ProfileTable = dyn RecordTable<Profile>;
/// Mentor notes about students.
pub type FeedbackTable = dyn RecordTable<FeedbackNote>;

/// The three tables the application works with.
#[derive(Debug, Clone)]
pub struct Tables {
    /// Backend the tables were opened with.
    pub backend: StorageBackend,
    /// Accounts table.
    pub accounts: Arc<AccountTable>,
    /// Profiles table.
    pub profiles: Arc<ProfileTable>,
    /// Feedback table.
    pub feedback: Arc<FeedbackTable>,
}

impl Tables {
    /// Open the tables described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the
    /// database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let backend = config.storage.backend;
        let tables = match backend {
            StorageBackend::Csv => Self {
                backend,
                accounts: Arc::new(CsvTable::<Account>::open(config.accounts_path())?),
                profiles: Arc::new(CsvTable::<Profile>::open(config.profiles_path())?),
                feedback: Arc::new(CsvTable::<FeedbackNote>::open(config.feedback_path())?),
            },
            StorageBackend::Sqlite => {
                let path = config.database_path();
                Self {
                    backend,
                    accounts: Arc::new(SqliteTable::<Account>::open(&path)?),
                    profiles: Arc::new(SqliteTable::<Profile>::open(&path)?),
                    feedback: Arc::new(SqliteTable::<FeedbackNote>::open(&path)?),
                }
            }
        };
        info!("Opened {} tables in {}", backend, config.data_dir().display());
        Ok(tables)
    }

    /// Record counts and locations for every table.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any table cannot be read.
    pub fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            backend: self.backend,
            tables: vec![
                TableStats::of(self.accounts.as_ref(), Account::TABLE)?,
                TableStats::of(self.profiles.as_ref(), Profile::TABLE)?,
                TableStats::of(self.feedback.as_ref(), FeedbackNote::TABLE)?,
            ],
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Backend in use.
    pub backend: StorageBackend,
    /// Per-table figures.
    pub tables: Vec<TableStats>,
}

/// Statistics about one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// Table name.
    pub name: &'static str,
    /// File or database holding the table.
    pub location: PathBuf,
    /// Number of stored records.
    pub records: usize,
}

impl TableStats {
    fn of<T: Record>(table: &dyn RecordTable<T>, name: &'static str) -> Result<Self> {
        Ok(Self {
            name,
            location: table.location().to_path_buf(),
            records: table.count()?,
        })
    }
}

/// Create the parent directory of `path` if it is missing.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
