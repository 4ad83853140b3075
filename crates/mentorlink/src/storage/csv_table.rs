//! Flat-file table backend.
//!
//! Each table is one CSV file: a header row naming the columns, then one
//! row per record in insertion order. An append reads the whole file and
//! rewrites it through a temporary file that is renamed into place, so a
//! reader sees either the old table or the new one, never a torn write.
//! Appends hold an exclusive OS lock on `<file>.lock`; loads hold a shared
//! lock on the same file, so they wait for an append in progress.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use super::{ensure_parent_dir, AppendGuard, Record, RecordTable};
use crate::error::{Error, Result};

/// A [`RecordTable`] stored as a CSV file.
#[derive(Debug)]
pub struct CsvTable<T> {
    /// Path to the table file.
    path: PathBuf,
    /// Path to the sidecar lock file.
    lock_path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> CsvTable<T> {
    /// Open the table at `path`.
    ///
    /// The parent directory is created if needed; the file itself is only
    /// created by the first append.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path)?;

        let lock_path = lock_path_for(&path);
        debug!("Using {} table at {}", T::TABLE, path.display());
        Ok(Self {
            path,
            lock_path,
            _record: PhantomData,
        })
    }

    fn open_lock_file(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    /// Take the exclusive append lock; released when the file is dropped.
    fn lock_exclusive(&self) -> Result<File> {
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file)?;
        trace!("Locked {} exclusive", self.lock_path.display());
        Ok(file)
    }

    /// Take a shared read lock; released when the file is dropped.
    fn lock_shared(&self) -> Result<File> {
        let file = self.open_lock_file()?;
        FileExt::lock_shared(&file)?;
        trace!("Locked {} shared", self.lock_path.display());
        Ok(file)
    }

    fn read_all(&self) -> Result<Vec<T>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist yet, treating as empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| Error::corrupt(&self.path, e.to_string()))?;
        if headers.iter().ne(T::COLUMNS.iter().copied()) {
            return Err(Error::corrupt(
                &self.path,
                format!(
                    "expected header '{}', found '{}'",
                    T::COLUMNS.join(","),
                    headers.iter().collect::<Vec<_>>().join(",")
                ),
            ));
        }

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            // Row 1 is the header.
            let line = index + 2;
            let row = row.map_err(|e| Error::corrupt(&self.path, format!("row {line}: {e}")))?;
            let fields: Vec<String> = row.iter().map(str::to_string).collect();
            let record = T::from_row(&fields)
                .map_err(|message| Error::corrupt(&self.path, format!("row {line}: {message}")))?;
            records.push(record);
        }
        Ok(records)
    }

    fn write_all(&self, records: &[T]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            writer.write_record(T::COLUMNS)?;
            for record in records {
                writer.write_record(record.to_row()?)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl<T: Record> RecordTable<T> for CsvTable<T> {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<T>> {
        let _lock = self.lock_shared()?;
        self.read_all()
    }

    fn append_checked(&self, record: &T, guard: AppendGuard<'_, T>) -> Result<()> {
        let _lock = self.lock_exclusive()?;

        let mut records = self.read_all()?;
        guard(&records)?;
        records.push(record.clone());
        self.write_all(&records)?;

        debug!(
            "Appended to {} ({} records)",
            self.path.display(),
            records.len()
        );
        Ok(())
    }
}

/// `user_data.csv` locks through `user_data.csv.lock`.
fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("table"), ToOwned::to_owned);
    name.push(".lock");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::models::{Account, FeedbackNote, Profile, Role};

    fn note(student: &str, text: &str) -> FeedbackNote {
        FeedbackNote {
            mentor_username: "bob".to_string(),
            student_username: student.to_string(),
            feedback: text.to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<FeedbackNote>::open(dir.path().join("feedback_data.csv")).unwrap();

        assert!(table.load().unwrap().is_empty());
        assert_eq!(table.count().unwrap(), 0);
    }

    #[test]
    fn test_load_empty_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_data.csv");
        std::fs::write(&path, "").unwrap();

        let table = CsvTable::<FeedbackNote>::open(&path).unwrap();
        assert!(table.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<FeedbackNote>::open(dir.path().join("feedback_data.csv")).unwrap();

        table.append(&note("alice", "first")).unwrap();
        table.append(&note("carol", "second")).unwrap();
        table.append(&note("alice", "third")).unwrap();

        let texts: Vec<_> = table
            .load()
            .unwrap()
            .into_iter()
            .map(|n| n.feedback)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_file_has_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_data.csv");
        let table = CsvTable::<FeedbackNote>::open(&path).unwrap();
        table.append(&note("alice", "Nice work")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("mentor_username,student_username,feedback")
        );
        assert_eq!(lines.next(), Some("bob,alice,Nice work"));
    }

    #[test]
    fn test_fields_with_commas_quotes_and_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<FeedbackNote>::open(dir.path().join("feedback_data.csv")).unwrap();
        let tricky = note("alice", "Good, but \"revise\" chapter 2\nand 3");

        table.append(&tricky).unwrap();
        assert_eq!(table.load().unwrap(), vec![tricky]);
    }

    #[test]
    fn test_reopened_table_sees_previous_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_data.csv");

        CsvTable::<FeedbackNote>::open(&path)
            .unwrap()
            .append(&note("alice", "from first instance"))
            .unwrap();
        let second = CsvTable::<FeedbackNote>::open(&path).unwrap();
        second.append(&note("alice", "from second instance")).unwrap();

        assert_eq!(second.load().unwrap().len(), 2);
    }

    #[test]
    fn test_guard_rejection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<FeedbackNote>::open(dir.path().join("feedback_data.csv")).unwrap();
        table.append(&note("alice", "kept")).unwrap();

        let result = table.append_checked(&note("alice", "rejected"), &|existing: &[FeedbackNote]| {
            if existing.is_empty() {
                Ok(())
            } else {
                Err(Error::validation("table not empty"))
            }
        });

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(table.load().unwrap().len(), 1);
    }

    #[test]
    fn test_wrong_header_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_data.csv");
        std::fs::write(&path, "name,secret,kind\nalice,x,Student\n").unwrap();

        let table = CsvTable::<Account>::open(&path).unwrap();
        let err = table.load().unwrap_err();
        assert!(matches!(err, Error::StorageCorrupt { .. }));
        assert!(err.to_string().contains("expected header"));
    }

    #[test]
    fn test_wrong_arity_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_data.csv");
        std::fs::write(&path, "username,password,role\nalice,x\n").unwrap();

        let table = CsvTable::<Account>::open(&path).unwrap();
        assert!(matches!(
            table.load().unwrap_err(),
            Error::StorageCorrupt { .. }
        ));
    }

    #[test]
    fn test_unknown_role_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_data.csv");
        std::fs::write(&path, "username,password,role\nalice,x,Admin\n").unwrap();

        let table = CsvTable::<Account>::open(&path).unwrap();
        let err = table.load().unwrap_err().to_string();
        assert!(err.contains("row 2"));
        assert!(err.contains("Admin"));
    }

    #[test]
    fn test_corrupt_table_refuses_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students_data.csv");
        std::fs::write(
            &path,
            "username,name,roll_no,phone,test_marks,certifications,projects,academic_issues\n\
             alice,Alice,1,555,not-json,,,\n",
        )
        .unwrap();

        let table = CsvTable::<Profile>::open(&path).unwrap();
        let result = table.append(&Profile::default());
        assert!(matches!(result, Err(Error::StorageCorrupt { .. })));

        // The corrupt file is left untouched for inspection.
        assert!(std::fs::read_to_string(&path).unwrap().contains("not-json"));
    }

    #[test]
    fn test_load_waits_for_append_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_data.csv");
        let table = CsvTable::<FeedbackNote>::open(&path).unwrap();
        table.append(&note("alice", "first")).unwrap();

        let writer_lock = table.lock_exclusive().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let reader = std::thread::spawn(move || {
            let table = CsvTable::<FeedbackNote>::open(&path).unwrap();
            tx.send(table.load().unwrap().len()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(writer_lock);
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), 1);
        reader.join().unwrap();
    }

    #[test]
    fn test_concurrent_loads_share_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<FeedbackNote>::open(dir.path().join("feedback_data.csv")).unwrap();
        table.append(&note("alice", "first")).unwrap();

        let _held = table.lock_shared().unwrap();
        assert_eq!(table.load().unwrap().len(), 1);
    }

    #[test]
    fn test_lock_path_for() {
        assert_eq!(
            lock_path_for(Path::new("/data/user_data.csv")),
            PathBuf::from("/data/user_data.csv.lock")
        );
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 10;

        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("user_data.csv"));

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let path = Arc::clone(&path);
                scope.spawn(move || {
                    // Separate instances, as separate sessions would have.
                    let table = CsvTable::<Account>::open(path.as_path()).unwrap();
                    for i in 0..PER_THREAD {
                        table
                            .append(&Account {
                                username: format!("user-{t}-{i}"),
                                password_digest: crate::hasher::digest("pw"),
                                role: Role::Student,
                            })
                            .unwrap();
                    }
                });
            }
        });

        let table = CsvTable::<Account>::open(path.as_path()).unwrap();
        let mut names: Vec<_> = table.load().unwrap().into_iter().map(|a| a.username).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), THREADS * PER_THREAD);
    }
}
