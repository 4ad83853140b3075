//! Student profile submissions.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::models::Profile;
use crate::storage::ProfileTable;

/// Stores and looks up student profiles.
///
/// Resubmitting appends a new row; the most recent row for a username is
/// that student's profile.
#[derive(Debug, Clone)]
pub struct ProfileService {
    table: Arc<ProfileTable>,
}

impl ProfileService {
    /// Create the service.
    #[must_use]
    pub fn new(table: Arc<ProfileTable>) -> Self {
        Self { table }
    }

    /// Store a submission.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be written.
    pub fn submit(&self, profile: &Profile) -> Result<()> {
        self.table.append(profile)?;
        info!(
            "Stored profile for {} ({} subjects)",
            profile.username,
            profile.test_marks.len()
        );
        Ok(())
    }

    /// The most recent submission by `username`, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read.
    pub fn get_latest(&self, username: &str) -> Result<Option<Profile>> {
        Ok(self
            .table
            .load()?
            .into_iter()
            .rev()
            .find(|p| p.username == username))
    }

    /// Usernames that have submitted at least once, in order of first
    /// submission.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read.
    pub fn list_students(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .table
            .load()?
            .into_iter()
            .filter_map(|p| seen.insert(p.username.clone()).then_some(p.username))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CsvTable;

    fn service() -> (tempfile::TempDir, ProfileService) {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<Profile>::open(dir.path().join("students_data.csv")).unwrap();
        (dir, ProfileService::new(Arc::new(table)))
    }

    fn profile(username: &str, name: &str) -> Profile {
        Profile {
            username: username.to_string(),
            name: name.to_string(),
            ..Profile::default()
        }
    }

    #[test]
    fn test_get_latest_none_when_never_submitted() {
        let (_dir, profiles) = service();
        assert!(profiles.get_latest("alice").unwrap().is_none());
    }

    #[test]
    fn test_get_latest_returns_most_recent() {
        let (_dir, profiles) = service();
        profiles.submit(&profile("alice", "Alice v1")).unwrap();
        profiles.submit(&profile("carol", "Carol")).unwrap();
        profiles.submit(&profile("alice", "Alice v2")).unwrap();

        let latest = profiles.get_latest("alice").unwrap().unwrap();
        assert_eq!(latest.name, "Alice v2");
        assert_eq!(profiles.get_latest("carol").unwrap().unwrap().name, "Carol");
    }

    #[test]
    fn test_resubmission_keeps_history() {
        let (_dir, profiles) = service();
        profiles.submit(&profile("alice", "Alice v1")).unwrap();
        profiles.submit(&profile("alice", "Alice v2")).unwrap();

        assert_eq!(profiles.table.count().unwrap(), 2);
    }

    #[test]
    fn test_list_students_distinct_in_first_submission_order() {
        let (_dir, profiles) = service();
        profiles.submit(&profile("carol", "Carol")).unwrap();
        profiles.submit(&profile("alice", "Alice v1")).unwrap();
        profiles.submit(&profile("carol", "Carol again")).unwrap();

        assert_eq!(profiles.list_students().unwrap(), vec!["carol", "alice"]);
    }
}
