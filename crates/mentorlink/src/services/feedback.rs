//! Mentor feedback notes.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::models::FeedbackNote;
use crate::storage::FeedbackTable;

/// Stores mentor notes and answers "what feedback does this student have".
#[derive(Debug, Clone)]
pub struct FeedbackService {
    table: Arc<FeedbackTable>,
}

impl FeedbackService {
    /// Create the service.
    #[must_use]
    pub fn new(table: Arc<FeedbackTable>) -> Self {
        Self { table }
    }

    /// Store a note. Earlier notes for the same student are kept.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be written.
    pub fn submit(&self, note: &FeedbackNote) -> Result<()> {
        self.table.append(note)?;
        info!(
            "Stored feedback from {} for {}",
            note.mentor_username, note.student_username
        );
        Ok(())
    }

    /// Text of the first stored note about `username`.
    ///
    /// Later notes are retained but not returned here.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read.
    pub fn get_for_student(&self, username: &str) -> Result<Option<String>> {
        Ok(self
            .table
            .load()?
            .into_iter()
            .find(|n| n.student_username == username)
            .map(|n| n.feedback))
    }
}
