//! Core record types for mentorlink.
//!
//! This module defines the three persisted record types and their row
//! layout. Each type implements [`Record`], which is where stored rows are
//! checked against the expected schema.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::Record;

/// The role a user signs up (and logs in) as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Reviews student records and leaves feedback.
    Mentor,
    /// Submits profile and marks records.
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mentor => write!(f, "Mentor"),
            Self::Student => write!(f, "Student"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mentor" => Ok(Self::Mentor),
            "student" => Ok(Self::Student),
            other => Err(Error::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A signed-up user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login name.
    pub username: String,
    /// SHA-256 hex digest of the password.
    pub password_digest: String,
    /// Role chosen at signup.
    pub role: Role,
}

/// One submission of a student's details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Username of the submitting student.
    pub username: String,
    /// Full name.
    pub name: String,
    /// Roll number.
    pub roll_no: String,
    /// Phone number.
    pub phone: String,
    /// Marks keyed by subject.
    pub test_marks: BTreeMap<String, String>,
    /// Free-text certifications.
    pub certifications: String,
    /// Free-text projects.
    pub projects: String,
    /// Free-text academic issues.
    pub academic_issues: String,
}

/// A mentor's note about a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackNote {
    /// Mentor who wrote the note.
    pub mentor_username: String,
    /// Student the note is about.
    pub student_username: String,
    /// The note itself.
    pub feedback: String,
}

impl Record for Account {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &["username", "password", "role"];

    fn to_row(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.username.clone(),
            self.password_digest.clone(),
            self.role.to_string(),
        ])
    }

    fn from_row(row: &[String]) -> std::result::Result<Self, String> {
        let [username, password, role] = row else {
            return Err(format!("expected 3 fields, found {}", row.len()));
        };
        let role = match role.as_str() {
            "Mentor" => Role::Mentor,
            "Student" => Role::Student,
            other => return Err(format!("unknown role '{other}'")),
        };
        Ok(Self {
            username: username.clone(),
            password_digest: password.clone(),
            role,
        })
    }
}

impl Record for Profile {
    const TABLE: &'static str = "profiles";
    const COLUMNS: &'static [&'static str] = &[
        "username",
        "name",
        "roll_no",
        "phone",
        "test_marks",
        "certifications",
        "projects",
        "academic_issues",
    ];

    fn to_row(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.username.clone(),
            self.name.clone(),
            self.roll_no.clone(),
            self.phone.clone(),
            serde_json::to_string(&self.test_marks)?,
            self.certifications.clone(),
            self.projects.clone(),
            self.academic_issues.clone(),
        ])
    }

    fn from_row(row: &[String]) -> std::result::Result<Self, String> {
        let [username, name, roll_no, phone, test_marks, certifications, projects, academic_issues] =
            row
        else {
            return Err(format!("expected 8 fields, found {}", row.len()));
        };
        let test_marks = serde_json::from_str(test_marks)
            .map_err(|e| format!("test_marks is not a subject/mark object: {e}"))?;
        Ok(Self {
            username: username.clone(),
            name: name.clone(),
            roll_no: roll_no.clone(),
            phone: phone.clone(),
            test_marks,
            certifications: certifications.clone(),
            projects: projects.clone(),
            academic_issues: academic_issues.clone(),
        })
    }
}

impl Record for FeedbackNote {
    const TABLE: &'static str = "feedback";
    const COLUMNS: &'static [&'static str] = &["mentor_username", "student_username", "feedback"];

    fn to_row(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.mentor_username.clone(),
            self.student_username.clone(),
            self.feedback.clone(),
        ])
    }

    fn from_row(row: &[String]) -> std::result::Result<Self, String> {
        let [mentor_username, student_username, feedback] = row else {
            return Err(format!("expected 3 fields, found {}", row.len()));
        };
        Ok(Self {
            mentor_username: mentor_username.clone(),
            student_username: student_username.clone(),
            feedback: feedback.clone(),
        })
    }
}
