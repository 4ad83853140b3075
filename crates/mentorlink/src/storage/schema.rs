//! `SQLite` schema definitions for the indexed backend.
//!
//! Column names and order match [`Record::COLUMNS`](super::Record::COLUMNS)
//! of the record stored in each table; the autoincrement `id` records
//! insertion order.

/// SQL statement to create the accounts table.
pub const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL
)
";

/// SQL statement to create the profiles table.
pub const CREATE_PROFILES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    name TEXT NOT NULL,
    roll_no TEXT NOT NULL,
    phone TEXT NOT NULL,
    test_marks TEXT NOT NULL,
    certifications TEXT NOT NULL,
    projects TEXT NOT NULL,
    academic_issues TEXT NOT NULL
)
";

/// SQL statement to create the feedback table.
pub const CREATE_FEEDBACK_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mentor_username TEXT NOT NULL,
    student_username TEXT NOT NULL,
    feedback TEXT NOT NULL
)
";

/// Index for login lookups.
pub const CREATE_ACCOUNTS_USERNAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_accounts_username ON accounts(username)
";

/// Index for latest-profile lookups.
pub const CREATE_PROFILES_USERNAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_profiles_username ON profiles(username)
";

/// Index for per-student feedback lookups.
pub const CREATE_FEEDBACK_STUDENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_feedback_student ON feedback(student_username)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ACCOUNTS_TABLE,
    CREATE_PROFILES_TABLE,
    CREATE_FEEDBACK_TABLE,
    CREATE_ACCOUNTS_USERNAME_INDEX,
    CREATE_PROFILES_USERNAME_INDEX,
    CREATE_FEEDBACK_STUDENT_INDEX,
    CREATE_METADATA_TABLE,
];
