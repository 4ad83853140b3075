//! `mentorlink` - Mentor and student records
//!
//! Students sign up, submit their details and test marks, and read the
//! feedback their mentor leaves. Mentors browse the students who have
//! submitted and write feedback. Records live in append-only tables backed
//! by CSV files or a `SQLite` database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod services;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use models::{Account, FeedbackNote, Profile, Role};
pub use navigation::{transition, Action, NavigationState, Outcome, Screen};
pub use services::Services;
pub use session::Console;
pub use storage::{RecordTable, StorageStats, Tables};
