//! Account, profile and feedback services.
//!
//! Each service wraps one table and holds the rules for reading and writing
//! it. [`Services`] bundles the three for the navigation layer.

mod account;
mod feedback;
mod profile;

pub use account::{AccountService, Authenticated};
pub use feedback::FeedbackService;
pub use profile::ProfileService;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Tables;

/// The services a session dispatches actions to.
#[derive(Debug, Clone)]
pub struct Services {
    /// Signup and login.
    pub accounts: AccountService,
    /// Student profile submissions.
    pub profiles: ProfileService,
    /// Mentor feedback.
    pub feedback: FeedbackService,
}

impl Services {
    /// Build the services over already opened tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the account settings in `config` are invalid.
    pub fn new(tables: &Tables, config: &Config) -> Result<Self> {
        Ok(Self {
            accounts: AccountService::new(tables.accounts.clone(), &config.auth)?,
            profiles: ProfileService::new(tables.profiles.clone()),
            feedback: FeedbackService::new(tables.feedback.clone()),
        })
    }

    /// Open the configured tables and build the services over them.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be opened or the account
    /// settings are invalid.
    pub fn open(config: &Config) -> Result<Self> {
        let tables = Tables::open(config)?;
        Self::new(&tables, config)
    }
}
