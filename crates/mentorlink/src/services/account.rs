//! Signup and login.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, Error, Result};
use crate::hasher;
use crate::models::{Account, Role};
use crate::storage::AccountTable;

/// The outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    /// The stored account that matched.
    pub account: Account,
    /// Role the session runs as: the role claimed at login.
    pub role: Role,
}

/// Account creation and credential checks over the accounts table.
#[derive(Debug, Clone)]
pub struct AccountService {
    table: Arc<AccountTable>,
    username_pattern: Regex,
    unique_usernames: bool,
    verify_role: bool,
}

impl AccountService {
    /// Create the service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the username pattern is not a
    /// valid regex.
    pub fn new(table: Arc<AccountTable>, config: &AuthConfig) -> Result<Self> {
        let username_pattern =
            Regex::new(&config.username_pattern).map_err(|e| Error::ConfigValidation {
                message: format!("invalid username_pattern regex: {e}"),
            })?;
        Ok(Self {
            table,
            username_pattern,
            unique_usernames: config.unique_usernames,
            verify_role: config.verify_role,
        })
    }

    /// Register a new account.
    ///
    /// Only the digest of `password` is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank or malformed username,
    /// [`Error::UsernameTaken`] if uniqueness is enforced and the name is
    /// registered, or a storage error.
    pub fn signup(&self, username: &str, password: &str, role: Role) -> Result<Account> {
        if username.trim().is_empty() {
            return Err(Error::validation("username must not be blank"));
        }
        if !self.username_pattern.is_match(username) {
            return Err(Error::validation(format!(
                "username '{username}' does not match {}",
                self.username_pattern.as_str()
            )));
        }

        let account = Account {
            username: username.to_string(),
            password_digest: hasher::digest(password),
            role,
        };

        if self.unique_usernames {
            self.table.append_checked(&account, &|existing: &[Account]| {
                if existing.iter().any(|a| a.username == account.username) {
                    Err(Error::UsernameTaken(account.username.clone()))
                } else {
                    Ok(())
                }
            })?;
        } else {
            self.table.append(&account)?;
        }

        info!("Signed up {} as {}", account.username, account.role);
        Ok(account)
    }

    /// Check a username and password.
    ///
    /// The first stored account with `username` is the one checked. The
    /// claimed role becomes the session role; it is compared against the
    /// stored role only when `verify_role` is configured.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] or [`AuthError::BadCredential`]
    /// (wrapped in [`Error::Auth`]), or a storage error.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        claimed_role: Role,
    ) -> Result<Authenticated> {
        let accounts = self.table.load()?;
        let Some(account) = accounts.into_iter().find(|a| a.username == username) else {
            debug!("Login refused for {}: no such account", username);
            return Err(AuthError::NotFound.into());
        };

        if !hasher::verify(password, &account.password_digest) {
            debug!("Login refused for {}: password mismatch", username);
            return Err(AuthError::BadCredential.into());
        }

        if account.role != claimed_role {
            if self.verify_role {
                debug!(
                    "Login refused for {}: claimed {}, registered as {}",
                    username, claimed_role, account.role
                );
                return Err(AuthError::BadCredential.into());
            }
            warn!(
                "{} registered as {} but logged in as {}",
                username, account.role, claimed_role
            );
        }

        info!("Logged in {} as {}", username, claimed_role);
        Ok(Authenticated {
            account,
            role: claimed_role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CsvTable;

    fn service_with(config: &AuthConfig) -> (tempfile::TempDir, AccountService) {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<Account>::open(dir.path().join("user_data.csv")).unwrap();
        let service = AccountService::new(Arc::new(table), config).unwrap();
        (dir, service)
    }

    fn service() -> (tempfile::TempDir, AccountService) {
        service_with(&AuthConfig::default())
    }

    #[test]
    fn test_signup_stores_digest_not_password() {
        let (_dir, accounts) = service();
        accounts.signup("alice", "pw1", Role::Student).unwrap();

        let stored = accounts.table.load().unwrap();
        assert_eq!(
            stored,
            vec![Account {
                username: "alice".to_string(),
                password_digest: hasher::digest("pw1"),
                role: Role::Student,
            }]
        );
        assert_ne!(stored[0].password_digest, "pw1");
    }

    #[test]
    fn test_login_success_uses_claimed_role() {
        let (_dir, accounts) = service();
        accounts.signup("alice", "pw1", Role::Student).unwrap();

        let auth = accounts.login("alice", "pw1", Role::Student).unwrap();
        assert_eq!(auth.account.username, "alice");
        assert_eq!(auth.role, Role::Student);
    }

    #[test]
    fn test_login_wrong_password() {
        let (_dir, accounts) = service();
        accounts.signup("alice", "pw1", Role::Student).unwrap();

        let err = accounts.login("alice", "wrong", Role::Student).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::BadCredential)));
    }

    #[test]
    fn test_login_unknown_user() {
        let (_dir, accounts) = service();

        let err = accounts.login("nobody", "pw", Role::Mentor).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::NotFound)));
    }

    #[test]
    fn test_login_claimed_role_trusted_by_default() {
        let (_dir, accounts) = service();
        accounts.signup("alice", "pw1", Role::Student).unwrap();

        let auth = accounts.login("alice", "pw1", Role::Mentor).unwrap();
        assert_eq!(auth.role, Role::Mentor);
        assert_eq!(auth.account.role, Role::Student);
    }

    #[test]
    fn test_login_role_checked_when_configured() {
        let config = AuthConfig {
            verify_role: true,
            ..AuthConfig::default()
        };
        let (_dir, accounts) = service_with(&config);
        accounts.signup("alice", "pw1", Role::Student).unwrap();

        let err = accounts.login("alice", "pw1", Role::Mentor).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::BadCredential)));
        assert!(accounts.login("alice", "pw1", Role::Student).is_ok());
    }

    #[test]
    fn test_signup_duplicate_rejected() {
        let (_dir, accounts) = service();
        accounts.signup("alice", "pw1", Role::Student).unwrap();

        let err = accounts.signup("alice", "other", Role::Mentor).unwrap_err();
        assert!(matches!(err, Error::UsernameTaken(ref name) if name == "alice"));
        assert_eq!(accounts.table.count().unwrap(), 1);
    }

    #[test]
    fn test_signup_duplicate_allowed_when_not_unique_first_match_wins() {
        let config = AuthConfig {
            unique_usernames: false,
            ..AuthConfig::default()
        };
        let (_dir, accounts) = service_with(&config);
        accounts.signup("alice", "first", Role::Student).unwrap();
        accounts.signup("alice", "second", Role::Mentor).unwrap();

        assert_eq!(accounts.table.count().unwrap(), 2);
        assert!(accounts.login("alice", "first", Role::Student).is_ok());
        assert!(accounts.login("alice", "second", Role::Mentor).is_err());
    }

    #[test]
    fn test_signup_blank_username_rejected() {
        let (_dir, accounts) = service();

        for name in ["", "   "] {
            let err = accounts.signup(name, "pw", Role::Student).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(accounts.table.count().unwrap(), 0);
    }

    #[test]
    fn test_signup_username_pattern() {
        let (_dir, accounts) = service();

        let err = accounts.signup("alice smith", "pw", Role::Student).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_invalid_pattern_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::<Account>::open(dir.path().join("user_data.csv")).unwrap();
        let config = AuthConfig {
            username_pattern: "(".to_string(),
            ..AuthConfig::default()
        };

        let err = AccountService::new(Arc::new(table), &config).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_concurrent_duplicate_signups_store_one_account() {
        let (_dir, accounts) = service();

        let accepted: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..6)
                .map(|_| scope.spawn(|| accounts.signup("alice", "pw", Role::Student).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(accepted.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(accounts.table.count().unwrap(), 1);
    }
}
