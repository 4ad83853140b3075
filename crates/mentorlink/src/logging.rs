//! Diagnostic logging.
//!
//! Log lines are written to stderr; stdout belongs to the console session
//! and to `status`/`config` output. `RUST_LOG`, when set, replaces the
//! filter derived from the `-v`/`-q` flags.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much mentorlink logs, as chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors only.
    Quiet,
    /// No flag: signups, logins and stored records.
    #[default]
    Normal,
    /// `-v`: every dispatched action and table access.
    Verbose,
    /// `-vv`: lock traffic as well.
    Trace,
}

impl Verbosity {
    /// Map the `-q` flag and the `-v` count to a verbosity. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level that gets through.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset. Dependencies stay
    /// silent.
    #[must_use]
    pub fn directive(self) -> String {
        format!("mentorlink={}", self.level())
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// ```no_run
/// use mentorlink::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Route warnings to the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(false, 9), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
    }

    #[test]
    fn test_levels() {
        assert_eq!(Verbosity::Quiet.level(), Level::ERROR);
        assert_eq!(Verbosity::Normal.level(), Level::INFO);
        assert_eq!(Verbosity::Verbose.level(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.level(), Level::TRACE);
    }

    #[test]
    fn test_directive_scoped_to_crate() {
        assert_eq!(Verbosity::Normal.directive(), "mentorlink=INFO");
        assert_eq!(Verbosity::Trace.directive(), "mentorlink=TRACE");
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
