//! Logging bootstrap for ferrykit bindings and tests.
//!
//! The engine crates only emit `tracing` events; installing a subscriber is
//! left to the embedding process through [`init_logging`].

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive string.
pub const C_ENV_LOG_FILTER: &str = "FERRYKIT_LOG";
pub const C_DEFAULT_DIRECTIVE: &str = "info";

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("invalid log directive `{directive}`: {message}")]
    InvalidDirective { directive: String, message: String },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Filter from `FERRYKIT_LOG`, falling back to `default_directive`.
pub fn build_env_filter(default_directive: &str) -> Result<EnvFilter, LogInitError> {
    match EnvFilter::try_from_env(C_ENV_LOG_FILTER) {
        Ok(filter) => Ok(filter),
        Err(_) => parse_directive(default_directive),
    }
}

pub fn parse_directive(directive: &str) -> Result<EnvFilter, LogInitError> {
    EnvFilter::try_new(directive).map_err(|e| LogInitError::InvalidDirective {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

/// Install a global `fmt` subscriber.
pub fn init_logging(default_directive: &str) -> Result<(), LogInitError> {
    let filter = build_env_filter(default_directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|_| LogInitError::AlreadyInitialized)
}

/// Route log output through the test harness; repeated calls are ignored.
pub fn try_init_for_tests() {
    let filter = build_env_filter("debug").unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::{LogInitError, parse_directive, try_init_for_tests};

    #[test]
    fn parse_directive_accepts_targets_and_levels() {
        parse_directive("info").expect("plain level");
        parse_directive("ferrykit_io_fs=trace,warn").expect("per-target level");
    }

    #[test]
    fn parse_directive_rejects_bad_level() {
        let err = parse_directive("ferrykit_io_fs=loud").expect_err("must fail");
        assert!(matches!(err, LogInitError::InvalidDirective { .. }));
        assert!(err.to_string().contains("ferrykit_io_fs=loud"));
    }

    #[test]
    fn test_init_is_repeatable() {
        try_init_for_tests();
        try_init_for_tests();
        tracing::debug!("logging ready");
    }
}
