//! # Structured Logging Module
//!
//! Environment-aware structured logging for the server runtime. Resolution
//! traces, dispatch failures and view-engine errors all flow through
//! `tracing`; this module wires up a sensible default subscriber.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the default subscriber with environment-specific configuration.
///
/// Idempotent: repeated calls (or an already-installed global subscriber from
/// the embedding application) are tolerated silently.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        // MANIFEST_LOG_FORMAT=json switches to machine-readable output for
        // log shippers.
        let json_output =
            std::env::var("MANIFEST_LOG_FORMAT").is_ok_and(|format| format == "json");

        let initialized = if json_output {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_filter(filter),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_filter(filter),
                )
                .try_init()
        };

        if initialized.is_err() {
            tracing::debug!(
                "global tracing subscriber already initialized - continuing with existing one"
            );
        }

        tracing::debug!(environment = %environment, "logging initialized");
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("MANIFEST_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "test" => "debug",
        "development" => "debug",
        "production" => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("MANIFEST_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("MANIFEST_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }
}
