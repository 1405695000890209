/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

fn parse_level(log_level: &str) -> Level {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => Level::DEBUG,
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Sets up the global tracing subscriber.
///
/// The level is read from the `LOGLEVEL` environment variable and defaults to `INFO`.
/// Only the first call in a process installs the subscriber, later calls are ignored.
pub fn setup_logger() {
    let log_level = env::var("LOGLEVEL").unwrap_or_else(|_| "INFO".to_string());
    setup_logger_with_level(&log_level);
}

/// Sets up the global tracing subscriber with an explicit level
/// (`TRACE`, `DEBUG`, `INFO`, `WARN` or `ERROR`, case insensitive).
pub fn setup_logger_with_level(log_level: &str) {
    let level = parse_level(log_level);
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_thread_names(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("Log level set to: {}", level);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }

    #[test]
    fn test_setup_logger_is_idempotent() {
        setup_logger_with_level("DEBUG");
        setup_logger();
    }
}
