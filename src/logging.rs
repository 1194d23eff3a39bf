//! Structured logging setup

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

fn parse_level(level: &str) -> Level {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber once. `RUST_LOG` directives take precedence
/// over `level`; unknown level names fall back to INFO.
pub fn init_logging(level: &str, json: bool) {
    let level = parse_level(level);

    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let installed = if json {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        };

        if installed.is_ok() {
            tracing::debug!(%level, json, "logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" Warning "), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging("info", false);
        init_logging("debug", true);
    }
}
