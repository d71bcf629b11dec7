//! Tracing subscriber setup.
//!
//! Logs go to stderr so the wrapped command owns stdout.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "vaultkenv=debug"
    } else {
        "vaultkenv=info"
    }
}

/// Whether a `DEBUG` environment value turns on debug logging.
pub fn debug_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_parsing() {
        assert!(debug_enabled(Some("true")));
        assert!(debug_enabled(Some("TRUE")));
        assert!(!debug_enabled(Some("1")));
        assert!(!debug_enabled(Some("")));
        assert!(!debug_enabled(None));
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "vaultkenv=debug");
        assert_eq!(default_directive(false), "vaultkenv=info");
    }
}
