//! Console logging setup for programs built on this crate.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level selected by the usual `--debug` / `--verbose` flags
pub fn log_level(debug: bool, verbose: bool) -> &'static str {
    if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Install a colored stderr subscriber at the level chosen by the flags.
///
/// `RUST_LOG` takes precedence when set. Fails if a global subscriber is already
/// installed.
pub fn setup_logging(debug: bool, verbose: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(debug, verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(true, true), "debug");
        assert_eq!(log_level(true, false), "debug");
        assert_eq!(log_level(false, true), "info");
        assert_eq!(log_level(false, false), "warn");
    }

    #[test]
    fn test_second_setup_fails() {
        let _ = setup_logging(false, false);
        assert!(setup_logging(true, false).is_err());
    }
}
