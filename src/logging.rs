//! Logging setup for the command-line tool.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "atlas=debug,info"
    } else {
        "info"
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. Returns `false` when a
/// subscriber was already installed.
pub fn init_logging(verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        for verbose in [false, true] {
            assert!(default_filter(verbose).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn test_second_init_is_rejected() {
        init_logging(false);
        assert!(!init_logging(true));
    }
}
