//! Tracing bootstrap shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,dupscan=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `configured`; an unparsable directive falls back to
/// [`DEFAULT_FILTER`]. Calling this twice is harmless: the second call
/// leaves the first subscriber in place.
pub fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing("debug");
        init_tracing("not a [valid filter");
        tracing::debug!("still logging");
    }
}
