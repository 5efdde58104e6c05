/*!
Logging and profiling setup.

- Always: `fmt` layer filtered by `RUST_LOG`, with a default picked by build
  profile when the variable is unset.
- With `feature = "profiling"`: a `tracing-chrome` layer records every span
  (including the `profiling::all_functions` scopes of the library) into a
  `trace-*.json` file, flushed when the returned guard is dropped. Open it in
  Perfetto or `chrome://tracing`.
*/

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps profiling output alive; drop it last, at the end of `main`
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

fn set_default_filter() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }
}

/// Initialize the global tracing subscriber
pub fn setup_logging() -> LoggingGuard {
    set_default_filter();
    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());

    #[cfg(feature = "profiling")]
    {
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().build();
        let registry = tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer);
        if registry.try_init().is_err() {
            tracing::warn!("Global tracing subscriber already set; keeping it");
        }
        tracing::info!("Tracing initialized with chrome profiling layer");
        LoggingGuard { _chrome: guard }
    }

    #[cfg(not(feature = "profiling"))]
    {
        let registry = tracing_subscriber::registry().with(fmt_layer);
        if registry.try_init().is_err() {
            tracing::warn!("Global tracing subscriber already set; keeping it");
        }
        tracing::debug!("Logging initialized (profiling disabled in this build)");
        LoggingGuard {}
    }
}
