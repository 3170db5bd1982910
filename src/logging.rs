//! Structured logging via `tracing`.
//!
//! Events go to stderr so they never interleave with the narrative text on
//! stdout. `MIRAS_LOG` takes any `EnvFilter` directive and wins over the
//! configured level; `--verbose` raises the floor to `debug`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "MIRAS_LOG";

pub fn init(level: &str, verbose: bool) {
    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), level, verbose);

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn build_filter(env: Option<&str>, level: &str, verbose: bool) -> EnvFilter {
    if let Some(directives) = env.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    let level = if verbose { "debug" } else { level };
    EnvFilter::try_new(format!("miras={level}")).unwrap_or_else(|_| EnvFilter::new("miras=warn"))
}
