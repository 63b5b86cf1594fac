//! Console logging setup.

use chrono::Local;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str =
    "media_collector=info,acquire_engine=info,bilibili_client=info,sqlx=warn";

/// Timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter
/// unless `verbose` or `quiet` is set.
pub fn init_logging(verbose: bool, quiet: bool) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(fmt::layer().with_timer(LocalTimer).with_target(verbose))
        .try_init()?;
    Ok(())
}
