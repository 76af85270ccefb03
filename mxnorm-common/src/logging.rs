use std::{io::IsTerminal, str::FromStr};

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// Events about the MX cache: hits, misses, expiry and eviction.
#[macro_export]
macro_rules! cache {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "cache", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::cache!(level = TRACE, $($msg),*)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

const fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    }
}

/// Picks the first level that parses: `explicit`, then `from_env`, then the
/// build default. Unparseable values are reported and skipped.
fn resolve_level(explicit: Option<&str>, from_env: Option<&str>) -> LevelFilter {
    [("--log-level", explicit), ("LOG_LEVEL", from_env)]
        .into_iter()
        .find_map(|(source, value)| {
            let value = value?;
            LevelFilter::from_str(value)
                .map_err(|_| eprintln!("Ignoring invalid {source} value {value:?}"))
                .ok()
        })
        .unwrap_or_else(default_level)
}

/// Install the global subscriber writing to stderr, so stdout stays free for
/// results. `level` overrides the `LOG_LEVEL` environment variable.
///
/// Colours are only used when stderr is a terminal.
pub fn init(level: Option<&str>) {
    let from_env = std::env::var("LOG_LEVEL").ok();
    let level = resolve_level(level, from_env.as_deref());

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false)
                .compact()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("mxnorm")
                })),
        )
        .init();
}
