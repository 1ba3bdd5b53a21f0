use std::env;

use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str =
    "info,eiweet=debug,eiweet_core=debug,eiweet_llm=debug,eiweet_sheets=debug";

/// `RUST_LOG` wins when set; otherwise `info`, or debug for our crates when verbose.
pub fn init(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn env_flag() -> bool {
    env::var("EIWEET_VERBOSE")
        .map(|value| parse_bool(value.trim()))
        .unwrap_or(false)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
