//! Tracing setup for `serve`.
//!
//! Output goes to stderr so `keygen` and `inspect` keep stdout for their
//! results. `RUST_LOG` overrides [`DEFAULT_FILTER`].

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "badge_node=info,badge_protocol=info,tower_http=info";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber. Panics if one is already set.
pub fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.with_file(true).with_line_number(true).init(),
        LogFormat::Json => builder.json().init(),
    }
    tracing::debug!(?format, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!(LogFormat::from_str("JSON", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("pretty", true), Ok(LogFormat::Pretty));
        assert!(LogFormat::from_str("yaml", true).is_err());
    }

    #[test]
    fn default_filter_covers_both_crates() {
        let filter = EnvFilter::new(DEFAULT_FILTER).to_string();
        assert!(filter.contains("badge_node=info"));
        assert!(filter.contains("badge_protocol=info"));
    }
}
