use std::io;

use anyhow::Context as _;
use tracing::{Level, subscriber::set_global_default};
use tracing_subscriber::FmtSubscriber;

/// Installs the global subscriber, writing formatted events to stderr.
pub fn init(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    set_global_default(subscriber).context("Failed to install the tracing subscriber")
}

/// Parses a level name such as `info` or `DEBUG`.
pub fn parse_level(name: &str) -> anyhow::Result<Level> {
    name.parse()
        .with_context(|| format!("Invalid log level: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert!(parse_level("loud").is_err());
    }
}
