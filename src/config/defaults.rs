//! Default configuration values
//!
//! Provides default configuration instances and helper functions.

use std::time::Duration;

use super::schema::Config;

/// Snapshot time-to-live when none is configured
pub const DEFAULT_TTL: &str = "24h";

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

pub fn default_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

pub fn default_route53_max_records() -> i64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_matches_string() {
        assert_eq!(super::super::parse_duration(DEFAULT_TTL).unwrap(), default_ttl());
        assert_eq!(default_config().ttl, DEFAULT_TTL);
    }
}
