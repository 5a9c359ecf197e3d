use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration, deserializable from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RsmqConfig {
    /// Key namespace; every key is prefixed with `<ns>:`.
    pub ns: String,
    pub redis: RedisConfig,
}

/// Connection settings for the Redis server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    /// Connect/read/write timeout per call. 0 disables the timeout.
    pub timeout_ms: u64,
}

impl RedisConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl Default for RsmqConfig {
    fn default() -> Self {
        Self {
            ns: "rsmq".to_string(),
            redis: RedisConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = RsmqConfig::default();
        assert_eq!(config.ns, "rsmq");
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.redis.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn toml_parsing_with_overrides() {
        let toml_str = r#"
            ns = "jobs"

            [redis]
            url = "redis://cache.internal:6380/2"
            timeout_ms = 250
        "#;
        let config: RsmqConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ns, "jobs");
        assert_eq!(config.redis.url, "redis://cache.internal:6380/2");
        assert_eq!(config.redis.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn toml_parsing_empty_uses_defaults() {
        let config: RsmqConfig = toml::from_str("").unwrap();
        assert_eq!(config.ns, "rsmq");
        assert_eq!(config.redis.timeout_ms, 5_000);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config: RsmqConfig = toml::from_str("[redis]\ntimeout_ms = 0").unwrap();
        assert_eq!(config.redis.timeout(), None);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
    }
}
