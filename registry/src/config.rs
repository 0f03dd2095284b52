//! Registry configuration.
//!
//! The raw serde struct (with `Option` fields) stays private; it is resolved
//! into [`RegistryConfig`] at the deserialization boundary so a constructed
//! config is always usable as-is.

use serde::Deserialize;
use thiserror::Error;

use crate::timer::Timeout;

/// What `create` does when the identifier is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Fail with [`RegistryError::AlreadyPending`](crate::RegistryError::AlreadyPending).
    #[default]
    Reject,
    /// Cancel the prior entry (its awaiters see `Cancelled`) and install the new one.
    Replace,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid registry config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize)]
struct RawRegistryConfig {
    default_timeout_ms: Option<u64>,
    on_collision: Option<CollisionPolicy>,
}

/// Resolved registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawRegistryConfig")]
pub struct RegistryConfig {
    default_timeout: Timeout,
    on_collision: CollisionPolicy,
}

impl From<RawRegistryConfig> for RegistryConfig {
    fn from(raw: RawRegistryConfig) -> Self {
        Self {
            default_timeout: raw
                .default_timeout_ms
                .map_or(Timeout::Never, Timeout::from_millis),
            on_collision: raw.on_collision.unwrap_or_default(),
        }
    }
}

impl RegistryConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.default_timeout = timeout.into();
        self
    }

    #[must_use]
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.on_collision = policy;
        self
    }

    /// Timeout applied by [`OutcomeRegistry::create`](crate::OutcomeRegistry::create).
    #[must_use]
    pub fn default_timeout(&self) -> Timeout {
        self.default_timeout
    }

    #[must_use]
    pub fn on_collision(&self) -> CollisionPolicy {
        self.on_collision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = RegistryConfig::from_toml_str("").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.default_timeout(), Timeout::Never);
        assert_eq!(config.on_collision(), CollisionPolicy::Reject);
    }

    #[test]
    fn test_toml_overrides() {
        let config = RegistryConfig::from_toml_str(
            r#"
            default_timeout_ms = 2500
            on_collision = "replace"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.default_timeout(),
            Timeout::After(Duration::from_millis(2500))
        );
        assert_eq!(config.on_collision(), CollisionPolicy::Replace);
    }

    #[test]
    fn test_zero_timeout_means_never() {
        let config = RegistryConfig::from_toml_str("default_timeout_ms = 0").unwrap();
        assert_eq!(config.default_timeout(), Timeout::Never);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = RegistryConfig::from_toml_str(r#"on_collision = "ignore""#).unwrap_err();
        assert!(err.to_string().starts_with("invalid registry config"));
    }

    #[test]
    fn test_embedded_json_config() {
        let json = serde_json::json!({ "default_timeout_ms": 100 });
        let config: RegistryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.default_timeout(), Timeout::from_millis(100));
        assert_eq!(config.on_collision(), CollisionPolicy::Reject);
    }

    #[test]
    fn test_builder_methods() {
        let config = RegistryConfig::default()
            .with_default_timeout(Duration::from_secs(1))
            .with_collision_policy(CollisionPolicy::Replace);
        assert_eq!(config.default_timeout(), Timeout::from_millis(1000));
        assert_eq!(config.on_collision(), CollisionPolicy::Replace);
    }
}
