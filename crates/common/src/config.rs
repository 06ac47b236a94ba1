//! Engine configuration, usually read from a `sealvault.toml`.
//!
//! ```toml
//! default_scheme = "share_key"
//! migrate_history = true
//! migration_concurrency = 4
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::share::CryptoScheme;

pub const CONFIG_FILE_NAME: &str = "sealvault.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scheme new vaults are provisioned with
    #[serde(default)]
    pub default_scheme: CryptoScheme,
    /// Carry history entries along when migrating an item
    #[serde(default = "default_migrate_history")]
    pub migrate_history: bool,
    /// Items migrated in parallel by the async service
    #[serde(default = "default_migration_concurrency")]
    pub migration_concurrency: usize,
}

fn default_migrate_history() -> bool {
    true
}

fn default_migration_concurrency() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_scheme: CryptoScheme::default(),
            migrate_history: default_migrate_history(),
            migration_concurrency: default_migration_concurrency(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(config_toml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(config_toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.display().to_string()));
        }
        let config_toml = fs::read_to_string(path)?;
        Self::from_toml_str(&config_toml)
    }

    /// Load `path`, or the defaults if no file is there
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::MissingFile(_)) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.migration_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "migration_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing config file: {0}")]
    MissingFile(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_scheme, CryptoScheme::ShareKey);
        assert!(config.migrate_history);
        assert_eq!(config.migration_concurrency, 4);
    }

    #[test]
    fn test_partial() {
        let config = EngineConfig::from_toml_str(
            r#"
            default_scheme = "legacy_vault_key"
            migrate_history = false
            "#,
        )
        .unwrap();
        assert_eq!(config.default_scheme, CryptoScheme::LegacyVaultKey);
        assert!(!config.migrate_history);
        assert_eq!(config.migration_concurrency, 4);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = EngineConfig::from_toml_str("migration_concurrency = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let result = EngineConfig::from_toml_str(r#"default_scheme = "pgp""#);
        assert!(matches!(result, Err(ConfigError::TomlDe(_))));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = EngineConfig {
            default_scheme: CryptoScheme::LegacyVaultKey,
            migrate_history: false,
            migration_concurrency: 8,
        };
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
