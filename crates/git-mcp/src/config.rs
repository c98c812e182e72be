//! Server configuration
//!
//! Parsed from an optional TOML file and then overridden by command-line
//! flags. Every field has a default, so an empty file is a valid config.
//!
//! ```toml
//! repository = "/srv/project"
//! network_timeout_secs = 60
//! serialize_per_path = true
//!
//! [identity]
//! name = "Automation"
//! email = "automation@example.com"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use git_backend::Identity;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 120;

fn default_network_timeout() -> u64 {
    DEFAULT_NETWORK_TIMEOUT_SECS
}

fn default_serialize() -> bool {
    true
}

/// Fallback commit signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Repository used when a call does not name one
    #[serde(default)]
    pub repository: Option<PathBuf>,

    /// Deadline for fetch, pull and push
    #[serde(default = "default_network_timeout")]
    pub network_timeout_secs: u64,

    /// Hold a per-path lock for the duration of each call
    #[serde(default = "default_serialize")]
    pub serialize_per_path: bool,

    #[serde(default)]
    pub identity: Option<IdentityConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            repository: None,
            network_timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
            serialize_per_path: true,
            identity: None,
        }
    }
}

impl ServerConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.check_values()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    fn check_values(&self) -> Result<()> {
        if self.network_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "network_timeout_secs must be greater than zero".into(),
            ));
        }
        let blank_identity = self
            .identity
            .as_ref()
            .is_some_and(|id| id.name.trim().is_empty() || id.email.trim().is_empty());
        if blank_identity {
            return Err(Error::InvalidConfig(
                "identity name and email must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check that values are usable and the default repository resolves.
    pub fn validate(&self) -> Result<()> {
        self.check_values()?;
        if let Some(path) = &self.repository {
            git_backend::resolve(path).map_err(|source| Error::InvalidRepository {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn fallback_identity(&self) -> Option<Identity> {
        self.identity
            .as_ref()
            .map(|id| Identity::new(&id.name, &id.email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_test_utils::TestRepo;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(ServerConfig::parse("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn parses_every_field() {
        let config = ServerConfig::parse(
            r#"
repository = "/srv/project"
network_timeout_secs = 5
serialize_per_path = false

[identity]
name = "Bot"
email = "bot@example.com"
"#,
        )
        .unwrap();

        assert_eq!(config.repository, Some(PathBuf::from("/srv/project")));
        assert_eq!(config.network_timeout(), Duration::from_secs(5));
        assert!(!config.serialize_per_path);
        assert_eq!(
            config.fallback_identity(),
            Some(Identity::new("Bot", "bot@example.com"))
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            ServerConfig::parse("timeout = 3"),
            Err(Error::TomlParse(_))
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(matches!(
            ServerConfig::parse("network_timeout_secs = 0"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ServerConfig::load(&temp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn validate_checks_default_repository() {
        let repo = TestRepo::new();
        let good = ServerConfig {
            repository: Some(repo.root().to_path_buf()),
            ..ServerConfig::default()
        };
        assert!(good.validate().is_ok());

        let temp = TempDir::new().unwrap();
        let bad = ServerConfig {
            repository: Some(temp.path().to_path_buf()),
            ..ServerConfig::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidRepository { .. })));
    }
}
