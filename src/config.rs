use anyhow::{Context, Result, bail};
use declarative::Collection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::acl::AclEntry;
use crate::ontap::ClientSettings;

/// Get the config directory path (~/.config/aclsync)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("aclsync"))
}

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Config
// ============================================================================

/// Declared shares and the clusters they live on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionProfile>,
    #[serde(default)]
    pub shares: Vec<ShareConfig>,
}

/// How to reach one cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub hostname: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable holding the password
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

fn default_validate_certs() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_job_timeout_secs() -> u64 {
    600
}

/// One CIFS share whose ACL is managed declaratively
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    pub name: String,
    pub svm: String,
    pub connection: String,
    #[serde(default)]
    pub acls: Vec<AclEntry>,
}

impl ShareConfig {
    /// Identity used in state and output: `svm/share`
    pub fn id(&self) -> String {
        format!("{}/{}", self.svm, self.name)
    }

    /// Declared ACL, not yet checked for duplicate keys
    pub fn desired(&self) -> Collection<AclEntry> {
        Collection::unchecked(self.acls.clone())
    }
}

impl ConnectionProfile {
    /// Resolve the password from the profile or its environment variable
    pub fn password(&self) -> Result<String> {
        match (&self.password, &self.password_env) {
            (Some(password), None) => Ok(password.clone()),
            (None, Some(var)) => std::env::var(var)
                .with_context(|| format!("Environment variable {var} is not set")),
            _ => bail!("Exactly one of password or password_env must be set"),
        }
    }

    /// Build REST client settings for this profile
    pub fn client_settings(&self) -> Result<ClientSettings> {
        Ok(ClientSettings {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password()?,
            validate_certs: self.validate_certs,
            timeout: Duration::from_secs(self.timeout_secs),
            job_timeout: Duration::from_secs(self.job_timeout_secs),
        })
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!(
            "Loaded {} shares and {} connections from {}",
            config.shares.len(),
            config.connections.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate config text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, profile) in &self.connections {
            if profile.password.is_some() == profile.password_env.is_some() {
                bail!("Connection '{name}': set exactly one of password or password_env");
            }
        }

        let mut seen = HashSet::new();
        for share in &self.shares {
            if !self.connections.contains_key(&share.connection) {
                bail!(
                    "Share '{}' uses undefined connection '{}'",
                    share.id(),
                    share.connection
                );
            }
            if !seen.insert(share.id()) {
                bail!("Share '{}' is declared more than once", share.id());
            }
        }
        Ok(())
    }

    /// Look up a connection profile by name
    pub fn connection(&self, name: &str) -> Result<&ConnectionProfile> {
        self.connections
            .get(name)
            .with_context(|| format!("Unknown connection '{name}'"))
    }

    /// Shares matching a target filter
    pub fn select(&self, target: Option<&str>) -> Vec<&ShareConfig> {
        self.shares
            .iter()
            .filter(|share| matches_target(share, target))
            .collect()
    }
}

/// Check if a share matches a target
///
/// Target format: "svm/share", "svm/" or "share"
fn matches_target(share: &ShareConfig, target: Option<&str>) -> bool {
    let Some(target) = target else {
        return true;
    };

    match target.split_once('/') {
        Some((svm, "")) => share.svm == svm,
        Some((svm, name)) => share.svm == svm && share.name == name,
        None => share.name == target,
    }
}
