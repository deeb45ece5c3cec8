use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Collection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::acl::AclEntry;

// ============================================================================
// State Structures
// ============================================================================

/// Recorded state of every managed share
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AclState {
    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Applied ACL per share, keyed by `svm/share`
    #[serde(default)]
    pub shares: BTreeMap<String, ShareState>,
}

/// Recorded state of one share's ACL
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ShareState {
    /// Last time a cycle finished without error
    pub last_applied: Option<DateTime<Utc>>,

    /// Last time the ACL was read from the cluster
    pub last_refreshed: Option<DateTime<Utc>>,

    /// Error that ended the most recent cycle, if it failed
    pub last_error: Option<String>,

    /// Entries known to exist on the share after the last cycle,
    /// including any default the cluster injected
    #[serde(default)]
    pub acls: Collection<AclEntry>,
}

// ============================================================================
// AclState Implementation
// ============================================================================

impl AclState {
    /// Get the state directory path (~/.local/state/aclsync)
    pub fn state_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".local").join("state").join("aclsync"))
    }

    /// Default state file location
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::state_dir()?.join("state.toml"))
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: AclState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    // ========================================================================
    // Share State Helpers
    // ========================================================================

    /// Recorded state of a share, if any
    pub fn share(&self, id: &str) -> Option<&ShareState> {
        self.shares.get(id)
    }

    /// Get or create share state
    pub fn get_share_mut(&mut self, id: &str) -> &mut ShareState {
        self.shares.entry(id.to_string()).or_default()
    }

    /// Applied ACL of a share, `None` if the share was never read or applied
    pub fn applied(&self, id: &str) -> Option<Collection<AclEntry>> {
        self.shares.get(id).map(|s| s.acls.clone())
    }

    /// Record the outcome of a successful cycle
    pub fn mark_applied(&mut self, id: &str, acls: Collection<AclEntry>) {
        let state = self.get_share_mut(id);
        state.acls = acls;
        state.last_applied = Some(Utc::now());
        state.last_error = None;
    }

    /// Record the partial outcome of a failed cycle
    ///
    /// The collection still reflects every operation that succeeded, so the
    /// next cycle only retries what is left.
    pub fn mark_failed(&mut self, id: &str, acls: Collection<AclEntry>, error: &str) {
        let state = self.get_share_mut(id);
        state.acls = acls;
        state.last_error = Some(error.to_string());
    }

    /// Record an ACL read from the cluster
    pub fn mark_refreshed(&mut self, id: &str, acls: Collection<AclEntry>) {
        let state = self.get_share_mut(id);
        state.acls = acls;
        state.last_refreshed = Some(Utc::now());
    }

    /// Drop shares that are no longer declared, returning their ids
    pub fn prune(&mut self, declared: &[String]) -> Vec<String> {
        let stale: Vec<String> = self
            .shares
            .keys()
            .filter(|id| !declared.contains(id))
            .cloned()
            .collect();
        for id in &stale {
            self.shares.remove(id);
        }
        stale
    }
}

impl Default for AclState {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
            shares: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
