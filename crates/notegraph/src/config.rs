use anyhow::Context;
use notegraph_core::GraphStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What to do when two notes would share a case-insensitive title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Allow it; references resolve to the earliest note and a warning is logged.
    #[default]
    FirstMatch,
    /// Refuse creates and renames that would introduce a collision.
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet period after a change notification before the pass runs
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 250 }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Engine configuration, usually read from a TOML file. Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Owner whose notes form the collection
    pub owner: String,
    pub collision_policy: CollisionPolicy,
    pub watcher: WatcherConfig,
    pub graph: GraphStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner: "local".to_string(),
            collision_policy: CollisionPolicy::default(),
            watcher: WatcherConfig::default(),
            graph: GraphStyle::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
