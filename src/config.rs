use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::payload::SummaryLimits;
use crate::roles::{builtin_roles, default_lead_tools, RoleDefinition};

/// Tracker settings. Every field has a default, so an empty TOML file (or
/// no file at all) gives the stock research-agent setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Directory holding `session_<timestamp>/` directories.
    pub log_root: PathBuf,
    /// Tools whose invocation spawns a subagent.
    pub spawn_tools: Vec<String>,
    /// Input fields consulted, in order, for the spawned role name.
    pub role_keys: Vec<String>,
    pub summary: SummaryLimits,
    /// Keep at most this many sessions under `log_root`. `None` keeps all.
    pub max_sessions: Option<usize>,
    pub lead_tools: Vec<String>,
    pub roles: Vec<RoleDefinition>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_root: PathBuf::from("logs"),
            spawn_tools: vec!["Task".to_string()],
            role_keys: vec!["subagent_type".to_string(), "role".to_string()],
            summary: SummaryLimits::default(),
            max_sessions: None,
            lead_tools: default_lead_tools(),
            roles: builtin_roles(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| TrackerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&data).map_err(|source| TrackerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    pub fn is_spawn_tool(&self, tool_name: &str) -> bool {
        self.spawn_tools.iter().any(|t| t == tool_name)
    }
}
