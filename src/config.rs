//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/shepherd/shepherd.toml`
//! 3. Local config: `<roster_dir>/.shepherd.toml` (next to the roster file)
//! 4. Environment variables: `SHEPHERD_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{HierarchyPolicy, DEFAULT_MAX_FAN_OUT, DEFAULT_ROOT_ROLE};

/// Hierarchy rules and labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Maximum direct counselees per node, the root included
    pub max_fan_out: usize,
    /// Role value marking a direct report of the root
    pub root_role: String,
    /// Display name of the virtual root
    pub root_label: String,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_fan_out: DEFAULT_MAX_FAN_OUT,
            root_role: DEFAULT_ROOT_ROLE.to_string(),
            root_label: "Pastor".to_string(),
        }
    }
}

impl HierarchyConfig {
    pub fn policy(&self) -> HierarchyPolicy {
        HierarchyPolicy {
            max_fan_out: self.max_fan_out,
            root_role: self.root_role.clone(),
        }
    }

    /// Overlay wins field by field where it specifies a value.
    pub fn merge(&self, overlay: &RawHierarchyConfig) -> Self {
        Self {
            max_fan_out: overlay.max_fan_out.unwrap_or(self.max_fan_out),
            root_role: overlay
                .root_role
                .clone()
                .unwrap_or_else(|| self.root_role.clone()),
            root_label: overlay
                .root_label
                .clone()
                .unwrap_or_else(|| self.root_label.clone()),
        }
    }
}

/// Raw hierarchy config for intermediate parsing (`None` = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawHierarchyConfig {
    pub max_fan_out: Option<usize>,
    pub root_role: Option<String>,
    pub root_label: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub roster_file: Option<PathBuf>,
    #[serde(default)]
    pub hierarchy: RawHierarchyConfig,
}

/// Unified configuration for shepherd.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// JSON roster file (default: ~/.shepherd/roster.json)
    pub roster_file: PathBuf,
    /// Hierarchy rules
    pub hierarchy: HierarchyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roster_file: dirs_default_roster_file(),
            hierarchy: HierarchyConfig::default(),
        }
    }
}

/// Get the default roster file (~/.shepherd/roster.json).
fn dirs_default_roster_file() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".shepherd"))
        .unwrap_or_else(|| PathBuf::from("~/.shepherd"))
        .join("roster.json")
}

/// Get the XDG config directory for shepherd.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "shepherd").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("shepherd.toml"))
}

/// Get the path to the local config file in a roster directory.
pub fn local_config_path(roster_dir: &Path) -> PathBuf {
    roster_dir.join(".shepherd.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_path(self.roster_file.to_string_lossy().as_ref());
        self.roster_file = PathBuf::from(expanded);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            roster_file: overlay
                .roster_file
                .clone()
                .unwrap_or_else(|| self.roster_file.clone()),
            hierarchy: self.hierarchy.merge(&overlay.hierarchy),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `roster_dir` - Optional directory of the roster file for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/shepherd/shepherd.toml`
    /// 3. Local config: `<roster_dir>/.shepherd.toml`
    /// 4. Environment variables: `SHEPHERD_*` prefix
    pub fn load(roster_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        let local = roster_dir
            .map(local_config_path)
            .filter(|p| p.exists());
        Self::load_from(global.as_deref(), local.as_deref())
    }

    /// Layered load from explicit file locations; env vars still apply.
    pub fn load_from(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(path) = global {
            current = current.merge_with(&load_raw_settings(path)?);
        }

        // 3. Local config
        if let Some(path) = local {
            current = current.merge_with(&load_raw_settings(path)?);
        }

        // 4. Apply environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply SHEPHERD_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let builder = Config::builder().add_source(
            Environment::with_prefix("SHEPHERD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("roster_file") {
            settings.roster_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<usize>("hierarchy.max_fan_out") {
            settings.hierarchy.max_fan_out = val;
        }
        if let Ok(val) = config.get_string("hierarchy.root_role") {
            settings.hierarchy.root_role = val;
        }
        if let Ok(val) = config.get_string("hierarchy.root_label") {
            settings.hierarchy.root_label = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.hierarchy.max_fan_out == 0 {
            return Err(ApplicationError::Config {
                message: "hierarchy.max_fan_out must be at least 1".to_string(),
            });
        }
        if self.hierarchy.root_role.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "hierarchy.root_role must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# shepherd configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/shepherd/shepherd.toml
#   Local:  <roster_dir>/.shepherd.toml
#   Env:    SHEPHERD_* environment variables (SHEPHERD_HIERARCHY__MAX_FAN_OUT=9)

# JSON roster file (array of {id, name, assignedCounselId, role})
# roster_file = "~/.shepherd/roster.json"

[hierarchy]
# Maximum direct counselees per counselor, the pastor included
# max_fan_out = 9

# Role marking a counselor who reports directly to the pastor
# root_role = "Counsel"

# Label of the virtual root in tree output
# root_label = "Pastor"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
