use crate::error::{AgentError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default configuration shipped inside the binary
pub const DEFAULT_CONFIG: &str = include_str!("../assets/config.toml");

/// Project-local config file, resolved relative to the working directory
pub const PROJECT_CONFIG_FILE: &str = ".agent-en-place.toml";

const USER_CONFIG_FILE: &str = "agent-en-place.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImageConfig {
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfigEntry>,

    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,

    #[serde(default)]
    pub image: ImageSettings,

    #[serde(default)]
    pub mise: MiseSettings,

    #[serde(default)]
    pub image_customizations: ImageCustomizations,
}

/// A tool the config knows about: default version, one optional dependency
/// and the apt packages it needs at build time.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ToolConfigEntry {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub depends: Option<String>,

    #[serde(default)]
    pub additional_packages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct AgentConfig {
    /// mise identifier used to install the agent (e.g. `npm:@openai/codex`)
    pub package_name: String,

    /// Command executed inside the container
    pub command: String,

    /// Config directory relative to the home directory, mounted into the container
    pub config_dir: String,

    #[serde(default)]
    pub additional_mounts: Vec<String>,

    /// Host environment variables forwarded to the container
    #[serde(default)]
    pub env_vars: Vec<String>,

    /// Tools this agent needs, by config key
    #[serde(default)]
    pub depends: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImageSettings {
    #[serde(default)]
    pub base: String,

    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MiseSettings {
    /// Shell commands installing mise, joined into a single RUN
    #[serde(default)]
    pub install: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImageCustomizations {
    #[serde(default)]
    pub packages: Vec<ImageCustomization>,
}

/// A single add/remove edit applied to `image.packages` after all layers merge
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageCustomization {
    pub op: String,
    pub value: String,
}

/// What the resolver and renderers need to know about the selected agent
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub mise_tool_name: String,
    /// Key of the agent's entry in the generated mise manifest
    pub config_key: String,
    pub command: String,
    pub config_dir: String,
    pub additional_mounts: Vec<String>,
    pub env_vars: Vec<String>,
}

impl AgentConfig {
    pub fn to_tool_spec(&self) -> ToolSpec {
        ToolSpec {
            mise_tool_name: self.package_name.clone(),
            config_key: self.package_name.clone(),
            command: self.command.clone(),
            config_dir: self.config_dir.clone(),
            additional_mounts: self.additional_mounts.clone(),
            env_vars: self.env_vars.clone(),
        }
    }
}

/// Locations of the optional config layers, in merge order
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub user: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub explicit: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations: XDG user config, `./.agent-en-place.toml`, then `explicit`
    pub fn discover(explicit: Option<&Path>) -> Self {
        Self {
            user: user_config_path(),
            project: Some(PathBuf::from(PROJECT_CONFIG_FILE)),
            explicit: explicit
                .filter(|path| !path.as_os_str().is_empty())
                .map(Path::to_path_buf),
        }
    }
}

impl ImageConfig {
    /// Load configuration with precedence (later wins):
    /// 1. Embedded default config
    /// 2. User config ($XDG_CONFIG_HOME/agent-en-place.toml or ~/.config/agent-en-place.toml)
    /// 3. Project config (./.agent-en-place.toml)
    /// 4. Explicit config path (--config)
    ///
    /// Image customizations from every layer are applied once, at the end.
    pub fn load_merged(default_config: &str, explicit: Option<&Path>) -> Result<Self> {
        Self::load_layers(default_config, &ConfigPaths::discover(explicit))
    }

    pub fn load_layers(default_config: &str, paths: &ConfigPaths) -> Result<Self> {
        let mut config = Self::from_default(default_config)?;

        for path in [paths.user.as_deref(), paths.project.as_deref()]
            .into_iter()
            .flatten()
        {
            if let Some(layer) = Self::from_file(path)? {
                config = config.merge(layer);
            }
        }

        // The user asked for this file explicitly, so a missing file is an error
        if let Some(path) = &paths.explicit {
            let layer =
                Self::from_file(path)?.ok_or_else(|| AgentError::ConfigNotFound(path.clone()))?;
            config = config.merge(layer);
        }

        Ok(config.apply_image_customizations())
    }

    fn from_default(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(AgentError::DefaultConfig)
    }

    /// Load one config layer, `None` if the file does not exist
    fn from_file(path: &Path) -> Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let config = toml::from_str(&contents).map_err(|source| AgentError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(mut self, other: Self) -> Self {
        // Tools and agents: per-key overwrite
        self.tools.extend(other.tools);
        self.agents.extend(other.agents);

        // Base image (replace if set)
        if !other.image.base.is_empty() {
            self.image.base = other.image.base;
        }

        // Package list and install commands describe a whole set (replace)
        if !other.image.packages.is_empty() {
            self.image.packages = other.image.packages;
        }
        if !other.mise.install.is_empty() {
            self.mise.install = other.mise.install;
        }

        self.mise.env.extend(other.mise.env);

        // Customizations (append)
        self.image_customizations
            .packages
            .extend(other.image_customizations.packages);

        self
    }

    /// Apply accumulated add/remove operations to `image.packages`
    fn apply_image_customizations(mut self) -> Self {
        for customization in &self.image_customizations.packages {
            match customization.op.as_str() {
                "add" => self.image.packages.push(customization.value.clone()),
                "remove" => {
                    let before = self.image.packages.len();
                    self.image
                        .packages
                        .retain(|package| package != &customization.value);
                    if self.image.packages.len() == before {
                        eprintln!(
                            "Warning: package '{}' not found for removal",
                            customization.value
                        );
                    }
                }
                other => {
                    eprintln!("Warning: unknown image customization operation '{}'", other);
                }
            }
        }
        self
    }

    /// Look up an agent by name
    pub fn agent(&self, name: &str) -> Result<&AgentConfig> {
        self.agents
            .get(name)
            .ok_or_else(|| AgentError::UnknownAgent {
                name: name.to_string(),
                available: self.agent_names(),
            })
    }

    /// Sorted list of configured agent names
    pub fn agent_names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}

/// Get the home directory
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

fn user_config_path() -> Option<PathBuf> {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir()?.join(".config"),
    };
    Some(config_home.join(USER_CONFIG_FILE))
}
