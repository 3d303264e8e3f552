//! Tool resolution: turning version files, environment overrides and
//! config-declared dependencies into one deduplicated list of tools.
//!
//! Sources are collected in precedence order and the first occurrence of a
//! normalized name wins:
//!
//! 1. `AGENT_EN_PLACE_TOOLS` environment overrides
//! 2. `.tool-versions`
//! 3. `mise.toml`
//! 4. Idiomatic version files (`.nvmrc`, `.python-version`, ...)
//! 5. Tools the selected agent depends on in config

pub mod collect;
pub mod deps;
pub mod idiomatic;
pub mod sources;

pub use collect::{build_image_name, collect_tool_specs, CollectResult, IMAGE_REPOSITORY};
pub use idiomatic::IdiomaticInfo;

/// Version used whenever a source does not pin one
pub const DEFAULT_VERSION: &str = "latest";

/// Where a tool descriptor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// `.tool-versions` or `mise.toml`; unlocks the tool's own dependencies
    User,
    /// Idiomatic version file (`.nvmrc`, ...); pins a version but unlocks nothing
    Idiomatic,
    /// Declared as a dependency in the merged config
    Config,
    /// `AGENT_EN_PLACE_TOOLS`
    EnvironmentOverride,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Raw identifier as given by its source (e.g. `npm:@openai/codex`)
    pub name: String,
    pub version: String,
    /// Friendly name for image labels (e.g. `codex`)
    pub label: String,
    pub provenance: Provenance,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>, provenance: Provenance) -> Self {
        let name = name.into();
        let version = version.into();
        let version = if version.trim().is_empty() {
            DEFAULT_VERSION.to_string()
        } else {
            version
        };
        Self {
            label: label_name(&name),
            name,
            version,
            provenance,
        }
    }

    /// Dedup key for this tool
    pub fn key(&self) -> String {
        sanitize_tag_component(&self.name)
    }
}

/// Friendly label for a tool name.
///
/// `npm:@openai/codex` becomes `codex`, `npm:opencode-ai` becomes `opencode-ai`.
pub fn label_name(tool: &str) -> String {
    if let Some((_, last)) = tool.rsplit_once('/') {
        return last.to_string();
    }
    if let Some((_, rest)) = tool.split_once(':') {
        return rest.to_string();
    }
    tool.to_string()
}

/// Normalize a value for use in an image tag and as a dedup key.
///
/// Lowercases, keeps `[a-z0-9.]`, maps `+ @ : / _ -` to a single hyphen and
/// drops anything else. Leading and trailing hyphens are trimmed.
pub fn sanitize_tag_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_hyphen = false;

    for c in value.trim().to_lowercase().chars() {
        match c {
            'a'..='z' | '0'..='9' | '.' => {
                out.push(c);
                last_hyphen = false;
            }
            '+' | '@' | ':' | '/' | '_' | '-' => {
                if !last_hyphen {
                    out.push('-');
                    last_hyphen = true;
                }
            }
            _ => {}
        }
    }

    out.trim_matches('-').to_string()
}

/// Split a `name[@version]` token into name and version.
///
/// The last `@` separates the version, unless it starts the name or follows a
/// scheme prefix (`@org/pkg`, `npm:@org/pkg`). A missing or empty version is
/// [`DEFAULT_VERSION`].
pub fn split_tool_version(token: &str) -> (String, String) {
    let token = token.trim();

    let split = token.rfind('@').filter(|&idx| {
        idx > 0 && !token[..idx].ends_with(':') && !token[idx + 1..].contains('/')
    });

    match split {
        Some(idx) => {
            let version = token[idx + 1..].trim();
            let version = if version.is_empty() {
                DEFAULT_VERSION
            } else {
                version
            };
            (token[..idx].to_string(), version.to_string())
        }
        None => (token.to_string(), DEFAULT_VERSION.to_string()),
    }
}
