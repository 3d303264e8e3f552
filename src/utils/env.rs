use crate::tools::sources::parse_env_overrides;
use crate::tools::ToolDescriptor;
use std::collections::BTreeMap;

/// Comma separated `name[@version]` list of tools to install
pub const TOOLS_VAR: &str = "AGENT_EN_PLACE_TOOLS";

/// Install only the tools listed in [`TOOLS_VAR`]
pub const TOOLS_ONLY_VAR: &str = "AGENT_EN_PLACE_TOOLS_ONLY";

const MISE_PREFIX: &str = "MISE_";

/// mise variables controlled by the generated image itself
const RESERVED_MISE_VARS: &[&str] = &["MISE_ENV", "MISE_CONFIG_DIR"];

/// Tool overrides read from the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOverrides {
    pub tools: Vec<ToolDescriptor>,
    pub specified_only: bool,
}

impl ToolOverrides {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(TOOLS_VAR).ok().as_deref(),
            std::env::var(TOOLS_ONLY_VAR).ok().as_deref(),
        )
    }

    pub fn from_values(tools: Option<&str>, specified_only: Option<&str>) -> Self {
        Self {
            tools: tools.map(parse_env_overrides).unwrap_or_default(),
            specified_only: specified_only.is_some_and(is_truthy),
        }
    }
}

/// Boolean-ish environment value: `1`, `true`, `yes` or `on`
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Host `MISE_*` variables to pass through to the image build
pub fn mise_passthrough<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(key, _)| key.starts_with(MISE_PREFIX))
        .filter(|(key, _)| !RESERVED_MISE_VARS.contains(&key.as_str()))
        .collect()
}

/// Host `MISE_*` variables from the current process environment.
///
/// Variables whose name or value is not valid UTF-8 are skipped.
pub fn host_mise_env() -> BTreeMap<String, String> {
    mise_passthrough(
        std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }),
    )
}
