use crate::config::ToolSpec;
use crate::error::{AgentError, Result};
use crate::tools::sources::mise_tool_names;
use crate::tools::{CollectResult, DEFAULT_VERSION};
use serde::Serialize;
use std::collections::BTreeMap;

/// File name of the generated manifest, activated with `mise --env agent`
pub const AGENT_MANIFEST: &str = "mise.agent.toml";

#[derive(Debug, Serialize)]
struct AgentManifest<'a> {
    tools: BTreeMap<&'a str, &'a str>,
}

/// Build `mise.agent.toml`: a `[tools]` table with everything the agent needs
/// that the user's own `mise.toml` does not already declare.
///
/// Keys are sorted. The first entry for a key wins. Nothing to declare
/// renders as an empty string.
pub fn build_agent_mise_config(
    user_mise: Option<&[u8]>,
    collection: &CollectResult,
    spec: &ToolSpec,
) -> Result<String> {
    let user_tools = match user_mise {
        Some(data) if !data.is_empty() => mise_tool_names(data)?,
        _ => Default::default(),
    };

    let mut tools: BTreeMap<&str, &str> = BTreeMap::new();

    for info in &collection.infos {
        let version = info.version.trim();
        if version.is_empty() {
            continue;
        }
        let key = if info.config_key.is_empty() {
            info.tool.as_str()
        } else {
            info.config_key.as_str()
        };
        if !user_tools.contains(key) {
            tools.entry(key).or_insert(version);
        }
    }

    if !user_tools.contains(&spec.config_key) {
        tools
            .entry(spec.config_key.as_str())
            .or_insert(DEFAULT_VERSION);
    }

    if tools.is_empty() {
        return Ok(String::new());
    }
    toml::to_string(&AgentManifest { tools }).map_err(AgentError::ManifestRender)
}
