//! Parsers for the explicit version sources: `.tool-versions`, `mise.toml`
//! and the `AGENT_EN_PLACE_TOOLS` override list.
//!
//! Version detection is best-effort. A source that fails to parse yields no
//! tools instead of an error.

use super::{split_tool_version, Provenance, ToolDescriptor, DEFAULT_VERSION};
use crate::error::{AgentError, Result};
use std::collections::BTreeSet;

/// Parse `.tool-versions`: one `name [version ...]` per line, `#` comments.
/// Only the first version of a line is used.
pub fn parse_tool_versions(data: &[u8]) -> Vec<ToolDescriptor> {
    String::from_utf8_lossy(data)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let version = fields.next().unwrap_or(DEFAULT_VERSION);
            Some(ToolDescriptor::new(name, version, Provenance::User))
        })
        .collect()
}

/// Parse the `[tools]` table of a `mise.toml`, in key order.
///
/// Only string versions are understood; tables and arrays are skipped.
pub fn parse_mise_toml(data: &[u8]) -> Vec<ToolDescriptor> {
    let Some(tools) = tools_table(data) else {
        return Vec::new();
    };

    tools
        .iter()
        .filter_map(|(name, version)| {
            version
                .as_str()
                .map(|version| ToolDescriptor::new(name.as_str(), version, Provenance::User))
        })
        .collect()
}

/// Tool names declared in a user's `mise.toml`.
///
/// Unlike [`parse_mise_toml`] this fails on malformed input: the names decide
/// which tools the generated agent manifest leaves to the user's file.
pub fn mise_tool_names(data: &[u8]) -> Result<BTreeSet<String>> {
    let text = String::from_utf8_lossy(data);
    let document: toml::Table = toml::from_str(&text).map_err(AgentError::ManifestParse)?;

    Ok(document
        .get("tools")
        .and_then(toml::Value::as_table)
        .map(|tools| tools.keys().cloned().collect())
        .unwrap_or_default())
}

fn tools_table(data: &[u8]) -> Option<toml::Table> {
    let text = String::from_utf8_lossy(data);
    let mut document: toml::Table = toml::from_str(&text).ok()?;
    match document.remove("tools")? {
        toml::Value::Table(tools) => Some(tools),
        _ => None,
    }
}

/// Parse a comma separated `name[@version]` list, as found in `AGENT_EN_PLACE_TOOLS`
pub fn parse_env_overrides(value: &str) -> Vec<ToolDescriptor> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let (name, version) = split_tool_version(token);
            ToolDescriptor::new(name, version, Provenance::EnvironmentOverride)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(tools: &[ToolDescriptor]) -> Vec<(&str, &str)> {
        tools
            .iter()
            .map(|t| (t.name.as_str(), t.version.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_tool_versions() {
        let data = b"# runtimes\nnodejs 20.10.0\n\npython 3.12.0 3.11.0\n  ruby  \n";
        let tools = parse_tool_versions(data);
        assert_eq!(
            pairs(&tools),
            vec![
                ("nodejs", "20.10.0"),
                ("python", "3.12.0"),
                ("ruby", "latest")
            ]
        );
        assert!(tools.iter().all(|t| t.provenance == Provenance::User));
    }

    #[test]
    fn test_parse_mise_toml_simple_format() {
        let data = br#"
[tools]
python = "3.12.0"
node = "20.0.0"
rust = { version = "1.80", profile = "minimal" }

[env]
MY_VAR = "hello"
"#;
        let tools = parse_mise_toml(data);
        assert_eq!(pairs(&tools), vec![("node", "20.0.0"), ("python", "3.12.0")]);
    }

    #[test]
    fn test_parse_mise_toml_malformed_is_empty() {
        assert!(parse_mise_toml(b"[tools\nnode = ").is_empty());
        assert!(parse_mise_toml(b"tools = \"node\"").is_empty());
        assert!(parse_mise_toml(b"[settings]\nexperimental = true").is_empty());
    }

    #[test]
    fn test_mise_tool_names() {
        let names = mise_tool_names(b"[tools]\nnode = \"18\"\n\"npm:cowsay\" = \"latest\"\n").unwrap();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["node", "npm:cowsay"]
        );

        assert!(mise_tool_names(b"").unwrap().is_empty());
    }

    #[test]
    fn test_mise_tool_names_malformed_is_error() {
        let result = mise_tool_names(b"[tools\n");
        assert!(matches!(result, Err(AgentError::ManifestParse(_))));
    }

    #[test]
    fn test_parse_env_overrides() {
        let tools = parse_env_overrides(" node@20, ,python,npm:@my-org/pkg@1.2.3,ruby@ ,,");
        assert_eq!(
            pairs(&tools),
            vec![
                ("node", "20"),
                ("python", "latest"),
                ("npm:@my-org/pkg", "1.2.3"),
                ("ruby", "latest"),
            ]
        );
        assert!(tools
            .iter()
            .all(|t| t.provenance == Provenance::EnvironmentOverride));
    }

    #[test]
    fn test_parse_env_overrides_empty() {
        assert!(parse_env_overrides("").is_empty());
        assert!(parse_env_overrides(" , ").is_empty());
    }
}
