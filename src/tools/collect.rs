use super::idiomatic::IdiomaticInfo;
use super::sources::{parse_mise_toml, parse_tool_versions};
use super::{sanitize_tag_component, Provenance, ToolDescriptor, DEFAULT_VERSION};
use crate::config::{ImageConfig, ToolSpec};
use crate::project::FileSpec;
use crate::utils::env::{TOOLS_ONLY_VAR, TOOLS_VAR};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

/// Image repository; the tag is derived from the resolved tools
pub const IMAGE_REPOSITORY: &str = "mheap/agent-en-place";

/// Raw inputs for tool collection, read by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSources<'a> {
    pub tool_versions: Option<&'a FileSpec>,
    pub mise_toml: Option<&'a FileSpec>,
    /// Parsed `AGENT_EN_PLACE_TOOLS`
    pub overrides: &'a [ToolDescriptor],
    pub idiomatic: &'a [IdiomaticInfo],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Install only the environment overrides plus the agent's requirements
    pub specified_tools_only: bool,
    pub debug: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectResult {
    /// Resolved tools, one per normalized name, in precedence order
    pub tools: Vec<ToolDescriptor>,
    /// Idiomatic version files to copy into the build context
    pub files: Vec<PathBuf>,
    /// Entries for the generated mise manifest
    pub infos: Vec<IdiomaticInfo>,
    /// Normalized names of tools the user specified explicitly
    pub user_tools: BTreeSet<String>,
}

/// Merge every version source into one deduplicated tool list.
///
/// Precedence (first occurrence wins): environment overrides, `.tool-versions`,
/// `mise.toml`, idiomatic files, then the agent's config dependencies.
pub fn collect_tool_specs(
    sources: &VersionSources<'_>,
    spec: &ToolSpec,
    config: &ImageConfig,
    agent_name: &str,
    options: CollectOptions,
) -> CollectResult {
    let tools_only = options.specified_tools_only && !sources.overrides.is_empty();
    if options.specified_tools_only && !tools_only {
        eprintln!(
            "Warning: {} is set but {} is empty; discovering tools from project files",
            TOOLS_ONLY_VAR, TOOLS_VAR
        );
    }

    let mut specs: Vec<ToolDescriptor> = sources.overrides.to_vec();
    let mut idiomatic: &[IdiomaticInfo] = &[];

    if tools_only {
        if options.debug {
            eprintln!("debug: {} set, skipping project version files", TOOLS_ONLY_VAR);
        }
    } else {
        if let Some(file) = sources.tool_versions {
            specs.extend(parse_tool_versions(&file.data));
        }
        if let Some(file) = sources.mise_toml {
            specs.extend(parse_mise_toml(&file.data));
        }
        idiomatic = sources.idiomatic;
    }

    // Only explicit sources unlock transitive dependencies
    let user_tools: BTreeSet<String> = specs
        .iter()
        .map(ToolDescriptor::key)
        .filter(|key| !key.is_empty())
        .collect();

    specs.extend(
        idiomatic
            .iter()
            .filter(|info| !info.version.is_empty())
            .map(|info| {
                ToolDescriptor::new(info.tool.as_str(), info.version.as_str(), Provenance::Idiomatic)
            }),
    );

    let config_tools = config.resolve_tool_deps(agent_name, &user_tools, options.debug);
    specs.extend(config_tools.iter().cloned());

    let mut tools = dedupe_tools(specs);
    ensure_default_tool(&mut tools, spec);

    let mut infos: Vec<IdiomaticInfo> = sources
        .overrides
        .iter()
        .map(|tool| IdiomaticInfo::synthesized(tool.name.as_str(), tool.version.as_str()))
        .collect();
    infos.extend(idiomatic.iter().cloned());
    infos.extend(
        config_tools
            .iter()
            .map(|tool| IdiomaticInfo::synthesized(tool.name.as_str(), tool.version.as_str())),
    );
    align_versions(&mut infos, &tools);
    ensure_tool_info(&mut infos, spec);

    CollectResult {
        tools,
        files: unique_paths(idiomatic),
        infos,
        user_tools,
    }
}

/// Keep the first tool per normalized name, dropping names that normalize to nothing
fn dedupe_tools(specs: Vec<ToolDescriptor>) -> Vec<ToolDescriptor> {
    let mut seen = HashSet::new();
    specs
        .into_iter()
        .filter(|tool| {
            let key = tool.key();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Append the agent's own package unless something already provides it
fn ensure_default_tool(tools: &mut Vec<ToolDescriptor>, spec: &ToolSpec) {
    let key = sanitize_tag_component(&spec.mise_tool_name);
    if !tools.iter().any(|tool| tool.key() == key) {
        tools.push(ToolDescriptor::new(
            spec.mise_tool_name.as_str(),
            DEFAULT_VERSION,
            Provenance::Config,
        ));
    }
}

fn ensure_tool_info(infos: &mut Vec<IdiomaticInfo>, spec: &ToolSpec) {
    if !infos.iter().any(|info| info.config_key == spec.config_key) {
        infos.push(IdiomaticInfo {
            tool: spec.mise_tool_name.clone(),
            version: DEFAULT_VERSION.to_string(),
            path: None,
            config_key: spec.config_key.clone(),
        });
    }
}

/// Make every manifest entry agree with the winning version for its tool
fn align_versions(infos: &mut [IdiomaticInfo], tools: &[ToolDescriptor]) {
    let resolved: HashMap<String, &str> = tools
        .iter()
        .map(|tool| (tool.key(), tool.version.as_str()))
        .collect();

    for info in infos.iter_mut() {
        if let Some(version) = resolved.get(&sanitize_tag_component(&info.tool)) {
            info.version = version.to_string();
        }
    }
}

fn unique_paths(infos: &[IdiomaticInfo]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    infos
        .iter()
        .filter_map(|info| info.path.clone())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Image reference for a resolved tool set, e.g.
/// `mheap/agent-en-place:node-22-npm-openai-codex-latest`
pub fn build_image_name(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return format!("{}:{}", IMAGE_REPOSITORY, DEFAULT_VERSION);
    }

    let parts: Vec<String> = tools
        .iter()
        .map(|tool| {
            let mut name = sanitize_tag_component(&tool.name);
            if name.is_empty() {
                name = "tool".to_string();
            }
            let mut version = sanitize_tag_component(&tool.version);
            if version.is_empty() {
                version = DEFAULT_VERSION.to_string();
            }
            format!("{}-{}", name, version)
        })
        .collect();

    format!("{}:{}", IMAGE_REPOSITORY, parts.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use crate::tools::sources::parse_env_overrides;

    fn default_config() -> ImageConfig {
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }

    fn file(name: &str, data: &str) -> FileSpec {
        FileSpec {
            path: PathBuf::from(name),
            data: data.as_bytes().to_vec(),
            mode: 0o644,
        }
    }

    fn resolved(result: &CollectResult) -> Vec<(String, String)> {
        result
            .tools
            .iter()
            .map(|t| (t.key(), t.version.clone()))
            .collect()
    }

    fn pair(name: &str, version: &str) -> (String, String) {
        (name.to_string(), version.to_string())
    }

    fn collect(sources: &VersionSources<'_>, options: CollectOptions) -> CollectResult {
        let config = default_config();
        let spec = config.agents["claude"].to_tool_spec();
        collect_tool_specs(sources, &spec, &config, "claude", options)
    }

    #[test]
    fn test_no_sources_resolves_agent_requirements() {
        let result = collect(&VersionSources::default(), CollectOptions::default());
        assert_eq!(
            resolved(&result),
            vec![
                pair("node", "latest"),
                pair("npm-anthropic-ai-claude-code", "latest")
            ]
        );
        assert!(result.user_tools.is_empty());
        assert!(result.files.is_empty());
        assert_eq!(
            build_image_name(&result.tools),
            "mheap/agent-en-place:node-latest-npm-anthropic-ai-claude-code-latest"
        );
    }

    #[test]
    fn test_env_override_beats_mise_toml() {
        let overrides = parse_env_overrides("node@20");
        let mise = file("mise.toml", "[tools]\nnode = \"18\"\n");
        let sources = VersionSources {
            mise_toml: Some(&mise),
            overrides: &overrides,
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert_eq!(result.tools[0].version, "20");
        assert_eq!(
            result.tools[0].provenance,
            Provenance::EnvironmentOverride
        );
    }

    #[test]
    fn test_tool_versions_beats_mise_toml() {
        let tool_versions = file(".tool-versions", "node 20.10.0\n");
        let mise = file("mise.toml", "[tools]\nnode = \"18\"\npython = \"3.12\"\n");
        let sources = VersionSources {
            tool_versions: Some(&tool_versions),
            mise_toml: Some(&mise),
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert_eq!(
            resolved(&result),
            vec![
                pair("node", "20.10.0"),
                pair("python", "3.12"),
                pair("npm-anthropic-ai-claude-code", "latest")
            ]
        );
    }

    #[test]
    fn test_user_specified_node_pulls_in_python() {
        let tool_versions = file(".tool-versions", "node 22\n");
        let sources = VersionSources {
            tool_versions: Some(&tool_versions),
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert!(result.user_tools.contains("node"));
        assert_eq!(
            resolved(&result),
            vec![
                pair("node", "22"),
                pair("python", "latest"),
                pair("npm-anthropic-ai-claude-code", "latest")
            ]
        );
    }

    #[test]
    fn test_mise_toml_node_pulls_in_python() {
        let mise = file("mise.toml", "[tools]\nnode = \"22\"\n");
        let sources = VersionSources {
            mise_toml: Some(&mise),
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert!(result.user_tools.contains("node"));
        assert_eq!(
            build_image_name(&result.tools),
            "mheap/agent-en-place:node-22-python-latest-npm-anthropic-ai-claude-code-latest"
        );
    }

    #[test]
    fn test_override_node_pulls_in_python() {
        let overrides = parse_env_overrides("node@20");
        let sources = VersionSources {
            overrides: &overrides,
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert!(result.user_tools.contains("node"));
        assert_eq!(
            resolved(&result),
            vec![
                pair("node", "20"),
                pair("python", "latest"),
                pair("npm-anthropic-ai-claude-code", "latest")
            ]
        );
        assert!(result
            .infos
            .iter()
            .any(|i| i.config_key == "python" && i.version == "latest"));
    }

    #[test]
    fn test_idiomatic_files_do_not_unlock_dependencies() {
        let idiomatic = vec![IdiomaticInfo {
            tool: "node".to_string(),
            version: "18.19.0".to_string(),
            path: Some(PathBuf::from(".nvmrc")),
            config_key: "node".to_string(),
        }];
        let sources = VersionSources {
            idiomatic: &idiomatic,
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert_eq!(
            resolved(&result),
            vec![
                pair("node", "18.19.0"),
                pair("npm-anthropic-ai-claude-code", "latest")
            ]
        );
        assert_eq!(result.files, vec![PathBuf::from(".nvmrc")]);
        assert_eq!(result.tools[0].provenance, Provenance::Idiomatic);
        // The config dependency entry follows the idiomatic version
        assert!(result
            .infos
            .iter()
            .filter(|i| i.config_key == "node")
            .all(|i| i.version == "18.19.0"));
    }

    #[test]
    fn test_dedupe_uses_normalized_names() {
        let overrides = parse_env_overrides("Node@21,node@22,npm:@anthropic-ai/claude-code@1.0.0");
        let sources = VersionSources {
            overrides: &overrides,
            ..Default::default()
        };

        let result = collect(&sources, CollectOptions::default());
        assert_eq!(
            resolved(&result),
            vec![
                pair("node", "21"),
                pair("npm-anthropic-ai-claude-code", "1.0.0"),
                pair("python", "latest")
            ]
        );
    }

    #[test]
    fn test_specified_tools_only_skips_project_files() {
        let overrides = parse_env_overrides("ruby@3.3");
        let tool_versions = file(".tool-versions", "python 3.11\n");
        let idiomatic = vec![IdiomaticInfo::synthesized("go", "1.22")];
        let sources = VersionSources {
            tool_versions: Some(&tool_versions),
            overrides: &overrides,
            idiomatic: &idiomatic,
            ..Default::default()
        };
        let options = CollectOptions {
            specified_tools_only: true,
            debug: false,
        };

        let result = collect(&sources, options);
        assert_eq!(
            resolved(&result),
            vec![
                pair("ruby", "3.3"),
                pair("node", "latest"),
                pair("npm-anthropic-ai-claude-code", "latest")
            ]
        );
        assert!(result.files.is_empty());
    }

    #[test]
    fn test_specified_tools_only_without_overrides_is_noop() {
        let tool_versions = file(".tool-versions", "python 3.11\n");
        let sources = VersionSources {
            tool_versions: Some(&tool_versions),
            ..Default::default()
        };
        let options = CollectOptions {
            specified_tools_only: true,
            debug: false,
        };

        let result = collect(&sources, options);
        assert_eq!(result.tools[0].name, "python");
    }

    #[test]
    fn test_agent_info_added_once() {
        let result = collect(&VersionSources::default(), CollectOptions::default());
        let agent_entries: Vec<_> = result
            .infos
            .iter()
            .filter(|i| i.config_key == "npm:@anthropic-ai/claude-code")
            .collect();
        assert_eq!(agent_entries.len(), 1);
        assert_eq!(agent_entries[0].version, "latest");
    }

    #[test]
    fn test_collection_is_deterministic() {
        let overrides = parse_env_overrides("python@3.12,npm:cowsay");
        let mise = file("mise.toml", "[tools]\nzig = \"0.13\"\ngo = \"1.22\"\nbun = \"1\"\n");
        let sources = VersionSources {
            mise_toml: Some(&mise),
            overrides: &overrides,
            ..Default::default()
        };

        let first = collect(&sources, CollectOptions::default());
        for _ in 0..5 {
            assert_eq!(collect(&sources, CollectOptions::default()), first);
        }
    }

    #[test]
    fn test_build_image_name() {
        assert_eq!(build_image_name(&[]), "mheap/agent-en-place:latest");

        let tools = vec![
            ToolDescriptor::new("node", "20.10.0", Provenance::User),
            ToolDescriptor::new("npm:@openai/codex", "", Provenance::Config),
            ToolDescriptor::new("python", "~=3.12", Provenance::User),
        ];
        assert_eq!(
            build_image_name(&tools),
            "mheap/agent-en-place:node-20.10.0-npm-openai-codex-latest-python-3.12"
        );
    }
}
