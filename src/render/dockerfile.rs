use super::AGENT_MANIFEST;
use crate::config::{ImageConfig, ToolSpec};
use crate::tools::{sanitize_tag_component, CollectResult, ToolDescriptor, DEFAULT_VERSION};
use std::collections::{BTreeMap, HashSet};

const DEFAULT_BASE_IMAGE: &str = "debian:12-slim";
const AGENT_HOME: &str = "/home/agent";
const MISE_CONFIG_DIR: &str = "/home/agent/.config/mise";
const LABEL_PREFIX: &str = "com.mheap.agent-en-place";

/// Which user manifests exist in the project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestPresence {
    pub tool_versions: bool,
    pub mise_toml: bool,
}

/// Render the Dockerfile for an agent image.
///
/// `host_env` holds host `MISE_*` variables; they override `mise.env` from config.
pub fn build_dockerfile(
    manifests: ManifestPresence,
    collection: &CollectResult,
    spec: &ToolSpec,
    config: &ImageConfig,
    agent_name: &str,
    host_env: &BTreeMap<String, String>,
) -> String {
    let mut b = String::new();

    let base_image = if config.image.base.is_empty() {
        DEFAULT_BASE_IMAGE
    } else {
        config.image.base.as_str()
    };

    let mut packages = config.image.packages.clone();
    packages.extend(config.resolve_additional_packages(agent_name, &collection.user_tools));
    let packages = dedupe_strings(packages);

    b.push_str(&format!("FROM {}\n\n", base_image));
    b.push_str("RUN apt-get update && apt-get install -y --no-install-recommends ");
    b.push_str(&packages.join(" "));
    b.push('\n');

    if !config.mise.install.is_empty() {
        b.push_str(&format!("RUN {}\n", config.mise.install.join(" && ")));
    }

    b.push_str("RUN rm -rf /var/lib/apt/lists/*\n\n");
    b.push_str("RUN groupadd -r agent && useradd -m -r -u 1000 -g agent -s /bin/bash agent\n");
    b.push_str(&format!("ENV HOME={}\n", AGENT_HOME));
    b.push_str(
        "ENV PATH=\"/home/agent/.local/share/mise/shims:/home/agent/.local/bin:${PATH}\"\n\n",
    );

    b.push_str(&format!("RUN mkdir -p {}", MISE_CONFIG_DIR));
    let config_dir = spec.config_dir.trim_matches('/');
    if !config_dir.is_empty() {
        b.push_str(&format!(" {}/{}", AGENT_HOME, config_dir));
    }
    b.push('\n');

    b.push_str(&build_tool_labels(&collection.tools));
    b.push_str(&format!("WORKDIR {}\n", AGENT_HOME));

    if manifests.tool_versions {
        b.push_str("COPY .tool-versions .tool-versions\n");
    }
    if manifests.mise_toml {
        b.push_str(&format!("COPY mise.toml {}/config.toml\n", MISE_CONFIG_DIR));
    }
    b.push_str(&format!(
        "COPY {} {}/{}\n",
        AGENT_MANIFEST, MISE_CONFIG_DIR, AGENT_MANIFEST
    ));

    b.push_str("RUN chown -R agent:agent");
    if manifests.tool_versions {
        b.push_str(" .tool-versions");
    }
    b.push_str(&format!(" {}/.config", AGENT_HOME));
    if !config_dir.is_empty() {
        b.push_str(&format!(" {}/{}", AGENT_HOME, config_dir));
    }
    b.push('\n');

    b.push_str("COPY assets/agent-entrypoint.sh /usr/local/bin/agent-entrypoint\n");
    b.push_str("RUN chmod +x /usr/local/bin/agent-entrypoint\n");
    b.push_str("USER agent\n");

    // Environment must be in place before mise installs anything
    for (key, value) in merged_mise_env(config, host_env) {
        b.push_str(&format!("ENV {}={}\n", key, quote(&value)));
    }

    b.push_str("RUN mise trust\n");
    if manifests.mise_toml {
        b.push_str("RUN mise install && mise install --env agent\n");
    } else {
        b.push_str("RUN mise install --env agent\n");
    }

    b.push_str("RUN printf 'export PATH=\"/home/agent/.local/share/mise/shims:/home/agent/.local/bin:$PATH\"\\n' > /home/agent/.bashrc\n");
    b.push_str("RUN printf 'source ~/.bashrc\\n' > /home/agent/.bash_profile\n");
    b.push_str("WORKDIR /workdir\n");
    b.push_str("ENTRYPOINT [\"/bin/bash\", \"/usr/local/bin/agent-entrypoint\"]\n");
    b
}

/// One `LABEL` per resolved tool, keyed by its friendly name
fn build_tool_labels(tools: &[ToolDescriptor]) -> String {
    let mut b = String::new();
    for tool in tools {
        let name = if tool.label.is_empty() {
            sanitize_tag_component(&tool.name)
        } else {
            tool.label.clone()
        };
        if name.is_empty() {
            continue;
        }

        let mut version = sanitize_tag_component(&tool.version);
        if version.is_empty() {
            version = DEFAULT_VERSION.to_string();
        }
        b.push_str(&format!("LABEL {}.{}=\"{}\"\n", LABEL_PREFIX, name, version));
    }
    b
}

/// `mise.env` from config overlaid with host variables, sorted by key
fn merged_mise_env(
    config: &ImageConfig,
    host_env: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = config
        .mise
        .env
        .iter()
        .map(|(key, value)| (key.clone(), env_value(value)))
        .collect();
    env.extend(host_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Double-quoted `ENV` value with backslash escapes
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn env_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn dedupe_strings(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
