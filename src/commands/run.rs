use crate::config::{home_dir, ImageConfig, ToolSpec, DEFAULT_CONFIG};
use crate::context::{BuildContext, ContextFiles};
use crate::docker::{self, Docker};
use crate::error::{AgentError, Result};
use crate::project::{FileSpec, Project};
use crate::render::{build_agent_mise_config, build_dockerfile, ManifestPresence};
use crate::tools::collect::{CollectOptions, VersionSources};
use crate::tools::idiomatic::detect_idiomatic;
use crate::tools::{build_image_name, collect_tool_specs, CollectResult};
use crate::utils::env::{host_mise_env, ToolOverrides};
use crate::utils::shell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub agent: String,
    pub config_path: Option<PathBuf>,
    pub debug: bool,
    pub rebuild: bool,
    pub dockerfile_only: bool,
    pub mise_file_only: bool,
}

/// Everything resolved for one agent in one project
#[derive(Debug, Clone)]
pub struct Resolution {
    pub agent: String,
    pub spec: ToolSpec,
    pub config: ImageConfig,
    pub tool_versions: Option<FileSpec>,
    pub mise_toml: Option<FileSpec>,
    pub collection: CollectResult,
    pub image: String,
}

impl Resolution {
    /// Read the project's version files and resolve the agent's tool set
    pub fn resolve(
        project: &Project,
        config: ImageConfig,
        agent: &str,
        overrides: &ToolOverrides,
        debug: bool,
    ) -> Result<Self> {
        let spec = config.agent(agent)?.to_tool_spec();

        let tool_versions = project.optional_file(".tool-versions")?;
        let mise_toml = project.optional_file("mise.toml")?;
        let idiomatic = detect_idiomatic(project);

        let sources = VersionSources {
            tool_versions: tool_versions.as_ref(),
            mise_toml: mise_toml.as_ref(),
            overrides: &overrides.tools,
            idiomatic: &idiomatic,
        };
        let options = CollectOptions {
            specified_tools_only: overrides.specified_only,
            debug,
        };
        let collection = collect_tool_specs(&sources, &spec, &config, agent, options);
        let image = build_image_name(&collection.tools);

        Ok(Self {
            agent: agent.to_string(),
            spec,
            config,
            tool_versions,
            mise_toml,
            collection,
            image,
        })
    }

    pub fn manifests(&self) -> ManifestPresence {
        ManifestPresence {
            tool_versions: self.tool_versions.is_some(),
            mise_toml: self.mise_toml.is_some(),
        }
    }

    pub fn dockerfile(&self, host_env: &BTreeMap<String, String>) -> String {
        build_dockerfile(
            self.manifests(),
            &self.collection,
            &self.spec,
            &self.config,
            &self.agent,
            host_env,
        )
    }

    pub fn agent_manifest(&self) -> Result<String> {
        build_agent_mise_config(
            self.mise_toml.as_ref().map(|file| file.data.as_slice()),
            &self.collection,
            &self.spec,
        )
    }

    /// The `docker run` command line for this agent
    pub fn run_command(&self, cwd: &Path, home: &Path) -> String {
        let args = docker::run_args(&self.spec, &self.image, cwd, home);
        format!("docker run --rm -it {}", shell::join_args(&args))
    }
}

pub fn execute(options: &RunOptions) -> Result<()> {
    let project = Project::detect()?;
    let config = ImageConfig::load_merged(DEFAULT_CONFIG, options.config_path.as_deref())?;
    let overrides = ToolOverrides::from_env();
    let host_env = host_mise_env();

    let resolution = Resolution::resolve(
        &project,
        config,
        &options.agent,
        &overrides,
        options.debug,
    )?;

    if options.dockerfile_only {
        print!("{}", resolution.dockerfile(&host_env));
        return Ok(());
    }
    if options.mise_file_only {
        print!("{}", resolution.agent_manifest()?);
        return Ok(());
    }

    if !Docker::is_installed() {
        return Err(AgentError::DockerNotInstalled);
    }

    let need_build = options.rebuild || !Docker::image_exists(&resolution.image)?;
    if need_build {
        build_image(&project, &resolution, &host_env, options.debug)?;
    } else if options.debug {
        eprintln!("debug: image {} already exists", resolution.image);
    }

    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    println!("{}", resolution.run_command(project.root(), &home));
    Ok(())
}

fn build_image(
    project: &Project,
    resolution: &Resolution,
    host_env: &BTreeMap<String, String>,
    debug: bool,
) -> Result<()> {
    let dockerfile = resolution.dockerfile(host_env);
    let agent_manifest = resolution.agent_manifest()?;

    let files = ContextFiles {
        dockerfile: &dockerfile,
        agent_manifest: &agent_manifest,
        tool_versions: resolution.tool_versions.as_ref(),
        mise_toml: resolution.mise_toml.as_ref(),
        idiomatic: &resolution.collection.files,
    };
    let context = BuildContext::assemble(project, &files)?;

    if debug {
        eprintln!("debug: build context at {}", context.path().display());
    }
    eprintln!("Building image {}...", resolution.image);

    Docker::build(context.path(), &resolution.image, debug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn default_config() -> ImageConfig {
        ImageConfig::load_layers(DEFAULT_CONFIG, &Default::default()).unwrap()
    }

    #[test]
    fn test_resolve_empty_project() {
        let dir = TempDir::new().unwrap();
        let project = Project::new(dir.path());

        let resolution = Resolution::resolve(
            &project,
            default_config(),
            "claude",
            &ToolOverrides::default(),
            false,
        )
        .unwrap();

        assert_eq!(
            resolution.image,
            "mheap/agent-en-place:node-latest-npm-anthropic-ai-claude-code-latest"
        );
        assert_eq!(resolution.manifests(), ManifestPresence::default());
    }

    #[test]
    fn test_resolve_unknown_agent() {
        let dir = TempDir::new().unwrap();
        let project = Project::new(dir.path());

        let err = Resolution::resolve(
            &project,
            default_config(),
            "vim",
            &ToolOverrides::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::UnknownAgent { .. }));
    }

    #[test]
    fn test_resolve_reads_project_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".tool-versions"), "ruby 3.3.0\n").unwrap();
        fs::write(dir.path().join("mise.toml"), "[tools]\nnode = \"22\"\n").unwrap();
        let project = Project::new(dir.path());

        let resolution = Resolution::resolve(
            &project,
            default_config(),
            "codex",
            &ToolOverrides::default(),
            false,
        )
        .unwrap();

        assert!(resolution.manifests().tool_versions);
        assert!(resolution.manifests().mise_toml);
        assert!(resolution.image.contains("ruby-3.3.0"));
        assert!(resolution.image.contains("node-22"));

        let manifest = resolution.agent_manifest().unwrap();
        assert!(!manifest.contains("node ="));
        assert!(manifest.contains("\"npm:@openai/codex\" = \"latest\""));
    }

    #[test]
    fn test_run_command() {
        let dir = TempDir::new().unwrap();
        let project = Project::new(dir.path());
        let resolution = Resolution::resolve(
            &project,
            default_config(),
            "gemini",
            &ToolOverrides::default(),
            false,
        )
        .unwrap();

        let command = resolution.run_command(Path::new("/src/my app"), Path::new("/home/me"));
        assert_eq!(
            command,
            format!(
                "docker run --rm -it -e GEMINI_API_KEY -v '/src/my app:/workdir' \
                 -v /home/me/.gemini:/home/agent/.gemini {} gemini",
                resolution.image
            )
        );
    }
}
