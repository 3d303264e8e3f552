use crate::commands::run::RunOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agent-en-place")]
#[command(about = "Run AI coding agents in a container with your project's tool versions", long_about = None)]
#[command(version = env!("AGENT_EN_PLACE_VERSION"))]
#[command(
    after_help = "Built-in agents: claude, codex, copilot, gemini, opencode\n\nUsage: eval \"$(agent-en-place claude)\""
)]
pub struct Cli {
    /// Agent to run
    #[arg(value_parser = parse_agent)]
    pub agent: String,

    /// Show docker build output instead of hiding it
    #[arg(long)]
    pub debug: bool,

    /// Force rebuilding the docker image
    #[arg(long)]
    pub rebuild: bool,

    /// Print the generated Dockerfile and exit
    #[arg(long, conflicts_with = "mise_file")]
    pub dockerfile: bool,

    /// Print the generated mise.agent.toml and exit
    #[arg(long = "mise-file")]
    pub mise_file: bool,

    /// Path to a config file, merged over the default locations
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            agent: self.agent.clone(),
            config_path: self.config.clone(),
            debug: self.debug,
            rebuild: self.rebuild,
            dockerfile_only: self.dockerfile,
            mise_file_only: self.mise_file,
        }
    }
}

fn parse_agent(value: &str) -> Result<String, String> {
    let agent = value.trim().to_lowercase();
    if agent.is_empty() {
        return Err("agent name cannot be empty".to_string());
    }
    Ok(agent)
}
