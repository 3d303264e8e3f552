use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to parse default config: {0}")]
    DefaultConfig(toml::de::Error),

    #[error("Failed to parse {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Unknown agent: {name} (available: {})", .available.join(", "))]
    UnknownAgent { name: String, available: Vec<String> },

    #[error("Failed to parse mise.toml: {0}")]
    ManifestParse(toml::de::Error),

    #[error("Failed to render mise.agent.toml: {0}")]
    ManifestRender(toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Docker not installed. Install from https://docs.docker.com/get-docker/")]
    DockerNotInstalled,

    #[error("Docker command failed: {0}")]
    Docker(String),

    #[error("Error building docker image {image}:\n{context}")]
    ImageBuild { image: String, context: String },
}

pub type Result<T> = std::result::Result<T, AgentError>;
