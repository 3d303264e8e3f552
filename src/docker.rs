use crate::config::ToolSpec;
use crate::error::{AgentError, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Lines of build output kept as context when a build fails
const BUILD_ERROR_CONTEXT_LINES: usize = 3;

const CONTAINER_HOME: &str = "/home/agent";
const CONTAINER_WORKDIR: &str = "/workdir";

pub struct Docker;

impl Docker {
    /// Check if the docker CLI is installed
    pub fn is_installed() -> bool {
        which::which("docker").is_ok()
    }

    /// Check if an image with this reference exists locally
    pub fn image_exists(image: &str) -> Result<bool> {
        let status = Command::new("docker")
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AgentError::Docker(format!("Failed to inspect image: {}", e)))?;

        Ok(status.success())
    }

    /// Build `context_dir` into `image`.
    ///
    /// In debug mode the build output streams to the terminal. Otherwise it is
    /// captured and only its tail is reported on failure.
    pub fn build(context_dir: &Path, image: &str, debug: bool) -> Result<()> {
        let mut cmd = Command::new("docker");
        cmd.arg("build")
            .arg("--tag")
            .arg(image)
            .arg("--pull")
            .arg("--rm")
            .arg("--force-rm")
            .arg(context_dir);

        if debug {
            let status = cmd
                .stdin(Stdio::null())
                .status()
                .map_err(|e| AgentError::Docker(format!("Failed to build image: {}", e)))?;

            if !status.success() {
                return Err(AgentError::ImageBuild {
                    image: image.to_string(),
                    context: format!("docker build exited with {}", status),
                });
            }
            return Ok(());
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| AgentError::Docker(format!("Failed to build image: {}", e)))?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push('\n');
            text.push_str(&String::from_utf8_lossy(&output.stderr));

            return Err(AgentError::ImageBuild {
                image: image.to_string(),
                context: tail_lines(&text, BUILD_ERROR_CONTEXT_LINES).join("\n"),
            });
        }

        Ok(())
    }
}

/// The last `max` non-blank lines of `text`, trimmed, oldest first
pub fn tail_lines(text: &str, max: usize) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let start = lines.len().saturating_sub(max);
    lines[start..].iter().map(|line| line.to_string()).collect()
}

/// Arguments following `docker run --rm -it` for an agent container.
///
/// The project is mounted at `/workdir`; the agent's config dir and extra
/// mounts are mapped from `home` into the container user's home.
pub fn run_args(spec: &ToolSpec, image: &str, cwd: &Path, home: &Path) -> Vec<String> {
    let mut args = Vec::new();

    for var in &spec.env_vars {
        args.push("-e".to_string());
        args.push(var.clone());
    }

    args.push("-v".to_string());
    args.push(format!("{}:{}", cwd.display(), CONTAINER_WORKDIR));

    let mounts = std::iter::once(&spec.config_dir)
        .chain(&spec.additional_mounts)
        .map(|dir| dir.trim_matches('/'))
        .filter(|dir| !dir.is_empty());
    for dir in mounts {
        args.push("-v".to_string());
        args.push(format!(
            "{}:{}",
            home.join(dir).display(),
            Path::new(CONTAINER_HOME).join(dir).display()
        ));
    }

    args.push(image.to_string());
    if !spec.command.is_empty() {
        args.push(spec.command.clone());
    }
    args
}
