use crate::error::Result;
use crate::project::{FileSpec, Project};
use crate::render::AGENT_MANIFEST;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Entrypoint script baked into every image
pub const ENTRYPOINT_SCRIPT: &[u8] = include_bytes!("../assets/agent-entrypoint.sh");

const ENTRYPOINT_PATH: &str = "assets/agent-entrypoint.sh";

/// Everything that goes into the build context besides project files
#[derive(Debug, Clone, Copy)]
pub struct ContextFiles<'a> {
    pub dockerfile: &'a str,
    pub agent_manifest: &'a str,
    pub tool_versions: Option<&'a FileSpec>,
    pub mise_toml: Option<&'a FileSpec>,
    /// Idiomatic version files, relative to the project root
    pub idiomatic: &'a [PathBuf],
}

/// A docker build context in a temporary directory, removed on drop
pub struct BuildContext {
    dir: TempDir,
}

impl BuildContext {
    pub fn assemble(project: &Project, files: &ContextFiles<'_>) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("agent-en-place-")
            .tempdir()?;
        let root = dir.path();

        write_file(root, Path::new("Dockerfile"), files.dockerfile.as_bytes(), 0o644)?;

        if let Some(file) = files.tool_versions {
            write_file(root, Path::new(".tool-versions"), &file.data, file.mode)?;
        }
        if let Some(file) = files.mise_toml {
            write_file(root, Path::new("mise.toml"), &file.data, 0o644)?;
        }
        write_file(
            root,
            Path::new(AGENT_MANIFEST),
            files.agent_manifest.as_bytes(),
            0o644,
        )?;

        for path in files.idiomatic {
            if let Some(file) = project.optional_file(path)? {
                write_file(root, &file.path, &file.data, file.mode)?;
            }
        }

        write_file(root, Path::new(ENTRYPOINT_PATH), ENTRYPOINT_SCRIPT, 0o755)?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn write_file(root: &Path, relative: &Path, data: &[u8], mode: u32) -> Result<()> {
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, data)?;
    // Keep files readable by the daemon whatever the source mode was
    fs::set_permissions(&target, fs::Permissions::from_mode(mode | 0o444))?;
    Ok(())
}
