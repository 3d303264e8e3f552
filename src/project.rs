use crate::error::Result;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// A project file read into memory, ready to be copied into a build context
#[derive(Debug, Clone, PartialEq)]
pub struct FileSpec {
    /// Path relative to the project root
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub mode: u32,
}

/// Read-only view of the project directory the agent runs in
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The current working directory
    pub fn detect() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file relative to the project root, `None` if it does not exist
    pub fn optional_file(&self, name: impl AsRef<Path>) -> Result<Option<FileSpec>> {
        let name = name.as_ref();
        let full_path = self.root.join(name);

        let metadata = match std::fs::metadata(&full_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let data = std::fs::read(&full_path)?;
        Ok(Some(FileSpec {
            path: name.to_path_buf(),
            data,
            mode: metadata.permissions().mode() & 0o777,
        }))
    }

    /// Read a file as text for version detection; any failure reads as absent
    pub fn read_text(&self, name: &str) -> Option<String> {
        std::fs::read(self.root.join(name))
            .ok()
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }
}
