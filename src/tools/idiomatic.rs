//! Idiomatic version files (`.nvmrc`, `.python-version`, `Gemfile`, ...).
//!
//! Each language has an ordered list of candidate files. The first candidate
//! that exists and yields a version wins; later candidates are fallbacks.

use crate::project::Project;
use std::path::PathBuf;

/// Candidate files per language, most specific first. Sorted by language so
/// detection order is stable.
const IDIOMATIC_FILES: &[(&str, &[&str])] = &[
    ("bun", &[".bun-version"]),
    ("crystal", &[".crystal-version"]),
    ("elixir", &[".exenv-version"]),
    ("go", &[".go-version", "go.mod"]),
    ("java", &[".java-version", ".sdkmanrc"]),
    ("node", &[".nvmrc", ".node-version"]),
    ("python", &[".python-version", ".python-versions"]),
    ("ruby", &[".ruby-version", "Gemfile"]),
    ("yarn", &[".yvmrc"]),
];

/// A version pinned by an idiomatic file or synthesized from config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdiomaticInfo {
    pub tool: String,
    pub version: String,
    /// File the version was read from; `None` when synthesized
    pub path: Option<PathBuf>,
    /// Key written to the generated mise manifest
    pub config_key: String,
}

impl IdiomaticInfo {
    /// An entry that does not come from a project file
    pub fn synthesized(tool: impl Into<String>, version: impl Into<String>) -> Self {
        let tool = tool.into();
        Self {
            config_key: tool.clone(),
            tool,
            version: version.into(),
            path: None,
        }
    }
}

/// Detect idiomatic versions in the project, one entry per language at most
pub fn detect_idiomatic(project: &Project) -> Vec<IdiomaticInfo> {
    IDIOMATIC_FILES
        .iter()
        .filter_map(|(tool, candidates)| {
            candidates.iter().find_map(|file| {
                let contents = project.read_text(file)?;
                let version = extract_version(file, &contents)?;
                Some(IdiomaticInfo {
                    tool: tool.to_string(),
                    version,
                    path: Some(PathBuf::from(file)),
                    config_key: tool.to_string(),
                })
            })
        })
        .collect()
}

/// Extract a version from the contents of a candidate file
pub fn extract_version(file: &str, contents: &str) -> Option<String> {
    let version = match file {
        "Gemfile" => gemfile_version(contents),
        ".sdkmanrc" => sdkman_version(contents),
        "go.mod" => go_mod_version(contents),
        _ => first_line(contents),
    }?;

    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

fn first_line(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// `ruby "3.2.2"` directive in a Gemfile
fn gemfile_version(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split_whitespace();
            if fields.next()? != "ruby" {
                return None;
            }
            let version = fields
                .next()?
                .trim_end_matches(',')
                .trim_matches(|c| c == '"' || c == '\'');
            Some(version.to_string())
        })
}

/// `java=21.0.2-tem` in `.sdkmanrc`
fn sdkman_version(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("java="))
        .map(|version| version.trim().to_string())
}

/// `go 1.21.0` directive in `go.mod`
fn go_mod_version(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != "go" {
            return None;
        }
        fields.next().map(str::to_string)
    })
}
