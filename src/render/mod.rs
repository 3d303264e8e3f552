//! Artifact renderers: the Dockerfile and the agent's mise manifest.
//!
//! Both are pure functions of the resolved tools and merged config, so the
//! same inputs always render byte-identical output.

pub mod dockerfile;
pub mod mise;

pub use dockerfile::{build_dockerfile, ManifestPresence};
pub use mise::{build_agent_mise_config, AGENT_MANIFEST};
