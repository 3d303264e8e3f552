//! Breadth-first walk over config-declared tool dependencies.
//!
//! The walk starts from the agent's `depends` list. A tool's own `depends`
//! edge is only followed when the user asked for that tool themselves, so an
//! agent requirement never drags in its dependency tree unasked.

use super::{sanitize_tag_component, Provenance, ToolDescriptor};
use crate::config::{ImageConfig, ToolConfigEntry};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// One tool reached by the walk
struct Visit<'a> {
    name: &'a str,
    entry: Option<&'a ToolConfigEntry>,
    /// Dependency not followed because `name` was not user-specified
    skipped: Option<&'a str>,
}

impl ImageConfig {
    /// Tools required by an agent, dependencies after their dependents.
    ///
    /// `user_tools` holds normalized names of tools the user specified; only
    /// those have their own dependencies resolved.
    pub fn resolve_tool_deps(
        &self,
        agent_name: &str,
        user_tools: &BTreeSet<String>,
        debug: bool,
    ) -> Vec<ToolDescriptor> {
        self.walk_deps(agent_name, user_tools)
            .into_iter()
            .map(|visit| {
                if let (Some(dep), true) = (visit.skipped, debug) {
                    eprintln!(
                        "debug: skipping transitive dependency '{}' of '{}' (not user-specified)",
                        dep, visit.name
                    );
                }
                let version = visit.entry.map(|e| e.version.as_str()).unwrap_or_default();
                ToolDescriptor::new(visit.name, version, Provenance::Config)
            })
            .collect()
    }

    /// Apt packages needed by an agent's tools, in walk order, not deduplicated
    pub fn resolve_additional_packages(
        &self,
        agent_name: &str,
        user_tools: &BTreeSet<String>,
    ) -> Vec<String> {
        self.walk_deps(agent_name, user_tools)
            .into_iter()
            .filter_map(|visit| visit.entry)
            .flat_map(|entry| entry.additional_packages.iter().cloned())
            .collect()
    }

    fn walk_deps(&self, agent_name: &str, user_tools: &BTreeSet<String>) -> Vec<Visit<'_>> {
        let Some(agent) = self.agents.get(agent_name) else {
            return Vec::new();
        };

        let mut visits = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = agent.depends.iter().map(String::as_str).collect();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }

            let entry = self.tools.get(name);
            let mut skipped = None;

            if let Some(dep) = entry.and_then(|e| e.depends.as_deref()) {
                if user_tools.contains(&sanitize_tag_component(name)) {
                    queue.push_back(dep);
                } else {
                    skipped = Some(dep);
                }
            }

            visits.push(Visit {
                name,
                entry,
                skipped,
            });
        }

        visits
    }
}
