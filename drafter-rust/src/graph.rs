use crate::{ArtifactId, ConfigError, Key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed dependency lists, as they appear in a configuration file.
///
/// ```json
/// { "dependencies": { "background": ["title", "structured_brief"] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl GraphConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Read-only table of what each artifact is derived from. Always acyclic:
/// the constructors refuse anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<ArtifactId, Vec<Key>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl DependencyGraph {
    pub fn new<I, D>(edges: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (ArtifactId, D)>,
        D: IntoIterator<Item = Key>,
    {
        let mut table: BTreeMap<ArtifactId, Vec<Key>> = BTreeMap::new();
        for (id, deps) in edges {
            let entry = table.entry(id).or_default();
            for dep in deps {
                if !entry.contains(&dep) {
                    entry.push(dep);
                }
            }
        }

        let graph = Self { edges: table };
        graph.topological_order()?;
        Ok(graph)
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self, ConfigError> {
        Self::new(parse_config(config)?)
    }

    /// Replace the dependency lists named in `config`, keeping the rest.
    pub fn with_overrides(&self, config: &GraphConfig) -> Result<Self, ConfigError> {
        let mut edges = self.edges.clone();
        edges.extend(parse_config(config)?);
        Self::new(edges)
    }

    #[must_use]
    pub fn dependencies_of(&self, id: ArtifactId) -> &[Key] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Artifacts that list `key` as a direct dependency.
    #[must_use]
    pub fn dependents_of(&self, key: impl Into<Key>) -> Vec<ArtifactId> {
        let key = key.into();
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(&key))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every artifact, each one after all of its dependencies.
    pub fn topological_order(&self) -> Result<Vec<ArtifactId>, ConfigError> {
        let mut marks = BTreeMap::new();
        let mut order = Vec::with_capacity(ArtifactId::ALL.len());
        for id in ArtifactId::ALL {
            let mut path = Vec::new();
            self.visit(id, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: ArtifactId,
        marks: &mut BTreeMap<ArtifactId, Mark>,
        path: &mut Vec<ArtifactId>,
        order: &mut Vec<ArtifactId>,
    ) -> Result<(), ConfigError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|p| p.as_str().to_string()).collect();
                cycle.push(id.as_str().to_string());
                return Err(ConfigError::Cycle(cycle));
            }
            None => {}
        }

        marks.insert(id, Mark::Visiting);
        path.push(id);
        for dep in self.dependencies_of(id).iter().filter_map(|key| key.artifact()) {
            self.visit(dep, marks, path, order)?;
        }
        path.pop();
        marks.insert(id, Mark::Done);
        order.push(id);
        Ok(())
    }
}

fn parse_config(config: &GraphConfig) -> Result<Vec<(ArtifactId, Vec<Key>)>, ConfigError> {
    config
        .dependencies
        .iter()
        .map(|(name, deps)| {
            let id: ArtifactId = name.parse()?;
            let deps = deps
                .iter()
                .map(|dep| {
                    dep.parse::<Key>()
                        .map_err(|_| ConfigError::UnknownDependency {
                            artifact: name.clone(),
                            dependency: dep.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((id, deps))
        })
        .collect()
}
