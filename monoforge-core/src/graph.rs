//! Package dependency graph built with petgraph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use semver::Version;

use crate::error::{Error, Result};
use crate::package::Package;

/// Directed acyclic graph of local-dependency edges for one scan.
///
/// An edge A -> B means package A depends on package B. Edges exist only
/// between packages discovered in the same scan; a declared dependency whose
/// name no discovered package carries is external and gets no edge. The
/// graph is rebuilt fresh on every command invocation.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    graph: DiGraph<String, bool>,
    node_map: HashMap<String, NodeIndex>,
    packages: HashMap<String, Package>,
    topological: Vec<String>,
    levels: Vec<Vec<String>>,
}

impl PackageGraph {
    /// Builds the graph from discovered packages.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatePackage` if two packages declare the same name and
    /// `CircularDependency` (naming the cycle members) if the local edges
    /// form a cycle. Both are fatal before any orchestration starts.
    pub fn new(packages: Vec<Package>) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut package_map: HashMap<String, Package> = HashMap::new();

        for package in packages {
            if let Some(existing) = package_map.get(&package.name) {
                return Err(Error::DuplicatePackage {
                    name: package.name.clone(),
                    first: existing.path.clone(),
                    second: package.path.clone(),
                });
            }
            let node = graph.add_node(package.name.clone());
            node_map.insert(package.name.clone(), node);
            package_map.insert(package.name.clone(), package);
        }

        for package in package_map.values() {
            let from = node_map[&package.name];
            for dep in &package.dependencies {
                // Only packages found in this scan become edges.
                if let Some(&to) = node_map.get(&dep.name) {
                    graph.add_edge(from, to, dep.dev);
                }
            }
        }

        if toposort(&graph, None).is_err() {
            let mut members: Vec<String> = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
                .map(|scc| scc.into_iter().map(|idx| graph[idx].clone()).collect())
                .unwrap_or_default();
            members.sort();
            return Err(Error::CircularDependency {
                members: members.join(", "),
            });
        }

        let topological = Self::deterministic_order(&graph, &node_map);
        let levels = Self::compute_levels(&graph, &node_map, &topological);

        Ok(Self {
            graph,
            node_map,
            packages: package_map,
            topological,
            levels,
        })
    }

    /// Kahn's algorithm with a name-ordered ready set, so ties among
    /// independent packages break by name and the order is identical across
    /// repeated calls. Dependencies always precede their dependents.
    fn deterministic_order(
        graph: &DiGraph<String, bool>,
        node_map: &HashMap<String, NodeIndex>,
    ) -> Vec<String> {
        let mut remaining: HashMap<&str, usize> = HashMap::with_capacity(node_map.len());
        let mut ready: BTreeSet<&str> = BTreeSet::new();

        for (name, &idx) in node_map {
            let deps = graph.neighbors_directed(idx, Direction::Outgoing).count();
            if deps == 0 {
                ready.insert(name.as_str());
            } else {
                remaining.insert(name.as_str(), deps);
            }
        }

        let mut order = Vec::with_capacity(node_map.len());
        while let Some(&name) = ready.iter().next() {
            ready.remove(name);
            order.push(name.to_string());
            let idx = node_map[name];
            for dependent in graph.neighbors_directed(idx, Direction::Incoming) {
                let dep_name = graph[dependent].as_str();
                if let Some(count) = remaining.get_mut(dep_name) {
                    *count -= 1;
                    if *count == 0 {
                        remaining.remove(dep_name);
                        ready.insert(dep_name);
                    }
                }
            }
        }
        order
    }

    fn compute_levels(
        graph: &DiGraph<String, bool>,
        node_map: &HashMap<String, NodeIndex>,
        order: &[String],
    ) -> Vec<Vec<String>> {
        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut level_of: HashMap<&str, usize> = HashMap::new();

        for name in order {
            let idx = node_map[name];
            let level = graph
                .neighbors_directed(idx, Direction::Outgoing)
                .filter_map(|dep| level_of.get(graph[dep].as_str()))
                .max()
                .map(|l| l + 1)
                .unwrap_or(0);
            level_of.insert(name.as_str(), level);
            while levels.len() <= level {
                levels.push(Vec::new());
            }
            levels[level].push(name.clone());
        }
        levels
    }

    fn node(&self, name: &str) -> Result<NodeIndex> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| Error::PackageNotFound {
                name: name.to_string(),
                available: self.available(),
            })
    }

    fn available(&self) -> String {
        let mut names: Vec<&str> = self.packages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All packages, in topological order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.topological.iter().map(move |name| &self.packages[name])
    }

    /// Full topological order: every dependency strictly before each of its
    /// dependents, ties broken by name.
    #[inline]
    pub fn topological_order(&self) -> &[String] {
        &self.topological
    }

    /// Topological order restricted to `subset`.
    pub fn topological_order_of(&self, subset: &HashSet<String>) -> Vec<String> {
        self.topological
            .iter()
            .filter(|name| subset.contains(*name))
            .cloned()
            .collect()
    }

    /// Dependency levels for parallel execution: packages within one level
    /// have no edges among each other, and every package's dependencies sit
    /// in strictly earlier levels.
    #[inline]
    pub fn dependency_levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Direct local dependencies of a package.
    pub fn dependencies_of(&self, name: &str, include_dev: bool) -> Result<Vec<String>> {
        let idx = self.node(name)?;
        let mut deps: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|edge| include_dev || !*edge.weight())
            .map(|edge| self.graph[edge.target()].clone())
            .collect();
        deps.sort();
        deps.dedup();
        Ok(deps)
    }

    /// Direct local dependents of a package.
    pub fn dependents_of(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.node(name)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|i| self.graph[i].clone())
            .collect();
        deps.sort();
        deps.dedup();
        Ok(deps)
    }

    /// Transitive dependents of a package, excluding the package itself.
    pub fn all_dependents(&self, name: &str) -> Result<HashSet<String>> {
        let mut result = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !result.insert(current.clone()) {
                continue;
            }
            for dependent in self.dependents_of(&current)? {
                if !result.contains(&dependent) {
                    stack.push(dependent);
                }
            }
        }
        result.remove(name);
        Ok(result)
    }

    /// Transitive local-dependency closure of `names`, including the named
    /// packages themselves. Dev edges are followed only from the named
    /// packages; beyond the first hop only runtime dependencies matter.
    pub fn dependency_closure(
        &self,
        names: &[String],
        include_dev: bool,
    ) -> Result<HashSet<String>> {
        let mut closure: HashSet<String> = HashSet::new();
        let mut stack: Vec<(String, bool)> = Vec::new();
        for name in names {
            self.node(name)?;
            stack.push((name.clone(), include_dev));
        }
        while let Some((current, with_dev)) = stack.pop() {
            if !closure.insert(current.clone()) {
                continue;
            }
            for dep in self.dependencies_of(&current, with_dev)? {
                if !closure.contains(&dep) {
                    stack.push((dep, false));
                }
            }
        }
        Ok(closure)
    }

    /// Resolved current versions of a package's local dependencies, taken
    /// from the graph rather than the (possibly stale) constraint strings.
    pub fn local_dependency_versions(&self, name: &str) -> Result<BTreeMap<String, Version>> {
        let mut versions = BTreeMap::new();
        for dep in self.dependencies_of(name, true)? {
            versions.insert(dep.clone(), self.packages[&dep].version.clone());
        }
        Ok(versions)
    }

    /// Declared dependency names that resolve outside this scan.
    pub fn external_dependencies(&self, name: &str, include_dev: bool) -> Result<Vec<String>> {
        let package = self.get(name).ok_or_else(|| Error::PackageNotFound {
            name: name.to_string(),
            available: self.available(),
        })?;
        Ok(package
            .dependency_names(include_dev)
            .filter(|dep| !self.packages.contains_key(*dep))
            .map(str::to_string)
            .collect())
    }
}
