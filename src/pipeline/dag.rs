// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Stage dependency graph
//!
//! Builds and validates the dependency graph of a pipeline. Nodes are
//! stages (weighted by declaration index), edges run from a dependency to
//! the stage that depends on it.

use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::errors::ValidationError;
use crate::pipeline::{PipelineDefinition, StageDefinition};

/// A validated, acyclic stage graph
#[derive(Debug, Clone)]
pub struct StageGraph {
    pipeline: Arc<PipelineDefinition>,
    graph: DiGraph<usize, ()>,
    id_to_index: HashMap<String, NodeIndex>,
    topological: Vec<NodeIndex>,
}

impl StageGraph {
    /// Build a graph from a pipeline
    ///
    /// Rejects duplicate ids, self-dependencies, unknown dependencies and
    /// cycles, in that order. No partial graph is ever returned.
    pub fn build(pipeline: Arc<PipelineDefinition>) -> Result<Self, ValidationError> {
        let count = pipeline.stages.len();
        let mut graph = DiGraph::with_capacity(count, count);
        let mut id_to_index = HashMap::with_capacity(count);

        for (idx, stage) in pipeline.stages.iter().enumerate() {
            let node = graph.add_node(idx);
            if id_to_index.insert(stage.id.clone(), node).is_some() {
                return Err(ValidationError::DuplicateStageId {
                    stage: stage.id.clone(),
                });
            }
        }

        if let Some(stage) = pipeline
            .stages
            .iter()
            .find(|s| s.dependencies.contains(&s.id))
        {
            return Err(ValidationError::CycleDetected {
                cycle: vec![stage.id.clone(), stage.id.clone()],
            });
        }

        for (idx, stage) in pipeline.stages.iter().enumerate() {
            let stage_node = NodeIndex::new(idx);

            for dep_id in &stage.dependencies {
                let dep_node = id_to_index.get(dep_id).ok_or_else(|| {
                    ValidationError::UnknownDependency {
                        stage: stage.id.clone(),
                        dependency: dep_id.clone(),
                    }
                })?;

                // Repeated entries collapse into one edge
                if !graph.contains_edge(*dep_node, stage_node) {
                    graph.add_edge(*dep_node, stage_node, ());
                }
            }
        }

        let mut built = Self {
            pipeline,
            graph,
            id_to_index,
            topological: Vec::new(),
        };

        built.topological = toposort(&built.graph, None).map_err(|_| {
            ValidationError::CycleDetected {
                cycle: built.find_cycle(),
            }
        })?;

        Ok(built)
    }

    /// Shortest cycle through the earliest-declared stage that sits on one,
    /// closed by repeating its first id
    fn find_cycle(&self) -> Vec<String> {
        let Some(component) = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|c| c.len() > 1)
            .min_by_key(|c| c.iter().map(|n| n.index()).min())
        else {
            return Vec::new();
        };

        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let Some(start) = component.iter().copied().min_by_key(|n| n.index()) else {
            return Vec::new();
        };

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.sorted_neighbors(node, Direction::Outgoing) {
                if next == start {
                    let mut path = vec![node];
                    let mut cur = node;
                    while cur != start {
                        cur = parent[&cur];
                        path.push(cur);
                    }
                    path.reverse();
                    path.push(start);
                    return path.into_iter().map(|n| self.id_of(n).to_string()).collect();
                }

                if members.contains(&next) && !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        Vec::new()
    }

    /// Neighbors ordered by declaration index
    fn sorted_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        nodes.sort_by_key(|n| n.index());
        nodes
    }

    fn id_of(&self, node: NodeIndex) -> &str {
        &self.pipeline.stages[self.graph[node]].id
    }

    /// The pipeline this graph was built from
    pub fn pipeline(&self) -> &Arc<PipelineDefinition> {
        &self.pipeline
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get a stage by id
    pub fn stage(&self, id: &str) -> Option<&StageDefinition> {
        let node = self.id_to_index.get(id)?;
        self.pipeline.stages.get(self.graph[*node])
    }

    /// Stages in declaration order
    pub fn stages(&self) -> impl Iterator<Item = &StageDefinition> {
        self.pipeline.stages.iter()
    }

    /// Declaration index of a stage
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).map(|n| self.graph[*n])
    }

    /// Declaration indices in a topological order
    pub fn topological_order(&self) -> Vec<usize> {
        self.topological.iter().map(|n| self.graph[*n]).collect()
    }

    /// Direct dependencies of a stage (stages that must run before it)
    pub fn dependencies(&self, id: &str) -> Option<Vec<&str>> {
        let node = self.id_to_index.get(id)?;
        Some(
            self.sorted_neighbors(*node, Direction::Incoming)
                .into_iter()
                .map(|n| self.id_of(n))
                .collect(),
        )
    }

    /// Direct dependents of a stage (stages that depend on it)
    pub fn dependents(&self, id: &str) -> Option<Vec<&str>> {
        let node = self.id_to_index.get(id)?;
        Some(
            self.sorted_neighbors(*node, Direction::Outgoing)
                .into_iter()
                .map(|n| self.id_of(n))
                .collect(),
        )
    }

    /// Every stage reachable from `id` along dependency edges, in
    /// declaration order, excluding `id` itself
    pub fn transitive_dependents(&self, id: &str) -> Vec<&str> {
        let Some(&start) = self.id_to_index.get(id) else {
            return Vec::new();
        };

        let mut reached = Vec::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            if node != start {
                reached.push(node);
            }
        }

        reached.sort_by_key(|n| n.index());
        reached.into_iter().map(|n| self.id_of(n)).collect()
    }

    /// Check if stage A depends (directly or transitively) on stage B
    pub fn depends_on(&self, stage_a: &str, stage_b: &str) -> bool {
        let Some(node_a) = self.id_to_index.get(stage_a) else {
            return false;
        };
        let Some(node_b) = self.id_to_index.get(stage_b) else {
            return false;
        };

        node_a != node_b && has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Stages nothing depends on, in declaration order
    pub fn leaves(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|n| {
                self.graph
                    .neighbors_directed(*n, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|n| self.id_of(n))
            .collect()
    }

    /// Generate Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for stage in self.stages() {
            out.push_str(&format!("    {}[{}]\n", stage.id, stage.name));
        }

        for stage in self.stages() {
            for dep in self.dependencies(&stage.id).unwrap_or_default() {
                out.push_str(&format!("    {} --> {}\n", dep, stage.id));
            }
        }

        out
    }

    /// Generate DOT diagram of the graph
    pub fn to_dot(&self) -> String {
        let mut out = format!("digraph \"{}\" {{\n", self.pipeline.id);
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for stage in self.stages() {
            out.push_str(&format!(
                "    \"{}\" [label=\"{} ({})\"];\n",
                stage.id, stage.name, stage.kind
            ));
        }

        out.push('\n');

        for stage in self.stages() {
            for dep in self.dependencies(&stage.id).unwrap_or_default() {
                out.push_str(&format!("    \"{}\" -> \"{}\";\n", dep, stage.id));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of a topological order
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for (i, idx) in self.topological_order().into_iter().enumerate() {
            let stage = &self.pipeline.stages[idx];
            let deps = self.dependencies(&stage.id).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, stage.id, stage.kind));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::StageKind;

    pub(crate) fn make_test_pipeline(stages: Vec<(&str, Vec<&str>)>) -> Arc<PipelineDefinition> {
        let mut pipeline = PipelineDefinition::new("test", "Test");
        for (id, deps) in stages {
            pipeline = pipeline.with_stage(
                StageDefinition::new(id, StageKind::Build, format!("run {}", id)).depends_on(deps),
            );
        }
        Arc::new(pipeline)
    }

    #[test]
    fn test_linear_graph() {
        let pipeline = make_test_pipeline(vec![
            ("src", vec![]),
            ("build", vec!["src"]),
            ("deploy", vec!["build"]),
        ]);

        let graph = StageGraph::build(pipeline).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.topological_order(), vec![0, 1, 2]);
        assert_eq!(graph.leaves(), vec!["deploy"]);
    }

    #[test]
    fn test_diamond_graph() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let graph = StageGraph::build(pipeline).unwrap();
        let order = graph.topological_order();

        assert_eq!(order[0], 0);
        assert_eq!(order[3], 3);
        assert_eq!(graph.dependents("a").unwrap(), vec!["b", "c"]);
        assert_eq!(graph.dependencies("d").unwrap(), vec!["b", "c"]);
        assert_eq!(graph.transitive_dependents("a"), vec!["b", "c", "d"]);
        assert!(graph.transitive_dependents("d").is_empty());
    }

    #[test]
    fn test_cycle_reports_ordered_path() {
        let pipeline = make_test_pipeline(vec![
            ("x", vec![]),
            ("a", vec!["c", "x"]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let err = StageGraph::build(pipeline).unwrap_err();
        assert_eq!(
            err,
            ValidationError::CycleDetected {
                cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()],
            }
        );
    }

    #[test]
    fn test_two_stage_cycle() {
        let pipeline = make_test_pipeline(vec![("a", vec!["b"]), ("b", vec!["a"])]);

        let result = StageGraph::build(pipeline);
        assert!(matches!(
            result,
            Err(ValidationError::CycleDetected { ref cycle }) if cycle == &["a", "b", "a"]
        ));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["b"])]);

        assert_eq!(
            StageGraph::build(pipeline).unwrap_err(),
            ValidationError::CycleDetected {
                cycle: vec!["b".into(), "b".into()],
            }
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let pipeline = make_test_pipeline(vec![("a", vec!["nonexistent"])]);

        assert_eq!(
            StageGraph::build(pipeline).unwrap_err(),
            ValidationError::UnknownDependency {
                stage: "a".into(),
                dependency: "nonexistent".into(),
            }
        );
    }

    #[test]
    fn test_duplicate_stage_id() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("a", vec![])]);

        assert_eq!(
            StageGraph::build(pipeline).unwrap_err(),
            ValidationError::DuplicateStageId { stage: "a".into() }
        );
    }

    #[test]
    fn test_repeated_dependency_collapses() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a", "a"])]);

        let graph = StageGraph::build(pipeline).unwrap();
        assert_eq!(graph.dependencies("b").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_depends_on_check() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let graph = StageGraph::build(pipeline).unwrap();

        assert!(graph.depends_on("c", "a")); // transitive
        assert!(graph.depends_on("c", "b")); // direct
        assert!(!graph.depends_on("a", "c"));
        assert!(!graph.depends_on("a", "a"));
        assert!(!graph.depends_on("a", "missing"));
    }

    #[test]
    fn test_text_output() {
        let pipeline = make_test_pipeline(vec![
            ("src", vec![]),
            ("build", vec!["src"]),
            ("deploy", vec!["build"]),
        ]);

        let graph = StageGraph::build(pipeline).unwrap();
        insta::assert_snapshot!(graph.to_text(), @r###"
        1. src (build)
        2. build (build) [depends: src]
        3. deploy (build) [depends: build]
        "###);
    }

    #[test]
    fn test_mermaid_and_dot_output() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"])]);

        let graph = StageGraph::build(pipeline).unwrap();

        let mermaid = graph.to_mermaid();
        assert!(mermaid.starts_with("graph TD"));
        assert!(mermaid.contains("a --> b"));

        let dot = graph.to_dot();
        assert!(dot.contains("\"a\" -> \"b\";"));
        assert!(dot.contains("label=\"b (build)\""));
    }
}
