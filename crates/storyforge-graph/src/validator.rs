//! Structural health checks over a story graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;
use storyforge_core::graph::{Choice, Node};
use tracing::debug;
use uuid::Uuid;

/// Outcome of validating a story graph.
///
/// Id lists follow the order of the input nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// All checks passed.
    pub is_valid: bool,
    /// Some node carries the start flag.
    pub has_start_node: bool,
    /// Some node carries the ending flag.
    pub has_ending_nodes: bool,
    /// Non-start nodes with no incoming choices.
    pub orphaned_node_ids: Vec<Uuid>,
    /// Nodes not reachable from the start node.
    pub unreachable_node_ids: Vec<Uuid>,
    /// Non-ending nodes with no outgoing choices.
    pub dead_end_node_ids: Vec<Uuid>,
}

impl ValidationResult {
    fn empty_graph() -> Self {
        Self {
            is_valid: false,
            has_start_node: false,
            has_ending_nodes: false,
            orphaned_node_ids: Vec::new(),
            unreachable_node_ids: Vec::new(),
            dead_end_node_ids: Vec::new(),
        }
    }

    /// Every failed check, in a fixed order: start, endings, orphans,
    /// unreachable, dead ends.
    #[must_use]
    pub fn violations(&self) -> Vec<StructureViolation> {
        let mut violations = Vec::new();
        if !self.has_start_node {
            violations.push(StructureViolation::MissingStartNode);
        }
        if !self.has_ending_nodes {
            violations.push(StructureViolation::MissingEndingNodes);
        }
        if !self.orphaned_node_ids.is_empty() {
            violations.push(StructureViolation::OrphanedNodes {
                node_ids: self.orphaned_node_ids.clone(),
            });
        }
        if !self.unreachable_node_ids.is_empty() {
            violations.push(StructureViolation::UnreachableNodes {
                node_ids: self.unreachable_node_ids.clone(),
            });
        }
        if !self.dead_end_node_ids.is_empty() {
            violations.push(StructureViolation::DeadEndNodes {
                node_ids: self.dead_end_node_ids.clone(),
            });
        }
        violations
    }
}

/// A single failed structural check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureViolation {
    /// No node is flagged as the start.
    MissingStartNode,
    /// No node is flagged as an ending.
    MissingEndingNodes,
    /// Nodes nothing leads into.
    OrphanedNodes {
        /// Affected nodes.
        node_ids: Vec<Uuid>,
    },
    /// Nodes the reader can never get to.
    UnreachableNodes {
        /// Affected nodes.
        node_ids: Vec<Uuid>,
    },
    /// Nodes the reader gets stuck on.
    DeadEndNodes {
        /// Affected nodes.
        node_ids: Vec<Uuid>,
    },
}

impl StructureViolation {
    /// Nodes affected by this violation; empty for story-wide checks.
    #[must_use]
    pub fn node_ids(&self) -> &[Uuid] {
        match self {
            Self::MissingStartNode | Self::MissingEndingNodes => &[],
            Self::OrphanedNodes { node_ids }
            | Self::UnreachableNodes { node_ids }
            | Self::DeadEndNodes { node_ids } => node_ids,
        }
    }
}

impl fmt::Display for StructureViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartNode => f.write_str("no start node"),
            Self::MissingEndingNodes => f.write_str("no ending nodes"),
            Self::OrphanedNodes { node_ids } => {
                write!(f, "{} orphaned node(s) with no incoming choices", node_ids.len())
            }
            Self::UnreachableNodes { node_ids } => {
                write!(f, "{} node(s) unreachable from the start node", node_ids.len())
            }
            Self::DeadEndNodes { node_ids } => write!(
                f,
                "{} dead-end node(s) with no outgoing choices",
                node_ids.len()
            ),
        }
    }
}

/// Computes the structural health of a story graph.
///
/// The first node flagged `is_start` is the traversal root. Reachability is
/// a breadth-first walk over `source -> target` edges guarded by a visited
/// set, so cycles terminate. Without a start node every node is unreachable.
#[must_use]
pub fn validate_structure(nodes: &[Node], choices: &[Choice]) -> ValidationResult {
    if nodes.is_empty() {
        return ValidationResult::empty_graph();
    }

    let start_node = nodes.iter().find(|n| n.is_start);
    let has_ending_nodes = nodes.iter().any(|n| n.is_ending);

    let mut incoming: HashSet<Uuid> = HashSet::new();
    let mut outgoing: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for choice in choices {
        incoming.insert(choice.target_node_id);
        outgoing
            .entry(choice.source_node_id)
            .or_default()
            .push(choice.target_node_id);
    }

    let orphaned_node_ids: Vec<Uuid> = nodes
        .iter()
        .filter(|n| !n.is_start && !incoming.contains(&n.id))
        .map(|n| n.id)
        .collect();

    let visited = start_node.map_or_else(HashSet::new, |start| reachable_from(start.id, &outgoing));
    let unreachable_node_ids: Vec<Uuid> = nodes
        .iter()
        .filter(|n| !visited.contains(&n.id))
        .map(|n| n.id)
        .collect();

    let dead_end_node_ids: Vec<Uuid> = nodes
        .iter()
        .filter(|n| !n.is_ending && !outgoing.contains_key(&n.id))
        .map(|n| n.id)
        .collect();

    let has_start_node = start_node.is_some();
    let is_valid = has_start_node
        && has_ending_nodes
        && orphaned_node_ids.is_empty()
        && unreachable_node_ids.is_empty()
        && dead_end_node_ids.is_empty();

    debug!(
        node_count = nodes.len(),
        choice_count = choices.len(),
        is_valid,
        "validated story structure"
    );

    ValidationResult {
        is_valid,
        has_start_node,
        has_ending_nodes,
        orphaned_node_ids,
        unreachable_node_ids,
        dead_end_node_ids,
    }
}

fn reachable_from(start: Uuid, outgoing: &HashMap<Uuid, Vec<Uuid>>) -> HashSet<Uuid> {
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for &next in outgoing.get(&current).into_iter().flatten() {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyforge_test_support::GraphFixture;

    #[test]
    fn test_empty_graph_is_invalid() {
        let result = validate_structure(&[], &[]);

        assert!(!result.is_valid);
        assert!(!result.has_start_node);
        assert!(!result.has_ending_nodes);
        assert!(result.orphaned_node_ids.is_empty());
        assert!(result.unreachable_node_ids.is_empty());
        assert!(result.dead_end_node_ids.is_empty());
    }

    #[test]
    fn test_single_start_ending_node_is_valid() {
        // Arrange
        let graph = GraphFixture::new().start_ending("A");

        // Act
        let result = validate_structure(graph.nodes(), graph.choices());

        // Assert
        assert!(result.is_valid);
        assert!(result.orphaned_node_ids.is_empty());
        assert!(result.unreachable_node_ids.is_empty());
        assert!(result.dead_end_node_ids.is_empty());
        assert!(result.violations().is_empty());
    }

    #[test]
    fn test_start_to_ending_is_valid() {
        let graph = GraphFixture::new()
            .start("A")
            .ending("B")
            .choice("A", "B");

        let result = validate_structure(graph.nodes(), graph.choices());

        assert!(result.is_valid);
        assert!(result.has_start_node);
        assert!(result.has_ending_nodes);
        assert!(result.orphaned_node_ids.is_empty());
        assert!(result.unreachable_node_ids.is_empty());
        assert!(result.dead_end_node_ids.is_empty());
    }

    #[test]
    fn test_disconnected_ending_is_orphaned_and_unreachable() {
        // Arrange
        let graph = GraphFixture::new()
            .start("A")
            .node("B")
            .ending("C")
            .choice("A", "B");

        // Act
        let result = validate_structure(graph.nodes(), graph.choices());

        // Assert
        assert!(!result.is_valid);
        assert_eq!(result.orphaned_node_ids, graph.ids(&["C"]));
        assert_eq!(result.unreachable_node_ids, graph.ids(&["C"]));
        assert_eq!(result.dead_end_node_ids, graph.ids(&["B"]));
    }

    #[test]
    fn test_lone_start_without_ending_is_dead_end() {
        let graph = GraphFixture::new().start("A");

        let result = validate_structure(graph.nodes(), graph.choices());

        assert!(!result.is_valid);
        assert!(!result.has_ending_nodes);
        assert_eq!(result.dead_end_node_ids, graph.ids(&["A"]));
        assert_eq!(
            result.violations(),
            vec![
                StructureViolation::MissingEndingNodes,
                StructureViolation::DeadEndNodes {
                    node_ids: graph.ids(&["A"]),
                },
            ]
        );
    }

    #[test]
    fn test_cycle_reachable_from_start_terminates_and_counts_as_reachable() {
        // Arrange: A -> B -> C -> B, C -> D(ending)
        let graph = GraphFixture::new()
            .start("A")
            .node("B")
            .node("C")
            .ending("D")
            .choice("A", "B")
            .choice("B", "C")
            .choice("C", "B")
            .choice("C", "D");

        // Act
        let result = validate_structure(graph.nodes(), graph.choices());

        // Assert
        assert!(result.is_valid);
        assert!(result.unreachable_node_ids.is_empty());
    }

    #[test]
    fn test_cycle_back_to_start_is_valid() {
        let graph = GraphFixture::new()
            .start("A")
            .node("B")
            .ending("C")
            .choice("A", "B")
            .choice("B", "A")
            .choice("B", "C");

        let result = validate_structure(graph.nodes(), graph.choices());

        assert!(result.is_valid);
    }

    #[test]
    fn test_unreachable_cycle_is_reported_but_not_orphaned() {
        // B <-> C form a loop nothing enters from the start.
        let graph = GraphFixture::new()
            .start_ending("A")
            .node("B")
            .node("C")
            .choice("B", "C")
            .choice("C", "B");

        let result = validate_structure(graph.nodes(), graph.choices());

        assert!(!result.is_valid);
        assert!(result.orphaned_node_ids.is_empty());
        assert_eq!(result.unreachable_node_ids, graph.ids(&["B", "C"]));
        assert!(result.dead_end_node_ids.is_empty());
    }

    #[test]
    fn test_missing_start_marks_every_node_unreachable() {
        let graph = GraphFixture::new()
            .node("A")
            .ending("B")
            .choice("A", "B");

        let result = validate_structure(graph.nodes(), graph.choices());

        assert!(!result.is_valid);
        assert!(!result.has_start_node);
        assert_eq!(result.orphaned_node_ids, graph.ids(&["A"]));
        assert_eq!(result.unreachable_node_ids, graph.ids(&["A", "B"]));
        assert_eq!(
            result.violations()[0],
            StructureViolation::MissingStartNode
        );
    }

    #[test]
    fn test_first_start_flag_wins_when_several_are_set() {
        let graph = GraphFixture::new()
            .start("A")
            .start("B")
            .ending("C")
            .choice("A", "C");

        let result = validate_structure(graph.nodes(), graph.choices());

        // B is a start node so it is not orphaned, but traversal begins at A.
        assert!(result.orphaned_node_ids.is_empty());
        assert_eq!(result.unreachable_node_ids, graph.ids(&["B"]));
        assert_eq!(result.dead_end_node_ids, graph.ids(&["B"]));
    }

    #[test]
    fn test_result_lists_follow_input_node_order() {
        let graph = GraphFixture::new()
            .start_ending("A")
            .node("Z")
            .node("M")
            .node("B");

        let result = validate_structure(graph.nodes(), graph.choices());

        assert_eq!(result.orphaned_node_ids, graph.ids(&["Z", "M", "B"]));
        assert_eq!(result.dead_end_node_ids, graph.ids(&["Z", "M", "B"]));
    }

    #[test]
    fn test_violation_display_counts_affected_nodes() {
        let violation = StructureViolation::UnreachableNodes {
            node_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        assert_eq!(
            violation.to_string(),
            "2 node(s) unreachable from the start node"
        );
        assert_eq!(violation.node_ids().len(), 2);
    }

    #[test]
    fn test_violation_serializes_with_kind_tag() {
        let value = serde_json::to_value(StructureViolation::MissingStartNode).unwrap();
        assert_eq!(value, serde_json::json!({ "kind": "missing_start_node" }));
    }
}
