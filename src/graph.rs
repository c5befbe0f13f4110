// ==============================================================================
// Graph abstraction
// ==============================================================================
//
// An arena-backed tree of context nodes, indexed by opaque `ContextNodeId`s
// (a `usize` newtype plus a side `Vec` holding the data, rather than a
// pointer/`Rc` tree). Children are kept in a `BTreeMap` so sub-segment
// lookup and ordered iteration share one structure.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::GraphError;
use crate::xri::{SubSegment, Xri};

/// Sentinel predicate used internally to serialize a context-node statement
/// (`subject/()/object`) — not one of the six class symbols, since a
/// context-node relationship isn't carried by a literal arc.
pub const CONTEXT_NODE_PREDICATE: &str = "()";

/// Opaque index into a [`Graph`]'s node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextNodeId(usize);

struct ContextNodeData {
    parent: Option<ContextNodeId>,
    /// The sub-segment this node is addressed by under its parent. `None`
    /// only for the root.
    arc: Option<SubSegment>,
    children: BTreeMap<SubSegment, ContextNodeId>,
    relations: Vec<(Xri, ContextNodeId)>,
    literal: Option<String>,
}

/// A semantic graph of context nodes, relations, and literals.
///
/// No compaction happens on delete: a deleted node's slot in the arena is
/// left tombstoned (unreachable from the root) rather than reclaimed. This
/// keeps every previously-issued [`ContextNodeId`] stable for the life of
/// the graph, at the cost of leaking arena slots across repeated
/// delete/recreate cycles.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<ContextNodeData>,
}

/// One RDF-like statement: a context-node declaration, a relation, or a
/// literal value, each carrying the subject address it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    ContextNode { subject: Xri, object: Xri },
    Relation { subject: Xri, predicate: Xri, object: Xri },
    Literal { subject: Xri, data: String },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextNode { subject, object } => {
                write!(f, "{subject}/{CONTEXT_NODE_PREDICATE}/{object}")
            }
            Self::Relation {
                subject,
                predicate,
                object,
            } => write!(f, "{subject}/{predicate}/{object}"),
            Self::Literal { subject, data } => write!(f, "{subject}/!/\"{data}\""),
        }
    }
}

impl Graph {
    /// Builds a graph containing only its root context node, addressed by `()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![ContextNodeData {
                parent: None,
                arc: None,
                children: BTreeMap::new(),
                relations: Vec::new(),
                literal: None,
            }],
        }
    }

    #[must_use]
    pub const fn root(&self) -> ContextNodeId {
        ContextNodeId(0)
    }

    fn node(&self, id: ContextNodeId) -> &ContextNodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: ContextNodeId) -> &mut ContextNodeData {
        &mut self.nodes[id.0]
    }

    /// The full address of `id`, reconstructed by walking parent links to the root.
    #[must_use]
    #[allow(clippy::expect_used)] // Invariant: every node with an arc was given a parent at creation.
    pub fn address_of(&self, id: ContextNodeId) -> Xri {
        let mut sub_segments = Vec::new();
        let mut current = id;
        while let Some(arc) = self.node(current).arc.clone() {
            sub_segments.push(arc);
            current = self.node(current).parent.expect("non-root node has a parent");
        }
        sub_segments.reverse();
        Xri::from_sub_segments(sub_segments)
    }

    /// Finds the context node at `address`, creating any missing intermediate
    /// nodes along the way (mkdir -p semantics).
    pub fn find_context_node(&mut self, address: &Xri) -> ContextNodeId {
        let mut current = self.root();
        for sub_segment in address.sub_segments() {
            if let Some(&child) = self.node(current).children.get(sub_segment) {
                current = child;
            } else {
                let id = ContextNodeId(self.nodes.len());
                self.nodes.push(ContextNodeData {
                    parent: Some(current),
                    arc: Some(sub_segment.clone()),
                    children: BTreeMap::new(),
                    relations: Vec::new(),
                    literal: None,
                });
                self.node_mut(current).children.insert(sub_segment.clone(), id);
                current = id;
            }
        }
        current
    }

    /// Finds the context node at `address` without creating anything.
    #[must_use]
    pub fn find_context_node_readonly(&self, address: &Xri) -> Option<ContextNodeId> {
        let mut current = self.root();
        for sub_segment in address.sub_segments() {
            current = *self.node(current).children.get(sub_segment)?;
        }
        Some(current)
    }

    #[must_use]
    pub fn literal(&self, id: ContextNodeId) -> Option<&str> {
        self.node(id).literal.as_deref()
    }

    pub fn set_literal(&mut self, id: ContextNodeId, data: impl Into<String>) {
        self.node_mut(id).literal = Some(data.into());
    }

    #[must_use]
    pub fn relations(&self, id: ContextNodeId) -> &[(Xri, ContextNodeId)] {
        &self.node(id).relations
    }

    /// Adds a `predicate` relation from `id` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateRelation`] if `id` already has a
    /// `predicate` relation pointing somewhere else.
    pub fn add_relation(
        &mut self,
        id: ContextNodeId,
        predicate: Xri,
        target: ContextNodeId,
    ) -> Result<(), GraphError> {
        let target_address = self.address_of(target);
        let node = self.node_mut(id);
        if let Some((_, existing)) = node.relations.iter().find(|(p, _)| *p == predicate) {
            if *existing != target {
                return Err(GraphError::DuplicateRelation {
                    source: String::new(),
                    arc: predicate.to_string(),
                    existing_target: String::new(),
                    new_target: target_address.to_string(),
                });
            }
            return Ok(());
        }
        node.relations.push((predicate, target));
        Ok(())
    }

    pub fn remove_relation(&mut self, id: ContextNodeId, predicate: &Xri, target: ContextNodeId) {
        self.node_mut(id)
            .relations
            .retain(|(p, t)| !(p == predicate && *t == target));
    }

    /// Removes a child context node and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CannotDeleteRoot`] if `id` is the root.
    #[allow(clippy::expect_used)] // Invariant: a node with a parent was given an arc at creation.
    pub fn delete_context_node(&mut self, id: ContextNodeId) -> Result<(), GraphError> {
        let Some(parent) = self.node(id).parent else {
            return Err(GraphError::CannotDeleteRoot);
        };
        let arc = self.node(id).arc.clone().expect("non-root has an arc");
        self.node_mut(parent).children.remove(&arc);
        Ok(())
    }

    fn collect_statements(&self, id: ContextNodeId, out: &mut Vec<Statement>) {
        let subject = self.address_of(id);
        let node = self.node(id);

        if let Some(data) = &node.literal {
            out.push(Statement::Literal {
                subject: subject.clone(),
                data: data.clone(),
            });
        }
        for (predicate, target) in &node.relations {
            out.push(Statement::Relation {
                subject: subject.clone(),
                predicate: predicate.clone(),
                object: self.address_of(*target),
            });
        }
        for &child in node.children.values() {
            let object = self.address_of(child);
            out.push(Statement::ContextNode {
                subject: subject.clone(),
                object,
            });
            self.collect_statements(child, out);
        }
    }

    /// All statements reachable from `id`, including the declaration
    /// statements for every descendant context node.
    #[must_use]
    pub fn statements_under(&self, id: ContextNodeId) -> Vec<Statement> {
        let mut out = Vec::new();
        self.collect_statements(id, &mut out);
        out
    }

    #[must_use]
    pub fn statements(&self) -> Vec<Statement> {
        self.statements_under(self.root())
    }

    #[must_use]
    pub fn contains_statement(&self, statement: &Statement) -> bool {
        match statement {
            Statement::ContextNode { subject, object } => {
                let Some(parent) = self.find_context_node_readonly(subject) else {
                    return false;
                };
                let Some(last) = object.sub_segments().last() else {
                    return false;
                };
                self.node(parent).children.get(last).is_some()
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => {
                let Some(id) = self.find_context_node_readonly(subject) else {
                    return false;
                };
                let Some(target) = self.find_context_node_readonly(object) else {
                    return false;
                };
                self.node(id)
                    .relations
                    .iter()
                    .any(|(p, t)| p == predicate && *t == target)
            }
            Statement::Literal { subject, data } => self
                .find_context_node_readonly(subject)
                .is_some_and(|id| self.node(id).literal.as_deref() == Some(data.as_str())),
        }
    }

    /// Asserts `statement` into the graph, creating intermediate context
    /// nodes as needed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateRelation`] on a conflicting relation.
    pub fn assert_statement(&mut self, statement: &Statement) -> Result<(), GraphError> {
        match statement {
            Statement::ContextNode { object, .. } => {
                self.find_context_node(object);
                Ok(())
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => {
                let source = self.find_context_node(subject);
                let target = self.find_context_node(object);
                self.add_relation(source, predicate.clone(), target)
            }
            Statement::Literal { subject, data } => {
                let id = self.find_context_node(subject);
                self.set_literal(id, data.clone());
                Ok(())
            }
        }
    }

    /// Removes `statement` from the graph, if present. Removing the last
    /// statement about a context node does not delete the node itself —
    /// only [`Self::delete_context_node`] does that.
    pub fn remove_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::ContextNode { object, .. } => {
                if let Some(id) = self.find_context_node_readonly(object) {
                    let _ = self.delete_context_node(id);
                }
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => {
                if let (Some(id), Some(target)) = (
                    self.find_context_node_readonly(subject),
                    self.find_context_node_readonly(object),
                ) {
                    self.remove_relation(id, predicate, target);
                }
            }
            Statement::Literal { subject, .. } => {
                if let Some(id) = self.find_context_node_readonly(subject) {
                    self.node_mut(id).literal = None;
                }
            }
        }
    }
}

/// Copies every statement reachable from `source`'s root into `dest`.
///
/// Grounded on the CopyUtilTest scenario (whole separate graph instances
/// copied into one another, not a subtree copied onto a subpath).
///
/// # Errors
///
/// Returns [`GraphError::DuplicateRelation`] if `dest` already has a
/// conflicting relation for one of the copied statements.
pub fn copy_graph(source: &Graph, dest: &mut Graph) -> Result<(), GraphError> {
    for statement in source.statements() {
        dest.assert_statement(&statement)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::xri::parse;

    fn xri(s: &str) -> Xri {
        parse(s).unwrap()
    }

    #[test]
    fn find_context_node_creates_intermediate_nodes() {
        let mut graph = Graph::new();
        let id = graph.find_context_node(&xri("=markus+email"));
        assert_eq!(graph.address_of(id), xri("=markus+email"));
        assert!(graph.find_context_node_readonly(&xri("=markus")).is_some());
    }

    #[test]
    fn set_and_read_literal() {
        let mut graph = Graph::new();
        let id = graph.find_context_node(&xri("=markus+email"));
        graph.set_literal(id, "markus.sabadello@gmail.com");
        assert_eq!(graph.literal(id), Some("markus.sabadello@gmail.com"));
    }

    #[test]
    fn duplicate_relation_to_same_target_is_idempotent() {
        let mut graph = Graph::new();
        let a = graph.find_context_node(&xri("=markus"));
        let b = graph.find_context_node(&xri("=bob"));
        graph.add_relation(a, xri("+friend"), b).unwrap();
        graph.add_relation(a, xri("+friend"), b).unwrap();
        assert_eq!(graph.relations(a).len(), 1);
    }

    #[test]
    fn duplicate_relation_to_different_target_errors() {
        let mut graph = Graph::new();
        let a = graph.find_context_node(&xri("=markus"));
        let b = graph.find_context_node(&xri("=bob"));
        let c = graph.find_context_node(&xri("=carol"));
        graph.add_relation(a, xri("+friend"), b).unwrap();
        assert!(graph.add_relation(a, xri("+friend"), c).is_err());
    }

    #[test]
    fn delete_root_errors() {
        let mut graph = Graph::new();
        let root = graph.root();
        assert!(matches!(
            graph.delete_context_node(root),
            Err(GraphError::CannotDeleteRoot)
        ));
    }

    #[test]
    fn contains_statement_roundtrip() {
        let mut graph = Graph::new();
        let statement = Statement::Literal {
            subject: xri("=markus+email"),
            data: "markus.sabadello@gmail.com".to_owned(),
        };
        graph.assert_statement(&statement).unwrap();
        assert!(graph.contains_statement(&statement));
    }

    #[test]
    fn copy_graph_reproduces_all_statements() {
        let mut source = Graph::new();
        source
            .assert_statement(&Statement::Literal {
                subject: xri("=markus+email"),
                data: "markus.sabadello@gmail.com".to_owned(),
            })
            .unwrap();
        let a = source.find_context_node(&xri("=markus"));
        let b = source.find_context_node(&xri("=bob"));
        source.add_relation(a, xri("+friend"), b).unwrap();

        let mut dest = Graph::new();
        copy_graph(&source, &mut dest).unwrap();

        let mut source_statements = source.statements();
        let mut dest_statements = dest.statements();
        source_statements.sort_by_key(std::string::ToString::to_string);
        dest_statements.sort_by_key(std::string::ToString::to_string);
        assert_eq!(source_statements, dest_statements);
    }

    #[test]
    fn copy_graph_twice_is_idempotent() {
        let mut source = Graph::new();
        source
            .assert_statement(&Statement::Literal {
                subject: xri("=markus+email"),
                data: "markus.sabadello@gmail.com".to_owned(),
            })
            .unwrap();

        let mut dest = Graph::new();
        copy_graph(&source, &mut dest).unwrap();
        copy_graph(&source, &mut dest).unwrap();

        assert_eq!(dest.statements().len(), source.statements().len());
    }

    #[test]
    fn remove_statement_then_contains_is_false() {
        let mut graph = Graph::new();
        let statement = Statement::Literal {
            subject: xri("=markus+email"),
            data: "markus.sabadello@gmail.com".to_owned(),
        };
        graph.assert_statement(&statement).unwrap();
        graph.remove_statement(&statement);
        assert!(!graph.contains_statement(&statement));
    }
}
