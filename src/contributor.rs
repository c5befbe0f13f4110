// ==============================================================================
// Contributor map
// ==============================================================================
//
// A `BTreeMap` keyed by a descending-length-ordered wrapper, so natural
// ascending iteration visits the longest (most specific) registered prefix
// first, rather than insertion order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::graph::{Graph, Statement};
use crate::xri::Xri;

/// A plug-in that handles (or partially handles, deferring to the graph for
/// the rest) messaging for everything under its registered address prefix.
pub trait Contributor: Send + Sync {
    /// Contributes to resolving `address`, which is the *remainder* of the
    /// dispatched address with this contributor's own mount prefix already
    /// removed from the front — a contributor mounted at `=markus` seeing
    /// `+email*1` dispatched against `=markus+email*1` is handed `+email*1`,
    /// not the absolute address. Returning `Ok(true)` tells the dispatcher
    /// this contributor fully handled the address; `Ok(false)` defers, and
    /// the dispatcher falls through to the graph (it does not retry a
    /// shorter registered prefix — only the single longest match runs).
    ///
    /// `trail` lists the mount prefixes of contributors already invoked in
    /// this dispatch chain, longest first. A contributor that performs its
    /// own nested dispatch against `address` (the remainder) should extend
    /// `trail` with its own prefix so a re-entrant call can detect and
    /// avoid invoking the same contributor twice.
    fn contribute_address(
        &self,
        address: &Xri,
        trail: &[Xri],
        ctx: &mut ExecutionContext,
    ) -> Result<bool, MessagingError>;

    /// Contributes to resolving a `subject/predicate/object` statement.
    /// Unlike [`Self::contribute_address`], `statement` is handed whole —
    /// a tripartite statement has no single remainder XRI to strip a mount
    /// prefix from. `trail` is as described there.
    fn contribute_statement(
        &self,
        statement: &Statement,
        trail: &[Xri],
        ctx: &mut ExecutionContext,
    ) -> Result<bool, MessagingError>;

    fn name(&self) -> &str {
        "contributor"
    }
}

/// Ordering key: descending by sub-segment count, ties broken
/// lexicographically ascending — gives longest-prefix-first traversal via a
/// plain `BTreeMap` rather than a hand-rolled trie.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DescendingKey(Xri);

impl PartialOrd for DescendingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DescendingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        crate::xri::cmp_descending_by_length(&self.0, &other.0)
    }
}

/// Registered contributors, keyed by the address prefix they were mounted
/// under and visited longest-prefix-first.
#[derive(Default)]
pub struct ContributorMap {
    by_prefix: BTreeMap<DescendingKey, Vec<Arc<dyn Contributor>>>,
}

impl ContributorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, prefix: Xri, contributor: Arc<dyn Contributor>) -> Self {
        self.by_prefix
            .entry(DescendingKey(prefix))
            .or_default()
            .push(contributor);
        self
    }

    /// Prefixes registered in the map that are a prefix of `address`,
    /// longest first.
    fn matching_prefixes<'a>(&'a self, address: &'a Xri) -> impl Iterator<Item = &'a Xri> {
        self.by_prefix
            .keys()
            .map(|k| &k.0)
            .filter(move |prefix| address.starts_with(prefix, false, false).is_some())
    }

    /// The single longest registered prefix of `address` and the
    /// contributors mounted under it, cloning the `Arc` handles so a
    /// contributor registering new contributors mid-callback cannot
    /// invalidate the caller's iteration. `None` if nothing matches.
    fn longest_matching(&self, address: &Xri) -> Option<(Xri, Vec<Arc<dyn Contributor>>)> {
        let prefix = self.matching_prefixes(address).next()?.clone();
        let contributors = self.by_prefix.get(&DescendingKey(prefix.clone()))?.clone();
        Some((prefix, contributors))
    }

    /// Runs the contributor(s) registered under the single longest prefix
    /// of `address` that matches. A deferral (`Ok(false)`) from every
    /// contributor at that prefix falls through to the graph — the
    /// dispatcher never retries a shorter registered prefix; a contributor
    /// that wants that behavior has to perform the nested dispatch itself.
    pub fn execute_contributors_address(
        &self,
        address: &Xri,
        ctx: &mut ExecutionContext,
        trail: &[Xri],
    ) -> Result<bool, MessagingError> {
        let Some((prefix, contributors)) = self.longest_matching(address) else {
            return Ok(false);
        };
        let remainder = address.remove_start_xri(&prefix).unwrap_or_else(Xri::root);
        let mut nested_trail = trail.to_vec();
        nested_trail.push(prefix.clone());

        for contributor in &contributors {
            ctx.push_contributor(prefix.to_string());
            let handled = contributor.contribute_address(&remainder, &nested_trail, ctx);
            ctx.pop_contributor();
            if handled? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Same as [`Self::execute_contributors_address`] but for statements,
    /// keyed by `subject ++ object` for context-node statements and by
    /// `subject` alone for relation/literal statements — intentional, not a
    /// bug. The statement handed to the contributor is not trimmed, since a
    /// tripartite statement has no single remainder XRI to strip a mount
    /// prefix from.
    pub fn execute_contributors_statement(
        &self,
        statement: &Statement,
        ctx: &mut ExecutionContext,
        trail: &[Xri],
    ) -> Result<bool, MessagingError> {
        let key = statement_dispatch_key(statement);
        let Some((prefix, contributors)) = self.longest_matching(&key) else {
            return Ok(false);
        };
        let mut nested_trail = trail.to_vec();
        nested_trail.push(prefix.clone());

        for contributor in &contributors {
            ctx.push_contributor(prefix.to_string());
            let handled = contributor.contribute_statement(statement, &nested_trail, ctx);
            ctx.pop_contributor();
            if handled? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// The address a statement is dispatched under: `subject ++ object` for a
/// context-node declaration (the new node's full address is the relevant
/// key), `subject` alone for relations and literals.
fn statement_dispatch_key(statement: &Statement) -> Xri {
    match statement {
        Statement::ContextNode { subject, object } => subject.concat(object),
        Statement::Relation { subject, .. } | Statement::Literal { subject, .. } => subject.clone(),
    }
}

/// Falls back to the in-memory graph when no contributor handled the address.
pub fn fallback_to_graph(graph: &Graph, address: &Xri) -> bool {
    graph.find_context_node_readonly(address).is_some()
}
