// ==============================================================================
// Execution context
// ==============================================================================
//
// A scoped attribute bag plus a diagnostic contributor-call stack, threaded
// through dispatch by `&mut` reference. Three scopes nest: operation
// attributes are cleared per-operation, message attributes per message, and
// envelope attributes live for the whole `execute()` call.

use std::collections::HashMap;

/// The three nesting levels an execution-context attribute can live at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Envelope,
    Message,
    Operation,
}

/// One entry on the diagnostic contributor stack, pushed before a
/// contributor callback runs and popped after it returns (on every exit
/// path, including an early error return).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContributorFrame {
    pub label: String,
}

/// Mutable state carried through one `execute()` call.
///
/// Attribute values are type-erased behind `Box<dyn Any>`-free storage: this
/// crate only ever stores `bool`/`String` flags on the context (the auth
/// flag, diagnostic counters), so a `HashMap<String, AttributeValue>` keyed
/// by scope is simpler than reaching for `Any` downcasting.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
}

#[derive(Default)]
pub struct ExecutionContext {
    envelope_attrs: HashMap<String, AttributeValue>,
    message_attrs: HashMap<String, AttributeValue>,
    operation_attrs: HashMap<String, AttributeValue>,
    contributor_stack: Vec<ContributorFrame>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn attrs_mut(&mut self, scope: Scope) -> &mut HashMap<String, AttributeValue> {
        match scope {
            Scope::Envelope => &mut self.envelope_attrs,
            Scope::Message => &mut self.message_attrs,
            Scope::Operation => &mut self.operation_attrs,
        }
    }

    fn attrs(&self, scope: Scope) -> &HashMap<String, AttributeValue> {
        match scope {
            Scope::Envelope => &self.envelope_attrs,
            Scope::Message => &self.message_attrs,
            Scope::Operation => &self.operation_attrs,
        }
    }

    pub fn put_attribute(&mut self, scope: Scope, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attrs_mut(scope).insert(key.into(), value.into());
    }

    #[must_use]
    pub fn attribute(&self, scope: Scope, key: &str) -> Option<&AttributeValue> {
        self.attrs(scope).get(key)
    }

    #[must_use]
    pub fn bool_attribute(&self, scope: Scope, key: &str) -> bool {
        matches!(self.attribute(scope, key), Some(AttributeValue::Bool(true)))
    }

    /// Clears attributes at `scope`, called by the dispatcher when leaving
    /// the corresponding loop iteration (per message, per operation).
    pub fn clear_scope(&mut self, scope: Scope) {
        self.attrs_mut(scope).clear();
    }

    pub fn push_contributor(&mut self, label: impl Into<String>) {
        self.contributor_stack.push(ContributorFrame { label: label.into() });
    }

    pub fn pop_contributor(&mut self) -> Option<ContributorFrame> {
        self.contributor_stack.pop()
    }

    #[must_use]
    pub fn contributor_stack(&self) -> &[ContributorFrame] {
        &self.contributor_stack
    }

    #[must_use]
    pub fn contributor_depth(&self) -> usize {
        self.contributor_stack.len()
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_scope_isolated() {
        let mut ctx = ExecutionContext::new();
        ctx.put_attribute(Scope::Message, "k", true);
        assert!(ctx.bool_attribute(Scope::Message, "k"));
        assert!(!ctx.bool_attribute(Scope::Operation, "k"));
    }

    #[test]
    fn clear_scope_only_clears_that_scope() {
        let mut ctx = ExecutionContext::new();
        ctx.put_attribute(Scope::Envelope, "e", true);
        ctx.put_attribute(Scope::Message, "m", true);
        ctx.clear_scope(Scope::Message);
        assert!(ctx.bool_attribute(Scope::Envelope, "e"));
        assert!(!ctx.bool_attribute(Scope::Message, "m"));
    }

    #[test]
    fn contributor_stack_push_pop_balances() {
        let mut ctx = ExecutionContext::new();
        ctx.push_contributor("=markus");
        ctx.push_contributor("+email");
        assert_eq!(ctx.contributor_depth(), 2);
        let popped = ctx.pop_contributor().unwrap();
        assert_eq!(popped.label, "+email");
        ctx.pop_contributor();
        assert_eq!(ctx.contributor_depth(), 0);
    }
}
