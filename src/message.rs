// ==============================================================================
// Message envelope
// ==============================================================================
//
// `Envelope` -> `Message`* -> `Operation`* nests a router-style match one
// level deeper: an envelope is a batch of messages from (possibly
// different) senders, each message a batch of operations against one
// target.

use std::fmt;

use crate::error::StatementParseError;
use crate::xri::Xri;

/// The operation verb, taken from the operation XRI's final sub-segment by
/// convention (`$get`, `$set`, `$del`, ...). Stored as free text rather than
/// a closed enum since handlers may define their own verbs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationXri(pub Xri);

impl fmt::Display for OperationXri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One unit of work: an operation XRI (the verb) applied to a `target`,
/// where `target` is either a plain address or a `subject/predicate/object`
/// statement segment.
#[derive(Clone, Debug)]
pub struct Operation {
    pub operation_xri: OperationXri,
    pub target: String,
}

impl Operation {
    #[must_use]
    pub fn new(operation_xri: OperationXri, target: impl Into<String>) -> Self {
        Self {
            operation_xri,
            target: target.into(),
        }
    }

    /// `true` if `target` is a `/`-separated three-part statement rather
    /// than a plain address.
    #[must_use]
    pub fn targets_statement(&self) -> bool {
        parse_statement(&self.target).is_ok()
    }
}

/// A batch of operations sent by `sender` against `target_address`.
#[derive(Clone, Debug)]
pub struct Message {
    pub sender: Xri,
    pub target_address: Xri,
    pub operations: Vec<Operation>,
}

impl Message {
    #[must_use]
    pub fn new(sender: Xri, target_address: Xri) -> Self {
        Self {
            sender,
            target_address,
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }
}

/// One or more messages submitted together to a single `MessagingTarget::execute` call.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    pub messages: Vec<Message>,
}

impl Envelope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// Splits `text` into `(subject, predicate, object)` on `/`, respecting
/// parenthesized data sub-segments that may themselves contain `/`.
///
/// # Errors
///
/// Returns [`StatementParseError`] if `text` does not split into exactly
/// three non-empty parts at paren-depth zero.
pub fn parse_statement(text: &str) -> Result<(String, String, String), StatementParseError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            '/' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);

    if depth != 0 {
        return Err(StatementParseError::new(text, "unbalanced parentheses"));
    }
    if parts.len() != 3 || parts.iter().any(String::is_empty) {
        return Err(StatementParseError::new(
            text,
            "expected exactly three non-empty `/`-separated parts",
        ));
    }

    match <[String; 3]>::try_from(parts) {
        Ok([subject, predicate, object]) => Ok((subject, predicate, object)),
        Err(_) => Err(StatementParseError::new(text, "expected exactly three non-empty `/`-separated parts")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_statement_splits_three_parts() {
        let (s, p, o) = parse_statement("=markus/+friend/=bob").unwrap();
        assert_eq!(s, "=markus");
        assert_eq!(p, "+friend");
        assert_eq!(o, "=bob");
    }

    #[test]
    fn parse_statement_respects_parens() {
        let (s, p, o) = parse_statement("=markus+email/!/(data:,a/b)").unwrap();
        assert_eq!(s, "=markus+email");
        assert_eq!(p, "!");
        assert_eq!(o, "(data:,a/b)");
    }

    #[test]
    fn parse_statement_rejects_plain_address() {
        assert!(parse_statement("=markus+email").is_err());
    }

    #[test]
    fn operation_targets_statement_detects_three_part_form() {
        let op = Operation::new(
            OperationXri(crate::xri::parse("$get").unwrap()),
            "=markus/+friend/=bob",
        );
        assert!(op.targets_statement());

        let op = Operation::new(OperationXri(crate::xri::parse("$get").unwrap()), "=markus");
        assert!(!op.targets_statement());
    }
}
