// ==============================================================================
// Error types
// ==============================================================================
//
// Hand-rolled error enums with manual `Display`/`Error` impls rather than
// reaching for `thiserror`.

use std::fmt;

use crate::message::Operation;

/// Raised by the identifier parser on malformed XRI text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An unexpected character was found outside any recognized sub-segment form.
    UnexpectedChar { text: String, ch: char },
    /// A `(` literal data sub-segment was never closed.
    UnclosedParen { text: String },
    /// A `{` variable sub-segment was never closed.
    UnclosedVariable { text: String },
    /// The input was empty where a non-root identifier was required.
    Empty,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { text, ch } => {
                write!(f, "unexpected character `{ch}` in XRI `{text}`")
            }
            Self::UnclosedParen { text } => write!(f, "unclosed `(` in XRI `{text}`"),
            Self::UnclosedVariable { text } => write!(f, "unclosed `{{` in XRI `{text}`"),
            Self::Empty => write!(f, "empty XRI text"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Raised when an operation target's text cannot be parsed as a
/// `subject/predicate/object` statement; the dispatcher falls back to
/// treating the target as a plain address on this error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementParseError {
    text: String,
    reason: String,
}

impl StatementParseError {
    pub(crate) fn new(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StatementParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is not a statement segment: {}",
            self.text, self.reason
        )
    }
}

impl std::error::Error for StatementParseError {}

/// Raised by the graph backend on a structural conflict (e.g. a relation
/// re-created with a conflicting target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateRelation {
        source: String,
        arc: String,
        existing_target: String,
        new_target: String,
    },
    CannotDeleteRoot,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRelation {
                source,
                arc,
                existing_target,
                new_target,
            } => write!(
                f,
                "context node `{source}` already has a `{arc}` relation to `{existing_target}`, \
                 cannot also point it to `{new_target}`"
            ),
            Self::CannotDeleteRoot => write!(f, "the root context node cannot be deleted"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Signalled by authentication collaborators on a failed credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationError {
    reason: String,
}

impl AuthenticationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed: {}", self.reason)
    }
}

impl std::error::Error for AuthenticationError {}

/// The universal error wrapper returned from `MessagingTarget::execute`.
///
/// Carries an optional reference to the offending operation (attached as the
/// error unwinds past the operation loop) and the underlying cause.
#[derive(Debug)]
pub struct MessagingError {
    pub operation: Option<Operation>,
    pub kind: MessagingErrorKind,
}

#[derive(Debug)]
pub enum MessagingErrorKind {
    Authentication(AuthenticationError),
    Graph(GraphError),
    Parse(ParseError),
    Statement(StatementParseError),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl MessagingError {
    pub fn other(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            operation: None,
            kind: MessagingErrorKind::Other(Box::new(source)),
        }
    }

    /// Attaches the offending operation, if none is already attached.
    ///
    /// The dispatcher calls this once, at the innermost point where the
    /// failing operation is known; an error re-wrapped further up the call
    /// stack keeps the first (most specific) operation it was given.
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        if self.operation.is_none() {
            self.operation = Some(operation);
        }
        self
    }

    #[must_use]
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self.kind, MessagingErrorKind::Authentication(_))
    }
}

impl fmt::Display for MessagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Some(op) => write!(
                f,
                "messaging error executing `{}` on `{}`: {}",
                op.operation_xri, op.target, self.kind
            ),
            None => write!(f, "messaging error: {}", self.kind),
        }
    }
}

impl fmt::Display for MessagingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(e) => e.fmt(f),
            Self::Graph(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
            Self::Statement(e) => e.fmt(f),
            Self::Other(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for MessagingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            MessagingErrorKind::Authentication(e) => Some(e),
            MessagingErrorKind::Graph(e) => Some(e),
            MessagingErrorKind::Parse(e) => Some(e),
            MessagingErrorKind::Statement(e) => Some(e),
            MessagingErrorKind::Other(e) => Some(e.as_ref()),
        }
    }
}

impl From<GraphError> for MessagingError {
    fn from(source: GraphError) -> Self {
        Self {
            operation: None,
            kind: MessagingErrorKind::Graph(source),
        }
    }
}

impl From<ParseError> for MessagingError {
    fn from(source: ParseError) -> Self {
        Self {
            operation: None,
            kind: MessagingErrorKind::Parse(source),
        }
    }
}

impl From<StatementParseError> for MessagingError {
    fn from(source: StatementParseError) -> Self {
        Self {
            operation: None,
            kind: MessagingErrorKind::Statement(source),
        }
    }
}

impl From<AuthenticationError> for MessagingError {
    fn from(source: AuthenticationError) -> Self {
        Self {
            operation: None,
            kind: MessagingErrorKind::Authentication(source),
        }
    }
}
