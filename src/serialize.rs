// ==============================================================================
// Serialization
// ==============================================================================
//
// Two writers: an XDI/JSON object form (via `serde_json`) and a plain
// `Display`-based XDI/text statement-per-line form, hand-written rather
// than built on a templating crate.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use crate::error::StatementParseError;
use crate::graph::{Statement, CONTEXT_NODE_PREDICATE};
use crate::message::parse_statement;
use crate::xri::Xri;

/// Renders `statements` as XDI/JSON: one top-level object keyed by subject
/// address, each value an object mapping predicate to an array of object
/// addresses (or, for a literal, the literal text under the reserved `!` key).
#[must_use]
pub fn to_xdi_json(statements: &[Statement]) -> Value {
    let mut root = Map::new();
    for statement in statements {
        match statement {
            Statement::ContextNode { subject, object } => {
                insert_arc(&mut root, subject, CONTEXT_NODE_PREDICATE, object.to_string());
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => {
                insert_arc(&mut root, subject, &predicate.to_string(), object.to_string());
            }
            Statement::Literal { subject, data } => {
                insert_arc(&mut root, subject, "!", data.clone());
            }
        }
    }
    Value::Object(root)
}

fn insert_arc(root: &mut Map<String, Value>, subject: &Xri, predicate: &str, value: String) {
    let entry = root
        .entry(subject.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(subject_map) = entry else {
        unreachable!("subject entries are always objects")
    };
    let arr = subject_map
        .entry(predicate.to_owned())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(values) = arr else {
        unreachable!("predicate entries are always arrays")
    };
    values.push(Value::String(value));
}

/// Renders `statements` as XDI/text: one `subject/predicate/object` line per
/// statement, in the order given.
#[must_use]
pub fn to_xdi_text(statements: &[Statement]) -> String {
    let mut out = String::new();
    for statement in statements {
        let _ = writeln!(out, "{statement}");
    }
    out
}

/// Parses XDI/text back into statements, one non-empty line at a time.
///
/// # Errors
///
/// Returns [`StatementParseError`] on the first line that does not split
/// into a valid `subject/predicate/object` form.
pub fn from_xdi_text(text: &str) -> Result<Vec<Statement>, StatementParseError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_statement_line)
        .collect()
}

fn parse_statement_line(line: &str) -> Result<Statement, StatementParseError> {
    let (subject, predicate, object) = parse_statement(line)?;
    let subject_xri = crate::xri::parse(&subject).map_err(|e| StatementParseError::new(line, e.to_string()))?;
    let object_xri = crate::xri::parse(&object).map_err(|e| StatementParseError::new(line, e.to_string()))?;

    if predicate == CONTEXT_NODE_PREDICATE {
        return Ok(Statement::ContextNode {
            subject: subject_xri,
            object: object_xri,
        });
    }
    if predicate == "!" {
        return Ok(Statement::Literal {
            subject: subject_xri,
            data: object.trim_matches('"').to_owned(),
        });
    }
    let predicate_xri = crate::xri::parse(&predicate).map_err(|e| StatementParseError::new(line, e.to_string()))?;
    Ok(Statement::Relation {
        subject: subject_xri,
        predicate: predicate_xri,
        object: object_xri,
    })
}
