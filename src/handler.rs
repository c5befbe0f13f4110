// ==============================================================================
// Handler surface
// ==============================================================================
//
// The plug-in boundary a dispatcher ultimately calls into once contributors
// have deferred and an address (or statement) has fallen through to the
// backing graph — analogous to the handler a matched route forwards a
// request to.

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::graph::{Graph, Statement};
use crate::message::Operation;
use crate::result::OperationResult;
use crate::xri::Xri;

/// Handles an operation whose target is a plain address.
pub trait AddressHandler: Send + Sync {
    fn handle_address(
        &self,
        operation: &Operation,
        address: &Xri,
        graph: &mut Graph,
        ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError>;
}

/// Handles an operation whose target is a `subject/predicate/object` statement.
pub trait StatementHandler: Send + Sync {
    fn handle_statement(
        &self,
        operation: &Operation,
        statement: &Statement,
        graph: &mut Graph,
        ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError>;
}

/// `$get`/`$set`/`$del` against the dispatcher's backing graph: the
/// built-in handler used whenever no more specific one is registered.
pub struct DefaultAddressHandler;

impl AddressHandler for DefaultAddressHandler {
    fn handle_address(
        &self,
        operation: &Operation,
        address: &Xri,
        graph: &mut Graph,
        _ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError> {
        match operation.operation_xri.0.to_string().as_str() {
            "$get" => {
                let statements = graph
                    .find_context_node_readonly(address)
                    .map(|id| graph.statements_under(id))
                    .unwrap_or_default();
                Ok(OperationResult::Statements(statements))
            }
            "$del" => {
                if let Some(id) = graph.find_context_node_readonly(address) {
                    graph.delete_context_node(id)?;
                }
                Ok(OperationResult::Empty)
            }
            _ => {
                graph.find_context_node(address);
                Ok(OperationResult::Empty)
            }
        }
    }
}

pub struct DefaultStatementHandler;

impl StatementHandler for DefaultStatementHandler {
    fn handle_statement(
        &self,
        operation: &Operation,
        statement: &Statement,
        graph: &mut Graph,
        _ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError> {
        match operation.operation_xri.0.to_string().as_str() {
            "$get" => {
                if graph.contains_statement(statement) {
                    Ok(OperationResult::Statements(vec![statement.clone()]))
                } else {
                    Ok(OperationResult::Statements(Vec::new()))
                }
            }
            "$del" => {
                graph.remove_statement(statement);
                Ok(OperationResult::Empty)
            }
            _ => {
                graph.assert_statement(statement)?;
                Ok(OperationResult::Empty)
            }
        }
    }
}
