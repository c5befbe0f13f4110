// ==============================================================================
// Dispatcher
// ==============================================================================
//
// `MessagingTarget` is a consuming builder (`graph`/`contributor`/
// `interceptor`/`address_handler`/`statement_handler`, each `#[must_use]`
// and returning `Self`) that produces one object whose `execute` method
// looks up how to handle the thing, forwards to it, and logs and swallows
// exceptions that occur past the point where a response has already
// started forming.

use tracing::{debug, warn};

use crate::context::{ExecutionContext, Scope};
use crate::contributor::ContributorMap;
use crate::error::MessagingError;
use crate::graph::{Graph, Statement};
use crate::handler::{AddressHandler, DefaultAddressHandler, DefaultStatementHandler, StatementHandler};
use crate::interceptor::InterceptorChain;
use crate::message::{parse_statement, Envelope, Message, Operation};
use crate::result::{MessageResult, OperationResult};
use crate::xri::Xri;

/// The dispatch entry point: owns the backing graph, the contributor map,
/// the interceptor chain, and the address/statement handler pair that
/// fields anything contributors defer on.
pub struct MessagingTarget {
    graph: Graph,
    contributors: ContributorMap,
    interceptors: InterceptorChain,
    address_handler: Box<dyn AddressHandler>,
    statement_handler: Box<dyn StatementHandler>,
}

impl Default for MessagingTarget {
    fn default() -> Self {
        Self {
            graph: Graph::new(),
            contributors: ContributorMap::new(),
            interceptors: InterceptorChain::new(),
            address_handler: Box::new(DefaultAddressHandler),
            statement_handler: Box::new(DefaultStatementHandler),
        }
    }
}

impl MessagingTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn graph(mut self, graph: Graph) -> Self {
        self.graph = graph;
        self
    }

    #[must_use]
    pub fn contributors(mut self, contributors: ContributorMap) -> Self {
        self.contributors = contributors;
        self
    }

    #[must_use]
    pub fn interceptor(mut self, interceptor: std::sync::Arc<dyn crate::interceptor::Interceptor>) -> Self {
        self.interceptors = std::mem::take(&mut self.interceptors).with(interceptor);
        self
    }

    #[must_use]
    pub fn address_handler(mut self, handler: impl AddressHandler + 'static) -> Self {
        self.address_handler = Box::new(handler);
        self
    }

    #[must_use]
    pub fn statement_handler(mut self, handler: impl StatementHandler + 'static) -> Self {
        self.statement_handler = Box::new(handler);
        self
    }

    #[must_use]
    pub fn graph_ref(&self) -> &Graph {
        &self.graph
    }

    /// Starts up this target: calls `init` on every registered interceptor,
    /// in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Propagates the first interceptor's `init` failure.
    pub fn init(&self, target: &str) -> Result<(), MessagingError> {
        self.interceptors.run_init(target)
    }

    /// Tears down this target: calls `shutdown` on every registered
    /// interceptor. A failing interceptor is logged but does not prevent
    /// the others from running.
    pub fn shutdown(&self, target: &str) {
        self.interceptors.run_shutdown(target);
    }

    /// Runs `envelope` through the full pipeline: envelope interceptors,
    /// then per-message interceptors and per-operation interceptors and
    /// dispatch, in that nesting order.
    ///
    /// # Errors
    ///
    /// Returns the first [`MessagingError`] raised by an interceptor or a
    /// handler that is not itself an exception-interceptor failure (those
    /// are logged and swallowed).
    pub fn execute(&mut self, envelope: &Envelope, ctx: &mut ExecutionContext) -> Result<MessageResult, MessagingError> {
        ctx.clear_scope(Scope::Envelope);
        let mut result = MessageResult::new();

        match self.interceptors.run_before_envelope(envelope, ctx) {
            Ok(true) => {}
            Ok(false) => {
                debug!("envelope rejected by a before_envelope interceptor");
                return Ok(result);
            }
            Err(err) => {
                self.interceptors.run_exception_envelope(envelope, ctx, &err);
                return Err(err);
            }
        }

        let outcome = self.execute_messages(envelope, &mut result, ctx);

        if let Err(err) = outcome {
            self.interceptors.run_exception_envelope(envelope, ctx, &err);
            return Err(err);
        }

        if let Err(err) = self.interceptors.run_after_envelope(envelope, ctx) {
            warn!(error = %err, "after_envelope interceptor failed, swallowing");
        }

        self.interceptors.run_finish(&mut result, ctx)?;
        Ok(result)
    }

    fn execute_messages(
        &mut self,
        envelope: &Envelope,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        for message in &envelope.messages {
            ctx.clear_scope(Scope::Message);

            if !self.interceptors.run_before_message(message, ctx)? {
                debug!(sender = %message.sender, "message rejected by a before_message interceptor");
                continue;
            }

            let outcome = self.execute_operations(message, result, ctx);
            outcome?;

            if let Err(err) = self.interceptors.run_after_message(message, ctx) {
                warn!(error = %err, "after_message interceptor failed, swallowing");
            }
        }
        Ok(())
    }

    fn execute_operations(
        &mut self,
        message: &Message,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        for operation in &message.operations {
            ctx.clear_scope(Scope::Operation);

            if !self
                .interceptors
                .run_before_operation(operation, ctx)
                .map_err(|e| e.with_operation(operation.clone()))?
            {
                debug!(target = %operation.target, "operation rejected by a before_operation interceptor");
                continue;
            }

            let outcome = self.execute_operation(message, operation, ctx);

            let operation_result = match outcome {
                Ok(operation_result) => operation_result,
                Err(err) => return Err(err.with_operation(operation.clone())),
            };

            if let Err(err) = self.interceptors.run_after_operation(operation, ctx) {
                warn!(error = %err, "after_operation interceptor failed, swallowing");
            }

            result.push(operation_result);
        }
        Ok(())
    }

    fn execute_operation(
        &mut self,
        message: &Message,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError> {
        if let Ok((subject, predicate, object)) = parse_statement(&operation.target) {
            let statement = resolve_statement(&message.target_address, &subject, &predicate, &object)?;
            self.execute_statement_path(operation, &statement, ctx)
        } else {
            let address = message.target_address.concat(&crate::xri::parse(&operation.target)?);
            self.execute_address_path(operation, &address, ctx)
        }
    }

    fn execute_address_path(
        &mut self,
        operation: &Operation,
        address: &Xri,
        ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError> {
        let Some(address) = self.interceptors.run_target_address(operation, address.clone(), ctx)? else {
            debug!(target = %address, "address target dropped by a target interceptor");
            return Ok(OperationResult::Empty);
        };

        if self.contributors.execute_contributors_address(&address, ctx, &[])? {
            return Ok(OperationResult::Empty);
        }

        self.address_handler.handle_address(operation, &address, &mut self.graph, ctx)
    }

    fn execute_statement_path(
        &mut self,
        operation: &Operation,
        statement: &Statement,
        ctx: &mut ExecutionContext,
    ) -> Result<OperationResult, MessagingError> {
        let Some(statement) = self
            .interceptors
            .run_target_statement(operation, statement.clone(), ctx)?
        else {
            debug!("statement target dropped by a target interceptor");
            return Ok(OperationResult::Empty);
        };

        if self.contributors.execute_contributors_statement(&statement, ctx, &[])? {
            return Ok(OperationResult::Empty);
        }

        self.statement_handler.handle_statement(operation, &statement, &mut self.graph, ctx)
    }
}

fn resolve_statement(
    target_address: &Xri,
    subject: &str,
    predicate: &str,
    object: &str,
) -> Result<Statement, MessagingError> {
    let subject_xri = target_address.concat(&crate::xri::parse(subject)?);
    let object_xri = crate::xri::parse(object)?;

    if predicate == crate::graph::CONTEXT_NODE_PREDICATE {
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
    Ok(Statement::Relation {
        subject: subject_xri,
        predicate: crate::xri::parse(predicate)?,
        object: object_xri,
    })
}
