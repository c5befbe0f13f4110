// ==============================================================================
// Interceptor chain
// ==============================================================================
//
// Generalizes a `Layer`/`Service` wrapping style (one service wraps the
// next) into "run before/after hooks at each of five dispatch scopes around
// one shared call." Default methods are no-ops so an interceptor only
// overrides the capability it cares about.

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::graph::Statement;
use crate::message::{Envelope, Message, Operation};
use crate::result::MessageResult;
use crate::xri::Xri;

/// A hook invoked at up to eight points around dispatch, across six
/// capabilities: target lifecycle, envelope, message, operation, target
/// rewrite, and result. Each method's default implementation is a no-op
/// pass-through so an interceptor overrides only what it needs.
///
/// A `before_*` method returning `Ok(false)` short-circuits: the
/// corresponding scope is skipped (no body execution, `after_*` hooks at
/// that scope still run as dispatch unwinds).
pub trait Interceptor: Send + Sync {
    /// Called once when the owning `MessagingTarget` starts up.
    fn init(&self, _target: &str) -> Result<(), MessagingError> {
        Ok(())
    }

    /// Called once when the owning `MessagingTarget` is torn down. Failures
    /// are logged by the caller, not propagated — they must not prevent
    /// other interceptors' `shutdown` from running.
    fn shutdown(&self, _target: &str) -> Result<(), MessagingError> {
        Ok(())
    }

    fn before_envelope(&self, _envelope: &Envelope, _ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
        Ok(true)
    }

    fn after_envelope(&self, _envelope: &Envelope, _ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        Ok(())
    }

    /// Best-effort cleanup hook run for every registered envelope
    /// interceptor when dispatch fails anywhere below the envelope level.
    /// Its own errors are logged and swallowed by the caller — they must
    /// never mask the originating error.
    fn exception_envelope(
        &self,
        _envelope: &Envelope,
        _ctx: &mut ExecutionContext,
        _error: &MessagingError,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    fn before_message(&self, _message: &Message, _ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
        Ok(true)
    }

    fn after_message(&self, _message: &Message, _ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        Ok(())
    }

    fn before_operation(&self, _operation: &Operation, _ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
        Ok(true)
    }

    fn after_operation(&self, _operation: &Operation, _ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        Ok(())
    }

    /// Rewrites (or drops) an address-path target before contributors and
    /// the address handler see it. Returning `Ok(None)` drops the target:
    /// the operation completes with an empty result and no handler runs.
    fn target_address(
        &self,
        _operation: &Operation,
        address: Xri,
        _ctx: &mut ExecutionContext,
    ) -> Result<Option<Xri>, MessagingError> {
        Ok(Some(address))
    }

    /// Symmetric to [`Self::target_address`] for the statement path.
    fn target_statement(
        &self,
        _operation: &Operation,
        statement: Statement,
        _ctx: &mut ExecutionContext,
    ) -> Result<Option<Statement>, MessagingError> {
        Ok(Some(statement))
    }

    /// Runs once after the whole envelope has been dispatched, with the
    /// chance to inspect or transform the accumulated [`MessageResult`].
    fn finish(&self, _result: &mut MessageResult, _ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        Ok(())
    }

    /// A short label used on diagnostic/log output; defaults to the type name.
    fn name(&self) -> &str {
        "interceptor"
    }
}

/// An ordered list of interceptors, all run at every scope.
///
/// `before_*` hooks run head-to-tail and stop at the first `Ok(false)` or
/// error. `after_*` hooks also run head-to-tail — a deliberately-unusual
/// ordering relative to typical layered middleware, which reverses on the
/// way out.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<std::sync::Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, interceptor: std::sync::Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Runs `before_envelope` head-to-tail, stopping at the first `false`
    /// or error. Returns `true` if every interceptor allowed the envelope
    /// through.
    pub fn run_before_envelope(
        &self,
        envelope: &Envelope,
        ctx: &mut ExecutionContext,
    ) -> Result<bool, MessagingError> {
        for interceptor in &self.interceptors {
            if !interceptor.before_envelope(envelope, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn run_after_envelope(&self, envelope: &Envelope, ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        for interceptor in &self.interceptors {
            interceptor.after_envelope(envelope, ctx)?;
        }
        Ok(())
    }

    pub fn run_before_message(&self, message: &Message, ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
        for interceptor in &self.interceptors {
            if !interceptor.before_message(message, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn run_after_message(&self, message: &Message, ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        for interceptor in &self.interceptors {
            interceptor.after_message(message, ctx)?;
        }
        Ok(())
    }

    pub fn run_before_operation(
        &self,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<bool, MessagingError> {
        for interceptor in &self.interceptors {
            if !interceptor.before_operation(operation, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn run_after_operation(&self, operation: &Operation, ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        for interceptor in &self.interceptors {
            interceptor.after_operation(operation, ctx)?;
        }
        Ok(())
    }

    /// Runs `target_address` head-to-tail, each interceptor seeing the
    /// previous one's rewrite. Returns `Ok(None)` as soon as any interceptor
    /// drops the target.
    pub fn run_target_address(
        &self,
        operation: &Operation,
        mut address: Xri,
        ctx: &mut ExecutionContext,
    ) -> Result<Option<Xri>, MessagingError> {
        for interceptor in &self.interceptors {
            match interceptor.target_address(operation, address, ctx)? {
                Some(rewritten) => address = rewritten,
                None => return Ok(None),
            }
        }
        Ok(Some(address))
    }

    /// Symmetric to [`Self::run_target_address`] for the statement path.
    pub fn run_target_statement(
        &self,
        operation: &Operation,
        mut statement: Statement,
        ctx: &mut ExecutionContext,
    ) -> Result<Option<Statement>, MessagingError> {
        for interceptor in &self.interceptors {
            match interceptor.target_statement(operation, statement, ctx)? {
                Some(rewritten) => statement = rewritten,
                None => return Ok(None),
            }
        }
        Ok(Some(statement))
    }

    /// Runs `finish` head-to-tail over the accumulated result once, at the
    /// end of a successful (non-short-circuited) envelope dispatch.
    pub fn run_finish(&self, result: &mut MessageResult, ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
        for interceptor in &self.interceptors {
            interceptor.finish(result, ctx)?;
        }
        Ok(())
    }

    /// Broadcasts `exception_envelope` to every registered interceptor.
    /// Each interceptor's own failure is logged by the caller and does not
    /// stop the remaining interceptors from running.
    pub fn run_exception_envelope(&self, envelope: &Envelope, ctx: &mut ExecutionContext, error: &MessagingError) {
        for interceptor in &self.interceptors {
            if let Err(hook_err) = interceptor.exception_envelope(envelope, ctx, error) {
                tracing::warn!(
                    interceptor = interceptor.name(),
                    error = %hook_err,
                    "exception_envelope interceptor failed, swallowing"
                );
            }
        }
    }

    /// Calls `init` on every registered interceptor. Stops at the first
    /// failure, matching target-startup semantics where a failing
    /// interceptor should abort startup.
    pub fn run_init(&self, target: &str) -> Result<(), MessagingError> {
        for interceptor in &self.interceptors {
            interceptor.init(target)?;
        }
        Ok(())
    }

    /// Calls `shutdown` on every registered interceptor. Unlike `init`,
    /// failures are logged and do not prevent other interceptors' shutdown
    /// from running.
    pub fn run_shutdown(&self, target: &str) {
        for interceptor in &self.interceptors {
            if let Err(err) = interceptor.shutdown(target) {
                tracing::warn!(interceptor = interceptor.name(), error = %err, "shutdown interceptor failed, swallowing");
            }
        }
    }
}
