// ==============================================================================
// Authentication collaborator
// ==============================================================================
//
// An illustrative secret-token authenticator plus the interceptor that
// wires it into the pipeline. The auth outcome is recorded as a
// message-scope execution-context attribute
// (`ctx.put_attribute(Scope::Message, SECRET_TOKEN_VALID_KEY, ...)`) rather
// than by mutating the envelope in place, so `Interceptor::before_message`
// keeps taking `&Message` rather than `&mut Message`.

use crate::context::{ExecutionContext, Scope};
use crate::error::{AuthenticationError, MessagingError};
use crate::interceptor::Interceptor;
use crate::message::Message;

/// The execution-context key an auth interceptor records its verdict under.
pub const SECRET_TOKEN_VALID_KEY: &str = "$secret$token$valid";

/// Verifies a bearer-style credential carried on a message's link contract
/// (a `<$secret><$token>` statement).
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, sender: &str, token: Option<&str>) -> Result<(), AuthenticationError>;

    /// Called once when the owning interceptor's target starts up, e.g. to
    /// open a connection to a credential store. Default: no-op.
    fn init(&self) -> Result<(), AuthenticationError> {
        Ok(())
    }

    /// Called once when the owning interceptor's target is torn down.
    /// Default: no-op.
    fn shutdown(&self) {}
}

/// Checks a token against one fixed expected value. A stand-in for a real
/// credential store — illustrative, not production-grade.
pub struct StaticSecretTokenAuthenticator {
    expected_token: String,
}

impl StaticSecretTokenAuthenticator {
    #[must_use]
    pub fn new(expected_token: impl Into<String>) -> Self {
        Self {
            expected_token: expected_token.into(),
        }
    }
}

impl Authenticator for StaticSecretTokenAuthenticator {
    fn authenticate(&self, sender: &str, token: Option<&str>) -> Result<(), AuthenticationError> {
        match token {
            Some(token) if token == self.expected_token => Ok(()),
            Some(_) => Err(AuthenticationError::new(format!("token rejected for `{sender}`"))),
            None => Err(AuthenticationError::new(format!("no token presented by `{sender}`"))),
        }
    }
}

/// Wires an [`Authenticator`] into the interceptor chain at message scope.
///
/// The token is read from the message's first `$secret$token` literal
/// operation target, following the `subject/predicate/object` convention.
/// A message carrying no such operation authenticates with `token = None`.
pub struct SecretTokenAuthInterceptor<A> {
    authenticator: A,
}

impl<A: Authenticator> SecretTokenAuthInterceptor<A> {
    #[must_use]
    pub fn new(authenticator: A) -> Self {
        Self { authenticator }
    }

    fn extract_token(&self, message: &Message) -> Option<String> {
        message.operations.iter().find_map(|op| {
            let (_, predicate, object) = crate::message::parse_statement(&op.target).ok()?;
            (predicate == "$secret$token").then_some(object)
        })
    }
}

impl<A: Authenticator + Send + Sync> Interceptor for SecretTokenAuthInterceptor<A> {
    fn before_message(&self, message: &Message, ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
        let token = self.extract_token(message);
        match self.authenticator.authenticate(&message.sender.to_string(), token.as_deref()) {
            Ok(()) => {
                ctx.put_attribute(Scope::Message, SECRET_TOKEN_VALID_KEY, true);
                Ok(true)
            }
            Err(err) => Err(MessagingError::from(err)),
        }
    }

    fn name(&self) -> &str {
        "secret-token-auth"
    }

    fn init(&self, _target: &str) -> Result<(), MessagingError> {
        self.authenticator.init().map_err(MessagingError::from)
    }

    fn shutdown(&self, _target: &str) -> Result<(), MessagingError> {
        self.authenticator.shutdown();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::{Operation, OperationXri};
    use crate::xri::parse;

    fn message_with_token(token: Option<&str>) -> Message {
        let mut message = Message::new(parse("=markus").unwrap(), parse("=bob").unwrap());
        if let Some(token) = token {
            message = message.with_operation(Operation::new(
                OperationXri(parse("$set").unwrap()),
                format!("=markus/$secret$token/{token}"),
            ));
        }
        message
    }

    #[test]
    fn valid_token_marks_context_attribute() {
        let interceptor = SecretTokenAuthInterceptor::new(StaticSecretTokenAuthenticator::new("s3cr3t"));
        let mut ctx = ExecutionContext::new();
        let message = message_with_token(Some("s3cr3t"));
        let allowed = interceptor.before_message(&message, &mut ctx).unwrap();
        assert!(allowed);
        assert!(ctx.bool_attribute(Scope::Message, SECRET_TOKEN_VALID_KEY));
    }

    #[test]
    fn invalid_token_errors_as_authentication_error() {
        let interceptor = SecretTokenAuthInterceptor::new(StaticSecretTokenAuthenticator::new("s3cr3t"));
        let mut ctx = ExecutionContext::new();
        let message = message_with_token(Some("wrong"));
        let err = interceptor.before_message(&message, &mut ctx).unwrap_err();
        assert!(err.is_authentication_error());
    }

    #[test]
    fn missing_token_errors() {
        let interceptor = SecretTokenAuthInterceptor::new(StaticSecretTokenAuthenticator::new("s3cr3t"));
        let mut ctx = ExecutionContext::new();
        let message = message_with_token(None);
        assert!(interceptor.before_message(&message, &mut ctx).is_err());
    }
}
