#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Tests panic on failure by design.
mod tests {
    use std::sync::Arc;

    use xdi_messaging::context::{ExecutionContext, Scope};
    use xdi_messaging::contributor::{Contributor, ContributorMap};
    use xdi_messaging::dispatcher::MessagingTarget;
    use xdi_messaging::error::MessagingError;
    use xdi_messaging::graph::Graph;
    use xdi_messaging::interceptor::Interceptor;
    use xdi_messaging::xri::parse;
    use xdi_messaging::{Envelope, Message, Operation, OperationXri, Statement};

    // ==============================================================================
    // Test Helpers
    // ==============================================================================

    fn op(verb: &str, target: &str) -> Operation {
        Operation::new(OperationXri(parse(verb).expect("valid verb")), target)
    }

    fn set(sender: &str, address: &str, op_target: &str) -> Envelope {
        Envelope::new().with_message(
            Message::new(parse(sender).expect("valid sender"), parse(address).expect("valid address"))
                .with_operation(op("$set", op_target)),
        )
    }

    // ==============================================================================
    // S1 — basic set/get round trip
    // ==============================================================================

    #[test]
    fn set_then_get_returns_the_stored_literal() {
        let mut target = MessagingTarget::new();
        let mut ctx = ExecutionContext::new();

        target
            .execute(
                &Envelope::new().with_message(
                    Message::new(parse("=markus").unwrap(), parse("=markus+email").unwrap())
                        .with_operation(op("$set", "()/!/(markus.sabadello@gmail.com)")),
                ),
                &mut ctx,
            )
            .expect("set succeeds");

        let result = target
            .execute(
                &Envelope::new().with_message(
                    Message::new(parse("=markus").unwrap(), parse("=markus+email").unwrap())
                        .with_operation(op("$get", "()/!/(markus.sabadello@gmail.com)")),
                ),
                &mut ctx,
            )
            .expect("get succeeds");

        assert_eq!(result.all_statements().len(), 1);
    }

    // ==============================================================================
    // S2 — authentication gate
    // ==============================================================================

    #[test]
    fn auth_interceptor_rejects_messages_without_a_valid_token() {
        use xdi_messaging::auth::{SecretTokenAuthInterceptor, StaticSecretTokenAuthenticator};

        let mut target = MessagingTarget::new()
            .interceptor(Arc::new(SecretTokenAuthInterceptor::new(
                StaticSecretTokenAuthenticator::new("s3cr3t"),
            )));
        let mut ctx = ExecutionContext::new();

        let envelope = set("=markus", "=markus", "+email");
        let err = target.execute(&envelope, &mut ctx).unwrap_err();
        assert!(err.is_authentication_error());
    }

    #[test]
    fn auth_interceptor_admits_messages_with_a_valid_token() {
        use xdi_messaging::auth::{SecretTokenAuthInterceptor, StaticSecretTokenAuthenticator, SECRET_TOKEN_VALID_KEY};

        let mut target = MessagingTarget::new()
            .interceptor(Arc::new(SecretTokenAuthInterceptor::new(
                StaticSecretTokenAuthenticator::new("(s3cr3t)"),
            )));
        let mut ctx = ExecutionContext::new();

        let envelope = Envelope::new().with_message(
            Message::new(parse("=markus").unwrap(), parse("=markus").unwrap())
                .with_operation(op("$set", "()/$secret$token/(s3cr3t)"))
                .with_operation(op("$set", "+email")),
        );

        target.execute(&envelope, &mut ctx).expect("authenticated message succeeds");
        assert!(ctx.bool_attribute(Scope::Message, SECRET_TOKEN_VALID_KEY));
    }

    // ==============================================================================
    // S3 — contributor takes over an address prefix
    // ==============================================================================

    struct RecordingContributor {
        calls: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Contributor for RecordingContributor {
        fn contribute_address(
            &self,
            address: &xdi_messaging::Xri,
            _trail: &[xdi_messaging::Xri],
            _ctx: &mut ExecutionContext,
        ) -> Result<bool, MessagingError> {
            self.calls.lock().unwrap().push(address.to_string());
            Ok(true)
        }

        fn contribute_statement(
            &self,
            _statement: &Statement,
            _trail: &[xdi_messaging::Xri],
            _ctx: &mut ExecutionContext,
        ) -> Result<bool, MessagingError> {
            Ok(false)
        }
    }

    #[test]
    fn contributor_short_circuits_before_the_graph_handler() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let contributors = ContributorMap::new().with(
            parse("=markus").unwrap(),
            Arc::new(RecordingContributor { calls: calls.clone() }),
        );
        let mut target = MessagingTarget::new().contributors(contributors);
        let mut ctx = ExecutionContext::new();

        let envelope = set("=markus", "=markus", "+email");
        let result = target.execute(&envelope, &mut ctx).expect("dispatch succeeds");

        assert_eq!(*calls.lock().unwrap(), vec!["+email".to_owned()]);
        assert!(result.is_empty());
        assert!(target
            .graph_ref()
            .find_context_node_readonly(&parse("=markus+email").unwrap())
            .is_none());
    }

    // ==============================================================================
    // S4 — interceptor rejection skips the message but leaves the envelope intact
    // ==============================================================================

    struct RejectSender {
        blocked: String,
    }

    impl Interceptor for RejectSender {
        fn before_message(&self, message: &Message, _ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
            Ok(message.sender.to_string() != self.blocked)
        }
    }

    #[test]
    fn rejected_message_is_skipped_but_other_messages_still_run() {
        let mut target = MessagingTarget::new().interceptor(Arc::new(RejectSender {
            blocked: "=bob".to_owned(),
        }));
        let mut ctx = ExecutionContext::new();

        let envelope = Envelope::new()
            .with_message(
                Message::new(parse("=bob").unwrap(), parse("=bob").unwrap()).with_operation(op("$set", "+email")),
            )
            .with_message(
                Message::new(parse("=markus").unwrap(), parse("=markus").unwrap())
                    .with_operation(op("$set", "+email")),
            );

        let result = target.execute(&envelope, &mut ctx).expect("dispatch succeeds");
        assert!(result.is_empty());
        assert!(target
            .graph_ref()
            .find_context_node_readonly(&parse("=bob+email").unwrap())
            .is_none());
        assert!(target
            .graph_ref()
            .find_context_node_readonly(&parse("=markus+email").unwrap())
            .is_some());
    }

    // ==============================================================================
    // S5 — exception past the interceptor boundary is logged and swallowed
    // ==============================================================================

    struct FailingAfterHook;

    impl Interceptor for FailingAfterHook {
        fn after_message(&self, _message: &Message, _ctx: &mut ExecutionContext) -> Result<(), MessagingError> {
            Err(MessagingError::from(xdi_messaging::GraphError::CannotDeleteRoot))
        }
    }

    #[test]
    fn after_message_failure_does_not_abort_a_successful_operation() {
        let mut target = MessagingTarget::new().interceptor(Arc::new(FailingAfterHook));
        let mut ctx = ExecutionContext::new();

        let envelope = set("=markus", "=markus", "+email");
        let result = target.execute(&envelope, &mut ctx).expect("swallowed after-hook error");
        assert_eq!(result.len(), 1);
    }

    // ==============================================================================
    // S6 — copying a graph reproduces its statements in a second instance
    // ==============================================================================

    #[test]
    fn copy_graph_reproduces_every_statement_in_a_fresh_graph() {
        let mut source = Graph::new();
        source
            .assert_statement(&Statement::Literal {
                subject: parse("=markus+email").unwrap(),
                data: "markus.sabadello@gmail.com".to_owned(),
            })
            .unwrap();
        let a = source.find_context_node(&parse("=markus").unwrap());
        let b = source.find_context_node(&parse("=bob").unwrap());
        source.add_relation(a, parse("+friend").unwrap(), b).unwrap();

        let mut dest = Graph::new();
        xdi_messaging::graph::copy_graph(&source, &mut dest).expect("copy succeeds");

        let mut expected = source.statements();
        let mut actual = dest.statements();
        expected.sort_by_key(std::string::ToString::to_string);
        actual.sort_by_key(std::string::ToString::to_string);
        assert_eq!(expected, actual);
    }

    // ==============================================================================
    // S7 — target interceptor rewrites an address before the handler runs
    // ==============================================================================

    struct RewriteBobToAlice;

    impl Interceptor for RewriteBobToAlice {
        fn target_address(
            &self,
            _operation: &Operation,
            address: xdi_messaging::Xri,
            _ctx: &mut ExecutionContext,
        ) -> Result<Option<xdi_messaging::Xri>, MessagingError> {
            if address == parse("=bob").unwrap() {
                Ok(Some(parse("=alice").unwrap()))
            } else {
                Ok(Some(address))
            }
        }
    }

    #[test]
    fn target_interceptor_rewrites_bob_to_alice() {
        let mut target = MessagingTarget::new().interceptor(Arc::new(RewriteBobToAlice));
        let mut ctx = ExecutionContext::new();

        target
            .execute(&set("=markus", "=bob", "()"), &mut ctx)
            .expect("dispatch succeeds");

        assert!(target.graph_ref().find_context_node_readonly(&parse("=bob").unwrap()).is_none());
        assert!(target.graph_ref().find_context_node_readonly(&parse("=alice").unwrap()).is_some());
    }

    // ==============================================================================
    // S8 — a thrown error reaches every exception interceptor
    // ==============================================================================

    struct AlwaysFailBeforeEnvelope;

    impl Interceptor for AlwaysFailBeforeEnvelope {
        fn before_envelope(&self, _envelope: &Envelope, _ctx: &mut ExecutionContext) -> Result<bool, MessagingError> {
            Err(MessagingError::from(xdi_messaging::GraphError::CannotDeleteRoot))
        }
    }

    struct RecordingExceptionInterceptor {
        invoked: Arc<std::sync::atomic::AtomicBool>,
    }

    impl Interceptor for RecordingExceptionInterceptor {
        fn exception_envelope(
            &self,
            _envelope: &Envelope,
            _ctx: &mut ExecutionContext,
            _error: &MessagingError,
        ) -> Result<(), MessagingError> {
            self.invoked.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn exception_interceptor_runs_when_dispatch_fails() {
        let invoked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut target = MessagingTarget::new()
            .interceptor(Arc::new(AlwaysFailBeforeEnvelope))
            .interceptor(Arc::new(RecordingExceptionInterceptor { invoked: invoked.clone() }));
        let mut ctx = ExecutionContext::new();

        let err = target.execute(&set("=markus", "=markus", "+email"), &mut ctx).unwrap_err();
        assert!(!err.is_authentication_error());
        assert!(invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    // ==============================================================================
    // S9 — the result interceptor's finish hook sees the accumulated result once
    // ==============================================================================

    struct CountingFinish {
        calls: Arc<std::sync::atomic::AtomicUsize>,
        seen_len: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Interceptor for CountingFinish {
        fn finish(
            &self,
            result: &mut xdi_messaging::MessageResult,
            _ctx: &mut ExecutionContext,
        ) -> Result<(), MessagingError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.seen_len.store(result.len(), std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn finish_runs_once_over_the_whole_result() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_len = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut target = MessagingTarget::new().interceptor(Arc::new(CountingFinish {
            calls: calls.clone(),
            seen_len: seen_len.clone(),
        }));
        let mut ctx = ExecutionContext::new();

        let envelope = Envelope::new().with_message(
            Message::new(parse("=markus").unwrap(), parse("=markus").unwrap())
                .with_operation(op("$set", "+email"))
                .with_operation(op("$set", "+phone")),
        );
        target.execute(&envelope, &mut ctx).expect("dispatch succeeds");

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(seen_len.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    // ==============================================================================
    // Target lifecycle
    // ==============================================================================

    struct LifecycleInterceptor {
        init_calls: Arc<std::sync::atomic::AtomicUsize>,
        shutdown_calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Interceptor for LifecycleInterceptor {
        fn init(&self, _target: &str) -> Result<(), MessagingError> {
            self.init_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        fn shutdown(&self, _target: &str) -> Result<(), MessagingError> {
            self.shutdown_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn init_and_shutdown_reach_every_interceptor() {
        let init_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let shutdown_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let target = MessagingTarget::new().interceptor(Arc::new(LifecycleInterceptor {
            init_calls: init_calls.clone(),
            shutdown_calls: shutdown_calls.clone(),
        }));

        target.init("test-target").expect("init succeeds");
        target.shutdown("test-target");

        assert_eq!(init_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(shutdown_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    // ==============================================================================
    // Serialization
    // ==============================================================================

    #[test]
    fn xdi_json_round_trips_through_the_graph() {
        let mut target = MessagingTarget::new();
        let mut ctx = ExecutionContext::new();
        target
            .execute(
                &set("=markus", "=markus+email", "()/!/(markus.sabadello@gmail.com)"),
                &mut ctx,
            )
            .expect("set succeeds");

        let statements = target.graph_ref().statements();
        let json = xdi_messaging::serialize::to_xdi_json(&statements);
        assert!(json.get("=markus+email").is_some());
    }
}
