//! # `xdi-messaging`
//!
//! A hierarchical-address message-execution pipeline. An [`Envelope`] of
//! [`Message`]s, each a batch of [`Operation`]s against one target address,
//! is run through an [`InterceptorChain`] and a [`ContributorMap`] before
//! falling through to a backing [`Graph`] via the [`AddressHandler`]/
//! [`StatementHandler`] surface:
//!
//! ```rust
//! use xdi_messaging::{context::ExecutionContext, dispatcher::MessagingTarget, Envelope, Message, Operation, OperationXri};
//!
//! let mut target = MessagingTarget::new();
//! let mut ctx = ExecutionContext::new();
//!
//! let envelope = Envelope::new().with_message(
//!     Message::new("=markus".parse().unwrap(), "=markus".parse().unwrap())
//!         .with_operation(Operation::new(OperationXri("$set".parse().unwrap()), "+email")),
//! );
//!
//! target.execute(&envelope, &mut ctx).expect("set succeeds");
//! ```
//!
//! Addresses are [`Xri`]s, a hierarchical identifier format with class-symbol,
//! data, and variable sub-segments.

pub mod auth;
pub mod context;
pub mod contributor;
pub mod dispatcher;
pub mod error;
pub mod graph;
pub mod handler;
pub mod interceptor;
pub mod message;
pub mod result;
pub mod serialize;
pub mod xri;

pub use error::{AuthenticationError, GraphError, MessagingError, ParseError, StatementParseError};
pub use graph::{Graph, Statement};
pub use message::{Envelope, Message, Operation, OperationXri};
pub use result::{MessageResult, OperationResult};
pub use xri::{SubSegment, Xri};
