//! Inbound WooCommerce webhooks for Shopino
//!
//! This crate authenticates, validates and routes the webhook deliveries a
//! WooCommerce store sends when orders, products and customers change.
//!
//! # Features
//!
//! - **Authentication**: HMAC-SHA256 over the raw body, compared in constant time
//! - **Topic allow-list**: only known `resource.action` topics are routed
//! - **Handshakes**: registration pings are acknowledged without routing
//! - **Handler queue**: routed events are processed off the request path
//!
//! # Example: Dispatching a delivery
//!
//! ```rust,no_run
//! use shopino_webhooks::{
//!     HandlerQueue, HandlerSet, InboundRequest, QueueConfig, TopicAllowList,
//!     WebhookDispatcher, WebhookReceiver, headers,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = Arc::new(HandlerQueue::start(HandlerSet::default(), QueueConfig::default()));
//!     let dispatcher = WebhookDispatcher::new(
//!         WebhookReceiver::new("your-secret-key"),
//!         TopicAllowList::default(),
//!         queue.clone(),
//!     );
//!
//!     let request = InboundRequest::new(r#"{"id": 42}"#)
//!         .with_header(headers::TOPIC, "order.created")
//!         .with_header(headers::SIGNATURE, "...");
//!
//!     let outcome = dispatcher.dispatch(&request);
//!     println!("{} {}", outcome.status(), outcome.body());
//!
//!     queue.shutdown().await;
//! }
//! ```
//!
//! # Example: Verifying a tag
//!
//! ```rust
//! use shopino_webhooks::WebhookSignature;
//!
//! let signature = WebhookSignature::new("your-secret-key");
//! let tag = signature.sign(b"{}").unwrap();
//! assert!(signature.verify(b"{}", &tag));
//! ```

mod config;
mod dispatcher;
mod error;
pub mod event;
mod queue;
mod receiver;
mod signature;
mod topic;

pub use config::{ReceiverConfig, ReceiverConfigBuilder, WOOCOMMERCE_SECRET_VAR};
pub use dispatcher::{Acknowledgement, DispatchOutcome, DispatchState, WebhookDispatcher};
pub use error::WebhookError;
pub use event::{BodyFormat, ResourceEvent, WebhookEvent, handshake_id, parse_body, resource_id};
pub use queue::{EventSink, HandlerQueue, HandlerSet, LoggingHandler, QueueConfig, ResourceHandler};
pub use receiver::{InboundRequest, WebhookReceiver};
pub use signature::{TagEncoding, WebhookSignature, headers, verify as hmac_verify};
pub use topic::{Action, Resource, Topic, TopicAllowList};

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;
