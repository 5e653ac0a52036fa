//! Webhook dispatch state machine
//!
//! A delivery moves through
//! `Received -> Authenticated -> TopicValidated -> Routed -> Acknowledged`
//! and can be rejected at any gate. Registration pings short-circuit from
//! `Authenticated` straight to `Acknowledged`.

use crate::{
    BodyFormat, EventSink, InboundRequest, ReceiverConfig, Result, TopicAllowList, WebhookError,
    WebhookEvent, WebhookReceiver, event, headers,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where a delivery is in the dispatch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Authenticated,
    TopicValidated,
    Routed,
    Acknowledged,
    Rejected,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Received => "received",
            DispatchState::Authenticated => "authenticated",
            DispatchState::TopicValidated => "topic_validated",
            DispatchState::Routed => "routed",
            DispatchState::Acknowledged => "acknowledged",
            DispatchState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// What kind of delivery was acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Registration ping for the given webhook id
    Handshake { webhook_id: String },
    /// Business event handed to the sink
    Event { topic: String, resource_id: Option<u64> },
}

/// Final result of dispatching one delivery, ready to turn into a response.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Acknowledged {
        delivery_id: String,
        ack: Acknowledgement,
        body: Value,
    },
    Rejected {
        delivery_id: String,
        status: u16,
        code: &'static str,
        /// Last state reached before the rejection
        reached: DispatchState,
        body: Value,
    },
}

impl DispatchOutcome {
    fn rejected(delivery_id: String, reached: DispatchState, err: &WebhookError) -> Self {
        DispatchOutcome::Rejected {
            delivery_id,
            status: err.status_code(),
            code: err.code(),
            reached,
            body: json!({
                "status": "error",
                "code": err.code(),
                "error": err.public_message(),
            }),
        }
    }

    /// HTTP status to answer with.
    pub fn status(&self) -> u16 {
        match self {
            DispatchOutcome::Acknowledged { .. } => 200,
            DispatchOutcome::Rejected { status, .. } => *status,
        }
    }

    /// JSON response body.
    pub fn body(&self) -> &Value {
        match self {
            DispatchOutcome::Acknowledged { body, .. } | DispatchOutcome::Rejected { body, .. } => {
                body
            }
        }
    }

    pub fn delivery_id(&self) -> &str {
        match self {
            DispatchOutcome::Acknowledged { delivery_id, .. }
            | DispatchOutcome::Rejected { delivery_id, .. } => delivery_id,
        }
    }

    /// Terminal state of the delivery.
    pub fn state(&self) -> DispatchState {
        match self {
            DispatchOutcome::Acknowledged { .. } => DispatchState::Acknowledged,
            DispatchOutcome::Rejected { .. } => DispatchState::Rejected,
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self, DispatchOutcome::Acknowledged { .. })
    }

    /// Rejection code, if rejected.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DispatchOutcome::Acknowledged { .. } => None,
            DispatchOutcome::Rejected { code, .. } => Some(*code),
        }
    }
}

/// Authenticates, validates and routes webhook deliveries.
///
/// Cheap to clone; every clone shares the same secret, allow-list and sink.
#[derive(Clone)]
pub struct WebhookDispatcher {
    receiver: WebhookReceiver,
    allow_list: TopicAllowList,
    sink: Arc<dyn EventSink>,
    topic_header: Arc<str>,
    delivery_header: Arc<str>,
}

impl fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("receiver", &self.receiver)
            .field("allow_list", &self.allow_list.topics())
            .field("topic_header", &self.topic_header)
            .field("delivery_header", &self.delivery_header)
            .finish_non_exhaustive()
    }
}

impl WebhookDispatcher {
    pub fn new(
        receiver: WebhookReceiver,
        allow_list: TopicAllowList,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            receiver,
            allow_list,
            sink,
            topic_header: Arc::from(headers::TOPIC),
            delivery_header: Arc::from(headers::DELIVERY_ID),
        }
    }

    /// Build a dispatcher from receiver settings.
    pub fn from_config(config: &ReceiverConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let receiver = match &config.secret {
            Some(secret) => WebhookReceiver::new(secret),
            None => WebhookReceiver::without_secret(),
        }
        .with_encoding(config.tag_encoding)
        .with_signature_header(config.signature_header.clone());

        Ok(Self::new(receiver, config.allow_list()?, sink)
            .with_topic_header(config.topic_header.as_str())
            .with_delivery_header(config.delivery_header.as_str()))
    }

    pub fn with_topic_header(mut self, header: &str) -> Self {
        self.topic_header = Arc::from(header);
        self
    }

    pub fn with_delivery_header(mut self, header: &str) -> Self {
        self.delivery_header = Arc::from(header);
        self
    }

    pub fn allow_list(&self) -> &TopicAllowList {
        &self.allow_list
    }

    /// Run one delivery through the pipeline.
    ///
    /// Never blocks: the event is handed to the sink and acknowledged as soon
    /// as the sink accepts it. Rejection bodies never carry internal detail;
    /// that is logged instead.
    pub fn dispatch(&self, request: &InboundRequest) -> DispatchOutcome {
        let delivery_id = request
            .header_trimmed(&self.delivery_header)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut state = DispatchState::Received;
        match self.advance(request, &delivery_id, &mut state) {
            Ok(ack) => {
                let body = match &ack {
                    Acknowledgement::Handshake { webhook_id } => json!({
                        "status": "success",
                        "message": format!("Webhook {} initialized successfully", webhook_id),
                    }),
                    Acknowledgement::Event { topic, .. } => json!({
                        "status": "success",
                        "message": format!("Webhook {} processed successfully", topic),
                        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    }),
                };
                debug!(delivery_id = %delivery_id, from = %state, "webhook acknowledged");
                DispatchOutcome::Acknowledged {
                    delivery_id,
                    ack,
                    body,
                }
            }
            Err(err) => {
                if err.status_code() >= 500 {
                    error!(
                        delivery_id = %delivery_id,
                        state = %state,
                        error = %err,
                        "webhook dispatch failed"
                    );
                } else {
                    warn!(
                        delivery_id = %delivery_id,
                        state = %state,
                        code = err.code(),
                        error = %err,
                        "webhook rejected"
                    );
                }
                DispatchOutcome::rejected(delivery_id, state, &err)
            }
        }
    }

    fn advance(
        &self,
        request: &InboundRequest,
        delivery_id: &str,
        state: &mut DispatchState,
    ) -> Result<Acknowledgement> {
        self.receiver.authenticate(request)?;
        *state = DispatchState::Authenticated;

        let format = BodyFormat::from_content_type(request.header(headers::CONTENT_TYPE));
        let data = event::parse_body(request.body(), format)?;

        if let Some(webhook_id) = event::handshake_id(&data)? {
            info!(delivery_id = %delivery_id, webhook_id = %webhook_id, "webhook handshake received");
            return Ok(Acknowledgement::Handshake { webhook_id });
        }

        let raw_topic = request.header_trimmed(&self.topic_header).unwrap_or("");
        let topic = self
            .allow_list
            .resolve(raw_topic)
            .ok_or_else(|| WebhookError::InvalidTopic(raw_topic.to_string()))?;
        *state = DispatchState::TopicValidated;

        let event = WebhookEvent::from_parts(topic, data, request.body().to_vec(), delivery_id)?;
        let resource_id = event.resource_event().and_then(|e| e.resource_id);
        *state = DispatchState::Routed;

        self.sink.submit(event)?;
        info!(
            delivery_id = %delivery_id,
            topic = %topic,
            resource_id = ?resource_id,
            "webhook routed"
        );

        Ok(Acknowledgement::Event {
            topic: topic.to_string(),
            resource_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebhookSignature;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<WebhookEvent>>,
    }

    impl EventSink for Recorder {
        fn submit(&self, event: WebhookEvent) -> Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn dispatcher(sink: Arc<Recorder>) -> WebhookDispatcher {
        WebhookDispatcher::new(WebhookReceiver::new("secret"), TopicAllowList::default(), sink)
    }

    fn signed(body: &str) -> InboundRequest {
        let tag = WebhookSignature::new("secret").sign(body.as_bytes()).unwrap();
        InboundRequest::new(body).with_header(headers::SIGNATURE, tag)
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DispatchState::TopicValidated.to_string(), "topic_validated");
    }

    #[test]
    fn test_delivery_id_from_header() {
        let sink = Arc::new(Recorder::default());
        let request = signed(r#"{"id": 1}"#)
            .with_header(headers::TOPIC, "order.created")
            .with_header(headers::DELIVERY_ID, "delivery-7");

        let outcome = dispatcher(sink.clone()).dispatch(&request);
        assert_eq!(outcome.delivery_id(), "delivery-7");
        let events = sink.events.lock().unwrap();
        assert_eq!(events[0].resource_event().unwrap().delivery_id, "delivery-7");
    }

    #[test]
    fn test_generated_delivery_id() {
        let outcome = dispatcher(Arc::new(Recorder::default())).dispatch(&InboundRequest::new("{}"));
        assert!(Uuid::parse_str(outcome.delivery_id()).is_ok());
    }

    #[test]
    fn test_rejected_reports_reached_state() {
        let outcome = dispatcher(Arc::new(Recorder::default()))
            .dispatch(&signed(r#"{"id": 1}"#).with_header(headers::TOPIC, "bogus.topic"));

        match outcome {
            DispatchOutcome::Rejected { reached, status, .. } => {
                assert_eq!(reached, DispatchState::Authenticated);
                assert_eq!(status, 400);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatcher_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync + 'static>() {}
        assert_traits::<WebhookDispatcher>();
    }
}
