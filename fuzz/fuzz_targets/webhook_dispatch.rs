//! Fuzz target for webhook dispatch.
//!
//! Feeds arbitrary headers and bodies through the full dispatcher, signed
//! and unsigned, and checks that every outcome maps to a known response.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shopino_webhooks::{
    EventSink, InboundRequest, Result, TopicAllowList, WebhookDispatcher, WebhookEvent,
    WebhookReceiver, WebhookSignature, headers,
};
use std::sync::Arc;

const SECRET: &str = "fuzz-secret";

/// Arbitrary delivery for fuzzing.
#[derive(Debug, Arbitrary)]
struct FuzzDelivery {
    topic: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
    /// Sign the body correctly instead of using `tag`
    sign: bool,
    tag: String,
}

struct Discard;

impl EventSink for Discard {
    fn submit(&self, _event: WebhookEvent) -> Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: FuzzDelivery| {
    let dispatcher = WebhookDispatcher::new(
        WebhookReceiver::new(SECRET),
        TopicAllowList::default(),
        Arc::new(Discard),
    );

    let tag = if data.sign {
        WebhookSignature::new(SECRET).sign(&data.body).unwrap()
    } else {
        data.tag
    };

    let mut request = InboundRequest::new(data.body).with_header(headers::SIGNATURE, tag);
    if let Some(topic) = data.topic {
        request = request.with_header(headers::TOPIC, topic);
    }
    if let Some(content_type) = data.content_type {
        request = request.with_header(headers::CONTENT_TYPE, content_type);
    }

    let outcome = dispatcher.dispatch(&request);
    assert!(matches!(outcome.status(), 200 | 400 | 401 | 500));
    if !data.sign {
        assert_ne!(outcome.status(), 400);
    }
});
