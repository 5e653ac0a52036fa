use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use shopino::shopino_signing::{
    CanonicalPayload, Keypair, RsaVerifier, canonicalize_json_bytes, sign, verify_signature,
};
use shopino::shopino_webhooks::{
    HandlerSet, HandlerQueue, InboundRequest, QueueConfig, TagEncoding, TopicAllowList,
    WebhookDispatcher, WebhookReceiver, WebhookSignature, headers,
};
use std::hint::black_box;
use std::sync::Arc;

const PRIVATE_KEY: &str = include_str!("../shopino-signing/tests/fixtures/pkcs8_private.pem");

fn order_body() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": 4242,
        "status": "processing",
        "currency": "EUR",
        "total": "129.90",
        "billing": {"first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com"},
        "line_items": [
            {"product_id": 17, "quantity": 2, "total": "59.90"},
            {"product_id": 23, "quantity": 1, "total": "70.00"}
        ]
    }))
    .unwrap()
}

fn bench_rsa_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsa");

    let keypair = Keypair::from_pem(PRIVATE_KEY).unwrap();
    let payload = CanonicalPayload::from_params([("page", "1"), ("per_page", "10")]);

    group.bench_function("sign", |b| {
        b.iter(|| sign(black_box(payload.as_bytes()), &keypair).unwrap())
    });

    let envelope = sign(payload.as_bytes(), &keypair).unwrap();

    group.bench_function("verify", |b| {
        b.iter(|| {
            verify_signature(
                black_box(payload.as_bytes()),
                black_box(&envelope),
                keypair.public_key(),
            )
        })
    });

    let verifier = RsaVerifier::new(keypair.public_key().clone());
    group.bench_function("verify_reused_verifier", |b| {
        b.iter(|| verifier.verify(black_box(payload.as_bytes()), black_box(&envelope)))
    });

    group.finish();
}

fn bench_canonicalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical");

    let params: Vec<(String, String)> = (0..20)
        .rev()
        .map(|i| (format!("field_{:02}", i), format!("value {}", i)))
        .collect();
    group.bench_function("query_20_params", |b| {
        b.iter(|| CanonicalPayload::from_params(black_box(params.clone())))
    });

    let body = order_body();
    group.bench_function("json_order", |b| {
        b.iter(|| canonicalize_json_bytes(black_box(&body)).unwrap())
    });

    group.finish();
}

fn bench_webhook_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("webhook");

    let body = order_body();
    for encoding in [TagEncoding::Hex, TagEncoding::Base64] {
        let signature = WebhookSignature::new("whsec_bench").with_encoding(encoding);
        let tag = signature.sign(&body).unwrap();

        group.bench_function(format!("verify_{}", encoding), |b| {
            b.iter(|| signature.verify(black_box(&body), black_box(&tag)))
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let queue = Arc::new(HandlerQueue::start(
        HandlerSet::default(),
        QueueConfig {
            capacity: 65_536,
            workers: 4,
            ..QueueConfig::default()
        },
    ));
    let dispatcher = WebhookDispatcher::new(
        WebhookReceiver::new("whsec_bench"),
        TopicAllowList::default(),
        queue.clone(),
    );

    let body = order_body();
    let tag = WebhookSignature::new("whsec_bench").sign(&body).unwrap();
    let request = InboundRequest::new(body)
        .with_header(headers::SIGNATURE, tag)
        .with_header(headers::TOPIC, "order.updated")
        .with_header(headers::DELIVERY_ID, "bench");

    c.bench_function("dispatch_order_updated", |b| {
        b.iter(|| dispatcher.dispatch(black_box(&request)))
    });

    runtime.block_on(queue.shutdown());
}

criterion_group!(
    security_benches,
    bench_rsa_operations,
    bench_canonicalization,
    bench_webhook_verification,
    bench_dispatch
);

criterion_main!(security_benches);
