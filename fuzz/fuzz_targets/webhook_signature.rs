//! Fuzz target for webhook tag verification.
//!
//! Arbitrary tags must never verify against a body they were not computed
//! for, and verification must never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shopino_webhooks::{TagEncoding, WebhookSignature, hmac_verify};

#[derive(Debug, Arbitrary)]
struct FuzzTag {
    secret: Vec<u8>,
    body: Vec<u8>,
    tag: String,
    base64: bool,
}

fuzz_target!(|data: FuzzTag| {
    let encoding = if data.base64 {
        TagEncoding::Base64
    } else {
        TagEncoding::Hex
    };
    let signature = WebhookSignature::new(&data.secret).with_encoding(encoding);

    let _ = signature.verify(&data.body, &data.tag);
    assert_eq!(
        hmac_verify(&data.body, &data.tag, &data.secret),
        WebhookSignature::new(&data.secret).verify(&data.body, &data.tag)
    );

    if let Ok(tag) = signature.sign(&data.body) {
        assert!(signature.verify(&data.body, &tag));
        let mut tampered = data.body.clone();
        tampered.push(0);
        assert!(!signature.verify(&tampered, &tag));
    }
});
