// Shopino Gate - signed store API calls and authenticated WooCommerce webhooks
//
// This library ties together RSA request signing for outgoing calls and
// HMAC webhook authentication, topic routing and handler dispatch for
// incoming deliveries.

// Ambient crates, always available
pub use shopino_config;
pub use shopino_log;

// Re-export optional crates
#[cfg(feature = "signing")]
pub use shopino_signing;

#[cfg(feature = "webhooks")]
pub use shopino_webhooks;

// Prelude for common imports
pub mod prelude {
    pub use shopino_config::{ConfigError, EnvLoader, Validate, load_dotenv};
    pub use shopino_log::LogConfig;

    #[cfg(feature = "signing")]
    pub use shopino_signing::{
        CanonicalPayload, ClientConfig, HmacSigner, Keypair, PayloadSigner, RequestSigner,
        RsaVerifier, SignatureAlgorithm, SignatureEnvelope, SignedClient, SigningError, sign,
        verify_signature,
    };

    #[cfg(feature = "webhooks")]
    pub use shopino_webhooks::{
        DispatchOutcome, EventSink, HandlerQueue, HandlerSet, InboundRequest, QueueConfig,
        ReceiverConfig, ResourceEvent, ResourceHandler, TagEncoding, Topic, TopicAllowList,
        WebhookDispatcher, WebhookError, WebhookEvent, WebhookReceiver, WebhookSignature, headers,
    };
}
