//! Configuration for the webhook receiver

use crate::{QueueConfig, Result, TagEncoding, TopicAllowList, headers};
use shopino_config::{ConfigValidator, EnvLoader, Validate};
use std::time::Duration;
use tracing::warn;

/// Variable WooCommerce deployments already use for the shared secret.
pub const WOOCOMMERCE_SECRET_VAR: &str = "WOOCOMMERCE_WEBHOOK_SECRET";

/// Configuration for the webhook receiver and dispatcher
#[derive(Clone, PartialEq)]
pub struct ReceiverConfig {
    /// Shared HMAC secret. `None` rejects every delivery.
    pub secret: Option<String>,

    /// Header carrying the HMAC tag
    pub signature_header: String,

    /// Header carrying the topic
    pub topic_header: String,

    /// Header carrying the delivery id
    pub delivery_header: String,

    /// Encoding of the HMAC tag
    pub tag_encoding: TagEncoding,

    /// Accepted topics; empty means the nine built-in topics
    pub topics: Vec<String>,

    /// Handler queue sizing
    pub queue: QueueConfig,
}

impl std::fmt::Debug for ReceiverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("signature_header", &self.signature_header)
            .field("topic_header", &self.topic_header)
            .field("delivery_header", &self.delivery_header)
            .field("tag_encoding", &self.tag_encoding)
            .field("topics", &self.topics)
            .field("queue", &self.queue)
            .finish()
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            secret: None,
            signature_header: headers::SIGNATURE.to_string(),
            topic_header: headers::TOPIC.to_string(),
            delivery_header: headers::DELIVERY_ID.to_string(),
            tag_encoding: TagEncoding::Hex,
            topics: Vec::new(),
            queue: QueueConfig::default(),
        }
    }
}

impl ReceiverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ReceiverConfigBuilder {
        ReceiverConfigBuilder::new()
    }

    /// Read the receiver settings from the environment.
    ///
    /// The secret comes from `WOOCOMMERCE_WEBHOOK_SECRET`, falling back to
    /// the prefixed `WEBHOOK_SECRET`. Other keys (prefixed):
    /// `WEBHOOK_TAG_ENCODING`, `WEBHOOK_TOPICS` (comma separated),
    /// `QUEUE_CAPACITY`, `QUEUE_WORKERS`, `HANDLER_TIMEOUT_SECS`.
    pub fn from_env(loader: &EnvLoader) -> Result<Self> {
        let defaults = Self::default();

        let secret = loader
            .raw(WOOCOMMERCE_SECRET_VAR)
            .filter(|s| !s.is_empty())
            .or_else(|| loader.load_opt("webhook_secret"));
        if secret.is_none() {
            warn!("no webhook secret configured, every delivery will be rejected");
        }

        let topics = loader
            .load_opt("webhook_topics")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            secret,
            tag_encoding: loader
                .load_parsed("webhook_tag_encoding")?
                .unwrap_or(defaults.tag_encoding),
            topics,
            queue: QueueConfig {
                capacity: loader
                    .load_parsed("queue_capacity")?
                    .unwrap_or(defaults.queue.capacity),
                workers: loader
                    .load_parsed("queue_workers")?
                    .unwrap_or(defaults.queue.workers),
                handler_timeout: loader
                    .load_parsed::<u64>("handler_timeout_secs")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.queue.handler_timeout),
            },
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// The allow-list these settings describe.
    pub fn allow_list(&self) -> Result<TopicAllowList> {
        if self.topics.is_empty() {
            Ok(TopicAllowList::default())
        } else {
            TopicAllowList::new(&self.topics)
        }
    }
}

impl Validate for ReceiverConfig {
    fn validate(&self) -> shopino_config::Result<()> {
        ConfigValidator::is_header_name(&self.signature_header, "signature_header")?;
        ConfigValidator::is_header_name(&self.topic_header, "topic_header")?;
        ConfigValidator::is_header_name(&self.delivery_header, "delivery_header")?;
        ConfigValidator::in_range(self.queue.capacity, 1, 65_536, "queue_capacity")?;
        ConfigValidator::in_range(self.queue.workers, 1, 256, "queue_workers")?;
        ConfigValidator::in_range(
            self.queue.handler_timeout.as_secs(),
            1,
            3600,
            "handler_timeout_secs",
        )
    }
}

/// Builder for ReceiverConfig
#[derive(Debug, Clone, Default)]
pub struct ReceiverConfigBuilder {
    config: ReceiverConfig,
}

impl ReceiverConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReceiverConfig::default(),
        }
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.config.secret = (!secret.is_empty()).then_some(secret);
        self
    }

    pub fn signature_header(mut self, header: impl Into<String>) -> Self {
        self.config.signature_header = header.into();
        self
    }

    pub fn topic_header(mut self, header: impl Into<String>) -> Self {
        self.config.topic_header = header.into();
        self
    }

    pub fn delivery_header(mut self, header: impl Into<String>) -> Self {
        self.config.delivery_header = header.into();
        self
    }

    pub fn tag_encoding(mut self, encoding: TagEncoding) -> Self {
        self.config.tag_encoding = encoding;
        self
    }

    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue.capacity = capacity;
        self
    }

    pub fn queue_workers(mut self, workers: usize) -> Self {
        self.config.queue.workers = workers;
        self
    }

    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.config.queue.handler_timeout = timeout;
        self
    }

    pub fn build(self) -> ReceiverConfig {
        self.config
    }
}
