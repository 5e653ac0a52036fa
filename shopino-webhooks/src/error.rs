//! Error types for webhook operations

use thiserror::Error;

/// Errors that can occur while authenticating and dispatching a webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    /// The signature header is absent or empty
    #[error("Signature missing from request")]
    AuthenticationMissing,

    /// The signature does not match the body, or no secret is configured
    #[error("Signature verification failed")]
    AuthenticationInvalid,

    /// The topic header is empty or not on the allow-list
    #[error("Invalid or unsupported webhook topic: {0:?}")]
    InvalidTopic(String),

    /// The body could not be parsed or the event could not be routed
    #[error("Dispatch failed: {0}")]
    InternalDispatch(String),

    /// A resource handler failed after the event was acknowledged
    #[error("Handler failed: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] shopino_config::ConfigError),
}

impl WebhookError {
    /// HTTP status the rejection maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::AuthenticationMissing | WebhookError::AuthenticationInvalid => 401,
            WebhookError::InvalidTopic(_) => 400,
            WebhookError::InternalDispatch(_)
            | WebhookError::Handler(_)
            | WebhookError::Config(_) => 500,
        }
    }

    /// Machine-readable rejection code.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::AuthenticationMissing => "authentication_missing",
            WebhookError::AuthenticationInvalid => "authentication_invalid",
            WebhookError::InvalidTopic(_) => "invalid_topic",
            _ => "internal_error",
        }
    }

    /// Message safe to return to the caller. Never carries internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::AuthenticationMissing => "Missing webhook signature",
            WebhookError::AuthenticationInvalid => "Invalid webhook signature",
            WebhookError::InvalidTopic(_) => "Invalid or unsupported webhook topic",
            _ => "Internal server error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InternalDispatch(format!("invalid JSON body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookError::AuthenticationMissing.status_code(), 401);
        assert_eq!(WebhookError::AuthenticationInvalid.status_code(), 401);
        assert_eq!(WebhookError::InvalidTopic("bogus".into()).status_code(), 400);
        assert_eq!(WebhookError::InternalDispatch("x".into()).status_code(), 500);
    }

    #[test]
    fn test_codes() {
        assert_eq!(WebhookError::AuthenticationMissing.code(), "authentication_missing");
        assert_eq!(WebhookError::AuthenticationInvalid.code(), "authentication_invalid");
        assert_eq!(WebhookError::InvalidTopic(String::new()).code(), "invalid_topic");
        assert_eq!(WebhookError::Handler("x".into()).code(), "internal_error");
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = WebhookError::InternalDispatch("queue full at /var/run/secret".into());
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("queue full"));
        assert!(!err.is_client_error());
        assert!(WebhookError::InvalidTopic("x".into()).is_client_error());
    }
}
