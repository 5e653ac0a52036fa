//! Parsed webhook events
//!
//! Bodies are validated here, once. Everything downstream works with the
//! typed [`WebhookEvent`] rather than raw JSON.

use crate::{Action, Resource, Result, Topic, WebhookError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Body encodings the store sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    #[default]
    Json,
    Form,
}

impl BodyFormat {
    /// Pick the format from a `Content-Type` value. Anything that is not
    /// form-encoded is treated as JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match mime.as_deref() {
            Some("application/x-www-form-urlencoded") => BodyFormat::Form,
            _ => BodyFormat::Json,
        }
    }
}

/// Decode a body into a flat JSON object.
///
/// Form bodies become string values; a repeated key keeps its last value.
pub fn parse_body(body: &[u8], format: BodyFormat) -> Result<Map<String, Value>> {
    match format {
        BodyFormat::Json => match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => Ok(map),
            other => Err(WebhookError::InternalDispatch(format!(
                "expected a JSON object body, got {}",
                json_kind(&other)
            ))),
        },
        BodyFormat::Form => Ok(url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect()),
    }
}

/// The `webhook_id` of a registration ping, if the body is one.
///
/// Only a non-empty string or a non-zero integer marks a ping. `null`,
/// `false`, `""` and `0` are ordinary fields and the body is routed as a
/// resource event. Any other type is an error.
pub fn handshake_id(data: &Map<String, Value>) -> Result<Option<String>> {
    match data.get("webhook_id") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(Value::Number(id)) if id.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(id)) if id.is_u64() || id.is_i64() => Ok(Some(id.to_string())),
        Some(other) => Err(WebhookError::InternalDispatch(format!(
            "webhook_id must be a string or integer, got {}",
            json_kind(other)
        ))),
    }
}

/// The numeric `id` of the resource, if present.
///
/// Accepts a non-negative JSON integer or a numeric string (form bodies).
pub fn resource_id(data: &Map<String, Value>) -> Result<Option<u64>> {
    match data.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(id)) => id.as_u64().map(Some).ok_or_else(|| {
            WebhookError::InternalDispatch(format!("id is not a non-negative integer: {}", id))
        }),
        Some(Value::String(id)) => id.trim().parse::<u64>().map(Some).map_err(|_| {
            WebhookError::InternalDispatch(format!("id is not numeric: {:?}", id))
        }),
        Some(other) => Err(WebhookError::InternalDispatch(format!(
            "id must be an integer, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// An authenticated, routed change to an order, product or customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEvent {
    pub topic: Topic,
    pub action: Action,
    pub resource_id: Option<u64>,
    pub data: Map<String, Value>,
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    pub received_at: DateTime<Utc>,
    pub delivery_id: String,
}

impl ResourceEvent {
    pub fn resource(&self) -> Resource {
        self.topic.resource
    }
}

/// Everything the dispatcher can produce from an authenticated request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WebhookEvent {
    /// Registration ping carrying the store's webhook id
    Handshake { webhook_id: String },
    Order(ResourceEvent),
    Product(ResourceEvent),
    Customer(ResourceEvent),
}

impl WebhookEvent {
    /// Build an event for `topic`, extracting the resource id from `data`.
    pub fn from_parts(
        topic: Topic,
        data: Map<String, Value>,
        raw_body: Vec<u8>,
        delivery_id: impl Into<String>,
    ) -> Result<Self> {
        let event = ResourceEvent {
            topic,
            action: topic.action,
            resource_id: resource_id(&data)?,
            data,
            raw_body,
            received_at: Utc::now(),
            delivery_id: delivery_id.into(),
        };
        Ok(match topic.resource {
            Resource::Order => WebhookEvent::Order(event),
            Resource::Product => WebhookEvent::Product(event),
            Resource::Customer => WebhookEvent::Customer(event),
        })
    }

    pub fn resource_event(&self) -> Option<&ResourceEvent> {
        match self {
            WebhookEvent::Handshake { .. } => None,
            WebhookEvent::Order(e) | WebhookEvent::Product(e) | WebhookEvent::Customer(e) => {
                Some(e)
            }
        }
    }

    pub fn topic(&self) -> Option<Topic> {
        self.resource_event().map(|e| e.topic)
    }

    pub fn resource(&self) -> Option<Resource> {
        self.resource_event().map(ResourceEvent::resource)
    }

    pub fn is_handshake(&self) -> bool {
        matches!(self, WebhookEvent::Handshake { .. })
    }
}
