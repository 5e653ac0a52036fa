//! Webhook topics and the allow-list

use crate::Result;
use serde::{Deserialize, Serialize};
use shopino_config::ConfigError;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Resource family a topic belongs to. Each family has its own handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Order,
    Product,
    Customer,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Order, Resource::Product, Resource::Customer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Order => "order",
            Resource::Product => "product",
            Resource::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order" => Some(Resource::Order),
            "product" => Some(Resource::Product),
            "customer" => Some(Resource::Customer),
            _ => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Created, Action::Updated, Action::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Action::Created),
            "updated" => Some(Action::Updated),
            "deleted" => Some(Action::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{resource}.{action}` topic such as `order.created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub resource: Resource,
    pub action: Action,
}

impl Topic {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    /// Parse an exact topic string. Case and surrounding whitespace matter.
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once('.')?;
        Some(Self {
            resource: Resource::parse(resource)?,
            action: Action::parse(action)?,
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.action)
    }
}

/// Immutable set of accepted topics, cheap to clone and share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAllowList {
    topics: Arc<HashSet<Topic>>,
}

impl Default for TopicAllowList {
    /// All nine `order|product|customer` x `created|updated|deleted` topics.
    fn default() -> Self {
        let topics = Resource::ALL
            .iter()
            .flat_map(|resource| {
                Action::ALL
                    .iter()
                    .map(move |action| Topic::new(*resource, *action))
            })
            .collect();
        Self {
            topics: Arc::new(topics),
        }
    }
}

impl TopicAllowList {
    /// Build an allow-list from topic strings. Every entry must name a known
    /// resource and action.
    pub fn new<I, S>(topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for topic in topics {
            let topic = topic.as_ref().trim();
            let parsed = Topic::parse(topic).ok_or_else(|| {
                ConfigError::ValidationError(format!("unsupported webhook topic: {}", topic))
            })?;
            set.insert(parsed);
        }
        Ok(Self {
            topics: Arc::new(set),
        })
    }

    /// Resolve a topic header value. `None` when it is empty, malformed or
    /// not allowed.
    pub fn resolve(&self, topic: &str) -> Option<Topic> {
        Topic::parse(topic).filter(|t| self.topics.contains(t))
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.resolve(topic).is_some()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Allowed topics in sorted order.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.iter().map(Topic::to_string).collect();
        topics.sort();
        topics
    }
}
