//! Notice board posts.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ActionPolicy, Draft, Resource};
use crate::error::CoreError;
use crate::identity::UserRef;
use crate::payload::Payload;
use crate::permissions::{NOTICES_CREATE, NOTICES_DELETE, NOTICES_EDIT};
use crate::types::{ResourceId, Timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority {other:?} (expected low, medium or high)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(flatten, with = "crate::types::wire_id")]
    pub id: ResourceId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub author: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Resource for Notice {
    const PATH: &'static str = "notices";
    const LABEL: &'static str = "notice";
    const PLURAL: &'static str = "notices";
    const POLICY: ActionPolicy = ActionPolicy {
        create: Some(NOTICES_CREATE),
        edit: NOTICES_EDIT,
        delete: NOTICES_DELETE,
    };

    type Create = NoticeDraft;
    type Update = NoticeDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        self.author.as_ref().map(|user| user.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NoticeDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(required(message = "Priority is required"))]
    pub priority: Option<Priority>,
}

impl NoticeDraft {
    /// A new notice at the default (medium) priority.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            priority: Some(Priority::default()),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl From<&Notice> for NoticeDraft {
    fn from(notice: &Notice) -> Self {
        Self {
            title: notice.title.clone(),
            content: notice.content.clone(),
            priority: Some(notice.priority),
        }
    }
}

impl Draft for NoticeDraft {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        Payload::json(self)
    }
}
