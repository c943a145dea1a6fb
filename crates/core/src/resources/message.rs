//! Family message board.

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::{ActionPolicy, Draft, Resource};
use crate::error::CoreError;
use crate::identity::UserRef;
use crate::payload::{Attachment, Payload};
use crate::permissions::MESSAGES_MANAGE;
use crate::types::{ResourceId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(flatten, with = "crate::types::wire_id")]
    pub id: ResourceId,
    pub content: String,
    /// URL of an attached photo.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl Resource for Message {
    const PATH: &'static str = "messages";
    const LABEL: &'static str = "message";
    const PLURAL: &'static str = "messages";
    // Any member may post; editing or removing someone else's message
    // needs the manage permission.
    const POLICY: ActionPolicy = ActionPolicy {
        create: None,
        edit: MESSAGES_MANAGE,
        delete: MESSAGES_MANAGE,
    };
    const CREATE_VERB: &'static str = "send";

    type Create = MessageDraft;
    type Update = MessageDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        self.author.as_ref().map(|user| user.id.as_str())
    }
}

/// Post or edit form. A photo switches the request to multipart with an
/// `image` part.
#[derive(Debug, Clone, Validate)]
pub struct MessageDraft {
    #[validate(length(min = 1, message = "Message content is required"))]
    pub content: String,
    pub image: Option<Attachment>,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Attachment) -> Self {
        self.image = Some(image);
        self
    }
}

impl Draft for MessageDraft {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        let image = self.image.clone().map(|image| image.under("image"));
        Ok(Payload::json(&json!({ "content": self.content }))?.with_attachment(image))
    }
}
