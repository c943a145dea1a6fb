//! Guest book entries and the PIN that lets non-members sign it.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ActionPolicy, Draft, EventTime, Resource};
use crate::error::CoreError;
use crate::payload::Payload;
use crate::permissions::GUESTBOOK_MANAGE;
use crate::types::{ResourceId, Timestamp};
use crate::validation::FormErrors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestEntry {
    #[serde(flatten, with = "crate::types::wire_id")]
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub visit_date: Option<EventTime>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl Resource for GuestEntry {
    const PATH: &'static str = "guestbook";
    const LABEL: &'static str = "entry";
    const PLURAL: &'static str = "guest book entries";
    // Guests sign without an account, so entries carry no owner.
    const POLICY: ActionPolicy = ActionPolicy {
        create: None,
        edit: GUESTBOOK_MANAGE,
        delete: GUESTBOOK_MANAGE,
    };

    type Create = GuestEntryDraft;
    type Update = GuestEntryDraft;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestEntryDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(required(message = "Visit date is required"))]
    pub visit_date: Option<NaiveDate>,
    /// Only sent by owners moderating an entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl GuestEntryDraft {
    /// A fresh signature at the default five stars.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
        visit_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
            rating: 5,
            visit_date: Some(visit_date),
            approved: None,
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = rating;
        self
    }

    /// The entry unchanged except marked approved.
    pub fn approving(entry: &GuestEntry) -> Self {
        Self {
            approved: Some(true),
            ..Self::from(entry)
        }
    }
}

impl From<&GuestEntry> for GuestEntryDraft {
    fn from(entry: &GuestEntry) -> Self {
        Self {
            name: entry.name.clone(),
            email: entry.email.clone().unwrap_or_default(),
            message: entry.message.clone(),
            rating: entry.rating.unwrap_or(5),
            visit_date: entry.visit_date.map(|at| at.date()),
            approved: None,
        }
    }
}

impl Draft for GuestEntryDraft {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        Payload::json(self)
    }
}

/// Four-digit code shared with guests instead of an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinCode(String);

impl PinCode {
    pub const LENGTH: usize = 4;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PinCode {
    type Err = FormErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(FormErrors::new().with_field("pinCode", "PIN code is required"));
        }
        if s.len() != Self::LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormErrors::new().with_field("pinCode", "PIN must be 4 digits"));
        }
        Ok(PinCode(s.to_string()))
    }
}

impl fmt::Display for PinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PinCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
