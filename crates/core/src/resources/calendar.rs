//! Calendar bookings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

use super::{ActionPolicy, Draft, Resource};
use crate::error::CoreError;
use crate::identity::UserRef;
use crate::payload::Payload;
use crate::permissions::{CALENDAR_CREATE, CALENDAR_DELETE, CALENDAR_EDIT};
use crate::types::{ResourceId, Timestamp};
use crate::validation::FormErrors;

/// Start or end of a booking: a whole day or an exact instant.
///
/// The forms send `YYYY-MM-DD`; the server may answer with RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    At(DateTime<Utc>),
}

impl EventTime {
    /// The instant this value denotes; whole days start at midnight UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
            EventTime::At(at) => *at,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(date) => *date,
            EventTime::At(at) => at.date_naive(),
        }
    }

    pub fn is_before(&self, other: &EventTime) -> bool {
        self.to_utc() < other.to_utc()
    }
}

impl FromStr for EventTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(EventTime::At(at.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(EventTime::At(naive.and_utc()));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(EventTime::Date)
            .map_err(|_| format!("not a date or timestamp: {s:?}"))
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            EventTime::At(at) => write!(f, "{}", at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(flatten, with = "crate::types::wire_id")]
    pub id: ResourceId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl Resource for CalendarEvent {
    const PATH: &'static str = "calendar";
    const LABEL: &'static str = "event";
    const PLURAL: &'static str = "calendar events";
    const POLICY: ActionPolicy = ActionPolicy {
        create: Some(CALENDAR_CREATE),
        edit: CALENDAR_EDIT,
        delete: CALENDAR_DELETE,
    };

    type Create = EventDraft;
    type Update = EventDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        self.created_by.as_ref().map(|user| user.id.as_str())
    }
}

/// Booking form input, used for both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(required(message = "Start date is required"))]
    pub start: Option<EventTime>,
    #[validate(required(message = "End date is required"))]
    pub end: Option<EventTime>,
    pub all_day: bool,
}

impl EventDraft {
    /// An all-day booking spanning `start..=end`.
    pub fn all_day(title: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            title: title.into(),
            description: None,
            start: Some(start),
            end: Some(end),
            all_day: true,
        }
    }
}

impl From<&CalendarEvent> for EventDraft {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            start: Some(event.start),
            end: Some(event.end),
            all_day: event.all_day,
        }
    }
}

impl Draft for EventDraft {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        Payload::json(self)
    }

    fn check(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            // Equal days are a valid one-day booking.
            if end.is_before(start) {
                errors.add_field("end", "End date must be after start date");
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
