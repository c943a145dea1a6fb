//! What the dashboard cards show out of each full collection.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use crate::resources::{CalendarEvent, Document, EventTime, GuestEntry, Message, Notice};
use crate::types::Timestamp;

/// Items per card.
pub const CARD_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Card {
    UpcomingEvents,
    RecentNotices,
    RecentDocuments,
    RecentMessages,
    RecentGuestEntries,
}

impl Card {
    pub fn title(&self) -> &'static str {
        match self {
            Card::UpcomingEvents => "Upcoming Events",
            Card::RecentNotices => "Recent Notices",
            Card::RecentDocuments => "Recent Documents",
            Card::RecentMessages => "Recent Messages",
            Card::RecentGuestEntries => "Guest Book",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Card::UpcomingEvents => "Failed to load events",
            Card::RecentNotices => "Failed to load notices",
            Card::RecentDocuments => "Failed to load documents",
            Card::RecentMessages => "Failed to load messages",
            Card::RecentGuestEntries => "Failed to load guest book entries",
        }
    }
}

/// Midnight at the start of `now`'s day, in `now`'s own zone.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Events starting today or later, soonest first.
pub fn upcoming_events<'a, Tz: TimeZone>(
    events: &'a [CalendarEvent],
    now: &DateTime<Tz>,
) -> Vec<&'a CalendarEvent> {
    let today = now.date_naive();
    let since = start_of_day(now);
    let mut upcoming: Vec<_> = events
        .iter()
        .filter(|event| match event.start {
            EventTime::Date(date) => date >= today,
            EventTime::At(at) => at >= since,
        })
        .collect();
    upcoming.sort_by_key(|event| event.start.to_utc());
    upcoming.truncate(CARD_LIMIT);
    upcoming
}

/// The most recent items by `stamp`. Undated items sort last.
pub fn newest_first<T>(items: &[T], stamp: impl Fn(&T) -> Option<Timestamp>) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| stamp(b).cmp(&stamp(a)));
    sorted.truncate(CARD_LIMIT);
    sorted
}

pub fn recent_notices(notices: &[Notice]) -> Vec<&Notice> {
    newest_first(notices, |n| n.created_at)
}

pub fn recent_documents(documents: &[Document]) -> Vec<&Document> {
    newest_first(documents, |d| d.uploaded_at)
}

pub fn recent_messages(messages: &[Message]) -> Vec<&Message> {
    newest_first(messages, |m| m.created_at)
}

pub fn recent_guest_entries(entries: &[GuestEntry]) -> Vec<&GuestEntry> {
    newest_first(entries, |e| e.created_at)
}
