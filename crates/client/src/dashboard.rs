//! Dashboard loader: five independent cards, each with its own state.

use cabin_core::dashboard::{self, Card};
use cabin_core::resources::{CalendarEvent, Document, GuestEntry, Message, Notice};
use cabin_core::Resource;
use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::http::ApiClient;
use crate::resources::{ResourceApi, RestResource};

/// One card: its items, or the message to show instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CardState<T> {
    Loaded(Vec<T>),
    Failed(&'static str),
}

impl<T> CardState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            CardState::Loaded(items) => items,
            CardState::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&'static str> {
        match self {
            CardState::Failed(message) => Some(*message),
            CardState::Loaded(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub upcoming_events: CardState<CalendarEvent>,
    pub recent_notices: CardState<Notice>,
    pub recent_documents: CardState<Document>,
    pub recent_messages: CardState<Message>,
    pub recent_guest_entries: CardState<GuestEntry>,
}

async fn fetch<R: Resource>(api: &ApiClient, card: Card) -> Result<Vec<R>, &'static str> {
    RestResource::<R>::new(api.clone())
        .list()
        .await
        .map_err(|e| {
            debug!(resource = R::PATH, error = %e, "Dashboard card failed");
            card.error_message()
        })
}

fn card<R: Clone>(
    fetched: Result<Vec<R>, &'static str>,
    select: impl FnOnce(&[R]) -> Vec<&R>,
) -> CardState<R> {
    match fetched {
        Ok(items) => CardState::Loaded(select(&items).into_iter().cloned().collect()),
        Err(message) => CardState::Failed(message),
    }
}

/// Fetch all five collections concurrently. One failing card never
/// affects the others.
pub async fn load<Tz: TimeZone>(api: &ApiClient, now: &DateTime<Tz>) -> DashboardView {
    let (events, notices, documents, messages, entries) = tokio::join!(
        fetch::<CalendarEvent>(api, Card::UpcomingEvents),
        fetch::<Notice>(api, Card::RecentNotices),
        fetch::<Document>(api, Card::RecentDocuments),
        fetch::<Message>(api, Card::RecentMessages),
        fetch::<GuestEntry>(api, Card::RecentGuestEntries),
    );

    DashboardView {
        upcoming_events: card(events, |all| dashboard::upcoming_events(all, now)),
        recent_notices: card(notices, dashboard::recent_notices),
        recent_documents: card(documents, dashboard::recent_documents),
        recent_messages: card(messages, dashboard::recent_messages),
        recent_guest_entries: card(entries, dashboard::recent_guest_entries),
    }
}
