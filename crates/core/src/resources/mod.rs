//! Resource items served by the REST backend and the access rules the
//! client applies before offering an action.
//!
//! Every collection (calendar, notices, documents, messages, guest book)
//! implements [`Resource`]; the client crate builds one generic
//! synchronization view on top of it instead of one per page.

pub mod calendar;
pub mod document;
pub mod guestbook;
pub mod message;
pub mod notice;

use std::fmt;

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::CoreError;
use crate::identity::Identity;
use crate::payload::Payload;
use crate::validation::{self, FormErrors};

pub use calendar::{CalendarEvent, EventDraft, EventTime};
pub use document::{Document, DocumentCategory, DocumentUpdate, DocumentUpload};
pub use guestbook::{GuestEntry, GuestEntryDraft, PinCode};
pub use message::{Message, MessageDraft};
pub use notice::{Notice, NoticeDraft, Priority};

/// Validated form input that can be turned into a request body.
pub trait Draft: Validate + Send + Sync {
    fn to_payload(&self) -> Result<Payload, CoreError>;

    /// Client-side checks run before anything is sent. Drafts with
    /// cross-field rules override this and extend the derived checks.
    fn check(&self) -> Result<(), FormErrors> {
        validation::check(self)
    }
}

/// Permission names gating each mutation of a resource.
///
/// `create: None` means any signed-in member may create. Edit and delete
/// are additionally granted to the item's owner when it names one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    pub create: Option<&'static str>,
    pub edit: &'static str,
    pub delete: &'static str,
}

/// A server-owned item kept in a client-side collection.
pub trait Resource: Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    /// Collection path under the API base, e.g. `"calendar"`.
    const PATH: &'static str;
    /// Singular noun used in messages, e.g. `"event"`.
    const LABEL: &'static str;
    /// Plural noun used in messages, e.g. `"calendar events"`.
    const PLURAL: &'static str;
    const POLICY: ActionPolicy;
    /// Verb for failed-create messages ("Failed to upload document").
    const CREATE_VERB: &'static str = "create";

    type Create: Draft;
    type Update: Draft;

    /// Server-assigned identifier; unique within a collection.
    fn id(&self) -> &str;

    /// Id of the user who owns the item, if the server reports one.
    fn owner_id(&self) -> Option<&str> {
        None
    }
}

/// Which mutation affordances a viewer gets for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub edit: bool,
    pub delete: bool,
}

pub fn can_create<R: Resource>(viewer: Option<&Identity>) -> bool {
    match viewer {
        None => false,
        Some(identity) => R::POLICY
            .create
            .map_or(true, |permission| identity.has_permission(permission)),
    }
}

pub fn can_edit<R: Resource>(viewer: Option<&Identity>, item: &R) -> bool {
    viewer.is_some_and(|identity| {
        identity.has_permission(R::POLICY.edit) || is_owner(identity, item)
    })
}

pub fn can_delete<R: Resource>(viewer: Option<&Identity>, item: &R) -> bool {
    viewer.is_some_and(|identity| {
        identity.has_permission(R::POLICY.delete) || is_owner(identity, item)
    })
}

pub fn affordances<R: Resource>(viewer: Option<&Identity>, item: &R) -> Affordances {
    Affordances {
        edit: can_edit(viewer, item),
        delete: can_delete(viewer, item),
    }
}

fn is_owner<R: Resource>(identity: &Identity, item: &R) -> bool {
    item.owner_id().is_some_and(|owner| owner == identity.id)
}
