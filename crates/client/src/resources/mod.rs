//! Generic synchronization between server collections and page state.

pub mod api;
pub mod view;

pub use api::{ResourceApi, RestResource};
pub use view::{ListStatus, ResourceView, SyncError, SyncOutcome};
