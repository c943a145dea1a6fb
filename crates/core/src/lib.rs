//! Family cabin domain types.
//!
//! Pure data and rules with no I/O:
//!
//! - [`identity`]: the signed-in user and permission checks.
//! - [`resources`]: the five server collections, their form drafts and the
//!   access policy for each mutation.
//! - [`validation`]: [`FormErrors`](validation::FormErrors), shared by
//!   client-side checks and server rejections.
//! - [`payload`]: request bodies that are JSON or multipart depending on
//!   whether a file rides along.
//! - [`routes`] and [`dashboard`]: navigation table and card selection.

pub mod account;
pub mod dashboard;
pub mod error;
pub mod identity;
pub mod payload;
pub mod permissions;
pub mod resources;
pub mod routes;
pub mod types;
pub mod validation;

pub use error::CoreError;
pub use identity::{Identity, PermissionSet, UserRef};
pub use payload::{Attachment, Payload};
pub use resources::{Draft, Resource};
pub use routes::Route;
pub use validation::FormErrors;
