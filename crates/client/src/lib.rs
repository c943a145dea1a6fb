//! Family cabin backend client.
//!
//! - [`SessionContext`]: the single owner of the credential, sign-in state
//!   and current route.
//! - [`ApiClient`]: request pipeline with bearer attachment and global 401
//!   teardown.
//! - [`Session`]: bootstrap, login, OAuth, registration, logout, profile.
//! - [`guard`]: route guard over session state.
//! - [`ResourceView`]: generic list/create/update/delete cache per page.
//! - [`GuestBook`], [`documents`], [`dashboard`]: page-specific flows.

pub mod config;
pub mod context;
pub mod credential;
pub mod dashboard;
pub mod documents;
pub mod error;
pub mod guard;
pub mod guestbook;
pub mod http;
pub mod resources;
pub mod session;

use std::sync::Arc;

pub use config::{ClientConfig, ConfigError};
pub use context::{SessionContext, SessionState};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ApiError;
pub use guestbook::{GuestAccess, GuestBook};
pub use http::{ApiClient, Auth};
pub use resources::{ResourceView, SyncError, SyncOutcome};
pub use session::{Session, SessionError};

/// Everything wired to one backend and one credential store.
pub struct Cabin {
    pub context: Arc<SessionContext>,
    pub api: ApiClient,
    pub session: Session,
}

impl Cabin {
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let context = SessionContext::new(store);
        let api = ApiClient::new(config, context.clone())?;
        Ok(Self {
            context,
            session: Session::new(api.clone()),
            api,
        })
    }

    /// Credential persisted at `config.credential_file`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let store = Arc::new(FileCredentialStore::new(config.credential_file.clone()));
        Self::new(config, store)
    }

    pub fn view<R: cabin_core::Resource>(&self) -> ResourceView<R> {
        ResourceView::rest(self.api.clone())
    }

    pub fn guest_book(&self) -> GuestBook {
        GuestBook::new(self.api.clone())
    }
}
