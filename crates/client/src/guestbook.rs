//! PIN-gated guest access to the guest book.
//!
//! Owners use the guest book like any collection (a
//! [`ResourceView<GuestEntry>`](crate::resources::ResourceView)). Guests
//! have no session: they present a four-digit PIN, and entries are only
//! fetched once the backend accepts it. Every call here is anonymous, so a
//! rejected PIN never touches a member's session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cabin_core::resources::{GuestEntry, GuestEntryDraft, PinCode};
use cabin_core::{Draft, FormErrors};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::http::{ApiClient, Auth};

pub const INVALID_PIN: &str = "Invalid PIN code. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestAccess {
    /// No PIN accepted yet; `error` explains the last rejection.
    PinRequired { error: Option<String> },
    Verifying,
    Verified { pin: PinCode },
}

#[derive(Debug, thiserror::Error)]
pub enum GuestError {
    #[error("{0}")]
    Validation(FormErrors),

    #[error("a verified PIN is required")]
    PinRequired,

    #[error(transparent)]
    Api(#[from] ApiError),
}

struct GuestState {
    access: GuestAccess,
    entries: Vec<Arc<GuestEntry>>,
    error: Option<String>,
}

pub struct GuestBook {
    api: ApiClient,
    state: Mutex<GuestState>,
}

impl GuestBook {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(GuestState {
                access: GuestAccess::PinRequired { error: None },
                entries: Vec::new(),
                error: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GuestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn access(&self) -> GuestAccess {
        self.state().access.clone()
    }

    /// Entries visible to the guest; always empty until a PIN is verified.
    pub fn entries(&self) -> Vec<Arc<GuestEntry>> {
        self.state().entries.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Check `raw` locally, then with the backend. On success the entries
    /// are loaded.
    pub async fn verify(&self, raw: &str) -> Result<usize, GuestError> {
        let pin = match raw.parse::<PinCode>() {
            Ok(pin) => pin,
            Err(errors) => {
                self.reject(errors.first("pinCode").map(str::to_string));
                return Err(GuestError::Validation(errors));
            }
        };

        self.state().access = GuestAccess::Verifying;
        let result = self
            .api
            .send_json::<_, serde_json::Value>(
                Method::POST,
                "guestbook/verify-pin",
                &json!({ "pinCode": pin }),
                Auth::Anonymous,
            )
            .await;

        if let Err(e) = result {
            debug!(error = %e, "PIN rejected");
            self.reject(Some(INVALID_PIN.to_string()));
            return Err(e.into());
        }

        info!("Guest PIN accepted");
        self.state().access = GuestAccess::Verified { pin };
        self.load().await
    }

    /// Refresh the entries. Requires a verified PIN.
    pub async fn load(&self) -> Result<usize, GuestError> {
        self.verified_pin()?;
        let result = self.api.get_anonymous::<Vec<GuestEntry>>("guestbook").await;

        let mut state = self.state();
        match result {
            Ok(entries) => {
                state.entries = entries.into_iter().map(Arc::new).collect();
                state.error = None;
                Ok(state.entries.len())
            }
            Err(e) => {
                state.entries.clear();
                state.error = Some("Failed to load guest book entries. Please try again later.".to_string());
                Err(e.into())
            }
        }
    }

    /// Sign the guest book with the verified PIN; the server's entry is
    /// appended.
    pub async fn sign(&self, draft: &GuestEntryDraft) -> Result<Arc<GuestEntry>, GuestError> {
        draft.check().map_err(GuestError::Validation)?;
        let pin = self.verified_pin()?;
        let payload = draft.to_payload().map_err(ApiError::from)?;

        let result = self
            .api
            .send_payload::<GuestEntry>(
                Method::POST,
                &format!("guestbook/guest/{pin}"),
                payload,
                Auth::Anonymous,
            )
            .await;

        let mut state = self.state();
        match result {
            Ok(entry) => {
                let entry = Arc::new(entry);
                state.entries.push(entry.clone());
                state.error = None;
                info!(entry_id = %entry.id, "Guest book signed");
                Ok(entry)
            }
            Err(e) => {
                state.error = Some("Failed to save entry. Please try again.".to_string());
                Err(e.into())
            }
        }
    }

    fn verified_pin(&self) -> Result<PinCode, GuestError> {
        match &self.state().access {
            GuestAccess::Verified { pin } => Ok(pin.clone()),
            _ => Err(GuestError::PinRequired),
        }
    }

    fn reject(&self, error: Option<String>) {
        let mut state = self.state();
        state.access = GuestAccess::PinRequired { error };
        state.entries.clear();
    }
}
