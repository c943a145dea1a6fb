//! The one owner of process-wide session state.
//!
//! [`SessionContext`] holds the attached bearer credential, the published
//! [`SessionState`] and the current [`Route`]. Everything that makes
//! authenticated calls or reacts to sign-in state is handed an
//! `Arc<SessionContext>` instead of reaching for globals.
//!
//! Every attach or detach of the credential bumps an epoch. Requests
//! record the epoch they were sent under, and a 401 only tears the session
//! down if that epoch is still current, so a stale response can never
//! clear a credential a newer login just installed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cabin_core::identity;
use cabin_core::{Identity, Route};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::credential::{CredentialError, CredentialStore};

/// Sign-in state as seen by views.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Bootstrap has not run.
    Unknown,
    /// A stored credential is being checked against the backend.
    Loading,
    Authenticated(Arc<Identity>),
    Anonymous,
}

impl SessionState {
    pub fn identity(&self) -> Option<&Arc<Identity>> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Bootstrap finished one way or the other.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Authenticated(_) | SessionState::Anonymous)
    }
}

/// Epoch of the credential a request carried.
pub type Epoch = u64;

#[derive(Debug, Default)]
struct Slot {
    token: Option<String>,
    epoch: Epoch,
}

pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    slot: Mutex<Slot>,
    state: watch::Sender<SessionState>,
    route: watch::Sender<Route>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn CredentialStore>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Unknown);
        let (route, _) = watch::channel(Route::DEFAULT);
        Arc::new(Self {
            store,
            slot: Mutex::new(Slot::default()),
            state,
            route,
        })
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- credential ----

    /// Credential left in durable storage by an earlier run.
    pub fn stored_credential(&self) -> Result<Option<String>, CredentialError> {
        self.store.load()
    }

    /// Attach `token` for outbound requests, optionally persisting it.
    /// Returns the new epoch.
    pub fn attach(&self, token: String, persist: bool) -> Epoch {
        let mut slot = self.slot();
        if persist {
            if let Err(e) = self.store.save(&token) {
                warn!(error = %e, "Failed to persist credential; keeping it for this run only");
            }
        }
        slot.token = Some(token);
        slot.epoch += 1;
        debug!(epoch = slot.epoch, "Credential attached");
        slot.epoch
    }

    /// Drop the credential from memory and storage.
    pub fn detach(&self) -> Epoch {
        let mut slot = self.slot();
        self.clear_locked(&mut slot)
    }

    fn clear_locked(&self, slot: &mut Slot) -> Epoch {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
        slot.token = None;
        slot.epoch += 1;
        debug!(epoch = slot.epoch, "Credential detached");
        slot.epoch
    }

    /// Current credential and the epoch it was attached under.
    pub fn bearer(&self) -> Option<(String, Epoch)> {
        let slot = self.slot();
        slot.token.clone().map(|token| (token, slot.epoch))
    }

    pub fn epoch(&self) -> Epoch {
        self.slot().epoch
    }

    /// Detach only if the credential from `epoch` is still the attached
    /// one. Returns whether anything was discarded.
    pub fn discard(&self, epoch: Epoch) -> bool {
        let mut slot = self.slot();
        if slot.epoch != epoch || slot.token.is_none() {
            return false;
        }
        self.clear_locked(&mut slot);
        true
    }

    /// Global teardown after the backend answered 401 to a request sent
    /// under `epoch`: clear the credential, publish anonymous, go to login.
    /// Stale epochs are ignored.
    pub fn invalidate(&self, epoch: Epoch) -> bool {
        let mut slot = self.slot();
        if slot.epoch != epoch || slot.token.is_none() {
            debug!(
                epoch,
                current = slot.epoch,
                "Ignoring 401 for a credential that is no longer attached"
            );
            return false;
        }
        self.clear_locked(&mut slot);
        self.state.send_replace(SessionState::Anonymous);
        drop(slot);

        warn!(epoch, "Backend rejected the session credential; signed out");
        self.navigate(Route::Login);
        true
    }

    // ---- state ----

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> Option<Arc<Identity>> {
        self.state.borrow().identity().cloned()
    }

    pub fn has_permission(&self, name: &str) -> bool {
        identity::has_permission(self.state.borrow().identity().map(Arc::as_ref), name)
    }

    pub fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Publish `state` only if the credential from `epoch` is still
    /// attached. Returns whether it was published.
    pub fn publish_if(&self, epoch: Epoch, state: SessionState) -> bool {
        let slot = self.slot();
        if slot.epoch != epoch {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    // ---- navigation ----

    pub fn route(&self) -> Route {
        self.route.borrow().clone()
    }

    pub fn subscribe_route(&self) -> watch::Receiver<Route> {
        self.route.subscribe()
    }

    pub fn navigate(&self, route: Route) {
        let previous = self.route.send_replace(route.clone());
        if previous != route {
            info!(from = %previous, to = %route, "Navigate");
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("epoch", &self.epoch())
            .field("state", &*self.state.borrow())
            .field("route", &*self.route.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;

    fn context() -> (Arc<SessionContext>, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::default());
        (SessionContext::new(store.clone()), store)
    }

    #[test]
    fn attach_persists_and_bumps_epoch() {
        let (ctx, store) = context();
        let first = ctx.attach("t1".to_string(), true);
        let second = ctx.attach("t2".to_string(), true);

        assert!(second > first);
        assert_eq!(ctx.bearer(), Some(("t2".to_string(), second)));
        assert_eq!(store.current().as_deref(), Some("t2"));
    }

    #[test]
    fn stale_401_does_not_clear_a_newer_credential() {
        let (ctx, store) = context();
        let old = ctx.attach("old".to_string(), true);
        let fresh = ctx.attach("fresh".to_string(), true);
        ctx.publish(SessionState::Anonymous);

        assert!(!ctx.invalidate(old));
        assert_eq!(ctx.bearer(), Some(("fresh".to_string(), fresh)));
        assert_eq!(store.current().as_deref(), Some("fresh"));
    }

    #[test]
    fn current_401_tears_down_and_redirects() {
        let (ctx, store) = context();
        let epoch = ctx.attach("t1".to_string(), true);
        ctx.navigate(Route::Calendar);

        assert!(ctx.invalidate(epoch));
        assert_eq!(ctx.bearer(), None);
        assert_eq!(store.current(), None);
        assert_eq!(ctx.state(), SessionState::Anonymous);
        assert_eq!(ctx.route(), Route::Login);
    }

    #[test]
    fn publish_if_respects_epoch() {
        let (ctx, _) = context();
        let epoch = ctx.attach("t1".to_string(), false);
        ctx.detach();

        assert!(!ctx.publish_if(epoch, SessionState::Loading));
        assert_eq!(ctx.state(), SessionState::Unknown);
    }

    #[test]
    fn permissions_follow_the_published_identity() {
        let (ctx, _) = context();
        assert!(!ctx.has_permission("notices.create"));

        let member = Identity {
            permissions: ["notices.create"].into_iter().collect(),
            ..serde_json::from_value(serde_json::json!({ "_id": "u1" })).unwrap()
        };
        ctx.publish(SessionState::Authenticated(Arc::new(member)));
        assert!(ctx.has_permission("notices.create"));
        assert!(!ctx.has_permission("notices.delete"));

        ctx.publish(SessionState::Anonymous);
        assert!(!ctx.has_permission("notices.create"));
    }

    #[test]
    fn discard_is_epoch_scoped() {
        let (ctx, _) = context();
        let old = ctx.attach("old".to_string(), false);
        let fresh = ctx.attach("fresh".to_string(), false);

        assert!(!ctx.discard(old));
        assert!(ctx.discard(fresh));
        assert_eq!(ctx.bearer(), None);
    }
}
