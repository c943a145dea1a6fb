//! Page-local cache of one server collection.
//!
//! [`ResourceView`] only changes its items in response to a successful
//! call: list replaces, create appends the server's item, update replaces
//! by id, delete removes by id. Nothing is applied before the server
//! answers, and failures leave the items as they were.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cabin_core::resources::{self, Affordances};
use cabin_core::{Draft, FormErrors, Resource};
use tracing::{debug, info};

use super::api::{ResourceApi, RestResource};
use crate::context::SessionContext;
use crate::error::ApiError;
use crate::http::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// Not loaded yet.
    Idle,
    Loading,
    Ready,
    /// Last load failed; retry with [`ResourceView::load`].
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{0}")]
    Validation(FormErrors),

    #[error("another change is still being saved")]
    Busy,

    #[error("not permitted to {action} this {label}")]
    NotPermitted {
        action: &'static str,
        label: &'static str,
    },

    #[error("no {label} with id {id}")]
    UnknownItem { label: &'static str, id: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of a call whose view may have been unmounted while it was in
/// flight. A detached result was not applied anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome<T> {
    Applied(T),
    Detached,
}

impl<T> SyncOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            SyncOutcome::Applied(value) => Some(value),
            SyncOutcome::Detached => None,
        }
    }
}

struct ViewState<R> {
    items: Vec<Arc<R>>,
    status: ListStatus,
    error: Option<String>,
}

pub struct ResourceView<R: Resource> {
    api: Arc<dyn ResourceApi<R>>,
    context: Arc<SessionContext>,
    state: Mutex<ViewState<R>>,
    busy: AtomicBool,
    mounted: AtomicBool,
}

/// Clears the busy flag when a mutation finishes, however it finishes.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: Resource> ResourceView<R> {
    pub fn new(api: Arc<dyn ResourceApi<R>>, context: Arc<SessionContext>) -> Self {
        Self {
            api,
            context,
            state: Mutex::new(ViewState {
                items: Vec::new(),
                status: ListStatus::Idle,
                error: None,
            }),
            busy: AtomicBool::new(false),
            mounted: AtomicBool::new(true),
        }
    }

    /// View over the REST collection at `R::PATH`.
    pub fn rest(api: ApiClient) -> Self {
        let context = api.context().clone();
        Self::new(Arc::new(RestResource::<R>::new(api)), context)
    }

    fn state(&self) -> MutexGuard<'_, ViewState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- reads ----

    pub fn items(&self) -> Vec<Arc<R>> {
        self.state().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<R>> {
        self.state().items.iter().find(|item| item.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> ListStatus {
        self.state().status
    }

    /// Page-scoped error banner text.
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// A mutation is in flight; submit controls should be disabled.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn can_create(&self) -> bool {
        resources::can_create::<R>(self.context.identity().as_deref())
    }

    pub fn affordances(&self, item: &R) -> Affordances {
        resources::affordances(self.context.identity().as_deref(), item)
    }

    // ---- lifecycle ----

    /// The page went away. Responses still in flight are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Fetch the whole collection, replacing the local one.
    pub async fn load(&self) -> Result<SyncOutcome<usize>, SyncError> {
        {
            let mut state = self.state();
            state.status = ListStatus::Loading;
            state.error = None;
        }

        let result = self.api.list().await;
        if !self.is_mounted() {
            debug!(resource = R::PATH, "List response after unmount dropped");
            return Ok(SyncOutcome::Detached);
        }

        let mut state = self.state();
        match result {
            Ok(items) => {
                state.items = items.into_iter().map(Arc::new).collect();
                state.status = ListStatus::Ready;
                debug!(resource = R::PATH, count = state.items.len(), "Loaded");
                Ok(SyncOutcome::Applied(state.items.len()))
            }
            Err(e) => {
                state.items.clear();
                if e.is_unauthorized() {
                    // The session teardown already navigates away.
                    state.status = ListStatus::Idle;
                } else {
                    state.status = ListStatus::Failed;
                    state.error = Some(format!(
                        "Failed to load {}. Please try again later.",
                        R::PLURAL
                    ));
                }
                Err(e.into())
            }
        }
    }

    // ---- mutations ----

    pub async fn create(&self, draft: &R::Create) -> Result<SyncOutcome<Arc<R>>, SyncError> {
        draft.check().map_err(SyncError::Validation)?;
        if !self.can_create() {
            return Err(self.not_permitted(R::CREATE_VERB));
        }
        let _busy = self.begin()?;

        let result = self.api.create(draft).await;
        self.apply(result, R::CREATE_VERB, |items, created| {
            let created = Arc::new(created);
            // A retried submission can come back with an id already listed.
            match items.iter_mut().find(|item| item.id() == created.id()) {
                Some(slot) => *slot = created.clone(),
                None => items.push(created.clone()),
            }
            created
        })
    }

    pub async fn update(
        &self,
        id: &str,
        draft: &R::Update,
    ) -> Result<SyncOutcome<Arc<R>>, SyncError> {
        draft.check().map_err(SyncError::Validation)?;
        let current = self.require(id)?;
        if !self.affordances(&current).edit {
            return Err(self.not_permitted("update"));
        }
        let _busy = self.begin()?;

        let result = self.api.update(id, draft).await;
        self.apply(result, "update", |items, updated| {
            let updated = Arc::new(updated);
            if let Some(slot) = items.iter_mut().find(|item| item.id() == id) {
                *slot = updated.clone();
            }
            updated
        })
    }

    pub async fn delete(&self, id: &str) -> Result<SyncOutcome<()>, SyncError> {
        let current = self.require(id)?;
        if !self.affordances(&current).delete {
            return Err(self.not_permitted("delete"));
        }
        let _busy = self.begin()?;

        let result = self.api.delete(id).await;
        self.apply(result, "delete", |items, ()| {
            items.retain(|item| item.id() != id);
        })
    }

    // ---- private helpers ----

    fn begin(&self) -> Result<BusyGuard<'_>, SyncError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| SyncError::Busy)
    }

    fn require(&self, id: &str) -> Result<Arc<R>, SyncError> {
        self.get(id).ok_or_else(|| SyncError::UnknownItem {
            label: R::LABEL,
            id: id.to_string(),
        })
    }

    fn not_permitted(&self, action: &'static str) -> SyncError {
        SyncError::NotPermitted {
            action,
            label: R::LABEL,
        }
    }

    /// Fold a mutation's server answer into the view.
    fn apply<T, U>(
        &self,
        result: Result<T, ApiError>,
        verb: &'static str,
        on_success: impl FnOnce(&mut Vec<Arc<R>>, T) -> U,
    ) -> Result<SyncOutcome<U>, SyncError> {
        if !self.is_mounted() {
            debug!(resource = R::PATH, verb, "Mutation response after unmount dropped");
            return Ok(SyncOutcome::Detached);
        }

        let mut state = self.state();
        match result {
            Ok(value) => {
                state.error = None;
                let applied = on_success(&mut state.items, value);
                info!(resource = R::PATH, verb, "Change saved");
                Ok(SyncOutcome::Applied(applied))
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    state.error = Some(format!(
                        "Failed to {verb} {}. Please try again.",
                        R::LABEL
                    ));
                }
                Err(e.into())
            }
        }
    }
}
