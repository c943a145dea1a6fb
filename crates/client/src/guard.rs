//! Route guard: decides per navigation whether a view renders, waits, or
//! redirects, and keeps deciding as the session changes.

use std::sync::Arc;

use cabin_core::Route;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::context::{SessionContext, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Bootstrap still running: show a neutral placeholder, no redirect.
    Waiting,
    Redirect(Route),
    Render,
}

/// Decide for a protected view. Under-privileged members go to the default
/// route, never to login.
pub fn evaluate(state: &SessionState, required: Option<&str>) -> GuardDecision {
    match state {
        SessionState::Unknown | SessionState::Loading => GuardDecision::Waiting,
        SessionState::Anonymous => GuardDecision::Redirect(Route::Login),
        SessionState::Authenticated(identity) => match required {
            Some(permission) if !identity.has_permission(permission) => {
                GuardDecision::Redirect(Route::DEFAULT)
            }
            _ => GuardDecision::Render,
        },
    }
}

/// Decision for any route: public routes always render.
pub fn evaluate_route(state: &SessionState, route: &Route) -> GuardDecision {
    if route.is_protected() {
        evaluate(state, route.required_permission())
    } else {
        GuardDecision::Render
    }
}

/// Wait until the guard can decide for `route` (i.e. bootstrap settles).
pub async fn resolve(
    states: &mut watch::Receiver<SessionState>,
    route: &Route,
) -> GuardDecision {
    loop {
        let decision = evaluate_route(&states.borrow_and_update(), route);
        if decision != GuardDecision::Waiting {
            return decision;
        }
        if states.changed().await.is_err() {
            return decision;
        }
    }
}

/// Re-evaluate the current route on every session or route change and
/// apply redirects through the context. Runs until the context is dropped.
pub fn spawn_enforcer(context: &Arc<SessionContext>) -> JoinHandle<()> {
    let mut states = context.subscribe();
    let mut routes = context.subscribe_route();
    let context = Arc::downgrade(context);

    tokio::spawn(async move {
        loop {
            let Some(ctx) = context.upgrade() else { break };
            let route = routes.borrow_and_update().clone();
            let decision = evaluate_route(&states.borrow_and_update(), &route);
            if let GuardDecision::Redirect(target) = decision {
                debug!(from = %route, to = %target, "Guard redirect");
                ctx.navigate(target);
            }
            drop(ctx);

            tokio::select! {
                changed = states.changed() => if changed.is_err() { break },
                changed = routes.changed() => if changed.is_err() { break },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;
    use cabin_core::{Identity, PermissionSet};
    use std::time::Duration;

    fn member(perms: &[&str]) -> SessionState {
        SessionState::Authenticated(Arc::new(Identity {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@cabin.test".to_string(),
            role: "member".to_string(),
            permissions: perms.iter().copied().collect::<PermissionSet>(),
            avatar: None,
            phone: None,
            bio: None,
            created_at: None,
            last_login: None,
        }))
    }

    #[test]
    fn decision_table() {
        assert_eq!(evaluate(&SessionState::Unknown, None), GuardDecision::Waiting);
        assert_eq!(evaluate(&SessionState::Loading, None), GuardDecision::Waiting);
        assert_eq!(
            evaluate(&SessionState::Anonymous, None),
            GuardDecision::Redirect(Route::Login)
        );
        assert_eq!(evaluate(&member(&[]), None), GuardDecision::Render);
        assert_eq!(
            evaluate(&member(&[]), Some("documents.upload")),
            GuardDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(
            evaluate(&member(&["documents.upload"]), Some("documents.upload")),
            GuardDecision::Render
        );
    }

    #[test]
    fn public_routes_render_for_anonymous() {
        let anonymous = SessionState::Anonymous;
        assert_eq!(evaluate_route(&anonymous, &Route::Login), GuardDecision::Render);
        assert_eq!(
            evaluate_route(&anonymous, &Route::Guest("4821".to_string())),
            GuardDecision::Render
        );
        assert_eq!(
            evaluate_route(&anonymous, &Route::NotFound("/x".to_string())),
            GuardDecision::Render
        );
    }

    #[tokio::test]
    async fn resolve_waits_for_bootstrap_to_settle() {
        let ctx = SessionContext::new(Arc::new(MemoryCredentialStore::default()));
        ctx.publish(SessionState::Loading);
        let mut states = ctx.subscribe();

        let waiter = tokio::spawn(async move { resolve(&mut states, &Route::Calendar).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        ctx.publish(member(&[]));
        assert_eq!(waiter.await.unwrap(), GuardDecision::Render);
    }

    #[tokio::test]
    async fn enforcer_redirects_when_session_ends() {
        let ctx = SessionContext::new(Arc::new(MemoryCredentialStore::default()));
        ctx.publish(member(&[]));
        ctx.navigate(Route::Notices);
        let handle = spawn_enforcer(&ctx);

        let mut routes = ctx.subscribe_route();
        ctx.publish(SessionState::Anonymous);
        tokio::time::timeout(Duration::from_secs(1), routes.wait_for(|r| *r == Route::Login))
            .await
            .expect("guard should redirect")
            .unwrap();

        handle.abort();
    }
}
