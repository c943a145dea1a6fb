//! Sign-in lifecycle: bootstrap, login, OAuth, registration, logout and
//! profile changes.
//!
//! Failures are translated here into a [`SessionError`] carrying only
//! something a form can show; raw transport errors stop at this boundary.

use std::sync::{Arc, Mutex, PoisonError};

use cabin_core::account::{Credentials, OAuthProvider, PasswordChange, ProfileUpdate, Registration};
use cabin_core::{Draft, FormErrors, Identity};
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::context::{SessionContext, SessionState};
use crate::credential;
use crate::error::ApiError;
use crate::http::{ApiClient, Auth};

/// Displayable failure of a session operation, with any field-level
/// messages the form should attach.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SessionError {
    pub message: String,
    pub fields: FormErrors,
}

impl SessionError {
    fn invalid(errors: FormErrors) -> Self {
        Self {
            message: errors.to_string(),
            fields: errors,
        }
    }

    /// Server message when there is one, `fallback` otherwise.
    fn from_api(error: &ApiError, fallback: &str) -> Self {
        Self {
            message: error.server_message().unwrap_or(fallback).to_string(),
            fields: error.fields(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: Identity,
}

/// Session store over a shared [`ApiClient`].
pub struct Session {
    api: ApiClient,
    error: Mutex<Option<String>>,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            error: Mutex::new(None),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        self.api.context()
    }

    pub fn state(&self) -> SessionState {
        self.context().state()
    }

    pub fn identity(&self) -> Option<Arc<Identity>> {
        self.context().identity()
    }

    /// False with no session; set membership otherwise.
    pub fn has_permission(&self, name: &str) -> bool {
        self.context().has_permission(name)
    }

    /// Message from the most recent failed operation, cleared when the
    /// next one starts.
    pub fn last_error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_error(&self, message: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    /// Fail with `error`, remembering its message.
    fn fail<T>(&self, error: SessionError) -> Result<T, SessionError> {
        self.set_error(Some(error.message.clone()));
        Err(error)
    }

    /// Resolve the stored credential into a session. Never fails: every
    /// problem ends in [`SessionState::Anonymous`] without surfacing.
    pub async fn bootstrap(&self) -> SessionState {
        let ctx = self.context();

        let stored = match ctx.stored_credential() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not read stored credential");
                None
            }
        };
        let Some(token) = stored else {
            ctx.publish(SessionState::Anonymous);
            info!("No stored credential; anonymous");
            return ctx.state();
        };

        ctx.publish(SessionState::Loading);

        if !credential::is_live(&token, Utc::now()) {
            ctx.detach();
            ctx.publish(SessionState::Anonymous);
            info!("Stored credential expired; discarded");
            return ctx.state();
        }

        let epoch = ctx.attach(token, false);
        match self.api.get::<Identity>("users/me").await {
            Ok(identity) => {
                info!(user_id = %identity.id, "Session restored");
                ctx.publish_if(epoch, SessionState::Authenticated(Arc::new(identity)));
            }
            Err(e) => {
                debug!(error = %e, "Identity fetch failed during bootstrap");
                if ctx.discard(epoch) {
                    ctx.publish(SessionState::Anonymous);
                }
                info!("Stored credential rejected; anonymous");
            }
        }
        ctx.state()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Arc<Identity>, SessionError> {
        self.set_error(None);
        if let Err(errors) = cabin_core::validation::check(credentials) {
            return self.fail(SessionError::invalid(errors));
        }

        let result = self
            .api
            .send_json::<_, AuthResponse>(Method::POST, "auth/login", credentials, Auth::Anonymous)
            .await;
        self.establish(result, "Login failed")
    }

    /// Exchange a provider's access token for a session.
    pub async fn oauth_login(
        &self,
        provider: OAuthProvider,
        access_token: &str,
    ) -> Result<Arc<Identity>, SessionError> {
        self.set_error(None);
        let result = self
            .api
            .send_json::<_, AuthResponse>(
                Method::POST,
                &format!("auth/{provider}"),
                &json!({ "access_token": access_token }),
                Auth::Anonymous,
            )
            .await;
        self.establish(result, &format!("{} login failed", provider.display_name()))
    }

    fn establish(
        &self,
        result: Result<AuthResponse, ApiError>,
        fallback: &str,
    ) -> Result<Arc<Identity>, SessionError> {
        match result {
            Ok(AuthResponse { token, user }) => {
                let ctx = self.context();
                let identity = Arc::new(user);
                let epoch = ctx.attach(token, true);
                ctx.publish_if(epoch, SessionState::Authenticated(identity.clone()));
                info!(user_id = %identity.id, "Signed in");
                Ok(identity)
            }
            Err(e) => {
                debug!(error = %e, "Sign-in failed");
                self.fail(SessionError::from_api(&e, fallback))
            }
        }
    }

    /// Create an account. Does not sign in; the caller logs in afterwards.
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<serde_json::Value, SessionError> {
        self.set_error(None);
        if let Err(errors) = cabin_core::validation::check(registration) {
            return self.fail(SessionError::invalid(errors));
        }

        match self
            .api
            .send_json(Method::POST, "auth/register", registration, Auth::Anonymous)
            .await
        {
            Ok(response) => {
                info!(email = %registration.email, "Registered");
                Ok(response)
            }
            Err(e) => self.fail(SessionError::from_api(&e, "Registration failed")),
        }
    }

    /// Forget the credential and end the session. Purely local.
    pub fn logout(&self) {
        let ctx = self.context();
        ctx.detach();
        ctx.publish(SessionState::Anonymous);
        self.set_error(None);
        info!("Signed out");
    }

    /// Save profile fields (and avatar, if any). On success the session
    /// identity becomes the server's answer.
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<Arc<Identity>, SessionError> {
        const FAILED: &str = "Profile update failed";
        self.set_error(None);
        if let Err(errors) = update.check() {
            return self.fail(SessionError::invalid(errors));
        }
        let payload = match update.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Could not encode profile update");
                return self.fail(SessionError {
                    message: FAILED.to_string(),
                    fields: FormErrors::new(),
                });
            }
        };

        let epoch = self.context().epoch();
        match self
            .api
            .send_payload::<Identity>(Method::PUT, "users/me", payload, Auth::Session)
            .await
        {
            Ok(identity) => {
                let identity = Arc::new(identity);
                self.context()
                    .publish_if(epoch, SessionState::Authenticated(identity.clone()));
                info!(user_id = %identity.id, "Profile updated");
                Ok(identity)
            }
            Err(e) => self.fail(SessionError::from_api(&e, FAILED)),
        }
    }

    /// Change the account password. The session itself is untouched.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), SessionError> {
        self.set_error(None);
        if let Err(errors) = change.check() {
            return self.fail(SessionError::invalid(errors));
        }

        match self
            .api
            .send_json::<_, serde_json::Value>(Method::PUT, "users/me/password", change, Auth::Session)
            .await
        {
            Ok(_) => {
                info!("Password updated");
                Ok(())
            }
            Err(e) => self.fail(SessionError::from_api(&e, "Password update failed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::credential::MemoryCredentialStore;

    fn offline_session() -> Session {
        let ctx = SessionContext::new(Arc::new(MemoryCredentialStore::default()));
        // Nothing listens here; tests below must not reach the network.
        let config = ClientConfig::for_api("http://127.0.0.1:9/api").unwrap();
        Session::new(ApiClient::new(&config, ctx).unwrap())
    }

    #[tokio::test]
    async fn invalid_credentials_never_reach_the_network() {
        let session = offline_session();
        let err = session
            .login(&Credentials::new("not-an-email", ""))
            .await
            .unwrap_err();

        assert_eq!(err.fields.first("email"), Some("Enter a valid email"));
        assert_eq!(err.fields.first("password"), Some("Password is required"));
        assert_eq!(session.last_error(), Some(err.message));
        assert_eq!(session.state(), SessionState::Unknown);
    }

    #[tokio::test]
    async fn logout_is_local_and_synchronous() {
        let session = offline_session();
        session.context().attach("t1".to_string(), true);
        session.context().publish(SessionState::Loading);

        session.logout();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.context().bearer(), None);
        assert!(!session.has_permission("calendar.create"));
    }

    #[tokio::test]
    async fn password_mismatch_is_caught_locally() {
        let session = offline_session();
        let err = session
            .change_password(&PasswordChange::new("old-pass", "new-password", "new-passw0rd"))
            .await
            .unwrap_err();
        assert_eq!(err.fields.first("confirmPassword"), Some("Passwords must match"));
    }
}
