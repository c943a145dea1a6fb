mod common;

use assert_matches::assert_matches;
use cabin_client::{ApiError, MemoryCredentialStore, SessionState};
use cabin_core::account::{Credentials, OAuthProvider, PasswordChange, ProfileUpdate, Registration};
use cabin_core::Route;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{api, harness, harness_with_store, identity, identity_json, signed_in, token_expiring_in};

// ---- bootstrap ----

#[tokio::test]
async fn bootstrap_without_credential_is_anonymous_and_offline() {
    let h = harness().await;

    let state = h.cabin.session.bootstrap().await;

    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn bootstrap_with_expired_credential_discards_it_without_network() {
    let h = harness_with_store(MemoryCredentialStore::with_token(token_expiring_in(-60))).await;

    let state = h.cabin.session.bootstrap().await;

    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
    assert_eq!(h.cabin.context.bearer(), None);
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn bootstrap_with_undecodable_credential_is_anonymous() {
    let h = harness_with_store(MemoryCredentialStore::with_token("opaque-garbage")).await;

    assert_eq!(h.cabin.session.bootstrap().await, SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn bootstrap_with_live_credential_fetches_identity_once() {
    let token = token_expiring_in(3600);
    let h = harness_with_store(MemoryCredentialStore::with_token(token.clone())).await;

    Mock::given(method("GET"))
        .and(path(api("/users/me")))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_json("u1", &["calendar.create"])))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.cabin.session.bootstrap().await;

    let identity = state.identity().expect("should be authenticated");
    assert_eq!(identity.id, "u1");
    assert!(h.cabin.session.has_permission("calendar.create"));
    assert_eq!(h.store.current(), Some(token));
}

#[tokio::test]
async fn bootstrap_identity_failure_discards_credential_silently() {
    let h = harness_with_store(MemoryCredentialStore::with_token(token_expiring_in(3600))).await;

    Mock::given(method("GET"))
        .and(path(api("/users/me")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.cabin.session.bootstrap().await;

    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
    assert_eq!(h.cabin.session.last_error(), None);
}

#[tokio::test]
async fn bootstrap_passes_through_loading() {
    let h = harness_with_store(MemoryCredentialStore::with_token(token_expiring_in(3600))).await;
    Mock::given(method("GET"))
        .and(path(api("/users/me")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(identity_json("u1", &[]))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .mount(&h.server)
        .await;

    let mut states = h.cabin.context.subscribe();
    let session = &h.cabin.session;
    let (final_state, saw_loading) = tokio::join!(session.bootstrap(), async {
        states
            .wait_for(|s| *s == SessionState::Loading)
            .await
            .is_ok()
    });

    assert!(saw_loading);
    assert!(final_state.identity().is_some());
}

// ---- login ----

#[tokio::test]
async fn login_establishes_session_with_permissions() {
    let h = harness().await;
    h.cabin.session.bootstrap().await;

    Mock::given(method("POST"))
        .and(path(api("/auth/login")))
        .and(body_json(json!({ "email": "a@x.com", "password": "secret" })))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t1",
            "user": { "id": "u1", "permissions": ["calendar.create"] }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let identity = h
        .cabin
        .session
        .login(&Credentials::new("a@x.com", "secret"))
        .await
        .unwrap();

    assert_eq!(identity.id, "u1");
    assert_eq!(h.cabin.session.identity().map(|i| i.id.clone()).as_deref(), Some("u1"));
    assert!(h.cabin.session.has_permission("calendar.create"));
    assert!(!h.cabin.session.has_permission("calendar.delete"));
    assert_eq!(h.store.current().as_deref(), Some("t1"));
}

#[tokio::test]
async fn login_request_never_carries_a_credential() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("POST"))
        .and(path(api("/auth/login")))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(418))
        .expect(0)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/auth/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t2",
            "user": identity_json("u2", &[])
        })))
        .mount(&h.server)
        .await;

    let identity = h
        .cabin
        .session
        .login(&Credentials::new("b@x.com", "secret"))
        .await
        .unwrap();
    assert_eq!(identity.id, "u2");
}

#[tokio::test]
async fn failed_login_surfaces_server_message_and_keeps_existing_session() {
    let h = signed_in(identity("u1", &["notices.create"])).await;
    let before = h.cabin.context.bearer();

    Mock::given(method("POST"))
        .and(path(api("/auth/login")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })))
        .mount(&h.server)
        .await;

    let err = h
        .cabin
        .session
        .login(&Credentials::new("a@x.com", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.message, "Invalid credentials");
    assert_eq!(h.cabin.session.last_error().as_deref(), Some("Invalid credentials"));
    // A 401 to an anonymous request is an ordinary failure.
    assert_eq!(h.cabin.context.bearer(), before);
    assert!(h.cabin.session.identity().is_some());
}

#[tokio::test]
async fn login_failure_without_message_uses_fallback() {
    let h = harness().await;
    h.cabin.session.bootstrap().await;
    Mock::given(method("POST"))
        .and(path(api("/auth/login")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&h.server)
        .await;

    let err = h
        .cabin
        .session
        .login(&Credentials::new("a@x.com", "secret"))
        .await
        .unwrap_err();

    assert_eq!(err.message, "Login failed");
    assert_eq!(h.cabin.session.state(), SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
}

#[tokio::test]
async fn oauth_login_posts_access_token_to_provider_endpoint() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(api("/auth/google")))
        .and(body_json(json!({ "access_token": "ext-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t-oauth",
            "user": identity_json("u9", &[])
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let identity = h
        .cabin
        .session
        .oauth_login(OAuthProvider::Google, "ext-123")
        .await
        .unwrap();
    assert_eq!(identity.id, "u9");
    assert_eq!(h.store.current().as_deref(), Some("t-oauth"));
}

#[tokio::test]
async fn oauth_failure_names_the_provider() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(api("/auth/apple")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let err = h
        .cabin
        .session
        .oauth_login(OAuthProvider::Apple, "ext")
        .await
        .unwrap_err();
    assert_eq!(err.message, "Apple login failed");
}

// ---- register / logout ----

#[tokio::test]
async fn register_does_not_sign_in() {
    let h = harness().await;
    h.cabin.session.bootstrap().await;
    Mock::given(method("POST"))
        .and(path(api("/auth/register")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "Registered" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let response = h
        .cabin
        .session
        .register(&Registration {
            name: "Lin".to_string(),
            email: "lin@x.com".to_string(),
            password: "long-enough".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response["message"], "Registered");
    assert_eq!(h.cabin.session.state(), SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
}

#[tokio::test]
async fn register_maps_server_field_errors() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(api("/auth/register")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Email already registered",
            "errors": { "email": "Email already registered" }
        })))
        .mount(&h.server)
        .await;

    let err = h
        .cabin
        .session
        .register(&Registration {
            name: "Lin".to_string(),
            email: "lin@x.com".to_string(),
            password: "long-enough".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.message, "Email already registered");
    assert_eq!(err.fields.first("email"), Some("Email already registered"));
}

#[tokio::test]
async fn logout_clears_everything_without_network() {
    let h = signed_in(identity("u1", &["calendar.create"])).await;

    h.cabin.session.logout();

    assert_eq!(h.cabin.session.state(), SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
    assert!(!h.cabin.session.has_permission("calendar.create"));
    assert_eq!(h.received().await, 0);
}

// ---- profile ----

#[tokio::test]
async fn profile_update_replaces_identity() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("PUT"))
        .and(path(api("/users/me")))
        .and(body_json(json!({
            "name": "Ada L.",
            "email": "u1@cabin.test",
            "phone": "",
            "bio": "Boat person"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "name": "Ada L.", "email": "u1@cabin.test", "bio": "Boat person"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut update = ProfileUpdate::from_identity(&identity("u1", &[]));
    update.name = "Ada L.".to_string();
    update.bio = Some("Boat person".to_string());

    let identity = h.cabin.session.update_profile(&update).await.unwrap();
    assert_eq!(identity.name, "Ada L.");
    assert_eq!(h.cabin.session.identity().unwrap().name, "Ada L.");
}

#[tokio::test]
async fn profile_update_failure_keeps_prior_identity() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("PUT"))
        .and(path(api("/users/me")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let update = ProfileUpdate::from_identity(&identity("u1", &[]));
    let err = h.cabin.session.update_profile(&update).await.unwrap_err();

    assert_eq!(err.message, "Profile update failed");
    assert_eq!(h.cabin.session.identity().unwrap().name, "Member u1");
}

#[tokio::test]
async fn password_change_sends_camel_case_body() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("PUT"))
        .and(path(api("/users/me/password")))
        .and(body_json(json!({
            "currentPassword": "old-secret",
            "newPassword": "new-secret-1",
            "confirmPassword": "new-secret-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let change = PasswordChange::new("old-secret", "new-secret-1", "new-secret-1");
    h.cabin.session.change_password(&change).await.unwrap();
    assert_matches!(h.cabin.session.state(), SessionState::Authenticated(_));
}

#[tokio::test]
async fn password_change_rejection_keeps_session() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("PUT"))
        .and(path(api("/users/me/password")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "message": "Current password is incorrect" })),
        )
        .mount(&h.server)
        .await;

    let change = PasswordChange::new("wrong", "new-secret-1", "new-secret-1");
    let err = h.cabin.session.change_password(&change).await.unwrap_err();

    assert_eq!(err.message, "Current password is incorrect");
    assert!(h.cabin.session.identity().is_some());
    assert!(h.store.current().is_some());
}

// ---- global 401 ----

#[tokio::test]
async fn any_authenticated_401_tears_down_and_redirects_to_login() {
    let h = signed_in(identity("u1", &[])).await;
    h.cabin.context.navigate(Route::Documents);
    Mock::given(method("GET"))
        .and(path(api("/documents")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let result = h.cabin.api.get::<serde_json::Value>("documents").await;

    assert_matches!(result, Err(ApiError::Unauthorized { .. }));
    assert_eq!(h.cabin.session.state(), SessionState::Anonymous);
    assert_eq!(h.store.current(), None);
    assert_eq!(h.cabin.context.route(), Route::Login);
}

#[tokio::test]
async fn late_401_for_old_credential_does_not_clear_new_login() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("GET"))
        .and(path(api("/notices")))
        .respond_with(
            ResponseTemplate::new(401).set_delay(std::time::Duration::from_millis(150)),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/auth/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t-new",
            "user": identity_json("u2", &[])
        })))
        .mount(&h.server)
        .await;

    let api = h.cabin.api.clone();
    let stale = tokio::spawn(async move { api.get::<serde_json::Value>("notices").await });
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    h.cabin
        .session
        .login(&Credentials::new("b@x.com", "secret"))
        .await
        .unwrap();

    assert_matches!(stale.await.unwrap(), Err(ApiError::Unauthorized { .. }));
    assert_eq!(h.store.current().as_deref(), Some("t-new"));
    assert_eq!(
        h.cabin.session.identity().map(|i| i.id.clone()).as_deref(),
        Some("u2")
    );
}
