#![allow(dead_code)]

use std::sync::Arc;

use cabin_client::{Cabin, ClientConfig, MemoryCredentialStore, SessionState};
use cabin_core::Identity;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const API_PREFIX: &str = "/api";

/// A mock backend plus a client wired to it with an in-memory store.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryCredentialStore>,
    pub cabin: Cabin,
}

impl Harness {
    pub async fn received(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

/// Backend path under the API prefix.
pub fn api(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

pub async fn harness_with_store(store: MemoryCredentialStore) -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(store);
    let config = ClientConfig::for_api(format!("{}{API_PREFIX}", server.uri()))
        .expect("mock server URI is a valid base URL");
    let cabin = Cabin::new(&config, store.clone()).expect("client should build");
    Harness {
        server,
        store,
        cabin,
    }
}

pub async fn harness() -> Harness {
    harness_with_store(MemoryCredentialStore::default()).await
}

/// Harness already signed in as `identity` with a live token, without
/// touching the backend.
pub async fn signed_in(identity: Identity) -> Harness {
    let harness = harness().await;
    let token = token_expiring_in(3600);
    let ctx = &harness.cabin.context;
    ctx.attach(token, true);
    ctx.publish(SessionState::Authenticated(Arc::new(identity)));
    harness
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
}

/// Mint an HS256 token that expires `secs` from now (negative for past).
pub fn token_expiring_in(secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::default(),
        &Claims {
            sub: "u1".to_string(),
            exp: now + secs,
            iat: now,
        },
        &EncodingKey::from_secret(b"backend-only-secret"),
    )
    .expect("encoding should succeed")
}

pub fn identity_json(id: &str, permissions: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("Member {id}"),
        "email": format!("{id}@cabin.test"),
        "role": "member",
        "permissions": permissions,
        "createdAt": "2024-01-01T00:00:00Z",
        "lastLogin": "2024-06-01T12:00:00Z"
    })
}

pub fn identity(id: &str, permissions: &[&str]) -> Identity {
    serde_json::from_value(identity_json(id, permissions)).expect("identity fixture")
}

pub fn notice_json(id: &str, author: &str, title: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "content": "See you at the dock",
        "priority": "medium",
        "author": { "_id": author, "name": "Author" },
        "createdAt": "2024-02-01T10:00:00.000Z"
    })
}
