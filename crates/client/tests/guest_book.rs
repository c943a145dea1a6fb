mod common;

use assert_matches::assert_matches;
use cabin_client::guestbook::{GuestError, INVALID_PIN};
use cabin_client::{ApiError, GuestAccess, SessionState};
use cabin_core::resources::GuestEntryDraft;
use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{api, harness, identity, signed_in};

fn entry_json(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "message": "Thanks for the sauna",
        "rating": 5,
        "visitDate": "2024-07-14",
        "approved": true,
        "createdAt": "2024-07-15T09:00:00Z"
    })
}

async fn accept_pin(server: &wiremock::MockServer, pin: &str) {
    Mock::given(method("POST"))
        .and(path(api("/guestbook/verify-pin")))
        .and(body_json(json!({ "pinCode": pin })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn rejected_pin_never_fetches_entries() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(api("/guestbook/verify-pin")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid PIN" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/guestbook")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&h.server)
        .await;
    let guest = h.cabin.guest_book();

    assert_matches!(
        guest.verify("1234").await,
        Err(GuestError::Api(ApiError::Unauthorized { .. }))
    );

    assert_eq!(
        guest.access(),
        GuestAccess::PinRequired {
            error: Some(INVALID_PIN.to_string())
        }
    );
    assert!(guest.entries().is_empty());
}

#[tokio::test]
async fn rejected_pin_leaves_a_member_session_alone() {
    let h = signed_in(identity("u1", &[])).await;
    Mock::given(method("POST"))
        .and(path(api("/guestbook/verify-pin")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let _ = h.cabin.guest_book().verify("9999").await;

    assert_matches!(h.cabin.session.state(), SessionState::Authenticated(_));
    assert!(h.store.current().is_some());
}

#[tokio::test]
async fn malformed_pin_is_rejected_without_a_request() {
    let h = harness().await;
    let guest = h.cabin.guest_book();

    assert_matches!(
        guest.verify("12a").await,
        Err(GuestError::Validation(ref errors)) if errors.first("pinCode") == Some("PIN must be 4 digits")
    );
    assert_eq!(
        guest.access(),
        GuestAccess::PinRequired {
            error: Some("PIN must be 4 digits".to_string())
        }
    );
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn accepted_pin_loads_entries_anonymously() {
    let h = signed_in(identity("u1", &[])).await;
    accept_pin(&h.server, "4821").await;
    Mock::given(method("GET"))
        .and(path(api("/guestbook")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([entry_json("g1", "Lin"), entry_json("g2", "Ari")])),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    let guest = h.cabin.guest_book();

    assert_eq!(guest.verify("4821").await.unwrap(), 2);

    assert_matches!(guest.access(), GuestAccess::Verified { ref pin } if pin.as_str() == "4821");
    assert_eq!(guest.entries().len(), 2);
    let requests = h.server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.headers.contains_key("authorization")));
}

#[tokio::test]
async fn signing_posts_to_the_pin_path_and_appends() {
    let h = harness().await;
    accept_pin(&h.server, "4821").await;
    Mock::given(method("GET"))
        .and(path(api("/guestbook")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry_json("g1", "Lin")])))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/guestbook/guest/4821")))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(201).set_body_json(entry_json("g2", "Ari")))
        .expect(1)
        .mount(&h.server)
        .await;
    let guest = h.cabin.guest_book();
    guest.verify("4821").await.unwrap();

    let visit = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();
    let entry = guest
        .sign(&GuestEntryDraft::new("Ari", "ari@example.com", "Loved the lake", visit))
        .await
        .unwrap();

    assert_eq!(entry.id, "g2");
    let names: Vec<_> = guest.entries().iter().map(|e| e.name.clone()).collect();
    assert_eq!(names, ["Lin", "Ari"]);
}

#[tokio::test]
async fn failed_signing_keeps_entries_and_asks_to_retry() {
    let h = harness().await;
    accept_pin(&h.server, "4821").await;
    Mock::given(method("GET"))
        .and(path(api("/guestbook")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry_json("g1", "Lin")])))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/guestbook/guest/4821")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "db down" })))
        .mount(&h.server)
        .await;
    let guest = h.cabin.guest_book();
    guest.verify("4821").await.unwrap();

    let visit = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();
    let result = guest
        .sign(&GuestEntryDraft::new("Ari", "ari@example.com", "Loved the lake", visit))
        .await;

    assert_matches!(result, Err(GuestError::Api(ApiError::Server { status: 500, .. })));
    assert_eq!(guest.error().as_deref(), Some("Failed to save entry. Please try again."));
    assert_eq!(guest.entries().len(), 1);
}

#[tokio::test]
async fn signing_before_verification_is_refused() {
    let h = harness().await;
    let guest = h.cabin.guest_book();
    let visit = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();

    assert_matches!(
        guest
            .sign(&GuestEntryDraft::new("Ari", "ari@example.com", "Hi", visit))
            .await,
        Err(GuestError::PinRequired)
    );
    assert_matches!(guest.load().await, Err(GuestError::PinRequired));
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn invalid_guest_form_is_rejected_before_pin_check() {
    let h = harness().await;
    let guest = h.cabin.guest_book();
    let visit = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();

    let draft = GuestEntryDraft::new("", "ari@example.com", "Hi", visit).with_rating(0);
    assert_matches!(
        guest.sign(&draft).await,
        Err(GuestError::Validation(ref errors)) if errors.first("rating").is_some()
    );
}
