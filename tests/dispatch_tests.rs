//! Interceptor behaviour across two independent clients sharing one session.

mod common;

use mockito::Matcher;
use serde_json::{json, Value};
use tempfile::tempdir;

use authkeep::identity::{SessionState, TOKEN_KEY};
use authkeep::storage::KeyValueStore;
use authkeep::surface::Navigator;
use authkeep::AuthError;

use common::{harness, jwt, mock_login};

#[tokio::test]
async fn bearer_is_read_at_send_time() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let first = jwt(2, "admin", 3600);
    let second = jwt(2, "admin", 7200);
    let _login = mock_login(&mut api, &first, 2, "admin").await;
    let with_first = api
        .mock("GET", "/api/items")
        .match_header("authorization", format!("Bearer {}", first).as_str())
        .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"n":1}"#)
        .expect(1)
        .create_async()
        .await;
    let with_second = api
        .mock("GET", "/api/items")
        .match_header("authorization", format!("Bearer {}", second).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"n":2}"#)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&api.url(), "http://127.0.0.1:9", tmp.path());
    h.runtime.session.login("u2@example.com", "pw", true).await.unwrap();
    let v: Value = h.runtime.api.get_json("/api/items").await.unwrap();
    assert_eq!(v["n"], 1);

    // rotate the stored credential; the same client picks it up on the next call
    h.runtime.core().tokens().set_credential(&second).unwrap();
    h.runtime.core().tokens().activate(&second);
    let v: Value = h.runtime.api.get_json("/api/items").await.unwrap();
    assert_eq!(v["n"], 2);

    with_first.assert_async().await;
    with_second.assert_async().await;
}

#[tokio::test]
async fn no_session_means_no_authorization_header() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let public = api
        .mock("GET", "/api/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let h = harness(&api.url(), "http://127.0.0.1:9", tmp.path());
    let _: Value = h.runtime.api.get_json("/api/health").await.unwrap();
    public.assert_async().await;
}

#[tokio::test]
async fn unauthorized_on_second_client_tears_down_ephemeral_session() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let mut analytics = mockito::Server::new_async().await;
    let token = jwt(11, "admin", 3600);
    let _login = mock_login(&mut api, &token, 11, "admin").await;
    let embed = analytics
        .mock("POST", "/api/analytics/get-embed-url")
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(401)
        .create_async()
        .await;

    let h = harness(&api.url(), &analytics.url(), tmp.path());
    h.runtime.session.login("u11@example.com", "pw", false).await.unwrap();
    assert!(h.ephemeral.get(TOKEN_KEY).unwrap().is_some());

    let resp = h.runtime.analytics.embed_url("sales").await;
    embed.assert_async().await;
    assert_eq!(resp.iframe_url, "");
    assert_eq!(resp.error.as_deref(), Some("Failed to fetch embed URL"));

    assert_eq!(h.runtime.session.state(), SessionState::Unauthenticated);
    assert!(h.backends_empty());
    assert!(h.runtime.core().tokens().active_header().is_none());
    assert_eq!(h.nav.current_path(), "/login");
    assert_eq!(h.nav.navigations_to("/login"), 1);
}

#[tokio::test]
async fn concurrent_unauthorized_responses_navigate_once() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let mut analytics = mockito::Server::new_async().await;
    let _login = mock_login(&mut api, &jwt(6, "admin", 3600), 6, "admin").await;
    let _a = api.mock("GET", "/api/orders").with_status(401).expect(1).create_async().await;
    let _b = analytics.mock("GET", "/api/analytics/summary").with_status(401).expect(1).create_async().await;

    let h = harness(&api.url(), &analytics.url(), tmp.path());
    h.runtime.session.login("u6@example.com", "pw", true).await.unwrap();

    let (r1, r2) = futures::join!(
        h.runtime.api.get_json::<Value>("/api/orders"),
        h.runtime.analytics.client().get_json::<Value>("/api/analytics/summary"),
    );
    assert_eq!(r1.unwrap_err(), AuthError::Unauthorized);
    assert_eq!(r2.unwrap_err(), AuthError::Unauthorized);

    assert_eq!(h.nav.navigations_to("/login"), 1);
    assert_eq!(h.runtime.core().teardown_count(), 1);
    assert!(h.backends_empty());
}

#[tokio::test]
async fn unauthorized_while_on_login_surface_does_not_navigate() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let _m = api.mock("GET", "/api/me").with_status(401).create_async().await;
    let h = harness(&api.url(), "http://127.0.0.1:9", tmp.path());
    h.runtime.core().navigator().navigate("/login");

    let err = h.runtime.api.get_json::<Value>("/api/me").await.unwrap_err();
    assert_eq!(err, AuthError::Unauthorized);
    assert_eq!(h.nav.navigations_to("/login"), 1, "only the manual navigation");
}

#[tokio::test]
async fn late_unauthorized_for_replaced_credential_is_ignored() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let _login = mock_login(&mut api, &jwt(9, "admin", 3600), 9, "admin").await;
    let _m = api.mock("GET", "/api/slow").with_status(401).create_async().await;
    let h = harness(&api.url(), "http://127.0.0.1:9", tmp.path());
    h.runtime.session.login("u9@example.com", "pw", true).await.unwrap();

    // the session now injects a newer credential than the one stored for sending
    h.runtime.core().tokens().activate("newer-session-token");
    let err = h.runtime.api.get_json::<Value>("/api/slow").await.unwrap_err();
    assert_eq!(err, AuthError::Unauthorized);
    assert!(h.runtime.session.is_authenticated());
    assert!(h.nav.history().is_empty());
}

#[tokio::test]
async fn other_error_statuses_leave_session_alone() {
    let tmp = tempdir().unwrap();
    let mut api = mockito::Server::new_async().await;
    let _login = mock_login(&mut api, &jwt(4, "admin", 3600), 4, "admin").await;
    let _m = api.mock("POST", "/api/reports").with_status(403).create_async().await;
    let h = harness(&api.url(), "http://127.0.0.1:9", tmp.path());
    h.runtime.session.login("u4@example.com", "pw", true).await.unwrap();

    let err = h.runtime.api.post_json::<_, Value>("/api/reports", &json!({"q": 1})).await.unwrap_err();
    assert_eq!(err, AuthError::Http { status: 403 });
    assert!(h.runtime.session.is_authenticated());
}

#[tokio::test]
async fn embed_url_success() {
    let tmp = tempdir().unwrap();
    let mut analytics = mockito::Server::new_async().await;
    let _m = analytics
        .mock("POST", "/api/analytics/get-embed-url")
        .match_body(Matcher::Json(json!({"dashboard": "ops"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"iframeUrl":"https://bi.example.com/embed/ops?t=1"}"#)
        .create_async()
        .await;
    let h = harness("http://127.0.0.1:9", &analytics.url(), tmp.path());
    let resp = h.runtime.analytics.embed_url("ops").await;
    assert_eq!(resp.iframe_url, "https://bi.example.com/embed/ops?t=1");
    assert!(resp.error.is_none());
}
