//! Session token lifecycle: entry gating, duplicate-username
//! handling, admin overrides, and ownership recovery.

mod common;
use common::{TestClient, TestServer};
use serde_json::json;

#[tokio::test]
async fn genesis_requires_admin_code() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    let (status, body) = client
        .post(
            "/join",
            json!({"roomId": "fresh", "passkey": "pk", "username": "alice"}),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "entry_restricted");

    // With the code the same request creates the room.
    client.join_ok("fresh", "pk", "alice", Some("code")).await;
}

#[tokio::test]
async fn wrong_passkey_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    client.join_ok("locked", "right", "alice", Some("code")).await;
    let (status, body) = client
        .post(
            "/join",
            json!({"roomId": "locked", "passkey": "wrong", "username": "bob"}),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "auth_failed");
}

#[tokio::test]
async fn duplicate_username_without_token_is_held() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    client.join_ok("dup", "pk", "alice", Some("code")).await;
    client.join_ok("dup", "pk", "bob", None).await;

    // A second client claiming "bob" with no token is turned away.
    let (status, body) = client
        .post(
            "/join",
            json!({"roomId": "dup", "passkey": "pk", "username": "bob"}),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "session_held");
}

#[tokio::test]
async fn matching_token_renews_the_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    client.join_ok("renew", "pk", "alice", Some("code")).await;
    let bob_token = client.join_ok("renew", "pk", "bob", None).await;

    let (status, body) = client
        .post(
            "/join",
            json!({
                "roomId": "renew",
                "passkey": "pk",
                "username": "bob",
                "sessionToken": bob_token,
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["sessionToken"], bob_token);
}

#[tokio::test]
async fn admin_code_reclaims_identity_with_fresh_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    let old_token = client.join_ok("reclaim", "pk", "alice", Some("code")).await;

    // Same username, no token, but the admin code: the session is
    // handed over and the old token stops working.
    let new_token = client.join_ok("reclaim", "pk", "alice", Some("code")).await;
    assert_ne!(new_token, old_token);

    let (status, body) = client
        .poll("reclaim", "pk", "alice", &old_token, 0, false)
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "session_conflict");

    client.poll_ok("reclaim", "pk", "alice", &new_token, 0).await;
}

#[tokio::test]
async fn poll_with_wrong_token_conflicts() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    client.join_ok("conflict", "pk", "alice", Some("code")).await;
    let (status, body) = client
        .poll("conflict", "pk", "alice", "bogus-token", 0, false)
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "session_conflict");
}

#[tokio::test]
async fn poll_by_non_member_is_not_active() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    client.join_ok("strangers", "pk", "alice", Some("code")).await;
    let (status, body) = client
        .poll("strangers", "pk", "mallory", "whatever", 0, false)
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "not_active");
}

#[tokio::test]
async fn owner_token_restores_creator_after_succession() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    // alice's genesis token doubles as the room's owner token.
    let owner_token = client.join_ok("throne", "pk", "alice", Some("code")).await;
    let bob_token = client.join_ok("throne", "pk", "bob", None).await;

    client
        .post(
            "/leave",
            json!({
                "roomId": "throne",
                "passkey": "pk",
                "username": "alice",
                "explicit": true,
            }),
        )
        .await;
    let poll = client.poll_ok("throne", "pk", "bob", &bob_token, 0).await;
    assert_eq!(poll["creator"], "bob");

    let (status, body) = client
        .post(
            "/join",
            json!({
                "roomId": "throne",
                "passkey": "pk",
                "username": "alice",
                "sessionToken": owner_token,
            }),
        )
        .await;
    assert_eq!(status, 200, "owner return failed: {body}");

    let poll = client.poll_ok("throne", "pk", "bob", &bob_token, 0).await;
    assert_eq!(poll["creator"], "alice");
    let texts: Vec<&str> = poll["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert!(texts.contains(&"alice reclaimed ownership of the room."));
}

#[tokio::test]
async fn missing_fields_are_validation_errors() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server);

    let (status, body) = client
        .post(
            "/join",
            json!({"roomId": "v", "passkey": "pk", "username": "  "}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "validation");
}
