//! Typed HTTP client for the roomd API.

use serde_json::{Value, json};

use super::server::TestServer;

/// One API client bound to a server instance.
pub struct TestClient {
    http: reqwest::Client,
    base: String,
}

impl TestClient {
    pub fn new(server: &TestServer) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: server.url(),
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .expect("request sent");
        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path_and_query: &str) -> (u16, Value) {
        let resp = self
            .http
            .get(format!("{}{}", self.base, path_and_query))
            .send()
            .await
            .expect("request sent");
        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Join and return the issued session token; panics on failure.
    pub async fn join_ok(
        &self,
        room: &str,
        passkey: &str,
        username: &str,
        admin_code: Option<&str>,
    ) -> String {
        let mut body = json!({
            "roomId": room,
            "passkey": passkey,
            "username": username,
        });
        if let Some(code) = admin_code {
            body["adminCode"] = json!(code);
        }
        let (status, resp) = self.post("/join", body).await;
        assert_eq!(status, 200, "join failed: {resp}");
        resp["sessionToken"]
            .as_str()
            .expect("session token present")
            .to_string()
    }

    /// Send a message, returning the created message object.
    pub async fn send_ok(&self, room: &str, passkey: &str, user: &str, text: &str) -> Value {
        let (status, resp) = self
            .post(
                "/send",
                json!({
                    "roomId": room,
                    "passkey": passkey,
                    "user": user,
                    "text": text,
                }),
            )
            .await;
        assert_eq!(status, 200, "send failed: {resp}");
        resp["message"].clone()
    }

    /// Poll from `since`, returning the whole response body.
    pub async fn poll_ok(
        &self,
        room: &str,
        passkey: &str,
        username: &str,
        token: &str,
        since: i64,
    ) -> Value {
        let (status, resp) = self.poll(room, passkey, username, token, since, false).await;
        assert_eq!(status, 200, "poll failed: {resp}");
        resp
    }

    pub async fn poll(
        &self,
        room: &str,
        passkey: &str,
        username: &str,
        token: &str,
        since: i64,
        is_typing: bool,
    ) -> (u16, Value) {
        self.get(&format!(
            "/poll?roomId={room}&passkey={passkey}&username={username}&sessionToken={token}&since={since}&isTyping={is_typing}"
        ))
        .await
    }
}
