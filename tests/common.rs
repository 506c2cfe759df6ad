#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc, clippy::must_use_candidate, unreachable_pub)]
use bhromon_messaging::api::{self, MgmtState};
use bhromon_messaging::client::{ClientConfig, MessagingClient, Session};
use bhromon_messaging::config::Config;
use bhromon_messaging::{AppBuilder, connect_storage};
use clap::Parser;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Once;
use tokio::net::TcpListener;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("bhromon_messaging=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// Memory-backed configuration with limits high enough not to interfere.
pub fn get_test_config() -> Config {
    Config::try_parse_from([
        "bhromon-messaging",
        "--storage",
        "memory",
        "--jwt-secret",
        "test_secret",
        "--host",
        "127.0.0.1",
        "--rate-limit-per-second",
        "10000",
        "--rate-limit-burst",
        "10000",
        "--auth-rate-limit-per-second",
        "10000",
        "--auth-rate-limit-burst",
        "10000",
    ])
    .unwrap()
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub token: String,
    pub expires_at: u64,
}

impl TestUser {
    pub fn session(&self) -> Session {
        Session::new(self.token.clone(), self.user_id, self.expires_at)
    }
}

pub struct TestApp {
    pub config: Config,
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        setup_tracing();

        let storage = connect_storage(&config).await.unwrap();
        let app = AppBuilder::new(config.clone()).with_storage(storage).build().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_addr = mgmt_listener.local_addr().unwrap();

        let app_router = api::app_router(config.clone(), app.services);
        let mgmt_router = api::mgmt_router(MgmtState { health_service: app.health_service });

        tokio::spawn(async move {
            axum::serve(listener, app_router.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
        });
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
        });

        Self {
            config,
            server_url: format!("http://{addr}/api"),
            mgmt_url: format!("http://{mgmt_addr}"),
            client: reqwest::Client::new(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.server_url.clone())
    }

    pub fn messaging_client(&self, user: &TestUser) -> MessagingClient {
        MessagingClient::new(self.client_config(), user.session()).unwrap()
    }

    /// Registers a fresh account with the given role ("traveler" or "host").
    pub async fn register_user(&self, role: &str, display_name: &str) -> TestUser {
        let run_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let username = format!("{role}_{run_id}");

        let resp = self
            .client
            .post(format!("{}/auth/register", self.server_url))
            .json(&json!({
                "username": username,
                "password": "password123",
                "displayName": display_name,
                "role": role,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = resp.json().await.unwrap();
        TestUser {
            user_id: body["userId"].as_str().unwrap().parse().unwrap(),
            username,
            display_name: display_name.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
            expires_at: body["expiresAt"].as_u64().unwrap(),
        }
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.get(format!("{}{path}", self.server_url)).bearer_auth(token).send().await.unwrap()
    }

    pub async fn post(&self, token: &str, path: &str, body: &Value) -> reqwest::Response {
        self.client.post(format!("{}{path}", self.server_url)).bearer_auth(token).json(body).send().await.unwrap()
    }

    /// Sends a text message to a recipient, creating the conversation if needed.
    pub async fn send_to(&self, from: &TestUser, to: &TestUser, content: &str) -> Value {
        let resp = self.post(&from.token, "/messages/send", &json!({ "recipientId": to.user_id, "content": content })).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    pub async fn send_in(&self, from: &TestUser, conversation_id: &str, content: &str) -> Value {
        let resp = self
            .post(&from.token, "/messages/send", &json!({ "conversationId": conversation_id, "content": content }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    pub async fn conversations(&self, user: &TestUser) -> Vec<Value> {
        let resp = self.get(&user.token, "/messages/conversations").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["conversations"].as_array().unwrap().clone()
    }

    pub async fn messages(&self, user: &TestUser, conversation_id: &str) -> Vec<Value> {
        let resp = self.get(&user.token, &format!("/messages/conversations/{conversation_id}")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["messages"].as_array().unwrap().clone()
    }
}
