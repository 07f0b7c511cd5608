//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use cropwatch_api::state::AppState;
use cropwatch_auth::identity::IdentityResolver;
use cropwatch_auth::jwt::{JwtDecoder, JwtEncoder};
use cropwatch_core::config::AppConfig;
use cropwatch_core::types::UserId;
use cropwatch_database::{MemoryApiTokenStore, MemoryNotificationStore, MemoryUserDirectory};
use cropwatch_entity::user::UserLocation;
use cropwatch_realtime::channel::MemoryGroupRegistry;
use cropwatch_realtime::server::RealtimeEngine;
use cropwatch_service::{AlertFanoutOrchestrator, NotificationComposer, ProximitySearch};

/// Test application context over in-memory backends.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state behind the router
    pub state: AppState,
    /// User directory seeded by [`TestApp::create_user`]
    pub users: Arc<MemoryUserDirectory>,
    /// Everything the fanout persisted
    pub notifications: Arc<MemoryNotificationStore>,
    /// Static API tokens
    pub tokens: Arc<MemoryApiTokenStore>,
    /// Signs session tokens accepted by the server
    pub encoder: JwtEncoder,
}

/// Configuration used by every test app.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config
}

impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test application with a custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let users = Arc::new(MemoryUserDirectory::new());
        let notifications = Arc::new(MemoryNotificationStore::new());
        let tokens = Arc::new(MemoryApiTokenStore::new());

        let resolver = IdentityResolver::new(
            tokens.clone(),
            JwtDecoder::new(&config.auth).expect("Failed to build decoder"),
            users.clone(),
        );
        let encoder = JwtEncoder::new(&config.auth).expect("Failed to build encoder");

        let realtime = RealtimeEngine::new(
            config.realtime.clone(),
            resolver.clone(),
            Arc::new(MemoryGroupRegistry::new()),
        );
        let orchestrator = AlertFanoutOrchestrator::new(
            ProximitySearch::new(users.clone(), config.fanout.proximity_max_results),
            NotificationComposer::new(notifications.clone()),
            Arc::new(realtime.broker.clone()),
            config.fanout.clone(),
        );

        let state = AppState {
            config: Arc::new(config),
            db_pool: None,
            resolver,
            orchestrator: Arc::new(orchestrator),
            realtime,
        };
        let router = cropwatch_api::build_router(state.clone());

        Self {
            router,
            state,
            users,
            notifications,
            tokens,
            encoder,
        }
    }

    /// Create a user at the given coordinates with API token `{username}-token`.
    pub async fn create_user(
        &self,
        username: &str,
        location: Option<(f64, f64)>,
        crops: &[&str],
    ) -> UserId {
        let id = UserId::new();
        self.users
            .upsert(UserLocation {
                id,
                username: username.to_string(),
                latitude: location.map(|(lat, _)| lat),
                longitude: location.map(|(_, lon)| lon),
                crops: crops.iter().map(|c| c.to_string()).collect(),
            })
            .await;
        self.tokens.insert(format!("{username}-token"), id).await;
        id
    }

    /// Signed session token for `user_id`
    pub fn session_token(&self, user_id: UserId) -> String {
        self.encoder
            .issue(user_id, 3600)
            .expect("Failed to issue session token")
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the router on an ephemeral local port.
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });
        addr
    }

    /// Polls until `user_id` has exactly `expected` live subscriptions.
    pub async fn wait_for_subscribers(&self, user_id: UserId, expected: usize) {
        let broker = &self.state.realtime.broker;
        tokio::time::timeout(Duration::from_secs(5), async {
            while broker.subscriber_count(user_id) != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Subscriber count did not settle");
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
