//! Integration tests for the OKR backend.

use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::BcryptHasher;
use crate::config::{Config, StorageKind};
use crate::db::{init_database, Repositories, SqliteStore};
use crate::services::Services;
use crate::{create_router, AppState};

const API_KEY: &str = "test-api-key";

/// Install a test subscriber once; `RUST_LOG` turns the output on.
static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_api_key(Some(API_KEY.to_string())).await
    }

    async fn with_api_key(api_key: Option<String>) -> Self {
        Lazy::force(&TRACING);

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repos = Repositories::from_store(SqliteStore::new(pool));

        // Create config
        let config = Config {
            api_key: api_key.clone(),
            storage: StorageKind::Sqlite,
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            session_ttl_hours: 1,
            bcrypt_cost: 4,
        };

        let services = Services::new(
            repos,
            Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            config.session_ttl_hours,
        );
        let state = AppState {
            services: Arc::new(services),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register an account and sign in, returning (token, user id).
    async fn sign_up(&self, email: &str, name: &str) -> (String, String) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "name": name, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn get(&self, token: &str, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, token: &str, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Create a team and return its id.
    async fn create_team(&self, token: &str, name: &str) -> String {
        let resp = self
            .post(token, "/api/teams", json!({ "name": name }))
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

async fn data(resp: Response) -> Value {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true, "unexpected body: {}", body);
    body["data"].clone()
}

async fn error_code(resp: Response) -> (u16, String, String) {
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    (
        status,
        body["error"]["code"].as_str().unwrap().to_string(),
        body["error"]["message"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_missing_api_key() {
    let fixture = TestFixture::new().await;

    // Request without API key
    let resp = Client::new()
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "a@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();

    let (status, code, _) = error_code(resp).await;
    assert_eq!(status, 401);
    assert_eq!(code, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_invalid_api_key() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/teams"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_api_key_optional_when_unset() {
    let fixture = TestFixture::with_api_key(None).await;
    let (token, _) = fixture.sign_up("solo@example.com", "Solo").await;

    let resp = fixture.get(&token, "/api/teams").await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_session_required() {
    let fixture = TestFixture::new().await;

    let resp = fixture.client.get(fixture.url("/api/teams")).send().await.unwrap();
    let (status, code, _) = error_code(resp).await;
    assert_eq!(status, 401);
    assert_eq!(code, "UNAUTHORIZED");

    let resp = fixture.get("not-a-real-token", "/api/teams").await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_session_and_logout() {
    let fixture = TestFixture::new().await;
    let (token, user_id) = fixture.sign_up("alice@example.com", "Alice").await;

    let session = data(fixture.get(&token, "/api/auth/session").await).await;
    assert_eq!(session["id"], user_id.as_str());
    assert_eq!(session["email"], "alice@example.com");
    assert!(session.get("passwordHash").is_none());

    let profile = data(
        fixture
            .put(&token, "/api/auth/profile", json!({ "name": "Alice Liddell" }))
            .await,
    )
    .await;
    assert_eq!(profile["name"], "Alice Liddell");

    let resp = fixture.post(&token, "/api/auth/logout", json!({})).await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.get(&token, "/api/auth/session").await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_register_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "email": "not-an-email", "name": "X", "password": "password123" }))
        .send()
        .await
        .unwrap();
    let (status, code, _) = error_code(resp).await;
    assert_eq!(status, 400);
    assert_eq!(code, "VALIDATION_ERROR");

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "email": "x@example.com", "name": "X", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_invitation_flow() {
    let fixture = TestFixture::new().await;
    let (alice, _) = fixture.sign_up("alice@example.com", "Alice").await;
    let (bob, bob_id) = fixture.sign_up("bob@example.com", "Bob").await;
    let team_id = fixture.create_team(&alice, "Platform").await;

    let invitation = data(
        fixture
            .post(
                &alice,
                &format!("/api/teams/{}/invitations", team_id),
                json!({ "email": "bob@example.com", "role": "member" }),
            )
            .await,
    )
    .await;
    assert_eq!(invitation["status"], "pending");
    let invitation_id = invitation["id"].as_str().unwrap();

    // A second pending invitation for the same email is refused
    let resp = fixture
        .post(
            &alice,
            &format!("/api/teams/{}/invitations", team_id),
            json!({ "email": "bob@example.com", "role": "viewer" }),
        )
        .await;
    let (status, code, message) = error_code(resp).await;
    assert_eq!(status, 409);
    assert_eq!(code, "CONFLICT");
    assert_eq!(message, "A pending invitation already exists for this email");

    let mine = data(fixture.get(&bob, "/api/invitations?status=pending").await).await;
    assert_eq!(mine["total"], 1);

    let member = data(
        fixture
            .post(&bob, &format!("/api/invitations/{}/accept", invitation_id), json!({}))
            .await,
    )
    .await;
    assert_eq!(member["userId"], bob_id.as_str());
    assert_eq!(member["role"], "member");

    let resp = fixture
        .post(&bob, &format!("/api/invitations/{}/accept", invitation_id), json!({}))
        .await;
    let (status, _, message) = error_code(resp).await;
    assert_eq!(status, 409);
    assert_eq!(message, "Invitation is not pending");

    let members = data(fixture.get(&bob, &format!("/api/teams/{}/members", team_id)).await).await;
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_okr_permissions_over_http() {
    let fixture = TestFixture::new().await;
    let (alice, _) = fixture.sign_up("alice@example.com", "Alice").await;
    let (bob, bob_id) = fixture.sign_up("bob@example.com", "Bob").await;
    let team_id = fixture.create_team(&alice, "Growth").await;

    let invitation = data(
        fixture
            .post(
                &alice,
                &format!("/api/teams/{}/invitations", team_id),
                json!({ "email": "bob@example.com", "role": "member" }),
            )
            .await,
    )
    .await;
    fixture
        .post(
            &bob,
            &format!("/api/invitations/{}/accept", invitation["id"].as_str().unwrap()),
            json!({}),
        )
        .await;

    let okr_body = |okr_type: &str| {
        json!({
            "title": "Double activation",
            "type": okr_type,
            "teamId": team_id,
            "year": 2025,
            "quarter": 4,
            "keyResults": [{ "title": "Activation rate", "targetValue": 40.0, "unit": "%" }]
        })
    };

    let resp = fixture.post(&bob, "/api/okrs", okr_body("team")).await;
    let (status, code, message) = error_code(resp).await;
    assert_eq!(status, 403);
    assert_eq!(code, "FORBIDDEN");
    assert_eq!(message, "Only team admins can create team OKRs");

    let created = data(fixture.post(&bob, "/api/okrs", okr_body("personal")).await).await;
    assert_eq!(created["type"], "personal");
    assert_eq!(created["ownerId"], bob_id.as_str());
    let okr_id = created["id"].as_str().unwrap().to_string();
    let key_result_id = created["keyResults"][0]["id"].as_str().unwrap().to_string();

    let progress = data(
        fixture
            .put(
                &bob,
                &format!("/api/key-results/{}/progress", key_result_id),
                json!({ "currentValue": 55.0 }),
            )
            .await,
    )
    .await;
    assert_eq!(progress["currentValue"], 55.0);

    let resp = fixture.post(&alice, "/api/okrs", okr_body("individual")).await;
    assert_eq!(resp.status(), 400);

    let listed = data(
        fixture
            .get(&alice, &format!("/api/teams/{}/okrs?type=personal", team_id))
            .await,
    )
    .await;
    assert_eq!(listed["total"], 1);

    let review = data(
        fixture
            .post(
                &bob,
                &format!("/api/okrs/{}/reviews", okr_id),
                json!({ "type": "progress", "content": "Ahead of plan" }),
            )
            .await,
    )
    .await;
    let resp = fixture
        .delete(&alice, &format!("/api/reviews/{}", review["id"].as_str().unwrap()))
        .await;
    assert_eq!(resp.status(), 403);

    let resp = fixture.delete(&alice, &format!("/api/okrs/{}", okr_id)).await;
    assert_eq!(resp.status(), 200);
    let resp = fixture.get(&bob, &format!("/api/okrs/{}", okr_id)).await;
    let (status, _, message) = error_code(resp).await;
    assert_eq!(status, 404);
    assert_eq!(message, "OKR not found");
}

#[tokio::test]
async fn test_team_lifecycle_over_http() {
    let fixture = TestFixture::new().await;
    let (alice, alice_id) = fixture.sign_up("alice@example.com", "Alice").await;
    let team_id = fixture.create_team(&alice, "Infra").await;

    let team = data(
        fixture
            .put(
                &alice,
                &format!("/api/teams/{}/review-frequency", team_id),
                json!({ "reviewFrequency": "biweekly" }),
            )
            .await,
    )
    .await;
    assert_eq!(team["reviewFrequency"], "biweekly");

    let resp = fixture
        .put(
            &alice,
            &format!("/api/teams/{}/members/{}", team_id, alice_id),
            json!({ "role": "member" }),
        )
        .await;
    let (status, _, message) = error_code(resp).await;
    assert_eq!(status, 409);
    assert_eq!(message, "Cannot remove the last admin of the team");

    let resp = fixture.delete(&alice, &format!("/api/teams/{}", team_id)).await;
    assert_eq!(resp.status(), 200);

    let teams = data(fixture.get(&alice, "/api/teams").await).await;
    assert_eq!(teams["total"], 0);
}
