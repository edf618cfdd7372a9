use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use shiptrack_auth::{JwtClaims, Role};
use shiptrack_core::UserId;
use shiptrack_infra::config::{AppConfig, SeedAdmin};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::in_memory(JWT_SECRET)).await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = shiptrack_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(roles: Vec<Role>) -> String {
    mint_jwt_at(roles, Utc::now())
}

fn mint_jwt_at(roles: Vec<Role>, issued_at: chrono::DateTime<Utc>) -> String {
    let claims = JwtClaims {
        sub: UserId::new(),
        email: "tester@example.com".to_string(),
        roles,
        issued_at,
        expires_at: issued_at + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn post_json(client: &reqwest::Client, url: String, token: &str, body: Value) -> reqwest::Response {
    client.post(url).bearer_auth(token).json(&body).send().await.unwrap()
}

async fn create_port(client: &reqwest::Client, srv: &TestServer, token: &str, code: &str) -> Value {
    let res = post_json(
        client,
        srv.url("/ports"),
        token,
        json!({ "code": code, "name": format!("Port {code}"), "country": "XX" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn create_shipment(client: &reqwest::Client, srv: &TestServer, token: &str) -> Value {
    let res = post_json(
        client,
        srv.url("/shipments"),
        token,
        json!({
            "origin_port": "sgsin",
            "destination_port": "NLRTM",
            "weight_kg": "1250.5",
            "volume_cbm": 3,
            "customer_reference": "PO-1001"
        }),
    )
    .await;
    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 201 from create shipment, got {status} body={body}");
    }
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/shipments"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt_at(vec![Role::admin()], Utc::now() - ChronoDuration::hours(1));
    let res = client
        .get(srv.url("/ports"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reflects_token_roles() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::operator()]);

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "operator"));
    let permissions = body["permissions"].as_array().unwrap();
    assert!(permissions.iter().any(|p| p == "shipments.write"));
    assert!(!permissions.iter().any(|p| p == "ports.write"));
}

#[tokio::test]
async fn shipment_lifecycle_create_track_and_history() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::admin()]);
    let client = reqwest::Client::new();

    create_port(&client, &srv, &token, "SGSIN").await;
    create_port(&client, &srv, &token, "NLRTM").await;

    let created = create_shipment(&client, &srv, &token).await;
    let id = created["id"].as_str().unwrap().to_string();
    let tracking = created["tracking_number"].as_str().unwrap().to_string();
    assert!(tracking.starts_with("VTX-"));
    assert!(tracking.ends_with("-0001"));

    let now = Utc::now();
    for (status, offset) in [("OnVessel", 3), ("Packed", 1)] {
        let res = post_json(
            &client,
            srv.url(&format!("/shipments/{id}/status")),
            &token,
            json!({
                "status": status,
                "event_time_utc": (now + ChronoDuration::hours(offset)).to_rfc3339(),
            }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(srv.url(&format!("/shipments/{id}/history")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let history: Value = res.json().await.unwrap();
    let statuses: Vec<&str> = history["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["Received", "Packed", "OnVessel"]);

    let res = client
        .get(srv.url(&format!("/shipments/tracking/{}", tracking.to_lowercase())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let details: Value = res.json().await.unwrap();
    assert_eq!(details["id"], id.as_str());
    assert_eq!(details["origin_port"], "SGSIN");
    assert_eq!(details["current_status"], "OnVessel");
    assert_eq!(details["history"].as_array().unwrap().len(), 3);

    let res = client
        .get(srv.url("/shipments?status=OnVessel&page=1&page_size=10"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn invalid_input_returns_every_violation() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::admin()]);
    let client = reqwest::Client::new();

    create_port(&client, &srv, &token, "SGSIN").await;

    let res = post_json(
        &client,
        srv.url("/shipments"),
        &token,
        json!({
            "origin_port": "SGSIN",
            "destination_port": "ZZZZZ",
            "weight_kg": 0,
            "volume_cbm": -2
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);

    let res = client
        .get(srv.url("/shipments/tracking/VTX-202513-0001"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/shipments/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_and_queries_return_validation_errors() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::admin()]);
    let client = reqwest::Client::new();

    let res = post_json(
        &client,
        srv.url("/shipments"),
        &token,
        json!({
            "origin_port": "SGSIN",
            "destination_port": "NLRTM",
            "weight_kg": "abc",
            "volume_cbm": 3
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("application/json"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let res = client
        .post(srv.url("/ports"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .post(srv.url("/auth/login"))
        .body("email=a")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .get(srv.url("/shipments?page=abc"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn port_details_can_be_updated() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::admin()]);
    let client = reqwest::Client::new();

    let port = create_port(&client, &srv, &token, "SGSIN").await;
    let id = port["id"].as_str().unwrap();

    let res = client
        .patch(srv.url(&format!("/ports/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "Singapore", "country": "SG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Singapore");
    assert_eq!(updated["country"], "SG");
    assert_eq!(updated["code"], "SGSIN");

    let res = client
        .patch(srv.url(&format!("/ports/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": " ", "country": "SG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["errors"], json!(["port name cannot be empty"]));
}

#[tokio::test]
async fn port_in_use_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::admin()]);
    let client = reqwest::Client::new();

    create_port(&client, &srv, &token, "SGSIN").await;
    let nlrtm = create_port(&client, &srv, &token, "NLRTM").await;
    let port_id = nlrtm["id"].as_str().unwrap().to_string();
    let shipment = create_shipment(&client, &srv, &token).await;

    let res = client
        .delete(srv.url(&format!("/ports/{port_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .delete(srv.url(&format!("/shipments/{}", shipment["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/shipments/tracking/{}", shipment["tracking_number"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/ports/{port_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/ports/{port_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let port: Value = res.json().await.unwrap();
    assert_eq!(port["is_active"], false);
}

#[tokio::test]
async fn viewers_cannot_write() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(vec![Role::viewer()]);
    let client = reqwest::Client::new();

    let res = post_json(
        &client,
        srv.url("/ports"),
        &token,
        json!({ "code": "SGSIN", "name": "Singapore", "country": "SG" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/ports"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn seeded_admin_can_log_in_and_refresh() {
    let mut config = AppConfig::in_memory(JWT_SECRET);
    config.seed_admin = Some(SeedAdmin {
        email: "admin@example.com".to_string(),
        password: "bootstrap123".to_string(),
    });
    let srv = TestServer::spawn_with(config).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "admin@example.com", "password": "wrong-pass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "admin@example.com", "password": "bootstrap123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tokens: Value = res.json().await.unwrap();
    assert_eq!(tokens["token_type"], "Bearer");
    let access = tokens["access_token"].as_str().unwrap().to_string();
    let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
}
