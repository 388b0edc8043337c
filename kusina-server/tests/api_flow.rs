//! HTTP 端到端流程测试
//!
//! 使用 ServerState::initialize 完整初始化 (临时工作目录)，
//! 通过 build_app + oneshot 走完整中间件栈。

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use kusina_server::api::build_app;
use kusina_server::{Config, ServerState};
use serde_json::{Value, json};
use shared::models::Role;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    state: ServerState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_overrides(dir.path().to_string_lossy(), 0);
        config.menu_file = None;
        config.voucher_file = None;
        config.delivery_zones = "makati=50".to_string();
        config.platform_fee = 10.0;
        config.inquiry_webhook_url = None;

        let state = ServerState::initialize(&config).unwrap();
        let router = build_app(&state).with_state(state.clone());
        Self {
            _dir: dir,
            state,
            router,
        }
    }

    fn token(&self, user_id: &str, role: Role) -> String {
        self.state
            .jwt_service
            .generate_token(user_id, user_id, role)
            .unwrap()
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }
}

fn pickup_draft() -> Value {
    json!({
        "customer_name": "Juan Dela Cruz",
        "customer_phone": "09171234567",
        "items": [
            { "menu_item_id": "adobo", "quantity": 1 },
            { "menu_item_id": "sinigang", "quantity": 1 }
        ],
        "payment_proof_url": "proofs/initial.png"
    })
}

#[tokio::test]
async fn test_health_is_public_and_tagged_with_request_id() {
    let app = TestApp::new();
    let (status, headers, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_orders_require_authentication() {
    let app = TestApp::new();
    let (status, _, body) = app.send("GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, _, _) = app
        .send("GET", "/api/orders", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_menu_is_public() {
    let app = TestApp::new();
    let (status, _, body) = app.send("GET", "/api/menu/items?category=mains", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert!(items.iter().all(|i| i["category_id"] == "mains"));

    let (status, _, body) = app
        .send("GET", "/api/menu/items/sinigang/variants", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["price"], 320.0);

    let (status, _, _) = app
        .send("GET", "/api/menu/items/lechon/variants", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_then_second_order_is_blocked() {
    let app = TestApp::new();
    let customer = app.token("cust-1", Role::Customer);

    let (status, _, body) = app
        .send("POST", "/api/orders", Some(&customer), Some(pickup_draft()))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = &body["data"];
    assert_eq!(order["subtotal"], 250.0);
    assert_eq!(order["platform_fee"], 10.0);
    assert_eq!(order["total"], 260.0);
    assert_eq!(order["status"], "pending");
    let order_id = order["order_id"].as_str().unwrap().to_string();

    let (status, _, body) = app
        .send("POST", "/api/orders", Some(&customer), Some(pickup_draft()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4006);

    let (status, _, body) = app
        .send("GET", "/api/orders/gate", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_active_pending"], true);
    assert_eq!(body["data"]["order"]["order_id"], order_id.as_str());

    // Another customer is not affected
    let other = app.token("cust-2", Role::Customer);
    let (status, _, _) = app
        .send("POST", "/api/orders", Some(&other), Some(pickup_draft()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deny_then_confirm_denial_once() {
    let app = TestApp::new();
    let customer = app.token("cust-1", Role::Customer);
    let owner = app.token("owner-1", Role::Owner);

    let (_, _, body) = app
        .send("POST", "/api/orders", Some(&customer), Some(pickup_draft()))
        .await;
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();

    let (status, _, body) = app
        .send(
            "PATCH",
            &format!("/api/orders/{order_id}"),
            Some(&owner),
            Some(json!({ "status": "denied", "denial_reason": "Out of pork" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "denied");

    let uri = format!("/api/orders/{order_id}/confirm-denial");
    let (status, _, body) = app.send("POST", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["denial_reason"], "Out of pork");

    let (status, _, body) = app.send("POST", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4007);

    // The gate is open again
    let (status, _, _) = app
        .send("POST", "/api/orders", Some(&customer), Some(pickup_draft()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_customer_cannot_read_foreign_order() {
    let app = TestApp::new();
    let alice = app.token("alice", Role::Customer);
    let bob = app.token("bob", Role::Customer);

    let (_, _, body) = app
        .send("POST", "/api/orders", Some(&alice), Some(pickup_draft()))
        .await;
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();

    let (status, _, _) = app
        .send("GET", &format!("/api/orders/{order_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app.send("GET", "/api/orders", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let staff = app.token("staff-1", Role::Staff);
    let (status, _, body) = app.send("GET", "/api/orders", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_round_trip_and_unread_summary() {
    let app = TestApp::new();
    let customer = app.token("cust-1", Role::Customer);
    let staff = app.token("staff-1", Role::Staff);

    let (_, _, body) = app
        .send("POST", "/api/orders", Some(&customer), Some(pickup_draft()))
        .await;
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();
    let messages = format!("/api/orders/{order_id}/messages");

    let (status, _, body) = app
        .send("POST", &messages, Some(&customer), Some(json!({ "body": "Is parking available?" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["kind"], "text");

    let summary = json!({ "order_ids": [order_id.clone(), "missing-order"] });
    let (status, _, body) = app
        .send("POST", "/api/chat/summary", Some(&staff), Some(summary.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let summaries = body["data"].as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["unread_count"], 1);

    let (status, _, body) = app
        .send("POST", &format!("{messages}/read"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["read_up_to"].is_i64());

    let (_, _, body) = app
        .send("POST", "/api/chat/summary", Some(&staff), Some(summary))
        .await;
    assert_eq!(body["data"][0]["unread_count"], 0);

    let (status, _, body) = app.send("GET", &messages, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delivery_fee_and_voucher_lookup() {
    let app = TestApp::new();
    let customer = app.token("cust-1", Role::Customer);

    let (status, _, body) = app
        .send(
            "GET",
            "/api/delivery-fee?address=123%20Ayala%20Ave%2C%20Makati",
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fee"], 50.0);

    let (status, _, body) = app
        .send(
            "POST",
            "/api/vouchers/validate",
            Some(&customer),
            Some(json!({ "code": "NOPE99", "order_amount": 250.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 7001);
}

#[tokio::test]
async fn test_upload_token_is_single_use() {
    let app = TestApp::new();
    let customer = app.token("cust-1", Role::Customer);

    let (status, _, body) = app
        .send("POST", "/api/uploads/url", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let png = {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    };
    let put = |png: Vec<u8>| {
        Request::builder()
            .method("PUT")
            .uri(format!("/api/uploads/{token}"))
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(png))
            .unwrap()
    };

    let response = app.router.clone().oneshot(put(png.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let blob_id = body["data"]["blob_id"].as_str().unwrap().to_string();

    let response = app.router.clone().oneshot(put(png)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/blobs/{blob_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}
