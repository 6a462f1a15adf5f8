mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use fab_orders_api::{
    build_app,
    middleware::auth::{CallerIdentity, issue_token},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{estimate_payload, harness};

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_as(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn submission_status_codes() {
    let h = harness();
    let app = build_app(h.state.clone());

    let (status, body) = send(&app, post_json("/api/orders", &json!({"request_type": "Estimate"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Email is required"));

    let malformed = Request::post("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for _ in 0..5 {
        let (status, body) = send(&app, post_json("/api/orders", &estimate_payload("a@x.com"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert!(body["orderCode"].as_str().unwrap().starts_with("MP-"));
        assert!(body["orderId"].is_string());
    }
    let (status, body) = send(&app, post_json("/api/orders", &estimate_payload("a@x.com"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], json!("Too many submissions. Please try again later."));
}

#[tokio::test]
async fn portal_requires_identity() {
    let h = harness();
    let app = build_app(h.state.clone());
    let secret = h.state.config.jwt_secret.clone();

    let (status, body) = send(&app, post_json("/api/orders", &estimate_payload("a@x.com"))).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["orderId"].as_str().unwrap().to_string();

    let anonymous = Request::get("/api/orders").body(Body::empty()).expect("request");
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_as("/api/orders", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let owner = issue_token(&CallerIdentity::customer("a@x.com"), &secret, 600).unwrap();
    let (status, body) = send(&app, get_as(&format!("/api/orders/{order_id}"), &owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["status"], json!("In Estimating"));

    let other = issue_token(&CallerIdentity::customer("b@x.com"), &secret, 600).unwrap();
    let (status, body) = send(&app, get_as(&format!("/api/orders/{order_id}"), &other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));

    let (status, _) = send(&app, get_as("/api/admin/orders", &owner)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = issue_token(&CallerIdentity::admin("ops@shop.test"), &secret, 600).unwrap();
    let (status, body) = send(&app, get_as("/api/admin/orders?page=1&per_page=5", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], json!(1));
}

#[tokio::test]
async fn upload_and_unknown_routes() {
    let h = harness();
    let app = build_app(h.state.clone());

    let (_, body) = send(&app, post_json("/api/orders", &estimate_payload("a@x.com"))).await;
    let order_id = body["orderId"].as_str().unwrap().to_string();

    let upload = json!({
        "orderId": order_id,
        "filename": "part-A.dxf",
        "fileData": "MApTRUNUSU9O",
        "contentType": "image/vnd.dxf",
    });
    let (status, body) = send(&app, post_json("/api/files", &upload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storagePath"], json!(format!("orders/{order_id}/part-A.dxf")));

    let bad = json!({
        "orderId": order_id,
        "filename": "drawing.exe",
        "fileData": "AA==",
    });
    let (status, body) = send(&app, post_json("/api/files", &bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid file type"));

    let bad_id = json!({
        "orderId": "not-a-uuid",
        "filename": "part.pdf",
        "fileData": "AA==",
    });
    let (status, body) = send(&app, post_json("/api/files", &bad_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Invalid order ID"));

    let no_data = json!({ "orderId": order_id, "filename": "part.pdf" });
    let (status, body) = send(&app, post_json("/api/files", &no_data)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("File data is required"));

    let garbled = Request::post("/api/files")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"orderId\":"))
        .expect("request");
    let (status, body) = send(&app, garbled).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid request body"));

    let (status, body) = send(&app, Request::get("/nope").body(Body::empty()).expect("request")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Not Found"));

    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).expect("request")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));
}
