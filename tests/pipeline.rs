//! End-to-end behaviour of the request pipeline, driven through
//! `Dispatcher::handle` with the real route table and in-memory stores.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use storefront::store::{MemoryProducts, NewProduct, Product, ProductStore, StoreError};
use storefront::{Dispatcher, Error, Guard, Request, Response, Router, StatusCode};

use common::*;

async fn seed_product(app: &TestApp) -> Product {
    app.state
        .products
        .create(NewProduct { name: "Lamp".into(), price: 25.0, image: None })
        .await
        .unwrap()
}

#[tokio::test]
async fn typed_path_parameters_are_extracted() {
    let app = app();
    seed_product(&app).await;

    let (status, body) = send(&app.dispatcher, get("/products/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["name"], "Lamp");

    // `{id:\d+}` never matches a non-numeric segment.
    let (status, body) = send(&app.dispatcher, get("/products/lamp")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn routing_misses_are_404_and_405() {
    let app = app();

    let (status, body) = send(&app.dispatcher, get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("/nowhere"));

    let resp = app.dispatcher.handle(Request::new(http::Method::PATCH, "/products/1")).await;
    assert_eq!(resp.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.header("allow"), Some("GET, PUT, DELETE, HEAD"));
}

#[tokio::test]
async fn guarded_routes_require_a_valid_token() {
    let app = app();
    seed_product(&app).await;
    let order = r#"{"productId":1,"quantity":2}"#;

    let (status, body) = send(&app.dispatcher, post("/orders", order)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "missing bearer credential");

    for bad in [expired_token(), forged_token(), "garbage".to_owned()] {
        let (status, body) = send(&app.dispatcher, authed(post("/orders", order), &bad)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthenticated");
    }
    assert!(app.state.orders.list().await.unwrap().is_empty());

    let (status, _) = send(&app.dispatcher, authed(post("/orders", order), &token())).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn malformed_bodies_are_rejected_before_guard_and_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = move |_req: Request| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(Response::text("ran"))
        }
    };
    let dispatcher = Dispatcher::new(Router::new().post("/things", Guard::new(KEY).protect(handler)));

    // No token at all: a 401 would mean the guard ran first.
    let (status, body) = send(&dispatcher, post("/things", r#"{"name":"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "decode_error");

    let (status, _) = send(&dispatcher, authed(post("/things", "[1,2,,]"), &token())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let resp = dispatcher.handle(authed(post("/things", "{}"), &token())).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.body(), b"ran");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_gets_are_identical() {
    let app = app();
    seed_product(&app).await;

    let first = app.dispatcher.handle(get("/products")).await;
    let second = app.dispatcher.handle(get("/products")).await;
    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(first.status_code(), second.status_code());
    assert_eq!(first.headers(), second.headers());
    assert_eq!(first.body(), second.body());
}

#[tokio::test]
async fn orders_round_trip() {
    let app = app();
    seed_product(&app).await;
    let token = token();

    let (status, body) =
        send(&app.dispatcher, authed(post("/orders", r#"{"productId":1,"quantity":2}"#), &token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["productId"], 1);
    assert_eq!(body["quantity"], 2);
    let id = body["id"].as_u64().expect("generated id");
    assert_eq!(body["request"], json!({"type": "GET", "url": format!("/orders/{id}")}));

    let (status, fetched) = send(&app.dispatcher, authed(get(&format!("/orders/{id}")), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);

    let del = Request::new(http::Method::DELETE, &format!("/orders/{id}"));
    let (status, _) = send(&app.dispatcher, authed(del, &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app.dispatcher, authed(get(&format!("/orders/{id}")), &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ordering_an_unknown_product_is_404() {
    let app = app();

    let (status, body) =
        send(&app.dispatcher, authed(post("/orders", r#"{"productId":99,"quantity":2}"#), &token())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "product 99 not found");
}

#[tokio::test]
async fn invalid_order_input_is_400() {
    let app = app();
    seed_product(&app).await;

    for body in [r#"{"productId":1}"#, r#"{"productId":1,"quantity":0}"#, r#"{"productId":1,"quantity":-3}"#, ""] {
        let (status, resp) = send(&app.dispatcher, authed(post("/orders", body), &token())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(resp["error"], "validation_error");
    }
}

#[tokio::test]
async fn missing_upload_is_404_and_server_keeps_going() {
    let app = app();

    let (status, body) = send(&app.dispatcher, get("/uploads/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app.dispatcher, get("/uploads/../../etc/passwd.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.dispatcher, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn product_images_are_uploaded_and_served() {
    let app = app();
    let payload = json!({
        "name": "Poster",
        "price": 12.5,
        "image": { "filename": "poster.png", "content": STANDARD.encode(b"\x89PNG-data") },
    });

    let (status, product) = send(&app.dispatcher, authed(post("/products", &payload.to_string()), &token())).await;
    assert_eq!(status, StatusCode::CREATED);
    let image = product["image"].as_str().expect("image path");

    let resp = app.dispatcher.handle(get(&format!("/{image}"))).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("image/png"));
    assert_eq!(resp.body(), b"\x89PNG-data");
}

#[tokio::test]
async fn product_writes_are_guarded_reads_are_not() {
    let app = app();
    let body = r#"{"name":"Chair","price":40}"#;

    let (status, _) = send(&app.dispatcher, post("/products", body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.dispatcher, authed(post("/products", body), &token())).await;
    assert_eq!(status, StatusCode::CREATED);

    let put = Request::new(http::Method::PUT, "/products/1")
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"Armchair","price":55}"#);
    let (status, updated) = send(&app.dispatcher, authed(put, &token())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Armchair");

    let (status, listed) = send(&app.dispatcher, get("/products")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn sign_up_then_sign_in_yields_a_working_token() {
    let app = app();
    let creds = r#"{"email":"bo@example.com","password":"correct horse"}"#;

    let (status, account) = send(&app.dispatcher, post("/auth/signup", creds)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["email"], "bo@example.com");

    let (status, _) = send(&app.dispatcher, post("/auth/signup", creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let wrong = r#"{"email":"bo@example.com","password":"battery staple"}"#;
    let (status, _) = send(&app.dispatcher, post("/auth/signin", wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.dispatcher, post("/auth/signin", creds)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, orders) = send(&app.dispatcher, authed(get("/orders"), token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders, json!([]));
}

/// Product store whose listing takes a long time.
struct SlowProducts {
    inner: MemoryProducts,
    delay: Duration,
}

#[async_trait]
impl ProductStore for SlowProducts {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.inner.create(product).await
    }
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list().await
    }
    async fn get(&self, id: u64) -> Result<Product, StoreError> {
        self.inner.get(id).await
    }
    async fn update(&self, id: u64, name: String, price: f64) -> Result<Product, StoreError> {
        self.inner.update(id, name, price).await
    }
    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_collaborator_does_not_block_other_requests() {
    let app = app_with_products(Arc::new(SlowProducts {
        inner: MemoryProducts::new(),
        delay: Duration::from_secs(2),
    }));
    seed_product(&app).await;

    let dispatcher = Arc::clone(&app.dispatcher);
    let slow = tokio::spawn(async move { dispatcher.handle(get("/products")).await });

    let quick = tokio::time::timeout(Duration::from_millis(500), async {
        let (a, b) = tokio::join!(
            send(&app.dispatcher, get("/products/1")),
            send(&app.dispatcher, get("/healthz")),
        );
        (a.0, b.0)
    })
    .await
    .expect("unrelated requests finished while the listing was still pending");
    assert_eq!(quick, (StatusCode::OK, StatusCode::OK));
    assert!(!slow.is_finished());

    assert_eq!(slow.await.unwrap().status_code(), StatusCode::OK);
}
