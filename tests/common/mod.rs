//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use storefront::app::{self, State};
use storefront::files::{Uploader, Webroot};
use storefront::store::{MemoryAccounts, MemoryOrders, MemoryProducts, ProductStore};
use storefront::{Claims, Dispatcher, Guard, Request, StatusCode, TokenIssuer};
use tempfile::TempDir;

pub const KEY: &[u8] = b"integration-signing-key";

pub struct TestApp {
    pub dispatcher: Arc<Dispatcher>,
    pub state: Arc<State>,
    // Keeps the webroot alive for the duration of the test.
    pub webroot: TempDir,
}

pub fn app() -> TestApp {
    app_with_products(Arc::new(MemoryProducts::new()))
}

pub fn app_with_products(products: Arc<dyn ProductStore>) -> TestApp {
    let webroot = tempfile::tempdir().expect("tempdir");
    let state = Arc::new(State {
        products,
        orders: Arc::new(MemoryOrders::new()),
        accounts: Arc::new(MemoryAccounts::new()),
        uploader: Uploader::new(webroot.path()),
        webroot: Webroot::new(webroot.path()),
        issuer: TokenIssuer::new(KEY, Duration::from_secs(3600)),
    });
    let router = app::routes(Arc::clone(&state), &Guard::new(KEY));
    TestApp { dispatcher: Arc::new(Dispatcher::new(router)), state, webroot }
}

pub fn token() -> String {
    TokenIssuer::new(KEY, Duration::from_secs(3600)).issue(1, "ann@example.com").unwrap()
}

/// A well-formed token whose expiry is an hour in the past.
pub fn expired_token() -> String {
    let now = jsonwebtoken::get_current_timestamp();
    let claims = Claims { sub: "1".into(), email: "ann@example.com".into(), iat: now - 7200, exp: now - 3600 };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(KEY)).unwrap()
}

/// A valid-looking token signed with the wrong key.
pub fn forged_token() -> String {
    TokenIssuer::new(b"not-the-server-key", Duration::from_secs(3600)).issue(1, "ann@example.com").unwrap()
}

pub fn get(path: &str) -> Request {
    Request::new(http::Method::GET, path)
}

pub fn post(path: &str, body: &str) -> Request {
    Request::new(http::Method::POST, path)
        .with_header("content-type", "application/json")
        .with_body(body.to_owned())
}

pub fn authed(req: Request, token: &str) -> Request {
    req.with_header("authorization", &format!("Bearer {token}"))
}

/// Dispatches `req` and parses the body as JSON (`Null` when empty).
pub async fn send(dispatcher: &Dispatcher, req: Request) -> (StatusCode, Value) {
    let resp = dispatcher.handle(req).await;
    let body = if resp.body().is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(resp.body()).expect("JSON body")
    };
    (resp.status_code(), body)
}
