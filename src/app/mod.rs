//! The storefront API: collaborators, handlers and the route table that ties
//! them together.

mod auth;
mod orders;
mod products;
mod uploads;

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::files::{Uploader, Webroot};
use crate::guard::{Guard, TokenIssuer};
use crate::handler::Handler;
use crate::health;
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::Router;
use crate::store::{AccountStore, OrderStore, ProductStore};

/// Long-lived collaborators, constructed once at startup and injected into
/// every handler that needs them.
pub struct State {
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub uploader: Uploader,
    pub webroot: Webroot,
    pub issuer: TokenIssuer,
}

/// Builds the route table. Write operations on products and everything under
/// `/orders` require a bearer token.
pub fn routes(state: Arc<State>, guard: &Guard) -> Router {
    let s = || Arc::clone(&state);

    Router::new()
        .get("/products", with(s(), products::list))
        .post("/products", guard.protect(with(s(), products::create)))
        .get(r"/products/{id:\d+}", with(s(), products::get))
        .put(r"/products/{id:\d+}", guard.protect(with(s(), products::update)))
        .delete(r"/products/{id:\d+}", guard.protect(with(s(), products::delete)))
        .get(r"/uploads/{file:.*\.\w+}", with(s(), uploads::serve))
        .get("/orders", guard.protect(with(s(), orders::list)))
        .post("/orders", guard.protect(with(s(), orders::create)))
        .get(r"/orders/{id:\d+}", guard.protect(with(s(), orders::get)))
        .delete(r"/orders/{id:\d+}", guard.protect(with(s(), orders::delete)))
        .post("/auth/signup", with(s(), auth::sign_up))
        .post("/auth/signin", with(s(), auth::sign_in))
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness)
}

/// Binds shared state to a handler function taking it as first argument.
fn with<S, F, Fut, R>(state: S, f: F) -> impl Handler
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    move |req: Request| f(state.clone(), req)
}
