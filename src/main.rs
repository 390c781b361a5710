//! storefront server binary.
//!
//! Run with:
//!   JWT_KEY=change-me RUST_LOG=storefront=debug cargo run
//!
//! Try:
//!   curl -X POST localhost:8000/auth/signup -d '{"email":"ann@example.com","password":"pw"}'
//!   curl -X POST localhost:8000/auth/signin -d '{"email":"ann@example.com","password":"pw"}'
//!   curl -X POST localhost:8000/products -H "authorization: Bearer $TOKEN" -d '{"name":"Lamp","price":25}'
//!   curl -X POST localhost:8000/orders -H "authorization: Bearer $TOKEN" -d '{"productId":1,"quantity":2}'

use std::sync::Arc;

use storefront::app::{self, State};
use storefront::config::{Config, LogFormat};
use storefront::files::{Uploader, Webroot};
use storefront::store::{MemoryAccounts, MemoryOrders, MemoryProducts};
use storefront::{Dispatcher, Guard, ServeError, Server, TokenIssuer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServeError> {
    let config = Config::load()?;
    init_tracing(config.log_format);
    tracing::debug!(?config, "configuration loaded");

    let key = config.jwt_key.as_bytes();
    let state = Arc::new(State {
        products: Arc::new(MemoryProducts::new()),
        orders: Arc::new(MemoryOrders::new()),
        accounts: Arc::new(MemoryAccounts::new()),
        uploader: Uploader::new(&config.webroot),
        webroot: Webroot::new(&config.webroot),
        issuer: TokenIssuer::new(key, config.token_ttl()),
    });
    let router = app::routes(state, &Guard::new(key));
    tracing::info!(routes = router.len(), "route table compiled");

    Server::bind(config.bind)
        .serve(Dispatcher::with_limits(router, config.limits()))
        .await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storefront=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
