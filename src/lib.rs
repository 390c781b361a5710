//! # storefront
//!
//! The HTTP pipeline in front of a small products / orders / accounts API.
//!
//! ## The pipeline
//!
//! ```text
//! hyper ─▶ Dispatcher::handle
//!            ├─ decoder   JSON bodies of POST/PUT/PATCH, 400 on malformed input
//!            ├─ router    compiled patterns, registration order, 404 vs 405
//!            ├─ guard     per-route bearer-token check, 401
//!            └─ handler   the resource logic, talking to its collaborators
//! ```
//!
//! Every stage reports failures as [`Error`]; the dispatcher turns each into
//! exactly one JSON response and keeps the process alive through handler
//! panics.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use storefront::{Dispatcher, Error, Guard, Json, Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), storefront::ServeError> {
//!     let guard = Guard::new(b"signing-key");
//!     let app = Router::new()
//!         .get(r"/orders/{id:\d+}", guard.protect(get_order));
//!
//!     Server::bind(([127, 0, 0, 1], 8000).into())
//!         .serve(Dispatcher::new(app))
//!         .await
//! }
//!
//! async fn get_order(req: Request) -> Result<Json<serde_json::Value>, Error> {
//!     let id: u64 = req.param_as("id")?;
//!     Ok(Json(serde_json::json!({ "id": id })))
//! }
//! ```

mod decoder;
mod dispatch;
mod error;
mod guard;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod config;
pub mod files;
pub mod health;
pub mod pattern;
pub mod store;

pub use decoder::decode;
pub use dispatch::{Dispatcher, Limits};
pub use error::{Error, ServeError};
pub use guard::{Claims, Guard, TokenIssuer};
pub use handler::Handler;
pub use http::StatusCode;
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::{Match, Router};
pub use server::{Server, serve_listener};
