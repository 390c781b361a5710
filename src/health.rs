//! Liveness and readiness handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can it serve traffic? Failure → pulled from the load balancer. |
//!
//! Both are public routes registered by [`crate::app::routes`].

use crate::{Error, Request, Response};

/// Always `200 OK`. If the process can answer HTTP at all, it is alive.
pub async fn liveness(_req: Request) -> Result<Response, Error> {
    Ok(Response::json(r#"{"status":"ok"}"#))
}

/// `200 OK` once the route table is serving. The in-memory stores have no
/// warm-up, so readiness coincides with liveness.
pub async fn readiness(_req: Request) -> Result<Response, Error> {
    Ok(Response::json(r#"{"status":"ready"}"#))
}
