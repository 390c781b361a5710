use std::sync::Arc;

use super::State;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// `GET /uploads/{file}`: streams a stored upload back from the webroot.
pub(super) async fn serve(state: Arc<State>, req: Request) -> Result<Response, Error> {
    let file = req.param("file").unwrap_or_default();
    let (bytes, content_type) = state.webroot.read(&format!("uploads/{file}")).await?;
    Ok(Response::builder()
        .header("cache-control", "public, max-age=86400")
        .bytes(content_type, bytes))
}
