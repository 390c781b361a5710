use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::State;
use crate::error::Error;
use crate::request::Request;
use crate::response::Json;
use crate::store::Order;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderInput {
    product_id: u64,
    quantity: u32,
}

/// An order as returned to clients, with a link to fetch it again.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrderView {
    id: u64,
    product_id: u64,
    quantity: u32,
    request: Link,
}

#[derive(Serialize)]
pub(super) struct Link {
    #[serde(rename = "type")]
    method: &'static str,
    url: String,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            product_id: order.product_id,
            quantity: order.quantity,
            request: Link { method: "GET", url: format!("/orders/{}", order.id) },
        }
    }
}

pub(super) async fn list(state: Arc<State>, _req: Request) -> Result<Json<Vec<OrderView>>, Error> {
    let orders = state.orders.list().await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

pub(super) async fn create(state: Arc<State>, req: Request) -> Result<(StatusCode, Json<OrderView>), Error> {
    let input: OrderInput = req.json()?;
    if input.quantity == 0 {
        return Err(Error::validation("quantity must be at least 1"));
    }

    // Unknown products surface as 404 from the product store.
    state.products.get(input.product_id).await?;

    let order = state.orders.create(input.product_id, input.quantity).await?;
    tracing::info!(order = order.id, product = order.product_id, "order created");
    Ok((StatusCode::CREATED, Json(order.into())))
}

pub(super) async fn get(state: Arc<State>, req: Request) -> Result<Json<OrderView>, Error> {
    let id = req.param_as("id")?;
    Ok(Json(state.orders.get(id).await?.into()))
}

pub(super) async fn delete(state: Arc<State>, req: Request) -> Result<StatusCode, Error> {
    let id = req.param_as("id")?;
    state.orders.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
