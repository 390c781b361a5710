use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;
use serde::Deserialize;

use super::State;
use crate::error::Error;
use crate::request::Request;
use crate::response::Json;
use crate::store::{NewProduct, Product};

#[derive(Deserialize)]
struct ProductInput {
    name: String,
    price: f64,
    #[serde(default)]
    image: Option<ImageUpload>,
}

/// An image sent inline with the product, base64-encoded.
#[derive(Deserialize)]
struct ImageUpload {
    filename: String,
    content: String,
}

impl ProductInput {
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::validation("price must be a non-negative number"));
        }
        Ok(())
    }
}

pub(super) async fn list(state: Arc<State>, _req: Request) -> Result<Json<Vec<Product>>, Error> {
    Ok(Json(state.products.list().await?))
}

pub(super) async fn create(state: Arc<State>, req: Request) -> Result<(StatusCode, Json<Product>), Error> {
    let input: ProductInput = req.json()?;
    input.validate()?;

    let image = match &input.image {
        Some(upload) => {
            let bytes = STANDARD
                .decode(upload.content.as_bytes())
                .map_err(|e| Error::validation(format!("image content is not base64: {e}")))?;
            Some(state.uploader.store(&upload.filename, &bytes).await?)
        }
        None => None,
    };

    let product = state
        .products
        .create(NewProduct { name: input.name.trim().to_owned(), price: input.price, image })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub(super) async fn get(state: Arc<State>, req: Request) -> Result<Json<Product>, Error> {
    let id = req.param_as("id")?;
    Ok(Json(state.products.get(id).await?))
}

pub(super) async fn update(state: Arc<State>, req: Request) -> Result<Json<Product>, Error> {
    let id = req.param_as("id")?;
    let input: ProductInput = req.json()?;
    input.validate()?;
    if input.image.is_some() {
        return Err(Error::validation("images cannot be replaced; create a new product"));
    }
    Ok(Json(state.products.update(id, input.name.trim().to_owned(), input.price).await?))
}

pub(super) async fn delete(state: Arc<State>, req: Request) -> Result<StatusCode, Error> {
    let id = req.param_as("id")?;
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
