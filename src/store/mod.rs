//! Storage collaborators.
//!
//! Handlers reach persistent state only through these traits. Implementations
//! own their connections or locks; the pipeline never shares mutable state
//! between requests itself.

mod memory;

pub use memory::{MemoryAccounts, MemoryOrders, MemoryProducts};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Failure reported by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Connection loss, constraint violations the store does not classify, etc.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Error::ResourceNotFound(what),
            StoreError::Conflict(msg) => Error::Conflict(msg),
            StoreError::Backend(e) => Error::Internal(e.context("store operation failed")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    /// Public path of the product image, if one was uploaded.
    pub image: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub product_id: u64,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;
    async fn list(&self) -> Result<Vec<Product>, StoreError>;
    async fn get(&self, id: u64) -> Result<Product, StoreError>;
    async fn update(&self, id: u64, name: String, price: f64) -> Result<Product, StoreError>;
    async fn delete(&self, id: u64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, product_id: u64, quantity: u32) -> Result<Order, StoreError>;
    async fn list(&self) -> Result<Vec<Order>, StoreError>;
    async fn get(&self, id: u64) -> Result<Order, StoreError>;
    async fn delete(&self, id: u64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError>;
}
