//! In-process stores backed by `tokio::sync::RwLock`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Account, AccountStore, NewProduct, Order, OrderStore, Product, ProductStore, StoreError};

/// Rows keyed by an auto-incremented id, starting at 1.
struct Table<T> {
    next_id: u64,
    rows: BTreeMap<u64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { next_id: 1, rows: BTreeMap::new() }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Default)]
pub struct MemoryProducts {
    table: RwLock<Table<Product>>,
}

impl MemoryProducts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProducts {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let product = Product { id, name: product.name, price: product.price, image: product.image };
        table.rows.insert(id, product.clone());
        Ok(product)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Product, StoreError> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    async fn update(&self, id: u64, name: String, price: f64) -> Result<Product, StoreError> {
        let mut table = self.table.write().await;
        let product = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        product.name = name;
        product.price = price;
        Ok(product.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(drop)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }
}

#[derive(Default)]
pub struct MemoryOrders {
    table: RwLock<Table<Order>>,
}

impl MemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn create(&self, product_id: u64, quantity: u32) -> Result<Order, StoreError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let order = Order { id, product_id, quantity };
        table.rows.insert(id, order.clone());
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Order, StoreError> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(drop)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }
}

#[derive(Default)]
pub struct MemoryAccounts {
    table: RwLock<Table<Account>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::Conflict(format!("an account for {email} already exists")));
        }
        let id = table.allocate();
        let account = Account { id, email: email.to_owned(), password_hash: password_hash.to_owned() };
        table.rows.insert(id, account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.table
            .read()
            .await
            .rows
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| StoreError::NotFound("account".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_generated_and_deletes_report_absence() {
        let orders = MemoryOrders::new();
        let a = orders.create(1, 2).await.unwrap();
        let b = orders.create(1, 5).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        orders.delete(a.id).await.unwrap();
        assert!(matches!(orders.delete(a.id).await, Err(StoreError::NotFound(_))));
        assert_eq!(orders.list().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn update_missing_product_is_not_found() {
        let products = MemoryProducts::new();
        let result = products.update(9, "Lamp".into(), 10.0).await;
        assert!(matches!(result, Err(StoreError::NotFound(what)) if what == "product 9"));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let accounts = MemoryAccounts::new();
        accounts.create("ann@example.com", "h").await.unwrap();
        let dup = accounts.create("ANN@example.com", "h").await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
        assert_eq!(accounts.find_by_email("ann@example.com").await.unwrap().id, 1);
    }
}
