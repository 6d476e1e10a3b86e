use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem};
use crate::domain::catalog::{Category, Product, ProductFilter};
use crate::domain::order::{Order, OrderStatus};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.as_ref().map_or(true, |u| *u == order.user_id)
            && self.status.map_or(true, |s| s == order.status)
    }
}

/// Read side of the store plus the entry point for transactional writes.
///
/// Reads through `Store` see committed data only, and a single read never
/// observes a commit halfway through being published. List operations on
/// orders return newest first by order date.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Opens a unit of work. Writers are serialized: the returned handle holds
    /// exclusive write access until it is committed, rolled back or dropped.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError>;

    async fn category(&self, id: Uuid) -> Result<Option<Category>, RepoError>;
    async fn categories(&self, active_only: bool) -> Result<Vec<Category>, RepoError>;

    async fn product(&self, id: Uuid) -> Result<Option<Product>, RepoError>;
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepoError>;
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError>;

    async fn cart_for_user(&self, user_id: &str) -> Result<Option<Cart>, RepoError>;
    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError>;

    async fn order(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, RepoError>;
    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepoError>;
}

/// A transaction over the store.
///
/// Reads observe the writes staged earlier in the same unit. Nothing is
/// visible to other readers before `commit`, and `commit` publishes every
/// staged change as one unit. Dropping the handle without committing
/// discards the staged changes.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn category(&mut self, id: Uuid) -> Result<Option<Category>, RepoError>;
    async fn save_category(&mut self, category: &Category) -> Result<(), RepoError>;

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>, RepoError>;
    async fn save_product(&mut self, product: &Product) -> Result<(), RepoError>;
    async fn delete_product(&mut self, id: Uuid) -> Result<bool, RepoError>;

    async fn cart_for_user(&mut self, user_id: &str) -> Result<Option<Cart>, RepoError>;
    /// Fails with `RepoError::Conflict` when the user already has a cart.
    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), RepoError>;
    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError>;
    async fn cart_item(&mut self, id: Uuid) -> Result<Option<CartItem>, RepoError>;
    async fn save_cart_item(&mut self, item: &CartItem) -> Result<(), RepoError>;
    async fn delete_cart_item(&mut self, id: Uuid) -> Result<bool, RepoError>;
    async fn delete_cart_items(&mut self, cart_id: Uuid) -> Result<u64, RepoError>;

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>, RepoError>;
    /// Stages the order with all of its items. Fails with
    /// `RepoError::Conflict` when the order number is taken.
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepoError>;
    /// Persists the mutable order fields: status, payment flag and dates.
    async fn update_order(&mut self, order: &Order) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}
