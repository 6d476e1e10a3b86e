use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::Product;
use crate::domain::error::DomainError;
use crate::domain::money;

/// One cart per user, created lazily on the first add.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A cart line. `unit_price_cents` is captured when the line is created and
/// not re-derived from the product afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(cart_id: Uuid, product: &Product, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            cart_id,
            product_id: product.id,
            quantity,
            unit_price_cents: product.effective_price_cents(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn line_total_cents(&self) -> Result<i64, DomainError> {
        money::line_total_cents(self.unit_price_cents, self.quantity)
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.updated_at = Utc::now();
    }
}

/// Cart line enriched with display data from the current product row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image_url: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub total_cents: i64,
}

impl CartLine {
    pub fn new(item: &CartItem, product: Option<&Product>) -> Result<Self, DomainError> {
        Ok(Self {
            id: item.id,
            product_id: item.product_id,
            product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
            product_image_url: product
                .and_then(|p| p.image_url.clone())
                .unwrap_or_default(),
            unit_price_cents: item.unit_price_cents,
            quantity: item.quantity,
            total_cents: item.line_total_cents()?,
        })
    }
}

/// Read model returned by the cart manager. `id` is `None` for a user who never added anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartView {
    pub id: Option<Uuid>,
    pub user_id: String,
    pub items: Vec<CartLine>,
    pub item_count: u64,
    pub grand_total_cents: i64,
}

impl CartView {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            items: Vec::new(),
            item_count: 0,
            grand_total_cents: 0,
        }
    }

    pub fn new(cart: &Cart, items: Vec<CartLine>) -> Result<Self, DomainError> {
        let item_count = money::sum_quantities(items.iter().map(|l| l.quantity));
        let grand_total_cents = money::sum_cents(items.iter().map(|l| l.total_cents))?;
        Ok(Self {
            id: Some(cart.id),
            user_id: cart.user_id.clone(),
            items,
            item_count,
            grand_total_cents,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
