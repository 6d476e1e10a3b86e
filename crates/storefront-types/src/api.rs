//! Request bodies of the HTTP API, shared by the server and the client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{OrderStatus, ShippingDetails};

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: u32,
}

/// Zero or a negative quantity removes the line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub shipping: ShippingDetails,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateStockRequest {
    pub stock: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetActiveRequest {
    pub is_active: bool,
}
