//! Success messages carried in the response envelope.

pub const CATEGORY_ADDED: &str = "Category added";
pub const CATEGORY_UPDATED: &str = "Category updated";
pub const CATEGORY_DELETED: &str = "Category deleted";
pub const PRODUCT_ADDED: &str = "Product added";
pub const PRODUCT_UPDATED: &str = "Product updated";
pub const PRODUCT_DELETED: &str = "Product deleted";
pub const ITEM_ADDED_TO_CART: &str = "Item added to cart";
pub const CART_UPDATED: &str = "Cart updated";
pub const ITEM_REMOVED_FROM_CART: &str = "Item removed from cart";
pub const CART_CLEARED: &str = "Cart cleared";
pub const ORDER_CREATED: &str = "Order created";
pub const ORDER_STATUS_UPDATED: &str = "Order status updated";
pub const ORDER_CANCELLED: &str = "Order cancelled";
pub const ORDER_MARKED_PAID: &str = "Order marked as paid";
