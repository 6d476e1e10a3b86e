pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
