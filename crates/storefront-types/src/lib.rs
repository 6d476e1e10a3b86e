//! storefront-types: domain model, API request bodies, result envelope and persistence ports shared by every crate.

pub mod api;
pub mod domain;
pub mod envelope;
pub mod ports;
