//! storefront-hex: hexagonal storefront library (application services + inbound HTTP)

pub mod config;
pub mod errors;

pub mod application;

pub use storefront_types::{api, domain, envelope, ports};

pub mod inbound; // HTTP adapter (server + handlers)
