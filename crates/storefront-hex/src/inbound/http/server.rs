use axum::{
    routing::{get, patch, post, put},
    serve, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use crate::application::cart_service::CartService;
use crate::application::catalog_service::CatalogService;
use crate::application::order_service::OrderService;
use crate::ports::store::Store;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

/// Services shared by every handler. All of them sit on the same store.
pub struct AppState<S: Store> {
    pub catalog: Arc<CatalogService<S>>,
    pub carts: Arc<CartService<S>>,
    pub orders: Arc<OrderService<S>>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            carts: self.carts.clone(),
            orders: self.orders.clone(),
        }
    }
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        let carts = CartService::new(store.clone());
        Self {
            catalog: Arc::new(CatalogService::new(store.clone())),
            orders: Arc::new(OrderService::new(store, carts.clone())),
            carts: Arc::new(carts),
        }
    }
}

pub struct HttpServer<S: Store> {
    pub state: AppState<S>,
    pub config: HttpServerConfig,
}

impl<S: Store> HttpServer<S> {
    pub fn new(state: AppState<S>, config: HttpServerConfig) -> Self {
        Self { state, config }
    }

    pub fn router(state: AppState<S>) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/categories",
                get(handlers::list_categories::<S>).post(handlers::create_category::<S>),
            )
            .route(
                "/categories/{id}",
                get(handlers::get_category::<S>)
                    .put(handlers::update_category::<S>)
                    .delete(handlers::delete_category::<S>),
            )
            .route(
                "/products",
                get(handlers::list_products::<S>).post(handlers::create_product::<S>),
            )
            .route(
                "/products/{id}",
                get(handlers::get_product::<S>)
                    .put(handlers::update_product::<S>)
                    .delete(handlers::delete_product::<S>),
            )
            .route("/products/{id}/stock", put(handlers::update_stock::<S>))
            .route("/products/{id}/active", put(handlers::set_product_active::<S>))
            .route(
                "/cart/{user_id}",
                get(handlers::get_cart::<S>).delete(handlers::clear_cart::<S>),
            )
            .route("/cart/{user_id}/count", get(handlers::cart_item_count::<S>))
            .route("/cart/{user_id}/total", get(handlers::cart_total::<S>))
            .route("/cart/{user_id}/items", post(handlers::add_cart_item::<S>))
            .route(
                "/cart/items/{item_id}",
                put(handlers::update_cart_item::<S>).delete(handlers::remove_cart_item::<S>),
            )
            .route(
                "/orders",
                get(handlers::list_orders::<S>).post(handlers::create_order::<S>),
            )
            .route("/orders/{id}", get(handlers::get_order::<S>))
            .route(
                "/orders/number/{order_number}",
                get(handlers::get_order_by_number::<S>),
            )
            .route("/orders/user/{user_id}", get(handlers::list_user_orders::<S>))
            .route("/orders/{id}/status", patch(handlers::update_order_status::<S>))
            .route("/orders/{id}/cancel", post(handlers::cancel_order::<S>))
            .route("/orders/{id}/paid", post(handlers::mark_order_paid::<S>))
            .layer(trace_layer)
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = Self::router(self.state);
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
