use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use storefront_types::domain::error::DomainError;
use storefront_types::domain::order::OrderStatus;
use storefront_types::envelope::ApiResponse;
use storefront_types::ports::store::RepoError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Insufficient stock for {product}: {available} available")]
    InsufficientStock { product: String, available: u32 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Order cannot move from {from} to {to}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::ProductNotFound(_)
                | AppError::CategoryNotFound(_)
                | AppError::CartItemNotFound(_)
                | AppError::OrderNotFound(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. }
            | AppError::EmptyCart
            | AppError::InvalidOrderTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::InsufficientStock {
                product, available, ..
            } => AppError::InsufficientStock { product, available },
            DomainError::InvalidTransition { from, to } => {
                AppError::InvalidOrderTransition { from, to }
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::Internal(anyhow::anyhow!(e.to_string()))
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(e: AppError) -> Self {
        match &e {
            AppError::Internal(inner) => {
                tracing::error!(error = %inner, "internal error");
                ApiResponse::fail("internal error")
            }
            _ => ApiResponse::fail(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = serde_json::to_string(&ApiResponse::<()>::from(self)).unwrap_or_else(|_| {
            "{\"success\":false,\"message\":\"internal serialization\",\"data\":null}".into()
        });
        (code, [("content-type", "application/json")], body).into_response()
    }
}
