use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::server::AppState;
use crate::api::{
    AddToCartRequest, CreateOrderRequest, SetActiveRequest, UpdateCartItemRequest,
    UpdateStatusRequest, UpdateStockRequest,
};
use crate::application::messages;
use crate::domain::cart::{CartLine, CartView};
use crate::domain::catalog::{
    Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductFilter, ProductUpdate,
};
use crate::domain::order::{Order, OrderDetails, OrderStatus};
use crate::envelope::ApiResponse;
use crate::errors::AppError;
use crate::ports::store::Store;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryListQuery {
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(format!("invalid id `{raw}`: {e}")))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(t)| t)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(t)| t)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::with_data(data)))
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

// catalog

pub async fn list_categories<S: Store>(
    State(state): State<AppState<S>>,
    params: Result<Query<CategoryListQuery>, QueryRejection>,
) -> ApiResult<Vec<Category>> {
    let params = query(params)?;
    ok(state.catalog.list_categories(params.active_only).await?)
}

pub async fn create_category<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> Created<Category> {
    let category = state.catalog.create_category(body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(category, messages::CATEGORY_ADDED)),
    ))
}

pub async fn get_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    ok(state.catalog.get_category(parse_id(&id)?).await?)
}

pub async fn update_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Category> {
    let id = parse_id(&id)?;
    let category = state.catalog.update_category(id, body(payload)?).await?;
    Ok(Json(ApiResponse::ok(category, messages::CATEGORY_UPDATED)))
}

pub async fn delete_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.catalog.delete_category(parse_id(&id)?).await?;
    Ok(Json(ApiResponse::ok_empty(messages::CATEGORY_DELETED)))
}

pub async fn list_products<S: Store>(
    State(state): State<AppState<S>>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
) -> ApiResult<Vec<Product>> {
    let filter = query(filter)?;
    ok(state.catalog.list_products(&filter).await?)
}

pub async fn create_product<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Created<Product> {
    let product = state.catalog.create_product(body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(product, messages::PRODUCT_ADDED)),
    ))
}

pub async fn get_product<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    ok(state.catalog.get_product(parse_id(&id)?).await?)
}

pub async fn update_product<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<Product> {
    let id = parse_id(&id)?;
    let product = state.catalog.update_product(id, body(payload)?).await?;
    Ok(Json(ApiResponse::ok(product, messages::PRODUCT_UPDATED)))
}

pub async fn delete_product<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.catalog.delete_product(parse_id(&id)?).await?;
    Ok(Json(ApiResponse::ok_empty(messages::PRODUCT_DELETED)))
}

pub async fn update_stock<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStockRequest>, JsonRejection>,
) -> ApiResult<Product> {
    let id = parse_id(&id)?;
    let req = body(payload)?;
    let product = state.catalog.update_stock(id, req.stock).await?;
    Ok(Json(ApiResponse::ok(product, messages::PRODUCT_UPDATED)))
}

pub async fn set_product_active<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<SetActiveRequest>, JsonRejection>,
) -> ApiResult<Product> {
    let id = parse_id(&id)?;
    let req = body(payload)?;
    let product = state.catalog.set_product_active(id, req.is_active).await?;
    Ok(Json(ApiResponse::ok(product, messages::PRODUCT_UPDATED)))
}

// cart

pub async fn get_cart<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<CartView> {
    ok(state.carts.get_cart(&user_id).await?)
}

pub async fn clear_cart<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<()> {
    state.carts.clear_cart(&user_id).await?;
    Ok(Json(ApiResponse::ok_empty(messages::CART_CLEARED)))
}

pub async fn cart_item_count<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<u64> {
    ok(state.carts.item_count(&user_id).await?)
}

pub async fn cart_total<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<i64> {
    ok(state.carts.cart_total(&user_id).await?)
}

pub async fn add_cart_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Created<CartLine> {
    let req = body(payload)?;
    let line = state
        .carts
        .add_item(&user_id, req.product_id, req.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(line, messages::ITEM_ADDED_TO_CART)),
    ))
}

pub async fn update_cart_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(item_id): Path<String>,
    payload: Result<Json<UpdateCartItemRequest>, JsonRejection>,
) -> ApiResult<CartLine> {
    let item_id = parse_id(&item_id)?;
    let req = body(payload)?;
    let envelope = match state.carts.update_item_quantity(item_id, req.quantity).await? {
        Some(line) => ApiResponse::ok(line, messages::CART_UPDATED),
        None => ApiResponse::ok_empty(messages::ITEM_REMOVED_FROM_CART),
    };
    Ok(Json(envelope))
}

pub async fn remove_cart_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(item_id): Path<String>,
) -> ApiResult<()> {
    state.carts.remove_item(parse_id(&item_id)?).await?;
    Ok(Json(ApiResponse::ok_empty(messages::ITEM_REMOVED_FROM_CART)))
}

// orders

pub async fn create_order<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Created<Order> {
    let req = body(payload)?;
    let order = state
        .orders
        .create_order_from_cart(&req.user_id, req.shipping)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(order, messages::ORDER_CREATED)),
    ))
}

pub async fn list_orders<S: Store>(
    State(state): State<AppState<S>>,
    params: Result<Query<OrderListQuery>, QueryRejection>,
) -> ApiResult<Vec<OrderDetails>> {
    let orders = match query(params)?.status {
        Some(status) => state.orders.get_by_status(status).await?,
        None => state.orders.get_all().await?,
    };
    ok(orders)
}

pub async fn get_order<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<OrderDetails> {
    ok(state.orders.get_by_id(parse_id(&id)?).await?)
}

pub async fn get_order_by_number<S: Store>(
    State(state): State<AppState<S>>,
    Path(order_number): Path<String>,
) -> ApiResult<OrderDetails> {
    ok(state.orders.get_by_number(&order_number).await?)
}

pub async fn list_user_orders<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<OrderDetails>> {
    ok(state.orders.get_by_user(&user_id).await?)
}

pub async fn update_order_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Order> {
    let id = parse_id(&id)?;
    let req = body(payload)?;
    let order = state.orders.update_status(id, req.status).await?;
    Ok(Json(ApiResponse::ok(order, messages::ORDER_STATUS_UPDATED)))
}

pub async fn cancel_order<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if !state.orders.cancel_order(parse_id(&id)?).await? {
        return Err(AppError::OrderNotFound(id));
    }
    Ok(Json(ApiResponse::ok_empty(messages::ORDER_CANCELLED)))
}

pub async fn mark_order_paid<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if !state.orders.mark_as_paid(parse_id(&id)?).await? {
        return Err(AppError::OrderNotFound(id));
    }
    Ok(Json(ApiResponse::ok_empty(messages::ORDER_MARKED_PAID)))
}
