use std::sync::Arc;

use storefront_types::domain::order::{
    Order, OrderDetails, OrderLine, OrderStatus, ProductSummary, ShippingDetails,
};
use storefront_types::ports::store::{OrderFilter, RepoError, Store, UnitOfWork};
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::application::finish;
use crate::errors::AppError;

const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Checkout and the order lifecycle.
///
/// Checkout converts the user's cart into an order in a single unit of work:
/// stock is taken for every line, the order is inserted and the cart is
/// emptied, or nothing happens at all.
pub struct OrderService<S: Store> {
    store: Arc<S>,
    carts: CartService<S>,
}

impl<S: Store> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            carts: self.carts.clone(),
        }
    }
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>, carts: CartService<S>) -> Self {
        Self { store, carts }
    }

    pub async fn create_order_from_cart(
        &self,
        user_id: &str,
        shipping: ShippingDetails,
    ) -> Result<Order, AppError> {
        if user_id.trim().is_empty() {
            return Err(AppError::BadRequest("user id cannot be empty".into()));
        }
        shipping.validate()?;

        let mut uow = self.store.begin().await?;
        let result = self.checkout_in(uow.as_mut(), user_id, shipping).await;
        let order = finish(uow, result).await?;
        tracing::info!(
            order_number = %order.order_number,
            user_id,
            total_cents = order.total_cents,
            items = order.items.len(),
            "order created"
        );
        Ok(order)
    }

    async fn checkout_in(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: &str,
        shipping: ShippingDetails,
    ) -> Result<Order, AppError> {
        let Some((cart, items)) = self.carts.load_in(uow, user_id).await? else {
            return Err(AppError::EmptyCart);
        };
        if items.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let Some(mut product) = uow.product(item.product_id).await? else {
                tracing::warn!(
                    user_id,
                    product_id = %item.product_id,
                    "cart line references a deleted product, skipping"
                );
                continue;
            };
            product.take_stock(item.quantity)?;
            uow.save_product(&product).await?;
            lines.push(OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            });
        }
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let mut order = Order::new(user_id, shipping, lines)?;
        insert_with_fresh_number(uow, &mut order).await?;
        self.carts.clear_in(uow, cart.id).await?;
        Ok(order)
    }

    /// Administrative status change. Moves outside the lifecycle are allowed
    /// but logged.
    pub async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut order = uow
                .order(id)
                .await?
                .ok_or_else(|| AppError::OrderNotFound(id.to_string()))?;
            if order.status != status && !order.status.can_transition_to(status) {
                tracing::warn!(
                    order_number = %order.order_number,
                    from = %order.status,
                    to = %status,
                    "status change outside the order lifecycle"
                );
            }
            order.set_status(status);
            uow.update_order(&order).await?;
            Ok::<_, AppError>(order)
        }
        .await;
        let order = finish(uow, result).await?;
        tracing::info!(order_number = %order.order_number, status = %order.status, "order status updated");
        Ok(order)
    }

    /// Cancels a Pending or Processing order and puts its units back in
    /// stock. Returns `false` when the order does not exist.
    pub async fn cancel_order(&self, id: Uuid) -> Result<bool, AppError> {
        let mut uow = self.store.begin().await?;
        let result = Self::cancel_in(uow.as_mut(), id).await;
        let cancelled = finish(uow, result).await?;
        if cancelled {
            tracing::info!(order_id = %id, "order cancelled");
        }
        Ok(cancelled)
    }

    async fn cancel_in(uow: &mut dyn UnitOfWork, id: Uuid) -> Result<bool, AppError> {
        let Some(mut order) = uow.order(id).await? else {
            return Ok(false);
        };
        order.cancel()?;

        for item in &order.items {
            match uow.product(item.product_id).await? {
                Some(mut product) => {
                    product.restock(item.quantity);
                    uow.save_product(&product).await?;
                }
                None => tracing::warn!(
                    order_number = %order.order_number,
                    product_id = %item.product_id,
                    "cannot restock a deleted product"
                ),
            }
        }
        uow.update_order(&order).await?;
        Ok(true)
    }

    /// Returns `false` when the order does not exist. Marking twice moves the
    /// paid date forward.
    pub async fn mark_as_paid(&self, id: Uuid) -> Result<bool, AppError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let Some(mut order) = uow.order(id).await? else {
                return Ok::<_, AppError>(false);
            };
            order.mark_paid();
            uow.update_order(&order).await?;
            Ok::<_, AppError>(true)
        }
        .await;
        let paid = finish(uow, result).await?;
        if paid {
            tracing::info!(order_id = %id, "order marked as paid");
        }
        Ok(paid)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<OrderDetails, AppError> {
        let order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| AppError::OrderNotFound(id.to_string()))?;
        self.with_product(order).await
    }

    pub async fn get_by_number(&self, order_number: &str) -> Result<OrderDetails, AppError> {
        let order = self
            .store
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| AppError::OrderNotFound(order_number.to_string()))?;
        self.with_product(order).await
    }

    pub async fn get_by_user(&self, user_id: &str) -> Result<Vec<OrderDetails>, AppError> {
        self.list(&OrderFilter {
            user_id: Some(user_id.to_string()),
            status: None,
        })
        .await
    }

    pub async fn get_by_status(&self, status: OrderStatus) -> Result<Vec<OrderDetails>, AppError> {
        self.list(&OrderFilter {
            user_id: None,
            status: Some(status),
        })
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<OrderDetails>, AppError> {
        self.list(&OrderFilter::default()).await
    }

    /// Newest first.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderDetails>, AppError> {
        let orders = self.store.orders(filter).await?;
        self.with_products(orders).await
    }

    async fn with_product(&self, order: Order) -> Result<OrderDetails, AppError> {
        let products = self.store.products_by_ids(&order.product_ids()).await?;
        Ok(OrderDetails {
            products: products.iter().map(ProductSummary::from).collect(),
            order,
        })
    }

    async fn with_products(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>, AppError> {
        let mut ids: Vec<Uuid> = orders.iter().flat_map(Order::product_ids).collect();
        ids.sort();
        ids.dedup();
        let products = self.store.products_by_ids(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let wanted = order.product_ids();
                let products = products
                    .iter()
                    .filter(|p| wanted.contains(&p.id))
                    .map(ProductSummary::from)
                    .collect();
                OrderDetails { order, products }
            })
            .collect())
    }
}

async fn insert_with_fresh_number(
    uow: &mut dyn UnitOfWork,
    order: &mut Order,
) -> Result<(), AppError> {
    let mut attempt = 1;
    loop {
        match uow.insert_order(order).await {
            Ok(()) => return Ok(()),
            Err(RepoError::Conflict(reason)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!(
                    order_number = %order.order_number,
                    attempt,
                    %reason,
                    "order number taken, drawing a new one"
                );
                order.renumber();
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
