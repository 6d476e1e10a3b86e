use std::sync::Arc;

use storefront_types::domain::cart::{Cart, CartItem, CartLine, CartView};
use storefront_types::domain::money;
use storefront_types::ports::store::{Store, UnitOfWork};
use uuid::Uuid;

use crate::application::finish;
use crate::errors::AppError;

/// Per-user shopping carts.
///
/// Every mutation runs in its own unit of work. The `*_in` helpers let the
/// order workflow drive the same cart logic inside its checkout transaction.
pub struct CartService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> CartService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the user's cart, or an empty view when the user has none yet.
    /// Reading never creates a cart.
    pub async fn get_cart(&self, user_id: &str) -> Result<CartView, AppError> {
        let Some(cart) = self.store.cart_for_user(user_id).await? else {
            return Ok(CartView::empty(user_id));
        };
        let items = self.store.cart_items(cart.id).await?;
        let ids: Vec<Uuid> = items.iter().map(|it| it.product_id).collect();
        let products = self.store.products_by_ids(&ids).await?;

        let lines = items
            .iter()
            .map(|it| CartLine::new(it, products.iter().find(|p| p.id == it.product_id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CartView::new(&cart, lines)?)
    }

    /// Adds `quantity` units of a product, merging into an existing line for
    /// the same product. The merged quantity must fit in the current stock.
    pub async fn add_item(
        &self,
        user_id: &str,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<CartLine, AppError> {
        if user_id.trim().is_empty() {
            return Err(AppError::BadRequest("user id cannot be empty".into()));
        }
        if quantity == 0 {
            return Err(AppError::BadRequest("quantity must be > 0".into()));
        }

        let mut uow = self.store.begin().await?;
        let result = self.add_item_in(uow.as_mut(), user_id, product_id, quantity).await;
        let line = finish(uow, result).await?;
        tracing::info!(user_id, %product_id, quantity = line.quantity, "cart line saved");
        Ok(line)
    }

    async fn add_item_in(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: &str,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<CartLine, AppError> {
        let product = uow
            .product(product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        let cart = match uow.cart_for_user(user_id).await? {
            Some(cart) => cart,
            None => {
                let cart = Cart::new(user_id);
                uow.insert_cart(&cart).await?;
                tracing::debug!(user_id, cart_id = %cart.id, "cart created");
                cart
            }
        };

        let existing = uow
            .cart_items(cart.id)
            .await?
            .into_iter()
            .find(|it| it.product_id == product_id);

        let item = match existing {
            Some(mut item) => {
                let merged = item.quantity.saturating_add(quantity);
                product.ensure_stock_for(merged)?;
                item.set_quantity(merged);
                item
            }
            None => {
                product.ensure_stock_for(quantity)?;
                CartItem::new(cart.id, &product, quantity)
            }
        };
        let line = CartLine::new(&item, Some(&product))?;
        uow.save_cart_item(&item).await?;
        Ok(line)
    }

    /// Sets the quantity of a cart line. Zero or less removes the line and
    /// returns `None`.
    pub async fn update_item_quantity(
        &self,
        cart_item_id: Uuid,
        quantity: i64,
    ) -> Result<Option<CartLine>, AppError> {
        let mut uow = self.store.begin().await?;
        let result = self
            .update_item_quantity_in(uow.as_mut(), cart_item_id, quantity)
            .await;
        finish(uow, result).await
    }

    async fn update_item_quantity_in(
        &self,
        uow: &mut dyn UnitOfWork,
        cart_item_id: Uuid,
        quantity: i64,
    ) -> Result<Option<CartLine>, AppError> {
        let mut item = uow
            .cart_item(cart_item_id)
            .await?
            .ok_or_else(|| AppError::CartItemNotFound(cart_item_id.to_string()))?;

        if quantity <= 0 {
            uow.delete_cart_item(cart_item_id).await?;
            tracing::debug!(%cart_item_id, "cart line removed by zero quantity");
            return Ok(None);
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| AppError::BadRequest(format!("quantity {quantity} is too large")))?;

        let product = uow
            .product(item.product_id)
            .await?
            .ok_or(AppError::ProductNotFound(item.product_id))?;
        product.ensure_stock_for(quantity)?;

        item.set_quantity(quantity);
        let line = CartLine::new(&item, Some(&product))?;
        uow.save_cart_item(&item).await?;
        Ok(Some(line))
    }

    pub async fn remove_item(&self, cart_item_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        let result = match uow.delete_cart_item(cart_item_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::CartItemNotFound(cart_item_id.to_string())),
            Err(e) => Err(e.into()),
        };
        finish(uow, result).await
    }

    /// Empties the user's cart. The cart itself is kept.
    pub async fn clear_cart(&self, user_id: &str) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        let result = self.clear_cart_in(uow.as_mut(), user_id).await;
        let removed = finish(uow, result).await?;
        tracing::info!(user_id, removed, "cart cleared");
        Ok(())
    }

    async fn clear_cart_in(&self, uow: &mut dyn UnitOfWork, user_id: &str) -> Result<u64, AppError> {
        let cart = uow
            .cart_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::CartItemNotFound(format!("no cart for user {user_id}")))?;
        self.clear_in(uow, cart.id).await
    }

    /// Total number of units across the user's cart lines.
    pub async fn item_count(&self, user_id: &str) -> Result<u64, AppError> {
        let items = self.items(user_id).await?;
        Ok(money::sum_quantities(items.iter().map(|it| it.quantity)))
    }

    /// Sum of the line totals in the user's cart, in cents.
    pub async fn cart_total(&self, user_id: &str) -> Result<i64, AppError> {
        let totals = self
            .items(user_id)
            .await?
            .iter()
            .map(CartItem::line_total_cents)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(money::sum_cents(totals)?)
    }

    async fn items(&self, user_id: &str) -> Result<Vec<CartItem>, AppError> {
        match self.store.cart_for_user(user_id).await? {
            Some(cart) => Ok(self.store.cart_items(cart.id).await?),
            None => Ok(Vec::new()),
        }
    }

    /// The user's cart and its lines as seen by `uow`.
    pub(crate) async fn load_in(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: &str,
    ) -> Result<Option<(Cart, Vec<CartItem>)>, AppError> {
        let Some(cart) = uow.cart_for_user(user_id).await? else {
            return Ok(None);
        };
        let items = uow.cart_items(cart.id).await?;
        Ok(Some((cart, items)))
    }

    pub(crate) async fn clear_in(
        &self,
        uow: &mut dyn UnitOfWork,
        cart_id: Uuid,
    ) -> Result<u64, AppError> {
        Ok(uow.delete_cart_items(cart_id).await?)
    }
}
