use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use storefront_types::domain::cart::{Cart, CartItem};
use storefront_types::domain::catalog::{Category, Product, ProductFilter};
use storefront_types::domain::order::Order;
use storefront_types::ports::store::{OrderFilter, RepoError, Store, UnitOfWork};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    categories: DashMap<Uuid, Category>,
    products: DashMap<Uuid, Product>,
    carts: DashMap<Uuid, Cart>,
    cart_items: DashMap<Uuid, CartItem>,
    // Items live inside their order so an order and its items publish together.
    orders: DashMap<Uuid, Order>,
}

/// Committed reads take `published` shared; `commit` takes it exclusively
/// while it applies the staged tables, so a read never sees half a commit.
#[derive(Clone)]
pub struct InMemoryRepo {
    tables: Arc<Tables>,
    write_gate: Arc<Mutex<()>>,
    published: Arc<RwLock<()>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Tables::default()),
            write_gate: Arc::new(Mutex::new(())),
            published: Arc::new(RwLock::new(())),
        }
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
}

#[async_trait]
impl Store for InMemoryRepo {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        let gate = self.write_gate.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            tables: self.tables.clone(),
            published: self.published.clone(),
            categories: Staged::default(),
            products: Staged::default(),
            carts: Staged::default(),
            cart_items: Staged::default(),
            orders: Staged::default(),
            _gate: gate,
        }))
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        let _read = self.published.read().await;
        Ok(self.tables.categories.get(&id).map(|r| r.value().clone()))
    }

    async fn categories(&self, active_only: bool) -> Result<Vec<Category>, RepoError> {
        let _read = self.published.read().await;
        let mut out: Vec<Category> = self
            .tables
            .categories
            .iter()
            .filter(|kv| !active_only || kv.value().is_active)
            .map(|kv| kv.value().clone())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        let _read = self.published.read().await;
        Ok(self.tables.products.get(&id).map(|r| r.value().clone()))
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepoError> {
        let _read = self.published.read().await;
        let mut out: Vec<Product> = self
            .tables
            .products
            .iter()
            .filter(|kv| filter.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        filter.sort.sort(&mut out);
        Ok(out)
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError> {
        let _read = self.published.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| self.tables.products.get(id).map(|r| r.value().clone()))
            .collect())
    }

    async fn cart_for_user(&self, user_id: &str) -> Result<Option<Cart>, RepoError> {
        let _read = self.published.read().await;
        Ok(self
            .tables
            .carts
            .iter()
            .find(|kv| kv.value().user_id == user_id)
            .map(|kv| kv.value().clone()))
    }

    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError> {
        let _read = self.published.read().await;
        let mut out: Vec<CartItem> = self
            .tables
            .cart_items
            .iter()
            .filter(|kv| kv.value().cart_id == cart_id)
            .map(|kv| kv.value().clone())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let _read = self.published.read().await;
        Ok(self.tables.orders.get(&id).map(|r| r.value().clone()))
    }

    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, RepoError> {
        let _read = self.published.read().await;
        Ok(self
            .tables
            .orders
            .iter()
            .find(|kv| kv.value().order_number == order_number)
            .map(|kv| kv.value().clone()))
    }

    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepoError> {
        let _read = self.published.read().await;
        let mut out: Vec<Order> = self
            .tables
            .orders
            .iter()
            .filter(|kv| filter.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        newest_first(&mut out);
        Ok(out)
    }
}

/// Pending writes for one table; `None` marks a deletion.
struct Staged<T> {
    rows: HashMap<Uuid, Option<T>>,
}

impl<T> Default for Staged<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<T: Clone> Staged<T> {
    fn get(&self, base: &DashMap<Uuid, T>, id: Uuid) -> Option<T> {
        match self.rows.get(&id) {
            Some(staged) => staged.clone(),
            None => base.get(&id).map(|r| r.value().clone()),
        }
    }

    fn filter(&self, base: &DashMap<Uuid, T>, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut out: Vec<T> = base
            .iter()
            .filter(|kv| !self.rows.contains_key(kv.key()) && pred(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        out.extend(self.rows.values().flatten().filter(|v| pred(*v)).cloned());
        out
    }

    fn put(&mut self, id: Uuid, row: T) {
        self.rows.insert(id, Some(row));
    }

    fn remove(&mut self, base: &DashMap<Uuid, T>, id: Uuid) -> bool {
        let existed = self.get(base, id).is_some();
        if existed {
            self.rows.insert(id, None);
        }
        existed
    }

    fn apply(self, base: &DashMap<Uuid, T>) {
        for (id, row) in self.rows {
            match row {
                Some(row) => {
                    base.insert(id, row);
                }
                None => {
                    base.remove(&id);
                }
            }
        }
    }
}

pub struct MemoryUnitOfWork {
    tables: Arc<Tables>,
    published: Arc<RwLock<()>>,
    categories: Staged<Category>,
    products: Staged<Product>,
    carts: Staged<Cart>,
    cart_items: Staged<CartItem>,
    orders: Staged<Order>,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn category(&mut self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self.categories.get(&self.tables.categories, id))
    }

    async fn save_category(&mut self, category: &Category) -> Result<(), RepoError> {
        self.categories.put(category.id, category.clone());
        Ok(())
    }

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>, RepoError> {
        Ok(self.products.get(&self.tables.products, id))
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), RepoError> {
        self.products.put(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&mut self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.products.remove(&self.tables.products, id))
    }

    async fn cart_for_user(&mut self, user_id: &str) -> Result<Option<Cart>, RepoError> {
        Ok(self
            .carts
            .filter(&self.tables.carts, |c| c.user_id == user_id)
            .into_iter()
            .next())
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), RepoError> {
        if self.cart_for_user(&cart.user_id).await?.is_some() {
            return Err(RepoError::Conflict(format!(
                "user {} already has a cart",
                cart.user_id
            )));
        }
        self.carts.put(cart.id, cart.clone());
        Ok(())
    }

    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError> {
        let mut out = self
            .cart_items
            .filter(&self.tables.cart_items, |it| it.cart_id == cart_id);
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn cart_item(&mut self, id: Uuid) -> Result<Option<CartItem>, RepoError> {
        Ok(self.cart_items.get(&self.tables.cart_items, id))
    }

    async fn save_cart_item(&mut self, item: &CartItem) -> Result<(), RepoError> {
        let duplicate = self
            .cart_items
            .filter(&self.tables.cart_items, |it| {
                it.cart_id == item.cart_id && it.product_id == item.product_id && it.id != item.id
            })
            .into_iter()
            .next();
        if duplicate.is_some() {
            return Err(RepoError::Conflict(format!(
                "cart {} already holds product {}",
                item.cart_id, item.product_id
            )));
        }
        self.cart_items.put(item.id, item.clone());
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.cart_items.remove(&self.tables.cart_items, id))
    }

    async fn delete_cart_items(&mut self, cart_id: Uuid) -> Result<u64, RepoError> {
        let ids: Vec<Uuid> = self
            .cart_items
            .filter(&self.tables.cart_items, |it| it.cart_id == cart_id)
            .into_iter()
            .map(|it| it.id)
            .collect();
        for id in &ids {
            self.cart_items.remove(&self.tables.cart_items, *id);
        }
        Ok(ids.len() as u64)
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&self.tables.orders, id))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepoError> {
        let taken = !self
            .orders
            .filter(&self.tables.orders, |o| {
                o.id == order.id || o.order_number == order.order_number
            })
            .is_empty();
        if taken {
            return Err(RepoError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }
        self.orders.put(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepoError> {
        let Some(mut current) = self.orders.get(&self.tables.orders, order.id) else {
            return Err(RepoError::DbError(format!("order {} not found", order.id)));
        };
        current.status = order.status;
        current.is_paid = order.is_paid;
        current.paid_date = order.paid_date;
        current.updated_at = order.updated_at;
        self.orders.put(order.id, current);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let this = *self;
        let tables = this.tables;
        let _publishing = this.published.write().await;
        this.categories.apply(&tables.categories);
        this.products.apply(&tables.products);
        this.carts.apply(&tables.carts);
        this.cart_items.apply(&tables.cart_items);
        this.orders.apply(&tables.orders);
        tracing::debug!("memory unit of work committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        tracing::debug!("memory unit of work rolled back");
        Ok(())
    }
}
