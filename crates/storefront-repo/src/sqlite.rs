use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use storefront_types::domain::cart::{Cart, CartItem};
use storefront_types::domain::catalog::{Category, Product, ProductFilter, ProductSort};
use storefront_types::domain::order::{Order, OrderItem, OrderStatus, ShippingDetails};
use storefront_types::ports::store::{OrderFilter, RepoError, Store, UnitOfWork};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

const CATEGORY_COLUMNS: &str = "id, name, description, image_url, is_active, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price_cents, discount_price_cents, \
     image_url, stock, is_featured, is_active, created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, created_at, updated_at";
const CART_ITEM_COLUMNS: &str =
    "id, cart_id, product_id, quantity, unit_price_cents, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, order_number, user_id, order_date, total_cents, status, \
     shipping_address, shipping_city, shipping_district, shipping_postal_code, shipping_phone, \
     payment_method, is_paid, paid_date, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price_cents, total_cents, created_at";

pub struct SqliteRepo {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

fn db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => RepoError::DbError(e.to_string()),
    }
}

fn parse_id(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(|e| RepoError::DbError(e.to_string()))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepoError::DbError(e.to_string()))?
        .with_timezone(&Utc))
}

// Fixed-width nanosecond timestamps sort correctly as text.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// `LIKE` pattern matching `term` as a plain substring, for use with `ESCAPE '\'`.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn to_u32(v: i64) -> Result<u32, RepoError> {
    u32::try_from(v).map_err(|e| RepoError::DbError(e.to_string()))
}

#[derive(FromRow)]
struct DbCategory {
    id: String,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl DbCategory {
    fn into_category(self) -> Result<Category, RepoError> {
        Ok(Category {
            id: parse_id(&self.id)?,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            is_active: self.is_active,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbProduct {
    id: String,
    category_id: String,
    name: String,
    description: Option<String>,
    price_cents: i64,
    discount_price_cents: Option<i64>,
    image_url: Option<String>,
    stock: i64,
    is_featured: bool,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl DbProduct {
    fn into_product(self) -> Result<Product, RepoError> {
        Ok(Product {
            id: parse_id(&self.id)?,
            category_id: parse_id(&self.category_id)?,
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            discount_price_cents: self.discount_price_cents,
            image_url: self.image_url,
            stock: to_u32(self.stock)?,
            is_featured: self.is_featured,
            is_active: self.is_active,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbCart {
    id: String,
    user_id: String,
    created_at: String,
    updated_at: String,
}

impl DbCart {
    fn into_cart(self) -> Result<Cart, RepoError> {
        Ok(Cart {
            id: parse_id(&self.id)?,
            user_id: self.user_id,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbCartItem {
    id: String,
    cart_id: String,
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
    created_at: String,
    updated_at: String,
}

impl DbCartItem {
    fn into_cart_item(self) -> Result<CartItem, RepoError> {
        Ok(CartItem {
            id: parse_id(&self.id)?,
            cart_id: parse_id(&self.cart_id)?,
            product_id: parse_id(&self.product_id)?,
            quantity: to_u32(self.quantity)?,
            unit_price_cents: self.unit_price_cents,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    order_number: String,
    user_id: String,
    order_date: String,
    total_cents: i64,
    status: String,
    shipping_address: String,
    shipping_city: String,
    shipping_district: String,
    shipping_postal_code: Option<String>,
    shipping_phone: String,
    payment_method: String,
    is_paid: bool,
    paid_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepoError> {
        let status = OrderStatus::from_str(&self.status)
            .map_err(|e| RepoError::DbError(e.to_string()))?;
        let paid_date = self.paid_date.as_deref().map(parse_ts).transpose()?;
        Ok(Order {
            id: parse_id(&self.id)?,
            order_number: self.order_number,
            user_id: self.user_id,
            order_date: parse_ts(&self.order_date)?,
            total_cents: self.total_cents,
            status,
            shipping: ShippingDetails {
                address: self.shipping_address,
                city: self.shipping_city,
                district: self.shipping_district,
                postal_code: self.shipping_postal_code,
                phone: self.shipping_phone,
                payment_method: self.payment_method,
            },
            is_paid: self.is_paid,
            paid_date,
            items,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrderItem {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
    total_cents: i64,
    created_at: String,
}

impl DbOrderItem {
    fn into_order_item(self) -> Result<OrderItem, RepoError> {
        Ok(OrderItem {
            id: parse_id(&self.id)?,
            order_id: parse_id(&self.order_id)?,
            product_id: parse_id(&self.product_id)?,
            quantity: to_u32(self.quantity)?,
            unit_price_cents: self.unit_price_cents,
            total_cents: self.total_cents,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        // Run migration from migration file.
        let ddl = include_str!("../migrations/0001_create_storefront.sql");
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    async fn conn(&self) -> Result<sqlx::pool::PoolConnection<Sqlite>, RepoError> {
        self.pool.acquire().await.map_err(db_err)
    }
}

async fn fetch_category(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<Category>, RepoError> {
    let row: Option<DbCategory> = sqlx::query_as(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;
    row.map(DbCategory::into_category).transpose()
}

async fn fetch_product(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Product>, RepoError> {
    let row: Option<DbProduct> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;
    row.map(DbProduct::into_product).transpose()
}

async fn fetch_cart_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<Cart>, RepoError> {
    let row: Option<DbCart> = sqlx::query_as(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;
    row.map(DbCart::into_cart).transpose()
}

async fn fetch_cart_items(
    conn: &mut SqliteConnection,
    cart_id: Uuid,
) -> Result<Vec<CartItem>, RepoError> {
    let rows: Vec<DbCartItem> = sqlx::query_as(&format!(
        "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = ? ORDER BY created_at"
    ))
    .bind(cart_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    rows.into_iter().map(DbCartItem::into_cart_item).collect()
}

async fn fetch_order_items(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> Result<Vec<OrderItem>, RepoError> {
    let rows: Vec<DbOrderItem> = sqlx::query_as(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY rowid"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    rows.into_iter().map(DbOrderItem::into_order_item).collect()
}

async fn hydrate_orders(
    conn: &mut SqliteConnection,
    rows: Vec<DbOrder>,
) -> Result<Vec<Order>, RepoError> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = fetch_order_items(conn, &row.id).await?;
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}

async fn fetch_order_where(
    conn: &mut SqliteConnection,
    column: &str,
    value: String,
) -> Result<Option<Order>, RepoError> {
    let rows: Vec<DbOrder> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE {column} = ?"
    ))
    .bind(value)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(hydrate_orders(conn, rows).await?.into_iter().next())
}

#[async_trait]
impl Store for SqliteRepo {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        let gate = self.write_gate.clone().lock_owned().await;
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(SqliteUnitOfWork { tx, _gate: gate }))
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        let mut conn = self.conn().await?;
        fetch_category(&mut conn, id).await
    }

    async fn categories(&self, active_only: bool) -> Result<Vec<Category>, RepoError> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let rows: Vec<DbCategory> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories {filter} ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbCategory::into_category).collect()
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        let mut conn = self.conn().await?;
        fetch_product(&mut conn, id).await
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepoError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"
        ));
        if filter.active_only {
            qb.push(" AND is_active = 1");
        }
        if filter.featured_only {
            qb.push(" AND is_featured = 1");
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id.to_string());
        }
        if let Some(min) = filter.min_price_cents {
            qb.push(" AND price_cents >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price_cents {
            qb.push(" AND price_cents <= ").push_bind(max);
        }
        if let Some(term) = filter.search_term() {
            let pattern = contains_pattern(term);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(match filter.sort {
            ProductSort::Name => " ORDER BY name ASC",
            ProductSort::PriceAsc => " ORDER BY price_cents ASC",
            ProductSort::PriceDesc => " ORDER BY price_cents DESC",
            ProductSort::Newest => " ORDER BY created_at DESC",
        });

        let rows: Vec<DbProduct> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(DbProduct::into_product).collect()
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let rows: Vec<DbProduct> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(DbProduct::into_product).collect()
    }

    async fn cart_for_user(&self, user_id: &str) -> Result<Option<Cart>, RepoError> {
        let mut conn = self.conn().await?;
        fetch_cart_for_user(&mut conn, user_id).await
    }

    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError> {
        let mut conn = self.conn().await?;
        fetch_cart_items(&mut conn, cart_id).await
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let mut conn = self.conn().await?;
        fetch_order_where(&mut conn, "id", id.to_string()).await
    }

    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, RepoError> {
        let mut conn = self.conn().await?;
        fetch_order_where(&mut conn, "order_number", order_number.to_string()).await
    }

    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepoError> {
        let mut conn = self.conn().await?;
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));
        if let Some(user_id) = &filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY order_date DESC");

        let rows: Vec<DbOrder> = qb
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(db_err)?;
        hydrate_orders(&mut conn, rows).await
    }
}

/// A write transaction. Holds the repo's write gate so writers never race on
/// the read-check-write sequences they run (stock checks in particular).
pub struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn category(&mut self, id: Uuid) -> Result<Option<Category>, RepoError> {
        fetch_category(&mut self.tx, id).await
    }

    async fn save_category(&mut self, category: &Category) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, image_url, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                image_url = excluded.image_url,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
        )
        .bind(category.id.to_string())
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image_url)
        .bind(category.is_active)
        .bind(ts(&category.created_at))
        .bind(ts(&category.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>, RepoError> {
        fetch_product(&mut self.tx, id).await
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO products (id, category_id, name, description, price_cents, discount_price_cents,
                                   image_url, stock, is_featured, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                name = excluded.name,
                description = excluded.description,
                price_cents = excluded.price_cents,
                discount_price_cents = excluded.discount_price_cents,
                image_url = excluded.image_url,
                stock = excluded.stock,
                is_featured = excluded.is_featured,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
        )
        .bind(product.id.to_string())
        .bind(product.category_id.to_string())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.discount_price_cents)
        .bind(&product.image_url)
        .bind(i64::from(product.stock))
        .bind(product.is_featured)
        .bind(product.is_active)
        .bind(ts(&product.created_at))
        .bind(ts(&product.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_product(&mut self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn cart_for_user(&mut self, user_id: &str) -> Result<Option<Cart>, RepoError> {
        fetch_cart_for_user(&mut self.tx, user_id).await
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), RepoError> {
        sqlx::query("INSERT INTO carts (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(cart.id.to_string())
            .bind(&cart.user_id)
            .bind(ts(&cart.created_at))
            .bind(ts(&cart.updated_at))
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError> {
        fetch_cart_items(&mut self.tx, cart_id).await
    }

    async fn cart_item(&mut self, id: Uuid) -> Result<Option<CartItem>, RepoError> {
        let row: Option<DbCartItem> = sqlx::query_as(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(DbCartItem::into_cart_item).transpose()
    }

    async fn save_cart_item(&mut self, item: &CartItem) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price_cents, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                quantity = excluded.quantity,
                updated_at = excluded.updated_at",
        )
        .bind(item.id.to_string())
        .bind(item.cart_id.to_string())
        .bind(item.product_id.to_string())
        .bind(i64::from(item.quantity))
        .bind(item.unit_price_cents)
        .bind(ts(&item.created_at))
        .bind(ts(&item.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_cart_items(&mut self, cart_id: Uuid) -> Result<u64, RepoError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>, RepoError> {
        fetch_order_where(&mut self.tx, "id", id.to_string()).await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, order_date, total_cents, status,
                                 shipping_address, shipping_city, shipping_district, shipping_postal_code,
                                 shipping_phone, payment_method, is_paid, paid_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(ts(&order.order_date))
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(&order.shipping.address)
        .bind(&order.shipping.city)
        .bind(&order.shipping.district)
        .bind(&order.shipping.postal_code)
        .bind(&order.shipping.phone)
        .bind(&order.shipping.payment_method)
        .bind(order.is_paid)
        .bind(order.paid_date.as_ref().map(ts))
        .bind(ts(&order.created_at))
        .bind(ts(&order.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents, total_cents, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(order.id.to_string())
            .bind(item.product_id.to_string())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price_cents)
            .bind(item.total_cents)
            .bind(ts(&item.created_at))
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepoError> {
        let res = sqlx::query(
            "UPDATE orders SET status = ?, is_paid = ?, paid_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(order.status.as_str())
        .bind(order.is_paid)
        .bind(order.paid_date.as_ref().map(ts))
        .bind(ts(&order.updated_at))
        .bind(order.id.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::DbError(format!("order {} not found", order.id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(db_err)?;
        tracing::debug!("sqlite unit of work committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.rollback().await.map_err(db_err)?;
        tracing::debug!("sqlite unit of work rolled back");
        Ok(())
    }
}
