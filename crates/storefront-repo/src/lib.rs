#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use storefront_types::domain::cart::{Cart, CartItem};
use storefront_types::domain::catalog::{Category, Product, ProductFilter};
use storefront_types::domain::order::Order;
use storefront_types::ports::store::{OrderFilter, RepoError, Store, UnitOfWork};
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", not(feature = "memory")))]
const DEFAULT_DATABASE_URL: &str = "sqlite://storefront.db";

/// The store selected at build time by the `memory` / `sqlite` features.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
        Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // With both features, an explicit URL selects SQLite and `None` the memory store.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Self::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }

    fn backend(&self) -> &dyn Store {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(r) => r,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r,
        }
    }
}

#[async_trait]
impl Store for Repo {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        self.backend().begin().await
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        self.backend().category(id).await
    }

    async fn categories(&self, active_only: bool) -> Result<Vec<Category>, RepoError> {
        self.backend().categories(active_only).await
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        self.backend().product(id).await
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepoError> {
        self.backend().products(filter).await
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError> {
        self.backend().products_by_ids(ids).await
    }

    async fn cart_for_user(&self, user_id: &str) -> Result<Option<Cart>, RepoError> {
        self.backend().cart_for_user(user_id).await
    }

    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, RepoError> {
        self.backend().cart_items(cart_id).await
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        self.backend().order(id).await
    }

    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, RepoError> {
        self.backend().order_by_number(order_number).await
    }

    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepoError> {
        self.backend().orders(filter).await
    }
}
