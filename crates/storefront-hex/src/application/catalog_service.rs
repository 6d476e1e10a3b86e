use std::sync::Arc;

use storefront_types::domain::catalog::{
    Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductFilter, ProductUpdate,
};
use storefront_types::ports::store::{Store, UnitOfWork};
use uuid::Uuid;

use crate::application::finish;
use crate::errors::AppError;

/// Categories and products, including the stock counter the order workflow
/// reserves against.
pub struct CatalogService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_category(&self, input: NewCategory) -> Result<Category, AppError> {
        let category = Category::new(input)?;
        let mut uow = self.store.begin().await?;
        let result = uow.save_category(&category).await.map_err(AppError::from);
        finish(uow, result).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>, AppError> {
        Ok(self.store.categories(active_only).await?)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category, AppError> {
        self.store
            .category(id)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: CategoryUpdate,
    ) -> Result<Category, AppError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut category = uow
                .category(id)
                .await?
                .ok_or(AppError::CategoryNotFound(id))?;
            category.update(input)?;
            uow.save_category(&category).await?;
            Ok::<_, AppError>(category)
        }
        .await;
        let category = finish(uow, result).await?;
        tracing::info!(category_id = %id, name = %category.name, "category updated");
        Ok(category)
    }

    /// Soft delete: the category stays readable but is no longer active.
    pub async fn delete_category(&self, id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        let result = Self::deactivate_category(uow.as_mut(), id).await;
        finish(uow, result).await
    }

    async fn deactivate_category(uow: &mut dyn UnitOfWork, id: Uuid) -> Result<(), AppError> {
        let mut category = uow
            .category(id)
            .await?
            .ok_or(AppError::CategoryNotFound(id))?;
        category.soft_delete();
        uow.save_category(&category).await?;
        Ok(())
    }

    pub async fn create_product(&self, input: NewProduct) -> Result<Product, AppError> {
        let product = Product::new(input)?;
        let mut uow = self.store.begin().await?;
        let result = Self::insert_product(uow.as_mut(), &product).await;
        finish(uow, result).await?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product created");
        Ok(product)
    }

    async fn insert_product(uow: &mut dyn UnitOfWork, product: &Product) -> Result<(), AppError> {
        if uow.category(product.category_id).await?.is_none() {
            return Err(AppError::CategoryNotFound(product.category_id));
        }
        uow.save_product(product).await?;
        Ok(())
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.store
            .product(id)
            .await?
            .ok_or(AppError::ProductNotFound(id))
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        if let (Some(min), Some(max)) = (filter.min_price_cents, filter.max_price_cents) {
            if min > max {
                return Err(AppError::BadRequest(format!(
                    "min price {min} exceeds max price {max}"
                )));
            }
        }
        Ok(self.store.products(filter).await?)
    }

    /// Edits the listing. The target category must exist.
    pub async fn update_product(
        &self,
        id: Uuid,
        input: ProductUpdate,
    ) -> Result<Product, AppError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut product = uow
                .product(id)
                .await?
                .ok_or(AppError::ProductNotFound(id))?;
            if uow.category(input.category_id).await?.is_none() {
                return Err(AppError::CategoryNotFound(input.category_id));
            }
            product.update(input)?;
            uow.save_product(&product).await?;
            Ok::<_, AppError>(product)
        }
        .await;
        let product = finish(uow, result).await?;
        tracing::info!(
            product_id = %product.id,
            price_cents = product.price_cents,
            stock = product.stock,
            "product edited"
        );
        Ok(product)
    }

    /// Overwrites the stock counter. A stock of zero deactivates the product.
    pub async fn update_stock(&self, id: Uuid, stock: u32) -> Result<Product, AppError> {
        self.modify_product(id, |p| {
            p.set_stock(stock);
            Ok(())
        })
        .await
    }

    pub async fn set_product_active(&self, id: Uuid, active: bool) -> Result<Product, AppError> {
        self.modify_product(id, |p| Ok(p.set_active(active)?)).await
    }

    async fn modify_product<F>(&self, id: Uuid, change: F) -> Result<Product, AppError>
    where
        F: FnOnce(&mut Product) -> Result<(), AppError> + Send,
    {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut product = uow
                .product(id)
                .await?
                .ok_or(AppError::ProductNotFound(id))?;
            change(&mut product)?;
            uow.save_product(&product).await?;
            Ok::<_, AppError>(product)
        }
        .await;
        let product = finish(uow, result).await?;
        tracing::info!(
            product_id = %product.id,
            stock = product.stock,
            is_active = product.is_active,
            "product updated"
        );
        Ok(product)
    }

    /// Hard delete. Cart lines and order items keep the dangling id.
    pub async fn delete_product(&self, id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        let result = match uow.delete_product(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::ProductNotFound(id)),
            Err(e) => Err(e.into()),
        };
        finish(uow, result).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_repo::memory::InMemoryRepo;
    use storefront_types::domain::catalog::ProductSort;

    fn service() -> CatalogService<InMemoryRepo> {
        CatalogService::new(Arc::new(InMemoryRepo::new()))
    }

    fn new_product(category_id: Uuid, name: &str, price_cents: i64, stock: u32) -> NewProduct {
        NewProduct {
            category_id,
            name: name.into(),
            description: None,
            price_cents,
            discount_price_cents: None,
            image_url: None,
            stock,
            is_featured: false,
        }
    }

    async fn category(svc: &CatalogService<InMemoryRepo>) -> Category {
        svc.create_category(NewCategory {
            name: "Kitchen".into(),
            description: Some("pots and pans".into()),
            image_url: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn product_requires_existing_category() {
        let svc = service();
        let res = svc
            .create_product(new_product(Uuid::new_v4(), "Pan", 1_000, 1))
            .await;
        assert!(matches!(res, Err(AppError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn soft_deleted_category_stays_readable() {
        let svc = service();
        let c = category(&svc).await;
        svc.delete_category(c.id).await.unwrap();

        assert!(!svc.get_category(c.id).await.unwrap().is_active);
        assert!(svc.list_categories(true).await.unwrap().is_empty());
        assert_eq!(svc.list_categories(false).await.unwrap().len(), 1);

        let missing = svc.delete_category(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn stock_updates_drive_the_active_flag() {
        let svc = service();
        let c = category(&svc).await;
        let p = svc
            .create_product(new_product(c.id, "Pan", 1_000, 3))
            .await
            .unwrap();
        assert!(p.is_active);

        let p = svc.update_stock(p.id, 0).await.unwrap();
        assert!(!p.is_active);

        let refused = svc.set_product_active(p.id, true).await;
        assert!(matches!(refused, Err(AppError::BadRequest(_))));

        svc.update_stock(p.id, 5).await.unwrap();
        let p = svc.set_product_active(p.id, true).await.unwrap();
        assert!(p.is_active);
        assert_eq!(svc.get_product(p.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn listing_filters_and_sorts() {
        let svc = service();
        let c = category(&svc).await;
        svc.create_product(new_product(c.id, "Wok", 3_000, 2)).await.unwrap();
        svc.create_product(new_product(c.id, "Pan", 1_000, 2)).await.unwrap();
        svc.create_product(new_product(c.id, "Pot", 2_000, 0)).await.unwrap();

        let mut filter = ProductFilter::active();
        filter.sort = ProductSort::PriceDesc;
        let names: Vec<String> = svc
            .list_products(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Wok", "Pan"]);

        filter.min_price_cents = Some(5_000);
        filter.max_price_cents = Some(1_000);
        let bad = svc.list_products(&filter).await;
        assert!(matches!(bad, Err(AppError::BadRequest(_))));
    }

    fn edit(p: &Product) -> ProductUpdate {
        ProductUpdate {
            category_id: p.category_id,
            name: p.name.clone(),
            description: p.description.clone(),
            price_cents: p.price_cents,
            discount_price_cents: p.discount_price_cents,
            image_url: p.image_url.clone(),
            stock: p.stock,
            is_featured: p.is_featured,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn update_product_edits_the_listing() {
        let svc = service();
        let c = category(&svc).await;
        let p = svc
            .create_product(new_product(c.id, "Pan", 1_000, 2))
            .await
            .unwrap();

        let edited = svc
            .update_product(
                p.id,
                ProductUpdate {
                    name: "Cast iron pan".into(),
                    price_cents: 1_500,
                    discount_price_cents: Some(1_200),
                    ..edit(&p)
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "Cast iron pan");
        let stored = svc.get_product(p.id).await.unwrap();
        assert_eq!(stored.price_cents, 1_500);
        assert_eq!(stored.effective_price_cents(), 1_200);
        assert_eq!(stored.created_at, p.created_at);
    }

    #[tokio::test]
    async fn update_product_rejects_bad_edits() {
        let svc = service();
        let c = category(&svc).await;
        let p = svc
            .create_product(new_product(c.id, "Pan", 1_000, 2))
            .await
            .unwrap();

        let unknown_category = svc
            .update_product(
                p.id,
                ProductUpdate {
                    category_id: Uuid::new_v4(),
                    ..edit(&p)
                },
            )
            .await;
        assert!(matches!(unknown_category, Err(AppError::CategoryNotFound(_))));

        let negative = svc
            .update_product(
                p.id,
                ProductUpdate {
                    price_cents: -5,
                    ..edit(&p)
                },
            )
            .await;
        assert!(matches!(negative, Err(AppError::BadRequest(_))));

        let missing = svc.update_product(Uuid::new_v4(), edit(&p)).await;
        assert!(matches!(missing, Err(AppError::ProductNotFound(_))));

        assert_eq!(svc.get_product(p.id).await.unwrap(), p);
    }

    #[tokio::test]
    async fn update_category_renames_and_reactivates() {
        let svc = service();
        let c = category(&svc).await;
        svc.delete_category(c.id).await.unwrap();

        let updated = svc
            .update_category(
                c.id,
                CategoryUpdate {
                    name: "Cookware".into(),
                    description: None,
                    image_url: Some("cookware.png".into()),
                    is_active: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Cookware");
        assert_eq!(svc.list_categories(true).await.unwrap(), vec![updated]);

        let missing = svc
            .update_category(
                Uuid::new_v4(),
                CategoryUpdate {
                    name: "Ghost".into(),
                    description: None,
                    image_url: None,
                    is_active: None,
                },
            )
            .await;
        assert!(matches!(missing, Err(AppError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn delete_product_is_hard() {
        let svc = service();
        let c = category(&svc).await;
        let p = svc
            .create_product(new_product(c.id, "Pan", 1_000, 1))
            .await
            .unwrap();
        svc.delete_product(p.id).await.unwrap();
        assert!(matches!(
            svc.get_product(p.id).await,
            Err(AppError::ProductNotFound(_))
        ));
        assert!(matches!(
            svc.delete_product(p.id).await,
            Err(AppError::ProductNotFound(_))
        ));
    }
}
