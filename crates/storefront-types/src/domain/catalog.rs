use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Replacement for the editable category fields. `is_active: None` keeps the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn check_category_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("category name empty"));
    }
    Ok(())
}

impl Category {
    pub fn new(input: NewCategory) -> Result<Self, DomainError> {
        check_category_name(&input.name)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            image_url: input.image_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, input: CategoryUpdate) -> Result<(), DomainError> {
        check_category_name(&input.name)?;
        self.name = input.name;
        self.description = input.description;
        self.image_url = input.image_url;
        if let Some(active) = input.is_active {
            self.is_active = active;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Categories are never removed, only hidden.
    pub fn soft_delete(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// A sellable product. `stock` is the contended resource of the checkout workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub image_url: Option<String>,
    pub stock: u32,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_price_cents: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub stock: u32,
    #[serde(default)]
    pub is_featured: bool,
}

/// Replacement for every editable product field. Cart lines already holding
/// the product keep the price they captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub category_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_price_cents: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub stock: u32,
    #[serde(default)]
    pub is_featured: bool,
    /// `None` keeps the current flag. A product without stock is never active.
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn check_listing(name: &str, price_cents: i64, discount: Option<i64>) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name empty"));
    }
    if price_cents < 0 {
        return Err(DomainError::validation("price must be >= 0"));
    }
    if let Some(discount) = discount {
        if discount < 0 || discount > price_cents {
            return Err(DomainError::validation(
                "discount price must be between 0 and price",
            ));
        }
    }
    Ok(())
}

impl Product {
    pub fn new(input: NewProduct) -> Result<Self, DomainError> {
        check_listing(&input.name, input.price_cents, input.discount_price_cents)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            category_id: input.category_id,
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            discount_price_cents: input.discount_price_cents,
            image_url: input.image_url,
            stock: input.stock,
            is_featured: input.is_featured,
            is_active: input.stock > 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, input: ProductUpdate) -> Result<(), DomainError> {
        check_listing(&input.name, input.price_cents, input.discount_price_cents)?;
        if input.stock == 0 && input.is_active == Some(true) {
            return Err(DomainError::validation(
                "cannot activate a product without stock",
            ));
        }
        self.category_id = input.category_id;
        self.name = input.name;
        self.description = input.description;
        self.price_cents = input.price_cents;
        self.discount_price_cents = input.discount_price_cents;
        self.image_url = input.image_url;
        self.stock = input.stock;
        self.is_featured = input.is_featured;
        self.is_active = input.stock > 0 && input.is_active.unwrap_or(self.is_active);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Price a new cart line captures: the discount price when one is set.
    pub fn effective_price_cents(&self) -> i64 {
        self.discount_price_cents.unwrap_or(self.price_cents)
    }

    pub fn has_stock_for(&self, qty: u32) -> bool {
        self.stock >= qty
    }

    pub fn ensure_stock_for(&self, qty: u32) -> Result<(), DomainError> {
        if self.has_stock_for(qty) {
            Ok(())
        } else {
            Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: qty,
                available: self.stock,
            })
        }
    }

    /// Removes `qty` units. Running out of stock deactivates the product.
    pub fn take_stock(&mut self, qty: u32) -> Result<(), DomainError> {
        self.ensure_stock_for(qty)?;
        self.stock -= qty;
        if self.stock == 0 {
            self.is_active = false;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns `qty` units. The active flag is left as is.
    pub fn restock(&mut self, qty: u32) {
        self.stock = self.stock.saturating_add(qty);
        self.updated_at = Utc::now();
    }

    pub fn set_stock(&mut self, stock: u32) {
        self.stock = stock;
        if stock == 0 {
            self.is_active = false;
        }
        self.updated_at = Utc::now();
    }

    pub fn set_active(&mut self, active: bool) -> Result<(), DomainError> {
        if active && self.stock == 0 {
            return Err(DomainError::validation(
                "cannot activate a product without stock",
            ));
        }
        self.is_active = active;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Name,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl ProductSort {
    pub fn sort(self, products: &mut [Product]) {
        match self {
            ProductSort::Name => products.sort_by(|a, b| a.name.cmp(&b.name)),
            ProductSort::PriceAsc => products.sort_by_key(|p| p.price_cents),
            ProductSort::PriceDesc => products.sort_by(|a, b| b.price_cents.cmp(&a.price_cents)),
            ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub featured_only: bool,
    pub active_only: bool,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub sort: ProductSort,
}

impl ProductFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    /// Search term with surrounding whitespace removed; blank terms count as absent.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn matches(&self, p: &Product) -> bool {
        if self.active_only && !p.is_active {
            return false;
        }
        if self.featured_only && !p.is_featured {
            return false;
        }
        if self.category_id.is_some_and(|c| c != p.category_id) {
            return false;
        }
        if self.min_price_cents.is_some_and(|min| p.price_cents < min) {
            return false;
        }
        if self.max_price_cents.is_some_and(|max| p.price_cents > max) {
            return false;
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let in_name = p.name.to_lowercase().contains(&term);
            let in_description = p
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32) -> Product {
        Product::new(NewProduct {
            category_id: Uuid::new_v4(),
            name: "Kettle".into(),
            description: Some("Stainless steel".into()),
            price_cents: 10_000,
            discount_price_cents: None,
            image_url: None,
            stock,
            is_featured: false,
        })
        .unwrap()
    }

    #[test]
    fn take_stock_deactivates_at_zero() {
        let mut p = product(3);
        p.take_stock(2).unwrap();
        assert_eq!(p.stock, 1);
        assert!(p.is_active);
        p.take_stock(1).unwrap();
        assert_eq!(p.stock, 0);
        assert!(!p.is_active);
    }

    #[test]
    fn take_stock_refuses_overdraw() {
        let mut p = product(1);
        let err = p.take_stock(2).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product: "Kettle".into(),
                requested: 2,
                available: 1,
            }
        );
        assert_eq!(p.stock, 1);
    }

    #[test]
    fn restock_keeps_product_inactive() {
        let mut p = product(1);
        p.take_stock(1).unwrap();
        p.restock(4);
        assert_eq!(p.stock, 4);
        assert!(!p.is_active);
    }

    #[test]
    fn effective_price_prefers_discount() {
        let mut p = product(1);
        assert_eq!(p.effective_price_cents(), 10_000);
        p.discount_price_cents = Some(7_500);
        assert_eq!(p.effective_price_cents(), 7_500);
    }

    #[test]
    fn validation_errors() {
        let base = NewProduct {
            category_id: Uuid::new_v4(),
            name: "".into(),
            description: None,
            price_cents: 100,
            discount_price_cents: None,
            image_url: None,
            stock: 1,
            is_featured: false,
        };
        assert!(Product::new(base.clone()).is_err());
        assert!(Product::new(NewProduct {
            name: "A".into(),
            price_cents: -1,
            ..base.clone()
        })
        .is_err());
        assert!(Product::new(NewProduct {
            name: "A".into(),
            discount_price_cents: Some(200),
            ..base
        })
        .is_err());
    }

    #[test]
    fn new_product_without_stock_is_inactive_and_cannot_be_activated() {
        let mut p = product(0);
        assert!(!p.is_active);
        assert!(p.set_active(true).is_err());
        p.set_stock(2);
        p.set_active(true).unwrap();
        assert!(p.is_active);
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

    #[test]
    fn update_replaces_fields_and_keeps_invariants() {
        let mut p = product(2);
        p.update(ProductUpdate {
            name: "Kettle XL".into(),
            price_cents: 12_000,
            discount_price_cents: Some(9_000),
            is_featured: true,
            ..edit(&p)
        })
        .unwrap();
        assert_eq!(p.name, "Kettle XL");
        assert_eq!(p.effective_price_cents(), 9_000);
        assert!(p.is_featured);
        assert!(p.is_active);

        p.update(ProductUpdate { stock: 0, ..edit(&p) }).unwrap();
        assert!(!p.is_active);

        let refused = p.update(ProductUpdate {
            is_active: Some(true),
            ..edit(&p)
        });
        assert!(refused.is_err());

        let bad_discount = p.update(ProductUpdate {
            discount_price_cents: Some(20_000),
            ..edit(&p)
        });
        assert!(bad_discount.is_err());
        assert_eq!(p.discount_price_cents, Some(9_000));
    }

    #[test]
    fn category_update_validates_name() {
        let mut c = Category::new(NewCategory {
            name: "Tea".into(),
            description: None,
            image_url: None,
        })
        .unwrap();
        c.soft_delete();
        c.update(CategoryUpdate {
            name: "Tea & Coffee".into(),
            description: Some("hot drinks".into()),
            image_url: None,
            is_active: Some(true),
        })
        .unwrap();
        assert_eq!(c.name, "Tea & Coffee");
        assert!(c.is_active);

        let blank = c.update(CategoryUpdate {
            name: " ".into(),
            description: None,
            image_url: None,
            is_active: None,
        });
        assert!(blank.is_err());
        assert_eq!(c.description.as_deref(), Some("hot drinks"));
    }

    #[test]
    fn filter_matches_search_and_price() {
        let p = product(1);
        let filter = ProductFilter {
            search: Some("  steel ".into()),
            max_price_cents: Some(10_000),
            ..ProductFilter::active()
        };
        assert!(filter.matches(&p));

        let filter = ProductFilter {
            min_price_cents: Some(10_001),
            ..ProductFilter::default()
        };
        assert!(!filter.matches(&p));
    }
}
