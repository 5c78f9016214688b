use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::category::CategoryId;
use crate::error::{CatalogError, Result};
use crate::hierarchy;

pub type ProductId = u64;

/// What category deletion needs from whoever owns products.
pub trait ProductLinks {
    /// Number of products whose category is `category_id`.
    fn count_for_category(&self, category_id: CategoryId) -> usize;

    /// Drop the category reference from every product pointing at
    /// `category_id`. Returns how many products were touched.
    fn clear_category(&mut self, category_id: CategoryId) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub slug: String,
    /// Two decimal places, stored as a string, e.g. "1499.00".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub slug: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
}

/// Product records plus the id sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductBook {
    #[serde(default)]
    items: Vec<Product>,
    #[serde(default)]
    last_id: ProductId,
}

impl ProductBook {
    pub fn all(&self) -> &[Product] {
        &self.items
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.items.iter().find(|p| p.id == id)
    }

    /// `category_exists` is consulted for the optional category reference.
    pub fn add(
        &mut self,
        new: NewProduct,
        category_exists: impl Fn(CategoryId) -> bool,
    ) -> Result<Product> {
        let code = new.code.trim();
        if code.is_empty() {
            return Err(CatalogError::invalid("code", "must not be empty"));
        }
        if self.items.iter().any(|p| p.code == code) {
            return Err(CatalogError::invalid(
                "code",
                format!("'{}' is already used by another product", code),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(CatalogError::invalid("name", "must not be empty"));
        }
        if let Some(cid) = new.category_id {
            if !category_exists(cid) {
                return Err(CatalogError::NotFound(cid));
            }
        }
        let price = new.price.map(normalize_price).transpose()?;
        let candidate = hierarchy::candidate_slug(new.slug.as_deref(), &new.name, "product");
        let slug = hierarchy::unique_slug(&candidate, |s| self.items.iter().any(|p| p.slug == s));

        let now = Utc::now();
        self.last_id = self.next_id();
        let product = Product {
            id: self.last_id,
            code: code.to_string(),
            name: new.name.trim().to_string(),
            slug,
            price,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };
        self.items.push(product.clone());
        Ok(product)
    }

    /// Point a product at `category_id`, or detach it with `None`.
    pub fn assign(
        &mut self,
        id: ProductId,
        category_id: Option<CategoryId>,
        category_exists: impl Fn(CategoryId) -> bool,
    ) -> Result<Product> {
        if let Some(cid) = category_id {
            if !category_exists(cid) {
                return Err(CatalogError::NotFound(cid));
            }
        }
        let product = self
            .items
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CatalogError::ProductNotFound(id))?;
        product.category_id = category_id;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    /// Products in any of `category_ids`; every product when the list is empty.
    pub fn in_categories(&self, category_ids: &[CategoryId]) -> Vec<&Product> {
        self.items
            .iter()
            .filter(|p| {
                category_ids.is_empty()
                    || p.category_id.is_some_and(|cid| category_ids.contains(&cid))
            })
            .collect()
    }

    fn next_id(&self) -> ProductId {
        let max = self.items.iter().map(|p| p.id).max().unwrap_or(0);
        max.max(self.last_id) + 1
    }
}

impl ProductLinks for ProductBook {
    fn count_for_category(&self, category_id: CategoryId) -> usize {
        self.items
            .iter()
            .filter(|p| p.category_id == Some(category_id))
            .count()
    }

    fn clear_category(&mut self, category_id: CategoryId) -> usize {
        let now = Utc::now();
        let mut cleared = 0;
        for product in self
            .items
            .iter_mut()
            .filter(|p| p.category_id == Some(category_id))
        {
            product.category_id = None;
            product.updated_at = now;
            cleared += 1;
        }
        cleared
    }
}

/// Parse a caller-supplied amount such as "12", "12.5" or "12.50".
pub fn parse_price(raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    let price = Decimal::from_str(raw).map_err(|_| {
        CatalogError::invalid("price", format!("'{}' is not a decimal amount", raw))
    })?;
    normalize_price(price)
}

/// Non-negative, at most two decimal places, rendered with exactly two.
pub fn normalize_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(CatalogError::invalid("price", format!("{} is negative", price)));
    }
    if price.normalize().scale() > 2 {
        return Err(CatalogError::invalid(
            "price",
            format!("{} has more than two decimal places", price),
        ));
    }
    let mut price = price.abs();
    price.rescale(2);
    Ok(price)
}
