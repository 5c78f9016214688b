use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryChanges, CategoryFilter, CategoryId, NewCategory};
use crate::derived::{self, CategoryDetail, CategoryView, ParentOption};
use crate::error::{CatalogError, Result};
use crate::product::{NewProduct, Product, ProductBook, ProductId, ProductLinks};
use crate::tree::{CategoryTree, DeleteOutcome};

/// Everything persisted in `catalog.json`: the category tree and the
/// products that point into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: CategoryTree,
    #[serde(default)]
    pub products: ProductBook,
}

impl Catalog {
    // --- Categories: writes ---

    pub fn create_category(&mut self, new: NewCategory) -> Result<Category> {
        self.categories.create(new)
    }

    pub fn update_category(&mut self, id: CategoryId, changes: CategoryChanges) -> Result<Category> {
        self.categories.update(id, changes)
    }

    pub fn delete_category(&mut self, id: CategoryId) -> Result<DeleteOutcome> {
        self.categories.delete(id, &mut self.products)
    }

    // --- Categories: reads ---

    pub fn list_categories(&self, filter: &CategoryFilter) -> Vec<CategoryView> {
        let all = self.categories.all();
        derived::list(all, filter)
            .into_iter()
            .map(|c| CategoryView::new(all, c))
            .collect()
    }

    pub fn category_detail(&self, id: CategoryId) -> Result<CategoryDetail> {
        let category = self.categories.get(id).ok_or(CatalogError::NotFound(id))?;
        Ok(CategoryDetail::new(
            self.categories.all(),
            category,
            self.products.count_for_category(id),
        ))
    }

    /// Parent choices for a new category (`editing = None`) or for an
    /// existing one, which can never pick itself or its own descendants.
    pub fn eligible_parents(&self, editing: Option<CategoryId>) -> Result<Vec<ParentOption>> {
        if let Some(id) = editing {
            if !self.categories.contains(id) {
                return Err(CatalogError::NotFound(id));
            }
        }
        Ok(derived::eligible_parents(self.categories.all(), editing)
            .into_iter()
            .map(ParentOption::from)
            .collect())
    }

    // --- Products ---

    pub fn add_product(&mut self, new: NewProduct) -> Result<Product> {
        let categories = &self.categories;
        self.products.add(new, |id| categories.contains(id))
    }

    pub fn assign_product(&mut self, id: ProductId, category_id: Option<CategoryId>) -> Result<Product> {
        let categories = &self.categories;
        self.products.assign(id, category_id, |cid| categories.contains(cid))
    }

    pub fn products_in(&self, category_ids: &[CategoryId]) -> Vec<&Product> {
        self.products.in_categories(category_ids)
    }
}
