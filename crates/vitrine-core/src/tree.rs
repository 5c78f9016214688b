use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryChanges, CategoryId, NewCategory, MAX_LEVEL};
use crate::error::{CatalogError, Result};
use crate::hierarchy;
use crate::product::ProductLinks;

/// Result of a successful delete. `product_count` products lost their
/// category reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub id: CategoryId,
    pub product_count: usize,
}

/// The category collection and the write operations over it.
///
/// Each public mutation validates the whole change before touching
/// `items`, so a rejected call leaves the tree exactly as it was.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryTree {
    #[serde(default)]
    items: Vec<Category>,
    #[serde(default)]
    last_id: CategoryId,
}

impl CategoryTree {
    pub fn all(&self) -> &[Category] {
        &self.items
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        hierarchy::find(&self.items, id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn create(&mut self, new: NewCategory) -> Result<Category> {
        let candidate = hierarchy::candidate_slug(new.slug.as_deref(), &new.name, "category");
        let slug = hierarchy::resolve_unique_slug(&self.items, &candidate, None);
        let placement = hierarchy::resolve_level(&self.items, new.parent_id)?;

        let now = Utc::now();
        let category = Category {
            id: self.next_id(),
            name: new.name,
            slug,
            parent_id: placement.parent_id,
            level: placement.level,
            description: new.description,
            is_active: new.is_active.unwrap_or(true),
            order: new.order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        self.insert(category.clone())?;
        Ok(category)
    }

    pub fn update(&mut self, id: CategoryId, changes: CategoryChanges) -> Result<Category> {
        let current = self.get(id).ok_or(CatalogError::NotFound(id))?;
        let mut next = current.clone();

        let mut moved = false;
        if let Some(parent_id) = changes.parent_id {
            if parent_id != current.parent_id {
                if let Some(pid) = parent_id {
                    hierarchy::check_no_cycle(&self.items, id, pid)?;
                }
                let placement = hierarchy::resolve_level(&self.items, parent_id)?;
                // the moved category drags its subtree along
                let deepest = placement.level + hierarchy::subtree_height(&self.items, id);
                if let Some(pid) = parent_id.filter(|_| deepest > MAX_LEVEL) {
                    return Err(CatalogError::DepthExceeded {
                        parent: pid,
                        level: deepest,
                    });
                }
                moved = placement.level != current.level;
                next.parent_id = placement.parent_id;
                next.level = placement.level;
            }
        }

        if let Some(name) = changes.name {
            next.name = name;
        }
        if let Some(slug) = changes.slug {
            let candidate = hierarchy::candidate_slug(Some(&slug), &next.name, "category");
            next.slug = hierarchy::resolve_unique_slug(&self.items, &candidate, Some(id));
        }
        if let Some(description) = changes.description {
            next.description = description;
        }
        if let Some(is_active) = changes.is_active {
            next.is_active = is_active;
        }
        if let Some(order) = changes.order {
            next.order = order;
        }
        next.updated_at = Utc::now();

        self.replace(next.clone())?;
        if moved {
            self.relevel_descendants(id);
        }
        Ok(next)
    }

    /// Remove a leaf category, detaching any products that referenced it.
    pub fn delete(&mut self, id: CategoryId, products: &mut impl ProductLinks) -> Result<DeleteOutcome> {
        if !self.contains(id) {
            return Err(CatalogError::NotFound(id));
        }
        let children = self.items.iter().filter(|c| c.parent_id == Some(id)).count();
        if children > 0 {
            return Err(CatalogError::HasChildren { id, children });
        }

        let product_count = products.count_for_category(id);
        if product_count > 0 {
            products.clear_category(id);
        }
        self.items.retain(|c| c.id != id);
        Ok(DeleteOutcome { id, product_count })
    }

    /// Append a record, enforcing the unique slug index.
    fn insert(&mut self, category: Category) -> Result<()> {
        if self.items.iter().any(|c| c.slug == category.slug) {
            return Err(CatalogError::SlugConflict(category.slug));
        }
        self.last_id = self.last_id.max(category.id);
        self.items.push(category);
        Ok(())
    }

    /// Slugs are resolved against the same records just before this runs,
    /// so a conflict here means the stored data already held a duplicate.
    fn replace(&mut self, category: Category) -> Result<()> {
        if self
            .items
            .iter()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            return Err(CatalogError::SlugConflict(category.slug));
        }
        let slot = self
            .items
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or(CatalogError::NotFound(category.id))?;
        *slot = category;
        Ok(())
    }

    /// Re-derive cached levels below `id` after it moved.
    fn relevel_descendants(&mut self, id: CategoryId) {
        let order: Vec<CategoryId> = hierarchy::descendants(&self.items, id)
            .iter()
            .map(|c| c.id)
            .collect();
        let mut levels: HashMap<CategoryId, u8> = self.items.iter().map(|c| (c.id, c.level)).collect();
        let now = Utc::now();
        // parents come before their children in `order`
        for cid in order {
            let Some(idx) = self.items.iter().position(|c| c.id == cid) else {
                continue;
            };
            let parent_level = self.items[idx]
                .parent_id
                .and_then(|pid| levels.get(&pid).copied())
                .unwrap_or(0);
            let level = parent_level + 1;
            levels.insert(cid, level);
            let item = &mut self.items[idx];
            if item.level != level {
                item.level = level;
                item.updated_at = now;
            }
        }
    }

    /// Generate the next id: one past the highest ever handed out.
    fn next_id(&self) -> CategoryId {
        let max = self.items.iter().map(|c| c.id).max().unwrap_or(0);
        max.max(self.last_id) + 1
    }
}
