use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CategoryId = u64;

/// Deepest level a category may sit at. Roots are level 0, so a tree holds
/// at most three levels: parent, sub-category, child-category.
pub const MAX_LEVEL: u8 = 2;

/// A node in the category forest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    /// Cached at write time from the parent chain. Never set by callers.
    #[serde(default)]
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Only levels 0 and 1 may take children.
    pub fn can_have_children(&self) -> bool {
        self.level < MAX_LEVEL
    }
}

/// Fields accepted by `CategoryTree::create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// Derived from `name` when absent or blank.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

impl NewCategory {
    pub fn named(name: impl Into<String>) -> Self {
        NewCategory {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = Some(false);
        self
    }
}

/// Partial update for `CategoryTree::update`. `None` leaves a field alone.
///
/// `parent_id` and `description` are nullable, so they take a nested
/// option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub parent_id: Option<Option<CategoryId>>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

impl CategoryChanges {
    pub fn move_under(parent_id: CategoryId) -> Self {
        CategoryChanges {
            parent_id: Some(Some(parent_id)),
            ..Default::default()
        }
    }

    pub fn make_root() -> Self {
        CategoryChanges {
            parent_id: Some(None),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CategoryChanges::default()
    }
}

/// Read filter for category listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub level: Option<u8>,
    pub include_inactive: bool,
}

impl CategoryFilter {
    pub fn matches(&self, category: &Category) -> bool {
        (self.include_inactive || category.is_active)
            && self.level.map_or(true, |level| category.level == level)
    }
}
