//! Read-only display attributes computed from the stored tree shape.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::category::{Category, CategoryFilter, CategoryId, MAX_LEVEL};
use crate::hierarchy;

/// "Jewelry > Rings > Engagement". A root renders as its own name.
pub fn full_path(categories: &[Category], category: &Category) -> String {
    let mut names: Vec<&str> = hierarchy::ancestors(categories, category.id)
        .into_iter()
        .map(|c| c.name.as_str())
        .collect();
    names.push(&category.name);
    names.join(" > ")
}

pub fn level_name(level: u8) -> &'static str {
    match level {
        0 => "Parent",
        1 => "Sub-category",
        2 => "Child-category",
        _ => "Unknown",
    }
}

/// Listing order shared by every category query: level, then sibling
/// order, then name.
pub fn display_order(a: &Category, b: &Category) -> Ordering {
    a.level
        .cmp(&b.level)
        .then(a.order.cmp(&b.order))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn list<'a>(categories: &'a [Category], filter: &CategoryFilter) -> Vec<&'a Category> {
    let mut out: Vec<&Category> = categories.iter().filter(|c| filter.matches(c)).collect();
    out.sort_by(|a, b| display_order(a, b));
    out
}

/// Categories that may legally become the parent of `exclude` (or of a new
/// category when `exclude` is `None`).
pub fn eligible_parents(categories: &[Category], exclude: Option<CategoryId>) -> Vec<&Category> {
    let excluded: HashSet<CategoryId> = match exclude {
        Some(id) => hierarchy::descendants(categories, id)
            .into_iter()
            .map(|c| c.id)
            .chain(std::iter::once(id))
            .collect(),
        None => HashSet::new(),
    };
    let mut out: Vec<&Category> = categories
        .iter()
        .filter(|c| c.level < MAX_LEVEL && !excluded.contains(&c.id))
        .collect();
    out.sort_by(|a, b| display_order(a, b));
    out
}

/// Picker label such as "— Rings (Sub-category)".
pub fn parent_option_label(category: &Category) -> String {
    format!(
        "{}{} ({})",
        "— ".repeat(category.level as usize),
        category.name,
        level_name(category.level)
    )
}

// --- Projections ---

/// A category plus the attributes derived from its position in the tree.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub full_path: String,
    pub level: u8,
    pub level_name: &'static str,
    pub parent_id: Option<CategoryId>,
    pub description: Option<String>,
    pub is_active: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryView {
    pub fn new(categories: &[Category], category: &Category) -> Self {
        CategoryView {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            full_path: full_path(categories, category),
            level: category.level,
            level_name: level_name(category.level),
            parent_id: category.parent_id,
            description: category.description.clone(),
            is_active: category.is_active,
            order: category.order,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParentSummary {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChildSummary {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub level: u8,
}

/// Single-category read with its neighbourhood expanded.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: CategoryView,
    pub parent: Option<ParentSummary>,
    pub children: Vec<ChildSummary>,
    pub product_count: usize,
}

impl CategoryDetail {
    pub fn new(categories: &[Category], category: &Category, product_count: usize) -> Self {
        let parent = category
            .parent_id
            .and_then(|pid| hierarchy::find(categories, pid))
            .map(|p| ParentSummary {
                id: p.id,
                name: p.name.clone(),
                slug: p.slug.clone(),
            });
        let children = hierarchy::children(categories, category.id)
            .into_iter()
            .map(|c| ChildSummary {
                id: c.id,
                name: c.name.clone(),
                slug: c.slug.clone(),
                level: c.level,
            })
            .collect();
        CategoryDetail {
            category: CategoryView::new(categories, category),
            parent,
            children,
            product_count,
        }
    }
}

/// One entry of a parent picker.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParentOption {
    pub id: CategoryId,
    pub label: String,
    pub level: u8,
}

impl From<&Category> for ParentOption {
    fn from(category: &Category) -> Self {
        ParentOption {
            id: category.id,
            label: parent_option_label(category),
            level: category.level,
        }
    }
}
