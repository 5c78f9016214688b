/// Category rules, single source of truth for server instructions and
/// rejection help text.
pub const RULES: &str = "\
1. Three levels at most. A root category is level 0 (\"Parent\"), its children are level 1 \
(\"Sub-category\"), their children are level 2 (\"Child-category\"). A level-2 category cannot \
take children.\n\
2. Levels are derived. The level of a category is always its parent's level plus one. It is \
never set directly; moving a category re-derives the level of the category and of everything \
below it. A move that would push any descendant below level 2 is refused.\n\
3. No cycles. A category can never be moved under itself or under one of its own descendants. \
Use `eligible_parents` with the category id to see the legal choices.\n\
4. Slugs are unique. Omit the slug to derive it from the name. When a slug is taken, `-1`, `-2`, \
... is appended until it is free. Explicit slugs are normalized to lowercase ASCII with dashes.\n\
5. Delete leaves first. A category with sub-categories cannot be deleted; delete or move the \
children first. Products in a deleted category are kept and lose their category.\n\
6. Inactive categories stay in the tree. `is_active` only hides a category from default \
listings; it does not affect parents, levels, or products.\n\
7. Sibling order. Listings sort by level, then `order` (lower first), then name.";

/// User-facing message for a rejected call.
pub fn explain(err: &crate::CatalogError) -> String {
    use crate::CatalogError::*;
    match err {
        ParentNotFound(id) => format!("Parent category {} does not exist.", id),
        DepthExceeded { .. } => {
            "Cannot place category here. Maximum depth of 3 levels reached.".to_string()
        }
        CircularReference { .. } => {
            "Cannot set parent. This would create a circular reference.".to_string()
        }
        HasChildren { children, .. } => format!(
            "Cannot delete category with {} sub-categor{}. Delete children first.",
            children,
            if *children == 1 { "y" } else { "ies" }
        ),
        NotFound(id) => format!("Category {} not found.", id),
        SlugConflict(slug) => format!("Slug '{}' was taken concurrently. Please retry.", slug),
        other => other.to_string(),
    }
}
