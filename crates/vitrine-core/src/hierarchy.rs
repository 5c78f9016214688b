//! Structural rules of the category tree: level derivation, cycle checks
//! and slug uniqueness. Everything here is a pure function over the current
//! set of categories; the mutation API in `tree` decides when to call what.

use std::collections::HashSet;

use crate::category::{Category, CategoryId, MAX_LEVEL};
use crate::error::{CatalogError, Result};

/// Where a category lands in the tree once its parent is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: Option<CategoryId>,
    pub level: u8,
}

impl Placement {
    pub const ROOT: Placement = Placement {
        parent_id: None,
        level: 0,
    };
}

pub fn find(categories: &[Category], id: CategoryId) -> Option<&Category> {
    categories.iter().find(|c| c.id == id)
}

/// Derive the level for a category placed under `parent_id`.
pub fn resolve_level(categories: &[Category], parent_id: Option<CategoryId>) -> Result<Placement> {
    let Some(pid) = parent_id else {
        return Ok(Placement::ROOT);
    };
    let parent = find(categories, pid).ok_or(CatalogError::ParentNotFound(pid))?;
    if parent.level >= MAX_LEVEL {
        return Err(CatalogError::DepthExceeded {
            parent: pid,
            level: parent.level + 1,
        });
    }
    Ok(Placement {
        parent_id: Some(pid),
        level: parent.level + 1,
    })
}

/// Reject a parent assignment that would make `category_id` its own ancestor.
///
/// Walks upward from `proposed_parent_id`. The walk stops at a root, at a
/// dangling parent id, or when an id repeats, so corrupt data cannot hang it.
pub fn check_no_cycle(
    categories: &[Category],
    category_id: CategoryId,
    proposed_parent_id: CategoryId,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut current = Some(proposed_parent_id);
    while let Some(id) = current {
        if id == category_id {
            return Err(CatalogError::CircularReference {
                category: category_id,
                parent: proposed_parent_id,
            });
        }
        if !seen.insert(id) {
            break;
        }
        current = find(categories, id).and_then(|c| c.parent_id);
    }
    Ok(())
}

/// Lowercase ASCII slug. Text is transliterated to ASCII first, `@` becomes
/// the word `at`, whitespace and `-`/`_` runs collapse into a single `-`,
/// and any other punctuation is dropped.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for ch in ascii.chars() {
        match ch {
            c if c.is_ascii_alphanumeric() => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            }
            '@' => {
                if !slug.is_empty() {
                    slug.push('-');
                }
                slug.push_str("at");
                pending_dash = true;
            }
            '-' | '_' => pending_dash = true,
            c if c.is_whitespace() => pending_dash = true,
            _ => {}
        }
    }
    slug
}

/// Normalize an explicit slug, or derive one from `name` when it is absent
/// or normalizes to nothing. Falls back to `fallback` for names with no
/// usable characters.
pub fn candidate_slug(explicit: Option<&str>, name: &str, fallback: &str) -> String {
    explicit
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(slugify(name)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| fallback.to_string())
}

/// First of `candidate`, `candidate-1`, `candidate-2`, ... that `is_taken`
/// rejects. Best effort only: the storage index is the final word.
pub fn unique_slug(candidate: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(candidate) {
        return candidate.to_string();
    }
    let mut counter = 1u64;
    loop {
        let attempt = format!("{}-{}", candidate, counter);
        if !is_taken(&attempt) {
            return attempt;
        }
        counter += 1;
    }
}

/// Resolve a category slug, ignoring `exclude_id` (the category being edited).
pub fn resolve_unique_slug(
    categories: &[Category],
    candidate: &str,
    exclude_id: Option<CategoryId>,
) -> String {
    unique_slug(candidate, |slug| {
        categories
            .iter()
            .any(|c| c.slug == slug && Some(c.id) != exclude_id)
    })
}

/// Direct children of `id`, ordered by their sibling `order`.
pub fn children(categories: &[Category], id: CategoryId) -> Vec<&Category> {
    let mut kids: Vec<&Category> = categories
        .iter()
        .filter(|c| c.parent_id == Some(id))
        .collect();
    kids.sort_by_key(|c| c.order);
    kids
}

/// Ancestors of `id`, oldest first. Excludes the category itself.
pub fn ancestors(categories: &[Category], id: CategoryId) -> Vec<&Category> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut current = find(categories, id).and_then(|c| c.parent_id);
    while let Some(pid) = current {
        if !seen.insert(pid) {
            break;
        }
        let Some(parent) = find(categories, pid) else {
            break;
        };
        chain.push(parent);
        current = parent.parent_id;
    }
    chain.reverse();
    chain
}

/// Every descendant of `id`, depth first, each parent before its children.
pub fn descendants(categories: &[Category], id: CategoryId) -> Vec<&Category> {
    let mut out = Vec::new();
    let mut seen = HashSet::from([id]);
    collect_descendants(categories, id, &mut seen, &mut out);
    out
}

fn collect_descendants<'a>(
    categories: &'a [Category],
    id: CategoryId,
    seen: &mut HashSet<CategoryId>,
    out: &mut Vec<&'a Category>,
) {
    for child in children(categories, id) {
        if seen.insert(child.id) {
            out.push(child);
            collect_descendants(categories, child.id, seen, out);
        }
    }
}

/// How many levels hang below `id`: 0 for a leaf, 1 if it only has
/// children, 2 if it has grandchildren.
pub fn subtree_height(categories: &[Category], id: CategoryId) -> u8 {
    let Some(root) = find(categories, id) else {
        return 0;
    };
    descendants(categories, id)
        .iter()
        .map(|d| depth_below(categories, root.id, d.id))
        .max()
        .unwrap_or(0)
}

fn depth_below(categories: &[Category], ancestor: CategoryId, id: CategoryId) -> u8 {
    let mut depth = 0u8;
    let mut current = Some(id);
    while let Some(cid) = current {
        if cid == ancestor {
            break;
        }
        depth = depth.saturating_add(1);
        current = find(categories, cid).and_then(|c| c.parent_id);
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(id: CategoryId, name: &str, parent_id: Option<CategoryId>, level: u8) -> Category {
        let now = Utc::now();
        Category {
            id,
            name: name.into(),
            slug: slugify(name),
            parent_id,
            level,
            description: None,
            is_active: true,
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Jewelry > Rings > Engagement, plus a lone root Necklaces.
    fn forest() -> Vec<Category> {
        vec![
            node(1, "Jewelry", None, 0),
            node(2, "Rings", Some(1), 1),
            node(3, "Engagement", Some(2), 2),
            node(4, "Necklaces", None, 0),
        ]
    }

    #[test]
    fn no_parent_is_root() {
        assert_eq!(resolve_level(&forest(), None).unwrap(), Placement::ROOT);
    }

    #[test]
    fn level_is_parent_plus_one() {
        let placement = resolve_level(&forest(), Some(2)).unwrap();
        assert_eq!(placement.level, 2);
        assert_eq!(placement.parent_id, Some(2));
    }

    #[test]
    fn level_two_parent_exceeds_depth() {
        let err = resolve_level(&forest(), Some(3)).unwrap_err();
        assert!(matches!(err, CatalogError::DepthExceeded { parent: 3, level: 3 }));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let err = resolve_level(&forest(), Some(99)).unwrap_err();
        assert!(matches!(err, CatalogError::ParentNotFound(99)));
    }

    #[test]
    fn moving_root_under_grandchild_is_circular() {
        let err = check_no_cycle(&forest(), 1, 3).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::CircularReference {
                category: 1,
                parent: 3
            }
        ));
    }

    #[test]
    fn self_parent_is_circular() {
        assert!(check_no_cycle(&forest(), 2, 2).is_err());
    }

    #[test]
    fn unrelated_parent_passes_cycle_check() {
        assert!(check_no_cycle(&forest(), 2, 4).is_ok());
    }

    #[test]
    fn cycle_check_terminates_on_corrupt_loop() {
        let mut cats = forest();
        // 5 <-> 6 loop that never reaches a root
        cats.push(node(5, "Loop A", Some(6), 1));
        cats.push(node(6, "Loop B", Some(5), 1));
        assert!(check_no_cycle(&cats, 1, 5).is_ok());
        assert!(check_no_cycle(&cats, 1, 77).is_ok());
    }

    #[test]
    fn slugify_normalizes() {
        assert_eq!(slugify("Gold Rings"), "gold-rings");
        assert_eq!(slugify("  Silver & Diamond -- Sets! "), "silver-diamond-sets");
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("Rock'n'Roll Bands"), "rocknroll-bands");
        assert_eq!(slugify("snake_case"), "snake-case");
        assert_eq!(slugify("Rings @ Home"), "rings-at-home");
    }

    #[test]
    fn slugify_transliterates_beyond_latin1() {
        assert_eq!(slugify("Łańcuszki"), "lancuszki");
        assert_eq!(slugify("Œuvre Rings"), "oeuvre-rings");
        assert_eq!(slugify("Đồng hồ"), "dong-ho");
        assert_eq!(slugify("Straße"), "strasse");

        let cyrillic = slugify("Ожерелья");
        assert!(cyrillic.starts_with("ozherel"), "{}", cyrillic);
        assert!(cyrillic.bytes().all(|b| b.is_ascii_lowercase() || b == b'-'));
        assert_ne!(slugify("Серьги"), cyrillic);
    }

    #[test]
    fn candidate_slug_prefers_explicit_then_name() {
        assert_eq!(candidate_slug(Some("My Slug"), "Gold", "category"), "my-slug");
        assert_eq!(candidate_slug(Some("  "), "Gold", "category"), "gold");
        assert_eq!(candidate_slug(None, "???", "category"), "category");
    }

    #[test]
    fn slug_collisions_get_numeric_suffix() {
        let mut cats = forest();
        assert_eq!(resolve_unique_slug(&cats, "necklaces-new", None), "necklaces-new");
        assert_eq!(resolve_unique_slug(&cats, "rings", None), "rings-1");
        let mut taken = node(7, "Rings", None, 0);
        taken.slug = "rings-1".into();
        cats.push(taken);
        assert_eq!(resolve_unique_slug(&cats, "rings", None), "rings-2");
    }

    #[test]
    fn own_slug_is_not_a_collision() {
        assert_eq!(resolve_unique_slug(&forest(), "rings", Some(2)), "rings");
    }

    #[test]
    fn ancestors_oldest_first() {
        let cats = forest();
        let names: Vec<&str> = ancestors(&cats, 3).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Jewelry", "Rings"]);
        assert!(ancestors(&cats, 1).is_empty());
    }

    #[test]
    fn descendants_and_height() {
        let cats = forest();
        let ids: Vec<CategoryId> = descendants(&cats, 1).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(subtree_height(&cats, 1), 2);
        assert_eq!(subtree_height(&cats, 2), 1);
        assert_eq!(subtree_height(&cats, 3), 0);
        assert_eq!(subtree_height(&cats, 4), 0);
    }

    #[test]
    fn children_follow_sibling_order() {
        let mut cats = forest();
        let mut bands = node(8, "Bands", Some(1), 1);
        bands.order = -1;
        cats.push(bands);
        let ids: Vec<CategoryId> = children(&cats, 1).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![8, 2]);
    }
}
