use std::path::PathBuf;

use crate::category::CategoryId;
use crate::product::ProductId;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

/// Every rejection the catalog can hand back to a caller.
///
/// Hierarchy rejections carry the ids involved so the calling layer can
/// compose its own message; nothing here is logged or retried.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("parent category {0} not found")]
    ParentNotFound(CategoryId),

    #[error("placing a category under {parent} would reach level {level}; maximum depth of 3 levels reached")]
    DepthExceeded { parent: CategoryId, level: u8 },

    #[error("category {category} cannot be placed under {parent}: circular reference")]
    CircularReference {
        category: CategoryId,
        parent: CategoryId,
    },

    #[error("category {id} has {children} sub-categories")]
    HasChildren { id: CategoryId, children: usize },

    #[error("category {0} not found")]
    NotFound(CategoryId),

    #[error("slug '{0}' is already taken")]
    SlugConflict(String),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CatalogError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case name of the rejection kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::ParentNotFound(_) => "parent_not_found",
            CatalogError::DepthExceeded { .. } => "depth_exceeded",
            CatalogError::CircularReference { .. } => "circular_reference",
            CatalogError::HasChildren { .. } => "has_children",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::SlugConflict(_) => "slug_conflict",
            CatalogError::ProductNotFound(_) => "product_not_found",
            CatalogError::Invalid { .. } => "invalid",
            CatalogError::Io { .. } => "io",
            CatalogError::Json { .. } => "json",
        }
    }

    /// A slug conflict means the uniqueness pre-check lost a race with the
    /// storage index. Re-deriving the slug and trying once more is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::SlugConflict(_))
    }
}
