pub mod catalog;
pub mod category;
pub mod derived;
pub mod error;
pub mod hierarchy;
pub mod product;
pub mod rules;
pub mod settings;
pub mod store;
pub mod tree;

pub use catalog::Catalog;
pub use category::{Category, CategoryChanges, CategoryFilter, CategoryId, NewCategory, MAX_LEVEL};
pub use derived::{full_path, level_name, CategoryDetail, CategoryView, ParentOption};
pub use error::{CatalogError, Result};
pub use product::{NewProduct, Product, ProductBook, ProductId, ProductLinks};
pub use settings::{FooterConfig, HeaderConfig, SettingsSection, SiteInfo, SiteSettings};
pub use store::{CatalogStore, StoreConfig};
pub use tree::{CategoryTree, DeleteOutcome};
