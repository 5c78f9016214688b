mod logging;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Deserializer, Serialize};
use vitrine_core::{
    hierarchy, product, rules, Catalog, CatalogError, CatalogStore, CategoryChanges, CategoryFilter,
    CategoryId, FooterConfig, HeaderConfig, NewCategory, NewProduct, ProductId, SettingsSection,
    SiteInfo, StoreConfig, MAX_LEVEL,
};

const MAX_NAME_LEN: usize = 255;

/// Accept `null` as "clear" while a missing field stays "keep".
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn validate_name(field: &str, name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("{} must be at most {} characters", field, MAX_NAME_LEN));
    }
    Ok(trimmed.to_string())
}

fn validate_order(order: Option<i32>) -> Result<Option<i32>, String> {
    match order {
        Some(o) if o < 0 => Err(format!("order must be 0 or greater (got {})", o)),
        other => Ok(other),
    }
}

// --- Request types ---

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
struct ListCategoriesRequest {
    /// Only return categories at this level: 0 (parent), 1 (sub-category) or 2 (child-category)
    level: Option<u8>,
    /// Include categories with is_active = false. Default: false
    include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CategoryIdRequest {
    /// ID of the category
    id: CategoryId,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CreateCategoryRequest {
    /// Display name (max 255 characters)
    name: String,
    /// ID of the parent category. Omit to create a root category.
    parent_id: Option<CategoryId>,
    /// URL slug. Omit to derive it from the name. A taken slug gets "-1", "-2", ... appended.
    slug: Option<String>,
    /// Free-text description
    description: Option<String>,
    /// Whether the category shows up in default listings. Default: true
    is_active: Option<bool>,
    /// Sort position among siblings, 0 or greater. Default: 0
    order: Option<i32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct UpdateCategoryRequest {
    /// ID of the category to update
    id: CategoryId,
    /// New display name
    name: Option<String>,
    /// New parent ID. Pass null to make the category a root; omit to keep the current parent.
    #[serde(default, deserialize_with = "double_option")]
    parent_id: Option<Option<CategoryId>>,
    /// New slug, normalized and made unique
    slug: Option<String>,
    /// New description. Pass null to clear it.
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    /// New active flag
    is_active: Option<bool>,
    /// New sort position among siblings
    order: Option<i32>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
struct EligibleParentsRequest {
    /// ID of the category being edited. Omit when choosing a parent for a new category.
    category_id: Option<CategoryId>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddProductItem {
    /// Unique product code, e.g. "BSJ-R-0042"
    code: String,
    /// Display name
    name: String,
    /// URL slug. Omit to derive it from the name.
    slug: Option<String>,
    /// Price as a decimal string, e.g. "1499" or "1499.50"
    price: Option<String>,
    /// ID of the category the product belongs to
    category_id: Option<CategoryId>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddProductsRequest {
    /// Products to add. The batch is all-or-nothing.
    products: Vec<AddProductItem>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AssignProductRequest {
    /// ID of the product
    product_id: ProductId,
    /// Target category ID, or null to detach the product from any category
    category_id: Option<CategoryId>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
struct ListProductsRequest {
    /// Only products in this category. Omit for every product.
    category_id: Option<CategoryId>,
    /// Also include products of the category's sub- and child-categories. Default: false
    include_subcategories: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetHeaderRequest {
    /// Complete header configuration; replaces the stored one
    header: HeaderConfig,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetFooterRequest {
    /// Complete footer configuration; replaces the stored one
    footer: FooterConfig,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetSiteInfoRequest {
    /// Site name, tagline and description
    site_info: SiteInfo,
}

// --- Responses ---

#[derive(Debug, Serialize)]
struct DeleteResponse {
    id: CategoryId,
    product_count: usize,
    message: String,
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Serialization error: {}", e));
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn error_text(text: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(text.into())]))
}

fn rejection(tool: &str, err: &CatalogError) -> Result<CallToolResult, McpError> {
    match err {
        CatalogError::Io { .. } | CatalogError::Json { .. } => {
            tracing::error!(tool, error = %err, "store failure")
        }
        _ => tracing::info!(tool, kind = err.kind(), error = %err, "rejected"),
    }
    error_text(rules::explain(err))
}

pub struct VitrineServer {
    tool_router: ToolRouter<Self>,
    store: CatalogStore,
}

#[tool_router]
impl VitrineServer {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
        }
    }

    /// Run `op` in one load-apply-write unit, once more on a retryable error.
    ///
    /// Within one process the tree resolves slugs against the records it is
    /// about to write, so `SlugConflict` only appears when the data file was
    /// edited or written by another process between load and write. The
    /// retry reloads from disk.
    fn write<T>(&self, op: impl Fn(&mut Catalog) -> vitrine_core::Result<T>) -> vitrine_core::Result<T> {
        match self.store.transact(&op) {
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "retrying after slug conflict");
                self.store.transact(&op)
            }
            other => other,
        }
    }

    #[tool(
        description = "List categories ordered by level, then order, then name. Each entry carries full_path (\"Jewelry > Rings > Engagement\") and level_name (Parent, Sub-category, Child-category). Inactive categories are hidden unless include_inactive is true."
    )]
    fn list_categories(
        &self,
        Parameters(req): Parameters<ListCategoriesRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(level) = req.level.filter(|l| *l > MAX_LEVEL) {
            return error_text(format!("level must be between 0 and {} (got {})", MAX_LEVEL, level));
        }
        let catalog = match self.store.load() {
            Ok(c) => c,
            Err(e) => return rejection("list_categories", &e),
        };
        let filter = CategoryFilter {
            level: req.level,
            include_inactive: req.include_inactive.unwrap_or(false),
        };
        json_result(&catalog.list_categories(&filter))
    }

    #[tool(
        description = "Get one category with its parent summary, its direct children (ordered by order) and the number of products assigned to it."
    )]
    fn get_category(
        &self,
        Parameters(req): Parameters<CategoryIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.load().and_then(|c| c.category_detail(req.id)) {
            Ok(detail) => json_result(&detail),
            Err(e) => rejection("get_category", &e),
        }
    }

    #[tool(
        description = "Create a category. Its level is derived from the parent: root categories are level 0 and at most three levels (0-2) exist. The slug is derived from the name unless given, and made unique."
    )]
    fn create_category(
        &self,
        Parameters(req): Parameters<CreateCategoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let name = match validate_name("name", &req.name) {
            Ok(n) => n,
            Err(msg) => return error_text(msg),
        };
        let order = match validate_order(req.order) {
            Ok(o) => o,
            Err(msg) => return error_text(msg),
        };
        let new = NewCategory {
            name,
            parent_id: req.parent_id,
            slug: req.slug.filter(|s| !s.trim().is_empty()),
            description: req.description,
            is_active: req.is_active,
            order,
        };

        match self.write(|catalog| catalog.create_category(new.clone())) {
            Ok(category) => {
                tracing::info!(id = category.id, slug = %category.slug, level = category.level, "category created");
                match self.store.load().and_then(|c| c.category_detail(category.id)) {
                    Ok(detail) => json_result(&detail),
                    Err(e) => rejection("create_category", &e),
                }
            }
            Err(e) => rejection("create_category", &e),
        }
    }

    #[tool(
        description = "Update a category. Only the given fields change. Moving it (parent_id) re-derives the level of the category and everything below it; moves under itself or a descendant, or deeper than level 2, are refused."
    )]
    fn update_category(
        &self,
        Parameters(req): Parameters<UpdateCategoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let name = match req.name.as_deref().map(|n| validate_name("name", n)).transpose() {
            Ok(n) => n,
            Err(msg) => return error_text(msg),
        };
        let order = match validate_order(req.order) {
            Ok(o) => o,
            Err(msg) => return error_text(msg),
        };
        let changes = CategoryChanges {
            name,
            parent_id: req.parent_id,
            slug: req.slug.filter(|s| !s.trim().is_empty()),
            description: req.description,
            is_active: req.is_active,
            order,
        };
        if changes.is_empty() {
            return error_text("Nothing to update. Pass at least one field besides id.");
        }

        match self.write(|catalog| catalog.update_category(req.id, changes.clone())) {
            Ok(category) => {
                tracing::info!(id = category.id, level = category.level, "category updated");
                match self.store.load().and_then(|c| c.category_detail(category.id)) {
                    Ok(detail) => json_result(&detail),
                    Err(e) => rejection("update_category", &e),
                }
            }
            Err(e) => rejection("update_category", &e),
        }
    }

    #[tool(
        description = "Delete a category that has no sub-categories. Products assigned to it are kept and lose their category; the response reports how many."
    )]
    fn delete_category(
        &self,
        Parameters(req): Parameters<CategoryIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.write(|catalog| catalog.delete_category(req.id)) {
            Ok(outcome) => {
                tracing::info!(id = outcome.id, product_count = outcome.product_count, "category deleted");
                let message = if outcome.product_count == 0 {
                    "Category deleted successfully".to_string()
                } else {
                    format!(
                        "Category deleted successfully. {} product(s) had their category cleared.",
                        outcome.product_count
                    )
                };
                json_result(&DeleteResponse {
                    id: outcome.id,
                    product_count: outcome.product_count,
                    message,
                })
            }
            Err(e) => rejection("delete_category", &e),
        }
    }

    #[tool(
        description = "List the categories that may become a parent: every level 0 or 1 category, minus the edited category and its descendants. Labels are indented by level for use in a picker."
    )]
    fn eligible_parents(
        &self,
        Parameters(req): Parameters<EligibleParentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.load().and_then(|c| c.eligible_parents(req.category_id)) {
            Ok(options) => json_result(&options),
            Err(e) => rejection("eligible_parents", &e),
        }
    }

    #[tool(description = "Add one or more products, optionally assigned to a category")]
    fn add_products(
        &self,
        Parameters(req): Parameters<AddProductsRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.products.is_empty() {
            return error_text("products must contain at least one item");
        }
        let mut batch = Vec::with_capacity(req.products.len());
        for item in req.products {
            let name = match validate_name("name", &item.name) {
                Ok(n) => n,
                Err(msg) => return error_text(format!("Product '{}': {}", item.code, msg)),
            };
            let price = match item.price.as_deref().map(product::parse_price).transpose() {
                Ok(p) => p,
                Err(e) => return error_text(format!("Product '{}': {}", item.code, rules::explain(&e))),
            };
            batch.push(NewProduct {
                code: item.code,
                name,
                slug: item.slug.filter(|s| !s.trim().is_empty()),
                price,
                category_id: item.category_id,
            });
        }

        let added = self.write(|catalog| {
            batch
                .iter()
                .map(|new| catalog.add_product(new.clone()))
                .collect::<vitrine_core::Result<Vec<_>>>()
        });
        match added {
            Ok(products) => {
                tracing::info!(count = products.len(), "products added");
                json_result(&products)
            }
            Err(e) => rejection("add_products", &e),
        }
    }

    #[tool(description = "Move a product to another category, or detach it by passing category_id: null")]
    fn assign_product_category(
        &self,
        Parameters(req): Parameters<AssignProductRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.write(|catalog| catalog.assign_product(req.product_id, req.category_id)) {
            Ok(product) => json_result(&product),
            Err(e) => rejection("assign_product_category", &e),
        }
    }

    #[tool(
        description = "List products, optionally restricted to one category and, with include_subcategories, everything below it"
    )]
    fn list_products(
        &self,
        Parameters(req): Parameters<ListProductsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let catalog = match self.store.load() {
            Ok(c) => c,
            Err(e) => return rejection("list_products", &e),
        };
        let ids = match req.category_id {
            None => Vec::new(),
            Some(id) if !catalog.categories.contains(id) => {
                return rejection("list_products", &CatalogError::NotFound(id));
            }
            Some(id) if req.include_subcategories.unwrap_or(false) => {
                std::iter::once(id)
                    .chain(
                        hierarchy::descendants(catalog.categories.all(), id)
                            .into_iter()
                            .map(|c| c.id),
                    )
                    .collect()
            }
            Some(id) => vec![id],
        };
        json_result(&catalog.products_in(&ids))
    }

    #[tool(description = "Get the storefront settings: header, footer and site info")]
    fn get_settings(&self) -> Result<CallToolResult, McpError> {
        match self.store.read_settings() {
            Ok(settings) => json_result(&settings),
            Err(e) => rejection("get_settings", &e),
        }
    }

    #[tool(
        description = "Replace the header settings: logo, site name, menu items with sub-links, contact info, call-to-action button, social links. Links must be site paths (\"/...\"), \"#\" or http(s) URLs."
    )]
    fn set_header(
        &self,
        Parameters(req): Parameters<SetHeaderRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.update_section(SettingsSection::Header, |s| s.header = req.header) {
            Ok(settings) => json_result(&settings.header),
            Err(e) => rejection("set_header", &e),
        }
    }

    #[tool(
        description = "Replace the footer settings: link columns, social links, contact info, copyright, newsletter block, payment methods"
    )]
    fn set_footer(
        &self,
        Parameters(req): Parameters<SetFooterRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.update_section(SettingsSection::Footer, |s| s.footer = req.footer) {
            Ok(settings) => json_result(&settings.footer),
            Err(e) => rejection("set_footer", &e),
        }
    }

    #[tool(description = "Replace the site name, tagline and description")]
    fn set_site_info(
        &self,
        Parameters(req): Parameters<SetSiteInfoRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.update_section(SettingsSection::SiteInfo, |s| s.site_info = req.site_info) {
            Ok(settings) => json_result(&settings.site_info),
            Err(e) => rejection("set_site_info", &e),
        }
    }

    #[tool(description = "Get the category rules that every write is checked against")]
    fn get_rules(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(rules::RULES)]))
    }
}

#[tool_handler]
impl ServerHandler for VitrineServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!("{}\n\n## Category Rules\n{}", INSTRUCTIONS, rules::RULES);
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"Vitrine manages the catalog of a jewelry storefront: a category tree at most three levels deep, the products filed under it, and the header/footer/site settings the storefront renders.

## Working with categories
1. Call `list_categories` to see the current tree. `full_path` shows where each category sits.
2. Before creating or moving a category, call `eligible_parents` (with `category_id` when moving) and pick a parent from it.
3. Levels and slugs are computed for you. Never try to set `level`; only pass `slug` when a specific URL is required.
4. To delete a branch, delete its deepest categories first. Products survive deletion and lose their category.

## Settings
`get_settings` returns all three sections. `set_header`, `set_footer` and `set_site_info` each replace one section wholesale, so read, edit and write back the full section."#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging(&logging::LoggingConfig::from_env())?;

    let config = StoreConfig::from_env();
    tracing::info!(root = %config.root.display(), "starting vitrine-mcp");

    let service = VitrineServer::new(CatalogStore::open(config))
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use vitrine_core::settings::MenuItem;

    fn server() -> (tempfile::TempDir, VitrineServer) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(StoreConfig::at(dir.path()));
        (dir, VitrineServer::new(store))
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_error(result: &CallToolResult) -> bool {
        result.is_error.unwrap_or(false)
    }

    fn create(server: &VitrineServer, name: &str, parent_id: Option<CategoryId>) -> CategoryId {
        let result = server
            .create_category(Parameters(CreateCategoryRequest {
                name: name.into(),
                parent_id,
                slug: None,
                description: None,
                is_active: None,
                order: None,
            }))
            .unwrap();
        assert!(!is_error(&result), "{}", text(&result));
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        value["id"].as_u64().unwrap()
    }

    fn update(id: CategoryId, json: serde_json::Value) -> UpdateCategoryRequest {
        let mut body = json;
        body["id"] = serde_json::json!(id);
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn update_distinguishes_missing_and_null() {
        let keep: UpdateCategoryRequest = serde_json::from_str(r#"{"id": 1, "name": "Rings"}"#).unwrap();
        assert_eq!(keep.parent_id, None);
        assert_eq!(keep.description, None);

        let clear: UpdateCategoryRequest =
            serde_json::from_str(r#"{"id": 1, "parent_id": null, "description": null}"#).unwrap();
        assert_eq!(clear.parent_id, Some(None));
        assert_eq!(clear.description, Some(None));

        let set: UpdateCategoryRequest = serde_json::from_str(r#"{"id": 1, "parent_id": 4}"#).unwrap();
        assert_eq!(set.parent_id, Some(Some(4)));
    }

    #[test]
    fn create_reports_derived_fields() {
        let (_dir, server) = server();
        let jewelry = create(&server, "Jewelry", None);
        let rings = create(&server, "Rings", Some(jewelry));
        let engagement = create(&server, "Engagement", Some(rings));

        let result = server
            .get_category(Parameters(CategoryIdRequest { id: engagement }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value["full_path"], "Jewelry > Rings > Engagement");
        assert_eq!(value["level"], 2);
        assert_eq!(value["level_name"], "Child-category");
        assert_eq!(value["parent"]["id"], rings);
        assert_eq!(value["product_count"], 0);
    }

    #[test]
    fn depth_and_cycle_rejections_use_friendly_messages() {
        let (_dir, server) = server();
        let a = create(&server, "Jewelry", None);
        let b = create(&server, "Rings", Some(a));
        let c = create(&server, "Engagement", Some(b));

        let result = server
            .create_category(Parameters(CreateCategoryRequest {
                name: "Too Deep".into(),
                parent_id: Some(c),
                slug: None,
                description: None,
                is_active: None,
                order: None,
            }))
            .unwrap();
        assert!(is_error(&result));
        assert_eq!(
            text(&result),
            "Cannot place category here. Maximum depth of 3 levels reached."
        );

        let result = server
            .update_category(Parameters(update(a, serde_json::json!({"parent_id": c}))))
            .unwrap();
        assert!(is_error(&result));
        assert_eq!(
            text(&result),
            "Cannot set parent. This would create a circular reference."
        );
    }

    #[test]
    fn caller_validation_runs_before_the_store() {
        let (_dir, server) = server();
        let result = server
            .create_category(Parameters(CreateCategoryRequest {
                name: "   ".into(),
                parent_id: None,
                slug: None,
                description: None,
                is_active: None,
                order: None,
            }))
            .unwrap();
        assert!(is_error(&result));
        assert!(text(&result).contains("name must not be empty"));

        let result = server
            .create_category(Parameters(CreateCategoryRequest {
                name: "Rings".into(),
                parent_id: None,
                slug: None,
                description: None,
                is_active: None,
                order: Some(-1),
            }))
            .unwrap();
        assert!(is_error(&result));

        let id = create(&server, "Rings", None);
        let result = server
            .update_category(Parameters(update(id, serde_json::json!({}))))
            .unwrap();
        assert!(is_error(&result));
        assert!(text(&result).starts_with("Nothing to update"));
    }

    #[test]
    fn moving_to_root_through_null_parent() {
        let (_dir, server) = server();
        let a = create(&server, "Jewelry", None);
        let b = create(&server, "Rings", Some(a));
        let c = create(&server, "Engagement", Some(b));

        let result = server
            .update_category(Parameters(update(b, serde_json::json!({"parent_id": null}))))
            .unwrap();
        assert!(!is_error(&result), "{}", text(&result));
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value["level"], 0);
        assert!(value["parent"].is_null());

        let result = server
            .get_category(Parameters(CategoryIdRequest { id: c }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value["level"], 1);
        assert_eq!(value["full_path"], "Rings > Engagement");
    }

    #[test]
    fn delete_reports_cleared_products() {
        let (_dir, server) = server();
        let root = create(&server, "Silver", None);
        let leaf = create(&server, "Anklets", Some(root));
        let items = (1..=3)
            .map(|n| AddProductItem {
                code: format!("AN-{}", n),
                name: format!("Anklet {}", n),
                slug: None,
                price: Some("999".into()),
                category_id: Some(leaf),
            })
            .collect();
        let result = server
            .add_products(Parameters(AddProductsRequest { products: items }))
            .unwrap();
        assert!(!is_error(&result), "{}", text(&result));

        let result = server
            .delete_category(Parameters(CategoryIdRequest { id: root }))
            .unwrap();
        assert!(is_error(&result));
        assert_eq!(
            text(&result),
            "Cannot delete category with 1 sub-category. Delete children first."
        );

        let result = server
            .delete_category(Parameters(CategoryIdRequest { id: leaf }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value["product_count"], 3);

        let result = server
            .list_products(Parameters(ListProductsRequest::default()))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        let products = value.as_array().unwrap();
        assert_eq!(products.len(), 3);
        assert!(products.iter().all(|p| p.get("category_id").is_none()));
    }

    #[test]
    fn product_batch_is_all_or_nothing() {
        let (_dir, server) = server();
        let rings = create(&server, "Rings", None);
        let items = vec![
            AddProductItem {
                code: "R-1".into(),
                name: "Band".into(),
                slug: None,
                price: None,
                category_id: Some(rings),
            },
            AddProductItem {
                code: "R-2".into(),
                name: "Solitaire".into(),
                slug: None,
                price: None,
                category_id: Some(404),
            },
        ];
        let result = server
            .add_products(Parameters(AddProductsRequest { products: items }))
            .unwrap();
        assert!(is_error(&result));
        assert_eq!(text(&result), "Category 404 not found.");

        let result = server
            .list_products(Parameters(ListProductsRequest::default()))
            .unwrap();
        assert_eq!(text(&result).trim(), "[]");
    }

    #[test]
    fn list_products_can_include_subcategories() {
        let (_dir, server) = server();
        let gold = create(&server, "Gold", None);
        let rings = create(&server, "Gold Rings", Some(gold));
        let items = vec![
            AddProductItem {
                code: "G-1".into(),
                name: "Gold Chain".into(),
                slug: None,
                price: None,
                category_id: Some(gold),
            },
            AddProductItem {
                code: "G-2".into(),
                name: "Gold Band".into(),
                slug: None,
                price: None,
                category_id: Some(rings),
            },
        ];
        server
            .add_products(Parameters(AddProductsRequest { products: items }))
            .unwrap();

        let count = |include: bool| {
            let result = server
                .list_products(Parameters(ListProductsRequest {
                    category_id: Some(gold),
                    include_subcategories: Some(include),
                }))
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
            value.as_array().unwrap().len()
        };
        assert_eq!(count(false), 1);
        assert_eq!(count(true), 2);
    }

    #[test]
    fn eligible_parents_excludes_own_subtree() {
        let (_dir, server) = server();
        let a = create(&server, "Jewelry", None);
        let b = create(&server, "Rings", Some(a));
        create(&server, "Engagement", Some(b));
        let d = create(&server, "Silver", None);

        let result = server
            .eligible_parents(Parameters(EligibleParentsRequest { category_id: Some(a) }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        let ids: Vec<u64> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![d]);
    }

    #[test]
    fn prices_are_rendered_with_two_decimals() {
        let (_dir, server) = server();
        let item = |code: &str, price: &str| AddProductItem {
            code: code.into(),
            name: format!("Bangle {}", code),
            slug: None,
            price: Some(price.into()),
            category_id: None,
        };
        let result = server
            .add_products(Parameters(AddProductsRequest {
                products: vec![item("B-1", "2499.5")],
            }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value[0]["price"], "2499.50");

        let result = server
            .add_products(Parameters(AddProductsRequest {
                products: vec![item("B-2", "10.999")],
            }))
            .unwrap();
        assert!(is_error(&result));
        assert!(text(&result).starts_with("Product 'B-2': invalid price"));
    }

    #[test]
    fn site_info_edit_is_not_blocked_by_a_broken_footer() {
        let (dir, server) = server();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"footer": {"columns": [{"title": "  "}]}}"#,
        )
        .unwrap();
        let mut site_info = SiteInfo::default();
        site_info.tagline = "Crafting Elegance Since 1990".into();
        let result = server
            .set_site_info(Parameters(SetSiteInfoRequest { site_info }))
            .unwrap();
        assert!(!is_error(&result), "{}", text(&result));

        let result = server
            .set_footer(Parameters(SetFooterRequest {
                footer: FooterConfig::default(),
            }))
            .unwrap();
        assert!(!is_error(&result), "{}", text(&result));
    }

    #[test]
    fn invalid_header_is_not_saved() {
        let (_dir, server) = server();
        let mut header = HeaderConfig::default();
        header.menu_items.push(MenuItem {
            id: 1,
            label: "Rings".into(),
            url: "javascript:alert(1)".into(),
            order: 0,
            subcategories: Vec::new(),
        });
        let result = server
            .set_header(Parameters(SetHeaderRequest { header }))
            .unwrap();
        assert!(is_error(&result));

        let result = server.get_settings().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value["header"]["menu_items"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn empty_listings_are_json_arrays() {
        let (_dir, server) = server();
        let result = server
            .list_categories(Parameters(ListCategoriesRequest::default()))
            .unwrap();
        assert!(!is_error(&result));
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value, serde_json::json!([]));

        create(&server, "Archive", None);
        let result = server
            .list_categories(Parameters(ListCategoriesRequest {
                level: Some(1),
                include_inactive: None,
            }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(value, serde_json::json!([]));
    }

    #[test]
    fn list_rejects_out_of_range_level() {
        let (_dir, server) = server();
        let result = server
            .list_categories(Parameters(ListCategoriesRequest {
                level: Some(3),
                include_inactive: None,
            }))
            .unwrap();
        assert!(is_error(&result));
    }

    #[test]
    fn write_retries_a_slug_conflict_once() {
        let (_dir, server) = server();
        let attempts = Cell::new(0);
        let created = server
            .write(|catalog| {
                attempts.set(attempts.get() + 1);
                if attempts.get() == 1 {
                    return Err(CatalogError::SlugConflict("gold".into()));
                }
                catalog.create_category(NewCategory::named("Gold"))
            })
            .unwrap();
        assert_eq!(attempts.get(), 2);
        assert_eq!(created.slug, "gold");

        let attempts = Cell::new(0);
        let err = server
            .write(|_| -> vitrine_core::Result<()> {
                attempts.set(attempts.get() + 1);
                Err(CatalogError::SlugConflict("gold".into()))
            })
            .unwrap_err();
        assert_eq!(attempts.get(), 2);
        assert!(err.is_retryable());

        let attempts = Cell::new(0);
        let err = server
            .write(|catalog| {
                attempts.set(attempts.get() + 1);
                catalog.delete_category(99)
            })
            .unwrap_err();
        assert_eq!(attempts.get(), 1);
        assert!(matches!(err, CatalogError::NotFound(99)));
    }
}
