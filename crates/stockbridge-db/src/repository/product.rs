//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Lookups by id, local code and ERP code
//! - Local insert/update (marks the record `pending`)
//! - ERP upsert keyed by `erp_code` (marks the record `synced`)
//! - Soft delete, refused while inventory lines reference the product
//! - Filtered listing and catalog reports (by category, by gender, prices)
//!
//! ## ERP Upsert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    upsert_from_erp(product)                             │
//! │                                                                         │
//! │  INSERT INTO products (...) VALUES (...)                               │
//! │  ON CONFLICT (erp_code) DO UPDATE SET name = excluded.name, ...        │
//! │       │                                                                 │
//! │       ├── new erp_code      → row inserted with the given id           │
//! │       └── known erp_code    → row updated, id + created_at kept        │
//! │                                                                         │
//! │  Same erp_code twice ⇒ exactly one row, latest values win              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteArguments;
use sqlx::query::Query;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use stockbridge_core::validation::validate_product;
use stockbridge_core::{
    AgeBracket, Category, CoreError, Gender, Money, PriceSet, Product, Season, SyncMeta,
    SyncStatus,
};

use super::{
    decode_json, encode_json, generate_id, mark_sync_error, sync_stats, SyncStats, SyncedTable,
};
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    id, code, erp_code, name, description,
    category, brand, collection, season, gender, age_bracket,
    colors, sizes, materials, care_instructions, tags, images,
    cost_cents, sale_cents, promo_cents,
    is_active, launched_at, discontinued_at,
    sync_status, last_synced_at, sync_error,
    created_at, updated_at
"#;

const INSERT_PRODUCT: &str = r#"
    INSERT INTO products (
        id, code, erp_code, name, description,
        category, brand, collection, season, gender, age_bracket,
        colors, sizes, materials, care_instructions, tags, images,
        cost_cents, sale_cents, promo_cents,
        is_active, launched_at, discontinued_at,
        sync_status, last_synced_at, sync_error,
        created_at, updated_at
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5,
        ?6, ?7, ?8, ?9, ?10, ?11,
        ?12, ?13, ?14, ?15, ?16, ?17,
        ?18, ?19, ?20,
        ?21, ?22, ?23,
        ?24, ?25, ?26,
        ?27, ?28
    )
"#;

/// Columns an ERP upsert overwrites. `id`, `erp_code` and `created_at` are
/// never rewritten.
const UPSERT_SET: &str = r#"
    code = excluded.code,
    name = excluded.name,
    description = excluded.description,
    category = excluded.category,
    brand = excluded.brand,
    collection = excluded.collection,
    season = excluded.season,
    gender = excluded.gender,
    age_bracket = excluded.age_bracket,
    colors = excluded.colors,
    sizes = excluded.sizes,
    materials = excluded.materials,
    care_instructions = excluded.care_instructions,
    tags = excluded.tags,
    images = excluded.images,
    cost_cents = excluded.cost_cents,
    sale_cents = excluded.sale_cents,
    promo_cents = excluded.promo_cents,
    is_active = excluded.is_active,
    launched_at = excluded.launched_at,
    discontinued_at = excluded.discontinued_at,
    sync_status = excluded.sync_status,
    last_synced_at = excluded.last_synced_at,
    sync_error = excluded.sync_error,
    updated_at = excluded.updated_at
"#;

/// Same parameter numbering as `INSERT_PRODUCT`; `?27` (created_at) is unused.
const UPDATE_PRODUCT: &str = r#"
    UPDATE products SET
        code = ?2,
        erp_code = ?3,
        name = ?4,
        description = ?5,
        category = ?6,
        brand = ?7,
        collection = ?8,
        season = ?9,
        gender = ?10,
        age_bracket = ?11,
        colors = ?12,
        sizes = ?13,
        materials = ?14,
        care_instructions = ?15,
        tags = ?16,
        images = ?17,
        cost_cents = ?18,
        sale_cents = ?19,
        promo_cents = ?20,
        is_active = ?21,
        launched_at = ?22,
        discontinued_at = ?23,
        sync_status = ?24,
        last_synced_at = ?25,
        sync_error = ?26,
        updated_at = ?28
    WHERE id = ?1
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    code: String,
    erp_code: String,
    name: String,
    description: Option<String>,
    category: Category,
    brand: String,
    collection: Option<String>,
    season: Season,
    gender: Gender,
    age_bracket: AgeBracket,
    colors: String,
    sizes: String,
    materials: String,
    care_instructions: String,
    tags: String,
    images: String,
    cost_cents: i64,
    sale_cents: i64,
    promo_cents: Option<i64>,
    is_active: bool,
    launched_at: Option<DateTime<Utc>>,
    discontinued_at: Option<DateTime<Utc>>,
    sync_status: SyncStatus,
    last_synced_at: Option<DateTime<Utc>>,
    sync_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            colors: decode_json("colors", &self.colors)?,
            sizes: decode_json("sizes", &self.sizes)?,
            materials: decode_json("materials", &self.materials)?,
            care_instructions: decode_json("care_instructions", &self.care_instructions)?,
            tags: decode_json("tags", &self.tags)?,
            images: decode_json("images", &self.images)?,
            id: self.id,
            code: self.code,
            erp_code: self.erp_code,
            name: self.name,
            description: self.description,
            category: self.category,
            brand: self.brand,
            collection: self.collection,
            season: self.season,
            gender: self.gender,
            age_bracket: self.age_bracket,
            price: PriceSet {
                cost: Money::from_cents(self.cost_cents),
                sale: Money::from_cents(self.sale_cents),
                promo: self.promo_cents.map(Money::from_cents),
            },
            is_active: self.is_active,
            launched_at: self.launched_at,
            discontinued_at: self.discontinued_at,
            sync: SyncMeta {
                last_synced_at: self.last_synced_at,
                status: self.sync_status,
                error: self.sync_error,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Binds all 28 product columns in `INSERT_PRODUCT` order.
fn bind_product<'q>(
    sql: &'q str,
    p: &Product,
) -> DbResult<Query<'q, Sqlite, SqliteArguments<'q>>> {
    Ok(sqlx::query(sql)
        .bind(p.id.clone())
        .bind(p.code.clone())
        .bind(p.erp_code.clone())
        .bind(p.name.clone())
        .bind(p.description.clone())
        .bind(p.category)
        .bind(p.brand.clone())
        .bind(p.collection.clone())
        .bind(p.season)
        .bind(p.gender)
        .bind(p.age_bracket)
        .bind(encode_json(&p.colors)?)
        .bind(encode_json(&p.sizes)?)
        .bind(encode_json(&p.materials)?)
        .bind(encode_json(&p.care_instructions)?)
        .bind(encode_json(&p.tags)?)
        .bind(encode_json(&p.images)?)
        .bind(p.price.cost.cents())
        .bind(p.price.sale.cents())
        .bind(p.price.promo.map(|m| m.cents()))
        .bind(p.is_active)
        .bind(p.launched_at)
        .bind(p.discontinued_at)
        .bind(p.sync.status)
        .bind(p.sync.last_synced_at)
        .bind(p.sync.error.clone())
        .bind(p.created_at)
        .bind(p.updated_at))
}

// =============================================================================
// Listing Filter & Reports
// =============================================================================

/// Filter for [`ProductRepository::list`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub gender: Option<Gender>,
    /// `Some(true)` active only, `Some(false)` deactivated only.
    pub active: Option<bool>,
    /// Case-insensitive substring of name, code, ERP code or description.
    pub search: Option<String>,
}

impl ProductFilter {
    /// Active products, no other restriction.
    pub fn active() -> Self {
        ProductFilter {
            active: Some(true),
            ..Default::default()
        }
    }
}

/// Product count of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: Category,
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Product count of one gender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenderCount {
    pub gender: Gender,
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Cost and sale price spread over the whole catalog. Prices are `None`
/// when the catalog is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub products: i64,
    pub average_cost: Option<Money>,
    pub min_cost: Option<Money>,
    pub max_cost: Option<Money>,
    pub average_sale: Option<Money>,
    pub min_sale: Option<Money>,
    pub max_sale: Option<Money>,
}

#[derive(Debug, sqlx::FromRow)]
struct PriceSummaryRow {
    products: i64,
    average_cost: Option<i64>,
    min_cost: Option<i64>,
    max_cost: Option<i64>,
    average_sale: Option<i64>,
    min_sale: Option<i64>,
    max_sale: Option<i64>,
}

impl From<PriceSummaryRow> for PriceSummary {
    fn from(row: PriceSummaryRow) -> Self {
        PriceSummary {
            products: row.products,
            average_cost: row.average_cost.map(Money::from_cents),
            min_cost: row.min_cost.map(Money::from_cents),
            max_cost: row.max_cost.map(Money::from_cents),
            average_sale: row.average_sale.map(Money::from_cents),
            min_sale: row.min_sale.map(Money::from_cents),
            max_sale: row.max_sale.map(Money::from_cents),
        }
    }
}

/// `%term%` for a `LIKE ... ESCAPE '\'` match, wildcards in `term` taken
/// literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_erp_code("T-1001").await?;
/// let stats = repo.sync_stats().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {clause}");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProductRow::into_product).transpose()
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("id = ?1", id).await
    }

    /// Gets a product by its local code. Case-insensitive.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let code = code.trim().to_uppercase();
        self.fetch_one_where("code = ?1", &code).await
    }

    /// Gets a product by its ERP code.
    pub async fn get_by_erp_code(&self, erp_code: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("erp_code = ?1", erp_code.trim()).await
    }

    /// Lists products matching `filter`, ordered by name then code.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let dresses = db.products().list(&ProductFilter {
    ///     category: Some(Category::Dress),
    ///     search: Some("linho".into()),
    ///     ..ProductFilter::active()
    /// }).await?;
    /// ```
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"
        ));

        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(gender) = filter.gender {
            query.push(" AND gender = ").push_bind(gender);
        }
        if let Some(active) = filter.active {
            query.push(" AND is_active = ").push_bind(active);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            query.push(" AND (");
            for (i, column) in ["name", "code", "erp_code", "description"].iter().enumerate() {
                if i > 0 {
                    query.push(" OR ");
                }
                query
                    .push(format!("{column} LIKE "))
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            query.push(")");
        }

        query.push(" ORDER BY name, code");

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Inserts a product created locally.
    ///
    /// The product is validated and normalized first. A blank id gets a
    /// fresh UUID.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::UniqueViolation)` - Code or ERP code already exists
    pub async fn insert(&self, mut product: Product) -> DbResult<Product> {
        validate_product(&mut product).map_err(CoreError::from)?;
        if product.id.is_empty() {
            product.id = generate_id();
        }

        debug!(code = %product.code, erp_code = %product.erp_code, "Inserting product");

        bind_product(INSERT_PRODUCT, &product)?
            .execute(&self.pool)
            .await?;

        Ok(product)
    }

    /// Saves a local edit. The record becomes `pending`; the time of the
    /// last successful sync is kept.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, mut product: Product) -> DbResult<Product> {
        validate_product(&mut product).map_err(CoreError::from)?;
        product.sync.mark_pending();
        product.updated_at = Utc::now();

        debug!(id = %product.id, "Updating product");

        let result = bind_product(UPDATE_PRODUCT, &product)?
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(product)
    }

    /// Creates or updates a product keyed by `erp_code` on behalf of the
    /// ERP sync. The stored record is marked `synced` at `now`.
    ///
    /// When the ERP code is already known, the existing `id` and
    /// `created_at` are kept and every other column is overwritten. Callers
    /// merge absent ERP fields with the stored record beforehand.
    pub async fn upsert_from_erp(&self, mut product: Product, now: DateTime<Utc>) -> DbResult<Product> {
        validate_product(&mut product).map_err(CoreError::from)?;
        if product.id.is_empty() {
            product.id = generate_id();
        }
        product.sync = SyncMeta::synced(now);
        product.updated_at = now;

        debug!(erp_code = %product.erp_code, "Upserting product from ERP");

        let sql = format!("{INSERT_PRODUCT} ON CONFLICT (erp_code) DO UPDATE SET {UPSERT_SET}");
        bind_product(&sql, &product)?.execute(&self.pool).await?;

        self.get_by_erp_code(&product.erp_code)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.erp_code))
    }

    /// Soft-deletes a product by setting `is_active = false`.
    ///
    /// ## Errors
    /// * `DbError::InUse` - Inventory lines still reference the product
    /// * `DbError::NotFound` - Unknown id
    pub async fn deactivate(&self, id: &str) -> DbResult<Product> {
        let items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if items > 0 {
            return Err(DbError::InUse {
                entity: "Product".to_string(),
                id: id.to_string(),
                count: items,
                dependents: "inventory items".to_string(),
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, sync_status = 'pending', updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Product counts per category, largest first.
    pub async fn count_by_category(&self) -> DbResult<Vec<CategoryCount>> {
        let rows = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT
                category,
                COUNT(*) AS total,
                SUM(is_active) AS active,
                COUNT(*) - SUM(is_active) AS inactive
            FROM products
            GROUP BY category
            ORDER BY total DESC, category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Product counts per gender, largest first.
    pub async fn count_by_gender(&self) -> DbResult<Vec<GenderCount>> {
        let rows = sqlx::query_as::<_, GenderCount>(
            r#"
            SELECT
                gender,
                COUNT(*) AS total,
                SUM(is_active) AS active,
                COUNT(*) - SUM(is_active) AS inactive
            FROM products
            GROUP BY gender
            ORDER BY total DESC, gender
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Average, lowest and highest cost and sale price over every product,
    /// deactivated ones included. Averages are rounded to the cent.
    pub async fn price_summary(&self) -> DbResult<PriceSummary> {
        let row = sqlx::query_as::<_, PriceSummaryRow>(
            r#"
            SELECT
                COUNT(*) AS products,
                CAST(ROUND(AVG(cost_cents)) AS INTEGER) AS average_cost,
                MIN(cost_cents) AS min_cost,
                MAX(cost_cents) AS max_cost,
                CAST(ROUND(AVG(sale_cents)) AS INTEGER) AS average_sale,
                MIN(sale_cents) AS min_sale,
                MAX(sale_cents) AS max_sale
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Sync status counters for the catalog.
    pub async fn sync_stats(&self) -> DbResult<SyncStats> {
        sync_stats(&self.pool, SyncedTable::Products).await
    }

    /// Records a failed ERP sync against an existing product.
    pub async fn mark_sync_error(&self, id: &str, message: &str) -> DbResult<()> {
        if !mark_sync_error(&self.pool, SyncedTable::Products, id, message).await? {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::Database;
    use stockbridge_core::ColorVariant;

    #[tokio::test]
    async fn test_insert_normalizes_and_reads_back() {
        let db = fixtures::db().await;
        let mut p = fixtures::product(" cam-001 ", "T-1");
        p.tags = vec!["Verao".into(), "verao".into()];
        p.colors = vec![ColorVariant {
            name: "Preto".into(),
            code: "PRT".into(),
            hex: Some("#000000".into()),
        }];

        let stored = db.products().insert(p).await.unwrap();
        assert_eq!(stored.code, "CAM-001");

        let loaded = db.products().get_by_code("cam-001").await.unwrap().unwrap();
        assert_eq!(loaded.id, stored.id);
        assert_eq!(loaded.tags, vec!["verao".to_string()]);
        assert_eq!(loaded.colors.len(), 1);
        assert_eq!(loaded.price.sale.cents(), 8990);
        assert_eq!(loaded.sync.status, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let db = fixtures::db().await;
        db.products().insert(fixtures::product("CAM-001", "T-1")).await.unwrap();

        let err = db
            .products()
            .insert(fixtures::product("CAM-001", "T-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_upsert_same_erp_code_twice_keeps_one_record() {
        let db = fixtures::db().await;
        let repo = db.products();
        let now = Utc::now();

        let first = repo
            .upsert_from_erp(fixtures::product("CAM-001", "T-1"), now)
            .await
            .unwrap();

        let mut again = fixtures::product("CAM-001", "T-1");
        again.name = "Camiseta Nova".into();
        let second = repo.upsert_from_erp(again, now).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "Camiseta Nova");
        assert_eq!(second.sync.status, SyncStatus::Synced);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_local_update_marks_pending_and_keeps_last_sync() {
        let db = fixtures::db().await;
        let repo = db.products();
        let synced_at = Utc::now();

        let mut p = repo
            .upsert_from_erp(fixtures::product("CAM-001", "T-1"), synced_at)
            .await
            .unwrap();
        p.name = "Renamed".into();

        let updated = repo.update(p).await.unwrap();
        assert_eq!(updated.sync.status, SyncStatus::Pending);

        let loaded = repo.get_by_id(&updated.id).await.unwrap().unwrap();
        assert_eq!(loaded.sync.status, SyncStatus::Pending);
        assert_eq!(loaded.sync.last_synced_at, Some(synced_at));
        assert_eq!(loaded.name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_unknown_product_is_not_found() {
        let db = fixtures::db().await;
        let err = db
            .products()
            .update(fixtures::product("CAM-404", "T-404"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deactivate_refused_while_inventory_exists() {
        let db = fixtures::db().await;
        let product = db.products().insert(fixtures::product("CAM-001", "T-1")).await.unwrap();
        db.inventory()
            .insert(fixtures::item(&product.id, "PRT", "M"))
            .await
            .unwrap();

        let err = db.products().deactivate(&product.id).await.unwrap_err();
        assert!(matches!(err, DbError::InUse { count: 1, .. }));

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_deactivate_without_inventory() {
        let db = fixtures::db().await;
        let product = db.products().insert(fixtures::product("CAM-001", "T-1")).await.unwrap();

        let retired = db.products().deactivate(&product.id).await.unwrap();
        assert!(!retired.is_active);
        assert!(db.products().list(&ProductFilter::active()).await.unwrap().is_empty());
        assert_eq!(db.products().list(&ProductFilter::default()).await.unwrap().len(), 1);
    }

    async fn seeded_catalog() -> Database {
        let db = fixtures::db().await;
        let repo = db.products();

        let mut dress = fixtures::product("VES-001", "T-1");
        dress.name = "Vestido Linho".into();
        dress.category = Category::Dress;
        dress.gender = Gender::Female;
        dress.price.cost = Money::from_cents(6000);
        dress.price.sale = Money::from_cents(15990);

        let mut shirt = fixtures::product("CAM-001", "T-2");
        shirt.name = "Camiseta Basica".into();
        shirt.description = Some("Malha 100% algodao".into());

        let mut kids = fixtures::product("CAM-002", "T-3");
        kids.name = "Camiseta Infantil".into();
        kids.gender = Gender::Kids;
        kids.price.cost = Money::from_cents(2001);
        kids.price.sale = Money::from_cents(4990);

        for product in [dress, shirt, kids] {
            repo.insert(product).await.unwrap();
        }
        let kids = repo.get_by_code("CAM-002").await.unwrap().unwrap();
        repo.deactivate(&kids.id).await.unwrap();
        db
    }

    fn codes(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = seeded_catalog().await;
        let repo = db.products();

        let all = repo.list(&ProductFilter::default()).await.unwrap();
        assert_eq!(codes(&all), vec!["CAM-001", "CAM-002", "VES-001"]);

        let shirts = repo
            .list(&ProductFilter {
                category: Some(Category::TShirt),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(codes(&shirts), vec!["CAM-001", "CAM-002"]);

        let active_shirts = repo
            .list(&ProductFilter {
                category: Some(Category::TShirt),
                ..ProductFilter::active()
            })
            .await
            .unwrap();
        assert_eq!(codes(&active_shirts), vec!["CAM-001"]);

        let retired = repo
            .list(&ProductFilter {
                active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(codes(&retired), vec!["CAM-002"]);

        let female = repo
            .list(&ProductFilter {
                gender: Some(Gender::Female),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(codes(&female), vec!["VES-001"]);
    }

    #[tokio::test]
    async fn test_list_search_matches_text_columns() {
        let db = seeded_catalog().await;
        let repo = db.products();
        let search = |term: &str| ProductFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };

        let by_name = repo.list(&search("camiseta")).await.unwrap();
        assert_eq!(codes(&by_name), vec!["CAM-001", "CAM-002"]);

        let by_code = repo.list(&search("ves-0")).await.unwrap();
        assert_eq!(codes(&by_code), vec!["VES-001"]);

        let by_erp_code = repo.list(&search("t-3")).await.unwrap();
        assert_eq!(codes(&by_erp_code), vec!["CAM-002"]);

        let by_description = repo.list(&search("ALGODAO")).await.unwrap();
        assert_eq!(codes(&by_description), vec!["CAM-001"]);

        // wildcard characters are matched literally
        let percent = repo.list(&search("100%")).await.unwrap();
        assert_eq!(codes(&percent), vec!["CAM-001"]);
        assert!(repo.list(&search("%_")).await.unwrap().is_empty());

        assert_eq!(repo.list(&search("   ")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_count_by_category_and_gender() {
        let db = seeded_catalog().await;
        let repo = db.products();

        let categories = repo.count_by_category().await.unwrap();
        assert_eq!(
            categories,
            vec![
                CategoryCount { category: Category::TShirt, total: 2, active: 1, inactive: 1 },
                CategoryCount { category: Category::Dress, total: 1, active: 1, inactive: 0 },
            ]
        );

        let genders = repo.count_by_gender().await.unwrap();
        assert_eq!(genders.len(), 3);
        let kids = genders.iter().find(|g| g.gender == Gender::Kids).unwrap();
        assert_eq!((kids.total, kids.active, kids.inactive), (1, 0, 1));
        assert!(genders.iter().all(|g| g.total == 1));
    }

    #[tokio::test]
    async fn test_price_summary() {
        let db = fixtures::db().await;
        let empty = db.products().price_summary().await.unwrap();
        assert_eq!(empty, PriceSummary::default());

        let db = seeded_catalog().await;
        let summary = db.products().price_summary().await.unwrap();
        assert_eq!(summary.products, 3);
        // (6000 + 4000 + 2001) / 3 = 4000.33
        assert_eq!(summary.average_cost, Some(Money::from_cents(4000)));
        assert_eq!(summary.min_cost, Some(Money::from_cents(2001)));
        assert_eq!(summary.max_cost, Some(Money::from_cents(6000)));
        // (15990 + 8990 + 4990) / 3 = 9990
        assert_eq!(summary.average_sale, Some(Money::from_cents(9990)));
        assert_eq!(summary.min_sale, Some(Money::from_cents(4990)));
        assert_eq!(summary.max_sale, Some(Money::from_cents(15990)));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("10%_off"), "%10\\%\\_off%");
    }

    #[tokio::test]
    async fn test_sync_stats() {
        let db = fixtures::db().await;
        let now = Utc::now();
        db.products()
            .upsert_from_erp(fixtures::product("CAM-001", "T-1"), now)
            .await
            .unwrap();
        db.products().insert(fixtures::product("CAM-002", "T-2")).await.unwrap();

        let stats = db.products().sync_stats().await.unwrap();
        assert_eq!((stats.total, stats.synced, stats.pending, stats.error), (2, 1, 1, 0));
        assert_eq!(stats.last_synced_at, Some(now));
    }

    #[tokio::test]
    async fn test_mark_sync_error_keeps_last_synced_at() {
        let db = fixtures::db().await;
        let now = Utc::now();
        let product = db
            .products()
            .upsert_from_erp(fixtures::product("CAM-001", "T-1"), now)
            .await
            .unwrap();

        db.products()
            .mark_sync_error(&product.id, "sale price must be positive")
            .await
            .unwrap();

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.sync.status, SyncStatus::Error);
        assert_eq!(loaded.sync.error.as_deref(), Some("sale price must be positive"));
        assert_eq!(loaded.sync.last_synced_at, Some(now));

        let missing = db.products().mark_sync_error("nope", "x").await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }
}
