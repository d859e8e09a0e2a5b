//! Catalog store adapter
//!
//! Reads products, treatments (soins) and packages (forfaits) into typed
//! models and applies versioned edits to consumable and soin lists.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{
    check_version, normalize_expected_consumables, validate_expected_consumables, validate_soin_ids,
    validate_stock_levels, CatalogSnapshot, ExpectedConsumable, Package, Product, Treatment,
};

/// Catalog service for reading and editing the clinic catalog
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    unit: String,
    unit_price: Decimal,
    selling_price: Option<Decimal>,
    quantity: i32,
    min_quantity: i32,
    expiry_date: Option<NaiveDate>,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            unit: row.unit,
            unit_price: row.unit_price,
            selling_price: row.selling_price,
            quantity: row.quantity,
            min_quantity: row.min_quantity,
            expiry_date: row.expiry_date,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct SoinRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    expected_consumables: serde_json::Value,
    is_active: bool,
    version: i32,
}

impl From<SoinRow> for Treatment {
    fn from(row: SoinRow) -> Self {
        let normalized = normalize_expected_consumables(&row.expected_consumables);
        if normalized.dropped > 0 || normalized.merged > 0 {
            tracing::warn!(
                soin_id = %row.id,
                dropped = normalized.dropped,
                merged = normalized.merged,
                "Normalized stored consumable list"
            );
        }
        Treatment {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            expected_consumables: normalized.consumables,
            is_active: row.is_active,
            version: row.version,
        }
    }
}

#[derive(Debug, FromRow)]
struct ForfaitRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    soin_ids: Vec<Uuid>,
    prix_total: Decimal,
    prix_reduit: Decimal,
    version: i32,
}

impl From<ForfaitRow> for Package {
    fn from(row: ForfaitRow) -> Self {
        Package {
            id: row.id,
            name: row.name,
            description: row.description,
            soin_ids: row.soin_ids,
            prix_total: row.prix_total,
            prix_reduit: row.prix_reduit,
            version: row.version,
        }
    }
}

/// Input for replacing a treatment's expected consumables
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSoinConsumablesInput {
    #[validate(range(min = 1))]
    pub expected_version: i32,
    pub expected_consumables: Vec<ExpectedConsumable>,
}

/// Input for replacing a package's soin list
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateForfaitSoinsInput {
    #[validate(range(min = 1))]
    pub expected_version: i32,
    #[validate(length(min = 1))]
    pub soin_ids: Vec<Uuid>,
}

const PRODUCT_COLUMNS: &str = "id, name, unit, unit_price, selling_price, quantity, min_quantity, expiry_date, is_active";
const SOIN_COLUMNS: &str = "id, name, description, price, expected_consumables, is_active, version";
const FORFAIT_COLUMNS: &str = "id, name, description, soin_ids, prix_total, prix_reduit, version";

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List active products ordered by name
    pub async fn list_active_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE is_active = true ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let products: Vec<Product> = rows.into_iter().map(Product::from).collect();
        for product in &products {
            if let Err(reason) = validate_stock_levels(product) {
                tracing::warn!(product_id = %product.id, reason, "Product has inconsistent stock data");
            }
        }
        Ok(products)
    }

    /// List active treatments with their normalized consumable lists
    pub async fn list_active_treatments(&self) -> AppResult<Vec<Treatment>> {
        let rows = sqlx::query_as::<_, SoinRow>(&format!(
            "SELECT {} FROM soins WHERE is_active = true ORDER BY name",
            SOIN_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Treatment::from).collect())
    }

    /// List all packages
    pub async fn list_packages(&self) -> AppResult<Vec<Package>> {
        let rows = sqlx::query_as::<_, ForfaitRow>(&format!(
            "SELECT {} FROM forfaits ORDER BY name",
            FORFAIT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Package::from).collect())
    }

    /// Fetch the catalog once for a whole pricing or alerting workflow
    pub async fn snapshot(&self) -> AppResult<CatalogSnapshot> {
        let products = self.list_active_products().await?;
        let treatments = self.list_active_treatments().await?;
        let packages = self.list_packages().await?;

        tracing::debug!(
            products = products.len(),
            treatments = treatments.len(),
            packages = packages.len(),
            "Loaded catalog snapshot"
        );

        Ok(CatalogSnapshot::new(products, treatments, packages))
    }

    /// Fetch one treatment whatever its active flag
    pub async fn find_soin(&self, soin_id: Uuid) -> AppResult<Option<Treatment>> {
        let row = sqlx::query_as::<_, SoinRow>(&format!(
            "SELECT {} FROM soins WHERE id = $1",
            SOIN_COLUMNS
        ))
        .bind(soin_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Treatment::from))
    }

    /// Fetch products by id whatever their active flag
    pub async fn find_products(&self, product_ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = ANY($1)",
            PRODUCT_COLUMNS
        ))
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Replace a treatment's expected consumables if the stored version matches
    pub async fn update_soin_consumables(
        &self,
        soin_id: Uuid,
        input: UpdateSoinConsumablesInput,
    ) -> AppResult<Treatment> {
        input.validate()?;
        validate_expected_consumables(&input.expected_consumables).map_err(|msg| {
            AppError::Validation {
                field: "expected_consumables".to_string(),
                message: msg.to_string(),
                message_fr: "Liste de consommables invalide".to_string(),
            }
        })?;

        let product_ids: Vec<Uuid> = input
            .expected_consumables
            .iter()
            .map(|c| c.product_id)
            .collect();
        self.ensure_products_exist(&product_ids).await?;

        let payload = serde_json::to_value(&input.expected_consumables)
            .map_err(|e| AppError::Internal(format!("Failed to encode consumables: {}", e)))?;

        let mut tx = self.db.begin().await?;
        lock_version(&mut tx, "soins", "Soin", soin_id, input.expected_version).await?;

        let row = sqlx::query_as::<_, SoinRow>(&format!(
            r#"
            UPDATE soins
            SET expected_consumables = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SOIN_COLUMNS
        ))
        .bind(soin_id)
        .bind(payload)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(soin_id = %soin_id, version = row.version, "Updated soin consumables");
        Ok(Treatment::from(row))
    }

    /// Replace a package's soin list if the stored version matches
    pub async fn update_forfait_soins(
        &self,
        forfait_id: Uuid,
        input: UpdateForfaitSoinsInput,
    ) -> AppResult<Package> {
        input.validate()?;
        validate_soin_ids(&input.soin_ids).map_err(|msg| AppError::Validation {
            field: "soin_ids".to_string(),
            message: msg.to_string(),
            message_fr: "Un forfait doit contenir au moins un soin".to_string(),
        })?;

        let mut distinct = input.soin_ids.clone();
        distinct.sort();
        distinct.dedup();
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM soins WHERE id = ANY($1)")
            .bind(&distinct)
            .fetch_one(&self.db)
            .await?;
        if known != distinct.len() as i64 {
            return Err(AppError::Validation {
                field: "soin_ids".to_string(),
                message: "Package references an unknown soin".to_string(),
                message_fr: "Le forfait référence un soin inconnu".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        lock_version(&mut tx, "forfaits", "Forfait", forfait_id, input.expected_version).await?;

        let row = sqlx::query_as::<_, ForfaitRow>(&format!(
            r#"
            UPDATE forfaits
            SET soin_ids = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FORFAIT_COLUMNS
        ))
        .bind(forfait_id)
        .bind(&input.soin_ids)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(forfait_id = %forfait_id, version = row.version, "Updated forfait soins");
        Ok(Package::from(row))
    }

    async fn ensure_products_exist(&self, product_ids: &[Uuid]) -> AppResult<()> {
        if product_ids.is_empty() {
            return Ok(());
        }
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE id = ANY($1)")
            .bind(product_ids)
            .fetch_one(&self.db)
            .await?;
        if known != product_ids.len() as i64 {
            return Err(AppError::Validation {
                field: "expected_consumables".to_string(),
                message: "Consumable list references an unknown product".to_string(),
                message_fr: "La liste de consommables référence un produit inconnu".to_string(),
            });
        }
        Ok(())
    }
}

/// Lock a versioned row for the rest of the transaction and check that the
/// edit was made against its current version
async fn lock_version(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    resource: &str,
    id: Uuid,
    expected_version: i32,
) -> AppResult<()> {
    let current = sqlx::query_scalar::<_, i32>(&format!(
        "SELECT version FROM {} WHERE id = $1 FOR UPDATE",
        table
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(resource.to_string()))?;

    check_version(expected_version, current).map_err(|err| {
        tracing::warn!(id = %id, resource, error = %err, "Rejected edit with stale version");
        AppError::Conflict {
            resource: resource.to_lowercase(),
            message: format!("{} was modified by someone else; reload and retry", resource),
            message_fr: format!("{} a été modifié entre-temps ; rechargez puis réessayez", resource),
        }
    })
}
