//! # ERP Wire Records
//!
//! Records as the TOTVS MODA API sends them, and their merge into local
//! catalog and stock types.
//!
//! ## Merge Rules
//! ```text
//! ┌──────────────────────────┬─────────────────────────────────────────────┐
//! │ ERP field                │ On an existing local record                 │
//! ├──────────────────────────┼─────────────────────────────────────────────┤
//! │ numeric (price, qty)     │ absent → keep local, present (even 0) → set │
//! │ enumerated               │ always re-translated (fallback if absent)   │
//! │ name, description, dates │ overwritten                                 │
//! │ colors, sizes            │ overwritten (absent → empty)                │
//! │ materials, care, tags,   │ absent → keep local                         │
//! │ images, location parts   │                                             │
//! └──────────────────────────┴─────────────────────────────────────────────┘
//! ```
//!
//! Records are decoded one at a time from the raw page, so a single bad
//! record fails alone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use stockbridge_core::{
    ColorVariant, InventoryItem, ItemColor, ItemPricing, Location, LotInfo, MaterialComposition,
    Money, PriceSet, Product, ProductImage, SizeLabel, StockAlerts, StockLevel, SyncMeta,
    DEFAULT_BRAND, DEFAULT_WAREHOUSE,
};

use crate::error::{SyncError, SyncResult};
use crate::vocabulary;

// =============================================================================
// Product Records (GET /produtos)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ErpColor {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "codigo", deserialize_with = "code")]
    pub code: String,
    #[serde(default)]
    pub hex: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErpSize {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "ordem", default)]
    pub order: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErpMaterial {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "percentual", default)]
    pub percentage: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErpImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(rename = "ordem", default)]
    pub order: i64,
}

/// One product of the ERP catalog feed. Prices are decimal reais.
#[derive(Debug, Clone, Deserialize)]
pub struct ErpProduct {
    #[serde(rename = "codigo", deserialize_with = "code")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    #[serde(rename = "marca", default)]
    pub brand: Option<String>,
    #[serde(rename = "colecao", default)]
    pub collection: Option<String>,
    #[serde(rename = "temporada", default)]
    pub season: Option<String>,
    #[serde(rename = "genero", default)]
    pub gender: Option<String>,
    #[serde(rename = "faixaEtaria", default)]
    pub age_bracket: Option<String>,
    #[serde(rename = "cores", default)]
    pub colors: Option<Vec<ErpColor>>,
    #[serde(rename = "tamanhos", default)]
    pub sizes: Option<Vec<ErpSize>>,
    #[serde(rename = "precoCusto", default)]
    pub cost_price: Option<f64>,
    #[serde(rename = "precoVenda", default)]
    pub sale_price: Option<f64>,
    #[serde(rename = "precoPromocional", default)]
    pub promo_price: Option<f64>,
    #[serde(rename = "materiais", default)]
    pub materials: Option<Vec<ErpMaterial>>,
    #[serde(rename = "cuidados", default)]
    pub care_instructions: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "imagens", default)]
    pub images: Option<Vec<ErpImage>>,
    #[serde(rename = "ativo", default)]
    pub active: Option<bool>,
    #[serde(rename = "dataLancamento", default, deserialize_with = "lenient_date")]
    pub launched_at: Option<DateTime<Utc>>,
    #[serde(rename = "dataDescontinuacao", default, deserialize_with = "lenient_date")]
    pub discontinued_at: Option<DateTime<Utc>>,
}

impl ErpProduct {
    /// Merges this record into the stored product (or a fresh one).
    ///
    /// The result still needs [`ProductRepository::upsert_from_erp`] to be
    /// validated, stamped and written.
    ///
    /// [`ProductRepository::upsert_from_erp`]: stockbridge_db::ProductRepository::upsert_from_erp
    pub fn merge_into(self, existing: Option<Product>, now: DateTime<Utc>) -> Product {
        let mut product = existing.unwrap_or_else(|| Product {
            id: String::new(),
            code: self.code.clone(),
            erp_code: self.code.clone(),
            name: String::new(),
            description: None,
            category: Default::default(),
            brand: DEFAULT_BRAND.to_string(),
            collection: None,
            season: Default::default(),
            gender: Default::default(),
            age_bracket: Default::default(),
            colors: Vec::new(),
            sizes: Vec::new(),
            price: PriceSet::default(),
            materials: Vec::new(),
            care_instructions: Vec::new(),
            tags: Vec::new(),
            images: Vec::new(),
            is_active: true,
            launched_at: None,
            discontinued_at: None,
            sync: SyncMeta::default(),
            created_at: now,
            updated_at: now,
        });

        product.name = self.name;
        product.description = self.description;
        product.category = vocabulary::category(self.category.as_deref());
        product.brand = self
            .brand
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BRAND.to_string());
        product.collection = self.collection;
        product.season = vocabulary::season(self.season.as_deref());
        product.gender = vocabulary::gender(self.gender.as_deref());
        product.age_bracket = vocabulary::age_bracket(self.age_bracket.as_deref());

        product.colors = self
            .colors
            .unwrap_or_default()
            .into_iter()
            .map(|c| ColorVariant {
                name: c.name,
                code: c.code,
                hex: c.hex,
            })
            .collect();
        product.sizes = self
            .sizes
            .unwrap_or_default()
            .into_iter()
            .map(|s| SizeLabel {
                name: s.name,
                order: s.order,
            })
            .collect();

        product.price = PriceSet {
            cost: self.cost_price.map(Money::from_decimal).unwrap_or(product.price.cost),
            sale: self.sale_price.map(Money::from_decimal).unwrap_or(product.price.sale),
            promo: self.promo_price.map(Money::from_decimal),
        };

        if let Some(materials) = self.materials {
            product.materials = materials
                .into_iter()
                .map(|m| MaterialComposition {
                    name: m.name,
                    percentage: m.percentage,
                })
                .collect();
        }
        if let Some(care) = self.care_instructions {
            product.care_instructions = care;
        }
        if let Some(tags) = self.tags {
            product.tags = tags;
        }
        if let Some(images) = self.images {
            product.images = images
                .into_iter()
                .map(|i| ProductImage {
                    url: i.url,
                    alt: i.alt,
                    order: i.order,
                })
                .collect();
        }

        product.is_active = self.active != Some(false);
        product.launched_at = self.launched_at;
        product.discontinued_at = self.discontinued_at;
        product
    }
}

// =============================================================================
// Stock Records (GET /estoque)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ErpLot {
    #[serde(rename = "numero", default)]
    pub number: Option<String>,
    #[serde(rename = "dataFabricacao", default, deserialize_with = "lenient_date")]
    pub manufactured_at: Option<DateTime<Utc>>,
    #[serde(rename = "dataVencimento", default, deserialize_with = "lenient_date")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "fornecedor", default)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErpPrice {
    #[serde(rename = "custo", default)]
    pub cost: Option<f64>,
    #[serde(rename = "venda", default)]
    pub sale: Option<f64>,
    #[serde(rename = "promocional", default)]
    pub promo: Option<f64>,
}

/// One stock line of the ERP feed.
///
/// The ERP also sends `quantidadeDisponivel`; it is ignored because
/// `available` is always derived locally.
#[derive(Debug, Clone, Deserialize)]
pub struct ErpStock {
    #[serde(rename = "codigo", deserialize_with = "code")]
    pub code: String,
    /// ERP code of the owning product.
    #[serde(rename = "codigoProduto", deserialize_with = "code")]
    pub product_code: String,
    #[serde(rename = "cor", deserialize_with = "code")]
    pub color_code: String,
    #[serde(rename = "nomeCor", default)]
    pub color_name: Option<String>,
    #[serde(rename = "tamanho", deserialize_with = "code")]
    pub size: String,
    #[serde(rename = "quantidadeFisica", default)]
    pub physical: Option<i64>,
    #[serde(rename = "quantidadeReservada", default)]
    pub reserved: Option<i64>,
    #[serde(rename = "quantidadeMinima", default)]
    pub minimum: Option<i64>,
    #[serde(rename = "quantidadeMaxima", default)]
    pub maximum: Option<i64>,
    #[serde(rename = "deposito", default)]
    pub warehouse: Option<String>,
    #[serde(rename = "corredor", default)]
    pub aisle: Option<String>,
    #[serde(rename = "prateleira", default)]
    pub shelf: Option<String>,
    #[serde(rename = "posicao", default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "lote", default)]
    pub lot: Option<ErpLot>,
    #[serde(rename = "preco", default)]
    pub price: Option<ErpPrice>,
}

impl ErpStock {
    /// Merges this record into the stored line (or a fresh one under
    /// `product_id`). Quantities are written as-is; no movement is implied.
    pub fn merge_into(
        self,
        product_id: &str,
        existing: Option<InventoryItem>,
        now: DateTime<Utc>,
    ) -> InventoryItem {
        let fresh = existing.is_none();
        let mut item = existing.unwrap_or_else(|| InventoryItem {
            id: String::new(),
            product_id: product_id.to_string(),
            color: ItemColor {
                name: String::new(),
                code: self.color_code.clone(),
            },
            size: self.size.clone(),
            quantity: StockLevel::default(),
            location: Location::default(),
            status: Default::default(),
            lot: None,
            pricing: None,
            alerts: StockAlerts::default(),
            movement_seq: 0,
            erp_code: None,
            sync: SyncMeta::default(),
            created_at: now,
            updated_at: now,
        });

        if let Some(name) = self.color_name.filter(|n| !n.trim().is_empty()) {
            item.color.name = name;
        } else if item.color.name.trim().is_empty() {
            item.color.name = self.color_code.clone();
        }

        let q = &mut item.quantity;
        q.physical = self.physical.unwrap_or(q.physical);
        q.reserved = self.reserved.unwrap_or(q.reserved);
        q.minimum = self.minimum.unwrap_or(q.minimum);
        q.maximum = self.maximum.unwrap_or(q.maximum);

        let loc = &mut item.location;
        if let Some(warehouse) = self.warehouse.filter(|w| !w.trim().is_empty()) {
            loc.warehouse = warehouse;
        } else if fresh {
            loc.warehouse = DEFAULT_WAREHOUSE.to_string();
        }
        loc.aisle = self.aisle.or(loc.aisle.take());
        loc.shelf = self.shelf.or(loc.shelf.take());
        loc.slot = self.slot.or(loc.slot.take());

        item.status = vocabulary::inventory_status(self.status.as_deref());

        if let Some(lot) = self.lot {
            item.lot = Some(LotInfo {
                number: lot.number,
                manufactured_at: lot.manufactured_at,
                expires_at: lot.expires_at,
                supplier: lot.supplier,
            });
        }
        if let Some(price) = self.price {
            item.pricing = Some(ItemPricing {
                cost: price.cost.map(Money::from_decimal),
                sale: price.sale.map(Money::from_decimal),
                promo: price.promo.map(Money::from_decimal),
            });
        }

        item.erp_code = Some(self.code);
        item
    }
}

// =============================================================================
// Record Decoding
// =============================================================================

/// Decodes one record of a page. The error names the record by its
/// `codigo` when the raw JSON has one, otherwise by position.
pub fn decode_record<T>(raw: &Value, page: u32, index: usize) -> SyncResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    T::deserialize(raw).map_err(|e| SyncError::MalformedRecord {
        reference: record_reference(raw, page, index),
        reason: e.to_string(),
    })
}

/// Human-readable handle for a raw record in logs.
pub fn record_reference(raw: &Value, page: u32, index: usize) -> String {
    match raw.get("codigo") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => format!("page {page} #{}", index + 1),
    }
}

// =============================================================================
// Lenient Field Decoders
// =============================================================================

/// Accepts codes sent as strings or as bare numbers.
fn code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Text(String),
        Number(serde_json::Number),
    }

    let code = match RawCode::deserialize(deserializer)? {
        RawCode::Text(text) => text.trim().to_string(),
        RawCode::Number(number) => number.to_string(),
    };
    if code.is_empty() {
        return Err(serde::de::Error::custom("empty code"));
    }
    Ok(code)
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC),
/// plain `YYYY-MM-DD` dates, null and empty strings.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_erp_date(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_erp_date(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(naive.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()));
    }
    Err(format!("unrecognized date `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use stockbridge_core::{Category, InventoryStatus, Season, DEFAULT_MAXIMUM};

    fn erp_product(value: Value) -> ErpProduct {
        decode_record(&value, 1, 0).unwrap()
    }

    #[test]
    fn test_new_product_from_erp() {
        let now = Utc::now();
        let product = erp_product(json!({
            "codigo": "T-100",
            "nome": "Camiseta Gola V",
            "categoria": "camiseta",
            "temporada": "VERAO",
            "cores": [{"nome": "Preto", "codigo": "PRT", "hex": "#000000"}],
            "tamanhos": [{"nome": "P", "ordem": 1}, {"nome": "M", "ordem": 2}],
            "precoCusto": 40.0,
            "precoVenda": 89.9,
            "dataLancamento": "2026-03-01"
        }))
        .merge_into(None, now);

        assert_eq!(product.code, "T-100");
        assert_eq!(product.erp_code, "T-100");
        assert_eq!(product.brand, DEFAULT_BRAND);
        assert_eq!(product.category, Category::TShirt);
        assert_eq!(product.season, Season::Summer);
        assert_eq!(product.price.sale.cents(), 8990);
        assert_eq!(product.sizes.len(), 2);
        assert!(product.is_active);
        assert_eq!(
            product.launched_at,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_absent_prices_keep_local_values() {
        let now = Utc::now();
        let mut existing = erp_product(json!({"codigo": "T-1", "nome": "A", "precoCusto": 40.0, "precoVenda": 89.9, "tags": ["basico"]}))
            .merge_into(None, now);
        existing.id = "p-1".into();
        existing.code = "CAM-001".into();

        let merged = erp_product(json!({"codigo": "T-1", "nome": "B", "precoVenda": 0, "ativo": false}))
            .merge_into(Some(existing), now);

        assert_eq!(merged.id, "p-1");
        assert_eq!(merged.code, "CAM-001");
        assert_eq!(merged.name, "B");
        assert_eq!(merged.price.cost.cents(), 4000);
        assert_eq!(merged.price.sale.cents(), 0);
        assert_eq!(merged.tags, vec!["basico".to_string()]);
        assert!(!merged.is_active);
    }

    #[test]
    fn test_stock_merge_preserves_absent_quantities() {
        let now = Utc::now();
        let record = |value: Value| -> ErpStock { decode_record(&value, 1, 0).unwrap() };

        let fresh = record(json!({
            "codigo": "E-1", "codigoProduto": "T-1", "cor": "PRT", "tamanho": "M",
            "quantidadeFisica": 10, "status": "quarentena"
        }))
        .merge_into("p-1", None, now);

        assert_eq!(fresh.color.name, "PRT");
        assert_eq!(fresh.quantity.physical, 10);
        assert_eq!(fresh.quantity.maximum, DEFAULT_MAXIMUM);
        assert_eq!(fresh.location.warehouse, DEFAULT_WAREHOUSE);
        assert_eq!(fresh.status, InventoryStatus::Quarantine);
        assert_eq!(fresh.erp_code.as_deref(), Some("E-1"));

        let mut existing = fresh;
        existing.quantity.minimum = 3;
        existing.location.aisle = Some("A1".into());

        let merged = record(json!({
            "codigo": "E-1", "codigoProduto": "T-1", "cor": "PRT", "tamanho": "M",
            "quantidadeFisica": 0, "nomeCor": "Preto"
        }))
        .merge_into("p-1", Some(existing), now);

        assert_eq!(merged.quantity.physical, 0);
        assert_eq!(merged.quantity.minimum, 3);
        assert_eq!(merged.location.aisle.as_deref(), Some("A1"));
        assert_eq!(merged.color.name, "Preto");
        assert_eq!(merged.status, InventoryStatus::Available);
    }

    #[test]
    fn test_numeric_codes_are_accepted() {
        let stock: ErpStock = decode_record(
            &json!({"codigo": 991, "codigoProduto": 12, "cor": "01", "tamanho": 38}),
            1,
            0,
        )
        .unwrap();
        assert_eq!(stock.code, "991");
        assert_eq!(stock.product_code, "12");
        assert_eq!(stock.size, "38");
    }

    #[test]
    fn test_malformed_record_reference() {
        let err = decode_record::<ErpProduct>(&json!({"nome": "sem codigo"}), 2, 4).unwrap_err();
        match err {
            SyncError::MalformedRecord { reference, .. } => assert_eq!(reference, "page 2 #5"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = decode_record::<ErpProduct>(&json!({"codigo": "T-9"}), 1, 0).unwrap_err();
        assert!(matches!(err, SyncError::MalformedRecord { ref reference, .. } if reference == "T-9"));
    }

    #[test]
    fn test_parse_erp_date() {
        let expected = Utc.with_ymd_and_hms(2026, 5, 10, 12, 30, 0).unwrap();
        assert_eq!(parse_erp_date("2026-05-10T12:30:00Z").unwrap(), Some(expected));
        assert_eq!(parse_erp_date("2026-05-10T09:30:00-03:00").unwrap(), Some(expected));
        assert_eq!(parse_erp_date("2026-05-10T12:30:00").unwrap(), Some(expected));
        assert_eq!(
            parse_erp_date("2026-05-10").unwrap(),
            Some(Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_erp_date("").unwrap(), None);
        assert!(parse_erp_date("10/05/2026").is_err());
    }
}
