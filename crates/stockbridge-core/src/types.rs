//! # Domain Types
//!
//! Catalog, stock and movement types shared by every StockBridge crate.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐ 1   * ┌─────────────────┐ 1   * ┌──────────────┐  │
//! │  │    Product      │──────►│  InventoryItem  │──────►│   Movement   │  │
//! │  │  ─────────────  │       │  ─────────────  │       │ ───────────  │  │
//! │  │  id (UUID)      │       │  id (UUID)      │       │ item_id      │  │
//! │  │  code (unique)  │       │  product_id     │       │ sequence     │  │
//! │  │  erp_code (uniq)│       │  color.code     │       │ kind         │  │
//! │  │  price (cents)  │       │  size           │       │ before/after │  │
//! │  │  sync           │       │  quantity       │       │ actor        │  │
//! │  └─────────────────┘       │  alerts, sync   │       └──────────────┘  │
//! │                            └─────────────────┘                          │
//! │                                                                         │
//! │  InventoryItem natural key: (product_id, color.code, size)              │
//! │  Movement key:              (item_id, sequence), append-only            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4, immutable, used for relations
//! - Business key: `code`/`erp_code` for products, the variant triple for
//!   inventory items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Closed Vocabularies
// =============================================================================

/// Declares a closed, text-backed enum with a stable storage label, a
/// default variant, `Display` and `FromStr`.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal, default = $default:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Storage/wire label.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $( $label => Ok($name::$variant), )+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $name::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

labelled_enum! {
    /// Garment category.
    Category, field = "category", default = TShirt {
        TShirt => "t_shirt",
        Pants => "pants",
        Shorts => "shorts",
        Dress => "dress",
        Blouse => "blouse",
        Jacket => "jacket",
        Coat => "coat",
        Skirt => "skirt",
        Bermuda => "bermuda",
        Jumpsuit => "jumpsuit",
        Set => "set",
        Accessories => "accessories",
    }
}

labelled_enum! {
    /// Collection season.
    Season, field = "season", default = YearRound {
        Summer => "summer",
        Winter => "winter",
        Autumn => "autumn",
        Spring => "spring",
        YearRound => "year_round",
    }
}

labelled_enum! {
    /// Target gender of a product line.
    Gender, field = "gender", default = Unisex {
        Male => "male",
        Female => "female",
        Kids => "kids",
        Unisex => "unisex",
    }
}

labelled_enum! {
    /// Target age bracket.
    AgeBracket, field = "age_bracket", default = Adult {
        Baby => "baby",
        Child => "child",
        Teen => "teen",
        Adult => "adult",
    }
}

labelled_enum! {
    /// Physical condition/location state of an inventory line.
    ///
    /// Orthogonal to quantities: nothing in the ledger changes it
    /// automatically.
    InventoryStatus, field = "status", default = Available {
        Available => "available",
        Reserved => "reserved",
        Quarantine => "quarantine",
        Damaged => "damaged",
        InTransit => "in_transit",
    }
}

labelled_enum! {
    /// Kind of quantity change recorded in the movement log.
    MovementKind, field = "movement kind", default = Entry {
        Entry => "entry",
        Exit => "exit",
        Adjustment => "adjustment",
        Transfer => "transfer",
        Reservation => "reservation",
        Release => "release",
    }
}

labelled_enum! {
    /// Supporting document attached to a movement.
    DocumentKind, field = "document kind", default = Other {
        Invoice => "invoice",
        SalesOrder => "sales_order",
        InventoryAdjustment => "inventory_adjustment",
        Transfer => "transfer",
        Other => "other",
    }
}

labelled_enum! {
    /// Reconciliation state of a record against the ERP.
    SyncStatus, field = "sync status", default = Pending {
        Synced => "synced",
        Pending => "pending",
        Error => "error",
    }
}

impl MovementKind {
    /// Kinds that move physical stock and go through `record_movement`.
    pub fn affects_physical(&self) -> bool {
        matches!(
            self,
            MovementKind::Entry | MovementKind::Exit | MovementKind::Adjustment | MovementKind::Transfer
        )
    }
}

// =============================================================================
// Sync Metadata
// =============================================================================

/// Per-record reconciliation state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncMeta {
    pub last_synced_at: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub error: Option<String>,
}

impl SyncMeta {
    /// State of a record just written by the ERP sync path.
    pub fn synced(now: DateTime<Utc>) -> Self {
        SyncMeta {
            last_synced_at: Some(now),
            status: SyncStatus::Synced,
            error: None,
        }
    }

    /// Local edit: needs re-sync. The last successful sync time is kept.
    pub fn mark_pending(&mut self) {
        self.status = SyncStatus::Pending;
    }

    pub fn mark_synced(&mut self, now: DateTime<Utc>) {
        *self = SyncMeta::synced(now);
    }
}

/// Who performed a mutation.
///
/// The ERP sync path writes records as `synced`; every other actor leaves
/// them `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// A local operator (user id or login).
    User(String),
    /// The ERP synchronization job.
    ErpSync,
}

/// Stored actor label for the sync job.
pub const ERP_SYNC_ACTOR: &str = "erp-sync";

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Actor::User(id.into())
    }

    pub fn label(&self) -> &str {
        match self {
            Actor::User(id) => id,
            Actor::ErpSync => ERP_SYNC_ACTOR,
        }
    }

    /// Applies the sync side effect of a mutation made by this actor.
    pub fn stamp(&self, sync: &mut SyncMeta, now: DateTime<Utc>) {
        match self {
            Actor::ErpSync => sync.mark_synced(now),
            Actor::User(_) => sync.mark_pending(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// Brand assigned when neither the operator nor the ERP supplies one.
pub const DEFAULT_BRAND: &str = "CROSBY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorVariant {
    pub name: String,
    pub code: String,
    pub hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLabel {
    pub name: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialComposition {
    pub name: String,
    /// 0-100.
    pub percentage: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub alt: Option<String>,
    pub order: i64,
}

/// Cost, sale and promotional prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceSet {
    pub cost: Money,
    pub sale: Money,
    pub promo: Option<Money>,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Local business code, stored uppercase. Unique.
    pub code: String,

    /// Code of this product in the ERP. Unique; the sync upsert key.
    pub erp_code: String,

    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub brand: String,
    pub collection: Option<String>,
    pub season: Season,
    pub gender: Gender,
    pub age_bracket: AgeBracket,
    pub colors: Vec<ColorVariant>,
    pub sizes: Vec<SizeLabel>,
    pub price: PriceSet,
    pub materials: Vec<MaterialComposition>,
    pub care_instructions: Vec<String>,
    /// Stored lowercase.
    pub tags: Vec<String>,
    pub images: Vec<ProductImage>,

    /// Soft-delete flag.
    pub is_active: bool,
    pub launched_at: Option<DateTime<Utc>>,
    pub discontinued_at: Option<DateTime<Utc>>,

    pub sync: SyncMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Markup of sale over cost in basis points, `None` without both prices.
    pub fn margin_bps(&self) -> Option<i64> {
        self.price.sale.markup_bps(self.price.cost)
    }

    /// True when a promotional price exists and undercuts the sale price.
    pub fn is_on_promotion(&self) -> bool {
        matches!(self.price.promo, Some(promo) if promo.is_positive() && promo < self.price.sale)
    }

    /// Price a customer pays right now.
    pub fn current_price(&self) -> Money {
        match self.price.promo {
            Some(promo) if self.is_on_promotion() => promo,
            _ => self.price.sale,
        }
    }

    /// Active and not yet discontinued at `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.discontinued_at.map_or(true, |at| at > now)
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// Color of an inventory line. `code` is stored uppercase and is part of the
/// natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemColor {
    pub name: String,
    pub code: String,
}

/// Quantity counters. `available` is derived, see [`crate::ledger::recompute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub physical: i64,
    pub reserved: i64,
    pub available: i64,
    pub minimum: i64,
    pub maximum: i64,
}

/// Default upper threshold for new inventory lines.
pub const DEFAULT_MAXIMUM: i64 = 1000;

impl Default for StockLevel {
    fn default() -> Self {
        StockLevel {
            physical: 0,
            reserved: 0,
            available: 0,
            minimum: 0,
            maximum: DEFAULT_MAXIMUM,
        }
    }
}

/// Default warehouse for new inventory lines.
pub const DEFAULT_WAREHOUSE: &str = "PRINCIPAL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub warehouse: String,
    pub aisle: Option<String>,
    pub shelf: Option<String>,
    pub slot: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        Location {
            warehouse: DEFAULT_WAREHOUSE.to_string(),
            aisle: None,
            shelf: None,
            slot: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LotInfo {
    pub number: Option<String>,
    pub manufactured_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
}

/// Price snapshot for a specific stock line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemPricing {
    pub cost: Option<Money>,
    pub sale: Option<Money>,
    pub promo: Option<Money>,
}

/// Derived alert flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockAlerts {
    /// `available <= minimum`
    pub low_stock: bool,
    /// `available <= 0`
    pub zero_stock: bool,
}

/// One stock line per product × color × size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub product_id: String,
    pub color: ItemColor,
    /// Stored uppercase.
    pub size: String,
    pub quantity: StockLevel,
    pub location: Location,
    pub status: InventoryStatus,
    pub lot: Option<LotInfo>,
    pub pricing: Option<ItemPricing>,
    pub alerts: StockAlerts,
    /// Sequence number of the last movement appended for this item.
    pub movement_seq: i64,
    /// ERP code of the stock record this line was synced from.
    pub erp_code: Option<String>,
    pub sync: SyncMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Movement
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub number: String,
}

/// An immutable entry in an item's movement log.
///
/// For physical kinds `quantity_before`/`quantity_after` track `physical`;
/// for reservation and release they track `reserved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub item_id: String,
    /// 1-based, contiguous per item.
    pub sequence: i64,
    pub kind: MovementKind,
    /// Absolute number of units moved.
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub document: Option<DocumentRef>,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
