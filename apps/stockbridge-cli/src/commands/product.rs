//! # Product Commands
//!
//! Catalog lookups, local edits and soft delete. The ERP sync owns most
//! catalog fields; a local edit marks the product `pending` until the next
//! sync overwrites or confirms it.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Subcommand};
use serde_json::{json, Value};
use stockbridge_core::{Category, Gender, Money, Product};
use stockbridge_db::ProductFilter;

use super::{print_json, AppContext};

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// List products
    List {
        /// Include deactivated products
        #[arg(long, conflicts_with = "inactive")]
        all: bool,

        /// Only deactivated products
        #[arg(long)]
        inactive: bool,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        gender: Option<Gender>,

        /// Text matched against name, code, ERP code and description
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one product with its inventory lines
    Show { code: String },

    /// Edit local catalog fields
    Update(UpdateArgs),

    /// Soft-delete a product (refused while inventory lines exist)
    Deactivate { code: String },
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    code: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Cost price, e.g. 39.90
    #[arg(long)]
    cost: Option<f64>,

    /// Sale price, e.g. 89.90
    #[arg(long)]
    sale: Option<f64>,

    /// Promotional price
    #[arg(long, conflicts_with = "clear_promo")]
    promo: Option<f64>,

    /// Remove the promotional price
    #[arg(long)]
    clear_promo: bool,

    /// Reactivate (true) or hide (false) the product
    #[arg(long, action = ArgAction::Set)]
    active: Option<bool>,
}

impl UpdateArgs {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.cost.is_none()
            && self.sale.is_none()
            && self.promo.is_none()
            && !self.clear_promo
            && self.active.is_none()
    }

    /// Applies the given fields to `product`. Validation happens on save.
    fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(cost) = self.cost {
            product.price.cost = Money::from_decimal(cost);
        }
        if let Some(sale) = self.sale {
            product.price.sale = Money::from_decimal(sale);
        }
        if let Some(promo) = self.promo {
            product.price.promo = Some(Money::from_decimal(promo));
        }
        if self.clear_promo {
            product.price.promo = None;
        }
        if let Some(active) = self.active {
            product.is_active = active;
        }
    }
}

impl ProductCommand {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        let products = ctx.db.products();

        match self {
            ProductCommand::List {
                all,
                inactive,
                category,
                gender,
                search,
            } => {
                let filter = ProductFilter {
                    category,
                    gender,
                    active: list_activity(all, inactive),
                    search,
                };
                let now = Utc::now();
                let rows: Vec<Value> = products
                    .list(&filter)
                    .await?
                    .iter()
                    .map(|product| summary(product, now))
                    .collect();
                print_json(&rows)
            }
            ProductCommand::Show { code } => {
                let product = ctx.product_by_code(&code).await?;
                let lines = ctx.db.inventory().list_by_product(&product.id).await?;
                print_json(&json!({
                    "product": product,
                    "available": product.is_available(Utc::now()),
                    "margin_bps": product.margin_bps(),
                    "current_price": product.current_price(),
                    "inventory": lines,
                }))
            }
            ProductCommand::Update(args) => {
                if args.is_empty() {
                    bail!("Nothing to update; pass at least one field");
                }
                let mut product = ctx.product_by_code(&args.code).await?;
                args.apply(&mut product);
                print_json(&products.update(product).await?)
            }
            ProductCommand::Deactivate { code } => {
                let product = ctx.product_by_code(&code).await?;
                print_json(&products.deactivate(&product.id).await?)
            }
        }
    }
}

fn list_activity(all: bool, inactive: bool) -> Option<bool> {
    match (all, inactive) {
        (_, true) => Some(false),
        (true, false) => None,
        (false, false) => Some(true),
    }
}

/// One row of `product list`.
fn summary(product: &Product, now: DateTime<Utc>) -> Value {
    json!({
        "code": product.code,
        "erp_code": product.erp_code,
        "name": product.name,
        "category": product.category,
        "gender": product.gender,
        "current_price": product.current_price(),
        "is_active": product.is_active,
        "available": product.is_available(now),
        "sync_status": product.sync.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(subcommand)]
        command: ProductCommand,
    }

    fn parse(args: &[&str]) -> ProductCommand {
        let mut argv = vec!["stockbridge"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().command
    }

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".into(),
            code: "CAM-001".into(),
            erp_code: "T-1".into(),
            name: "Camiseta Basica".into(),
            description: None,
            category: Category::TShirt,
            brand: "CROSBY".into(),
            collection: None,
            season: Default::default(),
            gender: Gender::Unisex,
            age_bracket: Default::default(),
            colors: vec![],
            sizes: vec![],
            price: stockbridge_core::PriceSet {
                cost: Money::from_cents(4000),
                sale: Money::from_cents(8990),
                promo: Some(Money::from_cents(6990)),
            },
            materials: vec![],
            care_instructions: vec![],
            tags: vec![],
            images: vec![],
            is_active: true,
            launched_at: None,
            discontinued_at: None,
            sync: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_list_activity() {
        assert_eq!(list_activity(false, false), Some(true));
        assert_eq!(list_activity(true, false), None);
        assert_eq!(list_activity(false, true), Some(false));
    }

    #[test]
    fn test_parse_list_filters() {
        match parse(&["list", "--category", "dress", "--gender", "female", "--search", "linho"]) {
            ProductCommand::List {
                all,
                category,
                gender,
                search,
                ..
            } => {
                assert!(!all);
                assert_eq!(category, Some(Category::Dress));
                assert_eq!(gender, Some(Gender::Female));
                assert_eq!(search.as_deref(), Some("linho"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Harness::try_parse_from(["stockbridge", "list", "--all", "--inactive"]).is_err());
    }

    #[test]
    fn test_update_applies_given_fields_only() {
        let ProductCommand::Update(args) = parse(&[
            "update", "CAM-001", "--name", "Camiseta Gola V", "--sale", "99.90", "--clear-promo",
            "--active", "false",
        ]) else {
            panic!("expected update");
        };
        assert!(!args.is_empty());

        let mut p = product();
        args.apply(&mut p);
        assert_eq!(p.name, "Camiseta Gola V");
        assert_eq!(p.price.sale.cents(), 9990);
        assert_eq!(p.price.cost.cents(), 4000);
        assert_eq!(p.price.promo, None);
        assert!(!p.is_active);
        assert!(p.description.is_none());
    }

    #[test]
    fn test_update_without_fields_is_empty() {
        let ProductCommand::Update(args) = parse(&["update", "CAM-001"]) else {
            panic!("expected update");
        };
        assert!(args.is_empty());
    }

    #[test]
    fn test_summary_reports_availability() {
        let now = Utc::now();
        let mut p = product();
        let row = summary(&p, now);
        assert_eq!(row["available"], json!(true));
        assert_eq!(row["current_price"], json!(6990));
        assert_eq!(row["category"], json!("t_shirt"));

        p.discontinued_at = Some(now - Duration::days(1));
        assert_eq!(summary(&p, now)["available"], json!(false));
    }
}
