//! # Seed Data Generator
//!
//! Populates the database with a small cold-store catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./coldroom_dev.db
//! cargo run -p coldroom-db --bin seed
//!
//! # Specify database path, and ring up a few demo sales
//! cargo run -p coldroom-db --bin seed -- --db ./data/coldroom.db --sales
//! ```
//!
//! ## Generated Data
//! - Boxed-weight fish and meat, received in sealed boxes, each with pack
//!   sizes (retail and wholesale price per pack)
//! - Unit-tracked sundries (ice packs, cool bags) with stock entries
//! - Optionally: one cash sale and one credit sale with a deposit

use std::env;

use coldroom_core::{
    Money, NewProduct, NewSale, NewSaleItem, PaymentMethod, SaleType, Weight, DEFAULT_VAT_RATE,
};
use coldroom_db::{Database, DbConfig};

/// (name, sku, category, box kg, boxes, packs as (kg, retail cents, wholesale cents))
type BoxedSeed = (&'static str, &'static str, &'static str, i64, i64, &'static [(i64, i64, i64)]);

const BOXED: &[BoxedSeed] = &[
    ("Salmon", "FSH-SAL", "Fish", 20, 4, &[(1, 5_500, 5_000), (5, 26_000, 23_500), (10, 50_000, 45_000)]),
    ("Mackerel", "FSH-MAC", "Fish", 25, 6, &[(1, 2_800, 2_500), (5, 13_500, 12_000)]),
    ("Horse Mackerel", "FSH-HMC", "Fish", 30, 5, &[(1, 2_400, 2_100), (10, 23_000, 20_000)]),
    ("Tilapia", "FSH-TIL", "Fish", 10, 8, &[(1, 3_200, 2_900), (5, 15_500, 14_000)]),
    ("Chicken Thighs", "MT-CHT", "Poultry", 10, 10, &[(1, 3_000, 2_700), (2, 5_800, 5_200), (10, 28_000, 25_000)]),
    ("Turkey Wings", "MT-TKW", "Poultry", 10, 3, &[(1, 3_600, 3_200), (5, 17_500, 15_500)]),
    ("Beef Offals", "MT-BOF", "Meat", 15, 2, &[(1, 4_000, 3_600)]),
];

/// (name, sku, category, retail cents, wholesale cents, quantity, unit cost cents)
const UNITS: &[(&str, &str, &str, i64, i64, i64, i64)] = &[
    ("Ice Pack", "SUN-ICE", "Sundries", 500, 400, 120, 250),
    ("Cool Bag", "SUN-BAG", "Sundries", 3_500, 3_000, 15, 2_000),
    ("Vacuum Pouch (pack of 50)", "SUN-VAC", "Sundries", 6_000, 5_200, 4, 4_500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./coldroom_dev.db");
    let mut with_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--sales" | "-s" => with_sales = true,
            "--help" | "-h" => {
                println!("Coldroom POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./coldroom_dev.db)");
                println!("  -s, --sales        Also create demo cash and credit sales");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 Coldroom POS Seed Data Generator");
    println!("===================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Receiving boxed stock...");

    let mut first_boxed: Option<(String, String)> = None;
    for (name, sku, category, box_kg, boxes, packs) in BOXED {
        let product = db
            .products()
            .create(&NewProduct {
                sku: Some(sku.to_string()),
                name: name.to_string(),
                category: Some(category.to_string()),
                unit_price: Money::zero(),
                wholesale_price: Money::zero(),
                min_quantity_alert: None,
            })
            .await?;

        let product = db
            .inventory()
            .receive_boxes(&product.id, *boxes, Weight::from_kg(*box_kg))
            .await?;

        let mut smallest_pack = None;
        for (kg, retail, wholesale) in packs.iter() {
            let size = db
                .weight_prices()
                .add(
                    &product.id,
                    Weight::from_kg(*kg),
                    Money::from_cents(*retail),
                    Money::from_cents(*wholesale),
                )
                .await?;
            smallest_pack.get_or_insert(size.id);
        }

        if let (None, Some(pack)) = (&first_boxed, smallest_pack) {
            first_boxed = Some((product.id.clone(), pack));
        }

        println!(
            "  {:<16} {} x {} = {}",
            product.name,
            product.boxes_in_stock,
            product.box_weight,
            product.available_weight()
        );
    }

    println!();
    println!("Stocking sundries...");

    let mut first_unit: Option<String> = None;
    for (name, sku, category, retail, wholesale, quantity, unit_cost) in UNITS {
        let product = db
            .products()
            .create(&NewProduct {
                sku: Some(sku.to_string()),
                name: name.to_string(),
                category: Some(category.to_string()),
                unit_price: Money::from_cents(*retail),
                wholesale_price: Money::from_cents(*wholesale),
                min_quantity_alert: None,
            })
            .await?;

        db.inventory()
            .stock_in(&product.id, *quantity, Money::from_cents(*unit_cost), Some("seed"), None)
            .await?;

        println!("  {:<26} {:>4} units", product.name, quantity);
        first_unit.get_or_insert(product.id);
    }

    if with_sales {
        if let (Some((fish_id, pack_id)), Some(sundry_id)) = (first_boxed, first_unit) {
            println!();
            println!("Ringing up demo sales...");

            let cash = db
                .sales()
                .create_sale(
                    &NewSale {
                        sale_type: SaleType::Retail,
                        customer_name: None,
                        customer_phone: None,
                        payment_method: PaymentMethod::Cash,
                        discount: Money::zero(),
                        apply_vat: true,
                        deposit: None,
                        deposit_method: None,
                        due_date: None,
                        created_by: Some("seed".to_string()),
                        items: vec![
                            NewSaleItem {
                                product_id: fish_id.clone(),
                                weight_price_id: Some(pack_id.clone()),
                                quantity: 3,
                            },
                            NewSaleItem {
                                product_id: sundry_id,
                                weight_price_id: None,
                                quantity: 2,
                            },
                        ],
                    },
                    DEFAULT_VAT_RATE,
                )
                .await?;
            println!("  {} cash   total {}", cash.sale.receipt_number, cash.sale.total());

            let credit = db
                .sales()
                .create_sale(
                    &NewSale {
                        sale_type: SaleType::Wholesale,
                        customer_name: Some("Auntie Esi Chop Bar".to_string()),
                        customer_phone: Some("0244000111".to_string()),
                        payment_method: PaymentMethod::Credit,
                        discount: Money::zero(),
                        apply_vat: false,
                        deposit: Some(Money::from_cents(10_000)),
                        deposit_method: Some(PaymentMethod::MobileMoney),
                        due_date: None,
                        created_by: Some("seed".to_string()),
                        items: vec![NewSaleItem {
                            product_id: fish_id,
                            weight_price_id: Some(pack_id),
                            quantity: 10,
                        }],
                    },
                    DEFAULT_VAT_RATE,
                )
                .await?;
            println!(
                "  {} credit total {}, owes {}",
                credit.sale.receipt_number,
                credit.sale.total(),
                credit.sale.balance_due()
            );
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
