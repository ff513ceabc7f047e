//! # Command Line
//!
//! The `coldroom` command tree, declared with clap derive. Amounts, weights,
//! dates and enums are parsed through their `FromStr` impls and ids are
//! checked as UUIDs, so commands only ever see valid domain values.
//!
//! ```text
//! coldroom
//! ├── product  add | list | edit
//! ├── size     add
//! ├── stock    receive-boxes | in | out | low | history | edit-in | edit-out
//! ├── sale     create | show
//! ├── credit   list | pay
//! └── expense  add | list | add-category | categories
//! ```

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use coldroom_core::validation::validate_uuid;
use coldroom_core::{
    Money, NewSaleItem, PaymentMethod, StockOutReason, ValidationError, Weight,
};

const ENV_HELP: &str = "\
Environment:
  COLDROOM_DB_PATH          database file (default: platform data dir)
  COLDROOM_STORE_NAME       name printed on receipts
  COLDROOM_VAT_RATE         VAT percentage, e.g. 15
  COLDROOM_LOCK_TIMEOUT_MS  how long to wait for another writer
  COLDROOM_CURRENCY_SYMBOL  symbol printed before amounts
  RUST_LOG                  log filter";

/// Back office for the Coldroom cold-storage store.
#[derive(Debug, Parser)]
#[command(name = "coldroom", version, after_help = ENV_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Catalog maintenance
    #[command(subcommand)]
    Product(ProductCommand),
    /// Pack sizes of boxed-weight products
    #[command(subcommand)]
    Size(SizeCommand),
    /// Stock receipts, removals and corrections
    #[command(subcommand)]
    Stock(StockCommand),
    /// Ring up and look up sales
    #[command(subcommand)]
    Sale(SaleCommand),
    /// Outstanding credit and instalments
    #[command(subcommand)]
    Credit(CreditCommand),
    /// Running costs of the store
    #[command(subcommand)]
    Expense(ExpenseCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ProductCommand {
    /// Add a unit-tracked product
    Add(ProductArgs),
    /// Search active products by name, SKU or category
    List {
        #[arg(default_value = "")]
        query: String,
    },
    /// Change catalog fields of a product
    Edit(ProductEditArgs),
}

/// Fields of `product add`.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ProductArgs {
    pub name: String,
    pub retail: Money,
    pub wholesale: Money,
    #[arg(long)]
    pub sku: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Reorder threshold in units
    #[arg(long)]
    pub min_alert: Option<i64>,
}

/// Fields of `product edit`. At least one change is required.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
#[command(group(ArgGroup::new("changes").required(true).multiple(true)))]
pub struct ProductEditArgs {
    #[arg(value_parser = parse_id)]
    pub product_id: String,
    #[arg(long, group = "changes")]
    pub name: Option<String>,
    /// Empty text clears the SKU
    #[arg(long, group = "changes")]
    pub sku: Option<String>,
    /// Empty text clears the category
    #[arg(long, group = "changes")]
    pub category: Option<String>,
    #[arg(long, group = "changes")]
    pub retail: Option<Money>,
    #[arg(long, group = "changes")]
    pub wholesale: Option<Money>,
    #[arg(long, group = "changes")]
    pub min_alert: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum SizeCommand {
    /// Add a pack size, e.g. `5kg`
    Add {
        #[arg(value_parser = parse_id)]
        product_id: String,
        weight: Weight,
        retail: Money,
        wholesale: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum StockCommand {
    /// Receive sealed boxes of a product
    ReceiveBoxes {
        #[arg(value_parser = parse_id)]
        product_id: String,
        boxes: i64,
        box_weight: Weight,
    },
    /// Receive units
    In {
        #[arg(value_parser = parse_id)]
        product_id: String,
        quantity: i64,
        unit_cost: Money,
        notes: Option<String>,
    },
    /// Remove units outside a sale
    Out {
        #[arg(value_parser = parse_id)]
        product_id: String,
        quantity: i64,
        /// sold, disposed or transfer
        reason: StockOutReason,
    },
    /// Products at or below their alert level
    Low,
    /// Stock entries and stock-outs of a product
    History {
        #[arg(value_parser = parse_id)]
        product_id: String,
    },
    /// Correct a recorded stock entry
    EditIn {
        #[arg(value_parser = parse_id)]
        entry_id: String,
        quantity: i64,
        #[arg(long)]
        cost: Option<Money>,
        /// Empty text clears the notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Correct a recorded stock-out
    EditOut {
        #[arg(value_parser = parse_id)]
        out_id: String,
        quantity: i64,
        #[arg(long)]
        reason: Option<StockOutReason>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum SaleCommand {
    /// Ring up a sale
    Create(SaleArgs),
    /// Print a stored receipt as JSON
    Show {
        #[arg(value_parser = parse_id)]
        sale_id: String,
    },
}

/// Fields of `sale create`.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct SaleArgs {
    /// Charge wholesale prices
    #[arg(long)]
    pub wholesale: bool,
    /// Add VAT at the configured rate
    #[arg(long = "vat")]
    pub apply_vat: bool,
    #[arg(long, default_value = "0")]
    pub discount: Money,
    /// Sell on credit; needs --customer
    #[arg(long)]
    pub credit: bool,
    /// Deposit paid now on a credit sale
    #[arg(long, requires = "credit")]
    pub paid: Option<Money>,
    /// Credit due date, YYYY-MM-DD
    #[arg(long, requires = "credit")]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    /// cash, momo or card
    #[arg(long, default_value = "cash", value_parser = parse_tender)]
    pub method: PaymentMethod,
    /// <product_id>:<qty>[:<weight_price_id>], repeatable
    #[arg(long = "item", required = true, value_parser = parse_item)]
    pub items: Vec<NewSaleItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CreditCommand {
    /// Sales with a balance still owed
    List,
    /// Record an instalment
    Pay {
        #[arg(value_parser = parse_id)]
        sale_id: String,
        amount: Money,
        /// cash, momo or card
        #[arg(value_parser = parse_tender)]
        method: PaymentMethod,
        reference: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ExpenseCommand {
    /// Record an expense
    Add {
        amount: Money,
        #[arg(long, value_parser = parse_id)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Recent expenses with their total
    List {
        #[arg(long, value_parser = parse_id)]
        category: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Create an expense category
    AddCategory { name: String },
    /// List expense categories
    Categories,
}

fn parse_id(value: &str) -> Result<String, ValidationError> {
    validate_uuid(value)?;
    Ok(value.to_string())
}

/// A payment method that moves money now.
fn parse_tender(value: &str) -> Result<PaymentMethod, String> {
    let method: PaymentMethod = value.parse().map_err(|e: ValidationError| e.to_string())?;
    if !method.is_tender() {
        return Err("use --credit for credit sales".to_string());
    }
    Ok(method)
}

/// `<product_id>:<qty>[:<weight_price_id>]`
fn parse_item(value: &str) -> Result<NewSaleItem, String> {
    let mut parts = value.split(':');
    let product_id = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or("expected <product_id>:<qty>[:<weight_price_id>]")?;
    let product_id = parse_id(product_id).map_err(|e| e.to_string())?;
    let quantity = parts
        .next()
        .ok_or("missing quantity")?
        .parse::<i64>()
        .map_err(|_| "quantity must be a whole number")?;
    let weight_price_id = match parts.next().filter(|s| !s.is_empty()) {
        Some(id) => Some(parse_id(id).map_err(|e| e.to_string())?),
        None => None,
    };
    if parts.next().is_some() {
        return Err("too many ':' separated parts".to_string());
    }

    Ok(NewSaleItem {
        product_id,
        weight_price_id,
        quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    const P1: &str = "8c1b7a52-3f4e-4d0a-9a57-2f6f1d2c9e01";
    const P2: &str = "2d4f8e61-7b3a-4c9e-8f12-5a6b7c8d9e02";
    const SIZE: &str = "f0e1d2c3-b4a5-4968-8776-655443322103";

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("coldroom").chain(line.split_whitespace()))
            .map(|cli| cli.command)
    }

    fn kind(line: &str) -> ErrorKind {
        parse(line).unwrap_err().kind()
    }

    #[test]
    fn test_command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_receive_boxes() {
        let command = parse(&format!("stock receive-boxes {P1} 3 20kg")).unwrap();
        assert_eq!(
            command,
            Command::Stock(StockCommand::ReceiveBoxes {
                product_id: P1.into(),
                boxes: 3,
                box_weight: Weight::from_kg(20),
            })
        );
    }

    #[test]
    fn test_credit_sale() {
        let command = parse(&format!(
            "sale create --wholesale --credit --paid 50 --due 2026-12-01 --customer Kofi \
             --item {P1}:2:{SIZE} --item {P2}:1"
        ))
        .unwrap();

        let Command::Sale(SaleCommand::Create(sale)) = command else {
            panic!("expected sale create");
        };
        assert!(sale.wholesale);
        assert!(sale.credit);
        assert_eq!(sale.paid, Some(Money::from_cents(5_000)));
        assert_eq!(sale.due, NaiveDate::from_ymd_opt(2026, 12, 1));
        assert_eq!(sale.method, PaymentMethod::Cash);
        assert_eq!(sale.discount, Money::zero());
        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.items[0].weight_price_id.as_deref(), Some(SIZE));
        assert_eq!(sale.items[1].weight_price_id, None);
    }

    #[test]
    fn test_sale_needs_items_and_credit_for_deposit() {
        assert_eq!(kind("sale create --vat"), ErrorKind::MissingRequiredArgument);
        assert_eq!(
            kind(&format!("sale create --paid 10 --item {P1}:1")),
            ErrorKind::MissingRequiredArgument
        );
        assert_eq!(
            kind(&format!("sale create --method credit --item {P1}:1")),
            ErrorKind::ValueValidation
        );
        assert_eq!(kind(&format!("sale create --item {P1}")), ErrorKind::ValueValidation);
        assert_eq!(kind("sale create --item p1:1"), ErrorKind::ValueValidation);
        assert_eq!(
            kind(&format!("sale create --due 01/12/2026 --credit --item {P1}:1")),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_bad_values_and_unknown_commands() {
        assert_eq!(kind(&format!("stock out {P1} 2 stolen")), ErrorKind::ValueValidation);
        assert_eq!(kind(&format!("credit pay {P1} ten cash")), ErrorKind::ValueValidation);
        assert_eq!(kind("sale show not-an-id"), ErrorKind::ValueValidation);
        assert_eq!(kind("stock shuffle"), ErrorKind::InvalidSubcommand);
        assert_eq!(kind("stock low extra"), ErrorKind::UnknownArgument);
        assert_eq!(kind("--help"), ErrorKind::DisplayHelp);
        assert_eq!(kind(""), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn test_product_add_flags() {
        let command = parse("product add Salmon 55 50 --sku FSH-SAL --min-alert 3").unwrap();
        let Command::Product(ProductCommand::Add(product)) = command else {
            panic!("expected product add");
        };
        assert_eq!(product.retail, Money::from_cents(5_500));
        assert_eq!(product.sku.as_deref(), Some("FSH-SAL"));
        assert_eq!(product.min_alert, Some(3));
        assert_eq!(product.category, None);

        assert_eq!(
            parse("product list").unwrap(),
            Command::Product(ProductCommand::List { query: String::new() })
        );
    }

    #[test]
    fn test_product_edit_needs_a_change() {
        assert_eq!(kind(&format!("product edit {P1}")), ErrorKind::MissingRequiredArgument);

        let command = parse(&format!("product edit {P1} --retail 60 --min-alert 2")).unwrap();
        let Command::Product(ProductCommand::Edit(edit)) = command else {
            panic!("expected product edit");
        };
        assert_eq!(edit.retail, Some(Money::from_cents(6_000)));
        assert_eq!(edit.min_alert, Some(2));
        assert_eq!(edit.name, None);
    }

    #[test]
    fn test_stock_corrections_and_expenses() {
        assert_eq!(
            parse(&format!("stock edit-out {P1} 4 --reason disposed")).unwrap(),
            Command::Stock(StockCommand::EditOut {
                out_id: P1.into(),
                quantity: 4,
                reason: Some(StockOutReason::Disposed),
            })
        );
        assert_eq!(
            parse(&format!("expense add 120.50 --category {P2}")).unwrap(),
            Command::Expense(ExpenseCommand::Add {
                amount: Money::from_cents(12_050),
                category: Some(P2.into()),
                note: None,
            })
        );
        assert_eq!(
            parse("expense list").unwrap(),
            Command::Expense(ExpenseCommand::List {
                category: None,
                limit: 50,
            })
        );
        assert_eq!(kind("expense add 10 --category fuel"), ErrorKind::ValueValidation);
    }
}
