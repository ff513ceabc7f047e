//! # Repository Module
//!
//! Database repository implementations for Coldroom POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Back-office command                                                    │
//! │       │                                                                 │
//! │       │  db.inventory().consume_weight(&id, kg)                         │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                    │
//! │  ├── lock_product / persist_weight_ledger   (collaborator primitives)  │
//! │  ├── receive_boxes / consume_weight          (own transaction)          │
//! │  └── *_in variants                           (caller's transaction)     │
//! │       │                                                                 │
//! │       │  plan_* from coldroom-core decides, SQL only records            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and search
//! - [`WeightPriceRepository`](weight_price::WeightPriceRepository) - Pack sizes
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock ledger and depletion
//! - [`SaleRepository`](sale::SaleRepository) - Sale creation and receipts
//! - [`CreditRepository`](credit::CreditRepository) - Credit instalments
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Running costs

pub mod credit;
pub mod expense;
pub mod inventory;
pub mod product;
pub mod sale;
pub mod weight_price;
