//! Stockledger
//!
//! The inventory ledger and movement engine of an ERP backend: an
//! append-only stock journal, transactionally-maintained per-warehouse
//! balance aggregates, batch tracking with expiry-ordered (FEFO)
//! allocation, and a reversible warehouse-to-warehouse transfer workflow.
//!
//! The engine is consumed, not exposed: document-workflow services (GRN
//! confirmation, sales dispatch, scrap entry) call it inside their own
//! database transactions and translate its errors into request-level
//! failures.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod queries;
pub mod services;

pub use config::AppConfig;
pub use errors::ServiceError;
pub use queries::stock_queries::{LedgerHistoryFilter, StockQueryService};
pub use services::batches::{BatchService, FefoAllocation, NewBatch};
pub use services::movements::{
    BalanceKey, MovementDirection, MovementService, StockMovement,
};
pub use services::transfers::{
    ReceiptLine, StockTransferService, TenantContext, TransferInput, TransferLineInput,
    TransferWithLines,
};
