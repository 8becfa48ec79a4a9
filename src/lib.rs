//! Inventory ledger and stock transfer engine.
//!
//! Tracks physical stock per product/location as inventory accounts with
//! hard level invariants, records every quantity change as an immutable
//! stock movement, and coordinates two-sided transfers between locations as
//! single transactional units of work with a state-machine-governed
//! transfer record.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;

pub use config::AppConfig;
pub use db::DbPool;
pub use errors::ServiceError;
pub use events::{Event, EventSender};
pub use services::{InventoryService, TransferService};
