//! Nutrition resolution and daily aggregation.
//!
//! Barcodes, free-text queries and nutrition-label OCR text are resolved into
//! [`food::NutrientQuantity`] records, scaled to the portion eaten, appended to
//! the [`ledger::Ledger`] and summed into a live per-day total.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod food;
pub mod ledger;
pub mod profile;
pub mod scan;
pub mod search;
pub mod state;

pub use errors::{LedgerError, ResolveError};
