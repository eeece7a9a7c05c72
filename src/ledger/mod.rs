pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use memory::InMemoryLedgerStore;
pub use repo::{LedgerStore, PgLedgerStore};
pub use repo_types::{day_key, parse_day_key, today, DailyTotal, LedgerEntry, MealType};
pub use services::{DailyTotalSubscription, Ledger};
