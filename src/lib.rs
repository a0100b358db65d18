pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;

pub use config::Config;
pub use domain::{Decimal, ItemId, Side, TimeMs, Transaction, TransactionRecord};
pub use engine::{
    aggregate, compute_fee_profile, reconcile, FeeInputs, FeeProfile, LedgerSummary,
    MatchedTrade, TradeFilter,
};
pub use error::AppError;
pub use ledger::Ledger;
