//! Domain types and determinism layer for the trade ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, ItemId, Side
//! - Raw and validated transaction types with stable keys
//! - Chronological ordering helper with insertion-order tie-break

pub mod decimal;
pub mod ordering;
pub mod primitives;
pub mod transaction;

pub use decimal::Decimal;
pub use ordering::{sort_chronological, TransactionOrderingKey};
pub use primitives::{ItemId, Side, TimeMs};
pub use transaction::{RawTimestamp, Transaction, TransactionRecord, ValidationError};
