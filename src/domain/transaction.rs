//! Transaction types: the raw wire record and its validated form.

use crate::domain::{Decimal, ItemId, Side, TimeMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp as submitted: epoch milliseconds or an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// An unvalidated transaction record as received from a data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(deserialize_with = "item_id_from_string_or_number")]
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub timestamp: RawTimestamp,
    pub is_buy: bool,
    pub quantity: i64,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
}

fn item_id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Number(i64),
        Text(String),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => n.to_string(),
        StringOrNumber::Text(s) => s,
    })
}

/// Why a record was refused at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ValidationError {
    #[error("item id is empty")]
    EmptyItemId,
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
    #[error("unit price must be non-negative, got {0}")]
    NegativePrice(String),
    #[error("unit price is not a finite number")]
    NonFinitePrice,
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("{quantity} units at {unit_price} is outside the supported notional range")]
    NotionalOverflow { quantity: i64, unit_price: String },
}

/// Largest accepted quantity for a single record.
pub const MAX_QUANTITY: u64 = 1_000_000_000_000;
/// Largest accepted unit price for a single record.
///
/// With [`MAX_QUANTITY`] this bounds the proceeds and cost basis of any
/// single sale by 1e25, below the decimal range.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(10_000_000_000_000, 0);

impl TransactionRecord {
    /// Validate the record into an immutable [`Transaction`].
    ///
    /// `seq` is the ingestion sequence number used to break timestamp ties.
    pub fn validate(&self, seq: u64) -> Result<Transaction, ValidationError> {
        let item_id = self.item_id.trim();
        if item_id.is_empty() {
            return Err(ValidationError::EmptyItemId);
        }

        if self.quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity(self.quantity));
        }

        let unit_price = Decimal::from_f64(self.unit_price).ok_or(ValidationError::NonFinitePrice)?;
        if unit_price.is_negative() {
            return Err(ValidationError::NegativePrice(unit_price.to_canonical_string()));
        }
        if self.quantity as u64 > MAX_QUANTITY || unit_price > MAX_UNIT_PRICE {
            return Err(ValidationError::NotionalOverflow {
                quantity: self.quantity,
                unit_price: unit_price.to_canonical_string(),
            });
        }

        let timestamp = match &self.timestamp {
            RawTimestamp::Millis(ms) if *ms < 0 => {
                return Err(ValidationError::InvalidTimestamp(ms.to_string()))
            }
            RawTimestamp::Millis(ms) => TimeMs::new(*ms),
            RawTimestamp::Text(s) => TimeMs::parse_rfc3339(s.trim())
                .map_err(|e| ValidationError::InvalidTimestamp(format!("{}: {}", s, e)))?,
        };

        let item_name = self
            .item_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Transaction::new(
            ItemId::new(item_id),
            item_name,
            timestamp,
            Side::from_is_buy(self.is_buy),
            self.quantity as u64,
            unit_price,
            self.transaction_id,
            seq,
        ))
    }
}

/// A single executed trade, validated and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Stable identity used for deduplication.
    pub key: String,
    pub item_id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub timestamp: TimeMs,
    pub side: Side,
    pub quantity: u64,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    /// Ingestion order; ties on `timestamp` keep this order.
    pub seq: u64,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        item_id: ItemId,
        item_name: Option<String>,
        timestamp: TimeMs,
        side: Side,
        quantity: u64,
        unit_price: Decimal,
        transaction_id: Option<i64>,
        seq: u64,
    ) -> Self {
        let key = Self::compute_key(&item_id, timestamp, side, quantity, &unit_price, transaction_id);
        Transaction {
            key,
            item_id,
            item_name,
            timestamp,
            side,
            quantity,
            unit_price,
            transaction_id,
            seq,
        }
    }

    /// Generate a stable key for this transaction.
    ///
    /// Priority: upstream `transaction_id` (if present) > hash of the trade fields.
    /// The ingestion sequence never takes part, so re-submitting a record
    /// yields the same key.
    pub fn compute_key(
        item_id: &ItemId,
        timestamp: TimeMs,
        side: Side,
        quantity: u64,
        unit_price: &Decimal,
        transaction_id: Option<i64>,
    ) -> String {
        if let Some(id) = transaction_id {
            return format!("tx:{}", id);
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(item_id.as_str());
        hasher.update([0u8]);
        hasher.update(timestamp.as_ms().to_le_bytes());
        hasher.update(if side == Side::Buy { b"B" } else { b"S" });
        hasher.update(quantity.to_le_bytes());
        hasher.update(unit_price.to_canonical_string());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// Sort key giving chronological order with insertion-order ties.
    pub fn chrono_key(&self) -> (TimeMs, u64) {
        (self.timestamp, self.seq)
    }
}
