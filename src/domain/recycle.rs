use super::customer::CustomerId;
use super::money::Cents;
use crate::error::{KioskError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Separator between the order id and item id of a receipt code.
pub const RECEIPT_SEPARATOR: char = '|';

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ReturnSource {
    Barcode,
    Receipt,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ReturnDecision {
    Accept,
    Reject,
}

impl FromStr for ReturnDecision {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(KioskError::ValidationError(format!(
                "unknown return decision '{other}'"
            ))),
        }
    }
}

/// Who a return is booked against. Anonymous returns go to the guest owner.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ReturnOwner {
    Guest,
    Member(CustomerId),
}

impl ReturnOwner {
    pub fn member(&self) -> Option<CustomerId> {
        match self {
            Self::Member(id) => Some(*id),
            Self::Guest => None,
        }
    }
}

/// A scanned return code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReturnCode {
    /// `orderId|itemId[|...]` printed on a receipt.
    Receipt { order_id: Uuid, item_id: String },
    /// Item id or product barcode.
    Catalog(String),
}

impl ReturnCode {
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(KioskError::ValidationError("code required".to_string()));
        }
        if !code.contains(RECEIPT_SEPARATOR) {
            return Ok(Self::Catalog(code.to_string()));
        }
        let mut parts = code.split(RECEIPT_SEPARATOR).map(str::trim);
        let (Some(order), Some(item)) = (parts.next(), parts.next()) else {
            return Err(KioskError::ReceiptNotFound(code.to_string()));
        };
        let order_id =
            Uuid::parse_str(order).map_err(|_| KioskError::ReceiptNotFound(code.to_string()))?;
        if item.is_empty() {
            return Err(KioskError::ReceiptNotFound(code.to_string()));
        }
        Ok(Self::Receipt {
            order_id,
            item_id: item.to_string(),
        })
    }
}

/// Append-only audit entry for a deposit refund attempt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub owner: ReturnOwner,
    pub source: ReturnSource,
    pub code: String,
    pub item_id: String,
    #[serde(rename = "refundable_cents")]
    pub refundable: Cents,
    pub carbon_credit: Decimal,
    pub water_credit: Decimal,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
}

impl ReturnRecord {
    pub fn is_accepted(&self) -> bool {
        self.status == ReturnStatus::Accepted
    }
}

/// Receipt line a return is counted against.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ReceiptLine {
    pub order_id: Uuid,
    pub line_id: Uuid,
}

/// Everything a return write touches, applied as one unit.
#[derive(Debug, PartialEq, Clone)]
pub struct ReturnEntry {
    pub record: ReturnRecord,
    pub receipt_line: Option<ReceiptLine>,
}

/// Result of writing a return.
#[derive(Debug, PartialEq, Clone)]
pub struct ReturnReceipt {
    pub record: ReturnRecord,
    /// Member balance after the credit, when a member was credited.
    pub new_balance: Option<Cents>,
}
