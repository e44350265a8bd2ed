use super::customer::{CustomerId, CustomerSummary};
use super::dispense::DispenseAttempt;
use super::money::Cents;
use crate::error::{KioskError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of an order.
///
/// `created -> paid | canceled`, `created | paid -> done`. `dispensing` only
/// exists inside the randomized dispense commit. `done` and `canceled` are
/// terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Dispensing,
    Done,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Canceled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Paid)
                | (Created, Canceled)
                | (Created, Done)
                | (Paid, Dispensing)
                | (Paid, Done)
                | (Dispensing, Done)
        )
    }

    /// Orders in these states carry deposit liability.
    pub fn holds_deposit(self) -> bool {
        matches!(self, Self::Paid | Self::Dispensing | Self::Done)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Dispensing => "dispensing",
            Self::Done => "done",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Result reported by the payment terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success,
    Fail,
    Timeout,
}

impl FromStr for PaymentOutcome {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "fail" => Ok(Self::Fail),
            "timeout" => Ok(Self::Timeout),
            other => Err(KioskError::ValidationError(format!(
                "unknown payment outcome '{other}'"
            ))),
        }
    }
}

/// One requested `(item, quantity)` pair.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct OrderRequestItem {
    pub item_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl OrderRequestItem {
    pub fn new(item_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// One catalog item within an order, priced at order time.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LineItem {
    pub id: Uuid,
    pub item_id: String,
    pub quantity: u32,
    #[serde(rename = "unit_price_cents")]
    pub unit_price: Cents,
    #[serde(rename = "deposit_cents")]
    pub deposit: Cents,
    #[serde(rename = "subtotal_cents")]
    pub subtotal: Cents,
    pub refunded_quantity: u32,
}

impl LineItem {
    pub fn refundable_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.refunded_quantity)
    }

    /// Price of a single unit including its deposit.
    pub fn unit_total(&self) -> Cents {
        self.unit_price + self.deposit
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<CustomerId>,
    pub items: Vec<LineItem>,
    #[serde(rename = "total_cents")]
    pub total: Cents,
    #[serde(rename = "deposit_total_cents")]
    pub deposit_total: Cents,
    pub carbon_saving: Decimal,
    pub water_saving: Decimal,
    #[serde(rename = "refund_cents")]
    pub refund: Cents,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Revenue kept after refunds.
    pub fn net_revenue(&self) -> Cents {
        self.total - self.refund
    }

    pub fn ensure_status(&self, allowed: &[OrderStatus], action: &'static str) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(KioskError::InvalidState {
                order_id: self.id,
                status: self.status,
                action,
            })
        }
    }
}

/// Stock decrements and bookkeeping that settle an order in one atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FulfilmentCommit {
    pub order_id: Uuid,
    /// Statuses the order must be in when the commit is applied.
    pub allowed_from: Vec<OrderStatus>,
    pub decrements: Vec<(String, u32)>,
    pub refund: Cents,
    pub attempts: Vec<DispenseAttempt>,
}

impl FulfilmentCommit {
    /// Commits every ordered unit with no refund.
    pub fn full(order: &Order, allowed_from: &[OrderStatus]) -> Self {
        Self {
            order_id: order.id,
            allowed_from: allowed_from.to_vec(),
            decrements: order
                .items
                .iter()
                .map(|l| (l.item_id.clone(), l.quantity))
                .collect(),
            refund: Cents::ZERO,
            attempts: Vec::new(),
        }
    }
}

/// Line item joined with its catalog display name.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct LineItemView {
    #[serde(flatten)]
    pub line: LineItem,
    pub item_name: String,
    pub refundable_quantity: u32,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<LineItemView>,
    pub customer: Option<CustomerSummary>,
}
