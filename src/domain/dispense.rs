use super::money::Cents;
use super::order::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Attempts made per unit before it is given up and refunded.
pub const MAX_ATTEMPTS_PER_UNIT: u8 = 3;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AttemptResult {
    Success,
    Jam,
    Empty,
}

/// Source of dispense attempt outcomes.
///
/// The lane hardware is simulated; tests inject a deterministic sequence.
pub trait DispenseOutcome: Send + Sync {
    fn attempt(&self, item_id: &str, attempt_no: u8) -> AttemptResult;
}

pub type DispenseOutcomeRef = Arc<dyn DispenseOutcome>;

/// A single logged dispense attempt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DispenseAttempt {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: String,
    pub lane_no: u32,
    pub attempt_no: u8,
    pub result: AttemptResult,
    pub at: DateTime<Utc>,
}

/// Per line outcome of a dispense run.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct DispenseLineReport {
    pub item_id: String,
    pub name: String,
    pub success: u32,
    pub failed: u32,
    #[serde(rename = "refund_each_cents")]
    pub refund_each: Cents,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct DispenseReport {
    pub order_id: Uuid,
    pub status: OrderStatus,
    #[serde(rename = "refund_cents")]
    pub refund: Cents,
    pub items: Vec<DispenseLineReport>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct DispenseLog {
    pub order_id: Uuid,
    pub status: OrderStatus,
    #[serde(rename = "total_cents")]
    pub total: Cents,
    #[serde(rename = "deposit_total_cents")]
    pub deposit_total: Cents,
    #[serde(rename = "refund_cents")]
    pub refund: Cents,
    pub attempts: Vec<DispenseAttempt>,
}
