use super::catalog::CatalogAccessor;
use super::customers::CustomerDirectory;
use crate::config::KioskConfig;
use crate::domain::customer::Customer;
use crate::domain::money::{Cents, round_carbon, round_water};
use crate::domain::ports::{CatalogStore, OrderStore, ReturnStore, StoreHandle};
use crate::domain::recycle::{
    ReceiptLine, ReturnCode, ReturnDecision, ReturnEntry, ReturnOwner, ReturnRecord, ReturnSource,
    ReturnStatus,
};
use crate::error::{KioskError, Result};
use chrono::{Local, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A scanned code resolved to one refundable unit.
#[derive(Debug, Clone, PartialEq)]
struct Refundable {
    source: ReturnSource,
    item_id: String,
    item_name: String,
    amount: Cents,
    carbon_saving: Decimal,
    water_saving: Decimal,
    receipt_line: Option<ReceiptLine>,
    remaining: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Precheck {
    pub source: ReturnSource,
    pub item_id: String,
    pub item_name: String,
    #[serde(rename = "refundable_cents")]
    pub refundable: Cents,
    pub carbon_credit: Decimal,
    pub water_credit: Decimal,
    /// Units still refundable on the receipt line, in receipt mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RecycleOutcome {
    pub return_id: Uuid,
    pub status: ReturnStatus,
    #[serde(rename = "refunded_cents", skip_serializing_if = "Option::is_none")]
    pub refunded: Option<Cents>,
    #[serde(rename = "member_balance_cents", skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<Cents>,
}

/// Accepts returned containers and credits their deposits.
#[derive(Clone)]
pub struct RecyclingLedger {
    store: StoreHandle,
    customers: CustomerDirectory,
    catalog: CatalogAccessor,
    daily_cap: u32,
    credit_ratio: Decimal,
}

impl RecyclingLedger {
    pub fn new(
        store: StoreHandle,
        customers: CustomerDirectory,
        catalog: CatalogAccessor,
        config: &KioskConfig,
    ) -> Self {
        Self {
            store,
            customers,
            catalog,
            daily_cap: config.daily_return_cap,
            credit_ratio: config.credit_ratio,
        }
    }

    /// Validates a code and reports what accepting it would credit.
    #[instrument(skip(self))]
    pub async fn precheck(&self, member_no: Option<&str>, code: &str) -> Result<Precheck> {
        let customer = self.customers.resolve_optional(member_no).await?;
        let refundable = self.resolve(code).await?;
        let warning = match &customer {
            Some(customer) => self.cap_warning(customer, &refundable.item_id).await?,
            None => None,
        };

        Ok(Precheck {
            source: refundable.source,
            carbon_credit: round_carbon(refundable.carbon_saving * self.credit_ratio),
            water_credit: round_water(refundable.water_saving * self.credit_ratio),
            item_id: refundable.item_id,
            item_name: refundable.item_name,
            refundable: refundable.amount,
            remaining_quantity: refundable.remaining,
            warning,
        })
    }

    /// Books the return. Rejections are logged with zero value; acceptances
    /// credit the member and use up one unit of a receipt line.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        member_no: Option<&str>,
        code: &str,
        decision: ReturnDecision,
    ) -> Result<RecycleOutcome> {
        let customer = self.customers.resolve_optional(member_no).await?;
        let refundable = self.resolve(code).await?;
        let owner = customer
            .as_ref()
            .map_or(ReturnOwner::Guest, |c| ReturnOwner::Member(c.id));

        let accepted = decision == ReturnDecision::Accept;
        if accepted
            && let Some(customer) = &customer
            && let Some(warning) = self.cap_warning(customer, &refundable.item_id).await?
        {
            warn!(member_no = %customer.member_no, %warning, "return accepted over daily cap");
        }

        let record = ReturnRecord {
            id: Uuid::new_v4(),
            owner,
            source: refundable.source,
            code: code.trim().to_string(),
            item_id: refundable.item_id.clone(),
            refundable: if accepted { refundable.amount } else { Cents::ZERO },
            carbon_credit: if accepted {
                refundable.carbon_saving * self.credit_ratio
            } else {
                Decimal::ZERO
            },
            water_credit: if accepted {
                refundable.water_saving * self.credit_ratio
            } else {
                Decimal::ZERO
            },
            status: if accepted {
                ReturnStatus::Accepted
            } else {
                ReturnStatus::Rejected
            },
            created_at: Utc::now(),
        };
        let receipt = self
            .store
            .record_return(ReturnEntry {
                record,
                receipt_line: if accepted { refundable.receipt_line } else { None },
            })
            .await?;
        info!(
            return_id = %receipt.record.id,
            status = ?receipt.record.status,
            refunded = %receipt.record.refundable,
            "return recorded"
        );

        Ok(RecycleOutcome {
            return_id: receipt.record.id,
            status: receipt.record.status,
            refunded: accepted.then_some(receipt.record.refundable),
            new_balance: receipt.new_balance,
        })
    }

    async fn cap_warning(&self, customer: &Customer, item_id: &str) -> Result<Option<String>> {
        let today = Local::now().date_naive();
        let count = self
            .store
            .count_accepted_returns(customer.id, item_id, today)
            .await?;
        Ok((count >= self.daily_cap).then(|| {
            format!(
                "daily limit of {} returns for this item reached; the return may be refused",
                self.daily_cap
            )
        }))
    }

    async fn resolve(&self, code: &str) -> Result<Refundable> {
        let refundable = match ReturnCode::parse(code)? {
            ReturnCode::Receipt { order_id, item_id } => {
                self.resolve_receipt(code, order_id, &item_id).await?
            }
            ReturnCode::Catalog(code) => {
                let snapshot = self.catalog.snapshot().await?;
                let item = snapshot
                    .find_by_code(&code)
                    .ok_or_else(|| KioskError::ItemNotFound(code.clone()))?;
                Refundable {
                    source: ReturnSource::Barcode,
                    item_id: item.id.clone(),
                    item_name: item.name.clone(),
                    amount: snapshot.effective_deposit(item),
                    carbon_saving: item.carbon_saving,
                    water_saving: item.water_saving,
                    receipt_line: None,
                    remaining: None,
                }
            }
        };
        if !refundable.amount.is_positive() {
            return Err(KioskError::NoDepositOnItem(refundable.item_id));
        }
        Ok(refundable)
    }

    async fn resolve_receipt(
        &self,
        code: &str,
        order_id: Uuid,
        item_id: &str,
    ) -> Result<Refundable> {
        let not_found = || KioskError::ReceiptNotFound(code.trim().to_string());
        let order = self.store.get_order(order_id).await?.ok_or_else(not_found)?;
        // Unpaid and canceled orders never collected a deposit. Once an order
        // holds one it keeps holding it, so checking outside the write is enough.
        if !order.status.holds_deposit() {
            return Err(KioskError::InvalidState {
                order_id,
                status: order.status,
                action: "refund its deposit",
            });
        }
        let line = {
            let mut lines = order.items.iter().filter(|l| l.item_id == item_id).peekable();
            if lines.peek().is_none() {
                return Err(not_found());
            }
            lines
                .find(|l| l.refundable_quantity() > 0)
                .ok_or_else(|| KioskError::AlreadyFullyRefunded {
                    order_id,
                    item_id: item_id.to_string(),
                })?
        };
        let item = self.store.get_item(item_id).await?.ok_or_else(not_found)?;

        Ok(Refundable {
            source: ReturnSource::Receipt,
            item_id: item.id,
            item_name: item.name,
            amount: line.deposit,
            carbon_saving: item.carbon_saving,
            water_saving: item.water_saving,
            receipt_line: Some(ReceiptLine {
                order_id,
                line_id: line.id,
            }),
            remaining: Some(line.refundable_quantity()),
        })
    }
}
