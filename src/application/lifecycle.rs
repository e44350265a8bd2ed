use super::customers::CustomerDirectory;
use super::inventory::InventoryLedger;
use super::pricing::{PricedLine, PricingEngine};
use crate::domain::catalog::CatalogItem;
use crate::domain::dispense::{
    AttemptResult, DispenseAttempt, DispenseLineReport, DispenseLog, DispenseOutcomeRef,
    DispenseReport, MAX_ATTEMPTS_PER_UNIT,
};
use crate::domain::money::{Cents, round_carbon, round_water};
use crate::domain::order::{
    FulfilmentCommit, LineItem, LineItemView, Order, OrderRequestItem, OrderStatus, OrderView,
    PaymentOutcome,
};
use crate::domain::ports::{CatalogStore, CustomerStore, OrderStore, StoreHandle};
use crate::error::{KioskError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// How a successful payment turns into handed-out goods.
#[derive(Clone)]
pub enum Fulfillment {
    /// Payment success commits all stock at once and completes the order.
    DirectCommit,
    /// Payment success leaves the order `paid`; `dispense` then simulates
    /// each unit on the lane hardware and refunds units that never drop.
    RandomizedDispense(DispenseOutcomeRef),
}

impl Fulfillment {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectCommit => "direct",
            Self::RandomizedDispense(_) => "randomized",
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub status: OrderStatus,
    #[serde(rename = "total_cents")]
    pub total: Cents,
    #[serde(rename = "deposit_total_cents")]
    pub deposit_total: Cents,
    pub carbon_saving: Decimal,
    pub water_saving: Decimal,
    pub items: Vec<PricedLine>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

/// Owns the order state machine.
#[derive(Clone)]
pub struct OrderLifecycle {
    store: StoreHandle,
    customers: CustomerDirectory,
    pricing: PricingEngine,
    inventory: InventoryLedger,
    fulfillment: Fulfillment,
}

impl OrderLifecycle {
    pub fn new(
        store: StoreHandle,
        customers: CustomerDirectory,
        pricing: PricingEngine,
        inventory: InventoryLedger,
        fulfillment: Fulfillment,
    ) -> Self {
        Self {
            store,
            customers,
            pricing,
            inventory,
            fulfillment,
        }
    }

    async fn load(&self, order_id: Uuid) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(KioskError::OrderNotFound(order_id))
    }

    /// Prices `items` and stores the order in `created`.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn create_order(
        &self,
        member_no: Option<&str>,
        items: &[OrderRequestItem],
    ) -> Result<OrderCreated> {
        if items.is_empty() {
            return Err(KioskError::EmptyOrder);
        }
        let customer = self.customers.resolve_optional(member_no).await?;
        let priced = self.pricing.price(items).await?;

        let order = Order {
            id: Uuid::new_v4(),
            customer_id: customer.map(|c| c.id),
            items: priced
                .lines
                .iter()
                .map(|line| LineItem {
                    id: Uuid::new_v4(),
                    item_id: line.item_id.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    deposit: line.deposit,
                    subtotal: line.subtotal,
                    refunded_quantity: 0,
                })
                .collect(),
            total: priced.total,
            deposit_total: priced.deposit_total,
            carbon_saving: priced.carbon_saving,
            water_saving: priced.water_saving,
            refund: Cents::ZERO,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        };
        self.store.insert_order(order.clone()).await?;
        info!(order_id = %order.id, total = %order.total, "order created");

        Ok(OrderCreated {
            order_id: order.id,
            status: order.status,
            total: order.total,
            deposit_total: order.deposit_total,
            carbon_saving: round_carbon(order.carbon_saving),
            water_saving: round_water(order.water_saving),
            items: priced.lines,
        })
    }

    /// Applies the payment terminal's verdict to a `created` order.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<PaymentConfirmation> {
        let order = self.load(order_id).await?;
        order.ensure_status(&[OrderStatus::Created], "confirm payment")?;

        let settled = match (outcome, &self.fulfillment) {
            (PaymentOutcome::Fail | PaymentOutcome::Timeout, _) => {
                self.store
                    .transition_order(order_id, OrderStatus::Created, OrderStatus::Canceled)
                    .await?
            }
            (PaymentOutcome::Success, Fulfillment::DirectCommit) => {
                self.complete_order(order_id).await?
            }
            (PaymentOutcome::Success, Fulfillment::RandomizedDispense(_)) => {
                self.store
                    .transition_order(order_id, OrderStatus::Created, OrderStatus::Paid)
                    .await?
            }
        };
        info!(status = %settled.status, "payment confirmed");

        Ok(PaymentConfirmation {
            order_id,
            status: settled.status,
        })
    }

    /// Commits the stock of every line and completes the order.
    ///
    /// Accepts orders that are `created` or `paid`; anything else is an
    /// invalid state. On insufficient stock nothing changes.
    #[instrument(skip(self))]
    pub async fn complete_order(&self, order_id: Uuid) -> Result<Order> {
        const COMPLETABLE: [OrderStatus; 2] = [OrderStatus::Created, OrderStatus::Paid];
        let order = self.load(order_id).await?;
        order.ensure_status(&COMPLETABLE, "complete")?;
        self.inventory
            .commit(FulfilmentCommit::full(&order, &COMPLETABLE))
            .await
    }

    /// Hands out a `paid` order unit by unit.
    #[instrument(skip(self))]
    pub async fn dispense(&self, order_id: Uuid) -> Result<DispenseReport> {
        let order = self.load(order_id).await?;
        order.ensure_status(&[OrderStatus::Paid], "dispense")?;

        let outcome = match &self.fulfillment {
            Fulfillment::RandomizedDispense(outcome) => outcome.clone(),
            Fulfillment::DirectCommit => {
                let done = self.complete_order(order_id).await?;
                return self.report(&done, |line| (line.quantity, 0)).await;
            }
        };

        let items = self.items_of(&order).await?;
        let mut stock: HashMap<&str, u32> =
            items.iter().map(|(id, item)| (id.as_str(), item.stock)).collect();
        let mut attempts = Vec::new();
        let mut decrements = Vec::new();
        let mut tallies = HashMap::new();
        let mut refund = Cents::ZERO;

        for line in &order.items {
            let lane_no = items.get(&line.item_id).map_or(0, |item| item.lane_no);
            let (mut success, mut failed) = (0u32, 0u32);
            for _ in 0..line.quantity {
                let mut dropped = false;
                for attempt_no in 1..=MAX_ATTEMPTS_PER_UNIT {
                    let left = stock.entry(line.item_id.as_str()).or_default();
                    let result = if *left == 0 {
                        AttemptResult::Empty
                    } else {
                        outcome.attempt(&line.item_id, attempt_no)
                    };
                    if result == AttemptResult::Success {
                        *left -= 1;
                        dropped = true;
                    }
                    attempts.push(DispenseAttempt {
                        id: Uuid::new_v4(),
                        order_id,
                        item_id: line.item_id.clone(),
                        lane_no,
                        attempt_no,
                        result,
                        at: Utc::now(),
                    });
                    if dropped {
                        break;
                    }
                }
                if dropped {
                    success += 1;
                } else {
                    failed += 1;
                    refund += line.unit_total();
                }
            }
            decrements.push((line.item_id.clone(), success));
            tallies.insert(line.id, (success, failed));
        }

        let done = self
            .inventory
            .commit(FulfilmentCommit {
                order_id,
                allowed_from: vec![OrderStatus::Paid],
                decrements,
                refund,
                attempts,
            })
            .await?;
        info!(refund = %done.refund, "order dispensed");
        self.report(&done, |line| tallies.get(&line.id).copied().unwrap_or((0, 0)))
            .await
    }

    async fn report(
        &self,
        order: &Order,
        tally: impl Fn(&LineItem) -> (u32, u32),
    ) -> Result<DispenseReport> {
        let items = self.items_of(order).await?;
        Ok(DispenseReport {
            order_id: order.id,
            status: order.status,
            refund: order.refund,
            items: order
                .items
                .iter()
                .map(|line| {
                    let (success, failed) = tally(line);
                    DispenseLineReport {
                        item_id: line.item_id.clone(),
                        name: display_name(&items, &line.item_id),
                        success,
                        failed,
                        refund_each: line.unit_total(),
                    }
                })
                .collect(),
        })
    }

    /// Current catalog rows of the items on `order`.
    async fn items_of(&self, order: &Order) -> Result<HashMap<String, CatalogItem>> {
        let mut items = HashMap::new();
        for line in &order.items {
            if items.contains_key(&line.item_id) {
                continue;
            }
            if let Some(item) = self.store.get_item(&line.item_id).await? {
                items.insert(line.item_id.clone(), item);
            }
        }
        Ok(items)
    }

    /// Order header, named lines and customer summary.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView> {
        let order = self.load(order_id).await?;
        let items = self.items_of(&order).await?;
        let customer = match order.customer_id {
            Some(id) => self.store.get_customer(id).await?.map(|c| c.summary()),
            None => None,
        };
        let lines = order
            .items
            .iter()
            .map(|line| LineItemView {
                item_name: display_name(&items, &line.item_id),
                refundable_quantity: line.refundable_quantity(),
                line: line.clone(),
            })
            .collect();
        Ok(OrderView {
            order,
            items: lines,
            customer,
        })
    }

    pub async fn dispense_log(&self, order_id: Uuid) -> Result<DispenseLog> {
        let order = self.load(order_id).await?;
        let attempts = self.store.dispense_attempts(order_id).await?;
        Ok(DispenseLog {
            order_id,
            status: order.status,
            total: order.total,
            deposit_total: order.deposit_total,
            refund: order.refund,
            attempts,
        })
    }
}

fn display_name(items: &HashMap<String, CatalogItem>, item_id: &str) -> String {
    items
        .get(item_id)
        .map_or_else(|| item_id.to_string(), |item| item.name.clone())
}
