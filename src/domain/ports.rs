use super::catalog::CatalogItem;
use super::customer::{Customer, CustomerId};
use super::dispense::DispenseAttempt;
use super::order::{FulfilmentCommit, Order, OrderStatus};
use super::recycle::{ReturnEntry, ReturnReceipt, ReturnRecord};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn upsert_item(&self, item: CatalogItem) -> Result<()>;
    /// Like `upsert_item`, but a row already stored under the same id keeps
    /// its current stock.
    async fn seed_item(&self, item: CatalogItem) -> Result<()>;
    async fn get_item(&self, item_id: &str) -> Result<Option<CatalogItem>>;
    async fn all_items(&self) -> Result<Vec<CatalogItem>>;
    /// Compare-and-decrement. Returns `false` when stock is short or the item
    /// is unknown, leaving stock untouched.
    async fn decrement_stock(&self, item_id: &str, quantity: u32) -> Result<bool>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn upsert_customer(&self, customer: Customer) -> Result<()>;
    /// Like `upsert_customer`, but an existing member keeps their deposit
    /// balance.
    async fn seed_customer(&self, customer: Customer) -> Result<()>;
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;
    /// Case-insensitive lookup by member number.
    async fn find_by_member_no(&self, member_no: &str) -> Result<Option<Customer>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order header and its line items together.
    async fn insert_order(&self, order: Order) -> Result<()>;
    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
    /// Moves an order from `from` to `to`, failing with `InvalidState` if it
    /// is no longer in `from`.
    async fn transition_order(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus)
    -> Result<Order>;
    /// Applies every stock decrement of `commit`, its refund and dispense log,
    /// and marks the order done. Nothing is written if any decrement fails.
    async fn commit_fulfilment(&self, commit: FulfilmentCommit) -> Result<Order>;
    async fn dispense_attempts(&self, order_id: Uuid) -> Result<Vec<DispenseAttempt>>;
}

#[async_trait]
pub trait ReturnStore: Send + Sync {
    /// Appends the return record, credits the member balance and bumps the
    /// receipt line's refunded quantity for accepted returns, all at once.
    async fn record_return(&self, entry: ReturnEntry) -> Result<ReturnReceipt>;
    async fn all_returns(&self) -> Result<Vec<ReturnRecord>>;
    /// Accepted returns of `item_id` by `customer_id` on local date `day`.
    async fn count_accepted_returns(
        &self,
        customer_id: CustomerId,
        item_id: &str,
        day: NaiveDate,
    ) -> Result<u32>;
}

/// Full storage surface of the kiosk.
pub trait KioskStore: CatalogStore + CustomerStore + OrderStore + ReturnStore {}

impl<T> KioskStore for T where T: CatalogStore + CustomerStore + OrderStore + ReturnStore {}

pub type StoreHandle = Arc<dyn KioskStore>;
