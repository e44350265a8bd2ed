use super::{stage_fulfilment, stage_return};
use crate::domain::catalog::CatalogItem;
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::dispense::DispenseAttempt;
use crate::domain::order::{FulfilmentCommit, Order, OrderStatus};
use crate::domain::ports::{CatalogStore, CustomerStore, OrderStore, ReturnStore};
use crate::domain::recycle::{ReturnEntry, ReturnReceipt, ReturnRecord};
use crate::error::{KioskError, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    items: HashMap<String, CatalogItem>,
    customers: HashMap<CustomerId, Customer>,
    members: HashMap<String, CustomerId>,
    orders: HashMap<Uuid, Order>,
    returns: Vec<ReturnRecord>,
    dispense_log: HashMap<Uuid, Vec<DispenseAttempt>>,
}

impl Tables {
    /// Stores `customer` and re-points the member index at it.
    fn put_customer(&mut self, customer: Customer) {
        if let Some(previous) = self.customers.get(&customer.id) {
            let stale = Customer::member_key(&previous.member_no);
            self.members.remove(&stale);
        }
        self.members.insert(Customer::member_key(&customer.member_no), customer.id);
        self.customers.insert(customer.id, customer);
    }
}

/// A thread-safe in-memory kiosk store.
///
/// All tables sit behind a single `RwLock`; every mutation holds the write
/// lock for its whole read/modify/write, which makes each port call atomic.
/// `Clone` shares the underlying tables.
#[derive(Default, Clone)]
pub struct InMemoryKioskStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryKioskStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryKioskStore {
    async fn upsert_item(&self, item: CatalogItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn seed_item(&self, item: CatalogItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.items.get(&item.id);
        let item = item.keep_stock_of(stored);
        tables.items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<CatalogItem>> {
        let tables = self.tables.read().await;
        Ok(tables.items.get(item_id).cloned())
    }

    async fn all_items(&self) -> Result<Vec<CatalogItem>> {
        let tables = self.tables.read().await;
        Ok(tables.items.values().cloned().collect())
    }

    async fn decrement_stock(&self, item_id: &str, quantity: u32) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .items
            .get_mut(item_id)
            .is_some_and(|item| item.take_stock(quantity)))
    }
}

#[async_trait]
impl CustomerStore for InMemoryKioskStore {
    async fn upsert_customer(&self, customer: Customer) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.put_customer(customer);
        Ok(())
    }

    async fn seed_customer(&self, customer: Customer) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.customers.get(&customer.id);
        let customer = customer.keep_balance_of(stored);
        tables.put_customer(customer);
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.get(&id).cloned())
    }

    async fn find_by_member_no(&self, member_no: &str) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .get(&Customer::member_key(member_no))
            .and_then(|id| tables.customers.get(id))
            .cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryKioskStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(KioskError::storage(format!(
                "duplicate order id {}",
                order.id
            )));
        }
        tables.orders.insert(order.id, order);
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&order_id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.values().cloned().collect())
    }

    async fn transition_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or(KioskError::OrderNotFound(order_id))?;
        order.ensure_status(&[from], "change status")?;
        order.status = to;
        Ok(order.clone())
    }

    async fn commit_fulfilment(&self, commit: FulfilmentCommit) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get(&commit.order_id)
            .ok_or(KioskError::OrderNotFound(commit.order_id))?;
        let (settled, items) = stage_fulfilment(order, &commit, |id| tables.items.get(id))?;

        for item in items {
            tables.items.insert(item.id.clone(), item);
        }
        if !commit.attempts.is_empty() {
            tables
                .dispense_log
                .entry(commit.order_id)
                .or_default()
                .extend(commit.attempts);
        }
        tables.orders.insert(settled.id, settled.clone());
        Ok(settled)
    }

    async fn dispense_attempts(&self, order_id: Uuid) -> Result<Vec<DispenseAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .dispense_log
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReturnStore for InMemoryKioskStore {
    async fn record_return(&self, entry: ReturnEntry) -> Result<ReturnReceipt> {
        let mut tables = self.tables.write().await;
        let order = entry
            .receipt_line
            .and_then(|receipt| tables.orders.get(&receipt.order_id));
        let customer = entry
            .record
            .owner
            .member()
            .and_then(|id| tables.customers.get(&id));
        let staged = stage_return(&entry, order, customer)?;

        if let Some(order) = staged.order {
            tables.orders.insert(order.id, order);
        }
        let new_balance = staged.customer.map(|customer| {
            let balance = customer.deposit_balance;
            tables.customers.insert(customer.id, customer);
            balance
        });
        tables.returns.push(entry.record.clone());

        Ok(ReturnReceipt {
            record: entry.record,
            new_balance,
        })
    }

    async fn all_returns(&self) -> Result<Vec<ReturnRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.returns.clone())
    }

    async fn count_accepted_returns(
        &self,
        customer_id: CustomerId,
        item_id: &str,
        day: NaiveDate,
    ) -> Result<u32> {
        let tables = self.tables.read().await;
        let count = tables
            .returns
            .iter()
            .filter(|r| {
                r.is_accepted()
                    && r.owner.member() == Some(customer_id)
                    && r.item_id == item_id
                    && r.created_at.with_timezone(&Local).date_naive() == day
            })
            .count();
        Ok(count as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::test_item;
    use crate::domain::customer::CustomerStatus;
    use crate::domain::money::Cents;
    use crate::domain::order::LineItem;
    use crate::domain::recycle::{ReceiptLine, ReturnOwner, ReturnSource, ReturnStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn order_with(item_id: &str, quantity: u32) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            items: vec![LineItem {
                id: Uuid::new_v4(),
                item_id: item_id.to_string(),
                quantity,
                unit_price: Cents(100),
                deposit: Cents(20),
                subtotal: Cents(120) * quantity,
                refunded_quantity: 0,
            }],
            total: Cents(120) * quantity,
            deposit_total: Cents(20) * quantity,
            carbon_saving: Decimal::ZERO,
            water_saving: Decimal::ZERO,
            refund: Cents::ZERO,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        }
    }

    fn member(id: CustomerId, member_no: &str) -> Customer {
        Customer {
            id,
            member_no: member_no.to_string(),
            name: None,
            points: 0,
            deposit_balance: Cents::ZERO,
            status: CustomerStatus::Active,
        }
    }

    fn accepted(owner: ReturnOwner, item_id: &str) -> ReturnRecord {
        ReturnRecord {
            id: Uuid::new_v4(),
            owner,
            source: ReturnSource::Receipt,
            code: "code".to_string(),
            item_id: item_id.to_string(),
            refundable: Cents(20),
            carbon_credit: Decimal::ZERO,
            water_credit: Decimal::ZERO,
            status: ReturnStatus::Accepted,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_decrement_stock_guards_negative() {
        let store = InMemoryKioskStore::new();
        let mut item = test_item("A", 100, 20, dec!(0.1));
        item.stock = 1;
        store.upsert_item(item).await.unwrap();

        assert!(!store.decrement_stock("A", 2).await.unwrap());
        assert!(store.decrement_stock("A", 1).await.unwrap());
        assert!(!store.decrement_stock("A", 1).await.unwrap());
        assert!(!store.decrement_stock("missing", 1).await.unwrap());
        assert_eq!(store.get_item("A").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_member_lookup_ignores_case() {
        let store = InMemoryKioskStore::new();
        store.upsert_customer(member(1, "M0001")).await.unwrap();

        let found = store.find_by_member_no("m0001").await.unwrap().unwrap();
        assert_eq!(found.id, 1);

        store.upsert_customer(member(1, "M0002")).await.unwrap();
        assert!(store.find_by_member_no("M0001").await.unwrap().is_none());
        assert!(store.find_by_member_no("M0002").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_fulfilment_is_all_or_nothing() {
        let store = InMemoryKioskStore::new();
        let mut a = test_item("A", 100, 20, dec!(0.1));
        a.stock = 5;
        let mut b = test_item("B", 50, 0, dec!(0.1));
        b.stock = 1;
        store.upsert_item(a).await.unwrap();
        store.upsert_item(b).await.unwrap();

        let mut order = order_with("A", 2);
        let mut extra = order.items[0].clone();
        extra.id = Uuid::new_v4();
        extra.item_id = "B".to_string();
        extra.quantity = 2;
        order.items.push(extra);
        store.insert_order(order.clone()).await.unwrap();

        let commit = FulfilmentCommit::full(&order, &[OrderStatus::Created]);
        let result = store.commit_fulfilment(commit).await;
        assert!(matches!(
            result,
            Err(KioskError::StockInsufficient { requested: 2, available: 1, .. })
        ));

        assert_eq!(store.get_item("A").await.unwrap().unwrap().stock, 5);
        assert_eq!(store.get_item("B").await.unwrap().unwrap().stock, 1);
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_transition_order_requires_expected_status() {
        let store = InMemoryKioskStore::new();
        let order = order_with("A", 1);
        store.insert_order(order.clone()).await.unwrap();

        let canceled = store
            .transition_order(order.id, OrderStatus::Created, OrderStatus::Canceled)
            .await
            .unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);

        let again = store
            .transition_order(order.id, OrderStatus::Created, OrderStatus::Paid)
            .await;
        assert!(matches!(again, Err(KioskError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_record_return_credits_member_and_receipt() {
        let store = InMemoryKioskStore::new();
        store.upsert_customer(member(1, "M0001")).await.unwrap();
        let order = order_with("A", 1);
        store.insert_order(order.clone()).await.unwrap();

        let entry = ReturnEntry {
            record: accepted(ReturnOwner::Member(1), "A"),
            receipt_line: Some(ReceiptLine {
                order_id: order.id,
                line_id: order.items[0].id,
            }),
        };
        let receipt = store.record_return(entry.clone()).await.unwrap();
        assert_eq!(receipt.new_balance, Some(Cents(20)));

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].refunded_quantity, 1);

        // Line is exhausted now; nothing else may be written.
        let second = store.record_return(entry).await;
        assert!(matches!(second, Err(KioskError::AlreadyFullyRefunded { .. })));
        assert_eq!(store.all_returns().await.unwrap().len(), 1);
        let customer = store.get_customer(1).await.unwrap().unwrap();
        assert_eq!(customer.deposit_balance, Cents(20));
    }

    #[tokio::test]
    async fn test_record_return_moves_to_sibling_line() {
        let store = InMemoryKioskStore::new();
        let mut order = order_with("A", 1);
        let mut sibling = order.items[0].clone();
        sibling.id = Uuid::new_v4();
        order.items.push(sibling);
        store.insert_order(order.clone()).await.unwrap();

        // Both returns were resolved against the first line.
        let entry = ReturnEntry {
            record: accepted(ReturnOwner::Guest, "A"),
            receipt_line: Some(ReceiptLine {
                order_id: order.id,
                line_id: order.items[0].id,
            }),
        };
        store.record_return(entry.clone()).await.unwrap();
        store.record_return(entry.clone()).await.unwrap();

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].refunded_quantity, 1);
        assert_eq!(stored.items[1].refunded_quantity, 1);

        let third = store.record_return(entry).await;
        assert!(matches!(third, Err(KioskError::AlreadyFullyRefunded { .. })));
        assert_eq!(store.all_returns().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_count_accepted_returns_today() {
        let store = InMemoryKioskStore::new();
        store.upsert_customer(member(1, "M0001")).await.unwrap();
        let entry = ReturnEntry {
            record: accepted(ReturnOwner::Member(1), "A"),
            receipt_line: None,
        };
        store.record_return(entry.clone()).await.unwrap();
        store.record_return(entry).await.unwrap();
        store
            .record_return(ReturnEntry {
                record: accepted(ReturnOwner::Guest, "A"),
                receipt_line: None,
            })
            .await
            .unwrap();

        let today = Local::now().date_naive();
        assert_eq!(store.count_accepted_returns(1, "A", today).await.unwrap(), 2);
        assert_eq!(store.count_accepted_returns(1, "B", today).await.unwrap(), 0);
    }
}
