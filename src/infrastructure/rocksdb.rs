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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for catalog items, keyed by item id.
pub const CF_ITEMS: &str = "items";
/// Column Family for members, keyed by customer id.
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family mapping lower-cased member numbers to customer ids.
pub const CF_MEMBERS: &str = "members";
/// Column Family for orders with their line items, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for the append-only return records.
pub const CF_RETURNS: &str = "returns";
/// Column Family for dispense attempts, keyed by order id.
pub const CF_DISPENSE_LOG: &str = "dispense_log";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_ITEMS,
    CF_CUSTOMERS,
    CF_MEMBERS,
    CF_ORDERS,
    CF_RETURNS,
    CF_DISPENSE_LOG,
];

/// A persistent store implementation using RocksDB.
///
/// Each table lives in its own Column Family. Mutations are serialized by a
/// store-wide writer lock and land in a single `WriteBatch`, so every port
/// call commits all of its rows or none.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// every kiosk column family that is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| KioskError::storage(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = entry?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn put<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn load_order(&self, order_id: Uuid) -> Result<Order> {
        self.read(CF_ORDERS, order_id.as_bytes())?
            .ok_or(KioskError::OrderNotFound(order_id))
    }

    /// Writes `customer` and moves its member key. Callers hold the writer lock.
    fn write_customer(&self, customer: Customer, previous: Option<Customer>) -> Result<()> {
        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            let stale = Customer::member_key(&previous.member_no);
            batch.delete_cf(self.cf(CF_MEMBERS)?, stale.as_bytes());
        }
        let member_key = Customer::member_key(&customer.member_no);
        self.put(&mut batch, CF_MEMBERS, member_key.as_bytes(), &customer.id)?;
        self.put(&mut batch, CF_CUSTOMERS, &customer.id.to_be_bytes(), &customer)?;
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn upsert_item(&self, item: CatalogItem) -> Result<()> {
        let _guard = self.writer.lock().await;
        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_ITEMS, item.id.as_bytes(), &item)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn seed_item(&self, item: CatalogItem) -> Result<()> {
        let _guard = self.writer.lock().await;
        let stored = self.read::<CatalogItem>(CF_ITEMS, item.id.as_bytes())?;
        let item = item.keep_stock_of(stored.as_ref());
        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_ITEMS, item.id.as_bytes(), &item)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<CatalogItem>> {
        self.read(CF_ITEMS, item_id.as_bytes())
    }

    async fn all_items(&self) -> Result<Vec<CatalogItem>> {
        self.scan(CF_ITEMS)
    }

    async fn decrement_stock(&self, item_id: &str, quantity: u32) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let Some(mut item) = self.read::<CatalogItem>(CF_ITEMS, item_id.as_bytes())? else {
            return Ok(false);
        };
        if !item.take_stock(quantity) {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_ITEMS, item.id.as_bytes(), &item)?;
        self.db.write(batch)?;
        Ok(true)
    }
}

#[async_trait]
impl CustomerStore for RocksDBStore {
    async fn upsert_customer(&self, customer: Customer) -> Result<()> {
        let _guard = self.writer.lock().await;
        let previous = self.read::<Customer>(CF_CUSTOMERS, &customer.id.to_be_bytes())?;
        self.write_customer(customer, previous)
    }

    async fn seed_customer(&self, customer: Customer) -> Result<()> {
        let _guard = self.writer.lock().await;
        let previous = self.read::<Customer>(CF_CUSTOMERS, &customer.id.to_be_bytes())?;
        let customer = customer.keep_balance_of(previous.as_ref());
        self.write_customer(customer, previous)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        self.read(CF_CUSTOMERS, &id.to_be_bytes())
    }

    async fn find_by_member_no(&self, member_no: &str) -> Result<Option<Customer>> {
        let member_key = Customer::member_key(member_no);
        match self.read::<CustomerId>(CF_MEMBERS, member_key.as_bytes())? {
            Some(id) => self.read(CF_CUSTOMERS, &id.to_be_bytes()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        let _guard = self.writer.lock().await;
        let key = order.id.as_bytes();
        if self.read::<Order>(CF_ORDERS, key)?.is_some() {
            return Err(KioskError::storage(format!(
                "duplicate order id {}",
                order.id
            )));
        }
        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_ORDERS, key, &order)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id.as_bytes())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS)
    }

    async fn transition_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let _guard = self.writer.lock().await;
        let mut order = self.load_order(order_id)?;
        order.ensure_status(&[from], "change status")?;
        order.status = to;
        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_ORDERS, order_id.as_bytes(), &order)?;
        self.db.write(batch)?;
        Ok(order)
    }

    async fn commit_fulfilment(&self, commit: FulfilmentCommit) -> Result<Order> {
        let _guard = self.writer.lock().await;
        let order = self.load_order(commit.order_id)?;

        let mut current: HashMap<String, CatalogItem> = HashMap::new();
        for (item_id, _) in &commit.decrements {
            if let Some(item) = self.read::<CatalogItem>(CF_ITEMS, item_id.as_bytes())? {
                current.insert(item_id.clone(), item);
            }
        }
        let (settled, items) = stage_fulfilment(&order, &commit, |id| current.get(id))?;

        let mut batch = WriteBatch::default();
        for item in &items {
            self.put(&mut batch, CF_ITEMS, item.id.as_bytes(), item)?;
        }
        if !commit.attempts.is_empty() {
            let key = commit.order_id.as_bytes();
            let mut log: Vec<DispenseAttempt> =
                self.read(CF_DISPENSE_LOG, key)?.unwrap_or_default();
            log.extend(commit.attempts.iter().cloned());
            self.put(&mut batch, CF_DISPENSE_LOG, key, &log)?;
        }
        self.put(&mut batch, CF_ORDERS, settled.id.as_bytes(), &settled)?;
        self.db.write(batch)?;
        Ok(settled)
    }

    async fn dispense_attempts(&self, order_id: Uuid) -> Result<Vec<DispenseAttempt>> {
        Ok(self
            .read(CF_DISPENSE_LOG, order_id.as_bytes())?
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReturnStore for RocksDBStore {
    async fn record_return(&self, entry: ReturnEntry) -> Result<ReturnReceipt> {
        let _guard = self.writer.lock().await;
        let order = match entry.receipt_line {
            Some(receipt) => self.read::<Order>(CF_ORDERS, receipt.order_id.as_bytes())?,
            None => None,
        };
        let customer = match entry.record.owner.member() {
            Some(id) => self.read::<Customer>(CF_CUSTOMERS, &id.to_be_bytes())?,
            None => None,
        };
        let staged = stage_return(&entry, order.as_ref(), customer.as_ref())?;

        let mut batch = WriteBatch::default();
        if let Some(order) = &staged.order {
            self.put(&mut batch, CF_ORDERS, order.id.as_bytes(), order)?;
        }
        if let Some(customer) = &staged.customer {
            self.put(&mut batch, CF_CUSTOMERS, &customer.id.to_be_bytes(), customer)?;
        }
        self.put(&mut batch, CF_RETURNS, entry.record.id.as_bytes(), &entry.record)?;
        self.db.write(batch)?;

        Ok(ReturnReceipt {
            new_balance: staged.customer.map(|c| c.deposit_balance),
            record: entry.record,
        })
    }

    async fn all_returns(&self) -> Result<Vec<ReturnRecord>> {
        let mut returns: Vec<ReturnRecord> = self.scan(CF_RETURNS)?;
        returns.sort_by_key(|r| r.created_at);
        Ok(returns)
    }

    async fn count_accepted_returns(
        &self,
        customer_id: CustomerId,
        item_id: &str,
        day: NaiveDate,
    ) -> Result<u32> {
        let returns: Vec<ReturnRecord> = self.scan(CF_RETURNS)?;
        let count = returns
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
