#![allow(dead_code)]

use kiosk_ledger::application::kiosk::Kiosk;
use kiosk_ledger::application::lifecycle::Fulfillment;
use kiosk_ledger::config::KioskConfig;
use kiosk_ledger::domain::catalog::{CatalogItem, DepositPolicy, ItemStatus};
use kiosk_ledger::domain::customer::{Customer, CustomerStatus};
use kiosk_ledger::domain::money::Cents;
use kiosk_ledger::domain::ports::StoreHandle;
use kiosk_ledger::infrastructure::in_memory::InMemoryKioskStore;
use rust_decimal::Decimal;
use std::sync::Arc;

pub fn item(id: &str, price: i64, deposit: i64, stock: u32, carbon: Decimal) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        name: format!("{id} bottle"),
        category: "drink".to_string(),
        barcode: Some(format!("471{id}")),
        price: Cents(price),
        deposit: Cents(deposit),
        lane_no: 1,
        stock,
        status: ItemStatus::Active,
        carbon_saving: carbon,
        water_saving: carbon * Decimal::TEN,
        image: None,
    }
}

pub fn member(id: u64, member_no: &str, name: &str) -> Customer {
    Customer {
        id,
        member_no: member_no.to_string(),
        name: Some(name.to_string()),
        points: 0,
        deposit_balance: Cents::ZERO,
        status: CustomerStatus::Active,
    }
}

/// A kiosk over a fresh in-memory store, returned together with the store
/// so tests can inspect rows directly.
pub async fn kiosk_with(
    config: KioskConfig,
    fulfillment: Fulfillment,
    items: Vec<CatalogItem>,
    customers: Vec<Customer>,
) -> (Kiosk, StoreHandle) {
    let store: StoreHandle = Arc::new(InMemoryKioskStore::new());
    let kiosk = Kiosk::new(store.clone(), config, fulfillment);
    kiosk.seed(items, customers).await.unwrap();
    (kiosk, store)
}

/// Catalog-authored deposits, direct commit: the classic purchase flow.
pub async fn catalog_kiosk(
    items: Vec<CatalogItem>,
    customers: Vec<Customer>,
) -> (Kiosk, StoreHandle) {
    let config = KioskConfig {
        deposit_policy: DepositPolicy::Catalog,
        ..KioskConfig::default()
    };
    kiosk_with(config, Fulfillment::DirectCommit, items, customers).await
}
