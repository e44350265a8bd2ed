use super::catalog::{CatalogAccessor, CatalogListing};
use super::customers::CustomerDirectory;
use super::inventory::InventoryLedger;
use super::lifecycle::{Fulfillment, OrderCreated, OrderLifecycle, PaymentConfirmation};
use super::metrics::{MetricsAggregator, MetricsSummary};
use super::pricing::PricingEngine;
use super::recycling::{Precheck, RecycleOutcome, RecyclingLedger};
use crate::config::KioskConfig;
use crate::domain::catalog::CatalogItem;
use crate::domain::customer::{Customer, CustomerSummary};
use crate::domain::dispense::{DispenseLog, DispenseReport};
use crate::domain::order::{OrderRequestItem, OrderView, PaymentOutcome};
use crate::domain::ports::{CatalogStore, CustomerStore, StoreHandle};
use crate::domain::recycle::ReturnDecision;
use crate::error::Result;
use tracing::info;
use uuid::Uuid;

/// The kiosk core: every externally triggered operation in one place.
///
/// Components share one injected store handle; none of them keeps state of
/// its own beyond configuration.
#[derive(Clone)]
pub struct Kiosk {
    store: StoreHandle,
    catalog: CatalogAccessor,
    customers: CustomerDirectory,
    inventory: InventoryLedger,
    lifecycle: OrderLifecycle,
    recycling: RecyclingLedger,
    metrics: MetricsAggregator,
}

impl Kiosk {
    pub fn new(store: StoreHandle, config: KioskConfig, fulfillment: Fulfillment) -> Self {
        info!(
            fulfillment = fulfillment.name(),
            deposit_policy = ?config.deposit_policy,
            "kiosk ready"
        );
        let catalog =
            CatalogAccessor::new(store.clone(), config.reward_band, config.deposit_policy);
        let customers = CustomerDirectory::new(store.clone());
        let inventory = InventoryLedger::new(store.clone());
        let lifecycle = OrderLifecycle::new(
            store.clone(),
            customers.clone(),
            PricingEngine::new(catalog.clone()),
            inventory.clone(),
            fulfillment,
        );
        let recycling =
            RecyclingLedger::new(store.clone(), customers.clone(), catalog.clone(), &config);
        let metrics = MetricsAggregator::new(store.clone());
        Self {
            store,
            catalog,
            customers,
            inventory,
            lifecycle,
            recycling,
            metrics,
        }
    }

    /// Loads catalog rows and members. Rows already stored under the same id
    /// take the seeded attributes but keep their stock and deposit balance.
    pub async fn seed(&self, items: Vec<CatalogItem>, customers: Vec<Customer>) -> Result<()> {
        let (item_count, customer_count) = (items.len(), customers.len());
        for item in items {
            self.store.seed_item(item).await?;
        }
        for customer in customers {
            self.store.seed_customer(customer).await?;
        }
        info!(items = item_count, customers = customer_count, "seed data loaded");
        Ok(())
    }

    pub async fn list_catalog(&self) -> Result<Vec<CatalogListing>> {
        self.catalog.list_active().await
    }

    pub async fn resolve_customer(&self, member_no: &str) -> Result<CustomerSummary> {
        Ok(self.customers.resolve(member_no).await?.summary())
    }

    pub async fn create_order(
        &self,
        member_no: Option<&str>,
        items: &[OrderRequestItem],
    ) -> Result<OrderCreated> {
        self.lifecycle.create_order(member_no, items).await
    }

    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<PaymentConfirmation> {
        self.lifecycle.confirm_payment(order_id, outcome).await
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView> {
        self.lifecycle.get_order(order_id).await
    }

    pub async fn dispense(&self, order_id: Uuid) -> Result<DispenseReport> {
        self.lifecycle.dispense(order_id).await
    }

    pub async fn dispense_log(&self, order_id: Uuid) -> Result<DispenseLog> {
        self.lifecycle.dispense_log(order_id).await
    }

    pub async fn decrement_stock(&self, item_id: &str, quantity: u32) -> Result<bool> {
        self.inventory.decrement_stock(item_id, quantity).await
    }

    pub async fn recycle_precheck(&self, member_no: Option<&str>, code: &str) -> Result<Precheck> {
        self.recycling.precheck(member_no, code).await
    }

    pub async fn recycle_confirm(
        &self,
        member_no: Option<&str>,
        code: &str,
        decision: ReturnDecision,
    ) -> Result<RecycleOutcome> {
        self.recycling.confirm(member_no, code, decision).await
    }

    pub async fn metrics_summary(&self) -> Result<MetricsSummary> {
        self.metrics.summary().await
    }
}
