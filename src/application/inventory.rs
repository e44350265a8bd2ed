use crate::domain::order::{FulfilmentCommit, Order};
use crate::domain::ports::{CatalogStore, OrderStore, StoreHandle};
use crate::error::{KioskError, Result};
use tracing::{info, instrument, warn};

/// Guards per-item stock. Every stock change goes through this ledger.
#[derive(Clone)]
pub struct InventoryLedger {
    store: StoreHandle,
}

impl InventoryLedger {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Atomic compare-and-decrement. Returns whether the decrement happened.
    #[instrument(skip(self))]
    pub async fn decrement_stock(&self, item_id: &str, quantity: u32) -> Result<bool> {
        if quantity == 0 {
            return Err(KioskError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }
        let applied = self.store.decrement_stock(item_id, quantity).await?;
        if !applied {
            warn!(item_id, quantity, "stock decrement refused");
        }
        Ok(applied)
    }

    /// Settles an order's stock as one unit: every decrement applies, or
    /// none does and the order keeps its status.
    #[instrument(skip(self, commit), fields(order_id = %commit.order_id))]
    pub async fn commit(&self, commit: FulfilmentCommit) -> Result<Order> {
        match self.store.commit_fulfilment(commit).await {
            Ok(order) => {
                info!(status = %order.status, refund = %order.refund, "stock committed");
                Ok(order)
            }
            Err(e) => {
                warn!(error = %e, "stock commit rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::test_item;
    use crate::infrastructure::in_memory::InMemoryKioskStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_decrements_never_oversell() {
        let store = InMemoryKioskStore::new();
        let mut item = test_item("A", 100, 0, dec!(0.1));
        item.stock = 5;
        store.upsert_item(item).await.unwrap();
        let ledger = InventoryLedger::new(Arc::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.decrement_stock("A", 1).await.unwrap()
            }));
        }
        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() {
                applied += 1;
            }
        }

        assert_eq!(applied, 5);
        assert_eq!(store.get_item("A").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected() {
        let ledger = InventoryLedger::new(Arc::new(InMemoryKioskStore::new()));
        assert!(matches!(
            ledger.decrement_stock("A", 0).await,
            Err(KioskError::ValidationError(_))
        ));
    }
}
