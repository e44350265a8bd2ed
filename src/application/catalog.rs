use crate::domain::catalog::{CatalogItem, CatalogSnapshot, DepositPolicy, RewardBand};
use crate::domain::money::Cents;
use crate::domain::ports::{CatalogStore, StoreHandle};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;

/// An active item annotated with its computed reward.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CatalogListing {
    #[serde(flatten)]
    pub item: CatalogItem,
    #[serde(rename = "reward_cents")]
    pub reward: Cents,
    #[serde(rename = "effective_deposit_cents")]
    pub effective_deposit: Cents,
}

/// Read-only view over the catalog.
#[derive(Clone)]
pub struct CatalogAccessor {
    store: StoreHandle,
    band: RewardBand,
    policy: DepositPolicy,
}

impl CatalogAccessor {
    pub fn new(store: StoreHandle, band: RewardBand, policy: DepositPolicy) -> Self {
        Self {
            store,
            band,
            policy,
        }
    }

    /// Reads the whole catalog once so a request prices against one
    /// consistent view.
    pub async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let items = self.store.all_items().await?;
        Ok(CatalogSnapshot::new(items, self.band, self.policy))
    }

    /// Active items ordered by lane, each with its reward.
    pub async fn list_active(&self) -> Result<Vec<CatalogListing>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot
            .active_items()
            .into_iter()
            .map(|item| CatalogListing {
                reward: snapshot.incentive_for(item.carbon_saving),
                effective_deposit: snapshot.effective_deposit(item),
                item: item.clone(),
            })
            .collect())
    }

    pub async fn incentive_for(&self, carbon_saving: Decimal) -> Result<Cents> {
        Ok(self.snapshot().await?.incentive_for(carbon_saving))
    }
}
