use super::money::Cents;
use crate::error::{KioskError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Inactive,
}

/// A sellable item in a kiosk lane.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub barcode: Option<String>,
    /// Unit price in minor currency units.
    #[serde(rename = "price_cents")]
    pub price: Cents,
    /// Catalog-authored deposit. Zero means "derive from the incentive".
    #[serde(rename = "deposit_cents", default)]
    pub deposit: Cents,
    pub lane_no: u32,
    pub stock: u32,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub carbon_saving: Decimal,
    #[serde(default)]
    pub water_saving: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

impl CatalogItem {
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// Takes `quantity` units out of stock if enough are left.
    ///
    /// Every stock mutation in the crate goes through here, so stock can
    /// never drop below zero.
    pub fn take_stock(&mut self, quantity: u32) -> bool {
        if self.stock >= quantity {
            self.stock -= quantity;
            true
        } else {
            false
        }
    }

    /// Carries the live stock of an already stored row over a fresh seed row.
    pub fn keep_stock_of(mut self, stored: Option<&CatalogItem>) -> Self {
        if let Some(stored) = stored {
            self.stock = stored.stock;
        }
        self
    }

    pub fn matches_code(&self, code: &str) -> bool {
        self.id == code || self.barcode.as_deref() == Some(code)
    }
}

/// Minimum and maximum carbon saving across the active catalog.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CarbonRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl CarbonRange {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a CatalogItem>) -> Self {
        let mut savings = items
            .into_iter()
            .filter(|item| item.is_active())
            .map(|item| item.carbon_saving);
        let Some(first) = savings.next() else {
            return Self::default();
        };
        savings.fold(Self { min: first, max: first }, |range, s| Self {
            min: range.min.min(s),
            max: range.max.max(s),
        })
    }

    pub fn has_spread(&self) -> bool {
        self.max > self.min
    }
}

/// Reward band the incentive formula maps carbon savings into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardBand {
    pub min: Cents,
    pub max: Cents,
}

impl Default for RewardBand {
    fn default() -> Self {
        Self {
            min: Cents(500),
            max: Cents(1500),
        }
    }
}

impl RewardBand {
    /// Builds a band, rejecting negative or inverted bounds.
    pub fn new(min: Cents, max: Cents) -> Result<Self> {
        if min < Cents::ZERO {
            return Err(KioskError::ValidationError(format!(
                "reward band minimum must not be negative, got {}",
                min.value()
            )));
        }
        if min > max {
            return Err(KioskError::ValidationError(format!(
                "reward band minimum {} exceeds maximum {}",
                min.value(),
                max.value()
            )));
        }
        Ok(Self { min, max })
    }

    /// Linearly maps `carbon_saving` from `range` onto the band.
    ///
    /// Inputs outside the range are clamped first, and a catalog without
    /// spread pays the band minimum for everything.
    pub fn incentive(&self, range: &CarbonRange, carbon_saving: Decimal) -> Cents {
        if !range.has_spread() {
            return self.min;
        }
        let clamped = carbon_saving.clamp(range.min, range.max);
        let ratio = (clamped - range.min) / (range.max - range.min);
        let reward = self.min.to_decimal() + ratio * (self.max - self.min).to_decimal();
        reward
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Cents)
            .unwrap_or(self.min)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepositPolicy {
    /// Zero catalog deposits fall back to the computed incentive.
    #[default]
    DynamicFallback,
    /// Catalog deposits are used as authored, zero included.
    Catalog,
}

/// A consistent read of the whole catalog, taken once per request.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    items: HashMap<String, CatalogItem>,
    range: CarbonRange,
    band: RewardBand,
    policy: DepositPolicy,
}

impl CatalogSnapshot {
    pub fn new(items: Vec<CatalogItem>, band: RewardBand, policy: DepositPolicy) -> Self {
        let range = CarbonRange::from_items(&items);
        let items = items.into_iter().map(|i| (i.id.clone(), i)).collect();
        Self {
            items,
            range,
            band,
            policy,
        }
    }

    pub fn range(&self) -> CarbonRange {
        self.range
    }

    /// Active item by id.
    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.get(id).filter(|item| item.is_active())
    }

    /// Active item by id or barcode.
    pub fn find_by_code(&self, code: &str) -> Option<&CatalogItem> {
        self.get(code).or_else(|| {
            self.items
                .values()
                .find(|item| item.is_active() && item.matches_code(code))
        })
    }

    pub fn incentive_for(&self, carbon_saving: Decimal) -> Cents {
        self.band.incentive(&self.range, carbon_saving)
    }

    pub fn effective_deposit(&self, item: &CatalogItem) -> Cents {
        match self.policy {
            DepositPolicy::Catalog => item.deposit,
            DepositPolicy::DynamicFallback if item.deposit.is_positive() => item.deposit,
            DepositPolicy::DynamicFallback => self.incentive_for(item.carbon_saving),
        }
    }

    /// Active items ordered by lane.
    pub fn active_items(&self) -> Vec<&CatalogItem> {
        let mut active: Vec<&CatalogItem> =
            self.items.values().filter(|item| item.is_active()).collect();
        active.sort_by(|a, b| a.lane_no.cmp(&b.lane_no).then_with(|| a.id.cmp(&b.id)));
        active
    }
}

#[cfg(test)]
pub(crate) fn test_item(id: &str, price: i64, deposit: i64, carbon: Decimal) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        name: format!("Item {id}"),
        category: "drink".to_string(),
        barcode: None,
        price: Cents(price),
        deposit: Cents(deposit),
        lane_no: 1,
        stock: 10,
        status: ItemStatus::Active,
        carbon_saving: carbon,
        water_saving: Decimal::ZERO,
        image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_take_stock_never_negative() {
        let mut item = test_item("A", 100, 0, dec!(0));
        item.stock = 2;
        assert!(item.take_stock(2));
        assert_eq!(item.stock, 0);
        assert!(!item.take_stock(1));
        assert_eq!(item.stock, 0);
    }

    #[test]
    fn test_reward_band_bounds() {
        let band = RewardBand::new(Cents(200), Cents(900)).unwrap();
        assert_eq!((band.min, band.max), (Cents(200), Cents(900)));
        assert!(RewardBand::new(Cents(700), Cents(700)).is_ok());

        for (min, max) in [(1500, 500), (-1, 500), (-10, -5)] {
            let err = RewardBand::new(Cents(min), Cents(max)).unwrap_err();
            assert!(matches!(err, KioskError::ValidationError(_)), "{min}..{max}");
        }
    }

    #[test]
    fn test_incentive_maps_range_onto_band() {
        let band = RewardBand::default();
        let range = CarbonRange {
            min: dec!(0.1),
            max: dec!(0.5),
        };
        assert_eq!(band.incentive(&range, dec!(0.1)), Cents(500));
        assert_eq!(band.incentive(&range, dec!(0.3)), Cents(1000));
        assert_eq!(band.incentive(&range, dec!(0.5)), Cents(1500));
    }

    #[test]
    fn test_incentive_clamps_out_of_range_inputs() {
        let band = RewardBand::default();
        let range = CarbonRange {
            min: dec!(1),
            max: dec!(2),
        };
        assert_eq!(band.incentive(&range, dec!(-5)), Cents(500));
        assert_eq!(band.incentive(&range, dec!(99)), Cents(1500));
    }

    #[test]
    fn test_incentive_rounds_to_whole_units() {
        let band = RewardBand::default();
        let range = CarbonRange {
            min: dec!(0),
            max: dec!(3),
        };
        // 500 + 1/3 * 1000 = 833.33..
        assert_eq!(band.incentive(&range, dec!(1)), Cents(833));
        // 500 + 2/3 * 1000 = 1166.66..
        assert_eq!(band.incentive(&range, dec!(2)), Cents(1167));
    }

    #[test]
    fn test_zero_spread_pays_minimum() {
        let items = vec![
            test_item("A", 100, 0, dec!(0.2)),
            test_item("B", 100, 0, dec!(0.2)),
        ];
        let snapshot = CatalogSnapshot::new(items, RewardBand::default(), DepositPolicy::default());
        assert!(!snapshot.range().has_spread());
        assert_eq!(snapshot.incentive_for(dec!(0.2)), Cents(500));
    }

    #[test]
    fn test_range_ignores_inactive_items() {
        let mut inactive = test_item("C", 100, 0, dec!(9));
        inactive.status = ItemStatus::Inactive;
        let items = [test_item("A", 100, 0, dec!(1)), inactive];
        let range = CarbonRange::from_items(&items);
        assert_eq!(range.max, dec!(1));
        assert_eq!(range.min, dec!(1));
    }

    #[test]
    fn test_effective_deposit_policies() {
        let items = vec![
            test_item("A", 100, 20, dec!(0.1)),
            test_item("B", 50, 0, dec!(0.5)),
        ];
        let dynamic = CatalogSnapshot::new(
            items.clone(),
            RewardBand::default(),
            DepositPolicy::DynamicFallback,
        );
        let a = dynamic.get("A").unwrap();
        let b = dynamic.get("B").unwrap();
        assert_eq!(dynamic.effective_deposit(a), Cents(20));
        assert_eq!(dynamic.effective_deposit(b), Cents(1500));

        let authored = CatalogSnapshot::new(items, RewardBand::default(), DepositPolicy::Catalog);
        let b = authored.get("B").unwrap();
        assert_eq!(authored.effective_deposit(b), Cents::ZERO);
    }

    #[test]
    fn test_find_by_code_resolves_barcode() {
        let mut item = test_item("A", 100, 20, dec!(0.1));
        item.barcode = Some("4710001".to_string());
        let snapshot =
            CatalogSnapshot::new(vec![item], RewardBand::default(), DepositPolicy::Catalog);
        assert_eq!(snapshot.find_by_code("4710001").unwrap().id, "A");
        assert_eq!(snapshot.find_by_code("A").unwrap().id, "A");
        assert!(snapshot.find_by_code("nope").is_none());
    }
}
