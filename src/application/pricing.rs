use super::catalog::CatalogAccessor;
use crate::domain::catalog::CatalogSnapshot;
use crate::domain::money::Cents;
use crate::domain::order::OrderRequestItem;
use crate::error::{KioskError, Result};
use rust_decimal::Decimal;
use serde::Serialize;

/// One request line priced against the catalog.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PricedLine {
    pub item_id: String,
    pub quantity: u32,
    #[serde(rename = "unit_price_cents")]
    pub unit_price: Cents,
    #[serde(rename = "deposit_cents")]
    pub deposit: Cents,
    #[serde(rename = "subtotal_cents")]
    pub subtotal: Cents,
}

/// Priced lines and their aggregates. Savings are kept unrounded here.
#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    #[serde(rename = "total_cents")]
    pub total: Cents,
    #[serde(rename = "deposit_total_cents")]
    pub deposit_total: Cents,
    pub carbon_saving: Decimal,
    pub water_saving: Decimal,
}

#[derive(Clone)]
pub struct PricingEngine {
    catalog: CatalogAccessor,
}

impl PricingEngine {
    pub fn new(catalog: CatalogAccessor) -> Self {
        Self { catalog }
    }

    /// Prices `items` against a single catalog snapshot.
    pub async fn price(&self, items: &[OrderRequestItem]) -> Result<PricedOrder> {
        let snapshot = self.catalog.snapshot().await?;
        price_with(&snapshot, items)
    }
}

/// Prices every request line, failing the whole request on the first
/// unknown item. Quantities below one are priced as one.
pub fn price_with(snapshot: &CatalogSnapshot, items: &[OrderRequestItem]) -> Result<PricedOrder> {
    let mut priced = PricedOrder::default();
    for request in items {
        let item = snapshot
            .get(&request.item_id)
            .ok_or_else(|| KioskError::LineItemNotFound(request.item_id.clone()))?;
        let quantity = u32::try_from(request.quantity.max(1)).map_err(|_| {
            KioskError::ValidationError(format!(
                "quantity {} for {} is too large",
                request.quantity, request.item_id
            ))
        })?;

        let deposit = snapshot.effective_deposit(item);
        let subtotal = (item.price + deposit) * quantity;
        priced.total += subtotal;
        priced.deposit_total += deposit * quantity;
        priced.carbon_saving += item.carbon_saving * Decimal::from(quantity);
        priced.water_saving += item.water_saving * Decimal::from(quantity);
        priced.lines.push(PricedLine {
            item_id: item.id.clone(),
            quantity,
            unit_price: item.price,
            deposit,
            subtotal,
        });
    }
    tracing::debug!(
        lines = priced.lines.len(),
        total = %priced.total,
        deposit_total = %priced.deposit_total,
        "priced order"
    );
    Ok(priced)
}
