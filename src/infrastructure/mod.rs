//! Storage adapters and the simulated lane hardware.
//!
//! Both stores stage multi-row writes with the helpers below and only write
//! back once staging succeeded, so a failed commit never leaves partial state.

pub mod dispenser;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::catalog::CatalogItem;
use crate::domain::customer::Customer;
use crate::domain::order::{FulfilmentCommit, Order, OrderStatus};
use crate::domain::recycle::ReturnEntry;
use crate::error::{KioskError, Result};
use std::collections::HashMap;

/// Applies `commit` to copies of the order and the affected items.
///
/// `lookup` resolves current item rows. Returns the settled order and the
/// items whose stock changed.
pub(crate) fn stage_fulfilment<'a>(
    order: &Order,
    commit: &FulfilmentCommit,
    lookup: impl Fn(&str) -> Option<&'a CatalogItem>,
) -> Result<(Order, Vec<CatalogItem>)> {
    order.ensure_status(&commit.allowed_from, "commit stock")?;

    let mut staged: HashMap<String, CatalogItem> = HashMap::new();
    for (item_id, quantity) in &commit.decrements {
        if *quantity == 0 {
            continue;
        }
        if !staged.contains_key(item_id) {
            let current =
                lookup(item_id).ok_or_else(|| KioskError::ItemNotFound(item_id.clone()))?;
            staged.insert(item_id.clone(), current.clone());
        }
        let Some(item) = staged.get_mut(item_id) else {
            return Err(KioskError::ItemNotFound(item_id.clone()));
        };
        if !item.take_stock(*quantity) {
            return Err(KioskError::StockInsufficient {
                item_id: item_id.clone(),
                requested: *quantity,
                available: item.stock,
            });
        }
    }

    let mut settled = order.clone();
    settled.status = OrderStatus::Done;
    settled.refund = commit.refund;
    Ok((settled, staged.into_values().collect()))
}

/// Staged side effects of an accepted return.
#[derive(Debug, Default)]
pub(crate) struct StagedReturn {
    pub order: Option<Order>,
    pub customer: Option<Customer>,
}

/// Applies the balance credit and receipt bump of `entry` to copies of the
/// affected rows. Rejected returns stage nothing.
pub(crate) fn stage_return(
    entry: &ReturnEntry,
    order: Option<&Order>,
    customer: Option<&Customer>,
) -> Result<StagedReturn> {
    let mut staged = StagedReturn::default();
    if !entry.record.is_accepted() {
        return Ok(staged);
    }

    if let Some(receipt) = entry.receipt_line {
        let mut order = order
            .cloned()
            .ok_or_else(|| KioskError::ReceiptNotFound(entry.record.code.clone()))?;
        let hinted = order
            .items
            .iter()
            .position(|l| l.id == receipt.line_id)
            .ok_or_else(|| KioskError::ReceiptNotFound(entry.record.code.clone()))?;
        // The hinted line may have run out since it was resolved; any line of
        // the same item with units left takes the return instead.
        let item_id = order.items[hinted].item_id.clone();
        let line = if order.items[hinted].refundable_quantity() > 0 {
            Some(hinted)
        } else {
            order
                .items
                .iter()
                .position(|l| l.item_id == item_id && l.refundable_quantity() > 0)
        };
        let Some(line) = line else {
            return Err(KioskError::AlreadyFullyRefunded {
                order_id: receipt.order_id,
                item_id,
            });
        };
        order.items[line].refunded_quantity += 1;
        staged.order = Some(order);
    }

    if let Some(customer_id) = entry.record.owner.member() {
        let mut customer = customer
            .cloned()
            .ok_or_else(|| KioskError::MemberNotFound(customer_id.to_string()))?;
        customer.deposit_balance += entry.record.refundable;
        staged.customer = Some(customer);
    }

    Ok(staged)
}
