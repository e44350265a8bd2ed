mod common;

use common::{item, kiosk_with};
use kiosk_ledger::application::lifecycle::Fulfillment;
use kiosk_ledger::config::KioskConfig;
use kiosk_ledger::domain::catalog::ItemStatus;
use kiosk_ledger::domain::money::Cents;
use kiosk_ledger::domain::order::OrderRequestItem;
use kiosk_ledger::error::ErrorClass;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_rewards_stay_within_band() {
    let mut retired = item("old", 10, 0, 1, dec!(9.9));
    retired.status = ItemStatus::Inactive;
    let (kiosk, _) = kiosk_with(
        KioskConfig::default(),
        Fulfillment::DirectCommit,
        vec![
            item("low", 100, 0, 1, dec!(0.05)),
            item("mid", 100, 0, 1, dec!(0.10)),
            item("high", 100, 0, 1, dec!(0.25)),
            retired,
        ],
        vec![],
    )
    .await;

    let listing = kiosk.list_catalog().await.unwrap();
    assert_eq!(listing.len(), 3);
    for entry in &listing {
        assert!(entry.reward >= Cents(500) && entry.reward <= Cents(1500));
        assert_eq!(entry.effective_deposit, entry.reward);
    }
    let reward = |id: &str| listing.iter().find(|e| e.item.id == id).unwrap().reward;
    // The inactive outlier does not stretch the range.
    assert_eq!(reward("low"), Cents(500));
    assert_eq!(reward("mid"), Cents(750));
    assert_eq!(reward("high"), Cents(1500));
}

#[tokio::test]
async fn test_zero_spread_pays_minimum() {
    let (kiosk, _) = kiosk_with(
        KioskConfig::default(),
        Fulfillment::DirectCommit,
        vec![
            item("A", 100, 0, 1, dec!(0.2)),
            item("B", 100, 30, 1, dec!(0.2)),
        ],
        vec![],
    )
    .await;

    for entry in kiosk.list_catalog().await.unwrap() {
        assert_eq!(entry.reward, Cents(500));
    }
}

#[tokio::test]
async fn test_oversized_quantity_is_rejected() {
    let (kiosk, _) = kiosk_with(
        KioskConfig::default(),
        Fulfillment::DirectCommit,
        vec![item("A", 100, 20, 1, dec!(0.2))],
        vec![],
    )
    .await;

    let err = kiosk
        .create_order(None, &[OrderRequestItem::new("A", i64::MAX)])
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);

    let err = kiosk.decrement_stock("A", 0).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
}
