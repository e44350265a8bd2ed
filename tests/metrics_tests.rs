mod common;

use common::{catalog_kiosk, item};
use kiosk_ledger::domain::money::Cents;
use kiosk_ledger::domain::order::{OrderRequestItem, PaymentOutcome};
use kiosk_ledger::domain::recycle::ReturnDecision;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_refund_rate_of_a_fully_returned_order() {
    let (kiosk, _) = catalog_kiosk(
        vec![
            item("A", 125, 40, 5, dec!(0.2)),
            item("B", 125, 0, 5, dec!(0.1)),
        ],
        vec![],
    )
    .await;
    let created = kiosk
        .create_order(
            None,
            &[OrderRequestItem::new("A", 1), OrderRequestItem::new("B", 1)],
        )
        .await
        .unwrap();
    assert_eq!(created.total, Cents(290));
    kiosk
        .confirm_payment(created.order_id, PaymentOutcome::Success)
        .await
        .unwrap();

    // A canceled order carries no liability and no revenue.
    let canceled = kiosk
        .create_order(None, &[OrderRequestItem::new("A", 2)])
        .await
        .unwrap();
    kiosk
        .confirm_payment(canceled.order_id, PaymentOutcome::Fail)
        .await
        .unwrap();

    kiosk
        .recycle_confirm(
            None,
            &format!("{}|A", created.order_id),
            ReturnDecision::Accept,
        )
        .await
        .unwrap();
    kiosk
        .recycle_confirm(None, "A", ReturnDecision::Reject)
        .await
        .unwrap();

    let summary = kiosk.metrics_summary().await.unwrap();
    let today = &summary.today;
    assert_eq!(today.revenue, Cents(290));
    assert_eq!(today.deposit_liability, Cents(40));
    assert_eq!(today.deposit_refunded, Cents(40));
    assert_eq!(today.deposit_outstanding, Cents::ZERO);
    assert_eq!(today.deposit_refund_rate, dec!(1));
    assert_eq!(today.returns_accepted, 1);
    assert_eq!(today.returns_rejected, 1);
    assert_eq!(summary.total, summary.today);

    assert_eq!(summary.daily.len(), 7);
    assert_eq!(summary.daily[6].metrics, summary.today);
    assert!(summary.daily[..6].iter().all(|d| d.metrics.revenue == Cents::ZERO));
}

#[tokio::test]
async fn test_empty_ledgers() {
    let (kiosk, _) = catalog_kiosk(vec![], vec![]).await;
    let summary = kiosk.metrics_summary().await.unwrap();
    assert_eq!(summary.total.deposit_refund_rate, dec!(0));
    assert_eq!(summary.total.revenue, Cents::ZERO);
    assert_eq!(summary.daily.len(), 7);
}
