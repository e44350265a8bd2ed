use crate::domain::money::{Cents, round_carbon, round_water};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{OrderStore, ReturnStore, StoreHandle};
use crate::domain::recycle::{ReturnRecord, ReturnStatus};
use crate::error::Result;
use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Days covered by the trailing daily series.
pub const TRAILING_DAYS: u64 = 7;

/// Figures for one window of time.
#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct MetricsWindow {
    /// Completed orders net of dispense refunds.
    #[serde(rename = "revenue_cents")]
    pub revenue: Cents,
    /// Deposits collected by paid orders.
    #[serde(rename = "deposit_liability_cents")]
    pub deposit_liability: Cents,
    #[serde(rename = "deposit_refunded_cents")]
    pub deposit_refunded: Cents,
    #[serde(rename = "deposit_outstanding_cents")]
    pub deposit_outstanding: Cents,
    pub deposit_refund_rate: Decimal,
    pub carbon_saving: Decimal,
    pub water_saving: Decimal,
    pub returns_accepted: u32,
    pub returns_rejected: u32,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: MetricsWindow,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct MetricsSummary {
    pub today: MetricsWindow,
    pub total: MetricsWindow,
    /// Oldest first, ending today.
    pub daily: Vec<DailyMetrics>,
}

/// Read-only aggregation over the order and return ledgers.
#[derive(Clone)]
pub struct MetricsAggregator {
    store: StoreHandle,
}

impl MetricsAggregator {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn summary(&self) -> Result<MetricsSummary> {
        self.summary_on(Local::now().date_naive()).await
    }

    /// Summary as seen on local date `today`.
    pub async fn summary_on(&self, today: NaiveDate) -> Result<MetricsSummary> {
        let orders = self.store.all_orders().await?;
        let returns = self.store.all_returns().await?;
        Ok(summarize(&orders, &returns, today))
    }
}

fn local_date(at: &DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

pub fn summarize(orders: &[Order], returns: &[ReturnRecord], today: NaiveDate) -> MetricsSummary {
    let on = |day: NaiveDate| window(orders, returns, |at| local_date(at) == day);
    let daily = (0..TRAILING_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| DailyMetrics {
            date,
            metrics: on(date),
        })
        .collect();

    MetricsSummary {
        today: on(today),
        total: window(orders, returns, |_| true),
        daily,
    }
}

fn window(
    orders: &[Order],
    returns: &[ReturnRecord],
    within: impl Fn(&DateTime<Utc>) -> bool,
) -> MetricsWindow {
    let mut metrics = MetricsWindow::default();
    for order in orders.iter().filter(|o| within(&o.created_at)) {
        if order.status == OrderStatus::Done {
            metrics.revenue += order.net_revenue();
        }
        if order.status.holds_deposit() {
            metrics.deposit_liability += order.deposit_total;
        }
        metrics.carbon_saving += order.carbon_saving;
        metrics.water_saving += order.water_saving;
    }
    for record in returns.iter().filter(|r| within(&r.created_at)) {
        match record.status {
            ReturnStatus::Accepted => {
                metrics.returns_accepted += 1;
                metrics.deposit_refunded += record.refundable;
            }
            ReturnStatus::Rejected => metrics.returns_rejected += 1,
        }
    }

    metrics.deposit_outstanding = metrics
        .deposit_liability
        .saturating_sub(metrics.deposit_refunded);
    metrics.deposit_refund_rate = if metrics.deposit_liability.is_positive() {
        (metrics.deposit_refunded.to_decimal() / metrics.deposit_liability.to_decimal())
            .round_dp(4)
            .normalize()
    } else {
        Decimal::ZERO
    };
    metrics.carbon_saving = round_carbon(metrics.carbon_saving);
    metrics.water_saving = round_water(metrics.water_saving);
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::LineItem;
    use crate::domain::recycle::{ReturnOwner, ReturnSource};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(status: OrderStatus, total: i64, deposit: i64, created_at: DateTime<Utc>) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            items: Vec::<LineItem>::new(),
            total: Cents(total),
            deposit_total: Cents(deposit),
            carbon_saving: dec!(0.5),
            water_saving: dec!(2),
            refund: Cents::ZERO,
            status,
            created_at,
        }
    }

    fn returned(status: ReturnStatus, amount: i64, created_at: DateTime<Utc>) -> ReturnRecord {
        ReturnRecord {
            id: Uuid::new_v4(),
            owner: ReturnOwner::Guest,
            source: ReturnSource::Barcode,
            code: "A".to_string(),
            item_id: "A".to_string(),
            refundable: Cents(amount),
            carbon_credit: Decimal::ZERO,
            water_credit: Decimal::ZERO,
            status,
            created_at,
        }
    }

    #[test]
    fn test_refund_rate_for_single_day() {
        let now = Utc::now();
        let today = local_date(&now);
        let orders = [order(OrderStatus::Done, 290, 40, now)];
        let returns = [returned(ReturnStatus::Accepted, 40, now)];

        let summary = summarize(&orders, &returns, today);
        assert_eq!(summary.today.revenue, Cents(290));
        assert_eq!(summary.today.deposit_liability, Cents(40));
        assert_eq!(summary.today.deposit_refunded, Cents(40));
        assert_eq!(summary.today.deposit_outstanding, Cents::ZERO);
        assert_eq!(summary.today.deposit_refund_rate, dec!(1));
        assert_eq!(summary.today.returns_accepted, 1);
    }

    #[test]
    fn test_status_filters() {
        let now = Utc::now();
        let orders = [
            order(OrderStatus::Done, 100, 10, now),
            order(OrderStatus::Paid, 200, 20, now),
            order(OrderStatus::Created, 400, 40, now),
            order(OrderStatus::Canceled, 800, 80, now),
        ];
        let mut refunded = order(OrderStatus::Done, 300, 0, now);
        refunded.refund = Cents(120);

        let mut all = orders.to_vec();
        all.push(refunded);
        let summary = summarize(&all, &[], local_date(&now));

        assert_eq!(summary.total.revenue, Cents(100 + 300 - 120));
        assert_eq!(summary.total.deposit_liability, Cents(30));
        assert_eq!(summary.total.deposit_refund_rate, Decimal::ZERO);
        assert_eq!(summary.total.carbon_saving, dec!(2.5));
    }

    #[test]
    fn test_outstanding_floors_at_zero() {
        let now = Utc::now();
        let orders = [order(OrderStatus::Done, 120, 20, now)];
        let returns = [
            returned(ReturnStatus::Accepted, 500, now),
            returned(ReturnStatus::Rejected, 0, now),
        ];
        let summary = summarize(&orders, &returns, local_date(&now));
        assert_eq!(summary.total.deposit_outstanding, Cents::ZERO);
        assert_eq!(summary.total.deposit_refund_rate, dec!(25));
        assert_eq!(summary.total.returns_rejected, 1);
    }

    #[test]
    fn test_daily_series_is_seven_days_oldest_first() {
        let now = Utc::now();
        let today = local_date(&now);
        let three_days_ago = now - chrono::Duration::days(3);
        let orders = [
            order(OrderStatus::Done, 100, 0, now),
            order(OrderStatus::Done, 50, 0, three_days_ago),
            order(OrderStatus::Done, 70, 0, now - chrono::Duration::days(30)),
        ];

        let summary = summarize(&orders, &[], today);
        assert_eq!(summary.daily.len(), 7);
        assert_eq!(summary.daily[6].date, today);
        assert!(summary.daily[0].date < summary.daily[1].date);
        assert_eq!(summary.daily[6].metrics.revenue, Cents(100));
        let back = summary
            .daily
            .iter()
            .find(|d| d.date == local_date(&three_days_ago))
            .unwrap();
        assert_eq!(back.metrics.revenue, Cents(50));
        assert_eq!(summary.total.revenue, Cents(220));
    }
}
