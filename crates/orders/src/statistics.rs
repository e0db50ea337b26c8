use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{DomainResult, checked_sum};

use crate::order::Order;

/// Money totals over a set of fulfilled orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub overall: Decimal,
    pub in_month: Decimal,
}

/// Sum `total_price` overall and for orders created in `now`'s calendar month (UTC).
pub fn summarize<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    now: DateTime<Utc>,
) -> DomainResult<OrderStatistics> {
    orders
        .into_iter()
        .try_fold(OrderStatistics::default(), |mut acc, order| {
            acc.overall = checked_sum([acc.overall, order.total_price()])?;
            let created = order.created_at();
            if created.year() == now.year() && created.month() == now.month() {
                acc.in_month = checked_sum([acc.in_month, order.total_price()])?;
            }
            Ok(acc)
        })
}
