//! Back-office dashboard and sales reports.
//!
//! Everything here aggregates order rows that the caller has already loaded;
//! nothing touches the database.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{OrderNumber, OrderStatus, Price};

/// Products on the dashboard's best-seller list.
pub const DASHBOARD_TOP_PRODUCTS: usize = 5;

/// Products on the report's best-seller list.
pub const REPORT_TOP_PRODUCTS: usize = 8;

/// Months shown on the dashboard revenue chart.
pub const DASHBOARD_MONTHS: u32 = 6;

/// Longest report range, in days.
pub const MAX_REPORT_DAYS: i64 = 366;

/// The store operates on Western Indonesia Time (UTC+7).
const STORE_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Calendar date of `at` in the store's time zone.
#[must_use]
pub fn store_date(at: DateTime<Utc>) -> NaiveDate {
    FixedOffset::east_opt(STORE_UTC_OFFSET_SECS)
        .map_or_else(|| at.date_naive(), |tz| at.with_timezone(&tz).date_naive())
}

/// An order item as needed for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemSummary {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub size: String,
}

/// An order as needed for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemSummary>,
}

/// Quantity and revenue sold for one product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub name: String,
    pub quantity: u32,
    pub revenue: Price,
}

/// Per-product sales, in first-seen order.
fn product_sales<'a>(orders: impl IntoIterator<Item = &'a OrderSummary>) -> Vec<ProductSales> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sales: Vec<ProductSales> = Vec::new();

    for item in orders.into_iter().flat_map(|o| &o.items) {
        let slot = *index.entry(item.product_name.as_str()).or_insert_with(|| {
            sales.push(ProductSales {
                name: item.product_name.clone(),
                quantity: 0,
                revenue: Price::ZERO,
            });
            sales.len() - 1
        });
        if let Some(entry) = sales.get_mut(slot) {
            entry.quantity = entry.quantity.saturating_add(item.quantity);
            entry.revenue = entry.revenue + item.unit_price * item.quantity;
        }
    }

    sales
}

/// Number of orders in each status, in lifecycle order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub label: &'static str,
    pub count: usize,
}

fn status_counts(orders: &[&OrderSummary]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            label: status.report_label(),
            count: orders.iter().filter(|o| o.status == status).count(),
        })
        .collect()
}

fn revenue_of<'a>(orders: impl IntoIterator<Item = &'a &'a OrderSummary>) -> Price {
    orders.into_iter().map(|o| o.total).sum()
}

// =============================================================================
// Dashboard
// =============================================================================

/// Revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// First day of the month.
    pub month: NaiveDate,
    /// Short month name (`Jan`, `Feb`, ...).
    pub label: String,
    pub revenue: Price,
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_orders: usize,
    pub total_revenue: Price,
    pub total_products: usize,
    pub low_stock_products: usize,
    pub status_counts: Vec<StatusCount>,
    /// Share of delivered orders in percent, rounded to a whole number.
    pub delivered_percent: Decimal,
    /// Revenue change of the current month against the previous one, in
    /// percent with one decimal. `None` when the previous month had no
    /// revenue.
    pub revenue_growth_percent: Option<Decimal>,
    pub top_products: Vec<ProductSales>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn percent(part: Decimal, whole: Decimal, dp: u32) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part * Decimal::ONE_HUNDRED / whole).round_dp(dp)
    }
}

/// Revenue per month for the `months` months ending with the month of `today`,
/// oldest first.
#[must_use]
pub fn monthly_revenue(orders: &[OrderSummary], today: NaiveDate, months: u32) -> Vec<MonthlyRevenue> {
    let current = first_of_month(today);
    (0..months)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(|month| {
            let revenue = orders
                .iter()
                .filter(|o| first_of_month(store_date(o.created_at)) == month)
                .map(|o| o.total)
                .sum();
            MonthlyRevenue {
                month,
                label: month.format("%b").to_string(),
                revenue,
            }
        })
        .collect()
}

impl DashboardStats {
    /// Compute dashboard statistics as of `today`.
    ///
    /// Cancelled orders count towards the order total and status breakdown
    /// like any other order.
    #[must_use]
    pub fn compute(orders: &[OrderSummary], products: &[Product], today: NaiveDate) -> Self {
        let all: Vec<&OrderSummary> = orders.iter().collect();
        let total_revenue = revenue_of(&all);
        let status_counts = status_counts(&all);

        let delivered = status_counts
            .iter()
            .find(|s| s.status == OrderStatus::Delivered)
            .map_or(0, |s| s.count);
        let delivered_percent = percent(Decimal::from(delivered), Decimal::from(all.len()), 0);

        let mut top_products = product_sales(orders);
        top_products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        top_products.truncate(DASHBOARD_TOP_PRODUCTS);

        let monthly_revenue = monthly_revenue(orders, today, DASHBOARD_MONTHS);
        let revenue_growth_percent = match monthly_revenue.as_slice() {
            [.., previous, current] if !previous.revenue.amount().is_zero() => Some(percent(
                current.revenue.amount() - previous.revenue.amount(),
                previous.revenue.amount(),
                1,
            )),
            _ => None,
        };

        Self {
            total_orders: all.len(),
            total_revenue,
            total_products: products.len(),
            low_stock_products: products.iter().filter(|p| p.is_low_stock()).count(),
            status_counts,
            delivered_percent,
            revenue_growth_percent,
            top_products,
            monthly_revenue,
        }
    }
}

// =============================================================================
// Sales report
// =============================================================================

/// Why a report range was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportRangeError {
    #[error("end date {end} is before start date {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("report range cannot exceed {max} days", max = MAX_REPORT_DAYS)]
    TooLong,
}

/// Inclusive date range for a sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range.
    ///
    /// # Errors
    ///
    /// Returns an error when `end < start` or the range spans more than
    /// [`MAX_REPORT_DAYS`] days.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportRangeError> {
        if end < start {
            return Err(ReportRangeError::Inverted { start, end });
        }
        if (end - start).num_days() >= MAX_REPORT_DAYS {
            return Err(ReportRangeError::TooLong);
        }
        Ok(Self { start, end })
    }

    /// Month-to-date range ending `today`.
    #[must_use]
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: first_of_month(today),
            end: today,
        }
    }

    /// Whether `date` falls inside the range (both ends included).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |d| *d <= self.end)
    }
}

/// Revenue for one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRevenue {
    pub status: OrderStatus,
    pub label: &'static str,
    pub revenue: Price,
}

/// Revenue for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    /// `dd/mm`.
    pub label: String,
    pub revenue: Price,
}

/// One row of the report's order table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOrderRow {
    pub id: OrderNumber,
    pub date: NaiveDate,
    pub customer_name: String,
    pub item_count: u32,
    pub status: OrderStatus,
    pub total: Price,
}

/// Sales report over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub range: DateRange,
    pub total_revenue: Price,
    pub total_orders: usize,
    /// Revenue divided by order count, rounded to whole rupiah; zero when
    /// there are no orders.
    pub average_order_value: Price,
    pub revenue_by_status: Vec<StatusRevenue>,
    pub status_distribution: Vec<StatusCount>,
    pub top_products: Vec<ProductSales>,
    pub daily_revenue: Vec<DailyRevenue>,
    pub orders: Vec<ReportOrderRow>,
}

/// Statuses broken out in the revenue-by-status chart.
const REVENUE_STATUSES: [OrderStatus; 3] = [
    OrderStatus::Delivered,
    OrderStatus::Processing,
    OrderStatus::Pending,
];

impl SalesReport {
    /// Build the report for orders placed inside `range`.
    #[must_use]
    pub fn compute(orders: &[OrderSummary], range: DateRange) -> Self {
        let in_range: Vec<&OrderSummary> = orders
            .iter()
            .filter(|o| range.contains(store_date(o.created_at)))
            .collect();

        let total_revenue = revenue_of(&in_range);
        let total_orders = in_range.len();
        let average_order_value = if total_orders == 0 {
            Price::ZERO
        } else {
            let avg = (total_revenue.amount() / Decimal::from(total_orders)).round();
            Price::new(avg).unwrap_or(Price::ZERO)
        };

        let revenue_by_status = REVENUE_STATUSES
            .into_iter()
            .map(|status| StatusRevenue {
                status,
                label: status.report_label(),
                revenue: revenue_of(in_range.iter().filter(|o| o.status == status)),
            })
            .collect();

        let mut top_products = product_sales(in_range.iter().copied());
        top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        top_products.truncate(REPORT_TOP_PRODUCTS);

        let daily_revenue = range
            .days()
            .map(|date| DailyRevenue {
                date,
                label: date.format("%d/%m").to_string(),
                revenue: revenue_of(in_range.iter().filter(|o| store_date(o.created_at) == date)),
            })
            .collect();

        let orders = in_range
            .iter()
            .map(|o| ReportOrderRow {
                id: o.id.clone(),
                date: store_date(o.created_at),
                customer_name: o.customer_name.clone(),
                item_count: o
                    .items
                    .iter()
                    .fold(0_u32, |acc, i| acc.saturating_add(i.quantity)),
                status: o.status,
                total: o.total,
            })
            .collect();

        Self {
            range,
            total_revenue,
            total_orders,
            average_order_value,
            revenue_by_status,
            status_distribution: status_counts(&in_range),
            top_products,
            daily_revenue,
            orders,
        }
    }

    /// Per-product sales table as CSV (header row included).
    #[must_use]
    pub fn products_csv(&self) -> String {
        let mut out = String::from("product,quantity,revenue\r\n");
        for row in &self.top_products {
            let _ = write!(
                out,
                "{},{},{}\r\n",
                csv_field(&row.name),
                row.quantity,
                row.revenue.amount().round()
            );
        }
        out
    }

    /// Suggested download file name.
    #[must_use]
    pub fn csv_file_name(&self) -> String {
        format!("sales-report-{}-{}.csv", self.range.start, self.range.end)
    }
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// Default report range when the client does not pass one.
#[must_use]
pub fn default_range(today: NaiveDate) -> DateRange {
    DateRange::month_to_date(today)
}

/// Last `days` days ending `today`, both included.
///
/// # Errors
///
/// Returns [`ReportRangeError::TooLong`] when `days` exceeds
/// [`MAX_REPORT_DAYS`].
pub fn trailing_days(today: NaiveDate, days: u32) -> Result<DateRange, ReportRangeError> {
    let span = i64::from(days.saturating_sub(1));
    if span >= MAX_REPORT_DAYS {
        return Err(ReportRangeError::TooLong);
    }
    let start = today
        .checked_sub_signed(Duration::days(span))
        .ok_or(ReportRangeError::TooLong)?;
    DateRange::new(start, today)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::catalog::tests::{category, product};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(n: u32, status: OrderStatus, at: (i32, u32, u32), items: &[(&str, u32, u64)]) -> OrderSummary {
        let items: Vec<OrderItemSummary> = items
            .iter()
            .map(|(name, quantity, price)| OrderItemSummary {
                product_name: (*name).to_owned(),
                quantity: *quantity,
                unit_price: Price::from_rupiah(*price),
                size: "M".into(),
            })
            .collect();
        let total = items.iter().map(|i| i.unit_price * i.quantity).sum();
        OrderSummary {
            id: OrderNumber::from_parts(at.0, 100_000 + n),
            customer_name: format!("Customer {n}"),
            customer_email: format!("c{n}@example.com"),
            status,
            total,
            created_at: Utc.with_ymd_and_hms(at.0, at.1, at.2, 5, 0, 0).unwrap(),
            items,
        }
    }

    fn sample() -> Vec<OrderSummary> {
        vec![
            order(1, OrderStatus::Delivered, (2026, 1, 10), &[("Tee", 2, 100_000)]),
            order(2, OrderStatus::Pending, (2026, 1, 20), &[("Hoodie", 1, 400_000), ("Tee", 1, 100_000)]),
            order(3, OrderStatus::Processing, (2026, 2, 1), &[("Cap", 5, 50_000)]),
            order(4, OrderStatus::Cancelled, (2025, 12, 5), &[("Tee", 1, 100_000)]),
        ]
    }

    #[test]
    fn test_store_date_uses_wib() {
        let late_utc = Utc.with_ymd_and_hms(2026, 1, 31, 18, 0, 0).unwrap();
        assert_eq!(store_date(late_utc), date(2026, 2, 1));
    }

    #[test]
    fn test_dashboard_stats() {
        let tops = category("tops");
        let mut low = product("Low", &tops, 1);
        low.stock = 19;
        let products = vec![product("A", &tops, 1), low];

        let stats = DashboardStats::compute(&sample(), &products, date(2026, 2, 3));
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.total_revenue, Price::from_rupiah(1_050_000));
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.low_stock_products, 1);
        assert_eq!(stats.delivered_percent, Decimal::from(25));

        let counts: Vec<usize> = stats.status_counts.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 1, 1]);

        assert_eq!(stats.top_products[0].name, "Cap");
        assert_eq!(stats.top_products[0].quantity, 5);
        assert_eq!(stats.top_products[1].name, "Tee");
        assert_eq!(stats.top_products[1].quantity, 4);
    }

    #[test]
    fn test_monthly_revenue_last_six_months() {
        let months = monthly_revenue(&sample(), date(2026, 2, 3), DASHBOARD_MONTHS);
        let labels: Vec<&str> = months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Sep", "Oct", "Nov", "Dec", "Jan", "Feb"]);
        assert_eq!(months[3].revenue, Price::from_rupiah(100_000));
        assert_eq!(months[4].revenue, Price::from_rupiah(700_000));
        assert_eq!(months[5].revenue, Price::from_rupiah(250_000));
    }

    #[test]
    fn test_revenue_growth() {
        let stats = DashboardStats::compute(&sample(), &[], date(2026, 2, 3));
        // 250k against 700k
        assert_eq!(stats.revenue_growth_percent, Some(Decimal::new(-643, 1)));

        let stats = DashboardStats::compute(&[], &[], date(2026, 2, 3));
        assert_eq!(stats.revenue_growth_percent, None);
        assert_eq!(stats.delivered_percent, Decimal::ZERO);
    }

    #[test]
    fn test_date_range_validation() {
        assert!(DateRange::new(date(2026, 2, 1), date(2026, 1, 1)).is_err());
        assert!(DateRange::new(date(2026, 1, 1), date(2026, 1, 1)).is_ok());
        assert_eq!(
            DateRange::new(date(2025, 1, 1), date(2026, 1, 2)),
            Err(ReportRangeError::TooLong)
        );
    }

    #[test]
    fn test_sales_report_inclusive_range() {
        let range = DateRange::new(date(2026, 1, 1), date(2026, 2, 1)).unwrap();
        let report = SalesReport::compute(&sample(), range);

        assert_eq!(report.total_orders, 3);
        assert_eq!(report.total_revenue, Price::from_rupiah(950_000));
        assert_eq!(report.average_order_value, Price::from_rupiah(316_667));

        let by_status: Vec<(OrderStatus, Price)> = report
            .revenue_by_status
            .iter()
            .map(|s| (s.status, s.revenue))
            .collect();
        assert_eq!(
            by_status,
            vec![
                (OrderStatus::Delivered, Price::from_rupiah(200_000)),
                (OrderStatus::Processing, Price::from_rupiah(250_000)),
                (OrderStatus::Pending, Price::from_rupiah(500_000)),
            ]
        );

        assert_eq!(report.status_distribution.len(), 5);
        assert_eq!(report.top_products[0].name, "Hoodie");
        assert_eq!(report.top_products[1].name, "Tee");
        assert_eq!(report.top_products[1].revenue, Price::from_rupiah(300_000));

        assert_eq!(report.daily_revenue.len(), 32);
        assert_eq!(report.daily_revenue[9].label, "10/01");
        assert_eq!(report.daily_revenue[9].revenue, Price::from_rupiah(200_000));
        assert_eq!(report.orders.len(), 3);
    }

    #[test]
    fn test_empty_report() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        let report = SalesReport::compute(&sample(), range);
        assert_eq!(report.total_orders, 0);
        assert_eq!(report.average_order_value, Price::ZERO);
        assert!(report.top_products.is_empty());
        assert_eq!(report.daily_revenue.len(), 7);
    }

    #[test]
    fn test_products_csv() {
        let mut orders = sample();
        orders[0].items[0].product_name = "Tee, \"Classic\"".into();
        let range = DateRange::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap();
        let csv = SalesReport::compute(&orders, range).products_csv();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "product,quantity,revenue");
        assert_eq!(lines[1], "Hoodie,1,400000");
        assert_eq!(lines[2], "\"Tee, \"\"Classic\"\"\",2,200000");
        assert_eq!(lines[3], "Tee,1,100000");
    }

    #[test]
    fn test_order_row_item_count_saturates() {
        let orders = vec![order(
            9,
            OrderStatus::Pending,
            (2026, 1, 15),
            &[("Tee", u32::MAX, 1), ("Cap", 2, 1)],
        )];
        let range = DateRange::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap();
        let report = SalesReport::compute(&orders, range);
        assert_eq!(report.orders[0].item_count, u32::MAX);
    }

    #[test]
    fn test_trailing_days() {
        let range = trailing_days(date(2026, 2, 3), 7).unwrap();
        assert_eq!(range.start, date(2026, 1, 28));
        assert_eq!(trailing_days(date(2026, 2, 3), 0).unwrap().start, date(2026, 2, 3));
        assert_eq!(
            trailing_days(date(2026, 3, 18), 100_000_000),
            Err(ReportRangeError::TooLong)
        );
        assert!(trailing_days(date(2026, 3, 18), 366).is_ok());
        assert_eq!(trailing_days(date(2026, 3, 18), 367), Err(ReportRangeError::TooLong));
        assert_eq!(default_range(date(2026, 2, 3)).start, date(2026, 2, 1));
    }
}
