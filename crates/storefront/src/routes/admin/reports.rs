//! Back-office dashboard and sales reports.

use axum::{extract::State, http::header, response::IntoResponse};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use urban_style_core::reports::{
    DashboardStats, DateRange, OrderSummary, SalesReport, default_range, store_date,
    trailing_days,
};

use crate::db::{OrderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Query};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// `GET /api/admin/reports` query.
///
/// Without `start`, the range is the last `days` days, or month-to-date
/// when `days` is absent too. `end` defaults to today.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub days: Option<u32>,
}

impl ReportQuery {
    fn range(&self, today: NaiveDate) -> Result<DateRange> {
        let end = self.end.unwrap_or(today);
        let range = match (self.start, self.days) {
            (Some(start), _) => DateRange::new(start, end)?,
            (None, Some(days)) => trailing_days(end, days.max(1))?,
            (None, None) if self.end.is_none() => default_range(today),
            (None, None) => DateRange::new(default_range(end).start, end)?,
        };
        Ok(range)
    }
}

/// Load orders that can fall inside `range` in store time.
///
/// The UTC window is padded by a day on each side; the report itself
/// filters by store-local date.
async fn orders_for(state: &AppState, range: DateRange) -> Result<Vec<OrderSummary>> {
    let bound = |date: NaiveDate| {
        date.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| AppError::BadRequest("Invalid date".to_string()))
    };
    let from = bound(range.start.checked_sub_days(Days::new(1)).unwrap_or(range.start))?;
    let until = bound(range.end.checked_add_days(Days::new(2)).unwrap_or(range.end))?;

    let orders = OrderRepository::new(state.pool())
        .list_created_between(from, until)
        .await?;
    Ok(orders.iter().map(crate::models::Order::summary).collect())
}

/// `GET /api/admin/dashboard`
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let orders: Vec<OrderSummary> = OrderRepository::new(state.pool())
        .list(None)
        .await?
        .iter()
        .map(crate::models::Order::summary)
        .collect();
    let products = ProductRepository::new(state.pool()).list().await?;

    Ok(Json(DashboardStats::compute(
        &orders,
        &products,
        store_date(Utc::now()),
    )))
}

/// `GET /api/admin/reports?start=&end=&days=`
#[instrument(skip(state, _admin))]
pub async fn report(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SalesReport>> {
    let range = query.range(store_date(Utc::now()))?;
    let orders = orders_for(&state, range).await?;

    Ok(Json(SalesReport::compute(&orders, range)))
}

/// `GET /api/admin/reports/export.csv?start=&end=&days=`
///
/// The report's per-product table as a CSV download.
#[instrument(skip(state, _admin))]
pub async fn export_csv(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse> {
    let range = query.range(store_date(Utc::now()))?;
    let orders = orders_for(&state, range).await?;
    let report = SalesReport::compute(&orders, range);

    let disposition = format!("attachment; filename=\"{}\"", report.csv_file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.products_csv(),
    ))
}
