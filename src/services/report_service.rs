// ============================================================================
// SERVICE : RAPPORTS (ADMIN)
// ============================================================================
//
// - Rapport de CA par catégorie (année, mois optionnel) + comparaison avec la
//   période précédente (mois précédent, janvier -> décembre N-1, ou année N-1)
// - Résumé du dashboard (jour / semaine depuis dimanche / mois)
// - Courbe des ventes (daily | weekly | monthly) sur N jours
//
// Seules les commandes paid et shipped comptent dans le CA.
// Toutes les fenêtres sont semi-ouvertes [start, end) et en UTC.
//
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult, DbContext};
use crate::models::dto::{
    CategoryRevenue, DashboardSummary, DateWindow, PeriodSummary, RevenueReport, TrendPoint,
};
use crate::models::orders::OrderStatus;
use crate::repositories::{ReportRepository, TrendBucket};

/// Seuil (inclus) sous lequel un produit est en stock faible
pub const LOW_STOCK_THRESHOLD: i32 = 5;
pub const DEFAULT_TREND_DAYS: i64 = 30;
pub const MAX_TREND_DAYS: i64 = 3650;

pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    midnight(now.date_naive())
}

/// Dimanche 00:00 de la semaine en cours
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    midnight(today - Duration::days(today.weekday().num_days_from_sunday() as i64))
}

pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    midnight(today.with_day(1).unwrap_or(today))
}

fn first_day(year: i32, month: u32) -> AppResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(midnight)
        .ok_or_else(|| AppError::validation(format!("Invalid period: {}-{}", year, month)))
}

/// Fenêtre du mois demandé, ou de l'année entière
pub fn period_window(year: i32, month: Option<u32>) -> AppResult<DateWindow> {
    match month {
        Some(m) if !(1..=12).contains(&m) => Err(AppError::validation("Month must be between 1 and 12")),
        Some(12) => Ok(DateWindow {
            start: first_day(year, 12)?,
            end: first_day(year + 1, 1)?,
        }),
        Some(m) => Ok(DateWindow {
            start: first_day(year, m)?,
            end: first_day(year, m + 1)?,
        }),
        None => Ok(DateWindow {
            start: first_day(year, 1)?,
            end: first_day(year + 1, 1)?,
        }),
    }
}

/// Période de comparaison et son libellé
pub fn previous_period(year: i32, month: Option<u32>) -> (i32, Option<u32>, &'static str) {
    match month {
        Some(1) => (year - 1, Some(12), "vs_previous_month"),
        Some(m) => (year, Some(m - 1), "vs_previous_month"),
        None => (year - 1, None, "vs_previous_year"),
    }
}

/// Part du total en %, arrondie à 2 décimales (0 si le total est nul)
pub fn percentage(part: Decimal, total: Decimal) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (part / total * Decimal::ONE_HUNDRED)
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

impl ReportService {
    pub fn new(reports: Arc<dyn ReportRepository>) -> Self {
        Self { reports }
    }

    pub async fn revenue_report(
        &self,
        year: i32,
        month: Option<u32>,
        now: DateTime<Utc>,
    ) -> AppResult<RevenueReport> {
        let window = period_window(year, month)?;

        let rows = self
            .reports
            .revenue_by_category(&window)
            .await
            .context("Failed to compute revenue by category")?;
        let (total_revenue, total_orders) = self
            .reports
            .revenue_and_orders(&window)
            .await
            .context("Failed to compute revenue")?;

        let revenue_by_category = rows
            .into_iter()
            .map(|row| CategoryRevenue {
                percentage_of_total: percentage(row.total_revenue, total_revenue),
                category_id: row.category_id,
                category_name: row.category_name,
                total_revenue: row.total_revenue,
            })
            .collect();

        let (prev_year, prev_month, comparison_type) = previous_period(year, month);
        let prev_window = period_window(prev_year, prev_month)?;
        let (prev_revenue, prev_orders) = self
            .reports
            .revenue_and_orders(&prev_window)
            .await
            .context("Failed to compute previous period revenue")?;

        Ok(RevenueReport {
            year,
            month,
            overall_total_revenue: total_revenue,
            overall_total_orders: total_orders,
            report_generated_at: now,
            revenue_by_category,
            comparison_type: comparison_type.to_string(),
            previous_period_data: PeriodSummary {
                year: prev_year,
                month: prev_month,
                overall_total_revenue: prev_revenue,
                overall_total_orders: prev_orders,
            },
        })
    }

    pub async fn dashboard_summary(&self, now: DateTime<Utc>) -> AppResult<DashboardSummary> {
        let window = |start| DateWindow { start, end: now };
        let month_start = start_of_month(now);

        let (today_revenue, today_orders) = self
            .reports
            .revenue_and_orders(&window(start_of_day(now)))
            .await
            .context("Failed to compute today's revenue")?;
        let (week_revenue, week_orders) = self
            .reports
            .revenue_and_orders(&window(start_of_week(now)))
            .await
            .context("Failed to compute week revenue")?;
        let (month_revenue, month_orders) = self
            .reports
            .revenue_and_orders(&window(month_start))
            .await
            .context("Failed to compute month revenue")?;

        let total_products = self
            .reports
            .count_products()
            .await
            .context("Failed to count products")?;
        let new_customers_this_month = self
            .reports
            .count_users_since(month_start)
            .await
            .context("Failed to count new customers")?;
        let pending_orders_count = self
            .reports
            .count_orders_with_status(OrderStatus::Pending)
            .await
            .context("Failed to count pending orders")?;
        let low_stock_items_count = self
            .reports
            .count_low_stock(LOW_STOCK_THRESHOLD)
            .await
            .context("Failed to count low stock items")?;

        Ok(DashboardSummary {
            today_revenue,
            today_orders,
            week_revenue,
            week_orders,
            month_revenue,
            month_orders,
            total_products,
            new_customers_this_month,
            pending_orders_count,
            low_stock_items_count,
        })
    }

    /// `days` <= 0 ou absent => 30 jours, au-delà de 3650 => 400
    pub async fn sales_trend(
        &self,
        period: Option<&str>,
        days: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TrendPoint>> {
        let period = period.unwrap_or("daily");
        let bucket = TrendBucket::parse(period)
            .ok_or_else(|| AppError::validation(format!("Invalid period: {}", period)))?;
        let days = days.filter(|d| *d > 0).unwrap_or(DEFAULT_TREND_DAYS);
        if days > MAX_TREND_DAYS {
            return Err(AppError::validation(format!(
                "days must be at most {}",
                MAX_TREND_DAYS
            )));
        }
        let since = Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .map(start_of_day)
            .ok_or_else(|| AppError::validation("Invalid days"))?;

        self.reports
            .sales_trend(bucket, since)
            .await
            .context("Failed to compute sales trend")
    }
}
