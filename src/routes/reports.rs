use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::errors::AppError;
use crate::middleware::AdminUser;
use crate::models::dto::{RevenueQuery, TrendQuery};
use crate::services::ReportService;

/// GET /admin/reports/revenue?year=2024&month=5
/// Sans `month`: rapport annuel comparé à l'année précédente
#[get("/revenue")]
pub async fn revenue(
    _admin: AdminUser,
    query: web::Query<RevenueQuery>,
    reports: web::Data<ReportService>,
) -> Result<HttpResponse, AppError> {
    let report = reports
        .revenue_report(query.year, query.month, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/dashboard-summary")]
pub async fn dashboard_summary(
    _admin: AdminUser,
    reports: web::Data<ReportService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(reports.dashboard_summary(Utc::now()).await?))
}

/// GET /admin/reports/sales-trend?period=daily|weekly|monthly&days=30
#[get("/sales-trend")]
pub async fn sales_trend(
    _admin: AdminUser,
    query: web::Query<TrendQuery>,
    reports: web::Data<ReportService>,
) -> Result<HttpResponse, AppError> {
    let points = reports
        .sales_trend(query.period.as_deref(), query.days, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(points))
}

/// Enregistrées dans le scope /admin/reports
pub fn report_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(revenue)
        .service(dashboard_summary)
        .service(sales_trend);
}
