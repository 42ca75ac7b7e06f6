use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::*;

use crate::models::dto::{DateWindow, TrendPoint};
use crate::models::orders::{self, Entity as Orders, OrderStatus};
use crate::models::products::{self, Entity as Products};
use crate::models::users::{self, Entity as Users};
use super::{CategoryRevenueRow, ReportRepository, TrendBucket};

// Statuts qui comptent dans le CA (voir OrderStatus::is_revenue)
const REVENUE_STATUSES: &str = "('paid', 'shipped')";

pub struct SeaReportRepository {
    db: DatabaseConnection,
}

impl SeaReportRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct RevenueTotals {
    revenue: Decimal,
    order_count: i64,
}

#[async_trait]
impl ReportRepository for SeaReportRepository {
    async fn revenue_by_category(&self, window: &DateWindow) -> Result<Vec<CategoryRevenueRow>, DbErr> {
        // order_items.price est déjà le prix de ligne (unitaire x quantité)
        let sql = format!(
            r#"SELECT c.id AS category_id,
                      c.name AS category_name,
                      COALESCE(SUM(oi.price), 0) AS total_revenue
               FROM order_items oi
               JOIN orders o ON o.id = oi.order_id
               JOIN products p ON p.id = oi.product_id
               JOIN categories c ON c.id = p.category_id
               WHERE o.created_at >= $1 AND o.created_at < $2
                 AND o.status IN {}
               GROUP BY c.id, c.name
               ORDER BY total_revenue DESC, c.id"#,
            REVENUE_STATUSES
        );

        CategoryRevenueRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [window.start.into(), window.end.into()],
        ))
        .all(&self.db)
        .await
    }

    async fn revenue_and_orders(&self, window: &DateWindow) -> Result<(Decimal, u64), DbErr> {
        let sql = format!(
            r#"SELECT COALESCE(SUM(oi.price), 0) AS revenue,
                      COUNT(DISTINCT o.id) AS order_count
               FROM orders o
               LEFT JOIN order_items oi ON oi.order_id = o.id
               WHERE o.created_at >= $1 AND o.created_at < $2
                 AND o.status IN {}"#,
            REVENUE_STATUSES
        );

        let totals = RevenueTotals::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [window.start.into(), window.end.into()],
        ))
        .one(&self.db)
        .await?;

        Ok(totals
            .map(|t| (t.revenue, t.order_count.max(0) as u64))
            .unwrap_or((Decimal::ZERO, 0)))
    }

    async fn count_products(&self) -> Result<u64, DbErr> {
        Products::find()
            .filter(products::Column::DeletedAt.is_null())
            .count(&self.db)
            .await
    }

    async fn count_users_since(&self, since: DateTime<Utc>) -> Result<u64, DbErr> {
        Users::find()
            .filter(users::Column::CreatedAt.gte(since))
            .filter(users::Column::DeletedAt.is_null())
            .count(&self.db)
            .await
    }

    async fn count_orders_with_status(&self, status: OrderStatus) -> Result<u64, DbErr> {
        Orders::find()
            .filter(orders::Column::Status.eq(status))
            .count(&self.db)
            .await
    }

    async fn count_low_stock(&self, threshold: i32) -> Result<u64, DbErr> {
        Products::find()
            .filter(products::Column::Quantity.lte(threshold))
            .filter(products::Column::DeletedAt.is_null())
            .count(&self.db)
            .await
    }

    async fn sales_trend(&self, bucket: TrendBucket, since: DateTime<Utc>) -> Result<Vec<TrendPoint>, DbErr> {
        let sql = format!(
            r#"SELECT to_char(date_trunc('{unit}', o.created_at), 'YYYY-MM-DD') AS date,
                      COALESCE(SUM(oi.price), 0) AS revenue,
                      COUNT(DISTINCT o.id) AS order_count
               FROM orders o
               JOIN order_items oi ON oi.order_id = o.id
               WHERE o.created_at >= $1
                 AND o.status IN {statuses}
               GROUP BY 1
               ORDER BY 1"#,
            unit = bucket.sql_unit(),
            statuses = REVENUE_STATUSES
        );

        TrendPoint::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [since.into()],
        ))
        .all(&self.db)
        .await
    }
}
