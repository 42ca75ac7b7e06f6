use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::models::dto::{OrderItemView, OrderView, PageRequest};
use crate::models::order_items::{self, Entity as OrderItems};
use crate::models::orders::{self, Entity as Orders, OrderStatus};
use crate::models::products::{self, Entity as Products};
use super::{OrderDraft, OrderRepository, OrderTransaction, PricedLine};

pub struct SeaOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Charge les lignes (avec produit) d'une liste de commandes
    async fn with_items(&self, list: Vec<orders::Model>) -> Result<Vec<OrderView>, DbErr> {
        if list.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = list.iter().map(|o| o.id).collect();
        let mut items: HashMap<i32, Vec<OrderItemView>> = HashMap::new();
        for (item, product) in OrderItems::find()
            .filter(order_items::Column::OrderId.is_in(ids))
            .order_by_asc(order_items::Column::Id)
            .find_also_related(Products)
            .all(&self.db)
            .await?
        {
            items
                .entry(item.order_id)
                .or_default()
                .push(OrderItemView { item, product });
        }

        Ok(list
            .into_iter()
            .map(|order| OrderView {
                order_items: items.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

/// Colonnes autorisées pour le tri (GET /admin/orders)
fn sort_column(sort: &str) -> orders::Column {
    match sort {
        "id" => orders::Column::Id,
        "totalprice" => orders::Column::TotalPrice,
        "status" => orders::Column::Status,
        _ => orders::Column::CreatedAt,
    }
}

fn header_update(order: orders::Model) -> orders::ActiveModel {
    let mut active: orders::ActiveModel = order.clone().into();
    active.total_price = Set(order.total_price);
    active.status = Set(order.status);
    active.payment_method = Set(order.payment_method);
    active.address_id = Set(order.address_id);
    active.paid_at = Set(order.paid_at);
    active.updated_at = Set(Utc::now());
    active
}

#[async_trait]
impl OrderRepository for SeaOrderRepository {
    async fn find_pending_for_user(&self, user_id: i32) -> Result<Option<orders::Model>, DbErr> {
        Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .order_by_desc(orders::Column::Id)
            .one(&self.db)
            .await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<OrderView>, DbErr> {
        match Orders::find_by_id(id).one(&self.db).await? {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, DbErr> {
        let mut query = Orders::find().filter(orders::Column::UserId.eq(user_id));
        if let Some(status) = status {
            query = query.filter(orders::Column::Status.eq(status));
        }

        let list = query
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?;
        self.with_items(list).await
    }

    async fn list_all(&self, page: &PageRequest) -> Result<(Vec<OrderView>, u64), DbErr> {
        let total = Orders::find().count(&self.db).await?;

        let order = if page.descending { Order::Desc } else { Order::Asc };
        let list = Orders::find()
            .order_by(sort_column(&page.sort), order)
            .order_by_asc(orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok((self.with_items(list).await?, total))
    }

    async fn update_header(&self, order: orders::Model) -> Result<orders::Model, DbErr> {
        header_update(order).update(&self.db).await
    }

    async fn delete(&self, id: i32) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;

        OrderItems::delete_many()
            .filter(order_items::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        Orders::delete_by_id(id).exec(&txn).await?;

        txn.commit().await
    }

    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, DbErr> {
        let txn = self.db.begin().await?;
        Ok(Box::new(SeaOrderTransaction { txn }))
    }
}

/// Transaction SeaORM: rollback automatique si droppée sans commit
pub struct SeaOrderTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl OrderTransaction for SeaOrderTransaction {
    async fn lock_product(&mut self, id: i32) -> Result<Option<products::Model>, DbErr> {
        Products::find_by_id(id)
            .filter(products::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(&self.txn)
            .await
    }

    async fn set_stock(&mut self, product_id: i32, quantity: i32) -> Result<(), DbErr> {
        Products::update_many()
            .col_expr(products::Column::Quantity, Expr::value(quantity))
            .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(products::Column::Id.eq(product_id))
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    async fn delete_items(&mut self, order_id: i32) -> Result<(), DbErr> {
        OrderItems::delete_many()
            .filter(order_items::Column::OrderId.eq(order_id))
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    async fn insert_order(&mut self, draft: OrderDraft) -> Result<orders::Model, DbErr> {
        let now = Utc::now();
        orders::ActiveModel {
            user_id: Set(draft.user_id),
            total_price: Set(draft.total_price),
            status: Set(draft.status),
            payment_method: Set(draft.payment_method),
            address_id: Set(draft.address_id),
            paid_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
    }

    async fn update_order(&mut self, order: orders::Model) -> Result<orders::Model, DbErr> {
        header_update(order).update(&self.txn).await
    }

    async fn insert_items(&mut self, order_id: i32, lines: &[PricedLine]) -> Result<(), DbErr> {
        if lines.is_empty() {
            return Ok(());
        }

        let models = lines.iter().map(|line| order_items::ActiveModel {
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            ..Default::default()
        });
        OrderItems::insert_many(models).exec(&self.txn).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbErr> {
        self.txn.commit().await
    }
}
