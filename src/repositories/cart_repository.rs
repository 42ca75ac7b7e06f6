use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::*;

use crate::models::cart_items::{self, Entity as CartItems};
use crate::models::carts::{self, Entity as Carts};
use crate::models::dto::CartLine;
use crate::models::products::Entity as Products;
use super::CartRepository;

pub struct SeaCartRepository {
    db: DatabaseConnection,
}

impl SeaCartRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CartRepository for SeaCartRepository {
    async fn get_or_create(&self, user_id: i32) -> Result<carts::Model, DbErr> {
        let existing = Carts::find()
            .filter(carts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        match existing {
            Some(cart) => Ok(cart),
            None => {
                carts::ActiveModel {
                    user_id: Set(user_id),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&self.db)
                .await
            }
        }
    }

    async fn lines(&self, cart_id: i32) -> Result<Vec<CartLine>, DbErr> {
        let rows = CartItems::find()
            .filter(cart_items::Column::CartId.eq(cart_id))
            .order_by_asc(cart_items::Column::CreatedAt)
            .order_by_asc(cart_items::Column::Id)
            .find_also_related(Products)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(item, product)| CartLine { item, product })
            .collect())
    }

    async fn find_item(&self, cart_id: i32, product_id: i32) -> Result<Option<cart_items::Model>, DbErr> {
        CartItems::find()
            .filter(cart_items::Column::CartId.eq(cart_id))
            .filter(cart_items::Column::ProductId.eq(product_id))
            .one(&self.db)
            .await
    }

    async fn insert_item(
        &self,
        cart_id: i32,
        product_id: i32,
        quantity: i32,
        price: Decimal,
    ) -> Result<cart_items::Model, DbErr> {
        cart_items::ActiveModel {
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            price: Set(price),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn update_item(&self, item: cart_items::Model) -> Result<cart_items::Model, DbErr> {
        let mut active: cart_items::ActiveModel = item.clone().into();
        active.quantity = Set(item.quantity);
        active.price = Set(item.price);
        active.update(&self.db).await
    }

    async fn delete_item(&self, item_id: i32) -> Result<(), DbErr> {
        CartItems::delete_by_id(item_id).exec(&self.db).await?;
        Ok(())
    }

    async fn clear(&self, user_id: i32) -> Result<(), DbErr> {
        let cart = Carts::find()
            .filter(carts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        if let Some(cart) = cart {
            CartItems::delete_many()
                .filter(cart_items::Column::CartId.eq(cart.id))
                .exec(&self.db)
                .await?;
        }
        Ok(())
    }
}
