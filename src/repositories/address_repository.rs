use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::models::addresses::{self, Entity as Addresses};
use super::{AddressRepository, NewAddress};

pub struct SeaAddressRepository {
    db: DatabaseConnection,
}

impl SeaAddressRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AddressRepository for SeaAddressRepository {
    async fn create(&self, input: NewAddress) -> Result<addresses::Model, DbErr> {
        addresses::ActiveModel {
            user_id: Set(input.user_id),
            full_name: Set(input.full_name),
            phone: Set(input.phone),
            address_line1: Set(input.address_line1),
            address_line2: Set(input.address_line2),
            city: Set(input.city),
            province: Set(input.province),
            zip_code: Set(input.zip_code),
            country: Set(input.country),
            is_default: Set(input.is_default),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<addresses::Model>, DbErr> {
        Addresses::find_by_id(id).one(&self.db).await
    }

    async fn update(&self, address: addresses::Model) -> Result<addresses::Model, DbErr> {
        let mut active: addresses::ActiveModel = address.clone().into();
        active.full_name = Set(address.full_name);
        active.phone = Set(address.phone);
        active.address_line1 = Set(address.address_line1);
        active.address_line2 = Set(address.address_line2);
        active.city = Set(address.city);
        active.province = Set(address.province);
        active.zip_code = Set(address.zip_code);
        active.country = Set(address.country);
        active.is_default = Set(address.is_default);
        active.update(&self.db).await
    }

    async fn delete(&self, id: i32) -> Result<(), DbErr> {
        Addresses::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn unset_default(&self, user_id: i32) -> Result<(), DbErr> {
        Addresses::update_many()
            .col_expr(addresses::Column::IsDefault, Expr::value(false))
            .filter(addresses::Column::UserId.eq(user_id))
            .filter(addresses::Column::IsDefault.eq(true))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn latest_for_user(&self, user_id: i32) -> Result<Option<addresses::Model>, DbErr> {
        Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .order_by_desc(addresses::Column::CreatedAt)
            .order_by_desc(addresses::Column::Id)
            .one(&self.db)
            .await
    }

    async fn has_default(&self, user_id: i32) -> Result<bool, DbErr> {
        let count = Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .filter(addresses::Column::IsDefault.eq(true))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn find_default(&self, user_id: i32) -> Result<Option<addresses::Model>, DbErr> {
        Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .filter(addresses::Column::IsDefault.eq(true))
            .one(&self.db)
            .await
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<addresses::Model>, DbErr> {
        Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .order_by_desc(addresses::Column::IsDefault)
            .order_by_desc(addresses::Column::CreatedAt)
            .order_by_desc(addresses::Column::Id)
            .all(&self.db)
            .await
    }
}
