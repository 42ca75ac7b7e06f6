use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::models::dto::PageRequest;
use crate::models::password_reset_tokens::{self, Entity as ResetTokens};
use crate::models::users::{self, Entity as Users};
use super::{NewUser, UserRepository};

pub struct SeaUserRepository {
    db: DatabaseConnection,
}

impl SeaUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Colonnes autorisées pour le tri (GET /admin/getall)
fn sort_column(sort: &str) -> users::Column {
    match sort {
        "id" => users::Column::Id,
        "email" => users::Column::Email,
        "updatedat" => users::Column::UpdatedAt,
        _ => users::Column::CreatedAt,
    }
}

#[async_trait]
impl UserRepository for SeaUserRepository {
    async fn create(&self, input: NewUser) -> Result<users::Model, DbErr> {
        let now = Utc::now();
        users::ActiveModel {
            email: Set(input.email),
            password_hash: Set(input.password_hash),
            role: Set(input.role),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        Users::find_by_id(id)
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = Users::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn update(&self, user: users::Model) -> Result<users::Model, DbErr> {
        let mut active: users::ActiveModel = user.clone().into();
        active.email = Set(user.email);
        active.password_hash = Set(user.password_hash);
        active.role = Set(user.role);
        active.first_name = Set(user.first_name);
        active.last_name = Set(user.last_name);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await
    }

    async fn soft_delete(&self, id: i32) -> Result<(), DbErr> {
        let now = Utc::now();
        Users::update_many()
            .col_expr(users::Column::DeletedAt, Expr::value(now))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn list(&self, page: &PageRequest) -> Result<(Vec<users::Model>, u64), DbErr> {
        let query = Users::find().filter(users::Column::DeletedAt.is_null());
        let total = query.clone().count(&self.db).await?;

        let order = if page.descending { Order::Desc } else { Order::Asc };
        let users = query
            .order_by(sort_column(&page.sort), order)
            .offset(page.offset())
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok((users, total))
    }

    async fn count_active(&self) -> Result<u64, DbErr> {
        Users::find()
            .filter(users::Column::DeletedAt.is_null())
            .count(&self.db)
            .await
    }

    async fn save_reset_token(
        &self,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.to_string()),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> Result<Option<password_reset_tokens::Model>, DbErr> {
        ResetTokens::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .one(&self.db)
            .await
    }

    async fn delete_reset_token(&self, token: &str) -> Result<(), DbErr> {
        ResetTokens::delete_many()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
