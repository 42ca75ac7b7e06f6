use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;

use crate::models::categories::{self, Entity as Categories};
use crate::models::dto::{NewCategory, NewProduct, ProductFilter, ProductView};
use crate::models::product_images::{self, Entity as ProductImages};
use crate::models::products::{self, Entity as Products};
use super::ProductRepository;

pub struct SeaProductRepository {
    db: DatabaseConnection,
}

impl SeaProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Charge les images et catégories d'une liste de produits (2 requêtes)
    async fn with_relations(&self, items: Vec<products::Model>) -> Result<Vec<ProductView>, DbErr> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<i32> = items.iter().map(|p| p.id).collect();
        let category_ids: Vec<i32> = items.iter().map(|p| p.category_id).collect();

        let mut images: HashMap<i32, Vec<product_images::Model>> = HashMap::new();
        for image in ProductImages::find()
            .filter(product_images::Column::ProductId.is_in(product_ids))
            .order_by_asc(product_images::Column::Id)
            .all(&self.db)
            .await?
        {
            images.entry(image.product_id).or_default().push(image);
        }

        let categories: HashMap<i32, categories::Model> = Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(items
            .into_iter()
            .map(|product| ProductView {
                images: images.remove(&product.id).unwrap_or_default(),
                category: categories.get(&product.category_id).cloned(),
                product,
            })
            .collect())
    }
}

/// Colonnes autorisées pour le tri
fn sort_column(sort: &str) -> products::Column {
    match sort {
        "id" => products::Column::Id,
        "name" => products::Column::Name,
        "price" => products::Column::Price,
        "updatedat" => products::Column::UpdatedAt,
        _ => products::Column::CreatedAt,
    }
}

#[async_trait]
impl ProductRepository for SeaProductRepository {
    async fn create_product(&self, input: NewProduct) -> Result<products::Model, DbErr> {
        let now = Utc::now();
        products::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            quantity: Set(input.quantity),
            category_id: Set(input.category_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn add_images(&self, product_id: i32, paths: &[String]) -> Result<Vec<product_images::Model>, DbErr> {
        let mut saved = Vec::with_capacity(paths.len());
        for path in paths {
            let image = product_images::ActiveModel {
                product_id: Set(product_id),
                path: Set(path.clone()),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
            saved.push(image);
        }
        Ok(saved)
    }

    async fn find_product(&self, id: i32) -> Result<Option<ProductView>, DbErr> {
        let product = Products::find_by_id(id)
            .filter(products::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        match product {
            Some(p) => Ok(self.with_relations(vec![p]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ProductView>, DbErr> {
        let product = Products::find()
            .filter(products::Column::Name.eq(name))
            .filter(products::Column::DeletedAt.is_null())
            .order_by_asc(products::Column::Id)
            .one(&self.db)
            .await?;

        match product {
            Some(p) => Ok(self.with_relations(vec![p]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_name_and_category(
        &self,
        name: &str,
        category_id: i32,
    ) -> Result<Option<products::Model>, DbErr> {
        Products::find()
            .filter(products::Column::Name.eq(name))
            .filter(products::Column::CategoryId.eq(category_id))
            .filter(products::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
    }

    async fn update_product(&self, product: products::Model) -> Result<products::Model, DbErr> {
        let mut active: products::ActiveModel = product.clone().into();
        active.name = Set(product.name);
        active.description = Set(product.description);
        active.price = Set(product.price);
        active.quantity = Set(product.quantity);
        active.category_id = Set(product.category_id);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await
    }

    async fn soft_delete_product(&self, id: i32) -> Result<(), DbErr> {
        let now = Utc::now();
        Products::update_many()
            .col_expr(products::Column::DeletedAt, Expr::value(now))
            .col_expr(products::Column::UpdatedAt, Expr::value(now))
            .filter(products::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<ProductView>, DbErr> {
        let items = Products::find()
            .filter(products::Column::DeletedAt.is_null())
            .order_by_asc(products::Column::Id)
            .all(&self.db)
            .await?;
        self.with_relations(items).await
    }

    async fn search_products(&self, filter: &ProductFilter) -> Result<(Vec<ProductView>, u64), DbErr> {
        let mut query = Products::find().filter(products::Column::DeletedAt.is_null());

        if let Some(category_id) = filter.category_id {
            query = query.filter(products::Column::CategoryId.eq(category_id));
        }

        // Recherche insensible à la casse sur nom et description
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(products::Column::Name))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(products::Column::Description))).like(pattern)),
            );
        }

        if let Some(min) = filter.min_price {
            query = query.filter(products::Column::Price.gte(min));
        }
        if let Some(max) = filter.max_price {
            query = query.filter(products::Column::Price.lte(max));
        }

        let total = query.clone().count(&self.db).await?;

        let order = if filter.page.descending { Order::Desc } else { Order::Asc };
        let items = query
            .order_by(sort_column(&filter.page.sort), order)
            .order_by_asc(products::Column::Id)
            .offset(filter.page.offset())
            .limit(filter.page.limit)
            .all(&self.db)
            .await?;

        Ok((self.with_relations(items).await?, total))
    }

    async fn create_category(&self, input: NewCategory) -> Result<categories::Model, DbErr> {
        categories::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn find_category(&self, id: i32) -> Result<Option<categories::Model>, DbErr> {
        Categories::find_by_id(id).one(&self.db).await
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<categories::Model>, DbErr> {
        Categories::find()
            .filter(categories::Column::Name.eq(name))
            .one(&self.db)
            .await
    }

    async fn list_categories(&self) -> Result<Vec<categories::Model>, DbErr> {
        Categories::find()
            .order_by_asc(categories::Column::Id)
            .all(&self.db)
            .await
    }
}
