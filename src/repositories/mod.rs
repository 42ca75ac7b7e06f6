// ============================================================================
// REPOSITORIES - ACCÈS AUX DONNÉES
// ============================================================================
//
// Un trait par agrégat, implémenté avec SeaORM (Postgres). Les services ne
// dépendent que des traits: les tests utilisent MemoryStore à la place.
//
// Les repositories renvoient DbErr tel quel, c'est le service qui ajoute le
// contexte métier.
//
// ============================================================================

pub mod user_repository;
pub mod address_repository;
pub mod product_repository;
pub mod cart_repository;
pub mod order_repository;
pub mod report_repository;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DbErr, FromQueryResult};

use crate::models::{
    addresses, cart_items, carts, categories, orders::{self, OrderStatus}, password_reset_tokens,
    product_images, products, users::{self, Role},
};
use crate::models::dto::{
    CartLine, DateWindow, NewCategory, NewProduct, OrderView, PageRequest, ProductFilter,
    ProductView, TrendPoint,
};

pub use address_repository::SeaAddressRepository;
pub use cart_repository::SeaCartRepository;
pub use order_repository::SeaOrderRepository;
pub use product_repository::SeaProductRepository;
pub use report_repository::SeaReportRepository;
pub use user_repository::SeaUserRepository;

// ----------------------------------------------------------------------------
// Entrées
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub user_id: i32,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub province: String,
    pub zip_code: String,
    pub country: String,
    pub is_default: bool,
}

/// En-tête d'une nouvelle commande (les lignes sont insérées à part)
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: i32,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub payment_method: String,
    pub address_id: Option<i32>,
}

/// Ligne de commande avec son prix de ligne figé
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: i32,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct CategoryRevenueRow {
    pub category_id: i32,
    pub category_name: String,
    pub total_revenue: Decimal,
}

/// Granularité du graphique de ventes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBucket {
    Daily,
    Weekly,
    Monthly,
}

impl TrendBucket {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "daily" => Some(TrendBucket::Daily),
            "weekly" => Some(TrendBucket::Weekly),
            "monthly" => Some(TrendBucket::Monthly),
            _ => None,
        }
    }

    /// Unité passée à date_trunc
    pub fn sql_unit(&self) -> &'static str {
        match self {
            TrendBucket::Daily => "day",
            TrendBucket::Weekly => "week",
            TrendBucket::Monthly => "month",
        }
    }
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, input: NewUser) -> Result<users::Model, DbErr>;
    /// Utilisateur actif (non supprimé)
    async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr>;
    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr>;
    /// Inclut les comptes supprimés: l'email reste unique en base
    async fn email_exists(&self, email: &str) -> Result<bool, DbErr>;
    async fn update(&self, user: users::Model) -> Result<users::Model, DbErr>;
    async fn soft_delete(&self, id: i32) -> Result<(), DbErr>;
    async fn list(&self, page: &PageRequest) -> Result<(Vec<users::Model>, u64), DbErr>;
    async fn count_active(&self) -> Result<u64, DbErr>;

    async fn save_reset_token(
        &self,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbErr>;
    async fn find_reset_token(&self, token: &str) -> Result<Option<password_reset_tokens::Model>, DbErr>;
    async fn delete_reset_token(&self, token: &str) -> Result<(), DbErr>;
}

#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn create(&self, input: NewAddress) -> Result<addresses::Model, DbErr>;
    async fn find_by_id(&self, id: i32) -> Result<Option<addresses::Model>, DbErr>;
    async fn update(&self, address: addresses::Model) -> Result<addresses::Model, DbErr>;
    async fn delete(&self, id: i32) -> Result<(), DbErr>;
    async fn unset_default(&self, user_id: i32) -> Result<(), DbErr>;
    /// Adresse la plus récente de l'utilisateur
    async fn latest_for_user(&self, user_id: i32) -> Result<Option<addresses::Model>, DbErr>;
    async fn has_default(&self, user_id: i32) -> Result<bool, DbErr>;
    async fn find_default(&self, user_id: i32) -> Result<Option<addresses::Model>, DbErr>;
    /// Adresse par défaut d'abord, puis de la plus récente à la plus ancienne
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<addresses::Model>, DbErr>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, input: NewProduct) -> Result<products::Model, DbErr>;
    async fn add_images(&self, product_id: i32, paths: &[String]) -> Result<Vec<product_images::Model>, DbErr>;
    async fn find_product(&self, id: i32) -> Result<Option<ProductView>, DbErr>;
    async fn find_by_name(&self, name: &str) -> Result<Option<ProductView>, DbErr>;
    async fn find_by_name_and_category(
        &self,
        name: &str,
        category_id: i32,
    ) -> Result<Option<products::Model>, DbErr>;
    async fn update_product(&self, product: products::Model) -> Result<products::Model, DbErr>;
    async fn soft_delete_product(&self, id: i32) -> Result<(), DbErr>;
    async fn list_products(&self) -> Result<Vec<ProductView>, DbErr>;
    async fn search_products(&self, filter: &ProductFilter) -> Result<(Vec<ProductView>, u64), DbErr>;

    async fn create_category(&self, input: NewCategory) -> Result<categories::Model, DbErr>;
    async fn find_category(&self, id: i32) -> Result<Option<categories::Model>, DbErr>;
    async fn find_category_by_name(&self, name: &str) -> Result<Option<categories::Model>, DbErr>;
    async fn list_categories(&self) -> Result<Vec<categories::Model>, DbErr>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Le panier est créé au premier accès
    async fn get_or_create(&self, user_id: i32) -> Result<carts::Model, DbErr>;
    /// Lignes triées par date d'ajout
    async fn lines(&self, cart_id: i32) -> Result<Vec<CartLine>, DbErr>;
    async fn find_item(&self, cart_id: i32, product_id: i32) -> Result<Option<cart_items::Model>, DbErr>;
    async fn insert_item(
        &self,
        cart_id: i32,
        product_id: i32,
        quantity: i32,
        price: Decimal,
    ) -> Result<cart_items::Model, DbErr>;
    async fn update_item(&self, item: cart_items::Model) -> Result<cart_items::Model, DbErr>;
    async fn delete_item(&self, item_id: i32) -> Result<(), DbErr>;
    async fn clear(&self, user_id: i32) -> Result<(), DbErr>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_pending_for_user(&self, user_id: i32) -> Result<Option<orders::Model>, DbErr>;
    async fn find_by_id(&self, id: i32) -> Result<Option<OrderView>, DbErr>;
    /// Commandes de l'utilisateur, plus récentes d'abord
    async fn list_for_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, DbErr>;
    async fn list_all(&self, page: &PageRequest) -> Result<(Vec<OrderView>, u64), DbErr>;
    /// Met à jour l'en-tête seulement, les lignes ne sont pas touchées
    async fn update_header(&self, order: orders::Model) -> Result<orders::Model, DbErr>;
    /// Supprime les lignes puis la commande dans une transaction
    async fn delete(&self, id: i32) -> Result<(), DbErr>;
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, DbErr>;
}

/// Transaction de création/modification de commande.
/// Sans appel à commit(), tout est annulé quand la transaction est droppée.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Lit le produit en le verrouillant (SELECT ... FOR UPDATE)
    async fn lock_product(&mut self, id: i32) -> Result<Option<products::Model>, DbErr>;
    async fn set_stock(&mut self, product_id: i32, quantity: i32) -> Result<(), DbErr>;
    async fn delete_items(&mut self, order_id: i32) -> Result<(), DbErr>;
    async fn insert_order(&mut self, draft: OrderDraft) -> Result<orders::Model, DbErr>;
    async fn update_order(&mut self, order: orders::Model) -> Result<orders::Model, DbErr>;
    async fn insert_items(&mut self, order_id: i32, lines: &[PricedLine]) -> Result<(), DbErr>;
    async fn commit(self: Box<Self>) -> Result<(), DbErr>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// CA par catégorie sur la fenêtre (commandes payées/expédiées)
    async fn revenue_by_category(&self, window: &DateWindow) -> Result<Vec<CategoryRevenueRow>, DbErr>;
    /// (CA, nombre de commandes) sur la fenêtre
    async fn revenue_and_orders(&self, window: &DateWindow) -> Result<(Decimal, u64), DbErr>;
    async fn count_products(&self) -> Result<u64, DbErr>;
    async fn count_users_since(&self, since: DateTime<Utc>) -> Result<u64, DbErr>;
    async fn count_orders_with_status(&self, status: OrderStatus) -> Result<u64, DbErr>;
    async fn count_low_stock(&self, threshold: i32) -> Result<u64, DbErr>;
    async fn sales_trend(&self, bucket: TrendBucket, since: DateTime<Utc>) -> Result<Vec<TrendPoint>, DbErr>;
}
