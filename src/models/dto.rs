// ============================================================================
// DTO - REQUÊTES ET RÉPONSES DE L'API
// ============================================================================
//
// Regroupe les structures échangées en JSON avec le frontend, ainsi que les
// vues composées (produit + images + catégorie, commande + lignes, etc.)
// renvoyées par les services.
//
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    addresses, cart_items, categories, order_items, orders, product_images, products,
    users::{self, Role},
};

// ----------------------------------------------------------------------------
// Pagination
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl PageQuery {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit, self.sort.as_deref(), self.order.as_deref())
    }
}

/// Taille de page maximale acceptée
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Pagination normalisée: page >= 1, 1 <= limit <= 100, tri en minuscules sans '_'
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub sort: String,
    pub descending: bool,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, sort: Option<&str>, order: Option<&str>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };
        let limit = match limit {
            Some(l) if l >= 1 => (l as u64).min(MAX_PAGE_LIMIT),
            _ => 10,
        };
        let sort = sort.unwrap_or("createdat").to_lowercase().replace('_', "");
        let descending = order.map(|o| o.eq_ignore_ascii_case("desc")).unwrap_or(false);

        Self { page, limit, sort, descending }
    }

    /// Borné à i64::MAX (OFFSET Postgres est un bigint)
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub current_page: u64,
    pub items: Vec<T>,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: u64, page: &PageRequest) -> Self {
        Self {
            current_page: page.page,
            items,
            per_page: page.limit,
            total_items,
            total_pages: total_items.div_ceil(page.limit),
        }
    }
}

// ----------------------------------------------------------------------------
// Utilisateurs / Auth
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_address: Option<addresses::Model>,
}

impl UserResponse {
    pub fn from_user(user: users::Model, default_address: Option<addresses::Model>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            default_address,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: String,
    // Pris en compte seulement par la route admin
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

// ----------------------------------------------------------------------------
// Adresses
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "addressLine1")]
    #[validate(length(min = 1))]
    pub address_line1: String,
    #[serde(rename = "addressLine2", default)]
    pub address_line2: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub zip_code: String,
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

// ----------------------------------------------------------------------------
// Catalogue
// ----------------------------------------------------------------------------

/// Produit avec ses images et sa catégorie
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: products::Model,
    pub images: Vec<product_images::Model>,
    pub category: Option<categories::Model>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Résultat d'une création en masse: créés + messages pour les doublons ignorés
#[derive(Debug, Serialize)]
pub struct BulkCreateResult<T> {
    pub created: Vec<T>,
    pub skipped: Vec<String>,
}

/// Query string de GET /api/products (prix en flottants comme le frontend les envoie)
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
}

impl ProductListQuery {
    pub fn to_filter(&self, category_id: Option<i32>) -> ProductFilter {
        // Un prix <= 0 désactive le filtre
        let price = |value: Option<f64>| {
            value
                .filter(|v| *v > 0.0)
                .and_then(Decimal::from_f64_retain)
        };

        ProductFilter {
            page: PageRequest::new(self.page, self.limit, self.sort.as_deref(), self.order.as_deref()),
            min_price: price(self.min_price),
            max_price: price(self.max_price),
            search: self
                .search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            category_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub page: PageRequest,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub category_id: Option<i32>,
}

// ----------------------------------------------------------------------------
// Panier
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CartItemInput {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: cart_items::Model,
    pub product: Option<products::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: i32,
    pub user_id: i32,
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address_id: Option<i32>,
    pub payment_method: String,
}

// ----------------------------------------------------------------------------
// Commandes
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i32,
    pub quantity: i32,
}

/// Commande à créer (le prix est toujours recalculé depuis le produit)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub items: Vec<OrderLine>,
    pub payment_method: orders::PaymentMethod,
    pub address_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderLine>,
    pub payment_method: Option<String>,
    pub address_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderLine>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderStatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: order_items::Model,
    pub product: Option<products::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: orders::Model,
    pub order_items: Vec<OrderItemView>,
}

// ----------------------------------------------------------------------------
// Rapports
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub year: i32,
    pub month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub period: Option<String>,
    pub days: Option<i64>,
}

/// Intervalle [start, end)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRevenue {
    pub category_id: i32,
    pub category_name: String,
    pub total_revenue: Decimal,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub year: i32,
    pub month: Option<u32>,
    pub overall_total_revenue: Decimal,
    pub overall_total_orders: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub year: i32,
    pub month: Option<u32>,
    pub overall_total_revenue: Decimal,
    pub overall_total_orders: u64,
    pub report_generated_at: DateTime<Utc>,
    pub revenue_by_category: Vec<CategoryRevenue>,
    pub comparison_type: String,
    pub previous_period_data: PeriodSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub today_revenue: Decimal,
    pub today_orders: u64,
    pub week_revenue: Decimal,
    pub week_orders: u64,
    pub month_revenue: Decimal,
    pub month_orders: u64,
    pub total_products: u64,
    pub new_customers_this_month: u64,
    pub pending_orders_count: u64,
    pub low_stock_items_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sea_orm::FromQueryResult)]
pub struct TrendPoint {
    pub date: String,
    pub revenue: Decimal,
    pub order_count: i64,
}
