// ============================================================================
// MODÈLE : ORDERS
// ============================================================================
//
// Colonnes de la table orders:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - user_id (INTEGER, NOT NULL, FK vers users)
//   - total_price (NUMERIC(12,2)) - somme des prix de ligne
//   - status (VARCHAR(16)) - pending | paid | canceled | shipped
//   - payment_method (VARCHAR) - cod | bank_transfer
//   - address_id (INTEGER, NULL) - adresse de livraison
//   - paid_at (TIMESTAMPTZ, NULL)
//   - created_at / updated_at (TIMESTAMPTZ)
//
// Cycle de vie:
//   pending -> paid      (PUT /order/pay)
//   pending -> canceled  (PUT /order/cancel)
//   paid    -> shipped   (PUT /admin/order/{id}/ship)
//   canceled et shipped sont terminaux.
//
// Points d'attention:
//   - Au plus UNE commande pending par user: un nouveau checkout réécrit
//     les lignes de la commande pending existante
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "canceled")]
    Canceled,
    #[sea_orm(string_value = "shipped")]
    Shipped,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Shipped => "shipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "canceled" | "cancelled" => Some(OrderStatus::Canceled),
            "shipped" => Some(OrderStatus::Shipped),
            _ => None,
        }
    }

    /// Transitions autorisées entre statuts
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Paid) => true,
            (OrderStatus::Pending, OrderStatus::Canceled) => true,
            (OrderStatus::Paid, OrderStatus::Shipped) => true,
            (OrderStatus::Pending, _)
            | (OrderStatus::Paid, _)
            | (OrderStatus::Canceled, _)
            | (OrderStatus::Shipped, _) => false,
        }
    }

    /// Statuts dont le montant compte dans le chiffre d'affaires
    pub fn is_revenue(self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Shipped)
    }
}

/// Moyens de paiement acceptés au checkout
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cod" => Some(PaymentMethod::Cod),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub payment_method: String,
    pub address_id: Option<i32>,
    pub paid_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
