// ============================================================================
// MODÈLE : PASSWORD RESET TOKENS
// ============================================================================
//
// Colonnes de la table password_reset_tokens:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - user_id (INTEGER, NOT NULL, FK vers users)
//   - token (VARCHAR, UNIQUE, NOT NULL) - UUID v4
//   - expires_at (TIMESTAMPTZ, NOT NULL) - created_at + 1 heure
//   - created_at (TIMESTAMPTZ, NOT NULL)
//
// Workflow:
//   1. User demande reset via POST /forgot-password
//   2. Backend génère un token UUID v4 et l'insère dans cette table
//   3. Backend envoie email avec lien contenant le token
//   4. Frontend envoie POST /reset-password avec token + nouveau password
//   5. Backend vérifie: token existe, not expired
//   6. Backend change le password et SUPPRIME le token (usage unique)
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_reset_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_expired(&self, now: DateTimeUtc) -> bool {
        now >= self.expires_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
