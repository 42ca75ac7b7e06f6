use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

use crate::errors::AppError;
use crate::models::users::Role;

/// Durée de validité d'un token (et du cookie JWT)
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub exp: i64, // expiration timestamp
}

/// Clés HS256 construites une fois au démarrage à partir de JWT_SECRET,
/// partagées via web::Data
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Génère un JWT token pour un utilisateur
    pub fn generate_token(&self, user_id: i32, email: &str, role: Role) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
            .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
            .timestamp();

        let claims = Claims {
            user_id,
            email: email.to_string(),
            role: role.as_str().to_string(),
            exp: expiration,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Vérifie et décode un JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}
