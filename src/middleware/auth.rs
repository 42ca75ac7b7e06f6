use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::users::Role;
use crate::utils::jwt::JwtKeys;

/// Nom du cookie posé au login
pub const AUTH_COOKIE: &str = "JWT";

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Même chose qu'AuthUser mais refuse tout rôle autre que admin (403)
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Cherche le token: header Authorization d'abord, puis le cookie JWT
fn extract_token(req: &HttpRequest) -> Result<String, AppError> {
    if let Some(header) = req.headers().get("Authorization") {
        let auth_str = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

        // Format: "Bearer <token>"
        return match auth_str.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(AppError::Unauthorized(
                "Invalid Authorization format (expected: Bearer <token>)".to_string(),
            )),
        };
    }

    match req.cookie(AUTH_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => Ok(cookie.value().to_string()),
        _ => Err(AppError::Unauthorized("Missing authentication token".to_string())),
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    // 1. Récupérer les clés JWT partagées
    let keys = req
        .app_data::<web::Data<JwtKeys>>()
        .ok_or_else(|| AppError::Internal("JWT keys not configured".to_string()))?;

    // 2. Extraire et vérifier le token
    let token = extract_token(req)?;
    let claims = keys.verify_token(&token)?;

    // 3. Le rôle doit être connu
    let role = Role::parse(&claims.role)
        .ok_or_else(|| AppError::Unauthorized("Invalid role in token".to_string()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.email,
        role,
    })
}

/// Implémentation de FromRequest pour AuthUser
/// Cela permet à Actix-Web d'extraire automatiquement AuthUser des requêtes
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(Error::from))
    }
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser(user))
            } else {
                tracing::warn!(user_id = user.user_id, path = %req.path(), "⛔ Admin route refused");
                Err(AppError::forbidden("Admin access only"))
            }
        });
        ready(result.map_err(Error::from))
    }
}
