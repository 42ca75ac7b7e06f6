//! Erreurs applicatives et conversion en réponses HTTP.
//!
//! Les repositories renvoient `DbErr` tel quel, les services les enveloppent
//! dans `AppError` et les handlers renvoient `Result<HttpResponse, AppError>`.
//! Le corps d'erreur est toujours `{"error": "..."}`.

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse, ResponseError,
};
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Entrée invalide (champ manquant, quantité <= 0, moyen de paiement inconnu...)
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Règle métier violée (stock insuffisant, commande déjà payée, doublon...)
    #[error("{0}")]
    Conflict(String),

    /// Erreur SeaORM avec le contexte ajouté par le service
    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: DbErr,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Ne jamais exposer les détails internes au client
        let message = match self {
            AppError::Database { .. } | AppError::Internal(_) => {
                tracing::error!(error = %self, "❌ Request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": message
        }))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        AppError::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}

/// Ajoute un message de contexte à une erreur de base de données
pub trait DbContext<T> {
    fn context(self, msg: &str) -> AppResult<T>;
}

impl<T> DbContext<T> for Result<T, DbErr> {
    fn context(self, msg: &str) -> AppResult<T> {
        self.map_err(|source| AppError::Database {
            context: msg.to_string(),
            source,
        })
    }
}

// Handlers d'erreurs d'extraction actix (JSON, path, query) -> même format
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid JSON body: {}", err)).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid path parameter: {}", err)).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid query string: {}", err)).into()
}
