//! Configuration chargée depuis les variables d'environnement (.env accepté).
//!
//! Obligatoires: `DATABASE_URL`, `JWT_SECRET`.
//!
//! Optionnelles:
//! - `HOST` (127.0.0.1), `PORT` (8080)
//! - `CORS_ORIGINS` (liste séparée par des virgules, http://localhost:5173)
//! - `FRONTEND_URL` (http://localhost:5173) - base du lien de reset password
//! - `UPLOAD_DIR` (uploads)
//! - `AUTO_MIGRATE` (false) - crée les tables manquantes au démarrage
//! - `SMTP_HOST`, `SMTP_PORT` (587), `EMAIL_USERNAME`, `EMAIL_PASSWORD`

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub jwt_secret: SecretString,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub frontend_url: String,
    pub upload_dir: String,
    pub auto_migrate: bool,
    /// None quand SMTP_HOST n'est pas défini: les emails sont seulement loggés
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Charger .env si présent
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construit la config à partir d'une fonction de lecture des variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let database_url = SecretString::from(required("DATABASE_URL")?);
        let jwt_secret = SecretString::from(required("JWT_SECRET")?);

        let host = or_default("HOST", "127.0.0.1");
        let port = parse_port("PORT", &or_default("PORT", "8080"))?;

        let cors_origins = or_default("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let frontend_url = or_default("FRONTEND_URL", "http://localhost:5173")
            .trim_end_matches('/')
            .to_string();
        let upload_dir = or_default("UPLOAD_DIR", "uploads");

        let auto_migrate = match or_default("AUTO_MIGRATE", "false").to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "AUTO_MIGRATE".to_string(),
                    format!("expected true/false, got '{}'", other),
                ))
            }
        };

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_port("SMTP_PORT", &or_default("SMTP_PORT", "587"))?,
                username: required("EMAIL_USERNAME")?,
                password: SecretString::from(required("EMAIL_PASSWORD")?),
            }),
            None => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            cors_origins,
            frontend_url,
            upload_dir,
            auto_migrate,
            smtp,
        })
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
