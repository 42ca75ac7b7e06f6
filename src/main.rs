mod config;
mod db;
mod errors;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod state;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, App, HttpServer};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use services::mail::{LogMailer, Mailer, SmtpMailer};
use state::{Repositories, Services};
use utils::jwt::JwtKeys;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shop_backend=info,actix_web=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_mailer(config: &AppConfig) -> Arc<dyn Mailer> {
    match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                tracing::error!(error = %e, "❌ SMTP configuration invalid, emails will only be logged");
                Arc::new(LogMailer)
            }
        },
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    tracing::info!("🔌 Connecting to database...");
    let db = db::establish_connection(config.database_url.expose_secret())
        .await
        .map_err(std::io::Error::other)?;
    tracing::info!("✅ Database connected!");

    if config.auto_migrate {
        db::sync_schema(&db).await.map_err(std::io::Error::other)?;
    }

    let repos = Repositories::sea(&db);
    let services = Services::new(
        &repos,
        JwtKeys::new(config.jwt_secret.expose_secret()),
        build_mailer(&config),
        &config.frontend_url,
        &config.upload_dir,
    );

    services::user_service::spawn_user_count_logger(repos.users.clone());

    let (host, port) = config.bind_addr();
    let cors_origins = config.cors_origins.clone();
    tracing::info!("🚀 Starting server on http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .configure(|cfg| services.register(cfg))
            .configure(routes::configure_routes)
    })
    .bind((host, port))?
    .run()
    .await
}
