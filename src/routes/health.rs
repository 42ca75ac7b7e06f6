use actix_web::{get, HttpResponse};

use crate::models::health::HealthResponse;

/// GET /api/health - ne touche pas à la base
#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::ok())
}
