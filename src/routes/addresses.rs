use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::AddressRequest;
use crate::services::AddressService;

/// POST /api/addresses - La première adresse devient l'adresse par défaut
#[post("")]
pub async fn create_address(
    auth_user: AuthUser,
    body: web::Json<AddressRequest>,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    let address = addresses.create(auth_user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Address created successfully",
        "address": address
    })))
}

#[get("")]
pub async fn list_addresses(
    auth_user: AuthUser,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(addresses.list(auth_user.user_id).await?))
}

#[get("/{id}")]
pub async fn get_address(
    auth_user: AuthUser,
    path: web::Path<i32>,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    let address = addresses.get_owned(auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(address))
}

#[put("/update/{id}")]
pub async fn update_address(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<AddressRequest>,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    let address = addresses
        .update(auth_user.user_id, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Address updated successfully",
        "address": address
    })))
}

#[delete("/delete/{id}")]
pub async fn delete_address(
    auth_user: AuthUser,
    path: web::Path<i32>,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    addresses.delete(auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Address deleted successfully" })))
}

#[put("/default/{id}")]
pub async fn switch_default(
    auth_user: AuthUser,
    path: web::Path<i32>,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    let address = addresses
        .switch_default(auth_user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Default address updated successfully",
        "address": address
    })))
}

/// Enregistrées dans le scope /api/addresses
pub fn address_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_address)
        .service(list_addresses)
        .service(update_address)
        .service(delete_address)
        .service(switch_default)
        .service(get_address);
}
