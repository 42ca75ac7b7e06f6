use actix_web::{delete, get, post, web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CartItemInput, CheckoutRequest};
use crate::models::orders::PaymentMethod;
use crate::services::CartService;

#[get("")]
pub async fn get_cart(auth_user: AuthUser, carts: web::Data<CartService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(carts.get_cart(auth_user.user_id).await?))
}

/// POST /cart/item - Ajoute `quantity` unités (fusionne avec la ligne existante)
#[post("/item")]
pub async fn add_item(
    auth_user: AuthUser,
    body: web::Json<CartItemInput>,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.add_item(auth_user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// POST /cart/item/{product_id} - Ajoute une unité
#[post("/item/{product_id}")]
pub async fn add_one_item(
    auth_user: AuthUser,
    path: web::Path<i32>,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.add_one_item(auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// DELETE /cart/items/{product_id} - Retire toute la ligne
#[delete("/items/{product_id}")]
pub async fn remove_item(
    auth_user: AuthUser,
    path: web::Path<i32>,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.remove_item(auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// DELETE /cart/itemx/{product_id} - Retire une seule unité
#[delete("/itemx/{product_id}")]
pub async fn remove_item_one(
    auth_user: AuthUser,
    path: web::Path<i32>,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.remove_item_one(auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[post("/checkout")]
pub async fn checkout(
    auth_user: AuthUser,
    body: web::Json<CheckoutRequest>,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let payment_method = PaymentMethod::parse(&body.payment_method)
        .ok_or_else(|| AppError::validation("Invalid payment method"))?;

    let order = carts
        .checkout(auth_user.user_id, payment_method, body.shipping_address_id)
        .await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Checkout successful",
        "order": order
    })))
}

/// Enregistrées dans le scope /cart
pub fn cart_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_cart)
        .service(add_item)
        .service(add_one_item)
        .service(remove_item)
        .service(remove_item_one)
        .service(checkout);
}
