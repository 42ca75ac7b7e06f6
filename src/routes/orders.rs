use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dto::{CreateOrderRequest, NewOrder, OrderStatusQuery, PageQuery, UpdateOrderRequest};
use crate::models::orders::PaymentMethod;
use crate::services::{AddressService, OrderService};

// ----------------------------------------------------------------------------
// /order (JWT)
// ----------------------------------------------------------------------------

/// POST /order - Crée (ou remplace) la commande pending de l'utilisateur
#[post("")]
pub async fn create_order(
    auth_user: AuthUser,
    body: web::Json<CreateOrderRequest>,
    orders: web::Data<OrderService>,
    addresses: web::Data<AddressService>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let payment_method = match body.payment_method.as_deref().map(str::trim) {
        None | Some("") => PaymentMethod::Cod,
        Some(value) => PaymentMethod::parse(value)
            .ok_or_else(|| AppError::validation("Invalid payment method"))?,
    };
    if let Some(address_id) = body.address_id {
        addresses.get_owned(auth_user.user_id, address_id).await?;
    }

    let order = orders
        .create_order(NewOrder {
            user_id: auth_user.user_id,
            items: body.order_items,
            payment_method,
            address_id: body.address_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Order created successfully",
        "order": order
    })))
}

/// GET /order - Commandes pending de l'utilisateur
#[get("")]
pub async fn unpaid_orders(
    auth_user: AuthUser,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(orders.get_unpaid_orders(auth_user.user_id).await?))
}

#[get("/show/orderalls")]
pub async fn orders_by_status(
    auth_user: AuthUser,
    query: web::Query<OrderStatusQuery>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let list = orders
        .get_orders_by_status(auth_user.user_id, query.status.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(list))
}

#[put("/pay")]
pub async fn pay_order(auth_user: AuthUser, orders: web::Data<OrderService>) -> Result<HttpResponse, AppError> {
    let order = orders.mark_paid(auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order paid successfully",
        "order": order
    })))
}

#[put("/cancel")]
pub async fn cancel_order(auth_user: AuthUser, orders: web::Data<OrderService>) -> Result<HttpResponse, AppError> {
    let order = orders.cancel(auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order canceled successfully",
        "order": order
    })))
}

#[get("/{id}")]
pub async fn get_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let order = orders.get_order_for(&auth_user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

// ----------------------------------------------------------------------------
// /admin (rôle admin)
// ----------------------------------------------------------------------------

#[get("/orders")]
pub async fn admin_list_orders(
    _admin: AdminUser,
    query: web::Query<PageQuery>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(orders.get_all_orders(&query.to_request()).await?))
}

#[get("/order/{id}")]
pub async fn admin_get_order(
    _admin: AdminUser,
    path: web::Path<i32>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(orders.get_order(path.into_inner()).await?))
}

#[put("/order/{id}")]
pub async fn admin_update_order(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateOrderRequest>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let order = orders
        .update_order(path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order updated successfully",
        "order": order
    })))
}

#[put("/order/{id}/ship")]
pub async fn admin_ship_order(
    _admin: AdminUser,
    path: web::Path<i32>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let order = orders.mark_shipped(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order shipped successfully",
        "order": order
    })))
}

#[delete("/order/{id}")]
pub async fn admin_delete_order(
    admin: AdminUser,
    path: web::Path<i32>,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    orders.delete_order(id).await?;
    tracing::info!(admin_id = admin.0.user_id, order_id = id, "Order deleted by admin");
    Ok(HttpResponse::Ok().json(json!({ "message": "Order deleted successfully" })))
}

/// Enregistrées dans le scope /order; les chemins fixes passent avant /{id}
pub fn order_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_order)
        .service(unpaid_orders)
        .service(orders_by_status)
        .service(pay_order)
        .service(cancel_order)
        .service(get_order);
}

/// Enregistrées dans le scope /admin
pub fn admin_order_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(admin_list_orders)
        .service(admin_ship_order)
        .service(admin_get_order)
        .service(admin_update_order)
        .service(admin_delete_order);
}
