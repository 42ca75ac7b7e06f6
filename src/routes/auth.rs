use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::middleware::auth::AUTH_COOKIE;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dto::{
    ForgotPasswordRequest, LoginRequest, PageQuery, RegisterRequest, ResetPasswordRequest,
    UpdatePasswordRequest, UpdateProfileRequest,
};
use crate::services::UserService;
use crate::utils::jwt::TOKEN_TTL_HOURS;
use validator::Validate;

/// POST /register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = users.register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": user
    })))
}

/// POST /login - Token dans le body ET dans le cookie HttpOnly "JWT"
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let response = users.login(body.into_inner()).await?;

    let cookie = Cookie::build(AUTH_COOKIE, response.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(TOKEN_TTL_HOURS))
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

/// POST /logout - Expire le cookie
#[post("/logout")]
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(AUTH_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Logged out successfully" }))
}

#[post("/forgot-password")]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    users.send_reset_password_email(&body.email).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Reset password email sent" })))
}

#[post("/reset-password")]
pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    users.reset_password(&body.token, &body.new_password).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password has been reset successfully" })))
}

/// GET /user/{id} - Profil public
#[get("/user/{id}")]
pub async fn get_user(
    path: web::Path<i32>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

// ----------------------------------------------------------------------------
// /profile (JWT)
// ----------------------------------------------------------------------------

#[get("/me")]
pub async fn me(auth_user: AuthUser, users: web::Data<UserService>) -> Result<HttpResponse, AppError> {
    let user = users.get_by_id(auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/me/updateprofile")]
pub async fn update_profile(
    auth_user: AuthUser,
    body: web::Json<UpdateProfileRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .update_profile(auth_user.user_id, body.into_inner(), false)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated successfully",
        "user": user
    })))
}

#[post("/me/updatepassword")]
pub async fn update_password(
    auth_user: AuthUser,
    body: web::Json<UpdatePasswordRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    users.update_password(auth_user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated successfully" })))
}

// ----------------------------------------------------------------------------
// /admin (rôle admin)
// ----------------------------------------------------------------------------

#[get("/me")]
pub async fn admin_me(admin: AdminUser, users: web::Data<UserService>) -> Result<HttpResponse, AppError> {
    let user = users.get_by_id(admin.0.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/getall")]
pub async fn get_all(
    _admin: AdminUser,
    query: web::Query<PageQuery>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let page = users.get_all(&query.to_request()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[put("/user/{id}")]
pub async fn admin_update_user(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateProfileRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .update_profile(path.into_inner(), body.into_inner(), true)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated successfully",
        "user": user
    })))
}

#[delete("/user/{id}")]
pub async fn admin_delete_user(
    admin: AdminUser,
    path: web::Path<i32>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    users.delete(id).await?;
    tracing::info!(admin_id = admin.0.user_id, user_id = id, "User deleted by admin");
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}

/// Routes publiques à la racine
pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(logout)
        .service(forgot_password)
        .service(reset_password)
        .service(get_user);
}

pub fn profile_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .service(me)
            .service(update_profile)
            .service(update_password),
    );
}

/// Enregistrées dans le scope /admin
pub fn admin_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(admin_me)
        .service(get_all)
        .service(admin_update_user)
        .service(admin_delete_user);
}
