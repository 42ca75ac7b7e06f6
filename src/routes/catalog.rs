use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse};
use futures::StreamExt;
use serde_json::json;

use crate::errors::AppError;
use crate::middleware::AdminUser;
use crate::models::dto::{NewCategory, NewProduct, PageQuery, ProductListQuery, ProductUpdate};
use crate::services::catalog_service::{products_from_form, UploadedImage};
use crate::services::CatalogService;

/// Taille max d'une image uploadée
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

// ----------------------------------------------------------------------------
// Public (/api)
// ----------------------------------------------------------------------------

/// GET /api/products?page=&limit=&sort=&order=&min_price=&max_price=&search=
#[get("/products")]
pub async fn search_products(
    query: web::Query<ProductListQuery>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let page = catalog.search(&query.to_filter(None)).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/products/new-arrivals")]
pub async fn new_arrivals(
    query: web::Query<PageQuery>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let page = catalog.new_arrivals(query.page, query.limit).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/product - tous les produits, sans pagination
#[get("/product")]
pub async fn list_products(catalog: web::Data<CatalogService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(catalog.list_all().await?))
}

#[get("/product/{id}")]
pub async fn get_product(
    path: web::Path<i32>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(catalog.get_product(path.into_inner()).await?))
}

#[get("/categories")]
pub async fn list_categories(catalog: web::Data<CatalogService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(catalog.list_categories().await?))
}

#[get("/filter/category/{id}")]
pub async fn products_by_category(
    path: web::Path<i32>,
    query: web::Query<ProductListQuery>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let category_id = path.into_inner();
    let page = catalog
        .by_category(category_id, query.to_filter(Some(category_id)))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

// ----------------------------------------------------------------------------
// Admin (/api/admin)
// ----------------------------------------------------------------------------

#[post("/product")]
pub async fn create_product(
    _admin: AdminUser,
    body: web::Json<NewProduct>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let product = catalog.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Product created successfully",
        "product": product
    })))
}

#[post("/product/bulk")]
pub async fn create_products(
    _admin: AdminUser,
    body: web::Json<Vec<NewProduct>>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let result = catalog.create_products(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(result))
}

/// POST /api/admin/product/upload (multipart)
/// Champs texte répétés: name, description, price, quantity, category_id
/// Fichiers: images (partagées par tous les produits créés)
#[post("/product/upload")]
pub async fn upload_products(
    _admin: AdminUser,
    mut payload: Multipart,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    let mut images = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;
            if data.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(AppError::validation(format!("Field '{}' is too large", name)));
            }
            data.extend_from_slice(&chunk);
        }

        match (name.as_str(), file_name) {
            ("images", Some(file_name)) => images.push(UploadedImage { file_name, bytes: data }),
            (_, _) => {
                let value = String::from_utf8(data)
                    .map_err(|_| AppError::validation(format!("Field '{}' is not valid UTF-8", name)))?;
                fields.entry(name).or_default().push(value);
            }
        }
    }

    let inputs = products_from_form(&fields)?;
    let result = catalog.upload_products(inputs, images).await?;
    Ok(HttpResponse::Created().json(result))
}

#[get("/products")]
pub async fn admin_search_products(
    _admin: AdminUser,
    query: web::Query<ProductListQuery>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let page = catalog.search(&query.to_filter(None)).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/product/{id}")]
pub async fn admin_get_product(
    _admin: AdminUser,
    path: web::Path<i32>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(catalog.get_product(path.into_inner()).await?))
}

#[get("/product/by-name/{name}")]
pub async fn admin_get_product_by_name(
    _admin: AdminUser,
    path: web::Path<String>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(catalog.get_product_by_name(&path).await?))
}

#[put("/product/{id}")]
pub async fn update_product(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<ProductUpdate>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let product = catalog
        .update_product(path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Product updated successfully",
        "product": product
    })))
}

#[delete("/product/{id}")]
pub async fn delete_product(
    _admin: AdminUser,
    path: web::Path<i32>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    catalog.delete_product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Product deleted successfully" })))
}

#[get("/categories")]
pub async fn admin_list_categories(
    _admin: AdminUser,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(catalog.list_categories().await?))
}

#[post("/categories")]
pub async fn create_category(
    _admin: AdminUser,
    body: web::Json<NewCategory>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let category = catalog.create_category(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Category created successfully",
        "category": category
    })))
}

#[post("/categories/bulk")]
pub async fn create_categories(
    _admin: AdminUser,
    body: web::Json<Vec<NewCategory>>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let result = catalog.create_categories(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(result))
}

pub fn catalog_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(new_arrivals)
        .service(search_products)
        .service(list_products)
        .service(get_product)
        .service(list_categories)
        .service(products_by_category);
}

/// Enregistrées dans le scope /api/admin
pub fn admin_catalog_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_products)
        .service(upload_products)
        .service(create_product)
        .service(admin_search_products)
        .service(admin_get_product_by_name)
        .service(admin_get_product)
        .service(update_product)
        .service(delete_product)
        .service(create_categories)
        .service(admin_list_categories)
        .service(create_category);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::models::users::Role;
    use crate::routes::testing::{bearer, TestContext};

    #[actix_web::test]
    async fn test_public_catalog() {
        let ctx = TestContext::new();
        let cheap = ctx.product("Red Runner", 50, 3);
        ctx.product("Blue Runner", 150, 3);
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::get()
            .uri("/api/products?search=runner&max_price=100")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_items"], 1);
        assert_eq!(body["items"][0]["id"], cheap);
        assert_eq!(body["items"][0]["category"]["name"], "General");

        let req = test::TestRequest::get().uri("/api/products/new-arrivals").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_items"], 2);

        let req = test::TestRequest::get().uri("/api/product/9999").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/product/abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_huge_page_returns_empty_page() {
        let ctx = TestContext::new();
        ctx.product("Lamp", 10, 1);
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::get()
            .uri("/api/products?page=9223372036854775807&limit=10")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["total_items"], 1);
        assert!(body["items"].as_array().unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri("/api/products?limit=5000")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["per_page"], 100);
    }

    #[actix_web::test]
    async fn test_admin_creates_category_and_product() {
        let ctx = TestContext::new();
        let admin = ctx.user("admin@example.com", Role::Admin).await;
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/admin/categories")
            .insert_header(bearer(&ctx, &admin))
            .set_json(json!({ "name": "Shoes", "description": "All shoes" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let category_id = body["category"]["id"].as_i64().unwrap();

        let product = json!({
            "name": "Runner",
            "price": 99.5,
            "quantity": 4,
            "category_id": category_id
        });
        let req = test::TestRequest::post()
            .uri("/api/admin/product")
            .insert_header(bearer(&ctx, &admin))
            .set_json(&product)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/admin/product")
            .insert_header(bearer(&ctx, &admin))
            .set_json(&product)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/api/admin/product/by-name/Runner")
            .insert_header(bearer(&ctx, &admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["price"], 99.5);
    }

    #[actix_web::test]
    async fn test_admin_catalog_requires_admin() {
        let ctx = TestContext::new();
        let user = ctx.user("user@example.com", Role::User).await;
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/admin/categories")
            .insert_header(bearer(&ctx, &user))
            .set_json(json!({ "name": "Shoes" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_multipart_upload() {
        let ctx = TestContext::new();
        let admin = ctx.user("admin@example.com", Role::Admin).await;
        let category_id = ctx.store.seed_category("Bags").id.to_string();
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let boundary = "XBOUNDARY";
        let mut body = String::new();
        for (name, value) in [
            ("name", "Tote"),
            ("price", "25.00"),
            ("quantity", "3"),
            ("category_id", category_id.as_str()),
        ] {
            body.push_str(&format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"\r\n\r\n{v}\r\n",
                b = boundary,
                n = name,
                v = value
            ));
        }
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"tote.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
            b = boundary
        ));

        let req = test::TestRequest::post()
            .uri("/api/admin/product/upload")
            .insert_header(bearer(&ctx, &admin))
            .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", boundary)))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["created"][0]["name"], "Tote");
        assert!(body["created"][0]["images"][0]["path"]
            .as_str()
            .unwrap()
            .ends_with("_tote.png"));
    }
}
