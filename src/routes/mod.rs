pub mod health;
pub mod auth;
pub mod addresses;
pub mod catalog;
pub mod cart;
pub mod orders;
pub mod reports;

use actix_web::web;

// Un seul scope par préfixe: actix ne passe pas au scope suivant quand le
// préfixe correspond, d'où le scope /admin unique
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(catalog::catalog_routes)
            .service(web::scope("/admin").configure(catalog::admin_catalog_routes))
            .service(web::scope("/addresses").configure(addresses::address_routes)),
    )
    .configure(auth::auth_routes)
    .configure(auth::profile_routes)
    .service(
        web::scope("/admin")
            .configure(auth::admin_user_routes)
            .configure(orders::admin_order_routes)
            .service(web::scope("/reports").configure(reports::report_routes)),
    )
    .service(web::scope("/cart").configure(cart::cart_routes))
    .service(web::scope("/order").configure(orders::order_routes));
}
