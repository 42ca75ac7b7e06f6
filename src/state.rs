//! Construction des repositories et services partagés par tous les workers.

use std::sync::Arc;

use actix_web::web;
use sea_orm::DatabaseConnection;

use crate::errors::{json_error_handler, path_error_handler, query_error_handler};
use crate::repositories::{
    AddressRepository, CartRepository, OrderRepository, ProductRepository, ReportRepository,
    SeaAddressRepository, SeaCartRepository, SeaOrderRepository, SeaProductRepository,
    SeaReportRepository, SeaUserRepository, UserRepository,
};
use crate::services::image_store::ImageStore;
use crate::services::mail::Mailer;
use crate::services::{
    AddressService, CartService, CatalogService, OrderService, ReportService, UserService,
};
use crate::utils::jwt::JwtKeys;

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

impl Repositories {
    /// Toutes les implémentations partagent le même pool de connexions
    pub fn sea(db: &DatabaseConnection) -> Self {
        Self {
            users: Arc::new(SeaUserRepository::new(db.clone())),
            addresses: Arc::new(SeaAddressRepository::new(db.clone())),
            products: Arc::new(SeaProductRepository::new(db.clone())),
            carts: Arc::new(SeaCartRepository::new(db.clone())),
            orders: Arc::new(SeaOrderRepository::new(db.clone())),
            reports: Arc::new(SeaReportRepository::new(db.clone())),
        }
    }

    #[cfg(test)]
    pub fn memory(store: &crate::repositories::memory::MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            addresses: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            carts: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
            reports: Arc::new(store.clone()),
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub users: Arc<UserService>,
    pub addresses: Arc<AddressService>,
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub reports: Arc<ReportService>,
    pub jwt: JwtKeys,
}

impl Services {
    pub fn new(
        repos: &Repositories,
        jwt: JwtKeys,
        mailer: Arc<dyn Mailer>,
        frontend_url: &str,
        upload_dir: &str,
    ) -> Self {
        let orders = Arc::new(OrderService::new(repos.orders.clone(), repos.carts.clone()));

        Self {
            users: Arc::new(UserService::new(
                repos.users.clone(),
                repos.addresses.clone(),
                jwt.clone(),
                mailer,
                frontend_url,
            )),
            addresses: Arc::new(AddressService::new(repos.addresses.clone())),
            catalog: Arc::new(CatalogService::new(
                repos.products.clone(),
                ImageStore::new(upload_dir),
            )),
            carts: Arc::new(CartService::new(
                repos.carts.clone(),
                repos.products.clone(),
                repos.addresses.clone(),
                orders.clone(),
            )),
            orders,
            reports: Arc::new(ReportService::new(repos.reports.clone())),
            jwt,
        }
    }

    /// Enregistre les services dans l'app (web::Data) et les handlers
    /// d'erreurs d'extraction au format {"error": "..."}
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.users.clone()))
            .app_data(web::Data::from(self.addresses.clone()))
            .app_data(web::Data::from(self.catalog.clone()))
            .app_data(web::Data::from(self.carts.clone()))
            .app_data(web::Data::from(self.orders.clone()))
            .app_data(web::Data::from(self.reports.clone()))
            .app_data(web::Data::new(self.jwt.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler));
    }
}
