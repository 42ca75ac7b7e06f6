// ============================================================================
// SERVICES - RÈGLES MÉTIER
// ============================================================================
//
// Chaque service reçoit ses repositories (traits) à la construction et
// renvoie des AppError prêtes à être converties en réponse HTTP.
//
// Les transactions sont ouvertes ici (OrderService), jamais dans les handlers.
//
// ============================================================================

pub mod mail;
pub mod image_store;
pub mod user_service;
pub mod address_service;
pub mod catalog_service;
pub mod order_service;
pub mod cart_service;
pub mod report_service;

pub use address_service::AddressService;
pub use cart_service::CartService;
pub use catalog_service::CatalogService;
pub use order_service::OrderService;
pub use report_service::ReportService;
pub use user_service::UserService;
