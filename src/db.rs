// connexion BD + création des tables (AUTO_MIGRATE)

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};

use crate::models::{
    addresses, cart_items, carts, categories, order_items, orders, password_reset_tokens,
    product_images, products, users,
};

/// Le pool est créé une seule fois au démarrage puis cloné dans chaque repository
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    Database::connect(options).await
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Crée les tables manquantes depuis les entités, dans l'ordre des clés étrangères
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, categories::Entity).await?;
    create_table(db, &schema, products::Entity).await?;
    create_table(db, &schema, product_images::Entity).await?;
    create_table(db, &schema, addresses::Entity).await?;
    create_table(db, &schema, carts::Entity).await?;
    create_table(db, &schema, cart_items::Entity).await?;
    create_table(db, &schema, orders::Entity).await?;
    create_table(db, &schema, order_items::Entity).await?;
    create_table(db, &schema, password_reset_tokens::Entity).await?;

    tracing::info!("🗄️ Database schema synchronized");
    Ok(())
}
