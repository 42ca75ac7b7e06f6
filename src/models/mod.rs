// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Utilisateurs (email + mot de passe, rôle user/admin)
//   - addresses : Adresses de livraison (une seule par défaut par user)
//   - categories : Catégories du catalogue (nom unique)
//   - products : Produits (prix, stock)
//   - product_images : Chemins des images uploadées
//   - carts / cart_items : Panier (un par user, créé à la demande)
//   - orders / order_items : Commandes et lignes (prix figé à la création)
//   - password_reset_tokens : Tokens de reset password (expire 1h)
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut sauf les rapports)
//   - users et products sont supprimés en "soft delete" (deleted_at)
//   - Les relations belongs_to servent aussi à créer les clés étrangères
//     quand AUTO_MIGRATE=true
//
// ============================================================================

pub mod health;
pub mod users;
pub mod addresses;
pub mod categories;
pub mod products;
pub mod product_images;
pub mod carts;
pub mod cart_items;
pub mod orders;
pub mod order_items;
pub mod password_reset_tokens;
pub mod dto;
