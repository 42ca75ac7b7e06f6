use std::sync::Arc;

use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult, DbContext};
use crate::models::carts;
use crate::models::dto::{CartItemInput, CartView, NewOrder, OrderLine, OrderView};
use crate::models::orders::PaymentMethod;
use crate::repositories::{AddressRepository, CartRepository, ProductRepository};
use crate::services::order_service::OrderService;

/// Panier: un par utilisateur, créé au premier accès.
/// Le prix de chaque ligne est celui du produit au moment de l'ajout.
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    addresses: Arc<dyn AddressRepository>,
    orders: Arc<OrderService>,
}

impl CartService {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        addresses: Arc<dyn AddressRepository>,
        orders: Arc<OrderService>,
    ) -> Self {
        Self {
            carts,
            products,
            addresses,
            orders,
        }
    }

    async fn cart(&self, user_id: i32) -> AppResult<carts::Model> {
        self.carts.get_or_create(user_id).await.context("Failed to load cart")
    }

    pub async fn get_cart(&self, user_id: i32) -> AppResult<CartView> {
        let cart = self.cart(user_id).await?;
        let items = self.carts.lines(cart.id).await.context("Failed to load cart items")?;
        let total = items
            .iter()
            .map(|line| line.item.price * Decimal::from(line.item.quantity))
            .sum();

        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            items,
            total,
        })
    }

    /// Ajoute la quantité à la ligne existante ou crée la ligne
    pub async fn add_item(&self, user_id: i32, input: CartItemInput) -> AppResult<CartView> {
        if input.quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }

        let product = self
            .products
            .find_product(input.product_id)
            .await
            .context("Failed to load product")?
            .ok_or_else(|| AppError::not_found("Product not found"))?
            .product;

        let cart = self.cart(user_id).await?;
        let existing = self
            .carts
            .find_item(cart.id, product.id)
            .await
            .context("Failed to load cart item")?;

        match existing {
            Some(mut item) => {
                item.quantity += input.quantity;
                item.price = product.price;
                self.carts.update_item(item).await.context("Failed to update cart item")?;
            }
            None => {
                self.carts
                    .insert_item(cart.id, product.id, input.quantity, product.price)
                    .await
                    .context("Failed to add cart item")?;
            }
        }

        tracing::debug!(user_id, product_id = product.id, quantity = input.quantity, "Cart item added");
        self.get_cart(user_id).await
    }

    pub async fn add_one_item(&self, user_id: i32, product_id: i32) -> AppResult<CartView> {
        self.add_item(user_id, CartItemInput { product_id, quantity: 1 }).await
    }

    pub async fn remove_item(&self, user_id: i32, product_id: i32) -> AppResult<CartView> {
        let cart = self.cart(user_id).await?;
        let item = self
            .carts
            .find_item(cart.id, product_id)
            .await
            .context("Failed to load cart item")?
            .ok_or_else(|| AppError::not_found("Item not found in cart"))?;

        self.carts.delete_item(item.id).await.context("Failed to remove cart item")?;
        self.get_cart(user_id).await
    }

    /// Retire une unité; la ligne disparaît quand elle tombe à 0
    pub async fn remove_item_one(&self, user_id: i32, product_id: i32) -> AppResult<CartView> {
        let cart = self.cart(user_id).await?;
        let mut item = self
            .carts
            .find_item(cart.id, product_id)
            .await
            .context("Failed to load cart item")?
            .ok_or_else(|| AppError::not_found("Item not found in cart"))?;

        if item.quantity <= 1 {
            self.carts.delete_item(item.id).await.context("Failed to remove cart item")?;
        } else {
            item.quantity -= 1;
            self.carts.update_item(item).await.context("Failed to update cart item")?;
        }
        self.get_cart(user_id).await
    }

    /// Transforme le panier en commande; le panier n'est vidé qu'après succès
    pub async fn checkout(
        &self,
        user_id: i32,
        payment_method: PaymentMethod,
        shipping_address_id: Option<i32>,
    ) -> AppResult<OrderView> {
        let cart = self.get_cart(user_id).await?;
        if cart.items.is_empty() {
            return Err(AppError::conflict("Cart is empty"));
        }

        let address_id = match shipping_address_id {
            Some(id) => {
                let address = self
                    .addresses
                    .find_by_id(id)
                    .await
                    .context("Failed to load address")?
                    .ok_or_else(|| AppError::not_found("Address not found"))?;
                if address.user_id != user_id {
                    return Err(AppError::forbidden("Address does not belong to user"));
                }
                Some(address.id)
            }
            None => self
                .addresses
                .find_default(user_id)
                .await
                .context("Failed to load default address")?
                .map(|a| a.id),
        };

        let order = self
            .orders
            .create_order(NewOrder {
                user_id,
                items: cart
                    .items
                    .iter()
                    .map(|line| OrderLine {
                        product_id: line.item.product_id,
                        quantity: line.item.quantity,
                    })
                    .collect(),
                payment_method,
                address_id,
            })
            .await?;

        self.carts.clear(user_id).await.context("Failed to clear cart")?;
        tracing::info!(user_id, order_id = order.order.id, "✅ Checkout completed");
        Ok(order)
    }
}
