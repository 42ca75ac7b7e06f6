// ============================================================================
// SERVICE : COMMANDES
// ============================================================================
//
// Cycle de vie (voir OrderStatus::can_transition_to):
//   pending -> paid | canceled, paid -> shipped
//
// Création (checkout ou POST /order):
//   1. On cherche la commande pending de l'utilisateur (au plus une)
//   2. Dans UNE transaction: produits verrouillés (FOR UPDATE), contrôle du
//      stock, décrément, prix de ligne = prix unitaire x quantité
//   3. La commande pending existante est réécrite, sinon on en insère une
//   4. Toute erreur => la transaction est droppée sans commit => rollback
//
// ============================================================================

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult, DbContext};
use crate::middleware::AuthUser;
use crate::models::dto::{NewOrder, OrderLine, OrderView, PageRequest, Paginated, UpdateOrderRequest};
use crate::models::orders::{self, OrderStatus};
use crate::repositories::{CartRepository, OrderDraft, OrderRepository, OrderTransaction, PricedLine};

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
}

/// Recalcule les lignes depuis les produits verrouillés.
/// `decrement` = true lors d'une création: le stock est décrémenté.
async fn price_lines(
    tx: &mut dyn OrderTransaction,
    items: &[OrderLine],
    decrement: bool,
) -> AppResult<(Vec<PricedLine>, Decimal)> {
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::validation(format!(
                "Quantity must be greater than 0 for product {}",
                item.product_id
            )));
        }

        let product = tx
            .lock_product(item.product_id)
            .await
            .context("Failed to load product")?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", item.product_id)))?;

        if item.quantity > product.quantity {
            return Err(AppError::conflict(format!(
                "Insufficient stock for product {}",
                product.name
            )));
        }

        if decrement {
            tx.set_stock(product.id, product.quantity - item.quantity)
                .await
                .context("Failed to update stock")?;
        }

        let price = product.price * Decimal::from(item.quantity);
        total += price;
        lines.push(PricedLine {
            product_id: product.id,
            quantity: item.quantity,
            price,
        });
    }

    Ok((lines, total))
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { orders, carts }
    }

    pub async fn create_order(&self, order: NewOrder) -> AppResult<OrderView> {
        if order.items.is_empty() {
            return Err(AppError::validation("Order must contain at least one item"));
        }

        let pending = self
            .orders
            .find_pending_for_user(order.user_id)
            .await
            .context("Failed to load pending order")?;

        let mut tx = self.orders.begin().await.context("Failed to start transaction")?;

        if let Some(existing) = &pending {
            tx.delete_items(existing.id)
                .await
                .context("Failed to clear pending order items")?;
        }

        let (lines, total) = price_lines(tx.as_mut(), &order.items, true).await?;

        let saved = match pending {
            Some(mut existing) => {
                existing.total_price = total;
                existing.status = OrderStatus::Pending;
                existing.payment_method = order.payment_method.as_str().to_string();
                existing.address_id = order.address_id;
                tx.update_order(existing).await.context("Failed to update order")?
            }
            None => tx
                .insert_order(OrderDraft {
                    user_id: order.user_id,
                    total_price: total,
                    status: OrderStatus::Pending,
                    payment_method: order.payment_method.as_str().to_string(),
                    address_id: order.address_id,
                })
                .await
                .context("Failed to create order")?,
        };

        tx.insert_items(saved.id, &lines)
            .await
            .context("Failed to save order items")?;
        tx.commit().await.context("Failed to commit order")?;

        tracing::info!(
            order_id = saved.id,
            user_id = saved.user_id,
            total = %saved.total_price,
            "🛒 Order placed"
        );
        self.get_order(saved.id).await
    }

    /// Modification admin: lignes recalculées (sans toucher au stock) et
    /// changement de statut optionnel
    pub async fn update_order(&self, id: i32, req: UpdateOrderRequest) -> AppResult<OrderView> {
        let mut order = self.get_order(id).await?.order;

        if matches!(order.status, OrderStatus::Paid | OrderStatus::Shipped) {
            return Err(AppError::conflict(format!(
                "Cannot update an order that is already {}",
                order.status.as_str()
            )));
        }
        if req.order_items.is_empty() {
            return Err(AppError::validation("Order must contain at least one item"));
        }

        if let Some(value) = req.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let next = OrderStatus::parse(value)
                .ok_or_else(|| AppError::validation(format!("Invalid status: {}", value)))?;
            if next != order.status && !order.status.can_transition_to(next) {
                return Err(AppError::conflict(format!(
                    "Invalid status transition from {} to {}",
                    order.status.as_str(),
                    next.as_str()
                )));
            }
            if next == OrderStatus::Paid && order.paid_at.is_none() {
                order.paid_at = Some(Utc::now());
            }
            order.status = next;
        }

        let mut tx = self.orders.begin().await.context("Failed to start transaction")?;
        tx.delete_items(order.id)
            .await
            .context("Failed to clear order items")?;

        let (lines, total) = price_lines(tx.as_mut(), &req.order_items, false).await?;
        order.total_price = total;

        let saved = tx.update_order(order).await.context("Failed to update order")?;
        tx.insert_items(saved.id, &lines)
            .await
            .context("Failed to save order items")?;
        tx.commit().await.context("Failed to commit order")?;

        tracing::info!(order_id = saved.id, status = saved.status.as_str(), "✏️ Order updated");
        self.get_order(saved.id).await
    }

    /// Erreur quand l'utilisateur n'a pas de commande pending: on regarde sa
    /// dernière commande pour distinguer "déjà traitée" de "rien à faire"
    async fn no_pending_error(&self, user_id: i32) -> AppResult<AppError> {
        let latest = self
            .orders
            .list_for_user(user_id, None)
            .await
            .context("Failed to load orders")?
            .into_iter()
            .next();

        Ok(match latest.map(|view| view.order.status) {
            Some(OrderStatus::Paid) | Some(OrderStatus::Shipped) => AppError::conflict("Order already paid"),
            Some(OrderStatus::Canceled) => AppError::conflict("Order already canceled"),
            Some(OrderStatus::Pending) | None => AppError::not_found("No pending order found"),
        })
    }

    async fn pending_for(&self, user_id: i32) -> AppResult<orders::Model> {
        let pending = self
            .orders
            .find_pending_for_user(user_id)
            .await
            .context("Failed to load pending order")?;

        match pending {
            Some(order) => Ok(order),
            None => Err(self.no_pending_error(user_id).await?),
        }
    }

    pub async fn mark_paid(&self, user_id: i32) -> AppResult<orders::Model> {
        let mut order = self.pending_for(user_id).await?;

        order.status = OrderStatus::Paid;
        order.paid_at = Some(Utc::now());
        let order = self
            .orders
            .update_header(order)
            .await
            .context("Failed to mark order as paid")?;

        self.carts.clear(user_id).await.context("Failed to clear cart")?;
        tracing::info!(order_id = order.id, user_id, "💰 Order paid");
        Ok(order)
    }

    /// Le stock n'est pas remis en vente à l'annulation
    pub async fn cancel(&self, user_id: i32) -> AppResult<orders::Model> {
        let mut order = self.pending_for(user_id).await?;

        order.status = OrderStatus::Canceled;
        let order = self
            .orders
            .update_header(order)
            .await
            .context("Failed to cancel order")?;

        self.carts.clear(user_id).await.context("Failed to clear cart")?;
        tracing::info!(order_id = order.id, user_id, "❌ Order canceled");
        Ok(order)
    }

    pub async fn mark_shipped(&self, id: i32) -> AppResult<orders::Model> {
        let mut order = self.get_order(id).await?.order;
        if !order.status.can_transition_to(OrderStatus::Shipped) {
            return Err(AppError::conflict("Only paid orders can be shipped"));
        }

        order.status = OrderStatus::Shipped;
        let order = self
            .orders
            .update_header(order)
            .await
            .context("Failed to ship order")?;
        tracing::info!(order_id = order.id, "🚚 Order shipped");
        Ok(order)
    }

    pub async fn delete_order(&self, id: i32) -> AppResult<()> {
        self.get_order(id).await?;
        self.orders.delete(id).await.context("Failed to delete order")?;
        tracing::info!(order_id = id, "🗑️ Order deleted");
        Ok(())
    }

    pub async fn get_order(&self, id: i32) -> AppResult<OrderView> {
        self.orders
            .find_by_id(id)
            .await
            .context("Failed to load order")?
            .ok_or_else(|| AppError::not_found("Order not found"))
    }

    /// Le propriétaire ou un admin
    pub async fn get_order_for(&self, user: &AuthUser, id: i32) -> AppResult<OrderView> {
        let view = self.get_order(id).await?;
        if view.order.user_id != user.user_id && !user.is_admin() {
            return Err(AppError::forbidden("Order does not belong to user"));
        }
        Ok(view)
    }

    pub async fn get_unpaid_orders(&self, user_id: i32) -> AppResult<Vec<OrderView>> {
        self.orders
            .list_for_user(user_id, Some(OrderStatus::Pending))
            .await
            .context("Failed to load orders")
    }

    /// Statut vide ou absent = toutes les commandes
    pub async fn get_orders_by_status(&self, user_id: i32, status: Option<&str>) -> AppResult<Vec<OrderView>> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(
                OrderStatus::parse(value)
                    .ok_or_else(|| AppError::validation(format!("Invalid status: {}", value)))?,
            ),
            None => None,
        };

        self.orders
            .list_for_user(user_id, status)
            .await
            .context("Failed to load orders")
    }

    pub async fn get_all_orders(&self, page: &PageRequest) -> AppResult<Paginated<OrderView>> {
        let (items, total) = self.orders.list_all(page).await.context("Failed to list orders")?;
        Ok(Paginated::new(items, total, page))
    }
}
