//! Implémentation en mémoire des repositories, utilisée par les tests des
//! services et des handlers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::DbErr;

use crate::models::dto::{
    CartLine, DateWindow, NewCategory, NewProduct, OrderItemView, OrderView, PageRequest,
    ProductFilter, ProductView, TrendPoint,
};
use crate::models::{
    addresses, cart_items, carts, categories, order_items, orders::{self, OrderStatus},
    password_reset_tokens, product_images, products, users,
};
use super::*;

#[derive(Debug, Clone, Default)]
pub struct StoreData {
    next_id: i32,
    pub users: Vec<users::Model>,
    pub addresses: Vec<addresses::Model>,
    pub categories: Vec<categories::Model>,
    pub products: Vec<products::Model>,
    pub product_images: Vec<product_images::Model>,
    pub carts: Vec<carts::Model>,
    pub cart_items: Vec<cart_items::Model>,
    pub orders: Vec<orders::Model>,
    pub order_items: Vec<order_items::Model>,
    pub reset_tokens: Vec<password_reset_tokens::Model>,
}

impl StoreData {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn product_view(&self, product: &products::Model) -> ProductView {
        ProductView {
            product: product.clone(),
            images: self
                .product_images
                .iter()
                .filter(|i| i.product_id == product.id)
                .cloned()
                .collect(),
            category: self
                .categories
                .iter()
                .find(|c| c.id == product.category_id)
                .cloned(),
        }
    }

    fn order_view(&self, order: &orders::Model) -> OrderView {
        OrderView {
            order: order.clone(),
            order_items: self
                .order_items
                .iter()
                .filter(|i| i.order_id == order.id)
                .map(|item| OrderItemView {
                    item: item.clone(),
                    product: self.products.iter().find(|p| p.id == item.product_id).cloned(),
                })
                .collect(),
        }
    }

    fn revenue_orders(&self, window: &DateWindow) -> Vec<&orders::Model> {
        self.orders
            .iter()
            .filter(|o| o.status.is_revenue())
            .filter(|o| o.created_at >= window.start && o.created_at < window.end)
            .collect()
    }

    fn order_total(&self, order_id: i32) -> Decimal {
        self.order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| i.price)
            .sum()
    }
}

/// Base de données en mémoire partagée entre tous les repositories d'un test
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R>(&self, f: impl FnOnce(&StoreData) -> R) -> R {
        f(&self.data.lock().unwrap())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> R {
        f(&mut self.data.lock().unwrap())
    }

    // Helpers de préparation des données de test

    pub fn seed_category(&self, name: &str) -> categories::Model {
        self.write(|data| {
            let category = categories::Model {
                id: data.next_id(),
                name: name.to_string(),
                description: String::new(),
                created_at: Utc::now(),
            };
            data.categories.push(category.clone());
            category
        })
    }

    pub fn seed_product(&self, name: &str, price: Decimal, quantity: i32) -> products::Model {
        let category_id = self.read(|data| data.categories.first().map(|c| c.id));
        let category_id = match category_id {
            Some(id) => id,
            None => self.seed_category("General").id,
        };
        self.write(|data| {
            let now = Utc::now();
            let product = products::Model {
                id: data.next_id(),
                name: name.to_string(),
                description: String::new(),
                price,
                quantity,
                category_id,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            data.products.push(product.clone());
            product
        })
    }

    pub fn product(&self, id: i32) -> products::Model {
        self.read(|data| data.products.iter().find(|p| p.id == id).cloned().unwrap())
    }

    pub fn set_product_price(&self, id: i32, price: Decimal) {
        self.write(|data| {
            if let Some(p) = data.products.iter_mut().find(|p| p.id == id) {
                p.price = price;
            }
        })
    }

    pub fn insert_order_at(
        &self,
        user_id: i32,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        lines: &[(i32, i32, Decimal)],
    ) -> orders::Model {
        self.write(|data| {
            let order = orders::Model {
                id: data.next_id(),
                user_id,
                total_price: lines.iter().map(|(_, _, price)| *price).sum(),
                status,
                payment_method: "cod".to_string(),
                address_id: None,
                paid_at: None,
                created_at,
                updated_at: created_at,
            };
            data.orders.push(order.clone());
            for (product_id, quantity, price) in lines {
                let id = data.next_id();
                data.order_items.push(order_items::Model {
                    id,
                    order_id: order.id,
                    product_id: *product_id,
                    quantity: *quantity,
                    price: *price,
                });
            }
            order
        })
    }
}

fn not_found(what: &str) -> DbErr {
    DbErr::RecordNotFound(what.to_string())
}

fn sort_desc<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K, descending: bool) {
    items.sort_by_key(|item| key(item));
    if descending {
        items.reverse();
    }
}

fn paginate<T>(items: Vec<T>, page: &PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, input: NewUser) -> Result<users::Model, DbErr> {
        self.write(|data| {
            let now = Utc::now();
            let user = users::Model {
                id: data.next_id(),
                email: input.email,
                password_hash: input.password_hash,
                role: input.role,
                first_name: input.first_name,
                last_name: input.last_name,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            data.users.push(user.clone());
            Ok(user)
        })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        Ok(self.read(|data| {
            data.users
                .iter()
                .find(|u| u.id == id && u.deleted_at.is_none())
                .cloned()
        }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        Ok(self.read(|data| {
            data.users
                .iter()
                .find(|u| u.email == email && u.deleted_at.is_none())
                .cloned()
        }))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        Ok(self.read(|data| data.users.iter().any(|u| u.email == email)))
    }

    async fn update(&self, user: users::Model) -> Result<users::Model, DbErr> {
        self.write(|data| {
            let slot = data
                .users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or_else(|| not_found("user"))?;
            *slot = users::Model { updated_at: Utc::now(), ..user };
            Ok(slot.clone())
        })
    }

    async fn soft_delete(&self, id: i32) -> Result<(), DbErr> {
        self.write(|data| {
            if let Some(user) = data.users.iter_mut().find(|u| u.id == id) {
                user.deleted_at = Some(Utc::now());
            }
        });
        Ok(())
    }

    async fn list(&self, page: &PageRequest) -> Result<(Vec<users::Model>, u64), DbErr> {
        Ok(self.read(|data| {
            let mut active: Vec<users::Model> = data
                .users
                .iter()
                .filter(|u| u.deleted_at.is_none())
                .cloned()
                .collect();
            let total = active.len() as u64;
            match page.sort.as_str() {
                "email" => sort_desc(&mut active, |u| u.email.clone(), page.descending),
                _ => sort_desc(&mut active, |u| u.id, page.descending),
            }
            (paginate(active, page), total)
        }))
    }

    async fn count_active(&self) -> Result<u64, DbErr> {
        Ok(self.read(|data| data.users.iter().filter(|u| u.deleted_at.is_none()).count() as u64))
    }

    async fn save_reset_token(
        &self,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        self.write(|data| {
            let id = data.next_id();
            data.reset_tokens.push(password_reset_tokens::Model {
                id,
                user_id,
                token: token.to_string(),
                expires_at,
                created_at: Utc::now(),
            });
        });
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> Result<Option<password_reset_tokens::Model>, DbErr> {
        Ok(self.read(|data| data.reset_tokens.iter().find(|t| t.token == token).cloned()))
    }

    async fn delete_reset_token(&self, token: &str) -> Result<(), DbErr> {
        self.write(|data| data.reset_tokens.retain(|t| t.token != token));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Addresses
// ----------------------------------------------------------------------------

#[async_trait]
impl AddressRepository for MemoryStore {
    async fn create(&self, input: NewAddress) -> Result<addresses::Model, DbErr> {
        Ok(self.write(|data| {
            let address = addresses::Model {
                id: data.next_id(),
                user_id: input.user_id,
                full_name: input.full_name,
                phone: input.phone,
                address_line1: input.address_line1,
                address_line2: input.address_line2,
                city: input.city,
                province: input.province,
                zip_code: input.zip_code,
                country: input.country,
                is_default: input.is_default,
                created_at: Utc::now(),
            };
            data.addresses.push(address.clone());
            address
        }))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<addresses::Model>, DbErr> {
        Ok(self.read(|data| data.addresses.iter().find(|a| a.id == id).cloned()))
    }

    async fn update(&self, address: addresses::Model) -> Result<addresses::Model, DbErr> {
        self.write(|data| {
            let slot = data
                .addresses
                .iter_mut()
                .find(|a| a.id == address.id)
                .ok_or_else(|| not_found("address"))?;
            *slot = address;
            Ok(slot.clone())
        })
    }

    async fn delete(&self, id: i32) -> Result<(), DbErr> {
        self.write(|data| data.addresses.retain(|a| a.id != id));
        Ok(())
    }

    async fn unset_default(&self, user_id: i32) -> Result<(), DbErr> {
        self.write(|data| {
            for address in data.addresses.iter_mut().filter(|a| a.user_id == user_id) {
                address.is_default = false;
            }
        });
        Ok(())
    }

    async fn latest_for_user(&self, user_id: i32) -> Result<Option<addresses::Model>, DbErr> {
        Ok(self.read(|data| {
            data.addresses
                .iter()
                .filter(|a| a.user_id == user_id)
                .max_by_key(|a| (a.created_at, a.id))
                .cloned()
        }))
    }

    async fn has_default(&self, user_id: i32) -> Result<bool, DbErr> {
        Ok(self.read(|data| {
            data.addresses
                .iter()
                .any(|a| a.user_id == user_id && a.is_default)
        }))
    }

    async fn find_default(&self, user_id: i32) -> Result<Option<addresses::Model>, DbErr> {
        Ok(self.read(|data| {
            data.addresses
                .iter()
                .find(|a| a.user_id == user_id && a.is_default)
                .cloned()
        }))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<addresses::Model>, DbErr> {
        Ok(self.read(|data| {
            let mut list: Vec<addresses::Model> = data
                .addresses
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect();
            list.sort_by_key(|a| std::cmp::Reverse((a.is_default, a.created_at, a.id)));
            list
        }))
    }
}

// ----------------------------------------------------------------------------
// Products / categories
// ----------------------------------------------------------------------------

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create_product(&self, input: NewProduct) -> Result<products::Model, DbErr> {
        Ok(self.write(|data| {
            let now = Utc::now();
            let product = products::Model {
                id: data.next_id(),
                name: input.name,
                description: input.description,
                price: input.price,
                quantity: input.quantity,
                category_id: input.category_id,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            data.products.push(product.clone());
            product
        }))
    }

    async fn add_images(&self, product_id: i32, paths: &[String]) -> Result<Vec<product_images::Model>, DbErr> {
        Ok(self.write(|data| {
            let mut saved = Vec::new();
            for path in paths {
                let image = product_images::Model {
                    id: data.next_id(),
                    product_id,
                    path: path.clone(),
                };
                data.product_images.push(image.clone());
                saved.push(image);
            }
            saved
        }))
    }

    async fn find_product(&self, id: i32) -> Result<Option<ProductView>, DbErr> {
        Ok(self.read(|data| {
            data.products
                .iter()
                .find(|p| p.id == id && p.deleted_at.is_none())
                .map(|p| data.product_view(p))
        }))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ProductView>, DbErr> {
        Ok(self.read(|data| {
            data.products
                .iter()
                .find(|p| p.name == name && p.deleted_at.is_none())
                .map(|p| data.product_view(p))
        }))
    }

    async fn find_by_name_and_category(
        &self,
        name: &str,
        category_id: i32,
    ) -> Result<Option<products::Model>, DbErr> {
        Ok(self.read(|data| {
            data.products
                .iter()
                .find(|p| p.name == name && p.category_id == category_id && p.deleted_at.is_none())
                .cloned()
        }))
    }

    async fn update_product(&self, product: products::Model) -> Result<products::Model, DbErr> {
        self.write(|data| {
            let slot = data
                .products
                .iter_mut()
                .find(|p| p.id == product.id)
                .ok_or_else(|| not_found("product"))?;
            *slot = products::Model { updated_at: Utc::now(), ..product };
            Ok(slot.clone())
        })
    }

    async fn soft_delete_product(&self, id: i32) -> Result<(), DbErr> {
        self.write(|data| {
            if let Some(p) = data.products.iter_mut().find(|p| p.id == id) {
                p.deleted_at = Some(Utc::now());
            }
        });
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<ProductView>, DbErr> {
        Ok(self.read(|data| {
            data.products
                .iter()
                .filter(|p| p.deleted_at.is_none())
                .map(|p| data.product_view(p))
                .collect()
        }))
    }

    async fn search_products(&self, filter: &ProductFilter) -> Result<(Vec<ProductView>, u64), DbErr> {
        Ok(self.read(|data| {
            let search = filter.search.as_ref().map(|s| s.to_lowercase());
            let mut matching: Vec<products::Model> = data
                .products
                .iter()
                .filter(|p| p.deleted_at.is_none())
                .filter(|p| filter.category_id.map_or(true, |c| p.category_id == c))
                .filter(|p| filter.min_price.map_or(true, |min| p.price >= min))
                .filter(|p| filter.max_price.map_or(true, |max| p.price <= max))
                .filter(|p| {
                    search.as_ref().map_or(true, |s| {
                        p.name.to_lowercase().contains(s) || p.description.to_lowercase().contains(s)
                    })
                })
                .cloned()
                .collect();
            let total = matching.len() as u64;

            match filter.page.sort.as_str() {
                "id" => sort_desc(&mut matching, |p| p.id, filter.page.descending),
                "name" => sort_desc(&mut matching, |p| p.name.clone(), filter.page.descending),
                "price" => sort_desc(&mut matching, |p| p.price, filter.page.descending),
                _ => sort_desc(&mut matching, |p| (p.created_at, p.id), filter.page.descending),
            }

            let views = paginate(matching, &filter.page)
                .iter()
                .map(|p| data.product_view(p))
                .collect();
            (views, total)
        }))
    }

    async fn create_category(&self, input: NewCategory) -> Result<categories::Model, DbErr> {
        self.write(|data| {
            if data.categories.iter().any(|c| c.name == input.name) {
                return Err(DbErr::Custom("duplicate key value violates unique constraint".into()));
            }
            let category = categories::Model {
                id: data.next_id(),
                name: input.name,
                description: input.description,
                created_at: Utc::now(),
            };
            data.categories.push(category.clone());
            Ok(category)
        })
    }

    async fn find_category(&self, id: i32) -> Result<Option<categories::Model>, DbErr> {
        Ok(self.read(|data| data.categories.iter().find(|c| c.id == id).cloned()))
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<categories::Model>, DbErr> {
        Ok(self.read(|data| data.categories.iter().find(|c| c.name == name).cloned()))
    }

    async fn list_categories(&self) -> Result<Vec<categories::Model>, DbErr> {
        Ok(self.read(|data| data.categories.clone()))
    }
}

// ----------------------------------------------------------------------------
// Cart
// ----------------------------------------------------------------------------

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get_or_create(&self, user_id: i32) -> Result<carts::Model, DbErr> {
        Ok(self.write(|data| {
            if let Some(cart) = data.carts.iter().find(|c| c.user_id == user_id) {
                return cart.clone();
            }
            let cart = carts::Model {
                id: data.next_id(),
                user_id,
                created_at: Utc::now(),
            };
            data.carts.push(cart.clone());
            cart
        }))
    }

    async fn lines(&self, cart_id: i32) -> Result<Vec<CartLine>, DbErr> {
        Ok(self.read(|data| {
            data.cart_items
                .iter()
                .filter(|i| i.cart_id == cart_id)
                .map(|item| CartLine {
                    item: item.clone(),
                    product: data.products.iter().find(|p| p.id == item.product_id).cloned(),
                })
                .collect()
        }))
    }

    async fn find_item(&self, cart_id: i32, product_id: i32) -> Result<Option<cart_items::Model>, DbErr> {
        Ok(self.read(|data| {
            data.cart_items
                .iter()
                .find(|i| i.cart_id == cart_id && i.product_id == product_id)
                .cloned()
        }))
    }

    async fn insert_item(
        &self,
        cart_id: i32,
        product_id: i32,
        quantity: i32,
        price: Decimal,
    ) -> Result<cart_items::Model, DbErr> {
        Ok(self.write(|data| {
            let item = cart_items::Model {
                id: data.next_id(),
                cart_id,
                product_id,
                quantity,
                price,
                created_at: Utc::now(),
            };
            data.cart_items.push(item.clone());
            item
        }))
    }

    async fn update_item(&self, item: cart_items::Model) -> Result<cart_items::Model, DbErr> {
        self.write(|data| {
            let slot = data
                .cart_items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or_else(|| not_found("cart item"))?;
            *slot = item;
            Ok(slot.clone())
        })
    }

    async fn delete_item(&self, item_id: i32) -> Result<(), DbErr> {
        self.write(|data| data.cart_items.retain(|i| i.id != item_id));
        Ok(())
    }

    async fn clear(&self, user_id: i32) -> Result<(), DbErr> {
        self.write(|data| {
            let cart_ids: Vec<i32> = data
                .carts
                .iter()
                .filter(|c| c.user_id == user_id)
                .map(|c| c.id)
                .collect();
            data.cart_items.retain(|i| !cart_ids.contains(&i.cart_id));
        });
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Orders
// ----------------------------------------------------------------------------

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_pending_for_user(&self, user_id: i32) -> Result<Option<orders::Model>, DbErr> {
        Ok(self.read(|data| {
            data.orders
                .iter()
                .filter(|o| o.user_id == user_id && o.status == OrderStatus::Pending)
                .max_by_key(|o| o.id)
                .cloned()
        }))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<OrderView>, DbErr> {
        Ok(self.read(|data| {
            data.orders
                .iter()
                .find(|o| o.id == id)
                .map(|o| data.order_view(o))
        }))
    }

    async fn list_for_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, DbErr> {
        Ok(self.read(|data| {
            let mut list: Vec<&orders::Model> = data
                .orders
                .iter()
                .filter(|o| o.user_id == user_id)
                .filter(|o| status.map_or(true, |s| o.status == s))
                .collect();
            list.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id)));
            list.into_iter().map(|o| data.order_view(o)).collect()
        }))
    }

    async fn list_all(&self, page: &PageRequest) -> Result<(Vec<OrderView>, u64), DbErr> {
        Ok(self.read(|data| {
            let mut list = data.orders.clone();
            let total = list.len() as u64;
            match page.sort.as_str() {
                "totalprice" => sort_desc(&mut list, |o| o.total_price, page.descending),
                "id" => sort_desc(&mut list, |o| o.id, page.descending),
                _ => sort_desc(&mut list, |o| (o.created_at, o.id), page.descending),
            }
            let views = paginate(list, page).iter().map(|o| data.order_view(o)).collect();
            (views, total)
        }))
    }

    async fn update_header(&self, order: orders::Model) -> Result<orders::Model, DbErr> {
        self.write(|data| {
            let slot = data
                .orders
                .iter_mut()
                .find(|o| o.id == order.id)
                .ok_or_else(|| not_found("order"))?;
            *slot = orders::Model { updated_at: Utc::now(), ..order };
            Ok(slot.clone())
        })
    }

    async fn delete(&self, id: i32) -> Result<(), DbErr> {
        self.write(|data| {
            data.order_items.retain(|i| i.order_id != id);
            data.orders.retain(|o| o.id != id);
        });
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, DbErr> {
        let snapshot = self.read(|data| data.clone());
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            snapshot,
        }))
    }
}

/// Travaille sur une copie des données; commit() remplace l'état partagé
pub struct MemoryTransaction {
    store: MemoryStore,
    snapshot: StoreData,
}

#[async_trait]
impl OrderTransaction for MemoryTransaction {
    async fn lock_product(&mut self, id: i32) -> Result<Option<products::Model>, DbErr> {
        Ok(self
            .snapshot
            .products
            .iter()
            .find(|p| p.id == id && p.deleted_at.is_none())
            .cloned())
    }

    async fn set_stock(&mut self, product_id: i32, quantity: i32) -> Result<(), DbErr> {
        let product = self
            .snapshot
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| not_found("product"))?;
        product.quantity = quantity;
        Ok(())
    }

    async fn delete_items(&mut self, order_id: i32) -> Result<(), DbErr> {
        self.snapshot.order_items.retain(|i| i.order_id != order_id);
        Ok(())
    }

    async fn insert_order(&mut self, draft: OrderDraft) -> Result<orders::Model, DbErr> {
        let now = Utc::now();
        let order = orders::Model {
            id: self.snapshot.next_id(),
            user_id: draft.user_id,
            total_price: draft.total_price,
            status: draft.status,
            payment_method: draft.payment_method,
            address_id: draft.address_id,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        self.snapshot.orders.push(order.clone());
        Ok(order)
    }

    async fn update_order(&mut self, order: orders::Model) -> Result<orders::Model, DbErr> {
        let slot = self
            .snapshot
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| not_found("order"))?;
        *slot = orders::Model { updated_at: Utc::now(), ..order };
        Ok(slot.clone())
    }

    async fn insert_items(&mut self, order_id: i32, lines: &[PricedLine]) -> Result<(), DbErr> {
        for line in lines {
            let id = self.snapshot.next_id();
            self.snapshot.order_items.push(order_items::Model {
                id,
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbErr> {
        let MemoryTransaction { store, snapshot } = *self;
        store.write(|data| *data = snapshot);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Reports
// ----------------------------------------------------------------------------

fn bucket_start(bucket: TrendBucket, at: DateTime<Utc>) -> chrono::NaiveDate {
    let day = at.date_naive();
    match bucket {
        TrendBucket::Daily => day,
        // date_trunc('week') commence le lundi
        TrendBucket::Weekly => day - Duration::days(day.weekday().num_days_from_monday() as i64),
        TrendBucket::Monthly => day.with_day(1).unwrap_or(day),
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn revenue_by_category(&self, window: &DateWindow) -> Result<Vec<CategoryRevenueRow>, DbErr> {
        Ok(self.read(|data| {
            let order_ids: Vec<i32> = data.revenue_orders(window).iter().map(|o| o.id).collect();
            let mut rows: Vec<CategoryRevenueRow> = Vec::new();
            for item in data.order_items.iter().filter(|i| order_ids.contains(&i.order_id)) {
                let Some(product) = data.products.iter().find(|p| p.id == item.product_id) else {
                    continue;
                };
                let Some(category) = data.categories.iter().find(|c| c.id == product.category_id) else {
                    continue;
                };
                match rows.iter_mut().find(|r| r.category_id == category.id) {
                    Some(row) => row.total_revenue += item.price,
                    None => rows.push(CategoryRevenueRow {
                        category_id: category.id,
                        category_name: category.name.clone(),
                        total_revenue: item.price,
                    }),
                }
            }
            rows.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue).then(a.category_id.cmp(&b.category_id)));
            rows
        }))
    }

    async fn revenue_and_orders(&self, window: &DateWindow) -> Result<(Decimal, u64), DbErr> {
        Ok(self.read(|data| {
            let orders = data.revenue_orders(window);
            let revenue = orders.iter().map(|o| data.order_total(o.id)).sum();
            (revenue, orders.len() as u64)
        }))
    }

    async fn count_products(&self) -> Result<u64, DbErr> {
        Ok(self.read(|data| data.products.iter().filter(|p| p.deleted_at.is_none()).count() as u64))
    }

    async fn count_users_since(&self, since: DateTime<Utc>) -> Result<u64, DbErr> {
        Ok(self.read(|data| {
            data.users
                .iter()
                .filter(|u| u.deleted_at.is_none() && u.created_at >= since)
                .count() as u64
        }))
    }

    async fn count_orders_with_status(&self, status: OrderStatus) -> Result<u64, DbErr> {
        Ok(self.read(|data| data.orders.iter().filter(|o| o.status == status).count() as u64))
    }

    async fn count_low_stock(&self, threshold: i32) -> Result<u64, DbErr> {
        Ok(self.read(|data| {
            data.products
                .iter()
                .filter(|p| p.deleted_at.is_none() && p.quantity <= threshold)
                .count() as u64
        }))
    }

    async fn sales_trend(&self, bucket: TrendBucket, since: DateTime<Utc>) -> Result<Vec<TrendPoint>, DbErr> {
        Ok(self.read(|data| {
            let mut points: Vec<(chrono::NaiveDate, Decimal, i64)> = Vec::new();
            for order in data
                .orders
                .iter()
                .filter(|o| o.status.is_revenue() && o.created_at >= since)
            {
                let total = data.order_total(order.id);
                let key = bucket_start(bucket, order.created_at);
                match points.iter_mut().find(|(d, _, _)| *d == key) {
                    Some((_, revenue, count)) => {
                        *revenue += total;
                        *count += 1;
                    }
                    None => points.push((key, total, 1)),
                }
            }
            points.sort_by_key(|(d, _, _)| *d);
            points
                .into_iter()
                .map(|(date, revenue, order_count)| TrendPoint {
                    date: date.format("%Y-%m-%d").to_string(),
                    revenue,
                    order_count,
                })
                .collect()
        }))
    }
}
