// ============================================================================
// SERVICE : CATALOGUE (PRODUITS / CATÉGORIES)
// ============================================================================
//
// Règles:
//   - un nom de produit est unique dans sa catégorie
//   - prix >= 0, quantité >= 0, la catégorie doit exister
//   - les créations en masse ignorent les doublons (message dans `skipped`)
//     mais échouent entièrement si une entrée est invalide
//
// Upload multipart: tableaux parallèles name[], description[], price[],
// quantity[], category_id[] + images[] partagées par les produits créés.
//
// ============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult, DbContext};
use crate::models::categories;
use crate::models::dto::{
    BulkCreateResult, NewCategory, NewProduct, PageRequest, Paginated, ProductFilter, ProductUpdate,
    ProductView,
};
use crate::models::products;
use crate::repositories::ProductRepository;
use crate::services::image_store::ImageStore;

/// Fichier reçu dans un formulaire multipart
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    images: ImageStore,
}

fn validate_product(input: &NewProduct) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }
    if input.price < Decimal::ZERO {
        return Err(AppError::validation("Price must not be negative"));
    }
    if input.quantity < 0 {
        return Err(AppError::validation("Quantity must not be negative"));
    }
    Ok(())
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductRepository>, images: ImageStore) -> Self {
        Self { products, images }
    }

    async fn ensure_category(&self, category_id: i32) -> AppResult<categories::Model> {
        self.products
            .find_category(category_id)
            .await
            .context("Failed to load category")?
            .ok_or_else(|| AppError::not_found(format!("Category {} not found", category_id)))
    }

    async fn is_duplicate(&self, name: &str, category_id: i32, exclude: Option<i32>) -> AppResult<bool> {
        let existing = self
            .products
            .find_by_name_and_category(name, category_id)
            .await
            .context("Failed to check product")?;
        Ok(existing.is_some_and(|p| Some(p.id) != exclude))
    }

    pub async fn create_product(&self, mut input: NewProduct) -> AppResult<products::Model> {
        input.name = input.name.trim().to_string();
        validate_product(&input)?;
        self.ensure_category(input.category_id).await?;

        if self.is_duplicate(&input.name, input.category_id, None).await? {
            return Err(AppError::conflict("product already exists in this category"));
        }

        let product = self
            .products
            .create_product(input)
            .await
            .context("Failed to create product")?;
        tracing::info!(product_id = product.id, name = %product.name, "📦 Product created");
        Ok(product)
    }

    /// Création en masse: validation complète d'abord, puis doublons ignorés
    pub async fn create_products(&self, inputs: Vec<NewProduct>) -> AppResult<BulkCreateResult<products::Model>> {
        if inputs.is_empty() {
            return Err(AppError::validation("No products provided"));
        }

        let mut inputs: Vec<NewProduct> = inputs
            .into_iter()
            .map(|mut p| {
                p.name = p.name.trim().to_string();
                p
            })
            .collect();
        for input in &inputs {
            validate_product(input)?;
        }
        let category_ids: HashSet<i32> = inputs.iter().map(|p| p.category_id).collect();
        for category_id in category_ids {
            self.ensure_category(category_id).await?;
        }

        let mut result = BulkCreateResult {
            created: Vec::new(),
            skipped: Vec::new(),
        };
        let mut seen: HashSet<(String, i32)> = HashSet::new();

        for input in inputs.drain(..) {
            let key = (input.name.clone(), input.category_id);
            if seen.contains(&key) || self.is_duplicate(&input.name, input.category_id, None).await? {
                result.skipped.push(format!(
                    "product '{}' already exists in category {}",
                    input.name, input.category_id
                ));
                continue;
            }
            seen.insert(key);

            let product = self
                .products
                .create_product(input)
                .await
                .context("Failed to create product")?;
            result.created.push(product);
        }

        tracing::info!(
            created = result.created.len(),
            skipped = result.skipped.len(),
            "📦 Bulk product creation"
        );
        Ok(result)
    }

    /// Crée les produits puis enregistre les images une fois par catégorie
    /// et les rattache à chaque produit créé de cette catégorie
    pub async fn upload_products(
        &self,
        inputs: Vec<NewProduct>,
        images: Vec<UploadedImage>,
    ) -> AppResult<BulkCreateResult<ProductView>> {
        let created = self.create_products(inputs).await?;

        let mut by_category: HashMap<i32, Vec<i32>> = HashMap::new();
        for product in &created.created {
            by_category.entry(product.category_id).or_default().push(product.id);
        }

        for (category_id, product_ids) in &by_category {
            let mut paths = Vec::with_capacity(images.len());
            for image in &images {
                paths.push(self.images.save(*category_id, &image.file_name, &image.bytes).await?);
            }
            for product_id in product_ids {
                self.products
                    .add_images(*product_id, &paths)
                    .await
                    .context("Failed to save product images")?;
            }
        }

        let mut views = Vec::with_capacity(created.created.len());
        for product in &created.created {
            views.push(self.get_product(product.id).await?);
        }

        Ok(BulkCreateResult {
            created: views,
            skipped: created.skipped,
        })
    }

    pub async fn update_product(&self, id: i32, update: ProductUpdate) -> AppResult<ProductView> {
        let mut product = self.get_product(id).await?.product;

        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(quantity) = update.quantity {
            product.quantity = quantity;
        }
        if let Some(category_id) = update.category_id {
            self.ensure_category(category_id).await?;
            product.category_id = category_id;
        }

        validate_product(&NewProduct {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            quantity: product.quantity,
            category_id: product.category_id,
        })?;

        if self.is_duplicate(&product.name, product.category_id, Some(id)).await? {
            return Err(AppError::conflict("product already exists in this category"));
        }

        self.products
            .update_product(product)
            .await
            .context("Failed to update product")?;
        self.get_product(id).await
    }

    pub async fn delete_product(&self, id: i32) -> AppResult<()> {
        self.get_product(id).await?;
        self.products
            .soft_delete_product(id)
            .await
            .context("Failed to delete product")?;
        tracing::info!(product_id = id, "🗑️ Product deleted");
        Ok(())
    }

    pub async fn get_product(&self, id: i32) -> AppResult<ProductView> {
        self.products
            .find_product(id)
            .await
            .context("Failed to load product")?
            .ok_or_else(|| AppError::not_found("Product not found"))
    }

    pub async fn get_product_by_name(&self, name: &str) -> AppResult<ProductView> {
        self.products
            .find_by_name(name.trim())
            .await
            .context("Failed to load product")?
            .ok_or_else(|| AppError::not_found("Product not found"))
    }

    pub async fn list_all(&self) -> AppResult<Vec<ProductView>> {
        self.products.list_products().await.context("Failed to list products")
    }

    pub async fn search(&self, filter: &ProductFilter) -> AppResult<Paginated<ProductView>> {
        let (items, total) = self
            .products
            .search_products(filter)
            .await
            .context("Failed to search products")?;
        Ok(Paginated::new(items, total, &filter.page))
    }

    /// Produits les plus récents d'abord
    pub async fn new_arrivals(&self, page: Option<i64>, limit: Option<i64>) -> AppResult<Paginated<ProductView>> {
        let filter = ProductFilter {
            page: PageRequest::new(page, limit, Some("createdat"), Some("desc")),
            min_price: None,
            max_price: None,
            search: None,
            category_id: None,
        };
        self.search(&filter).await
    }

    pub async fn by_category(&self, category_id: i32, mut filter: ProductFilter) -> AppResult<Paginated<ProductView>> {
        self.ensure_category(category_id).await?;
        filter.category_id = Some(category_id);
        self.search(&filter).await
    }

    pub async fn create_category(&self, input: NewCategory) -> AppResult<categories::Model> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Category name is required"));
        }

        let existing = self
            .products
            .find_category_by_name(&name)
            .await
            .context("Failed to check category")?;
        if existing.is_some() {
            return Err(AppError::conflict("Category already exists"));
        }

        let category = self
            .products
            .create_category(NewCategory {
                name,
                description: input.description,
            })
            .await
            .context("Failed to create category")?;
        tracing::info!(category_id = category.id, name = %category.name, "🏷️ Category created");
        Ok(category)
    }

    pub async fn create_categories(&self, inputs: Vec<NewCategory>) -> AppResult<BulkCreateResult<categories::Model>> {
        if inputs.is_empty() {
            return Err(AppError::validation("No categories provided"));
        }
        if inputs.iter().any(|c| c.name.trim().is_empty()) {
            return Err(AppError::validation("Category name is required"));
        }

        let mut result = BulkCreateResult {
            created: Vec::new(),
            skipped: Vec::new(),
        };
        for input in inputs {
            let name = input.name.trim().to_string();
            match self.create_category(input).await {
                Ok(category) => result.created.push(category),
                Err(AppError::Conflict(_)) => {
                    result.skipped.push(format!("category '{}' already exists", name));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<categories::Model>> {
        self.products.list_categories().await.context("Failed to list categories")
    }
}

/// Reconstruit les produits depuis les champs texte d'un formulaire multipart.
/// Les tableaux doivent avoir la même longueur que `name`.
pub fn products_from_form(fields: &HashMap<String, Vec<String>>) -> AppResult<Vec<NewProduct>> {
    let column = |key: &str| fields.get(key).map(Vec::as_slice).unwrap_or(&[]);

    let names = column("name");
    if names.is_empty() {
        return Err(AppError::validation("At least one product name is required"));
    }
    let descriptions = column("description");
    let prices = column("price");
    let quantities = column("quantity");
    let category_ids = column("category_id");

    if prices.len() != names.len() || quantities.len() != names.len() || category_ids.len() != names.len() {
        return Err(AppError::validation(
            "name, price, quantity and category_id must have the same length",
        ));
    }

    let mut products = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let price: Decimal = prices[i]
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid price at index {}", i)))?;
        let quantity: i32 = quantities[i]
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid quantity at index {}", i)))?;
        let category_id: i32 = category_ids[i]
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid category_id at index {}", i)))?;

        products.push(NewProduct {
            name: name.clone(),
            description: descriptions.get(i).cloned().unwrap_or_default(),
            price,
            quantity,
            category_id,
        });
    }
    Ok(products)
}
