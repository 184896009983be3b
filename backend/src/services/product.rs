//! Product catalog service: products, recipes and bundle conversions

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{unique_violation, validation_errors, AppError, AppResult};
use shared::apportionment::validate_margin;
use shared::{
    recipe_cost, validate_cost_weight, BundleConversion, Money, Product, ProductCost, ProductDetail,
};

/// Product service for managing the catalog
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    default_profit_margin: Decimal,
}

/// Database row for a product
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    category: Option<String>,
    price: Decimal,
    pub cost: Decimal,
    profit_margin: Decimal,
    stock: i32,
    pub is_main_product: bool,
    pub cost_weight: Decimal,
    pub is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            category: row.category,
            price: Money::new(row.price),
            cost: Money::new(row.cost),
            profit_margin: row.profit_margin,
            stock: row.stock,
            is_main_product: row.is_main_product,
            cost_weight: row.cost_weight,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = r#"id, user_id, name, description, category, price, cost,
    profit_margin, stock, is_main_product, cost_weight, is_active, created_at, updated_at"#;

#[derive(Debug, sqlx::FromRow)]
struct ProductCostRow {
    id: Uuid,
    product_id: Uuid,
    ingredient_id: Uuid,
    ingredient_name: String,
    quantity: Decimal,
    portion_cost: Decimal,
}

impl From<ProductCostRow> for ProductCost {
    fn from(row: ProductCostRow) -> Self {
        ProductCost {
            line_cost: Money::new(row.portion_cost * row.quantity),
            id: row.id,
            product_id: row.product_id,
            ingredient_id: row.ingredient_id,
            ingredient_name: row.ingredient_name,
            quantity: row.quantity,
            portion_cost: row.portion_cost,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BundleRow {
    id: Uuid,
    user_id: Uuid,
    bundle_product_id: Uuid,
    component_product_id: Uuid,
    units_per_bundle: Decimal,
    created_at: DateTime<Utc>,
}

impl From<BundleRow> for BundleConversion {
    fn from(row: BundleRow) -> Self {
        BundleConversion {
            id: row.id,
            user_id: row.user_id,
            bundle_product_id: row.bundle_product_id,
            component_product_id: row.component_product_id,
            units_per_bundle: row.units_per_bundle,
            created_at: row.created_at,
        }
    }
}

const BUNDLE_COLUMNS: &str =
    "id, user_id, bundle_product_id, component_product_id, units_per_bundle, created_at";

/// Recipe line of a product request
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeLineInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub price: Money,
    /// Used when no recipe is given
    pub cost: Option<Money>,
    pub profit_margin: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_main_product: bool,
    pub cost_weight: Option<Decimal>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub recipe: Vec<RecipeLineInput>,
}

/// Input for updating a product. A present `recipe` replaces the stored one.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub price: Option<Money>,
    pub cost: Option<Money>,
    pub profit_margin: Option<Decimal>,
    pub stock: Option<i32>,
    pub is_main_product: Option<bool>,
    pub cost_weight: Option<Decimal>,
    pub is_active: Option<bool>,
    pub recipe: Option<Vec<RecipeLineInput>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub category: Option<String>,
    pub active_only: Option<bool>,
}

/// Input for a bundle conversion
#[derive(Debug, Deserialize)]
pub struct CreateBundleInput {
    pub bundle_product_id: Uuid,
    pub component_product_id: Uuid,
    pub units_per_bundle: Decimal,
}

fn check_product_numbers(
    price: Option<Money>,
    cost: Option<Money>,
    margin: Option<Decimal>,
    cost_weight: Option<Decimal>,
) -> AppResult<()> {
    if let Some(price) = price {
        shared::validate_non_negative_amount(price).map_err(|msg| {
            AppError::validation("price", msg.to_string(), "El precio no puede ser negativo".to_string())
        })?;
    }
    if let Some(cost) = cost {
        shared::validate_non_negative_amount(cost).map_err(|msg| {
            AppError::validation("cost", msg.to_string(), "El costo no puede ser negativo".to_string())
        })?;
    }
    if let Some(margin) = margin {
        validate_margin(margin)?;
    }
    if let Some(weight) = cost_weight {
        validate_cost_weight(weight).map_err(|msg| {
            AppError::validation("cost_weight", msg.to_string(), "Peso de costo inválido".to_string())
        })?;
    }
    Ok(())
}

/// Replace a product's recipe and return the resulting unit cost
async fn store_recipe(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    recipe: &[RecipeLineInput],
) -> AppResult<Money> {
    if let Some(index) = recipe.iter().position(|l| l.quantity <= Decimal::ZERO) {
        return Err(AppError::validation(
            format!("recipe[{}].quantity", index),
            "Recipe quantity must be greater than zero".to_string(),
            "La cantidad de la receta debe ser mayor que cero".to_string(),
        ));
    }

    let ids: Vec<Uuid> = recipe.iter().map(|l| l.ingredient_id).collect();
    let portion_costs: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT id, portion_cost FROM ingredients WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(user_id)
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    sqlx::query("DELETE FROM product_costs WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let mut lines = Vec::with_capacity(recipe.len());
    for line in recipe {
        let portion_cost = portion_costs
            .get(&line.ingredient_id)
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        sqlx::query(
            "INSERT INTO product_costs (user_id, product_id, ingredient_id, quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(line.ingredient_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;

        lines.push((*portion_cost, line.quantity));
    }

    Ok(recipe_cost(lines.iter().map(|(c, q)| (c, q))))
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool, default_profit_margin: Decimal) -> Self {
        Self {
            db,
            default_profit_margin,
        }
    }

    /// List products
    pub async fn list_products(&self, user_id: Uuid, query: ListProductsQuery) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE user_id = $1
              AND ($2::text IS NULL OR category = $2)
              AND (NOT $3 OR is_active)
            ORDER BY name ASC
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(user_id)
        .bind(&query.category)
        .bind(query.active_only.unwrap_or(false))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub(crate) async fn find_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1 AND user_id = $2",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::ProductNotFound(product_id))?;

        Ok(row.into())
    }

    /// Get a product with its recipe
    pub async fn get_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<ProductDetail> {
        let product = self.find_product(user_id, product_id).await?;

        let recipe = sqlx::query_as::<_, ProductCostRow>(
            r#"
            SELECT pc.id, pc.product_id, pc.ingredient_id, i.name AS ingredient_name,
                   pc.quantity, i.portion_cost
            FROM product_costs pc
            JOIN ingredients i ON i.id = pc.ingredient_id
            WHERE pc.product_id = $1 AND pc.user_id = $2
            ORDER BY i.name ASC
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ProductDetail {
            product,
            recipe: recipe.into_iter().map(ProductCost::from).collect(),
        })
    }

    /// Create a product. With a recipe, its cost is the recipe cost.
    pub async fn create_product(&self, user_id: Uuid, input: CreateProductInput) -> AppResult<ProductDetail> {
        input.validate().map_err(validation_errors)?;
        let margin = input.profit_margin.unwrap_or(self.default_profit_margin);
        check_product_numbers(Some(input.price), input.cost, Some(margin), input.cost_weight)?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (user_id, name, description, category, price, cost, profit_margin,
                                  stock, is_main_product, cost_weight, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price.amount())
        .bind(input.cost.unwrap_or(Money::ZERO).amount())
        .bind(margin)
        .bind(input.stock)
        .bind(input.is_main_product)
        .bind(input.cost_weight.unwrap_or(Decimal::ONE))
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        if !input.recipe.is_empty() {
            let cost = store_recipe(&mut tx, user_id, row.id, &input.recipe).await?;
            sqlx::query("UPDATE products SET cost = $1 WHERE id = $2")
                .bind(cost.amount())
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(user_id = %user_id, product_id = %row.id, "Product created");
        self.get_product(user_id, row.id).await
    }

    /// Update a product
    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductDetail> {
        input.validate().map_err(validation_errors)?;
        check_product_numbers(input.price, input.cost, input.profit_margin, input.cost_weight)?;

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                category = COALESCE($3, category),
                price = COALESCE($4, price),
                cost = COALESCE($5, cost),
                profit_margin = COALESCE($6, profit_margin),
                stock = COALESCE($7, stock),
                is_main_product = COALESCE($8, is_main_product),
                cost_weight = COALESCE($9, cost_weight),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE id = $11 AND user_id = $12
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price.map(|m| m.amount()))
        .bind(input.cost.map(|m| m.amount()))
        .bind(input.profit_margin)
        .bind(input.stock)
        .bind(input.is_main_product)
        .bind(input.cost_weight)
        .bind(input.is_active)
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Err(AppError::ProductNotFound(product_id));
        }

        if let Some(recipe) = input.recipe.as_deref() {
            let cost = store_recipe(&mut tx, user_id, product_id, recipe).await?;
            if !recipe.is_empty() {
                sqlx::query("UPDATE products SET cost = $1 WHERE id = $2")
                    .bind(cost.amount())
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        self.get_product(user_id, product_id).await
    }

    /// Delete a product
    pub async fn delete_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ProductNotFound(product_id));
        }

        tracing::info!(user_id = %user_id, product_id = %product_id, "Product deleted");
        Ok(())
    }

    /// List bundle conversions
    pub async fn list_bundles(&self, user_id: Uuid) -> AppResult<Vec<BundleConversion>> {
        let rows = sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundle_conversions WHERE user_id = $1 ORDER BY created_at ASC",
            BUNDLE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(BundleConversion::from).collect())
    }

    /// Register that a bundle product counts as units of a component product
    pub async fn create_bundle(&self, user_id: Uuid, input: CreateBundleInput) -> AppResult<BundleConversion> {
        if input.units_per_bundle <= Decimal::ZERO {
            return Err(AppError::validation(
                "units_per_bundle",
                "Units per bundle must be greater than zero".to_string(),
                "Las unidades por combo deben ser mayores que cero".to_string(),
            ));
        }
        if input.bundle_product_id == input.component_product_id {
            return Err(AppError::validation(
                "component_product_id",
                "A bundle cannot contain itself".to_string(),
                "Un combo no puede contenerse a sí mismo".to_string(),
            ));
        }

        for id in [input.bundle_product_id, input.component_product_id] {
            self.find_product(user_id, id).await?;
        }

        let result = sqlx::query_as::<_, BundleRow>(&format!(
            r#"
            INSERT INTO bundle_conversions (user_id, bundle_product_id, component_product_id, units_per_bundle)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BUNDLE_COLUMNS
        ))
        .bind(user_id)
        .bind(input.bundle_product_id)
        .bind(input.component_product_id)
        .bind(input.units_per_bundle)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(err) if unique_violation(&err).is_some() => {
                Err(AppError::DuplicateEntry("bundle conversion".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_bundle(&self, user_id: Uuid, bundle_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM bundle_conversions WHERE id = $1 AND user_id = $2")
            .bind(bundle_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Bundle conversion".to_string()));
        }
        Ok(())
    }
}
