//! Ingredient inventory service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{validation_errors, AppError, AppResult};
use shared::{convert_to_portions, portion_figures, reduce_stock, Ingredient, Money};

#[derive(Clone)]
pub struct IngredientService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct IngredientRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    code: Option<String>,
    description: Option<String>,
    unit: String,
    quantity_purchased: Decimal,
    purchase_value: Decimal,
    portion_quantity: Decimal,
    portion_unit: String,
    price: Decimal,
    portion_cost: Decimal,
    stock: i32,
    min_stock: i32,
    max_stock: Option<i32>,
    supplier: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Ingredient {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            code: row.code,
            description: row.description,
            unit: row.unit,
            quantity_purchased: row.quantity_purchased,
            purchase_value: Money::new(row.purchase_value),
            portion_quantity: row.portion_quantity,
            portion_unit: row.portion_unit,
            price: row.price,
            portion_cost: row.portion_cost,
            stock: row.stock,
            min_stock: row.min_stock,
            max_stock: row.max_stock,
            supplier: row.supplier,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INGREDIENT_COLUMNS: &str = r#"id, user_id, name, code, description, unit, quantity_purchased,
    purchase_value, portion_quantity, portion_unit, price, portion_cost, stock, min_stock,
    max_stock, supplier, location, created_at, updated_at"#;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIngredientInput {
    #[validate(length(min = 1, max = 255, message = "Ingredient name is required"))]
    pub name: String,
    #[validate(length(max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Unit is required"))]
    pub unit: String,
    pub quantity_purchased: Decimal,
    pub purchase_value: Money,
    pub portion_quantity: Decimal,
    #[validate(length(min = 1, max = 20, message = "Portion unit is required"))]
    pub portion_unit: String,
    #[serde(default)]
    pub min_stock: i32,
    pub max_stock: Option<i32>,
    pub supplier: Option<String>,
    pub location: Option<String>,
}

/// Changing any purchase figure recomputes price, portion cost and stock
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateIngredientInput {
    #[validate(length(min = 1, max = 255, message = "Ingredient name is required"))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    pub quantity_purchased: Option<Decimal>,
    pub purchase_value: Option<Money>,
    pub portion_quantity: Option<Decimal>,
    #[validate(length(min = 1, max = 20))]
    pub portion_unit: Option<String>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub supplier: Option<String>,
    pub location: Option<String>,
}

/// Quantity in the ingredient's purchase unit
#[derive(Debug, Deserialize)]
pub struct StockChangeInput {
    pub quantity: Decimal,
    pub notes: Option<String>,
}

fn check_purchase(quantity_purchased: Decimal, portion_quantity: Decimal, purchase_value: Money) -> AppResult<()> {
    if quantity_purchased <= Decimal::ZERO {
        return Err(AppError::validation(
            "quantity_purchased",
            "Purchased quantity must be greater than zero".to_string(),
            "La cantidad comprada debe ser mayor que cero".to_string(),
        ));
    }
    if portion_quantity <= Decimal::ZERO {
        return Err(AppError::validation(
            "portion_quantity",
            "Portion quantity must be greater than zero".to_string(),
            "La cantidad por porción debe ser mayor que cero".to_string(),
        ));
    }
    shared::validate_non_negative_amount(purchase_value).map_err(|msg| {
        AppError::validation("purchase_value", msg.to_string(), "El valor de compra no puede ser negativo".to_string())
    })
}

impl IngredientService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_ingredients(&self, user_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE user_id = $1 ORDER BY name ASC",
            INGREDIENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    /// Ingredients at or below their minimum stock
    pub async fn low_stock(&self, user_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE user_id = $1 AND stock <= min_stock ORDER BY stock ASC, name ASC",
            INGREDIENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    pub async fn get_ingredient(&self, user_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1 AND user_id = $2",
            INGREDIENT_COLUMNS
        ))
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        Ok(row.into())
    }

    pub async fn create_ingredient(&self, user_id: Uuid, input: CreateIngredientInput) -> AppResult<Ingredient> {
        input.validate().map_err(validation_errors)?;
        check_purchase(input.quantity_purchased, input.portion_quantity, input.purchase_value)?;

        let figures = portion_figures(
            input.purchase_value,
            input.quantity_purchased,
            &input.unit,
            input.portion_quantity,
            &input.portion_unit,
        )?;

        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            r#"
            INSERT INTO ingredients (user_id, name, code, description, unit, quantity_purchased,
                purchase_value, portion_quantity, portion_unit, price, portion_cost, stock,
                min_stock, max_stock, supplier, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            INGREDIENT_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.code)
        .bind(&input.description)
        .bind(&input.unit)
        .bind(input.quantity_purchased)
        .bind(input.purchase_value.amount())
        .bind(input.portion_quantity)
        .bind(&input.portion_unit)
        .bind(figures.price)
        .bind(figures.portion_cost)
        .bind(figures.stock)
        .bind(input.min_stock)
        .bind(input.max_stock)
        .bind(&input.supplier)
        .bind(&input.location)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user_id, ingredient_id = %row.id, stock = figures.stock, "Ingredient created");
        Ok(row.into())
    }

    pub async fn update_ingredient(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
        input: UpdateIngredientInput,
    ) -> AppResult<Ingredient> {
        input.validate().map_err(validation_errors)?;
        let current = self.get_ingredient(user_id, ingredient_id).await?;

        let unit = input.unit.clone().unwrap_or(current.unit.clone());
        let portion_unit = input.portion_unit.clone().unwrap_or(current.portion_unit.clone());
        let quantity_purchased = input.quantity_purchased.unwrap_or(current.quantity_purchased);
        let purchase_value = input.purchase_value.unwrap_or(current.purchase_value);
        let portion_quantity = input.portion_quantity.unwrap_or(current.portion_quantity);
        check_purchase(quantity_purchased, portion_quantity, purchase_value)?;

        let repriced = input.unit.is_some()
            || input.portion_unit.is_some()
            || input.quantity_purchased.is_some()
            || input.purchase_value.is_some()
            || input.portion_quantity.is_some();

        let (price, portion_cost, stock) = if repriced {
            let figures = portion_figures(purchase_value, quantity_purchased, &unit, portion_quantity, &portion_unit)?;
            (figures.price, figures.portion_cost, figures.stock)
        } else {
            (current.price, current.portion_cost, current.stock)
        };

        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            r#"
            UPDATE ingredients
            SET name = COALESCE($1, name),
                code = COALESCE($2, code),
                description = COALESCE($3, description),
                unit = $4,
                quantity_purchased = $5,
                purchase_value = $6,
                portion_quantity = $7,
                portion_unit = $8,
                price = $9,
                portion_cost = $10,
                stock = $11,
                min_stock = COALESCE($12, min_stock),
                max_stock = COALESCE($13, max_stock),
                supplier = COALESCE($14, supplier),
                location = COALESCE($15, location),
                updated_at = NOW()
            WHERE id = $16 AND user_id = $17
            RETURNING {}
            "#,
            INGREDIENT_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(&unit)
        .bind(quantity_purchased)
        .bind(purchase_value.amount())
        .bind(portion_quantity)
        .bind(&portion_unit)
        .bind(price)
        .bind(portion_cost)
        .bind(stock)
        .bind(input.min_stock)
        .bind(input.max_stock)
        .bind(&input.supplier)
        .bind(&input.location)
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        Ok(row.into())
    }

    pub async fn delete_ingredient(&self, user_id: Uuid, ingredient_id: Uuid) -> AppResult<()> {
        let used = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product_costs WHERE ingredient_id = $1 AND user_id = $2)",
        )
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        if used {
            return Err(AppError::Conflict {
                resource: "ingredient".to_string(),
                message: "Ingredient is used by a product recipe".to_string(),
                message_es: "El ingrediente se usa en la receta de un producto".to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1 AND user_id = $2")
            .bind(ingredient_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }
        Ok(())
    }

    /// Add purchased quantity, converted to whole portions
    pub async fn add_stock(&self, user_id: Uuid, ingredient_id: Uuid, input: StockChangeInput) -> AppResult<Ingredient> {
        self.change_stock(user_id, ingredient_id, input, true).await
    }

    /// Remove quantity; stock never goes below zero
    pub async fn reduce_stock(&self, user_id: Uuid, ingredient_id: Uuid, input: StockChangeInput) -> AppResult<Ingredient> {
        self.change_stock(user_id, ingredient_id, input, false).await
    }

    async fn change_stock(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
        input: StockChangeInput,
        increase: bool,
    ) -> AppResult<Ingredient> {
        if input.quantity <= Decimal::ZERO {
            return Err(AppError::validation(
                "quantity",
                "Quantity must be greater than zero".to_string(),
                "La cantidad debe ser mayor que cero".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1 AND user_id = $2 FOR UPDATE",
            INGREDIENT_COLUMNS
        ))
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        let portions = convert_to_portions(input.quantity, &current.unit, current.portion_quantity, &current.portion_unit);
        let new_stock = if increase {
            current.stock.saturating_add(portions)
        } else {
            reduce_stock(current.stock, portions)?
        };

        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            "UPDATE ingredients SET stock = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3 RETURNING {}",
            INGREDIENT_COLUMNS
        ))
        .bind(new_stock)
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            ingredient_id = %ingredient_id,
            portions,
            previous = current.stock,
            stock = new_stock,
            notes = input.notes.as_deref().unwrap_or(""),
            "Ingredient stock changed"
        );

        Ok(row.into())
    }
}
