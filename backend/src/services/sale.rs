//! Sale recording and reversal service

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{validation_errors, AppError, AppResult};
use crate::services::credit::RELEASE_CREDIT_SQL;
use crate::services::customer::upsert_customer;
use shared::{
    check_totals, payment_breakdown, plan_reversal, settle_sale, stock_decrements, BusinessCalendar,
    CustomerContact, DateRange, Money, Pagination, PaginatedResponse, PaymentBreakdown,
    PaymentMethod, Sale, SaleLineItem, SaleStatus, SaleTotals, StockMovementType,
};

/// Sale service for recording and reversing sales
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    calendar: BusinessCalendar,
}

/// Database row for a sale
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SaleRow {
    id: Uuid,
    user_id: Uuid,
    customer_id: Option<Uuid>,
    customer_name: String,
    customer_document: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    items: Json<Vec<SaleLineItem>>,
    subtotal: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    payment_method: String,
    cash_received: Decimal,
    change_amount: Decimal,
    remaining_balance: Decimal,
    transaction_number: Option<String>,
    status: String,
    sale_date: Option<NaiveDate>,
    reversal_reason: Option<String>,
    reversed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = AppError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Sale {
            id: row.id,
            user_id: row.user_id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            customer_document: row.customer_document,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            items: row.items.0,
            subtotal: Money::new(row.subtotal),
            tax: Money::new(row.tax),
            discount: Money::new(row.discount),
            total: Money::new(row.total),
            payment_method: PaymentMethod::from_str(&row.payment_method)?,
            cash_received: Money::new(row.cash_received),
            change_amount: Money::new(row.change_amount),
            remaining_balance: Money::new(row.remaining_balance),
            transaction_number: row.transaction_number,
            status: SaleStatus::from_str(&row.status)?,
            sale_date: row.sale_date,
            reversal_reason: row.reversal_reason,
            reversed_at: row.reversed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) const SALE_COLUMNS: &str = r#"id, user_id, customer_id, customer_name, customer_document,
    customer_phone, customer_email, items, subtotal, tax, discount, total, payment_method,
    cash_received, change_amount, remaining_balance, transaction_number, status, sale_date,
    reversal_reason, reversed_at, created_at, updated_at"#;

/// A sale as listed to clients, with its cash/credit breakdown
#[derive(Debug, Clone, Serialize)]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    pub payment_breakdown: PaymentBreakdown,
}

impl From<Sale> for SaleView {
    fn from(sale: Sale) -> Self {
        let payment_breakdown = payment_breakdown(
            sale.payment_method,
            sale.total,
            sale.cash_received,
            sale.remaining_balance,
        );
        SaleView {
            sale,
            payment_breakdown,
        }
    }
}

pub(crate) fn into_views(rows: Vec<SaleRow>) -> AppResult<Vec<SaleView>> {
    rows.into_iter()
        .map(|row| Sale::try_from(row).map(SaleView::from))
        .collect()
}

/// Customer block of a sale request
#[derive(Debug, Deserialize, Validate)]
pub struct SaleCustomerInput {
    #[validate(length(min = 3, max = 20, message = "Document must have 3 to 20 characters"))]
    pub document: String,
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// One line of a sale request
#[derive(Debug, Serialize, Deserialize)]
pub struct SaleItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Money,
}

/// Input for recording a sale
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleInput {
    #[validate]
    pub customer: SaleCustomerInput,
    #[validate(length(min = 1, message = "A sale needs at least one item"))]
    pub items: Vec<SaleItemInput>,
    pub subtotal: Money,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub cash_received: Option<Money>,
    #[validate(length(max = 100))]
    pub transaction_number: Option<String>,
    pub sale_date: Option<NaiveDate>,
}

/// Input for reversing a sale
#[derive(Debug, Deserialize, Validate)]
pub struct ReverseSaleInput {
    #[validate(length(min = 1, max = 500, message = "A reversal reason is required"))]
    pub reason: String,
}

/// Filters for listing sales
#[derive(Debug, Default, Deserialize)]
pub struct ListSalesQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub customer_document: Option<String>,
    pub status: Option<SaleStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Dashboard figures for a month
#[derive(Debug, Clone, Serialize)]
pub struct SalesStats {
    pub month: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_sales: Money,
    pub weekly_sales: Money,
    pub today_sales: Money,
    pub monthly_purchases: Money,
    pub monthly_fixed_costs: Money,
    pub profit_loss: Money,
    pub total_products: i64,
    pub total_ingredients: i64,
    pub low_stock_items: i64,
}

/// A business date range with the UTC instants bounding it, for rows whose
/// business date must fall back to their audit timestamp. A missing side
/// leaves that end of the window open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BusinessWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BusinessWindow {
    pub fn between(
        calendar: &BusinessCalendar,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Self> {
        let start = from.map(|d| calendar.day_bounds(d)).transpose()?.map(|(start, _)| start);
        let end = to.map(|d| calendar.day_bounds(d)).transpose()?.map(|(_, end)| end);
        Ok(Self { from, to, start, end })
    }

    pub fn new(calendar: &BusinessCalendar, range: DateRange) -> AppResult<Self> {
        Self::between(calendar, Some(range.start), Some(range.end))
    }

    pub fn day(calendar: &BusinessCalendar, date: NaiveDate) -> AppResult<Self> {
        Self::new(calendar, DateRange::new(date, date))
    }
}

/// Predicate selecting sales whose business date lies in `$n..$n+3`
/// (from, to, start, end). `sale_date` wins over `created_at`; a NULL
/// parameter leaves its side open.
pub(crate) fn sale_in_window(alias: &str, first_param: usize) -> String {
    format!(
        "(CASE WHEN {a}.sale_date IS NOT NULL \
            THEN (${p0}::date IS NULL OR {a}.sale_date >= ${p0}) AND (${p1}::date IS NULL OR {a}.sale_date <= ${p1}) \
            ELSE (${p2}::timestamptz IS NULL OR {a}.created_at >= ${p2}) AND (${p3}::timestamptz IS NULL OR {a}.created_at < ${p3}) END)",
        a = alias,
        p0 = first_param,
        p1 = first_param + 1,
        p2 = first_param + 2,
        p3 = first_param + 3,
    )
}

pub(crate) fn month_range(month: Option<&str>, today: NaiveDate) -> AppResult<DateRange> {
    let first = match month {
        Some(m) => {
            shared::validate_month(m).map_err(|msg| {
                AppError::validation("month", msg.to_string(), "El mes debe tener la forma AAAA-MM".to_string())
            })?;
            NaiveDate::parse_from_str(&format!("{}-01", m), "%Y-%m-%d")
                .map_err(|e| AppError::ValidationError(e.to_string()))?
        }
        None => today.with_day(1).unwrap_or(today),
    };
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(|| AppError::ValidationError("month out of range".to_string()))?;
    Ok(DateRange::new(first, next - Duration::days(1)))
}

/// Sales of one customer, newest first
pub(crate) async fn customer_sale_views(
    db: &PgPool,
    user_id: Uuid,
    customer_id: Uuid,
) -> AppResult<Vec<SaleView>> {
    let rows = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {} FROM sales WHERE user_id = $1 AND customer_id = $2 ORDER BY created_at DESC, id DESC",
        SALE_COLUMNS
    ))
    .bind(user_id)
    .bind(customer_id)
    .fetch_all(db)
    .await?;

    into_views(rows)
}

/// Decrement or restore stock for each product, recording one movement per product
async fn apply_stock_changes(
    conn: &mut PgConnection,
    user_id: Uuid,
    sale_id: Uuid,
    changes: &[(Uuid, i32)],
    movement_type: StockMovementType,
) -> AppResult<()> {
    // Rows are touched in product id order so concurrent sales lock consistently
    for (product_id, quantity) in changes {
        let delta = movement_type.stock_delta(*quantity);

        let new_stock = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock = stock + $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            RETURNING stock
            "#,
        )
        .bind(delta)
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        let new_stock = match new_stock {
            Some(stock) => stock,
            None if movement_type == StockMovementType::Sale => {
                return Err(AppError::ProductNotFound(*product_id))
            }
            None => {
                tracing::warn!(product_id = %product_id, "Product missing while restoring stock");
                continue;
            }
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (user_id, product_id, sale_id, movement_type, quantity, previous_stock, new_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(sale_id)
        .bind(movement_type.as_str())
        .bind(*quantity)
        .bind(new_stock - delta)
        .bind(new_stock)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool, calendar: BusinessCalendar) -> Self {
        Self { db, calendar }
    }

    /// Record a sale and its effects on stock and customer credit
    pub async fn create_sale(&self, user_id: Uuid, input: CreateSaleInput) -> AppResult<SaleView> {
        input.validate().map_err(validation_errors)?;

        let items: Vec<SaleLineItem> = input
            .items
            .iter()
            .map(|i| SaleLineItem {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect();

        let totals = SaleTotals {
            subtotal: input.subtotal,
            tax: input.tax,
            discount: input.discount,
            total: input.total,
        };
        check_totals(&items, &totals)?;
        let decrements = stock_decrements(&items)?;

        let settlement = settle_sale(input.payment_method, input.total, input.cash_received)?;
        let sale_date = input
            .sale_date
            .unwrap_or_else(|| self.calendar.today(Utc::now()));

        let contact = CustomerContact {
            document: input.customer.document.trim().to_string(),
            name: input.customer.name.trim().to_string(),
            phone: input.customer.phone.clone(),
            email: input.customer.email.clone(),
        };

        let mut tx = self.db.begin().await?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let known: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();
        if let Some(missing) = product_ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::ProductNotFound(*missing));
        }

        let customer = upsert_customer(&mut tx, user_id, &contact).await?;

        let row = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            INSERT INTO sales (
                user_id, customer_id, customer_name, customer_document, customer_phone, customer_email,
                items, subtotal, tax, discount, total, payment_method, cash_received, change_amount,
                remaining_balance, transaction_number, status, sale_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(user_id)
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.document)
        .bind(&contact.phone)
        .bind(&contact.email)
        .bind(Json(&items))
        .bind(totals.subtotal.amount())
        .bind(totals.tax.amount())
        .bind(totals.discount.amount())
        .bind(totals.total.amount())
        .bind(input.payment_method.as_str())
        .bind(settlement.cash_received.amount())
        .bind(settlement.change_amount.amount())
        .bind(settlement.remaining_balance.amount())
        .bind(&input.transaction_number)
        .bind(SaleStatus::Completed.as_str())
        .bind(sale_date)
        .fetch_one(&mut *tx)
        .await?;

        apply_stock_changes(&mut tx, user_id, row.id, &decrements, StockMovementType::Sale).await?;

        if settlement.credit_increment.is_positive() {
            sqlx::query(
                r#"
                UPDATE customers
                SET credit_balance = credit_balance + $1, updated_at = NOW()
                WHERE id = $2 AND user_id = $3
                "#,
            )
            .bind(settlement.credit_increment.amount())
            .bind(customer.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let sale = Sale::try_from(row)?;
        tracing::info!(
            user_id = %user_id,
            sale_id = %sale.id,
            customer_document = %sale.customer_document,
            total = %sale.total,
            credit = %settlement.credit_increment,
            method = sale.payment_method.as_str(),
            "Sale recorded"
        );

        Ok(sale.into())
    }

    /// List sales, newest first
    pub async fn list_sales(
        &self,
        user_id: Uuid,
        query: ListSalesQuery,
    ) -> AppResult<PaginatedResponse<SaleView>> {
        let pagination = Pagination::new(query.limit, query.offset);
        let window = BusinessWindow::between(&self.calendar, query.date_from, query.date_to)?;
        let status = query.status.map(|s| s.as_str());

        let filter = format!(
            "s.user_id = $1 AND {} AND ($6::text IS NULL OR s.customer_document = $6) AND ($7::text IS NULL OR s.status = $7)",
            sale_in_window("s", 2)
        );

        let total_items = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM sales s WHERE {}", filter))
            .bind(user_id)
            .bind(window.from)
            .bind(window.to)
            .bind(window.start)
            .bind(window.end)
            .bind(&query.customer_document)
            .bind(status)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales s WHERE {} ORDER BY s.created_at DESC, s.id DESC LIMIT $8 OFFSET $9",
            SALE_COLUMNS, filter
        ))
        .bind(user_id)
        .bind(window.from)
        .bind(window.to)
        .bind(window.start)
        .bind(window.end)
        .bind(&query.customer_document)
        .bind(status)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(into_views(rows)?, pagination, total_items))
    }

    /// Get a sale by ID
    pub async fn get_sale(&self, user_id: Uuid, sale_id: Uuid) -> AppResult<SaleView> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE id = $1 AND user_id = $2",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        Ok(Sale::try_from(row)?.into())
    }

    /// Reverse a completed sale: restore stock and release its outstanding credit.
    /// Credit payments already made against the sale stay on record.
    pub async fn reverse_sale(
        &self,
        user_id: Uuid,
        sale_id: Uuid,
        input: ReverseSaleInput,
    ) -> AppResult<SaleView> {
        input.validate().map_err(validation_errors)?;

        let mut tx = self.db.begin().await?;

        let customer_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT customer_id FROM sales WHERE id = $1 AND user_id = $2",
        )
        .bind(sale_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        // Customer, then sale, then products: the order credit payments take
        if let Some(customer_id) = customer_id {
            sqlx::query("SELECT id FROM customers WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(customer_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE id = $1 AND user_id = $2 FOR UPDATE",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let sale = Sale::try_from(row)?;
        let plan = plan_reversal(&sale)?;

        apply_stock_changes(
            &mut tx,
            user_id,
            sale.id,
            &plan.stock_restorations,
            StockMovementType::Reversal,
        )
        .await?;

        if plan.credit_release.is_positive() {
            if let Some(customer_id) = sale.customer_id {
                sqlx::query(RELEASE_CREDIT_SQL)
                    .bind(plan.credit_release.amount())
                    .bind(customer_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let row = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            UPDATE sales
            SET status = $1, reversal_reason = $2, reversed_at = NOW(), updated_at = NOW()
            WHERE id = $3 AND user_id = $4
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(SaleStatus::Reversed.as_str())
        .bind(input.reason.trim())
        .bind(sale.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            sale_id = %sale.id,
            credit_released = %plan.credit_release,
            "Sale reversed"
        );

        Ok(Sale::try_from(row)?.into())
    }

    /// Monthly dashboard: sales, purchases, fixed costs and resulting profit
    pub async fn sales_stats(&self, user_id: Uuid, month: Option<String>) -> AppResult<SalesStats> {
        let today = self.calendar.today(Utc::now());
        let range = month_range(month.as_deref(), today)?;
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));

        let month_window = BusinessWindow::new(&self.calendar, range)?;
        let week_window = BusinessWindow::new(&self.calendar, DateRange::new(week_start, today))?;
        let today_window = BusinessWindow::day(&self.calendar, today)?;

        let mut totals = Vec::with_capacity(3);
        for window in [month_window, week_window, today_window] {
            let total = sqlx::query_scalar::<_, Decimal>(&format!(
                "SELECT COALESCE(SUM(s.total), 0) FROM sales s WHERE s.user_id = $1 AND s.status = 'COMPLETED' AND {}",
                sale_in_window("s", 2)
            ))
            .bind(user_id)
            .bind(window.from)
            .bind(window.to)
            .bind(window.start)
            .bind(window.end)
            .fetch_one(&self.db)
            .await?;
            totals.push(Money::new(total));
        }

        let monthly_purchases = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM purchases WHERE user_id = $1 AND date BETWEEN $2 AND $3",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        let monthly_fixed_costs = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM fixed_costs WHERE user_id = $1 AND is_active AND frequency = 'MONTHLY'",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let (total_products, total_ingredients, low_stock_items) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products WHERE user_id = $1),
                (SELECT COUNT(*) FROM ingredients WHERE user_id = $1),
                (SELECT COUNT(*) FROM ingredients WHERE user_id = $1 AND stock <= min_stock)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let monthly_sales = totals[0];
        let monthly_purchases = Money::new(monthly_purchases);
        let monthly_fixed_costs = Money::new(monthly_fixed_costs);

        Ok(SalesStats {
            month: range.start.format("%Y-%m").to_string(),
            start_date: range.start,
            end_date: range.end,
            monthly_sales,
            weekly_sales: totals[1],
            today_sales: totals[2],
            monthly_purchases,
            monthly_fixed_costs,
            profit_loss: monthly_sales - monthly_purchases - monthly_fixed_costs,
            total_products,
            total_ingredients,
            low_stock_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_range_covers_whole_month() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let range = month_range(None, today).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let december = month_range(Some("2023-12"), today).unwrap();
        assert_eq!(december.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(month_range(Some("2023-13"), today).is_err());
    }

    #[test]
    fn test_sale_window_predicate_numbers_parameters() {
        let sql = sale_in_window("s", 2);
        assert!(sql.contains("s.sale_date >= $2"));
        assert!(sql.contains("s.sale_date <= $3"));
        assert!(sql.contains("s.created_at >= $4"));
        assert!(sql.contains("s.created_at < $5"));
    }

    /// Listing without dates leaves both ends open instead of binding extreme dates
    #[test]
    fn test_unbounded_window_binds_nothing() {
        let calendar = BusinessCalendar::new(-300).unwrap();
        let window = BusinessWindow::between(&calendar, None, None).unwrap();
        assert_eq!(
            window,
            BusinessWindow { from: None, to: None, start: None, end: None }
        );

        let sql = sale_in_window("s", 2);
        assert!(sql.contains("$2::date IS NULL"));
        assert!(sql.contains("$5::timestamptz IS NULL"));
    }

    #[test]
    fn test_half_open_window() {
        let calendar = BusinessCalendar::new(-300).unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let window = BusinessWindow::between(&calendar, Some(from), None).unwrap();

        assert_eq!(window.from, Some(from));
        assert_eq!(window.start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap()));
        assert!(window.to.is_none() && window.end.is_none());
    }

    #[test]
    fn test_window_at_calendar_edge_is_rejected() {
        let calendar = BusinessCalendar::new(-300).unwrap();
        let result = BusinessWindow::between(&calendar, None, Some(NaiveDate::MAX));
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
