//! Credit payment service: FIFO allocation of customer payments over
//! outstanding credit sales, payment history and balance reconciliation.

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{validation_errors, AppError, AppResult};
use shared::{
    balance_discrepancy, group_by_customer, plan_fifo_allocation, plan_single_sale_allocation,
    AllocationPlan, BalanceDiscrepancy, CollectionMethod, CreditPayment, CreditPaymentEntry,
    CustomerCreditGroup, Money, OutstandingCreditSale, OutstandingSale, Pagination,
    PaginatedResponse, PaymentMethod, SaleAllocation, SaleStatus,
};

/// Lower a customer's credit balance by `$1`, never below zero
pub(crate) const RELEASE_CREDIT_SQL: &str = r#"
    UPDATE customers
    SET credit_balance = GREATEST(credit_balance - $1, 0), updated_at = NOW()
    WHERE id = $2 AND user_id = $3
    RETURNING credit_balance
"#;

#[derive(Clone)]
pub struct CreditService {
    db: PgPool,
    max_conflict_retries: u32,
}

#[derive(Debug, sqlx::FromRow)]
struct CreditPaymentRow {
    id: Uuid,
    user_id: Uuid,
    sale_id: Uuid,
    amount: Decimal,
    payment_method: String,
    reference_number: Option<String>,
    notes: Option<String>,
    payment_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CreditPaymentRow> for CreditPayment {
    type Error = AppError;

    fn try_from(row: CreditPaymentRow) -> Result<Self, Self::Error> {
        Ok(CreditPayment {
            id: row.id,
            user_id: row.user_id,
            sale_id: row.sale_id,
            amount: Money::new(row.amount),
            payment_method: CollectionMethod::from_str(&row.payment_method)?,
            reference_number: row.reference_number,
            notes: row.notes,
            payment_date: row.payment_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CreditPaymentEntryRow {
    #[sqlx(flatten)]
    payment: CreditPaymentRow,
    customer_name: String,
    customer_document: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OutstandingSaleRow {
    id: Uuid,
    customer_id: Option<Uuid>,
    customer_document: String,
    customer_name: String,
    total: Decimal,
    cash_received: Decimal,
    remaining_balance: Decimal,
    payment_method: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl OutstandingSaleRow {
    fn outstanding(&self) -> OutstandingSale {
        OutstandingSale {
            sale_id: self.id,
            created_at: self.created_at,
            remaining_balance: Money::new(self.remaining_balance),
        }
    }
}

impl TryFrom<OutstandingSaleRow> for OutstandingCreditSale {
    type Error = AppError;

    fn try_from(row: OutstandingSaleRow) -> Result<Self, Self::Error> {
        Ok(OutstandingCreditSale {
            sale_id: row.id,
            customer_document: row.customer_document,
            customer_name: row.customer_name,
            total: Money::new(row.total),
            cash_received: Money::new(row.cash_received),
            remaining_balance: Money::new(row.remaining_balance),
            payment_method: PaymentMethod::from_str(&row.payment_method)?,
            created_at: row.created_at,
        })
    }
}

const PAYMENT_COLUMNS: &str =
    "id, user_id, sale_id, amount, payment_method, reference_number, notes, payment_date, created_at";

const OUTSTANDING_COLUMNS: &str = "id, customer_id, customer_document, customer_name, total, cash_received, remaining_balance, payment_method, status, created_at";

/// Credit sales still owing money
const OUTSTANDING_FILTER: &str =
    "status = 'COMPLETED' AND payment_method IN ('credit', 'combined') AND remaining_balance > 0";

/// Input for a customer-level (FIFO) credit payment
#[derive(Debug, Deserialize, Validate)]
pub struct CreditPaymentInput {
    #[validate(length(min = 3, max = 20, message = "Document must have 3 to 20 characters"))]
    pub customer_document: String,
    pub amount: Money,
    pub payment_method: CollectionMethod,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for a payment against one explicit sale
#[derive(Debug, Deserialize, Validate)]
pub struct SaleCreditPaymentInput {
    pub amount: Money,
    pub payment_method: CollectionMethod,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Result of applying a payment
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub customer_id: Uuid,
    pub customer_document: String,
    pub customer_name: String,
    pub amount_applied: Money,
    pub processed_sales: Vec<SaleAllocation>,
    pub payments: Vec<CreditPayment>,
    pub outstanding_before: Money,
    /// Outstanding balance left across the customer's credit sales
    pub total_remaining_balance: Money,
    pub credit_balance: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditSalesOverview {
    pub customers: Vec<CustomerCreditGroup>,
    pub total_pending: Money,
    pub sales_count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreditSalesQuery {
    pub customer_document: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreditPaymentsQuery {
    pub customer_document: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileInput {
    #[serde(default)]
    pub dry_run: bool,
    pub customer_document: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub dry_run: bool,
    pub customers_checked: usize,
    pub discrepancies: Vec<BalanceDiscrepancy>,
    pub corrected: usize,
}

/// Customer identity locked for the duration of a payment
#[derive(Debug, sqlx::FromRow)]
struct LockedCustomer {
    id: Uuid,
    document: String,
    name: String,
}

struct PaymentDetails<'a> {
    method: CollectionMethod,
    reference_number: Option<&'a str>,
    notes: Option<&'a str>,
}

async fn lock_outstanding_sales(
    conn: &mut PgConnection,
    user_id: Uuid,
    customer_id: Uuid,
) -> AppResult<Vec<OutstandingSaleRow>> {
    let rows = sqlx::query_as::<_, OutstandingSaleRow>(&format!(
        r#"
        SELECT {}
        FROM sales
        WHERE user_id = $1 AND customer_id = $2 AND {}
        ORDER BY created_at ASC, id ASC
        FOR UPDATE
        "#,
        OUTSTANDING_COLUMNS, OUTSTANDING_FILTER
    ))
    .bind(user_id)
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Write the planned payments and balance changes
async fn apply_plan(
    conn: &mut PgConnection,
    user_id: Uuid,
    customer_id: Uuid,
    plan: &AllocationPlan,
    details: &PaymentDetails<'_>,
) -> AppResult<(Vec<CreditPayment>, Money)> {
    let mut payments = Vec::with_capacity(plan.allocations.len());

    for allocation in &plan.allocations {
        let row = sqlx::query_as::<_, CreditPaymentRow>(&format!(
            r#"
            INSERT INTO credit_payments (user_id, sale_id, amount, payment_method, reference_number, notes, payment_date)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(allocation.sale_id)
        .bind(allocation.amount_applied.amount())
        .bind(details.method.as_str())
        .bind(details.reference_number)
        .bind(details.notes)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE sales
            SET remaining_balance = $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            "#,
        )
        .bind(allocation.remaining_balance.amount())
        .bind(allocation.sale_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        payments.push(CreditPayment::try_from(row)?);
    }

    let credit_balance = sqlx::query_scalar::<_, Decimal>(RELEASE_CREDIT_SQL)
    .bind(plan.amount_applied.amount())
    .bind(customer_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok((payments, Money::new(credit_balance)))
}

impl CreditService {
    pub fn new(db: PgPool, max_conflict_retries: u32) -> Self {
        Self {
            db,
            max_conflict_retries,
        }
    }

    /// Run `op`, retrying deadlocks and serialization failures
    async fn with_conflict_retries<T, F, Fut>(&self, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_conflict_retries {
                        return Err(AppError::TransientConflict(err.to_string()));
                    }
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "Retrying credit payment after conflict");
                }
                result => return result,
            }
        }
    }

    /// Apply a payment to a customer's credit sales, oldest first
    pub async fn apply_credit_payment(
        &self,
        user_id: Uuid,
        input: CreditPaymentInput,
    ) -> AppResult<PaymentReceipt> {
        input.validate().map_err(validation_errors)?;
        let document = input.customer_document.trim();
        let details = PaymentDetails {
            method: input.payment_method,
            reference_number: input.reference_number.as_deref(),
            notes: input.notes.as_deref(),
        };

        let receipt = self
            .with_conflict_retries(|| self.try_fifo_payment(user_id, document, input.amount, &details))
            .await?;

        tracing::info!(
            user_id = %user_id,
            customer_document = %receipt.customer_document,
            amount = %receipt.amount_applied,
            sales = receipt.processed_sales.len(),
            remaining = %receipt.total_remaining_balance,
            "Credit payment applied"
        );

        Ok(receipt)
    }

    async fn try_fifo_payment(
        &self,
        user_id: Uuid,
        document: &str,
        amount: Money,
        details: &PaymentDetails<'_>,
    ) -> AppResult<PaymentReceipt> {
        let mut tx = self.db.begin().await?;

        let customer = sqlx::query_as::<_, LockedCustomer>(
            "SELECT id, document, name FROM customers WHERE user_id = $1 AND document = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(document)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        let rows = lock_outstanding_sales(&mut tx, user_id, customer.id).await?;
        let outstanding: Vec<OutstandingSale> = rows.iter().map(OutstandingSaleRow::outstanding).collect();
        let plan = plan_fifo_allocation(&outstanding, amount)?;

        let (payments, credit_balance) = apply_plan(&mut tx, user_id, customer.id, &plan, details).await?;

        tx.commit().await?;

        Ok(PaymentReceipt {
            customer_id: customer.id,
            customer_document: customer.document,
            customer_name: customer.name,
            amount_applied: plan.amount_applied,
            outstanding_before: plan.outstanding_before,
            total_remaining_balance: plan.outstanding_after,
            processed_sales: plan.allocations,
            payments,
            credit_balance,
        })
    }

    /// Apply a payment to one sale
    pub async fn apply_sale_credit_payment(
        &self,
        user_id: Uuid,
        sale_id: Uuid,
        input: SaleCreditPaymentInput,
    ) -> AppResult<PaymentReceipt> {
        input.validate().map_err(validation_errors)?;
        let details = PaymentDetails {
            method: input.payment_method,
            reference_number: input.reference_number.as_deref(),
            notes: input.notes.as_deref(),
        };

        let receipt = self
            .with_conflict_retries(|| self.try_sale_payment(user_id, sale_id, input.amount, &details))
            .await?;

        tracing::info!(
            user_id = %user_id,
            sale_id = %sale_id,
            amount = %receipt.amount_applied,
            "Credit payment applied to sale"
        );

        Ok(receipt)
    }

    async fn try_sale_payment(
        &self,
        user_id: Uuid,
        sale_id: Uuid,
        amount: Money,
        details: &PaymentDetails<'_>,
    ) -> AppResult<PaymentReceipt> {
        let mut tx = self.db.begin().await?;

        let customer_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT customer_id FROM sales WHERE id = $1 AND user_id = $2",
        )
        .bind(sale_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?
        .ok_or(AppError::NoOutstandingBalance)?;

        // Customer first, then sale: same lock order as the FIFO path
        let customer = sqlx::query_as::<_, LockedCustomer>(
            "SELECT id, document, name FROM customers WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(customer_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        let row = sqlx::query_as::<_, OutstandingSaleRow>(&format!(
            "SELECT {} FROM sales WHERE id = $1 AND user_id = $2 FOR UPDATE",
            OUTSTANDING_COLUMNS
        ))
        .bind(sale_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let eligible = row.customer_id == Some(customer.id)
            && row.status == SaleStatus::Completed.as_str()
            && PaymentMethod::from_str(&row.payment_method)?.is_deferred();
        if !eligible {
            return Err(AppError::NoOutstandingBalance);
        }

        let plan = plan_single_sale_allocation(&row.outstanding(), amount)?;
        let (payments, credit_balance) = apply_plan(&mut tx, user_id, customer.id, &plan, details).await?;

        let total_remaining = sqlx::query_scalar::<_, Decimal>(&format!(
            "SELECT COALESCE(SUM(remaining_balance), 0) FROM sales WHERE user_id = $1 AND customer_id = $2 AND {}",
            OUTSTANDING_FILTER
        ))
        .bind(user_id)
        .bind(customer.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PaymentReceipt {
            customer_id: customer.id,
            customer_document: customer.document,
            customer_name: customer.name,
            amount_applied: plan.amount_applied,
            outstanding_before: plan.outstanding_before,
            total_remaining_balance: Money::new(total_remaining),
            processed_sales: plan.allocations,
            payments,
            credit_balance,
        })
    }

    /// Outstanding credit sales grouped by customer
    pub async fn list_credit_sales(
        &self,
        user_id: Uuid,
        query: CreditSalesQuery,
    ) -> AppResult<CreditSalesOverview> {
        let rows = sqlx::query_as::<_, OutstandingSaleRow>(&format!(
            r#"
            SELECT {}
            FROM sales
            WHERE user_id = $1 AND {} AND ($2::text IS NULL OR customer_document = $2)
            ORDER BY customer_name ASC, created_at ASC, id ASC
            "#,
            OUTSTANDING_COLUMNS, OUTSTANDING_FILTER
        ))
        .bind(user_id)
        .bind(&query.customer_document)
        .fetch_all(&self.db)
        .await?;

        let sales = rows
            .into_iter()
            .map(OutstandingCreditSale::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        let sales_count = sales.len();
        let customers = group_by_customer(sales);
        let total_pending = customers.iter().map(|g| g.total_pending).sum();

        Ok(CreditSalesOverview {
            customers,
            total_pending,
            sales_count,
        })
    }

    /// Payment history, newest first
    pub async fn list_credit_payments(
        &self,
        user_id: Uuid,
        query: CreditPaymentsQuery,
    ) -> AppResult<PaginatedResponse<CreditPaymentEntry>> {
        let pagination = Pagination::new(query.limit, query.offset);

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM credit_payments p
            JOIN sales s ON s.id = p.sale_id
            WHERE p.user_id = $1 AND ($2::text IS NULL OR s.customer_document = $2)
            "#,
        )
        .bind(user_id)
        .bind(&query.customer_document)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CreditPaymentEntryRow>(
            r#"
            SELECT p.id, p.user_id, p.sale_id, p.amount, p.payment_method, p.reference_number,
                   p.notes, p.payment_date, p.created_at,
                   s.customer_name, s.customer_document
            FROM credit_payments p
            JOIN sales s ON s.id = p.sale_id
            WHERE p.user_id = $1 AND ($2::text IS NULL OR s.customer_document = $2)
            ORDER BY p.payment_date DESC, p.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(&query.customer_document)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.db)
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| {
                Ok(CreditPaymentEntry {
                    payment: CreditPayment::try_from(row.payment)?,
                    customer_name: row.customer_name,
                    customer_document: row.customer_document,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(entries, pagination, total_items))
    }

    /// Payments recorded against one sale, oldest first
    pub async fn sale_payments(&self, user_id: Uuid, sale_id: Uuid) -> AppResult<Vec<CreditPayment>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sales WHERE id = $1 AND user_id = $2)",
        )
        .bind(sale_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Sale".to_string()));
        }

        let rows = sqlx::query_as::<_, CreditPaymentRow>(&format!(
            "SELECT {} FROM credit_payments WHERE sale_id = $1 AND user_id = $2 ORDER BY payment_date ASC, id ASC",
            PAYMENT_COLUMNS
        ))
        .bind(sale_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(CreditPayment::try_from).collect()
    }

    /// Compare stored customer balances with their outstanding credit sales,
    /// correcting them unless `dry_run` is set
    pub async fn reconcile_credit_balances(
        &self,
        user_id: Uuid,
        input: ReconcileInput,
    ) -> AppResult<ReconcileReport> {
        let mut tx = self.db.begin().await?;

        let rows = sqlx::query_as::<_, (Uuid, String, String, Decimal, Decimal)>(
            r#"
            SELECT c.id, c.document, c.name, c.credit_balance,
                   COALESCE((
                       SELECT SUM(s.remaining_balance) FROM sales s
                       WHERE s.user_id = c.user_id AND s.customer_id = c.id
                         AND s.status = 'COMPLETED'
                         AND s.payment_method IN ('credit', 'combined')
                         AND s.remaining_balance > 0
                   ), 0)
            FROM customers c
            WHERE c.user_id = $1 AND ($2::text IS NULL OR c.document = $2)
            ORDER BY c.document
            FOR UPDATE OF c
            "#,
        )
        .bind(user_id)
        .bind(&input.customer_document)
        .fetch_all(&mut *tx)
        .await?;

        let customers_checked = rows.len();
        let discrepancies: Vec<BalanceDiscrepancy> = rows
            .into_iter()
            .filter_map(|(id, document, name, recorded, computed)| {
                balance_discrepancy(id, &document, &name, Money::new(recorded), Money::new(computed))
            })
            .collect();

        let mut corrected = 0;
        if !input.dry_run {
            for d in &discrepancies {
                sqlx::query(
                    "UPDATE customers SET credit_balance = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3",
                )
                .bind(d.computed_balance.amount())
                .bind(d.customer_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
                corrected += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            checked = customers_checked,
            discrepancies = discrepancies.len(),
            corrected,
            dry_run = input.dry_run,
            "Credit balances reconciled"
        );

        Ok(ReconcileReport {
            dry_run: input.dry_run,
            customers_checked,
            discrepancies,
            corrected,
        })
    }
}
