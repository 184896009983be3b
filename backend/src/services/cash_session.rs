//! Cash register session ("caja") service: open, live status, close and history

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{unique_violation, validation_errors, AppError, AppResult};
use crate::services::sale::{sale_in_window, BusinessWindow};
use shared::{
    compute_figures, ensure_can_close, ensure_can_open, session_figures, BusinessCalendar, CashSession,
    CashSessionStatus, ClosingFigures, DailyActivity, Money, OpeningBalances, Pagination,
    PaginatedResponse, SessionFigures,
};

#[derive(Clone)]
pub struct CashSessionService {
    db: PgPool,
    calendar: BusinessCalendar,
}

#[derive(Debug, sqlx::FromRow)]
struct CashSessionRow {
    id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    bank_balance: Decimal,
    wallet_primary_balance: Decimal,
    wallet_secondary_balance: Decimal,
    cash_balance: Decimal,
    total_balance: Decimal,
    is_closed: bool,
    notes: Option<String>,
    session_type: String,
    closed_at: Option<DateTime<Utc>>,
    cash_sales: Option<Decimal>,
    card_sales: Option<Decimal>,
    transfer_sales: Option<Decimal>,
    total_sales: Option<Decimal>,
    expenses: Option<Decimal>,
    profit: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CashSessionRow> for CashSession {
    fn from(row: CashSessionRow) -> Self {
        let closing = match (
            row.cash_sales,
            row.card_sales,
            row.transfer_sales,
            row.total_sales,
            row.expenses,
            row.profit,
        ) {
            (Some(cash), Some(card), Some(transfer), Some(total), Some(expenses), Some(profit)) => {
                Some(ClosingFigures {
                    cash_sales: Money::new(cash),
                    card_sales: Money::new(card),
                    transfer_sales: Money::new(transfer),
                    total_sales: Money::new(total),
                    expenses: Money::new(expenses),
                    profit: Money::new(profit),
                })
            }
            _ => None,
        };

        CashSession {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            bank_balance: Money::new(row.bank_balance),
            wallet_primary_balance: Money::new(row.wallet_primary_balance),
            wallet_secondary_balance: Money::new(row.wallet_secondary_balance),
            cash_balance: Money::new(row.cash_balance),
            total_balance: Money::new(row.total_balance),
            is_closed: row.is_closed,
            notes: row.notes,
            session_type: row.session_type,
            closed_at: row.closed_at,
            closing,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SESSION_COLUMNS: &str = r#"id, user_id, date, bank_balance, wallet_primary_balance,
    wallet_secondary_balance, cash_balance, total_balance, is_closed, notes, session_type, closed_at,
    cash_sales, card_sales, transfer_sales, total_sales, expenses, profit, created_at, updated_at"#;

/// Balances declared when opening the register
#[derive(Debug, Deserialize, Validate)]
pub struct OpenSessionInput {
    #[serde(default)]
    pub bank_balance: Money,
    #[serde(default)]
    pub wallet_primary_balance: Money,
    #[serde(default)]
    pub wallet_secondary_balance: Money,
    #[serde(default)]
    pub cash_balance: Money,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CloseSessionInput {
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn status_of(date: NaiveDate, session: Option<CashSession>, figures: SessionFigures) -> CashSessionStatus {
    CashSessionStatus {
        date,
        is_open: session.as_ref().is_some_and(|s| !s.is_closed),
        is_closed: session.as_ref().is_some_and(|s| s.is_closed),
        session,
        opening_balance: figures.opening_balance,
        closing_balance: figures.closing_balance,
        cash_total: figures.cash_sales,
        card_total: figures.card_sales,
        transfer_total: figures.transfer_sales,
        total_sales: figures.total_sales,
        purchases: figures.purchases,
        fixed_costs: figures.paid_fixed_costs,
        expenses: figures.expenses,
        profit: figures.profit,
    }
}

/// Sales, purchases and paid fixed costs of one business day
async fn daily_activity(
    conn: &mut PgConnection,
    calendar: &BusinessCalendar,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<DailyActivity> {
    let window = BusinessWindow::day(calendar, date)?;

    let (cash_sales, card_sales, transfer_sales, total_sales) =
        sqlx::query_as::<_, (Decimal, Decimal, Decimal, Decimal)>(&format!(
            r#"
            SELECT
                COALESCE(SUM(CASE
                    WHEN s.payment_method = 'cash' THEN s.total
                    WHEN s.payment_method = 'combined' THEN s.cash_received
                    ELSE 0
                END), 0),
                COALESCE(SUM(s.total) FILTER (WHERE s.payment_method = 'card'), 0),
                COALESCE(SUM(s.total) FILTER (WHERE s.payment_method = 'transfer'), 0),
                COALESCE(SUM(s.total), 0)
            FROM sales s
            WHERE s.user_id = $1 AND s.status = 'COMPLETED' AND {}
            "#,
            sale_in_window("s", 2)
        ))
        .bind(user_id)
        .bind(window.from)
        .bind(window.to)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&mut *conn)
        .await?;

    let purchases = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM purchases WHERE user_id = $1 AND date = $2",
    )
    .bind(user_id)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;

    let paid_fixed_costs = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM fixed_costs
        WHERE user_id = $1 AND is_active AND is_paid AND updated_at >= $2 AND updated_at < $3
        "#,
    )
    .bind(user_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_one(&mut *conn)
    .await?;

    Ok(DailyActivity {
        cash_sales: Money::new(cash_sales),
        card_sales: Money::new(card_sales),
        transfer_sales: Money::new(transfer_sales),
        total_sales: Money::new(total_sales),
        purchases: Money::new(purchases),
        paid_fixed_costs: Money::new(paid_fixed_costs),
    })
}

impl CashSessionService {
    pub fn new(db: PgPool, calendar: BusinessCalendar) -> Self {
        Self { db, calendar }
    }

    fn today(&self) -> NaiveDate {
        self.calendar.today(Utc::now())
    }

    /// Open today's register
    pub async fn open_session(&self, user_id: Uuid, input: OpenSessionInput) -> AppResult<CashSession> {
        input.validate().map_err(validation_errors)?;
        let balances = OpeningBalances {
            bank: input.bank_balance,
            wallet_primary: input.wallet_primary_balance,
            wallet_secondary: input.wallet_secondary_balance,
            cash: input.cash_balance,
        };
        balances.validate()?;

        let date = self.today();
        let existing = self.open_session_for(user_id, date).await?;
        ensure_can_open(date, existing.as_ref())?;

        // The partial unique index settles concurrent opens
        let result = sqlx::query_as::<_, CashSessionRow>(&format!(
            r#"
            INSERT INTO cash_sessions (user_id, date, bank_balance, wallet_primary_balance,
                wallet_secondary_balance, cash_balance, total_balance, is_closed, notes, session_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, 'manual')
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .bind(balances.bank.amount())
        .bind(balances.wallet_primary.amount())
        .bind(balances.wallet_secondary.amount())
        .bind(balances.cash.amount())
        .bind(balances.total().amount())
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await;

        let row = match result {
            Ok(row) => row,
            Err(err) if unique_violation(&err).is_some() => return Err(AppError::SessionAlreadyOpen(date)),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            user_id = %user_id,
            session_id = %row.id,
            date = %date,
            cash = %balances.cash,
            total = %balances.total(),
            "Cash session opened"
        );

        Ok(row.into())
    }

    async fn open_session_for(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<CashSession>> {
        let row = sqlx::query_as::<_, CashSessionRow>(&format!(
            "SELECT {} FROM cash_sessions WHERE user_id = $1 AND date = $2 AND NOT is_closed",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CashSession::from))
    }

    /// Today's register, recomputed from the day's activity unless already closed
    pub async fn status(&self, user_id: Uuid) -> AppResult<CashSessionStatus> {
        let date = self.today();
        let mut conn = self.db.acquire().await?;

        // An open session wins over sessions closed earlier the same day
        let session = sqlx::query_as::<_, CashSessionRow>(&format!(
            r#"
            SELECT {}
            FROM cash_sessions
            WHERE user_id = $1 AND date = $2
            ORDER BY is_closed ASC, created_at DESC
            LIMIT 1
            "#,
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await?
        .map(CashSession::from);

        let activity = daily_activity(&mut conn, &self.calendar, user_id, date).await?;
        let figures = match &session {
            Some(s) => session_figures(s, &activity),
            None => compute_figures(Money::ZERO, &activity),
        };

        Ok(status_of(date, session, figures))
    }

    /// Close today's register, freezing its figures
    pub async fn close_session(&self, user_id: Uuid, input: CloseSessionInput) -> AppResult<CashSessionStatus> {
        input.validate().map_err(validation_errors)?;
        let date = self.today();

        let mut tx = self.db.begin().await?;

        let open = sqlx::query_as::<_, CashSessionRow>(&format!(
            "SELECT {} FROM cash_sessions WHERE user_id = $1 AND date = $2 AND NOT is_closed FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?
        .map(CashSession::from);

        let session = ensure_can_close(date, open.as_ref())?;
        let activity = daily_activity(&mut tx, &self.calendar, user_id, date).await?;
        let figures = compute_figures(session.cash_balance, &activity);

        let row = sqlx::query_as::<_, CashSessionRow>(&format!(
            r#"
            UPDATE cash_sessions
            SET is_closed = TRUE,
                total_balance = $1,
                cash_sales = $2,
                card_sales = $3,
                transfer_sales = $4,
                total_sales = $5,
                expenses = $6,
                profit = $7,
                notes = COALESCE($8, notes),
                closed_at = NOW(),
                updated_at = NOW()
            WHERE id = $9 AND user_id = $10
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(figures.closing_balance.amount())
        .bind(figures.cash_sales.amount())
        .bind(figures.card_sales.amount())
        .bind(figures.transfer_sales.amount())
        .bind(figures.total_sales.amount())
        .bind(figures.expenses.amount())
        .bind(figures.profit.amount())
        .bind(&input.notes)
        .bind(session.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %row.id,
            date = %date,
            closing_balance = %figures.closing_balance,
            profit = %figures.profit,
            "Cash session closed"
        );

        Ok(status_of(date, Some(row.into()), figures))
    }

    /// Sessions in a date range, newest first
    pub async fn list_sessions(&self, user_id: Uuid, query: ListSessionsQuery) -> AppResult<Vec<CashSession>> {
        let rows = sqlx::query_as::<_, CashSessionRow>(&format!(
            r#"
            SELECT {}
            FROM cash_sessions
            WHERE user_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC, created_at DESC
            "#,
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(query.date_from)
        .bind(query.date_to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(CashSession::from).collect())
    }

    /// Paginated session history, newest first
    pub async fn history(&self, user_id: Uuid, query: HistoryQuery) -> AppResult<PaginatedResponse<CashSession>> {
        let pagination = Pagination::new(query.limit, query.offset);

        let total_items = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cash_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, CashSessionRow>(&format!(
            "SELECT {} FROM cash_sessions WHERE user_id = $1 ORDER BY date DESC, created_at DESC LIMIT $2 OFFSET $3",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(CashSession::from).collect(),
            pagination,
            total_items,
        ))
    }
}
