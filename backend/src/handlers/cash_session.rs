//! HTTP handlers for the cash register session

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::cash_session::{
    CashSessionService, CloseSessionInput, HistoryQuery, ListSessionsQuery, OpenSessionInput,
};
use crate::AppState;
use shared::{CashSession, CashSessionStatus, PaginatedResponse};

fn cash_session_service(state: AppState) -> CashSessionService {
    CashSessionService::new(state.db, state.config.business.calendar())
}

/// Open today's register
pub async fn open_cash_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<OpenSessionInput>,
) -> AppResult<Json<CashSession>> {
    let session = cash_session_service(state)
        .open_session(current_user.0.user_id, input)
        .await?;
    Ok(Json(session))
}

pub async fn list_cash_sessions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListSessionsQuery>,
) -> AppResult<Json<Vec<CashSession>>> {
    let sessions = cash_session_service(state)
        .list_sessions(current_user.0.user_id, query)
        .await?;
    Ok(Json(sessions))
}

/// Live figures of today's register
pub async fn get_cash_session_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<CashSessionStatus>> {
    let status = cash_session_service(state).status(current_user.0.user_id).await?;
    Ok(Json(status))
}

/// Close today's register
pub async fn close_cash_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CloseSessionInput>,
) -> AppResult<Json<CashSessionStatus>> {
    let status = cash_session_service(state)
        .close_session(current_user.0.user_id, input)
        .await?;
    Ok(Json(status))
}

pub async fn get_cash_session_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<PaginatedResponse<CashSession>>> {
    let history = cash_session_service(state)
        .history(current_user.0.user_id, query)
        .await?;
    Ok(Json(history))
}
