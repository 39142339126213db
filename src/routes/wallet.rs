//! Wallet routes
//!
//! Top-ups round-trip through the gateway: initialize creates a pending
//! ledger entry and hands the user to the gateway; verify confirms the
//! charge and credits the balance exactly once per reference.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::pagination::PaginationParams;
use crate::api::response::DataResponse;
use crate::api::Paginated;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::payments::{
    FundInitializeRequest, FundInitializeResponse, FundVerifyRequest, FundVerifyResponse,
    WalletTransactionKind, WalletTransactionResponse, WalletTransactionStatus,
};
use crate::error::ApiError;
use crate::services::notifications;

#[derive(Debug, sqlx::FromRow)]
struct WalletTransactionRow {
    id: Uuid,
    kind: String,
    amount: Decimal,
    reference: String,
    status: String,
    booking_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<WalletTransactionRow> for WalletTransactionResponse {
    fn from(r: WalletTransactionRow) -> Self {
        Self {
            id: r.id,
            kind: r.kind,
            amount: r.amount,
            reference: r.reference,
            status: r.status,
            booking_id: r.booking_id,
            created_at: r.created_at,
        }
    }
}

const TX_COLUMNS: &str = "id, kind, amount, reference, status, booking_id, created_at";

/// POST /wallet/fund/initialize
///
/// Start a top-up: records a pending ledger entry and returns the
/// gateway checkout URL.
pub async fn initialize_funding(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<FundInitializeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let amount = Decimal::from_f64(req.amount)
        .ok_or_else(|| ApiError::bad_request("Invalid amount"))?
        .round_dp(2);

    let reference = format!("FRFX-{}", Uuid::new_v4().simple());

    let init = state
        .paystack
        .initialize_transaction(&auth.email, amount, &reference)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (id, user_id, kind, amount, reference, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(WalletTransactionKind::Topup.to_string())
    .bind(amount)
    .bind(&init.reference)
    .bind(WalletTransactionStatus::Pending.to_string())
    .execute(&state.db)
    .await?;

    tracing::info!(
        user_uuid = %auth.user_uuid,
        reference = %init.reference,
        amount = %amount,
        "Wallet funding initialized"
    );

    Ok(Json(DataResponse::new(FundInitializeResponse {
        authorization_url: init.authorization_url,
        access_code: init.access_code,
        reference: init.reference,
    })))
}

/// POST /wallet/fund/verify
///
/// Confirm a top-up after the gateway redirect. Idempotent per
/// reference: the credit lands at most once.
pub async fn verify_funding(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<FundVerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let row = sqlx::query_as::<_, WalletTransactionRow>(&format!(
        "SELECT {} FROM wallet_transactions WHERE reference = $1 AND user_id = $2",
        TX_COLUMNS
    ))
    .bind(&req.reference)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Transaction not found"))?;

    // Already settled: report the current state without touching the gateway
    if row.status == WalletTransactionStatus::Success.to_string() {
        let balance: Decimal = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
            .bind(auth.user_id)
            .fetch_one(&state.db)
            .await?;

        return Ok(Json(DataResponse::new(FundVerifyResponse {
            transaction: row.into(),
            balance,
        })));
    }

    let verified = state.paystack.verify_transaction(&req.reference).await?;

    if !verified.is_successful() {
        sqlx::query(
            "UPDATE wallet_transactions SET status = $1 WHERE reference = $2 AND status = $3",
        )
        .bind(WalletTransactionStatus::Failed.to_string())
        .bind(&req.reference)
        .bind(WalletTransactionStatus::Pending.to_string())
        .execute(&state.db)
        .await?;

        return Err(ApiError::bad_request("Payment was not successful"));
    }

    // Credit what the gateway actually verified
    let amount = verified.amount_naira();

    let mut tx = state.db.begin().await?;

    // Guards the concurrent-verify race: only one caller flips pending
    let flipped = sqlx::query(
        r#"
        UPDATE wallet_transactions
        SET status = $1, amount = $2
        WHERE reference = $3 AND status = $4
        "#,
    )
    .bind(WalletTransactionStatus::Success.to_string())
    .bind(amount)
    .bind(&req.reference)
    .bind(WalletTransactionStatus::Pending.to_string())
    .execute(&mut *tx)
    .await?;

    if flipped.rows_affected() > 0 {
        sqlx::query("UPDATE users SET balance = balance + $1, updated_at = NOW() WHERE id = $2")
            .bind(amount)
            .bind(auth.user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if flipped.rows_affected() > 0 {
        tracing::info!(
            user_uuid = %auth.user_uuid,
            reference = %req.reference,
            amount = %amount,
            "Wallet funded"
        );

        if let Err(e) =
            notifications::notify_wallet_funded(&state.db, auth.user_id, amount, &req.reference)
                .await
        {
            tracing::warn!(error = %e, "Failed to notify user of wallet funding");
        }
    }

    let transaction = sqlx::query_as::<_, WalletTransactionRow>(&format!(
        "SELECT {} FROM wallet_transactions WHERE reference = $1 AND user_id = $2",
        TX_COLUMNS
    ))
    .bind(&req.reference)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    let balance: Decimal = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(DataResponse::new(FundVerifyResponse {
        transaction: transaction.into(),
        balance,
    })))
}

/// GET /wallet/transactions
///
/// The caller's ledger, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1")
            .bind(auth.user_id)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, WalletTransactionRow>(&format!(
        r#"
        SELECT {}
        FROM wallet_transactions
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
        TX_COLUMNS
    ))
    .bind(auth.user_id)
    .bind(pagination.limit() as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<WalletTransactionResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(Paginated::new(data, &pagination, total as u64)))
}
