//! Payment method routes
//!
//! Instruments are tokenized by the gateway; we verify the enrollment
//! charge by reference and keep only the returned authorization token
//! plus display metadata. Exactly one instrument per user is default.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::response::{DataResponse, MessageResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::payments::{AddPaymentMethodRequest, PaymentMethodResponse};
use crate::error::ApiError;

#[derive(Debug, sqlx::FromRow)]
struct PaymentMethodRow {
    id: Uuid,
    brand: String,
    last4: String,
    exp_month: String,
    exp_year: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<PaymentMethodRow> for PaymentMethodResponse {
    fn from(r: PaymentMethodRow) -> Self {
        Self {
            id: r.id,
            brand: r.brand,
            last4: r.last4,
            exp_month: r.exp_month,
            exp_year: r.exp_year,
            is_default: r.is_default,
            created_at: r.created_at,
        }
    }
}

const METHOD_COLUMNS: &str = "id, brand, last4, exp_month, exp_year, is_default, created_at";

/// GET /payment-methods
///
/// The caller's saved instruments, default first.
pub async fn list_payment_methods(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let rows = sqlx::query_as::<_, PaymentMethodRow>(&format!(
        r#"
        SELECT {}
        FROM payment_methods
        WHERE user_id = $1
        ORDER BY is_default DESC, created_at DESC
        "#,
        METHOD_COLUMNS
    ))
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<PaymentMethodResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse::new(data)))
}

/// POST /payment-methods
///
/// Attach an instrument from a completed gateway charge. The raw card
/// never reaches this service; only the authorization token is stored.
pub async fn add_payment_method(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<AddPaymentMethodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let verified = state.paystack.verify_transaction(&req.reference).await?;

    if !verified.is_successful() {
        return Err(ApiError::bad_request("Card charge was not successful"));
    }

    let Some(authorization) = verified.authorization else {
        return Err(ApiError::bad_request("Gateway returned no card authorization"));
    };

    if !authorization.reusable {
        return Err(ApiError::bad_request("This card cannot be saved for reuse"));
    }

    let mut tx = state.db.begin().await?;

    // First instrument becomes the default
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payment_methods WHERE user_id = $1")
            .bind(auth.user_id)
            .fetch_one(&mut *tx)
            .await?;

    let method_id = Uuid::new_v4();
    let brand = authorization.display_brand();

    let row = sqlx::query_as::<_, PaymentMethodRow>(&format!(
        r#"
        INSERT INTO payment_methods
            (id, user_id, brand, last4, exp_month, exp_year, authorization_code, signature, reusable, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        METHOD_COLUMNS
    ))
    .bind(method_id)
    .bind(auth.user_id)
    .bind(&brand)
    .bind(&authorization.last4)
    .bind(&authorization.exp_month)
    .bind(&authorization.exp_year)
    .bind(&authorization.authorization_code)
    .bind(&authorization.signature)
    .bind(authorization.reusable)
    .bind(existing == 0)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("This card is already saved")
        }
        _ => ApiError::from(e),
    })?;

    tx.commit().await?;

    tracing::info!(
        user_uuid = %auth.user_uuid,
        method_id = %method_id,
        brand = %brand,
        "Payment method added"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(PaymentMethodResponse::from(row))),
    ))
}

/// PATCH /payment-methods/:id/default
///
/// Make an instrument the default; the previous default is cleared in
/// the same transaction.
pub async fn set_default_payment_method(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(method_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = state.db.begin().await?;

    sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;

    let updated = sqlx::query(
        "UPDATE payment_methods SET is_default = TRUE WHERE id = $1 AND user_id = $2",
    )
    .bind(method_id)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Payment method not found"));
    }

    tx.commit().await?;

    tracing::info!(user_uuid = %auth.user_uuid, method_id = %method_id, "Default payment method changed");

    Ok(Json(MessageResponse::new("Default payment method updated")))
}

/// DELETE /payment-methods/:id
///
/// Remove an instrument. Deleting the default promotes the most recent
/// remaining one.
pub async fn delete_payment_method(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(method_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = state.db.begin().await?;

    let was_default: Option<bool> = sqlx::query_scalar(
        "DELETE FROM payment_methods WHERE id = $1 AND user_id = $2 RETURNING is_default",
    )
    .bind(method_id)
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(was_default) = was_default else {
        return Err(ApiError::not_found("Payment method not found"));
    };

    if was_default {
        sqlx::query(
            r#"
            UPDATE payment_methods SET is_default = TRUE
            WHERE id = (
                SELECT id FROM payment_methods
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(user_uuid = %auth.user_uuid, method_id = %method_id, "Payment method removed");

    Ok(Json(MessageResponse::new("Payment method removed")))
}
