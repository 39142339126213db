//! Booking routes
//!
//! Creation, role-scoped listing, and the guarded status lifecycle. The
//! status flip is a compare-and-swap inside the same transaction as any
//! escrow movement, so concurrent updates resolve to one winner and a
//! failed settlement rolls the flip back.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::pagination::PaginationParams;
use crate::api::response::DataResponse;
use crate::api::Paginated;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::bookings::{
    transition_allowed, BookingActor, BookingParty, BookingQuery, BookingResponse, BookingStatus,
    CreateBookingRequest, UpdateBookingStatusRequest,
};
use crate::domain::reviews::{CreateReviewRequest, ReviewResponse};
use crate::domain::users::Role;
use crate::error::ApiError;
use crate::services::{cache::keys, notifications, settlement};

/// Database row for a booking with its parties resolved
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    status: String,
    client_id: i64,
    agent_id: i64,
    service_id: Uuid,
    client_uuid: Uuid,
    client_name: String,
    agent_uuid: Uuid,
    agent_name: String,
    service_name: String,
    scheduled_at: DateTime<Utc>,
    address: String,
    total_price: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.status, b.client_id, b.agent_id, b.service_id,
           c.uuid AS client_uuid, c.name AS client_name,
           a.uuid AS agent_uuid, a.name AS agent_name,
           s.name AS service_name,
           b.scheduled_at, b.address, b.total_price, b.notes,
           b.created_at, b.updated_at
    FROM bookings b
    JOIN users c ON c.id = b.client_id
    JOIN users a ON a.id = b.agent_id
    JOIN services s ON s.id = b.service_id
"#;

impl BookingRow {
    fn status(&self) -> BookingStatus {
        BookingStatus::parse(&self.status).unwrap_or(BookingStatus::Pending)
    }

    fn into_response(self) -> BookingResponse {
        let status = self.status();
        BookingResponse {
            id: self.id,
            status,
            client: BookingParty {
                uuid: self.client_uuid,
                name: self.client_name,
            },
            agent: BookingParty {
                uuid: self.agent_uuid,
                name: self.agent_name,
            },
            service_id: self.service_id,
            service_name: self.service_name,
            scheduled_at: self.scheduled_at,
            address: self.address,
            total_price: self.total_price,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

async fn fetch_booking(db: &sqlx::PgPool, booking_id: Uuid) -> Result<BookingRow, ApiError> {
    sqlx::query_as::<_, BookingRow>(&format!("{} WHERE b.id = $1", BOOKING_SELECT))
        .bind(booking_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))
}

/// POST /bookings
///
/// Client books an agent for a catalog service. The price is the
/// service's base price at booking time.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    if auth.role != Role::Client {
        return Err(ApiError::forbidden("Only clients can create bookings"));
    }

    let agent: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE uuid = $1 AND role = 'agent'")
            .bind(req.agent_uuid)
            .fetch_optional(&state.db)
            .await?;

    let Some((agent_id,)) = agent else {
        return Err(ApiError::not_found("Agent not found"));
    };

    let service: Option<(Decimal, String)> = sqlx::query_as(
        "SELECT base_price, name FROM services WHERE id = $1 AND is_active",
    )
    .bind(req.service_id)
    .fetch_optional(&state.db)
    .await?;

    let Some((total_price, service_name)) = service else {
        return Err(ApiError::not_found("Service not found"));
    };

    let offers: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM agent_services WHERE agent_id = $1 AND service_id = $2)",
    )
    .bind(agent_id)
    .bind(req.service_id)
    .fetch_one(&state.db)
    .await?;

    if !offers {
        return Err(ApiError::bad_request("This agent does not offer that service"));
    }

    let booking_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO bookings (id, client_id, agent_id, service_id, status, scheduled_at, address, total_price, notes)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8)
        "#,
    )
    .bind(booking_id)
    .bind(auth.user_id)
    .bind(agent_id)
    .bind(req.service_id)
    .bind(req.scheduled_at)
    .bind(req.address.trim())
    .bind(total_price)
    .bind(&req.notes)
    .execute(&state.db)
    .await?;

    tracing::info!(
        booking_id = %booking_id,
        client_uuid = %auth.user_uuid,
        agent_uuid = %req.agent_uuid,
        total_price = %total_price,
        "Booking created"
    );

    let booking = fetch_booking(&state.db, booking_id).await?;

    if let Err(e) = notifications::notify_booking_requested(
        &state.db,
        agent_id,
        booking_id,
        &booking.client_name,
        &service_name,
        total_price,
    )
    .await
    {
        tracing::warn!(error = %e, "Failed to notify agent of new booking");
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(booking.into_response())),
    ))
}

#[derive(Debug, Deserialize, Default)]
pub struct BookingQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    #[serde(flatten)]
    pub filter: BookingQuery,
}

/// GET /bookings
///
/// The caller's bookings: as client, as agent, or everything for admins.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<BookingQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query.filter.status.map(|s| s.to_string());

    // Admins see all bookings; everyone else only their own side
    let (scope_clause, scope_id) = match auth.role {
        Role::Admin => ("TRUE", None),
        Role::Agent => ("b.agent_id = $2", Some(auth.user_id)),
        Role::Client => ("b.client_id = $2", Some(auth.user_id)),
    };

    let total: i64 = if let Some(id) = scope_id {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM bookings b WHERE ($1::text IS NULL OR b.status = $1) AND {}",
            scope_clause
        ))
        .bind(&status)
        .bind(id)
        .fetch_one(&state.db)
        .await?
    } else {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings b WHERE ($1::text IS NULL OR b.status = $1)",
        )
        .bind(&status)
        .fetch_one(&state.db)
        .await?
    };

    let limit = query.pagination.limit() as i64;
    let offset = query.pagination.offset() as i64;

    let rows = if let Some(id) = scope_id {
        sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE ($1::text IS NULL OR b.status = $1) AND {} ORDER BY b.created_at DESC LIMIT $3 OFFSET $4",
            BOOKING_SELECT, scope_clause
        ))
        .bind(&status)
        .bind(id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE ($1::text IS NULL OR b.status = $1) ORDER BY b.created_at DESC LIMIT $2 OFFSET $3",
            BOOKING_SELECT
        ))
        .bind(&status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?
    };

    let data: Vec<BookingResponse> = rows.into_iter().map(BookingRow::into_response).collect();
    Ok(Json(Paginated::new(data, &query.pagination, total as u64)))
}

/// GET /bookings/:id
///
/// A single booking; only its parties (or an admin) may see it.
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = fetch_booking(&state.db, booking_id).await?;

    let is_party = booking.client_id == auth.user_id || booking.agent_id == auth.user_id;
    if !is_party && !auth.is_admin() {
        return Err(ApiError::forbidden("You are not a party to this booking"));
    }

    Ok(Json(DataResponse::new(booking.into_response())))
}

/// PATCH /bookings/:id
///
/// Move a booking to a new status. Legality is checked against the
/// transition table for the caller's side, then applied as a
/// compare-and-swap; escrow moves in the same transaction.
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = fetch_booking(&state.db, booking_id).await?;

    let actor = if booking.client_id == auth.user_id {
        BookingActor::Client
    } else if booking.agent_id == auth.user_id {
        BookingActor::Agent
    } else {
        return Err(ApiError::forbidden("You are not a party to this booking"));
    };

    let current = booking.status();
    let target = req.status;

    if !transition_allowed(actor, current, target) {
        // A legal edge for the other side means the caller is the wrong
        // actor; anything else is an illegal transition.
        let other = match actor {
            BookingActor::Client => BookingActor::Agent,
            BookingActor::Agent => BookingActor::Client,
        };
        if transition_allowed(other, current, target) {
            return Err(ApiError::forbidden(format!(
                "Only the {} may move this booking to {}",
                match other {
                    BookingActor::Client => "client",
                    BookingActor::Agent => "agent",
                },
                target
            )));
        }
        return Err(ApiError::conflict(format!(
            "Cannot move a {} booking to {}",
            current, target
        )));
    }

    let mut tx = state.db.begin().await?;

    // Single winner under concurrency: the flip only lands if the status
    // is still what the caller saw.
    let flipped = sqlx::query(
        "UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
    )
    .bind(target.to_string())
    .bind(booking_id)
    .bind(current.to_string())
    .execute(&mut *tx)
    .await?;

    if flipped.rows_affected() == 0 {
        return Err(ApiError::conflict(
            "Booking was updated concurrently; reload and retry",
        ));
    }

    let mut payout: Option<Decimal> = None;
    let mut points: i64 = 0;

    match target {
        BookingStatus::Accepted => {
            settlement::hold_escrow(&mut tx, booking.client_id, booking_id, booking.total_price)
                .await?;
        }
        BookingStatus::Completed => {
            let released = settlement::release_escrow(
                &mut tx,
                booking.client_id,
                booking.agent_id,
                booking_id,
                booking.total_price,
                state.settings.platform_fee_percent,
            )
            .await?;
            points = settlement::loyalty_points_for(booking.total_price);
            payout = Some(released);
        }
        _ => {}
    }

    tx.commit().await?;

    tracing::info!(
        booking_id = %booking_id,
        from = %current,
        to = %target,
        actor_uuid = %auth.user_uuid,
        "Booking status changed"
    );

    dispatch_transition_notifications(&state, &booking, target, payout, points).await;

    let updated = fetch_booking(&state.db, booking_id).await?;
    Ok(Json(DataResponse::new(updated.into_response())))
}

/// Best-effort notifications after a committed transition
async fn dispatch_transition_notifications(
    state: &AppState,
    booking: &BookingRow,
    target: BookingStatus,
    payout: Option<Decimal>,
    loyalty_points: i64,
) {
    let db = &state.db;
    let result = match target {
        BookingStatus::Accepted => {
            notifications::notify_booking_accepted(
                db,
                booking.client_id,
                booking.id,
                &booking.agent_name,
                &booking.service_name,
            )
            .await
        }
        BookingStatus::Declined => {
            notifications::notify_booking_declined(
                db,
                booking.client_id,
                booking.id,
                &booking.agent_name,
                &booking.service_name,
            )
            .await
        }
        BookingStatus::InProgress => {
            notifications::notify_booking_started(
                db,
                booking.client_id,
                booking.id,
                &booking.agent_name,
                &booking.service_name,
            )
            .await
        }
        BookingStatus::Completed => {
            let client_note = notifications::notify_booking_completed(
                db,
                booking.client_id,
                booking.id,
                &booking.agent_name,
                &booking.service_name,
                loyalty_points,
            )
            .await;

            if let Some(payout) = payout {
                if let Err(e) =
                    notifications::notify_escrow_released(db, booking.agent_id, booking.id, payout)
                        .await
                {
                    tracing::warn!(error = %e, "Failed to notify agent of escrow release");
                }
            }

            // Completed work shows up on the agent's public profile
            let _ = state
                .cache
                .delete_pattern(&keys::agent_pattern(booking.agent_uuid))
                .await;

            client_note
        }
        BookingStatus::Cancelled => {
            notifications::notify_booking_cancelled(
                db,
                booking.agent_id,
                booking.id,
                &booking.client_name,
                &booking.service_name,
            )
            .await
        }
        BookingStatus::Pending => return,
    };

    if let Err(e) = result {
        tracing::warn!(error = %e, booking_id = %booking.id, "Failed to dispatch booking notification");
    }
}

/// POST /bookings/:id/review
///
/// Review a completed booking. One review per booking, client side only.
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let booking = fetch_booking(&state.db, booking_id).await?;

    if booking.client_id != auth.user_id {
        return Err(ApiError::forbidden("Only the booking's client may leave a review"));
    }

    if booking.status() != BookingStatus::Completed {
        return Err(ApiError::conflict("Only completed bookings can be reviewed"));
    }

    let review_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO reviews (id, booking_id, client_id, agent_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(review_id)
    .bind(booking_id)
    .bind(booking.client_id)
    .bind(booking.agent_id)
    .bind(req.rating)
    .bind(&req.comment)
    .execute(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("This booking has already been reviewed")
        }
        _ => ApiError::from(e),
    })?;

    tracing::info!(
        review_id = %review_id,
        booking_id = %booking_id,
        rating = req.rating,
        "Review created"
    );

    if let Err(e) = notifications::notify_review_received(
        &state.db,
        booking.agent_id,
        review_id,
        &booking.client_name,
        req.rating,
    )
    .await
    {
        tracing::warn!(error = %e, "Failed to notify agent of review");
    }

    // Rating aggregate on the agent profile is now stale
    let _ = state
        .cache
        .delete_pattern(&keys::agent_pattern(booking.agent_uuid))
        .await;

    let response = ReviewResponse {
        id: review_id,
        booking_id,
        rating: req.rating,
        comment: req.comment,
        client_uuid: booking.client_uuid,
        client_name: booking.client_name,
        created_at: Utc::now(),
    };

    Ok((StatusCode::CREATED, Json(DataResponse::new(response))))
}
