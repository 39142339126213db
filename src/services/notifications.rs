//! Notification service
//!
//! Provides functions to create notifications from other parts of the
//! application. Routes call these when events occur that the affected
//! user should hear about; failures are logged by callers and never fail
//! the triggering request.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::notifications::NotificationKind;

/// Create a notification for a user. Returns the public UUID.
pub async fn create_notification(
    db: &PgPool,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    message: Option<&str>,
    data: Option<serde_json::Value>,
) -> Result<Uuid, sqlx::Error> {
    let uuid = Uuid::new_v4();
    let kind_str = kind.to_string();
    let data = data.unwrap_or(serde_json::json!({}));

    sqlx::query(
        r#"
        INSERT INTO notifications (uuid, user_id, kind, title, message, data)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(uuid)
    .bind(user_id)
    .bind(&kind_str)
    .bind(title)
    .bind(message)
    .bind(&data)
    .execute(db)
    .await?;

    tracing::info!(
        user_id = user_id,
        kind = %kind_str,
        notification_uuid = %uuid,
        "Notification created"
    );

    Ok(uuid)
}

/// Notify an agent of a new booking request
pub async fn notify_booking_requested(
    db: &PgPool,
    agent_id: i64,
    booking_id: Uuid,
    client_name: &str,
    service_name: &str,
    total_price: Decimal,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        agent_id,
        NotificationKind::BookingRequested,
        &format!("New booking request: {}", service_name),
        Some(&format!(
            "{} requested {} for ₦{}",
            client_name, service_name, total_price
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "service_name": service_name,
            "total_price": total_price,
        })),
    )
    .await
}

/// Notify a client that the agent accepted their booking
pub async fn notify_booking_accepted(
    db: &PgPool,
    client_id: i64,
    booking_id: Uuid,
    agent_name: &str,
    service_name: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        client_id,
        NotificationKind::BookingAccepted,
        "Booking accepted",
        Some(&format!(
            "{} accepted your {} booking. Your wallet has been charged and the payment is held until completion.",
            agent_name, service_name
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "service_name": service_name,
        })),
    )
    .await
}

/// Notify a client that the agent declined their booking
pub async fn notify_booking_declined(
    db: &PgPool,
    client_id: i64,
    booking_id: Uuid,
    agent_name: &str,
    service_name: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        client_id,
        NotificationKind::BookingDeclined,
        "Booking declined",
        Some(&format!(
            "{} is unavailable for your {} booking. You can book another agent.",
            agent_name, service_name
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "service_name": service_name,
        })),
    )
    .await
}

/// Notify a client that work has started
pub async fn notify_booking_started(
    db: &PgPool,
    client_id: i64,
    booking_id: Uuid,
    agent_name: &str,
    service_name: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        client_id,
        NotificationKind::BookingStarted,
        "Work in progress",
        Some(&format!(
            "{} has started your {} booking.",
            agent_name, service_name
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "service_name": service_name,
        })),
    )
    .await
}

/// Notify a client that the booking is complete and they may review
pub async fn notify_booking_completed(
    db: &PgPool,
    client_id: i64,
    booking_id: Uuid,
    agent_name: &str,
    service_name: &str,
    loyalty_points: i64,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        client_id,
        NotificationKind::BookingCompleted,
        "Booking completed",
        Some(&format!(
            "{} completed your {} booking. You earned {} loyalty points. Leave a review!",
            agent_name, service_name, loyalty_points
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "service_name": service_name,
            "loyalty_points": loyalty_points,
        })),
    )
    .await
}

/// Notify an agent that the client cancelled a pending request
pub async fn notify_booking_cancelled(
    db: &PgPool,
    agent_id: i64,
    booking_id: Uuid,
    client_name: &str,
    service_name: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        agent_id,
        NotificationKind::BookingCancelled,
        "Booking cancelled",
        Some(&format!(
            "{} cancelled their {} request.",
            client_name, service_name
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "service_name": service_name,
        })),
    )
    .await
}

/// Notify an agent that escrow was released to their wallet
pub async fn notify_escrow_released(
    db: &PgPool,
    agent_id: i64,
    booking_id: Uuid,
    payout: Decimal,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        agent_id,
        NotificationKind::EscrowReleased,
        "Payment released",
        Some(&format!(
            "₦{} has been released to your wallet.",
            payout
        )),
        Some(serde_json::json!({
            "booking_id": booking_id,
            "payout": payout,
        })),
    )
    .await
}

/// Notify an agent of a new review
pub async fn notify_review_received(
    db: &PgPool,
    agent_id: i64,
    review_id: Uuid,
    reviewer_name: &str,
    rating: i16,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        agent_id,
        NotificationKind::ReviewReceived,
        &format!("New review from {}", reviewer_name),
        Some(&format!(
            "{} left you a {}-star review.",
            reviewer_name, rating
        )),
        Some(serde_json::json!({
            "review_id": review_id,
            "reviewer_name": reviewer_name,
            "rating": rating,
        })),
    )
    .await
}

/// Notify a user that their wallet top-up landed
pub async fn notify_wallet_funded(
    db: &PgPool,
    user_id: i64,
    amount: Decimal,
    reference: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        user_id,
        NotificationKind::WalletFunded,
        "Wallet funded",
        Some(&format!("₦{} has been added to your wallet.", amount)),
        Some(serde_json::json!({
            "amount": amount,
            "reference": reference,
        })),
    )
    .await
}

/// Notify an agent that they passed vetting
pub async fn notify_agent_vetted(db: &PgPool, agent_id: i64) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        agent_id,
        NotificationKind::AgentVetted,
        "You are now a vetted agent!",
        Some("Your identity verification is complete. Clients will see a vetted badge on your profile."),
        None,
    )
    .await
}
