//! Wallet settlement for the booking lifecycle.
//!
//! Funds are held when an agent accepts a booking and released when the
//! work completes. Both moves run inside the caller's database transaction,
//! alongside the status compare-and-swap, so a failed settlement rolls the
//! status change back with it.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::domain::payments::{WalletTransactionKind, WalletTransactionStatus};
use crate::error::ApiError;

/// Loyalty accrual: one point per ₦100 of a completed booking
pub fn loyalty_points_for(amount: Decimal) -> i64 {
    (amount / Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(0)
}

/// Agent payout after the platform fee, rounded to the kobo
pub fn payout_after_fee(amount: Decimal, fee_percent: Decimal) -> Decimal {
    (amount * (Decimal::ONE_HUNDRED - fee_percent) / Decimal::ONE_HUNDRED).round_dp(2)
}

/// Debit the client's wallet into escrow for an accepted booking.
///
/// Fails with 409 when the balance cannot cover the amount; the guard is
/// the conditional UPDATE, so a concurrent spend cannot overdraw.
pub async fn hold_escrow(
    tx: &mut Transaction<'_, Postgres>,
    client_id: i64,
    booking_id: Uuid,
    amount: Decimal,
) -> Result<(), ApiError> {
    let debited = sqlx::query(
        r#"
        UPDATE users
        SET balance = balance - $1, updated_at = NOW()
        WHERE id = $2 AND balance >= $1
        "#,
    )
    .bind(amount)
    .bind(client_id)
    .execute(&mut **tx)
    .await?;

    if debited.rows_affected() == 0 {
        return Err(ApiError::conflict(
            "Client wallet balance cannot cover this booking",
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (id, user_id, kind, amount, reference, status, booking_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(client_id)
    .bind(WalletTransactionKind::EscrowHold.to_string())
    .bind(-amount)
    .bind(format!("ESCROW-HOLD-{}", booking_id))
    .bind(WalletTransactionStatus::Success.to_string())
    .bind(booking_id)
    .execute(&mut **tx)
    .await?;

    tracing::info!(
        booking_id = %booking_id,
        client_id = client_id,
        amount = %amount,
        "Escrow held"
    );

    Ok(())
}

/// Release held funds to the agent and accrue the client's loyalty points.
///
/// Returns the agent payout (booking total minus the platform fee).
pub async fn release_escrow(
    tx: &mut Transaction<'_, Postgres>,
    client_id: i64,
    agent_id: i64,
    booking_id: Uuid,
    amount: Decimal,
    fee_percent: Decimal,
) -> Result<Decimal, ApiError> {
    let payout = payout_after_fee(amount, fee_percent);

    sqlx::query(
        r#"
        UPDATE users
        SET balance = balance + $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(payout)
    .bind(agent_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (id, user_id, kind, amount, reference, status, booking_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(agent_id)
    .bind(WalletTransactionKind::EscrowRelease.to_string())
    .bind(payout)
    .bind(format!("ESCROW-RELEASE-{}", booking_id))
    .bind(WalletTransactionStatus::Success.to_string())
    .bind(booking_id)
    .execute(&mut **tx)
    .await?;

    let points = loyalty_points_for(amount);
    if points > 0 {
        sqlx::query(
            r#"
            UPDATE users
            SET loyalty_points = loyalty_points + $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(points)
        .bind(client_id)
        .execute(&mut **tx)
        .await?;
    }

    tracing::info!(
        booking_id = %booking_id,
        agent_id = agent_id,
        payout = %payout,
        loyalty_points = points,
        "Escrow released"
    );

    Ok(payout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loyalty_points() {
        assert_eq!(loyalty_points_for(Decimal::new(1200000, 2)), 120); // ₦12,000
        assert_eq!(loyalty_points_for(Decimal::new(9999, 2)), 0); // ₦99.99
        assert_eq!(loyalty_points_for(Decimal::new(10000, 2)), 1); // ₦100
    }

    #[test]
    fn test_payout_after_fee() {
        let amount = Decimal::new(1200000, 2); // ₦12,000
        let fee = Decimal::new(10, 0); // 10%
        assert_eq!(payout_after_fee(amount, fee), Decimal::new(1080000, 2));

        // zero fee passes through unchanged
        assert_eq!(payout_after_fee(amount, Decimal::ZERO), amount);
    }

    #[test]
    fn test_payout_rounds_to_kobo() {
        let amount = Decimal::new(10001, 2); // ₦100.01
        let fee = Decimal::new(3, 0); // 3% -> 97.0097
        assert_eq!(payout_after_fee(amount, fee), Decimal::new(9701, 2));
    }
}
