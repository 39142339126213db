//! Wallet and payment-instrument domain types
//!
//! Only gateway-issued tokens are persisted; the raw card never reaches
//! this service. Amounts are Naira with two fraction digits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Tokenized payment instrument
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodResponse {
    pub id: Uuid,
    pub brand: String,
    pub last4: String,
    pub exp_month: String,
    pub exp_year: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to attach a payment method: the reference of a completed
/// gateway charge whose authorization we tokenize
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddPaymentMethodRequest {
    #[validate(length(min = 1, message = "reference is required"))]
    pub reference: String,
}

/// Wallet ledger entry kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionKind {
    Topup,
    EscrowHold,
    EscrowRelease,
}

impl std::fmt::Display for WalletTransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Topup => write!(f, "topup"),
            Self::EscrowHold => write!(f, "escrow_hold"),
            Self::EscrowRelease => write!(f, "escrow_release"),
        }
    }
}

/// Wallet ledger entry status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for WalletTransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Wallet ledger entry
#[derive(Debug, Clone, Serialize)]
pub struct WalletTransactionResponse {
    pub id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub reference: String,
    pub status: String,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Request to start a wallet top-up
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FundInitializeRequest {
    /// Naira amount, minimum ₦100
    #[validate(range(min = 100.0, message = "minimum top-up is 100 naira"))]
    pub amount: f64,
}

/// Gateway hand-off for a started top-up
#[derive(Debug, Clone, Serialize)]
pub struct FundInitializeResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Request to confirm a top-up after the gateway redirect
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FundVerifyRequest {
    #[validate(length(min = 1, message = "reference is required"))]
    pub reference: String,
}

/// Confirmation payload: the ledger entry plus the new balance
#[derive(Debug, Clone, Serialize)]
pub struct FundVerifyResponse {
    pub transaction: WalletTransactionResponse,
    pub balance: Decimal,
}
