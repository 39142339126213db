//! Paystack gateway client.
//!
//! Provides type-safe methods for:
//! - Transaction initialization (wallet top-ups, card enrollment charges)
//! - Transaction verification
//!
//! Amounts cross this boundary in kobo (Paystack's integer unit); the rest
//! of the service works in Naira decimals. Card data never passes through
//! here; only the gateway's authorization tokens come back.

use anyhow::{Context, Result};
use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::ApiError;

/// Client for the Paystack API.
#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

/// Standard Paystack response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

/// Payload returned by `POST /transaction/initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Payload returned by `GET /transaction/verify/:reference`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    pub status: String,
    pub reference: String,
    /// Amount in kobo
    pub amount: i64,
    #[serde(default)]
    pub authorization: Option<Authorization>,
}

/// A reusable card authorization token.
#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    pub authorization_code: String,
    pub last4: String,
    pub exp_month: String,
    pub exp_year: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub reusable: bool,
}

impl VerifyData {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }

    /// Verified amount in Naira
    pub fn amount_naira(&self) -> Decimal {
        kobo_to_naira(self.amount)
    }
}

impl Authorization {
    /// Card brand, falling back to the gateway's card_type field
    pub fn display_brand(&self) -> String {
        self.brand
            .clone()
            .or_else(|| self.card_type.clone())
            .map(|b| b.trim().to_string())
            .unwrap_or_else(|| "card".to_string())
    }
}

/// Convert a Naira amount to kobo, rounding to the nearest kobo
pub fn naira_to_kobo(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .unwrap_or(0)
}

/// Convert a kobo amount to Naira with two fraction digits
pub fn kobo_to_naira(kobo: i64) -> Decimal {
    Decimal::new(kobo, 2)
}

impl PaystackClient {
    /// Create a new gateway client.
    pub fn new(base_url: &str, secret_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Paystack client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// Start a transaction; the caller redirects the user to the returned
    /// authorization URL.
    #[instrument(skip(self))]
    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount: Decimal,
        reference: &str,
    ) -> Result<InitializeData, ApiError> {
        #[derive(Serialize)]
        struct Request<'a> {
            email: &'a str,
            /// kobo
            amount: i64,
            reference: &'a str,
        }

        self.post(
            "/transaction/initialize",
            &Request {
                email,
                amount: naira_to_kobo(amount),
                reference,
            },
        )
        .await
    }

    /// Verify a transaction by reference, retrying transient gateway
    /// failures with exponential backoff.
    #[instrument(skip(self))]
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyData, ApiError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_elapsed_time(Some(Duration::from_secs(15)))
            .build();

        backoff::future::retry(policy, || async {
            self.verify_once(reference).await.map_err(|e| match e {
                // Server-side and transport failures are worth retrying
                ApiError::Internal(_) => backoff::Error::transient(e),
                other => backoff::Error::permanent(other),
            })
        })
        .await
    }

    async fn verify_once(&self, reference: &str) -> Result<VerifyData, ApiError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        debug!(url = %url, "Gateway verify request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gateway request failed");
                ApiError::Internal(anyhow::anyhow!("Payment gateway unavailable: {}", e))
            })?;

        Self::unwrap_envelope(response).await
    }

    /// Make a POST request to the gateway.
    async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        debug!(url = %url, "Gateway request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gateway request failed");
                ApiError::Internal(anyhow::anyhow!("Payment gateway unavailable: {}", e))
            })?;

        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<R: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, ApiError> {
        let status = response.status();

        if status.is_success() {
            let envelope = response.json::<Envelope<R>>().await.map_err(|e| {
                error!(error = %e, "Failed to parse gateway response");
                ApiError::Internal(anyhow::anyhow!("Invalid gateway response: {}", e))
            })?;

            if !envelope.status {
                return Err(ApiError::bad_request(envelope.message));
            }

            envelope
                .data
                .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Gateway response missing data")))
        } else {
            let message = response
                .json::<Envelope<serde_json::Value>>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("Gateway error: {}", status));

            match status {
                StatusCode::BAD_REQUEST => Err(ApiError::bad_request(message)),
                StatusCode::NOT_FOUND => Err(ApiError::not_found(message)),
                StatusCode::UNAUTHORIZED => {
                    error!("Gateway authentication failed");
                    Err(ApiError::Internal(anyhow::anyhow!("Gateway auth error")))
                }
                _ => {
                    error!(status = %status, message = %message, "Gateway error");
                    Err(ApiError::Internal(anyhow::anyhow!(message)))
                }
            }
        }
    }

    /// Check gateway reachability.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/bank?perPage=1", self.base_url);

        self.client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Gateway health check failed")?
            .error_for_status()
            .context("Gateway unhealthy")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naira_kobo_conversion() {
        let amount = Decimal::new(1200000, 2); // 12000.00
        assert_eq!(naira_to_kobo(amount), 1_200_000);
        assert_eq!(kobo_to_naira(1_200_000), amount);

        // sub-kobo precision rounds to the nearest kobo
        assert_eq!(naira_to_kobo(Decimal::new(10006, 3)), 1001); // 10.006
    }

    #[test]
    fn test_verify_data_parsing() {
        let body = r#"{
            "status": "success",
            "reference": "FRFX-abc123",
            "amount": 1200000,
            "authorization": {
                "authorization_code": "AUTH_x9y8z7",
                "last4": "4081",
                "exp_month": "12",
                "exp_year": "2030",
                "brand": "visa",
                "card_type": "visa DEBIT",
                "signature": "SIG_abcdef",
                "reusable": true
            }
        }"#;

        let data: VerifyData = serde_json::from_str(body).unwrap();
        assert!(data.is_successful());
        assert_eq!(data.amount_naira(), Decimal::new(1200000, 2));

        let auth = data.authorization.unwrap();
        assert_eq!(auth.display_brand(), "visa");
        assert!(auth.reusable);
    }

    #[test]
    fn test_verify_data_without_authorization() {
        let body = r#"{"status": "failed", "reference": "FRFX-x", "amount": 50000}"#;
        let data: VerifyData = serde_json::from_str(body).unwrap();
        assert!(!data.is_successful());
        assert!(data.authorization.is_none());
    }

    #[test]
    fn test_display_brand_fallbacks() {
        let auth = Authorization {
            authorization_code: "AUTH_1".to_string(),
            last4: "1234".to_string(),
            exp_month: "01".to_string(),
            exp_year: "2031".to_string(),
            brand: None,
            card_type: Some(" mastercard ".to_string()),
            signature: None,
            reusable: true,
        };
        assert_eq!(auth.display_brand(), "mastercard");
    }
}
