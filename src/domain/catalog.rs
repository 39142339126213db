//! Service catalog domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Full catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Compact catalog entry embedded in agent profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub base_price: Decimal,
}

/// Admin request to create a catalog entry
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: String,

    #[validate(length(min = 2, max = 60, message = "category must be 2-60 characters"))]
    pub category: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "base_price must not be negative"))]
    pub base_price: f64,

    #[serde(default)]
    pub icon: Option<String>,
}

/// Admin request to update a catalog entry
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub base_price: Option<f64>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Query params for catalog listing
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// Derive a URL slug from a service name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("AC Maintenance"), "ac-maintenance");
        assert_eq!(slugify("Deep  Cleaning!"), "deep-cleaning");
        assert_eq!(slugify("Plumbing & Repairs"), "plumbing-repairs");
        assert_eq!(slugify("---"), "");
    }
}
