//! Service layer modules for external integrations and cross-cutting flows.
//!
//! Contains the Redis cache, the Paystack gateway client, notification
//! dispatch helpers, and wallet settlement.

pub mod cache;
pub mod notifications;
pub mod paystack;
pub mod settlement;

pub use cache::RedisCache;
pub use paystack::PaystackClient;
