pub mod admin;
pub mod agents;
pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod me;
pub mod notifications;
pub mod payment_methods;
pub mod reports;
pub mod wallet;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Two-factor auth
        .route("/two-factor/enable", post(auth::enable_two_factor))
        .route("/two-factor/confirm", post(auth::confirm_two_factor))
        .route("/two-factor/disable", post(auth::disable_two_factor))
        // Sessions
        .route("/sessions", get(auth::list_sessions))
        .route("/sessions/:session_id", delete(auth::revoke_session))
        // Current user
        .route("/me", get(me::get_me))
        .route("/me", patch(me::update_me))
        // Service catalog (public)
        .route("/services", get(catalog::list_services))
        .route("/services/:slug", get(catalog::get_service))
        // Agent directory (public) and agent self-service
        .route("/agents", get(agents::list_agents))
        .route("/agents/me/services", put(agents::set_my_services))
        .route("/agents/:agent_uuid", get(agents::get_agent))
        .route("/agents/:agent_uuid/reviews", get(agents::list_agent_reviews))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/:booking_id", get(bookings::get_booking))
        .route("/bookings/:booking_id", patch(bookings::update_booking_status))
        .route("/bookings/:booking_id/review", post(bookings::create_review))
        // Payment methods
        .route("/payment-methods", get(payment_methods::list_payment_methods))
        .route("/payment-methods", post(payment_methods::add_payment_method))
        .route(
            "/payment-methods/:method_id/default",
            patch(payment_methods::set_default_payment_method),
        )
        .route(
            "/payment-methods/:method_id",
            delete(payment_methods::delete_payment_method),
        )
        // Wallet
        .route("/wallet/fund/initialize", post(wallet::initialize_funding))
        .route("/wallet/fund/verify", post(wallet::verify_funding))
        .route("/wallet/transactions", get(wallet::list_transactions))
        // Notifications
        .route("/users/notifications", get(notifications::list_notifications))
        .route("/users/notifications", delete(notifications::delete_all_read))
        .route(
            "/users/notifications/unread-count",
            get(notifications::get_unread_count),
        )
        .route(
            "/users/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/users/notifications/:notification_uuid/read",
            post(notifications::mark_notification_read),
        )
        // Reports
        .route("/reports", post(reports::create_report))
        // Admin
        .route("/admin/services", post(admin::create_service))
        .route("/admin/services/:service_id", patch(admin::update_service))
        .route(
            "/admin/agents/:agent_uuid/vetting",
            patch(admin::set_agent_vetting),
        )
        .route("/admin/reports", get(admin::list_reports))
        .route("/admin/reports/:report_id", patch(admin::update_report))
}
