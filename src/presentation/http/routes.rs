//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use super::handlers;
use crate::presentation::middleware::{
    auth_middleware, create_security_headers_layer, logging::track_metrics, rate_limit_api,
    rate_limit_auth,
};
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let security_headers = create_security_headers_layer(&state.settings);

    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(handlers::health::metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        // Outermost, so headers are added to every response
        .layer(security_headers)
        .with_state(state)
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Public routes (auth has its own stricter rate limiting)
        .nest("/auth", auth_routes(state.clone()))
        .nest("/tools", tool_routes(state.clone()))
        // Protected routes (require authentication)
        .nest("/tenants", protected(tenant_routes(), state.clone()))
        .nest("/users", protected(user_routes(), state.clone()))
        .nest("/forms", protected(form_routes(), state.clone()))
        .nest("/timesheets", protected(timesheet_routes(), state.clone()))
        .nest("/expenses", protected(expense_routes(), state.clone()))
        .nest("/permits", protected(permit_routes(), state.clone()))
        .nest(
            "/billing",
            protected(
                Router::new().route("/summary", get(handlers::billing::billing_summary)),
                state.clone(),
            ),
        )
        .nest(
            "/audit",
            protected(
                Router::new().route("/", get(handlers::audit::list_audit_entries)),
                state,
            ),
        )
}

/// Authentication runs first, so the API limit is counted per user
fn protected(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Authentication routes (public, with stricter rate limiting)
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route("/logout", post(handlers::auth::logout))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_auth))
}

/// Field tools: volume is public, the text tools need a session
fn tool_routes(state: AppState) -> Router<AppState> {
    let authenticated = protected(
        Router::new()
            .route("/journal", post(handlers::tools::journal))
            .route("/sanitize", post(handlers::tools::sanitize)),
        state.clone(),
    );

    Router::new()
        .route("/volume", post(handlers::tools::volume))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_api))
        .merge(authenticated)
}

fn tenant_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::tenants::create_tenant))
        .route("/current", get(handlers::tenants::current_tenant))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/@me", get(handlers::users::get_current_user))
        .route("/{user_id}/roles", put(handlers::users::set_roles))
}

fn form_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::forms::list_forms).post(handlers::forms::create_form),
        )
        .route(
            "/{form_id}",
            get(handlers::forms::get_form)
                .put(handlers::forms::update_form)
                .delete(handlers::forms::delete_form),
        )
        .route("/{form_id}/submit", post(handlers::forms::submit_form))
        .route("/{form_id}/approve", post(handlers::forms::approve_form))
        .route("/{form_id}/reject", post(handlers::forms::reject_form))
        .route("/{form_id}/lock", post(handlers::forms::lock_form))
}

fn timesheet_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::timesheets::list_entries).post(handlers::timesheets::create_entry),
        )
        .route("/weekly-summary", get(handlers::timesheets::weekly_summary))
        .route(
            "/{entry_id}",
            get(handlers::timesheets::get_entry)
                .put(handlers::timesheets::update_entry)
                .delete(handlers::timesheets::delete_entry),
        )
        .route("/{entry_id}/submit", post(handlers::timesheets::submit_entry))
        .route("/{entry_id}/approve", post(handlers::timesheets::approve_entry))
        .route("/{entry_id}/reject", post(handlers::timesheets::reject_entry))
}

fn expense_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense),
        )
        .route(
            "/{expense_id}",
            get(handlers::expenses::get_expense)
                .put(handlers::expenses::update_expense)
                .delete(handlers::expenses::delete_expense),
        )
        .route("/{expense_id}/submit", post(handlers::expenses::submit_expense))
        .route("/{expense_id}/approve", post(handlers::expenses::approve_expense))
        .route("/{expense_id}/reject", post(handlers::expenses::reject_expense))
}

fn permit_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::permits::list_permits).post(handlers::permits::create_permit),
        )
        .route("/regulations", get(handlers::permits::all_regulations))
        .route("/regulations/{province}", get(handlers::permits::regulations))
        .route("/{permit_id}", get(handlers::permits::get_permit))
        .route("/{permit_id}/readings", post(handlers::permits::add_reading))
        .route("/{permit_id}/activate", post(handlers::permits::activate_permit))
        .route("/{permit_id}/close", post(handlers::permits::close_permit))
        .route("/{permit_id}/cancel", post(handlers::permits::cancel_permit))
        .route("/{permit_id}/compliance", get(handlers::permits::compliance_report))
}
