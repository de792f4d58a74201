// routes/mod.rs
// Route handlers and the application router.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::session::require_session;
use crate::state::AppState;

pub mod admin;
pub mod api;
pub mod home;
pub mod login;
pub mod logout;
pub mod receipt;

pub use admin::*;
pub use home::home;
pub use login::login;
pub use logout::logout;
pub use receipt::payment_receipt;

/// Full application: public login routes plus everything behind the session layer.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route(
            "/api/payments",
            get(api::list_payments)
                .post(api::create_payment)
                .fallback(api::method_not_allowed),
        )
        .route(
            "/api/payments/prices",
            post(api::derive_prices).fallback(api::method_not_allowed),
        )
        .route(
            "/api/payments/{id}",
            put(api::update_payment).fallback(api::method_not_allowed),
        )
        .route("/api/domains/my", get(api::my_domains))
        .route(
            "/api/services",
            get(api::list_services).post(api::create_service),
        )
        .route("/payments/{id}/receipt", get(payment_receipt))
        .route(
            "/admin/companies",
            get(companies_index).post(companies_create),
        )
        .route("/admin/companies/new", get(companies_new))
        .route("/admin/companies/{id}/edit", get(companies_edit))
        .route("/admin/companies/{id}/update", post(companies_update))
        .route("/admin/companies/{id}/delete", post(companies_delete))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/", get(home))
        .route("/login", post(login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
