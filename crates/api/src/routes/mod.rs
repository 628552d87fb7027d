pub mod appointments;
pub mod health;
pub mod services;
pub mod subscriptions;
pub mod sweeps;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(services::router())
        .merge(appointments::router())
        .merge(subscriptions::router())
        .merge(sweeps::router())
        .with_state(state)
}
