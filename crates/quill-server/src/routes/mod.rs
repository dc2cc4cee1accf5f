// Export route modules
pub mod agent;
pub mod upload;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(agent::routes(state.clone()))
        .merge(upload::routes(state))
}
