//! Defines routes for the registry's two front-ends.
//!
//! ## Structure
//! - **Health**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Bot transport**
//!   - `POST   /bot/updates` — inbound update, returns the action to perform
//!
//! - **Admin API** (bearer passcode)
//!   - `GET    /admin/files` — list records (supports `?search=`)
//!   - `GET    /admin/files/{id}` — single record
//!   - `DELETE /admin/files/{id}` — delete record, retiring its token

use crate::{
    handlers::{
        admin_handlers::{delete_file, get_file, list_files, require_dashboard},
        bot_handlers::bot_update,
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Build and return the router for all registry routes.
///
/// The admin routes carry their own auth layer; the state is attached here
/// so the returned router is ready to serve.
pub fn routes(state: AppState) -> Router {
    let admin = Router::new()
        .route("/files", get(list_files))
        .route("/files/{id}", get(get_file).delete(delete_file))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_dashboard,
        ));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/bot/updates", post(bot_update))
        .nest("/admin", admin)
        .with_state(state)
}
