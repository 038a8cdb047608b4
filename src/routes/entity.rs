//! Resource routes built from the reflected model. Paths are parameterized
//! so handlers resolve the table by segment; both the trailing-slash form
//! (which generated links use) and the bare form are routed.

use crate::handlers::entity::{create, delete as delete_row, list, read, update};
use crate::handlers::index::index;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/:segment", get(list).post(create))
        .route("/:segment/", get(list).post(create))
        .route("/:segment/:id", get(read).patch(update).delete(delete_row))
        .route("/:segment/:id/", get(read).patch(update).delete(delete_row))
        .with_state(state)
}
