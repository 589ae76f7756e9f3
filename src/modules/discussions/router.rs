use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{get_thread, reply_to_thread};

pub fn init_threads_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_thread))
        .route("/{id}/replies", post(reply_to_thread))
}
