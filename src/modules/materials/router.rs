use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{delete_material, get_material, update_material};

pub fn init_materials_router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(get_material)
            .patch(update_material)
            .delete(delete_material),
    )
}
