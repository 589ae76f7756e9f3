use axum::{
    Router,
    routing::{get, patch},
};

use crate::modules::materials::controller::{create_material, list_materials};
use crate::state::AppState;

use super::controller::{delete_module, update_module};

pub fn init_course_modules_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", patch(update_module).delete(delete_module))
        .route("/{id}/materials", get(list_materials).post(create_material))
}
