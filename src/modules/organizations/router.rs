use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    add_member, change_member_role, create_organization, delete_organization, get_organization,
    join_organization, list_members, list_organizations,
};

pub fn init_organizations_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_organization).get(list_organizations))
        .route(
            "/{org_id}",
            get(get_organization).delete(delete_organization),
        )
        .route("/{org_id}/join", post(join_organization))
        .route("/{org_id}/members", get(list_members).post(add_member))
        .route("/{org_id}/members/{user_id}", patch(change_member_role))
}
