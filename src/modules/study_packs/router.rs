use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    approve_study_pack, generate_study_pack, get_study_pack, get_study_pack_draft,
    my_flashcard_sessions, record_flashcard_session, record_quiz_attempt, tutor,
    update_study_pack_draft,
};

pub fn init_ai_router() -> Router<AppState> {
    Router::new()
        .route("/generate/{id}", post(generate_study_pack))
        .route("/study-packs/{id}", get(get_study_pack))
        .route(
            "/study-packs/{id}/draft",
            get(get_study_pack_draft).patch(update_study_pack_draft),
        )
        .route("/study-packs/{id}/approve", post(approve_study_pack))
        .route("/study-packs/{id}/quiz-attempts", post(record_quiz_attempt))
        .route(
            "/study-packs/{id}/flashcard-sessions",
            post(record_flashcard_session),
        )
        .route("/flashcard-sessions", get(my_flashcard_sessions))
        .route("/tutor", post(tutor))
}
