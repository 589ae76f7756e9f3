use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::ids::{MaterialId, StudyPackId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    FlashcardSession, FlashcardSessionSummary, GenerateStudyPackDto, QuizAttemptResult,
    RecordFlashcardSessionDto, StudyPack, StudyPackDraft, SubmitQuizAttemptDto, TutorRequest,
    TutorResponse, UpdateStudyPackDraftDto,
};
use super::service::StudyPackService;

/// Generate a study pack draft for a material
///
/// The draft waits for review. A pack that is already published stays
/// visible to students until the draft is approved.
#[utoipa::path(
    post,
    path = "/api/ai/generate/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body(content = GenerateStudyPackDto, description = "Optional; notes for the generator"),
    responses(
        (status = 200, description = "Draft generated", body = StudyPackDraft),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse),
        (status = 422, description = "Material has no content", body = ErrorResponse),
        (status = 503, description = "Generation unavailable", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn generate_study_pack(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    dto: Option<ValidatedJson<GenerateStudyPackDto>>,
) -> Result<Json<StudyPackDraft>, AppError> {
    let actor = auth_user.user_id()?;
    let dto = dto.map(|ValidatedJson(dto)| dto).unwrap_or_default();
    let draft = StudyPackService::generate(
        &state.db,
        state.generator.as_ref(),
        actor,
        MaterialId::from(id),
        dto,
    )
    .await?;
    Ok(Json(draft))
}

#[utoipa::path(
    get,
    path = "/api/ai/study-packs/{id}/draft",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Draft awaiting review", body = StudyPackDraft),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Material or draft not found", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_study_pack_draft(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StudyPackDraft>, AppError> {
    let actor = auth_user.user_id()?;
    let draft = StudyPackService::get_draft(&state.db, actor, MaterialId::from(id)).await?;
    Ok(Json(draft))
}

#[utoipa::path(
    patch,
    path = "/api/ai/study-packs/{id}/draft",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = UpdateStudyPackDraftDto,
    responses(
        (status = 200, description = "Draft updated", body = StudyPackDraft),
        (status = 400, description = "Summary or key points missing", body = ErrorResponse),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Material or draft not found", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_study_pack_draft(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateStudyPackDraftDto>,
) -> Result<Json<StudyPackDraft>, AppError> {
    let actor = auth_user.user_id()?;
    let draft =
        StudyPackService::update_draft(&state.db, actor, MaterialId::from(id), dto).await?;
    Ok(Json(draft))
}

/// Approve and publish the pending draft
#[utoipa::path(
    post,
    path = "/api/ai/study-packs/{id}/approve",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Study pack published", body = StudyPack),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Material or draft not found", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn approve_study_pack(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StudyPack>, AppError> {
    let actor = auth_user.user_id()?;
    let pack = StudyPackService::approve(&state.db, actor, MaterialId::from(id)).await?;
    Ok(Json(pack))
}

#[utoipa::path(
    get,
    path = "/api/ai/study-packs/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Study pack of the material", body = StudyPack),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Material or published study pack not found", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_study_pack(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StudyPack>, AppError> {
    let actor = auth_user.user_id()?;
    let pack = StudyPackService::get_for_material(&state.db, actor, MaterialId::from(id)).await?;
    Ok(Json(pack))
}

#[utoipa::path(
    post,
    path = "/api/ai/study-packs/{id}/quiz-attempts",
    params(("id" = Uuid, Path, description = "Study pack ID")),
    request_body = SubmitQuizAttemptDto,
    responses(
        (status = 201, description = "Attempt scored and recorded", body = QuizAttemptResult),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Study pack not found", body = ErrorResponse),
        (status = 422, description = "Study pack is not published", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn record_quiz_attempt(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SubmitQuizAttemptDto>,
) -> Result<(StatusCode, Json<QuizAttemptResult>), AppError> {
    let actor = auth_user.user_id()?;
    let result =
        StudyPackService::record_quiz_attempt(&state.db, actor, StudyPackId::from(id), dto)
            .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    post,
    path = "/api/ai/study-packs/{id}/flashcard-sessions",
    params(("id" = Uuid, Path, description = "Study pack ID")),
    request_body = RecordFlashcardSessionDto,
    responses(
        (status = 201, description = "Session recorded", body = FlashcardSession),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Study pack not found", body = ErrorResponse),
        (status = 422, description = "Study pack is not published", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn record_flashcard_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RecordFlashcardSessionDto>,
) -> Result<(StatusCode, Json<FlashcardSession>), AppError> {
    let actor = auth_user.user_id()?;
    let session =
        StudyPackService::record_flashcard_session(&state.db, actor, StudyPackId::from(id), dto)
            .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// The caller's recent flashcard sessions
#[utoipa::path(
    get,
    path = "/api/ai/flashcard-sessions",
    responses(
        (status = 200, description = "Up to 20 sessions, newest first", body = Vec<FlashcardSessionSummary>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn my_flashcard_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<FlashcardSessionSummary>>, AppError> {
    let actor = auth_user.user_id()?;
    let sessions = StudyPackService::list_flashcard_sessions(&state.db, actor).await?;
    Ok(Json(sessions))
}

/// Ask the course tutor a question
#[utoipa::path(
    post,
    path = "/api/ai/tutor",
    request_body = TutorRequest,
    responses(
        (status = 200, description = "Tutor answer with referenced materials", body = TutorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 503, description = "Generation unavailable", body = ErrorResponse)
    ),
    tag = "AI",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn tutor(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<TutorRequest>,
) -> Result<Json<TutorResponse>, AppError> {
    let actor = auth_user.user_id()?;
    let response = StudyPackService::tutor(&state.db, state.generator.as_ref(), actor, dto).await?;
    Ok(Json(response))
}
