use std::collections::HashMap;

use anyhow::anyhow;
use myway_ai::StudyContentGenerator;
use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::analytics::ProgressEventType;
use myway_models::courses::ProcessingStatus;
use myway_models::ids::{CourseId, MaterialId, StudyPackId, UserId};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use super::model::{
    FlashcardResponse, FlashcardSession, FlashcardSessionSummary, GenerateStudyPackDto,
    QuizAttempt, QuizAttemptResult, QuizContent, RecordFlashcardSessionDto, StudyPack,
    StudyPackDraft, SubmitQuizAttemptDto, TutorRequest, TutorResponse, UpdateStudyPackDraftDto,
};
use crate::metrics;
use crate::modules::materials::service::MaterialService;
use crate::utils::auth_helpers::{
    org_of_course, org_of_material, org_of_study_pack, require_org_member, require_org_role,
};
use crate::utils::progress::record_event;

const STUDY_PACK_COLUMNS: &str = "id, material_id, status, summary, quiz, flashcards, created_by, published_at, approved_by, requires_approval, content_stale, created_at, updated_at";

const DRAFT_COLUMNS: &str = "id, material_id, status, draft_summary AS summary, draft_quiz AS quiz, draft_flashcards AS flashcards, draft_notes AS notes, draft_generated_at AS generated_at";

const FLASHCARD_HISTORY_LIMIT: i64 = 20;

/// Returns `(correct, total, score)`, with `score` the percentage of correct
/// answers rounded down. Answers compare trimmed and case-insensitively;
/// unanswered questions count as wrong.
pub fn score_quiz(quiz: &QuizContent, answers: &HashMap<String, String>) -> (usize, usize, i32) {
    let total = quiz.questions.len();
    let correct = quiz
        .questions
        .iter()
        .filter(|question| {
            answers.get(&question.id).is_some_and(|given| {
                given.trim().to_lowercase() == question.answer.trim().to_lowercase()
            })
        })
        .count();

    let score = if total == 0 {
        0
    } else {
        (correct * 100 / total) as i32
    };

    (correct, total, score)
}

/// Material text handed to the generator, with the reviewer's notes appended.
pub fn generation_source(content: &str, notes: Option<&str>) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{}\n\nInstructor notes: {}", content, notes),
        None => content.to_string(),
    }
}

fn generation_unavailable() -> AppError {
    AppError::service_unavailable(anyhow!("generation unavailable"))
}

fn not_published() -> AppError {
    AppError::unprocessable(anyhow!("Study pack is not published"))
}

fn draft_not_found() -> AppError {
    AppError::not_found(anyhow!("Study pack draft not found"))
}

pub struct StudyPackService;

impl StudyPackService {
    /// Generates a draft for a material's pack. A material has at most one
    /// pack. The draft never touches published content: students keep the
    /// current version until the draft is approved, and a provider failure
    /// only marks packs that have nothing else to show as `failed`.
    #[instrument(skip(db, generator, dto), fields(material.id = %material_id, provider = generator.name()))]
    pub async fn generate(
        db: &PgPool,
        generator: &dyn StudyContentGenerator,
        actor: UserId,
        material_id: MaterialId,
        dto: GenerateStudyPackDto,
    ) -> Result<StudyPackDraft, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let material = MaterialService::find_material(db, material_id).await?;
        if material.content.trim().is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "Material has no content to generate from"
            )));
        }
        let notes = dto
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let pack_id = sqlx::query_scalar::<_, StudyPackId>(
            r#"INSERT INTO study_packs (material_id, status, created_by)
               VALUES ($1, 'processing', $2)
               ON CONFLICT (material_id) DO UPDATE SET
                   status = CASE
                       WHEN study_packs.status IN ('generated', 'ready') THEN study_packs.status
                       ELSE 'processing'::processing_status
                   END,
                   updated_at = NOW()
               RETURNING id"#,
        )
        .bind(material_id)
        .bind(actor)
        .fetch_one(db)
        .await?;

        let source = generation_source(&material.content, notes);
        let generated = tokio::try_join!(
            generator.generate_summary(&source),
            generator.generate_quiz(&source),
            generator.generate_flashcards(&source),
        );

        let (summary, quiz, flashcards) = match generated {
            Ok(content) => content,
            Err(error) => {
                tracing::warn!(study_pack.id = %pack_id, error = %error, "study pack generation failed");
                sqlx::query(
                    r#"UPDATE study_packs SET status = 'failed', updated_at = NOW()
                       WHERE id = $1 AND status = 'processing'"#,
                )
                .bind(pack_id)
                .execute(db)
                .await?;
                metrics::track_study_pack_generated(generator.name(), "failed");
                return Err(generation_unavailable());
            }
        };

        let draft = sqlx::query_as::<_, StudyPackDraft>(&format!(
            r#"UPDATE study_packs SET
                   status = CASE WHEN status = 'ready' THEN status ELSE 'generated'::processing_status END,
                   draft_summary = $2,
                   draft_quiz = $3,
                   draft_flashcards = $4,
                   draft_notes = $5,
                   draft_generated_at = NOW(),
                   requires_approval = TRUE,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            DRAFT_COLUMNS
        ))
        .bind(pack_id)
        .bind(Json(summary))
        .bind(Json(quiz))
        .bind(Json(flashcards))
        .bind(notes)
        .fetch_one(db)
        .await?;

        metrics::track_study_pack_generated(generator.name(), "generated");
        tracing::info!(study_pack.id = %draft.id, "study pack draft generated");
        Ok(draft)
    }

    /// Students only see a pack once something has been published; staff see
    /// it in any state.
    #[instrument(skip(db))]
    pub async fn get_for_material(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
    ) -> Result<StudyPack, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        let role = require_org_member(db, actor, org_id).await?;

        let pack = sqlx::query_as::<_, StudyPack>(&format!(
            "SELECT {} FROM study_packs WHERE material_id = $1",
            STUDY_PACK_COLUMNS
        ))
        .bind(material_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Study pack not found")))?;

        if pack.published_at.is_none() && !OrgRole::STAFF.contains(&role) {
            return Err(AppError::not_found(anyhow!("Study pack not found")));
        }

        Ok(pack)
    }

    #[instrument(skip(db))]
    pub async fn get_draft(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
    ) -> Result<StudyPackDraft, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        sqlx::query_as::<_, StudyPackDraft>(&format!(
            "SELECT {} FROM study_packs WHERE material_id = $1 AND requires_approval",
            DRAFT_COLUMNS
        ))
        .bind(material_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(draft_not_found)
    }

    /// Replaces the draft's summary and key points before approval.
    #[instrument(skip(db, dto))]
    pub async fn update_draft(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
        dto: UpdateStudyPackDraftDto,
    ) -> Result<StudyPackDraft, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let summary = dto.into_summary();
        if summary.summary.is_empty() {
            return Err(AppError::bad_request(anyhow!("Summary is required")));
        }
        if summary.bullets.is_empty() {
            return Err(AppError::bad_request(anyhow!(
                "At least one key point is required"
            )));
        }

        sqlx::query_as::<_, StudyPackDraft>(&format!(
            r#"UPDATE study_packs SET draft_summary = $2, updated_at = NOW()
               WHERE material_id = $1 AND requires_approval
               RETURNING {}"#,
            DRAFT_COLUMNS
        ))
        .bind(material_id)
        .bind(Json(summary))
        .fetch_optional(db)
        .await?
        .ok_or_else(draft_not_found)
    }

    /// Publishes the pending draft: it becomes the pack's content, the draft
    /// is cleared, and the pack (and its material) turn `ready`.
    #[instrument(skip(db))]
    pub async fn approve(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
    ) -> Result<StudyPack, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let mut tx = db.begin().await?;

        let pack = sqlx::query_as::<_, StudyPack>(&format!(
            r#"UPDATE study_packs SET
                   status = 'ready',
                   summary = draft_summary,
                   quiz = draft_quiz,
                   flashcards = draft_flashcards,
                   published_at = NOW(),
                   approved_by = $2,
                   requires_approval = FALSE,
                   content_stale = FALSE,
                   draft_summary = NULL,
                   draft_quiz = NULL,
                   draft_flashcards = NULL,
                   draft_notes = NULL,
                   draft_generated_at = NULL,
                   updated_at = NOW()
               WHERE material_id = $1 AND requires_approval
               RETURNING {}"#,
            STUDY_PACK_COLUMNS
        ))
        .bind(material_id)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(draft_not_found)?;

        sqlx::query("UPDATE materials SET status = 'ready', updated_at = NOW() WHERE id = $1")
            .bind(material_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::track_study_pack_approved();
        tracing::info!(study_pack.id = %pack.id, approved_by = %actor, "study pack published");
        Ok(pack)
    }

    #[instrument(skip(db, dto), fields(study_pack.id = %pack_id))]
    pub async fn record_quiz_attempt(
        db: &PgPool,
        actor: UserId,
        pack_id: StudyPackId,
        dto: SubmitQuizAttemptDto,
    ) -> Result<QuizAttemptResult, AppError> {
        let org_id = org_of_study_pack(db, pack_id).await?;
        require_org_member(db, actor, org_id).await?;

        let pack = Self::find_pack(db, pack_id).await?;
        let quiz = match (pack.status, pack.quiz) {
            (ProcessingStatus::Ready, Some(Json(quiz))) => quiz,
            _ => return Err(not_published()),
        };

        let (correct, total, score) = score_quiz(&quiz, &dto.answers);
        let course_id = Self::course_of_pack(db, pack_id).await?;

        let mut tx = db.begin().await?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"INSERT INTO quiz_attempts (study_pack_id, user_id, score, answers)
               VALUES ($1, $2, $3, $4)
               RETURNING id, study_pack_id, user_id, score, answers, created_at"#,
        )
        .bind(pack_id)
        .bind(actor)
        .bind(score)
        .bind(Json(&dto.answers))
        .fetch_one(&mut *tx)
        .await?;

        record_event(&mut tx, actor, course_id, ProgressEventType::QuizAttempt).await?;
        tx.commit().await?;

        metrics::track_quiz_attempt(score);
        Ok(QuizAttemptResult {
            attempt,
            correct,
            total,
        })
    }

    #[instrument(skip(db, dto), fields(study_pack.id = %pack_id))]
    pub async fn record_flashcard_session(
        db: &PgPool,
        actor: UserId,
        pack_id: StudyPackId,
        dto: RecordFlashcardSessionDto,
    ) -> Result<FlashcardSession, AppError> {
        let org_id = org_of_study_pack(db, pack_id).await?;
        require_org_member(db, actor, org_id).await?;

        let pack = Self::find_pack(db, pack_id).await?;
        if pack.status != ProcessingStatus::Ready || pack.flashcards.is_none() {
            return Err(not_published());
        }

        let known = dto
            .responses
            .iter()
            .filter(|r| **r == FlashcardResponse::Known)
            .count() as i32;
        let unknown = dto.responses.len() as i32 - known;
        let course_id = Self::course_of_pack(db, pack_id).await?;

        let mut tx = db.begin().await?;

        let session = sqlx::query_as::<_, FlashcardSession>(
            r#"INSERT INTO flashcard_sessions (study_pack_id, user_id, known_count, unknown_count, duration_sec)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, study_pack_id, user_id, known_count, unknown_count, duration_sec, created_at"#,
        )
        .bind(pack_id)
        .bind(actor)
        .bind(known)
        .bind(unknown)
        .bind(dto.duration_sec)
        .fetch_one(&mut *tx)
        .await?;

        record_event(&mut tx, actor, course_id, ProgressEventType::FlashcardSession).await?;
        tx.commit().await?;

        Ok(session)
    }

    /// The caller's most recent flashcard sessions, newest first.
    #[instrument(skip(db))]
    pub async fn list_flashcard_sessions(
        db: &PgPool,
        actor: UserId,
    ) -> Result<Vec<FlashcardSessionSummary>, AppError> {
        let sessions = sqlx::query_as::<_, FlashcardSessionSummary>(
            r#"SELECT fs.id, fs.study_pack_id, p.material_id, m.title AS material_title,
                      fs.known_count, fs.unknown_count, fs.duration_sec, fs.created_at
               FROM flashcard_sessions fs
               JOIN study_packs p ON p.id = fs.study_pack_id
               JOIN materials m ON m.id = p.material_id
               WHERE fs.user_id = $1
               ORDER BY fs.created_at DESC
               LIMIT $2"#,
        )
        .bind(actor)
        .bind(FLASHCARD_HISTORY_LIMIT)
        .fetch_all(db)
        .await?;

        Ok(sessions)
    }

    /// Answers a question grounded in the course outline. The outline (course,
    /// module and material titles) is the only context handed to the model.
    #[instrument(skip(db, generator, dto), fields(course.id = %dto.course_id))]
    pub async fn tutor(
        db: &PgPool,
        generator: &dyn StudyContentGenerator,
        actor: UserId,
        dto: TutorRequest,
    ) -> Result<TutorResponse, AppError> {
        let org_id = org_of_course(db, dto.course_id).await?;
        require_org_member(db, actor, org_id).await?;

        let course_title =
            sqlx::query_scalar::<_, String>("SELECT title FROM courses WHERE id = $1")
                .bind(dto.course_id)
                .fetch_one(db)
                .await?;

        let outline = sqlx::query_as::<_, (String, Option<String>)>(
            r#"SELECT cm.title, m.title
               FROM course_modules cm
               LEFT JOIN materials m ON m.module_id = cm.id
               WHERE cm.course_id = $1
               ORDER BY cm.position, cm.created_at, m.created_at"#,
        )
        .bind(dto.course_id)
        .fetch_all(db)
        .await?;

        let (context, source_references) = build_tutor_context(&course_title, &outline);

        let answer = generator
            .answer_question(&context, dto.query.trim())
            .await
            .map_err(|error| {
                tracing::warn!(error = %error, "tutor answer failed");
                generation_unavailable()
            })?;

        Ok(TutorResponse {
            answer,
            source_references,
        })
    }

    async fn find_pack(db: &PgPool, pack_id: StudyPackId) -> Result<StudyPack, AppError> {
        sqlx::query_as::<_, StudyPack>(&format!(
            "SELECT {} FROM study_packs WHERE id = $1",
            STUDY_PACK_COLUMNS
        ))
        .bind(pack_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Study pack not found")))
    }

    async fn course_of_pack(db: &PgPool, pack_id: StudyPackId) -> Result<CourseId, AppError> {
        let course_id = sqlx::query_scalar::<_, CourseId>(
            r#"SELECT m.course_id FROM study_packs p
               JOIN materials m ON m.id = p.material_id
               WHERE p.id = $1"#,
        )
        .bind(pack_id)
        .fetch_one(db)
        .await?;
        Ok(course_id)
    }
}

/// Renders the outline rows `(module title, material title)` into the prompt
/// context and collects the material titles as references.
fn build_tutor_context(
    course_title: &str,
    outline: &[(String, Option<String>)],
) -> (String, Vec<String>) {
    let mut context = format!("Course: {}\n", course_title);
    let mut references = Vec::new();
    let mut current_module: Option<&str> = None;

    for (module_title, material_title) in outline {
        if current_module != Some(module_title.as_str()) {
            context.push_str(&format!("Module: {}\n", module_title));
            current_module = Some(module_title.as_str());
        }
        if let Some(material_title) = material_title {
            context.push_str(&format!("- {}\n", material_title));
            references.push(material_title.clone());
        }
    }

    (context, references)
}
