//! AI study packs (summary, quiz, flashcards), practice records, and the
//! tutor exchange.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use validator::Validate;

use crate::courses::ProcessingStatus;
use crate::ids::{CourseId, FlashcardSessionId, MaterialId, QuizAttemptId, StudyPackId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryContent {
    pub summary: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuizContent {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudyPack {
    pub id: StudyPackId,
    pub material_id: MaterialId,
    pub status: ProcessingStatus,
    #[schema(value_type = Option<SummaryContent>)]
    pub summary: Option<Json<SummaryContent>>,
    #[schema(value_type = Option<QuizContent>)]
    pub quiz: Option<Json<QuizContent>>,
    #[schema(value_type = Option<Vec<Flashcard>>)]
    pub flashcards: Option<Json<Vec<Flashcard>>>,
    pub created_by: UserId,
    pub published_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    /// A generated draft is waiting for review.
    pub requires_approval: bool,
    /// The material's content changed after this content was published.
    pub content_stale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generated content awaiting review. It replaces the published content only
/// once approved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudyPackDraft {
    pub id: StudyPackId,
    pub material_id: MaterialId,
    pub status: ProcessingStatus,
    #[schema(value_type = Option<SummaryContent>)]
    pub summary: Option<Json<SummaryContent>>,
    #[schema(value_type = Option<QuizContent>)]
    pub quiz: Option<Json<QuizContent>>,
    #[schema(value_type = Option<Vec<Flashcard>>)]
    pub flashcards: Option<Json<Vec<Flashcard>>>,
    pub notes: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Optional guidance for the generator, kept with the draft.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct GenerateStudyPackDto {
    #[serde(default)]
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStudyPackDraftDto {
    #[validate(length(min = 1, max = 10000, message = "summary must be between 1 and 10000 characters"))]
    pub summary: String,
    #[validate(length(min = 1, message = "at least one key point is required"))]
    pub key_points: Vec<String>,
}

impl UpdateStudyPackDraftDto {
    /// Trimmed summary and non-blank key points.
    pub fn into_summary(self) -> SummaryContent {
        SummaryContent {
            summary: self.summary.trim().to_string(),
            bullets: self
                .key_points
                .iter()
                .map(|point| point.trim())
                .filter(|point| !point.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Answers keyed by question id.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitQuizAttemptDto {
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QuizAttempt {
    pub id: QuizAttemptId,
    pub study_pack_id: StudyPackId,
    pub user_id: UserId,
    pub score: i32,
    #[schema(value_type = Object)]
    pub answers: Json<HashMap<String, String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizAttemptResult {
    pub attempt: QuizAttempt,
    pub correct: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlashcardResponse {
    Known,
    Unknown,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordFlashcardSessionDto {
    #[validate(length(min = 1, message = "responses must not be empty"))]
    pub responses: Vec<FlashcardResponse>,
    #[serde(default)]
    #[validate(range(min = 0, max = 86400))]
    pub duration_sec: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FlashcardSession {
    pub id: FlashcardSessionId,
    pub study_pack_id: StudyPackId,
    pub user_id: UserId,
    pub known_count: i32,
    pub unknown_count: i32,
    pub duration_sec: i32,
    pub created_at: DateTime<Utc>,
}

/// A flashcard session with the material it practiced, for history views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FlashcardSessionSummary {
    pub id: FlashcardSessionId,
    pub study_pack_id: StudyPackId,
    pub material_id: MaterialId,
    pub material_title: String,
    pub known_count: i32,
    pub unknown_count: i32,
    pub duration_sec: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TutorRequest {
    pub course_id: CourseId,
    #[validate(length(min = 1, max = 2000, message = "query must be between 1 and 2000 characters"))]
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TutorResponse {
    pub answer: String,
    pub source_references: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_dto_requires_responses() {
        let dto: RecordFlashcardSessionDto =
            serde_json::from_str(r#"{"responses":[],"duration_sec":30}"#).unwrap();
        assert!(dto.validate().is_err());

        let dto: RecordFlashcardSessionDto =
            serde_json::from_str(r#"{"responses":["known","unknown"]}"#).unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.duration_sec, 0);
    }

    #[test]
    fn test_draft_edit_drops_blank_key_points() {
        let dto: UpdateStudyPackDraftDto = serde_json::from_str(
            r#"{"summary":"  Cells make energy. ","key_points":["ATP", "  ", " Mitochondria "]}"#,
        )
        .unwrap();
        assert!(dto.validate().is_ok());

        let summary = dto.into_summary();
        assert_eq!(summary.summary, "Cells make energy.");
        assert_eq!(summary.bullets, vec!["ATP", "Mitochondria"]);

        let dto: UpdateStudyPackDraftDto =
            serde_json::from_str(r#"{"summary":"","key_points":[]}"#).unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_generate_dto_notes_are_optional() {
        let dto: GenerateStudyPackDto = serde_json::from_str("{}").unwrap();
        assert!(dto.notes.is_none());
    }

    #[test]
    fn test_quiz_question_explanation_is_optional() {
        let q: QuizQuestion = serde_json::from_str(
            r#"{"id":"q1","prompt":"2+2?","options":["3","4"],"answer":"4"}"#,
        )
        .unwrap();
        assert!(q.explanation.is_none());
    }
}
