//! Read-side analytics views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{CourseId, MaterialId, OrgId, QuizAttemptId, StudyPackId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RecentAttempt {
    pub id: QuizAttemptId,
    pub study_pack_id: StudyPackId,
    pub material_id: MaterialId,
    pub material_title: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

/// A material whose mean quiz score is below the weak-topic threshold.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct WeakTopic {
    pub material_id: MaterialId,
    pub material_title: String,
    pub avg_score: f64,
    pub attempts: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentMastery {
    pub avg_score: f64,
    pub total_attempts: i64,
    /// Score of the most recent attempt; absent with no attempts.
    pub last_score: Option<i32>,
    /// Scores of the recent attempts, newest first.
    pub score_trend: Vec<i32>,
    pub weak_topics: Vec<WeakTopic>,
    pub recent_attempts: Vec<RecentAttempt>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentPerformance {
    pub user_id: UserId,
    pub display_name: String,
    pub avg_score: f64,
    pub attempts: i64,
    pub at_risk: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseCohort {
    pub course_id: CourseId,
    pub total_students: i64,
    pub at_risk_count: i64,
    pub cohort_avg_score: f64,
    pub weak_topics: Vec<WeakTopic>,
    pub students: Vec<StudentPerformance>,
}

/// How far one learner is through a course: the share of its materials
/// practiced with a quiz attempt or flashcard session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub course_title: String,
    pub total_materials: i64,
    pub practiced_materials: i64,
    /// 0..=100
    pub progress_percentage: f64,
    pub quiz_attempts: i64,
    pub flashcard_sessions: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrgMetrics {
    pub org_id: OrgId,
    pub total_members: i64,
    pub total_courses: i64,
    pub daily_active_users: i64,
    pub weekly_active_users: i64,
    pub study_packs_ready: i64,
    pub quizzes_taken: i64,
    /// Share of members with at least one recorded learning activity, 0..=1.
    pub activation_rate: f64,
}

/// Learning activity recorded for DAU/WAU and activation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "progress_event_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressEventType {
    QuizAttempt,
    FlashcardSession,
    Submission,
    Thread,
    Reply,
}
