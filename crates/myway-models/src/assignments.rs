//! Assignments and per-user submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{AssignmentId, CourseId, SubmissionId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Assignment {
    pub id: AssignmentId,
    pub course_id: CourseId,
    pub title: String,
    pub instructions: String,
    pub due_date: Option<DateTime<Utc>>,
    pub max_points: i32,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionStatus {
    Submitted,
    Graded,
}

/// Assignment state from one student's point of view. `NotStarted` is never
/// stored; it means the student has no submission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentProgress {
    NotStarted,
    Submitted,
    Graded,
}

impl AssignmentProgress {
    pub fn from_submission(submission: Option<&Submission>) -> Self {
        match submission.map(|s| s.status) {
            None => AssignmentProgress::NotStarted,
            Some(SubmissionStatus::Submitted) => AssignmentProgress::Submitted,
            Some(SubmissionStatus::Graded) => AssignmentProgress::Graded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub status: SubmissionStatus,
    pub file_url: String,
    pub grade: Option<i32>,
    pub feedback: Option<String>,
    pub graded_by: Option<UserId>,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubmissionWithUser {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub submission: Submission,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentWithProgress {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub progress: AssignmentProgress,
    pub my_submission: Option<Submission>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentDto {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_max_points")]
    #[validate(range(min = 1, message = "max_points must be at least 1"))]
    pub max_points: i32,
}

fn default_max_points() -> i32 {
    100
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAssignmentDto {
    #[validate(length(min = 1, max = 2048, message = "file_url is required"))]
    pub file_url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GradeSubmissionDto {
    /// Checked against the assignment's `max_points` by the service.
    pub grade: i32,
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(status: SubmissionStatus) -> Submission {
        Submission {
            id: SubmissionId::new(),
            assignment_id: AssignmentId::new(),
            user_id: UserId::new(),
            status,
            file_url: "https://files.example.com/essay.pdf".to_string(),
            grade: None,
            feedback: None,
            graded_by: None,
            submitted_at: Utc::now(),
            graded_at: None,
        }
    }

    #[test]
    fn test_progress_from_submission() {
        assert_eq!(
            AssignmentProgress::from_submission(None),
            AssignmentProgress::NotStarted
        );
        assert_eq!(
            AssignmentProgress::from_submission(Some(&submission(SubmissionStatus::Submitted))),
            AssignmentProgress::Submitted
        );
        assert_eq!(
            AssignmentProgress::from_submission(Some(&submission(SubmissionStatus::Graded))),
            AssignmentProgress::Graded
        );
    }

    #[test]
    fn test_progress_wire_format() {
        assert_eq!(
            serde_json::to_string(&AssignmentProgress::NotStarted).unwrap(),
            r#""NOT_STARTED""#
        );
    }

    #[test]
    fn test_create_assignment_defaults_and_bounds() {
        let dto: CreateAssignmentDto = serde_json::from_str(r#"{"title":"Essay"}"#).unwrap();
        assert_eq!(dto.max_points, 100);
        assert!(dto.validate().is_ok());

        let dto: CreateAssignmentDto =
            serde_json::from_str(r#"{"title":"Essay","max_points":0}"#).unwrap();
        assert!(dto.validate().is_err());
    }
}
