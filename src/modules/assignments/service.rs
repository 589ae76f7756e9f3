use std::collections::HashMap;

use anyhow::anyhow;
use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::analytics::ProgressEventType;
use myway_models::ids::{AssignmentId, CourseId, SubmissionId, UserId};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::model::{
    Assignment, AssignmentProgress, AssignmentWithProgress, CreateAssignmentDto,
    GradeSubmissionDto, SubmitAssignmentDto, Submission, SubmissionWithUser,
};
use crate::metrics;
use crate::modules::courses::service::CourseService;
use crate::utils::auth_helpers::{
    org_of_assignment, org_of_course, org_of_submission, require_org_member, require_org_role,
};
use crate::utils::progress::record_event;

const ASSIGNMENT_COLUMNS: &str = "id, course_id, title, instructions, due_date, max_points, created_by, created_at, updated_at";
const SUBMISSION_COLUMNS: &str = "id, assignment_id, user_id, status, file_url, grade, feedback, graded_by, submitted_at, graded_at";

#[derive(FromRow)]
struct UpsertedSubmission {
    #[sqlx(flatten)]
    submission: Submission,
    inserted: bool,
}

/// `created` is false when an earlier submission was replaced.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub submission: Submission,
    pub created: bool,
}

/// Checks a grade against the assignment's scale.
fn validate_grade(grade: i32, max_points: i32) -> Result<(), AppError> {
    if !(0..=max_points).contains(&grade) {
        return Err(AppError::unprocessable(anyhow!(
            "grade must be between 0 and {}",
            max_points
        )));
    }
    Ok(())
}

fn with_progress(assignment: Assignment, my_submission: Option<Submission>) -> AssignmentWithProgress {
    AssignmentWithProgress {
        progress: AssignmentProgress::from_submission(my_submission.as_ref()),
        assignment,
        my_submission,
    }
}

pub struct AssignmentService;

impl AssignmentService {
    #[instrument(skip(db, dto), fields(course.id = %course_id))]
    pub async fn create_assignment(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
        dto: CreateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        if dto.max_points < 1 {
            return Err(AppError::unprocessable(anyhow!("max_points must be at least 1")));
        }

        let assignment = sqlx::query_as::<_, Assignment>(&format!(
            r#"INSERT INTO assignments (course_id, title, instructions, due_date, max_points, created_by)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            ASSIGNMENT_COLUMNS
        ))
        .bind(course_id)
        .bind(dto.title.trim())
        .bind(&dto.instructions)
        .bind(dto.due_date)
        .bind(dto.max_points)
        .bind(actor)
        .fetch_one(db)
        .await?;

        tracing::info!(assignment.id = %assignment.id, "assignment created");
        Ok(assignment)
    }

    /// Assignments of a course, each with the caller's own submission.
    #[instrument(skip(db))]
    pub async fn list_assignments(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<Vec<AssignmentWithProgress>, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_member(db, actor, org_id).await?;

        let assignments = sqlx::query_as::<_, Assignment>(&format!(
            r#"SELECT {} FROM assignments WHERE course_id = $1
               ORDER BY due_date ASC NULLS LAST, created_at"#,
            ASSIGNMENT_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(db)
        .await?;

        let assignment_ids: Vec<AssignmentId> = assignments.iter().map(|a| a.id).collect();
        let mut mine: HashMap<AssignmentId, Submission> = sqlx::query_as::<_, Submission>(
            &format!(
                "SELECT {} FROM submissions WHERE user_id = $1 AND assignment_id = ANY($2)",
                SUBMISSION_COLUMNS
            ),
        )
        .bind(actor)
        .bind(&assignment_ids)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(|s| (s.assignment_id, s))
        .collect();

        Ok(assignments
            .into_iter()
            .map(|assignment| {
                let submission = mine.remove(&assignment.id);
                with_progress(assignment, submission)
            })
            .collect())
    }

    #[instrument(skip(db))]
    pub async fn get_assignment(
        db: &PgPool,
        actor: UserId,
        assignment_id: AssignmentId,
    ) -> Result<AssignmentWithProgress, AppError> {
        let org_id = org_of_assignment(db, assignment_id).await?;
        require_org_member(db, actor, org_id).await?;

        let assignment = Self::find_assignment(db, assignment_id).await?;
        let submission = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {} FROM submissions WHERE assignment_id = $1 AND user_id = $2",
            SUBMISSION_COLUMNS
        ))
        .bind(assignment_id)
        .bind(actor)
        .fetch_optional(db)
        .await?;

        Ok(with_progress(assignment, submission))
    }

    /// Submits or re-submits. A re-submission replaces the file, clears any
    /// grade and returns the submission to `SUBMITTED`.
    #[instrument(skip(db, dto), fields(assignment.id = %assignment_id))]
    pub async fn submit(
        db: &PgPool,
        actor: UserId,
        assignment_id: AssignmentId,
        dto: SubmitAssignmentDto,
    ) -> Result<SubmissionOutcome, AppError> {
        let org_id = org_of_assignment(db, assignment_id).await?;
        require_org_member(db, actor, org_id).await?;

        let assignment = Self::find_assignment(db, assignment_id).await?;
        if !CourseService::is_enrolled(db, actor, assignment.course_id).await? {
            return Err(AppError::forbidden(
                "Access denied. You must be enrolled in the course to submit",
            ));
        }

        let mut tx = db.begin().await?;

        let upserted = sqlx::query_as::<_, UpsertedSubmission>(&format!(
            r#"INSERT INTO submissions (assignment_id, user_id, file_url)
               VALUES ($1, $2, $3)
               ON CONFLICT (assignment_id, user_id) DO UPDATE SET
                   file_url = EXCLUDED.file_url,
                   status = 'SUBMITTED',
                   grade = NULL,
                   feedback = NULL,
                   graded_by = NULL,
                   graded_at = NULL,
                   submitted_at = NOW()
               RETURNING {}, (xmax = 0) AS inserted"#,
            SUBMISSION_COLUMNS
        ))
        .bind(assignment_id)
        .bind(actor)
        .bind(dto.file_url.trim())
        .fetch_one(&mut *tx)
        .await?;

        record_event(&mut tx, actor, assignment.course_id, ProgressEventType::Submission).await?;
        tx.commit().await?;

        tracing::info!(
            submission.id = %upserted.submission.id,
            replaced = !upserted.inserted,
            "assignment submitted"
        );

        Ok(SubmissionOutcome {
            submission: upserted.submission,
            created: upserted.inserted,
        })
    }

    /// Grades or re-grades in place; a submission never gets a second row.
    #[instrument(skip(db, dto), fields(submission.id = %submission_id))]
    pub async fn grade(
        db: &PgPool,
        actor: UserId,
        submission_id: SubmissionId,
        dto: GradeSubmissionDto,
    ) -> Result<Submission, AppError> {
        let org_id = org_of_submission(db, submission_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let max_points = sqlx::query_scalar::<_, i32>(
            r#"SELECT a.max_points FROM submissions s
               JOIN assignments a ON a.id = s.assignment_id
               WHERE s.id = $1"#,
        )
        .bind(submission_id)
        .fetch_one(db)
        .await?;
        validate_grade(dto.grade, max_points)?;

        let submission = sqlx::query_as::<_, Submission>(&format!(
            r#"UPDATE submissions SET
                   status = 'GRADED',
                   grade = $2,
                   feedback = $3,
                   graded_by = $4,
                   graded_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .bind(dto.grade)
        .bind(&dto.feedback)
        .bind(actor)
        .fetch_one(db)
        .await?;

        metrics::track_submission_graded();
        Ok(submission)
    }

    #[instrument(skip(db))]
    pub async fn list_submissions(
        db: &PgPool,
        actor: UserId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<SubmissionWithUser>, AppError> {
        let org_id = org_of_assignment(db, assignment_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let submissions = sqlx::query_as::<_, SubmissionWithUser>(
            r#"SELECT s.id, s.assignment_id, s.user_id, s.status, s.file_url, s.grade,
                      s.feedback, s.graded_by, s.submitted_at, s.graded_at,
                      u.email, u.display_name
               FROM submissions s
               JOIN users u ON u.id = s.user_id
               WHERE s.assignment_id = $1
               ORDER BY s.submitted_at"#,
        )
        .bind(assignment_id)
        .fetch_all(db)
        .await?;

        Ok(submissions)
    }

    async fn find_assignment(
        db: &PgPool,
        assignment_id: AssignmentId,
    ) -> Result<Assignment, AppError> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {} FROM assignments WHERE id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(assignment_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))
    }
}
