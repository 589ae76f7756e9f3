use std::collections::HashMap;

use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::ids::{CourseId, OrgId, UserId};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use chrono::{DateTime, Utc};

use super::model::{
    CourseCohort, CourseProgress, OrgMetrics, RecentAttempt, StudentMastery, StudentPerformance,
    WeakTopic,
};
use crate::utils::auth_helpers::{
    ensure_org_exists, org_of_course, require_org_member, require_org_role,
};

/// Mean quiz score below which a student is flagged.
pub const AT_RISK_THRESHOLD: f64 = 60.0;

/// Mean quiz score below which a material counts as a weak topic.
pub const WEAK_TOPIC_THRESHOLD: f64 = 70.0;

const RECENT_ATTEMPTS_LIMIT: i64 = 5;

// Per-course progress of the learner bound to $2. Callers append the filter
// on `c` that binds $1.
const COURSE_PROGRESS_QUERY: &str = r#"
    SELECT c.id AS course_id,
           c.title AS course_title,
           (SELECT COUNT(*) FROM materials m WHERE m.course_id = c.id) AS total_materials,
           (SELECT COUNT(DISTINCT p.material_id)
              FROM study_packs p
              JOIN materials m ON m.id = p.material_id
             WHERE m.course_id = c.id
               AND (EXISTS (SELECT 1 FROM quiz_attempts qa
                             WHERE qa.study_pack_id = p.id AND qa.user_id = $2)
                    OR EXISTS (SELECT 1 FROM flashcard_sessions fs
                                WHERE fs.study_pack_id = p.id AND fs.user_id = $2))
           ) AS practiced_materials,
           (SELECT COUNT(*)
              FROM quiz_attempts qa
              JOIN study_packs p ON p.id = qa.study_pack_id
              JOIN materials m ON m.id = p.material_id
             WHERE m.course_id = c.id AND qa.user_id = $2) AS quiz_attempts,
           (SELECT COUNT(*)
              FROM flashcard_sessions fs
              JOIN study_packs p ON p.id = fs.study_pack_id
              JOIN materials m ON m.id = p.material_id
             WHERE m.course_id = c.id AND fs.user_id = $2) AS flashcard_sessions,
           (SELECT MAX(pe.created_at)
              FROM progress_events pe
             WHERE pe.course_id = c.id AND pe.user_id = $2) AS last_activity
      FROM courses c"#;

/// Arithmetic mean; 0 for no scores.
pub fn mean_score(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
}

pub fn is_at_risk(avg_score: f64) -> bool {
    avg_score < AT_RISK_THRESHOLD
}

/// Share of members with any recorded activity; 0 for an empty organization.
pub fn activation_rate(activated: i64, members: i64) -> f64 {
    if members == 0 {
        return 0.0;
    }
    activated as f64 / members as f64
}

/// Share of materials practiced, as a percentage; 0 for a course without
/// materials.
pub fn progress_percentage(practiced: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (practiced as f64 / total as f64 * 100.0).min(100.0)
}

#[derive(FromRow)]
struct CourseProgressRow {
    course_id: CourseId,
    course_title: String,
    total_materials: i64,
    practiced_materials: i64,
    quiz_attempts: i64,
    flashcard_sessions: i64,
    last_activity: Option<DateTime<Utc>>,
}

impl From<CourseProgressRow> for CourseProgress {
    fn from(row: CourseProgressRow) -> Self {
        CourseProgress {
            course_id: row.course_id,
            course_title: row.course_title,
            total_materials: row.total_materials,
            practiced_materials: row.practiced_materials,
            progress_percentage: progress_percentage(row.practiced_materials, row.total_materials),
            quiz_attempts: row.quiz_attempts,
            flashcard_sessions: row.flashcard_sessions,
            last_activity: row.last_activity,
        }
    }
}

#[derive(FromRow)]
struct OrgCounts {
    total_members: i64,
    total_courses: i64,
    study_packs_ready: i64,
    quizzes_taken: i64,
    activated_members: i64,
}

pub struct AnalyticsService;

impl AnalyticsService {
    #[instrument(skip(db))]
    pub async fn student_mastery(db: &PgPool, user_id: UserId) -> Result<StudentMastery, AppError> {
        let scores =
            sqlx::query_scalar::<_, i32>("SELECT score FROM quiz_attempts WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(db)
                .await?;

        let recent_attempts = sqlx::query_as::<_, RecentAttempt>(
            r#"SELECT qa.id, qa.study_pack_id, p.material_id, m.title AS material_title,
                      qa.score, qa.created_at
               FROM quiz_attempts qa
               JOIN study_packs p ON p.id = qa.study_pack_id
               JOIN materials m ON m.id = p.material_id
               WHERE qa.user_id = $1
               ORDER BY qa.created_at DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(RECENT_ATTEMPTS_LIMIT)
        .fetch_all(db)
        .await?;

        let weak_topics = sqlx::query_as::<_, WeakTopic>(
            r#"SELECT p.material_id, m.title AS material_title,
                      AVG(qa.score)::float8 AS avg_score, COUNT(*) AS attempts
               FROM quiz_attempts qa
               JOIN study_packs p ON p.id = qa.study_pack_id
               JOIN materials m ON m.id = p.material_id
               WHERE qa.user_id = $1
               GROUP BY p.material_id, m.title
               HAVING AVG(qa.score)::float8 < $2
               ORDER BY avg_score, m.title"#,
        )
        .bind(user_id)
        .bind(WEAK_TOPIC_THRESHOLD)
        .fetch_all(db)
        .await?;

        let score_trend: Vec<i32> = recent_attempts.iter().map(|a| a.score).collect();

        Ok(StudentMastery {
            avg_score: mean_score(&scores),
            total_attempts: scores.len() as i64,
            last_score: score_trend.first().copied(),
            score_trend,
            weak_topics,
            recent_attempts,
        })
    }

    /// Per-student quiz performance over the packs of one course. Enrolled
    /// students without attempts average 0 and are therefore at risk.
    #[instrument(skip(db))]
    pub async fn teacher_cohort(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<CourseCohort, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let enrolled = sqlx::query_as::<_, (UserId, String)>(
            r#"SELECT e.user_id, u.display_name
               FROM enrollments e
               JOIN users u ON u.id = e.user_id
               WHERE e.course_id = $1
               ORDER BY u.display_name"#,
        )
        .bind(course_id)
        .fetch_all(db)
        .await?;

        let attempts = sqlx::query_as::<_, (UserId, i32)>(
            r#"SELECT qa.user_id, qa.score
               FROM quiz_attempts qa
               JOIN study_packs p ON p.id = qa.study_pack_id
               JOIN materials m ON m.id = p.material_id
               WHERE m.course_id = $1"#,
        )
        .bind(course_id)
        .fetch_all(db)
        .await?;

        let weak_topics = sqlx::query_as::<_, WeakTopic>(
            r#"SELECT p.material_id, m.title AS material_title,
                      AVG(qa.score)::float8 AS avg_score, COUNT(*) AS attempts
               FROM quiz_attempts qa
               JOIN study_packs p ON p.id = qa.study_pack_id
               JOIN materials m ON m.id = p.material_id
               WHERE m.course_id = $1
               GROUP BY p.material_id, m.title
               HAVING AVG(qa.score)::float8 < $2
               ORDER BY avg_score, m.title"#,
        )
        .bind(course_id)
        .bind(WEAK_TOPIC_THRESHOLD)
        .fetch_all(db)
        .await?;

        let all_scores: Vec<i32> = attempts.iter().map(|(_, score)| *score).collect();
        let mut scores_by_user: HashMap<UserId, Vec<i32>> = HashMap::new();
        for (user_id, score) in attempts {
            scores_by_user.entry(user_id).or_default().push(score);
        }

        let students: Vec<StudentPerformance> = enrolled
            .into_iter()
            .map(|(user_id, display_name)| {
                let scores = scores_by_user.remove(&user_id).unwrap_or_default();
                let avg_score = mean_score(&scores);
                StudentPerformance {
                    user_id,
                    display_name,
                    avg_score,
                    attempts: scores.len() as i64,
                    at_risk: is_at_risk(avg_score),
                }
            })
            .collect();

        Ok(CourseCohort {
            course_id,
            total_students: students.len() as i64,
            at_risk_count: students.iter().filter(|s| s.at_risk).count() as i64,
            cohort_avg_score: mean_score(&all_scores),
            weak_topics,
            students,
        })
    }

    #[instrument(skip(db))]
    pub async fn org_metrics(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<OrgMetrics, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_role(db, actor, org_id, &[OrgRole::Organizer]).await?;

        let counts = sqlx::query_as::<_, OrgCounts>(
            r#"SELECT
                   (SELECT COUNT(*) FROM org_memberships WHERE org_id = $1) AS total_members,
                   (SELECT COUNT(*) FROM courses WHERE org_id = $1) AS total_courses,
                   (SELECT COUNT(*)
                      FROM study_packs p
                      JOIN materials m ON m.id = p.material_id
                      JOIN courses c ON c.id = m.course_id
                     WHERE c.org_id = $1 AND p.status = 'ready') AS study_packs_ready,
                   (SELECT COUNT(*)
                      FROM quiz_attempts qa
                      JOIN study_packs p ON p.id = qa.study_pack_id
                      JOIN materials m ON m.id = p.material_id
                      JOIN courses c ON c.id = m.course_id
                     WHERE c.org_id = $1) AS quizzes_taken,
                   (SELECT COUNT(DISTINCT pe.user_id)
                      FROM progress_events pe
                      JOIN courses c ON c.id = pe.course_id
                      JOIN org_memberships om ON om.user_id = pe.user_id AND om.org_id = c.org_id
                     WHERE c.org_id = $1) AS activated_members"#,
        )
        .bind(org_id)
        .fetch_one(db)
        .await?;

        let daily_active_users = Self::active_users(db, org_id, 1).await?;
        let weekly_active_users = Self::active_users(db, org_id, 7).await?;

        Ok(OrgMetrics {
            org_id,
            total_members: counts.total_members,
            total_courses: counts.total_courses,
            daily_active_users,
            weekly_active_users,
            study_packs_ready: counts.study_packs_ready,
            quizzes_taken: counts.quizzes_taken,
            activation_rate: activation_rate(counts.activated_members, counts.total_members),
        })
    }

    #[instrument(skip(db))]
    pub async fn course_progress(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_member(db, actor, org_id).await?;

        let row = sqlx::query_as::<_, CourseProgressRow>(&format!(
            "{} WHERE c.id = $1",
            COURSE_PROGRESS_QUERY
        ))
        .bind(course_id)
        .bind(actor)
        .fetch_one(db)
        .await?;

        Ok(row.into())
    }

    /// Progress through every course of the organization, ordered by title.
    #[instrument(skip(db))]
    pub async fn org_progress(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<Vec<CourseProgress>, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_member(db, actor, org_id).await?;

        let rows = sqlx::query_as::<_, CourseProgressRow>(&format!(
            "{} WHERE c.org_id = $1 ORDER BY c.title, c.id",
            COURSE_PROGRESS_QUERY
        ))
        .bind(org_id)
        .bind(actor)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(CourseProgress::from).collect())
    }

    /// Distinct members with a progress event in the org's courses or a
    /// login within the last `days` days.
    async fn active_users(db: &PgPool, org_id: OrgId, days: i32) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM (
                   SELECT pe.user_id
                     FROM progress_events pe
                     JOIN courses c ON c.id = pe.course_id
                     JOIN org_memberships om ON om.user_id = pe.user_id AND om.org_id = c.org_id
                    WHERE c.org_id = $1
                      AND pe.created_at >= NOW() - make_interval(days => $2)
                   UNION
                   SELECT u.id
                     FROM users u
                     JOIN org_memberships om ON om.user_id = u.id
                    WHERE om.org_id = $1
                      AND u.last_login_at >= NOW() - make_interval(days => $2)
               ) active"#,
        )
        .bind(org_id)
        .bind(days)
        .fetch_one(db)
        .await?;

        Ok(count)
    }
}
