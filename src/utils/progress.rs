use myway_models::analytics::ProgressEventType;
use myway_models::ids::{CourseId, UserId};
use sqlx::{Postgres, Transaction};

/// Appends a progress event inside the caller's transaction, so the event
/// commits or rolls back with the activity it records.
pub async fn record_event(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    course_id: CourseId,
    event_type: ProgressEventType,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO progress_events (user_id, course_id, event_type) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(course_id)
        .bind(event_type)
        .execute(&mut **tx)
        .await?;

    tracing::debug!(user.id = %user_id, course.id = %course_id, event = ?event_type, "progress event recorded");
    Ok(())
}
