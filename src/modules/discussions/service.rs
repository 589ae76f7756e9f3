use std::collections::HashMap;

use anyhow::anyhow;
use myway_core::AppError;
use myway_models::analytics::ProgressEventType;
use myway_models::ids::{CourseId, ThreadId, UserId};
use sqlx::PgPool;
use tracing::instrument;

use super::model::{CreateReplyDto, CreateThreadDto, Reply, Thread, ThreadWithReplies};
use crate::utils::auth_helpers::org_of_course;
use crate::utils::progress::record_event;

const THREAD_SELECT: &str = r#"SELECT t.id, t.course_id, t.created_by, u.display_name AS creator_name,
       t.title, t.body, t.created_at
FROM threads t
JOIN users u ON u.id = t.created_by"#;

const REPLY_SELECT: &str = r#"SELECT r.id, r.thread_id, r.created_by, u.display_name AS creator_name,
       r.body, r.created_at
FROM replies r
JOIN users u ON u.id = r.created_by"#;

/// Threads are open to any authenticated user; only the target course or
/// thread has to exist.
pub struct DiscussionService;

impl DiscussionService {
    /// Newest threads first, each with its replies in posting order.
    #[instrument(skip(db))]
    pub async fn list_threads(
        db: &PgPool,
        course_id: CourseId,
    ) -> Result<Vec<ThreadWithReplies>, AppError> {
        org_of_course(db, course_id).await?;

        let threads = sqlx::query_as::<_, Thread>(&format!(
            "{} WHERE t.course_id = $1 ORDER BY t.created_at DESC",
            THREAD_SELECT
        ))
        .bind(course_id)
        .fetch_all(db)
        .await?;

        let thread_ids: Vec<ThreadId> = threads.iter().map(|t| t.id).collect();
        let mut replies_by_thread: HashMap<ThreadId, Vec<Reply>> = HashMap::new();
        let replies = sqlx::query_as::<_, Reply>(&format!(
            "{} WHERE r.thread_id = ANY($1) ORDER BY r.created_at",
            REPLY_SELECT
        ))
        .bind(&thread_ids)
        .fetch_all(db)
        .await?;
        for reply in replies {
            replies_by_thread.entry(reply.thread_id).or_default().push(reply);
        }

        Ok(threads
            .into_iter()
            .map(|thread| ThreadWithReplies {
                replies: replies_by_thread.remove(&thread.id).unwrap_or_default(),
                thread,
            })
            .collect())
    }

    #[instrument(skip(db))]
    pub async fn get_thread(db: &PgPool, thread_id: ThreadId) -> Result<ThreadWithReplies, AppError> {
        let thread = sqlx::query_as::<_, Thread>(&format!("{} WHERE t.id = $1", THREAD_SELECT))
            .bind(thread_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Thread not found")))?;

        let replies = sqlx::query_as::<_, Reply>(&format!(
            "{} WHERE r.thread_id = $1 ORDER BY r.created_at",
            REPLY_SELECT
        ))
        .bind(thread_id)
        .fetch_all(db)
        .await?;

        Ok(ThreadWithReplies { thread, replies })
    }

    #[instrument(skip(db, dto), fields(course.id = %course_id))]
    pub async fn create_thread(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
        dto: CreateThreadDto,
    ) -> Result<Thread, AppError> {
        org_of_course(db, course_id).await?;

        let mut tx = db.begin().await?;

        let thread = sqlx::query_as::<_, Thread>(
            r#"WITH inserted AS (
                   INSERT INTO threads (course_id, created_by, title, body)
                   VALUES ($1, $2, $3, $4)
                   RETURNING id, course_id, created_by, title, body, created_at
               )
               SELECT i.id, i.course_id, i.created_by, u.display_name AS creator_name,
                      i.title, i.body, i.created_at
               FROM inserted i
               JOIN users u ON u.id = i.created_by"#,
        )
        .bind(course_id)
        .bind(actor)
        .bind(dto.title.trim())
        .bind(&dto.body)
        .fetch_one(&mut *tx)
        .await?;

        record_event(&mut tx, actor, course_id, ProgressEventType::Thread).await?;
        tx.commit().await?;

        tracing::info!(thread.id = %thread.id, "thread created");
        Ok(thread)
    }

    #[instrument(skip(db, dto), fields(thread.id = %thread_id))]
    pub async fn reply(
        db: &PgPool,
        actor: UserId,
        thread_id: ThreadId,
        dto: CreateReplyDto,
    ) -> Result<Reply, AppError> {
        let course_id =
            sqlx::query_scalar::<_, CourseId>("SELECT course_id FROM threads WHERE id = $1")
                .bind(thread_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Thread not found")))?;

        let mut tx = db.begin().await?;

        let reply = sqlx::query_as::<_, Reply>(
            r#"WITH inserted AS (
                   INSERT INTO replies (thread_id, created_by, body)
                   VALUES ($1, $2, $3)
                   RETURNING id, thread_id, created_by, body, created_at
               )
               SELECT i.id, i.thread_id, i.created_by, u.display_name AS creator_name,
                      i.body, i.created_at
               FROM inserted i
               JOIN users u ON u.id = i.created_by"#,
        )
        .bind(thread_id)
        .bind(actor)
        .bind(&dto.body)
        .fetch_one(&mut *tx)
        .await?;

        record_event(&mut tx, actor, course_id, ProgressEventType::Reply).await?;
        tx.commit().await?;

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_course, create_user, member_of_new_org};
    use axum::http::StatusCode;
    use myway_auth::OrgRole;
    use uuid::Uuid;

    fn thread_dto(title: &str) -> CreateThreadDto {
        CreateThreadDto {
            title: title.to_string(),
            body: "What does this mean?".to_string(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_threads_newest_first_with_ordered_replies(pool: PgPool) {
        let (teacher, org_id) = member_of_new_org(&pool, OrgRole::Teacher).await;
        let course_id = create_course(&pool, org_id, teacher).await;
        let asker = create_user(&pool, "Ada").await;

        let older = DiscussionService::create_thread(&pool, asker, course_id, thread_dto("Week 1"))
            .await
            .unwrap();
        let newer = DiscussionService::create_thread(&pool, asker, course_id, thread_dto("Week 2"))
            .await
            .unwrap();
        assert_eq!(older.creator_name, "Ada");

        for body in ["first", "second"] {
            DiscussionService::reply(
                &pool,
                teacher,
                older.id,
                CreateReplyDto {
                    body: body.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let threads = DiscussionService::list_threads(&pool, course_id).await.unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].thread.id, newer.id);
        assert!(threads[0].replies.is_empty());
        let bodies: Vec<&str> = threads[1].replies.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(threads[1].replies[0].creator_name, "Member");

        let events = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM progress_events WHERE course_id = $1 AND event_type IN ('THREAD', 'REPLY')",
        )
        .bind(course_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(events, 4);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_missing_targets_are_not_found(pool: PgPool) {
        let user = create_user(&pool, "Someone").await;

        let err = DiscussionService::create_thread(
            &pool,
            user,
            CourseId::from(Uuid::new_v4()),
            thread_dto("Lost"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = DiscussionService::reply(
            &pool,
            user,
            ThreadId::from(Uuid::new_v4()),
            CreateReplyDto {
                body: "hello?".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = DiscussionService::get_thread(&pool, ThreadId::from(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
