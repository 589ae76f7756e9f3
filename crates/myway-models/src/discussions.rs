use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{CourseId, ReplyId, ThreadId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Thread {
    pub id: ThreadId,
    pub course_id: CourseId,
    pub created_by: UserId,
    pub creator_name: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reply {
    pub id: ReplyId,
    pub thread_id: ThreadId,
    pub created_by: UserId,
    pub creator_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ThreadWithReplies {
    #[serde(flatten)]
    pub thread: Thread,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateThreadDto {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReplyDto {
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}
