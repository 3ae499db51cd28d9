use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, RepoError,
};
use crate::domain::entities::{AuthorRef, CommentRecord};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.text, c.created_at, \
     u.id AS author_id, u.username AS author_username, u.display_name AS author_display_name";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    text: String,
    created_at: OffsetDateTime,
    author_id: Uuid,
    author_username: String,
    author_display_name: Option<String>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
                display_name: row.author_display_name,
            },
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(COMMENT_COLUMNS);
        qb.push(" FROM comments c INNER JOIN users u ON u.id = c.author_id WHERE c.post_id = ");
        qb.push_bind(post_id);
        qb.push(" ORDER BY c.created_at ASC, c.id ASC");

        let rows = qb
            .build_query_as::<CommentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut qb = QueryBuilder::new(
            "WITH c AS (INSERT INTO comments (id, post_id, author_id, text) VALUES (",
        );
        let mut values = qb.separated(", ");
        values.push_bind(Uuid::new_v4());
        values.push_bind(params.post_id);
        values.push_bind(params.author_id);
        values.push_bind(params.text);
        qb.push(") RETURNING *) SELECT ");
        qb.push(COMMENT_COLUMNS);
        qb.push(" FROM c INNER JOIN users u ON u.id = c.author_id");

        let row = qb
            .build_query_as::<CommentRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
