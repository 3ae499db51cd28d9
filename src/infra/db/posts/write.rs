use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::PostRow;
use super::{POST_COLUMNS, POST_JOINS};

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            text,
            image,
            group_id,
        } = params;

        // `created_at` comes from the column default.
        let mut qb = QueryBuilder::new(
            "WITH p AS (INSERT INTO posts (id, author_id, text, image, group_id) VALUES (",
        );
        let mut values = qb.separated(", ");
        values.push_bind(Uuid::new_v4());
        values.push_bind(author_id);
        values.push_bind(text);
        values.push_bind(image);
        values.push_bind(group_id);
        qb.push(") RETURNING *) SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM p");
        qb.push(POST_JOINS);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            text,
            image,
            group_id,
        } = params;

        let mut qb = QueryBuilder::new("WITH p AS (UPDATE posts SET text = ");
        qb.push_bind(text);
        qb.push(", image = ");
        qb.push_bind(image);
        qb.push(", group_id = ");
        qb.push_bind(group_id);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING *) SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM p");
        qb.push(POST_JOINS);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }
}
