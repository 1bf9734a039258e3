use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::{App, error::AppError, models::comment::Comment};

const MAX_CONTENT_CHARS: usize = 5000;

#[derive(Deserialize)]
pub struct RootSubmission {
    article_id: Uuid,
    author_id: i64,
}

#[derive(Deserialize)]
pub struct CommentSubmission {
    parent_id: Uuid,
    author_id: i64,
    content: String,
}

impl CommentSubmission {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.content = self.content.trim().to_string();

        if self.content.is_empty() {
            return Err("No content provided");
        }

        if self.content.chars().count() > MAX_CONTENT_CHARS {
            return Err("Content too long (max 5000 characters)");
        }

        Ok(())
    }
}

/// Opens the comment tree of an article.
#[debug_handler]
pub async fn create_root(
    State(ctx): State<App>,
    crate::json::Json(submission): crate::json::Json<RootSubmission>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let root = ctx
        .store
        .create_root(submission.article_id, submission.author_id)
        .await?;

    tracing::info!(
        article_id = %root.article_id,
        root_id = %root.id,
        "Created comment tree"
    );

    Ok((StatusCode::CREATED, Json(root)))
}

#[debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    crate::json::Json(mut submission): crate::json::Json<CommentSubmission>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    submission
        .validate()
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let comment = ctx
        .store
        .create_comment(
            submission.parent_id,
            submission.author_id,
            &submission.content,
        )
        .await?;

    tracing::info!(
        comment_id = %comment.id,
        parent_id = %submission.parent_id,
        depth = comment.path.depth(),
        "Created comment"
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::test_support::app;

    fn submission(parent_id: Uuid, content: &str) -> CommentSubmission {
        CommentSubmission {
            parent_id,
            author_id: 7,
            content: content.into(),
        }
    }

    #[test]
    fn validate_trims_content() {
        let mut s = submission(Uuid::nil(), "  hello \n");
        assert!(s.validate().is_ok());
        assert_eq!(s.content, "hello");
    }

    #[test]
    fn validate_rejects_blank_and_oversized_content() {
        assert_eq!(
            submission(Uuid::nil(), "   ").validate(),
            Err("No content provided")
        );

        let long = "é".repeat(MAX_CONTENT_CHARS + 1);
        assert_eq!(
            submission(Uuid::nil(), &long).validate(),
            Err("Content too long (max 5000 characters)")
        );

        // the limit counts characters, not bytes
        let exact = "é".repeat(MAX_CONTENT_CHARS);
        assert!(submission(Uuid::nil(), &exact).validate().is_ok());
    }

    #[tokio::test]
    async fn creates_root_then_reply() {
        let app = app();
        let article_id = Uuid::now_v7();

        let (status, Json(root)) = create_root(
            State(app.clone()),
            crate::json::Json(RootSubmission {
                article_id,
                author_id: 1,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(root.article_id, article_id);
        assert!(root.is_root());

        let (status, Json(reply)) = create_comment(
            State(app.clone()),
            crate::json::Json(submission(root.id, " first! ")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reply.parent_id, Some(root.id));
        assert_eq!(reply.article_id, article_id);
        assert_eq!(reply.content, "first!");
        assert_eq!(reply.author_id, 7);
    }

    #[tokio::test]
    async fn second_root_conflicts() {
        let app = app();
        let article_id = Uuid::now_v7();
        let body = || {
            crate::json::Json(RootSubmission {
                article_id,
                author_id: 1,
            })
        };

        let (status, _) = create_root(State(app.clone()), body()).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = create_root(State(app.clone()), body()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reply_to_missing_parent_is_not_found() {
        let err = create_comment(
            State(app()),
            crate::json::Json(submission(Uuid::now_v7(), "anyone?")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_reply_is_bad_request() {
        let err = create_comment(
            State(app()),
            crate::json::Json(submission(Uuid::now_v7(), "  ")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
