use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{App, error::AppError};

/// Removes a comment and all of its replies. Deleting something that is
/// already gone still succeeds.
pub async fn delete_comment(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = ctx.store.delete_subtree(id).await?;

    if deleted > 0 {
        tracing::info!(comment_id = %id, deleted, "Deleted comment subtree");
    }

    Ok(StatusCode::NO_CONTENT)
}
