use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    App,
    error::AppError,
    tree::{self, CommentNode},
};

#[derive(Deserialize)]
pub struct Queries {
    sort: Option<SortType>,
}

#[derive(PartialEq, Debug, Default)]
enum SortType {
    /// Replies in the order they were written
    #[default]
    Old,
    New,
}

impl<'de> Deserialize<'de> for SortType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "old" => Ok(SortType::Old),
            "new" => Ok(SortType::New),
            _ => Err(serde::de::Error::custom("invalid sort type")),
        }
    }
}

fn apply_sort(mut node: CommentNode, sort: Option<SortType>) -> CommentNode {
    if sort.unwrap_or_default() == SortType::New {
        node.sort_newest_first();
    }
    node
}

/// The comment `id` with every reply below it.
pub async fn get_comment_tree(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    Query(q): Query<Queries>,
) -> Result<Json<CommentNode>, AppError> {
    let node = tree::fetch_tree(ctx.store.as_ref(), id).await?;
    tracing::debug!(comment_id = %id, comments = node.size(), "Fetched comment tree");

    Ok(Json(apply_sort(node, q.sort)))
}

/// The whole comment tree of an article, starting at its root.
pub async fn get_article_comments(
    State(ctx): State<App>,
    Path(article_id): Path<Uuid>,
    Query(q): Query<Queries>,
) -> Result<Json<CommentNode>, AppError> {
    let root = ctx
        .store
        .find_root(article_id)
        .await?
        .ok_or(("This article has no comment tree", StatusCode::NOT_FOUND))?;

    let node = tree::fetch_tree(ctx.store.as_ref(), root.id).await?;
    tracing::debug!(%article_id, comments = node.size(), "Fetched article comments");

    Ok(Json(apply_sort(node, q.sort)))
}
