//! Comment persistence.
//!
//! Every comment row carries its materialized path, so a subtree is one
//! prefix range: reads and deletes never walk the tree recursively.
//!
//! Creating a reply reads the parent's path and then inserts, without a
//! transaction around the two. Paths never change once written, so the only
//! possible interference is a reply racing the deletion of its parent: the
//! reply can land under a path whose ancestor is already gone. That row is
//! reported as an orphan when a tree containing it is rebuilt.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{models::comment::Comment, path::PathError};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCommentStore;
pub use postgres::PgCommentStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("comment `{0}` not found")]
    NotFound(Uuid),

    #[error("parent comment `{0}` not found")]
    ParentNotFound(Uuid),

    #[error("article `{0}` already has a comment tree")]
    AlreadyExists(Uuid),

    #[error("stored path is invalid: {0}")]
    InvalidPath(#[from] PathError),

    #[error("couldn't get a database connection: {0}")]
    Pool(#[from] diesel_async::pooled_connection::deadpool::PoolError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for per-article comment trees.
///
/// One instance is shared by all request handlers. Implementations hold no
/// locks across calls and never retry; transient failures are returned as
/// [`StoreError::Pool`] or [`StoreError::Database`].
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Creates the root of `article_id`'s tree. Fails with
    /// [`StoreError::AlreadyExists`] if the article already has one.
    async fn create_root(&self, article_id: Uuid, author_id: i64) -> StoreResult<Comment>;

    /// Appends a reply under `parent_id`, inheriting the parent's article.
    async fn create_comment(
        &self,
        parent_id: Uuid,
        author_id: i64,
        content: &str,
    ) -> StoreResult<Comment>;

    /// `node_id` and all of its descendants, ordered by path so that every
    /// row comes after its parent (pre-order).
    async fn fetch_subtree_rows(&self, node_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Removes `node_id` with its whole subtree and returns how many rows
    /// went away. A missing node is not an error, it just removes nothing.
    async fn delete_subtree(&self, node_id: Uuid) -> StoreResult<u64>;

    async fn find_root(&self, article_id: Uuid) -> StoreResult<Option<Comment>>;
}

/// Fresh comment id. UUIDv7 is time ordered, which keeps later siblings
/// after earlier ones in path order.
pub(crate) fn new_comment_id() -> Uuid {
    Uuid::now_v7()
}
