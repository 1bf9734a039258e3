use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::path::MaterializedPath;

/// One stored comment. Every field except `content` is fixed at creation.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    /// `None` only for the root of an article's tree
    pub parent_id: Option<Uuid>,
    pub path: MaterializedPath,
    pub content: String,
    pub author_id: i64,
    pub created_at: NaiveDateTime,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
