use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommentStore, StoreError, StoreResult, new_comment_id};
use crate::{models::comment::Comment, path::MaterializedPath};

#[derive(Default)]
struct Tables {
    // ordered label by label, so a subtree is one contiguous range
    rows: BTreeMap<MaterializedPath, Comment>,
    paths: HashMap<Uuid, MaterializedPath>,
    // article id -> root comment id
    roots: HashMap<Uuid, Uuid>,
}

impl Tables {
    fn subtree<'a>(
        &'a self,
        top: &'a MaterializedPath,
    ) -> impl Iterator<Item = &'a Comment> + 'a {
        self.rows
            .range::<MaterializedPath, _>(top..)
            .take_while(move |(path, _)| path.is_descendant_or_self(top))
            .map(|(_, comment)| comment)
    }

    fn get(&self, id: &Uuid) -> Option<&Comment> {
        self.paths.get(id).and_then(|path| self.rows.get(path))
    }

    fn insert(&mut self, comment: Comment) {
        self.paths.insert(comment.id, comment.path.clone());
        self.rows.insert(comment.path.clone(), comment);
    }
}

/// In-process store for tests and local development.
///
/// Every call takes the lock for its whole duration, which makes this
/// backend stricter than PostgreSQL: a reply can never outlive a concurrent
/// delete of its parent here.
#[derive(Default)]
pub struct MemoryCommentStore {
    tables: RwLock<Tables>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn create_root(&self, article_id: Uuid, author_id: i64) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if tables.roots.contains_key(&article_id) {
            return Err(StoreError::AlreadyExists(article_id));
        }

        let id = new_comment_id();
        let root = Comment {
            id,
            article_id,
            parent_id: None,
            path: MaterializedPath::root(&id),
            content: String::new(),
            author_id,
            created_at: now(),
        };

        tables.roots.insert(article_id, id);
        tables.insert(root.clone());
        Ok(root)
    }

    async fn create_comment(
        &self,
        parent_id: Uuid,
        author_id: i64,
        content: &str,
    ) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        let parent = tables
            .get(&parent_id)
            .ok_or(StoreError::ParentNotFound(parent_id))?;

        let id = new_comment_id();
        let comment = Comment {
            id,
            article_id: parent.article_id,
            parent_id: Some(parent_id),
            path: parent.path.append(&id),
            content: content.to_string(),
            author_id,
            created_at: now(),
        };

        tables.insert(comment.clone());
        Ok(comment)
    }

    async fn fetch_subtree_rows(&self, node_id: Uuid) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let top = tables
            .paths
            .get(&node_id)
            .ok_or(StoreError::NotFound(node_id))?;

        Ok(tables.subtree(top).cloned().collect())
    }

    async fn delete_subtree(&self, node_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let Some(top) = tables.paths.get(&node_id).cloned() else {
            return Ok(0);
        };

        let doomed: Vec<MaterializedPath> = tables
            .subtree(&top)
            .map(|comment| comment.path.clone())
            .collect();

        for path in &doomed {
            if let Some(comment) = tables.rows.remove(path) {
                tables.paths.remove(&comment.id);
                if comment.is_root() {
                    tables.roots.remove(&comment.article_id);
                }
            }
        }

        Ok(doomed.len() as u64)
    }

    async fn find_root(&self, article_id: Uuid) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .roots
            .get(&article_id)
            .and_then(|id| tables.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::conformance;

    #[tokio::test]
    async fn conforms() {
        conformance::run_all(Arc::new(MemoryCommentStore::new())).await;
    }

    #[tokio::test]
    async fn delete_only_touches_the_subtree() {
        let store = MemoryCommentStore::new();
        let root = store.create_root(Uuid::now_v7(), 1).await.unwrap();
        let keep = store.create_comment(root.id, 1, "keep").await.unwrap();
        let gone = store.create_comment(root.id, 1, "gone").await.unwrap();
        store.create_comment(gone.id, 1, "gone too").await.unwrap();
        store.create_comment(keep.id, 1, "keep too").await.unwrap();

        let other = store.create_root(Uuid::now_v7(), 1).await.unwrap();

        assert_eq!(store.len().await, 6);
        assert_eq!(store.delete_subtree(gone.id).await.unwrap(), 2);
        assert_eq!(store.len().await, 4);
        assert!(store.fetch_subtree_rows(other.id).await.is_ok());
        assert_eq!(store.fetch_subtree_rows(keep.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_root_frees_the_article() {
        let store = MemoryCommentStore::new();
        let article = Uuid::now_v7();
        let root = store.create_root(article, 1).await.unwrap();
        store.create_comment(root.id, 1, "x").await.unwrap();

        assert_eq!(store.delete_subtree(root.id).await.unwrap(), 2);
        assert!(store.is_empty().await);
        assert!(store.find_root(article).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reply_after_parent_deletion_is_rejected() {
        let store = MemoryCommentStore::new();
        let root = store.create_root(Uuid::now_v7(), 1).await.unwrap();
        let parent = store.create_comment(root.id, 1, "parent").await.unwrap();
        store.delete_subtree(parent.id).await.unwrap();

        assert!(matches!(
            store.create_comment(parent.id, 1, "late").await,
            Err(StoreError::ParentNotFound(id)) if id == parent.id
        ));
    }
}
