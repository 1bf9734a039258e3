//! Rebuilding nested comment trees from flat, path-ordered rows.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::comment::Comment,
    store::{CommentStore, StoreError},
};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("no rows to build a comment tree from")]
    RootNotFound,

    #[error("comment `{second}` has no parent, but `{first}` already heads the tree")]
    MultipleRoots { first: Uuid, second: Uuid },

    #[error("comment `{id}` refers to parent `{parent_id}`, which is not in the tree")]
    OrphanRow { id: Uuid, parent_id: Uuid },

    #[error("path of comment `{id}` does not extend its parent's path")]
    BrokenPath { id: Uuid },
}

#[derive(thiserror::Error, Debug)]
pub enum FetchTreeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A comment together with its replies, oldest first.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            children: Vec::new(),
        }
    }

    /// Number of comments in this subtree, including this one.
    pub fn size(&self) -> usize {
        self.walk().count()
    }

    /// Pre-order traversal yielding each node with its depth below `self`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(self, 0)],
        }
    }

    /// Reorders replies at every level so the newest comes first.
    pub fn sort_newest_first(&mut self) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.children
                .sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
            stack.extend(node.children.iter_mut());
        }
    }
}

pub struct Walk<'a> {
    stack: Vec<(&'a CommentNode, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a CommentNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        Some((node, depth))
    }
}

struct Slot {
    comment: Option<Comment>,
    children: Vec<usize>,
}

// A root's path is its own id alone; any other top row must end with its
// parent's id followed by its own.
fn anchor_path_is_valid(comment: &Comment) -> bool {
    let Ok(ids) = comment.path.ids() else {
        return false;
    };

    match comment.parent_id {
        None => ids == [comment.id],
        Some(parent_id) => ids.ends_with(&[parent_id, comment.id]),
    }
}

/// Builds the tree in one pass over `rows`, which must be ordered by path.
///
/// The first row is the top of the tree. It is either an article root or,
/// for a fetched subtree, a reply whose parent lies outside `rows`. Path
/// order guarantees that every other row's parent has already been seen;
/// a row that breaks this is reported instead of dropped.
pub fn build(rows: Vec<Comment>) -> Result<CommentNode, TreeError> {
    let mut arena: Vec<Slot> = Vec::with_capacity(rows.len());
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(rows.len());

    for comment in rows {
        let position = arena.len();

        if position > 0 {
            let Some(parent_id) = comment.parent_id else {
                return Err(TreeError::MultipleRoots {
                    first: arena[0].comment.as_ref().map_or(Uuid::nil(), |c| c.id),
                    second: comment.id,
                });
            };

            let &parent = index.get(&parent_id).ok_or(TreeError::OrphanRow {
                id: comment.id,
                parent_id,
            })?;

            let parent_path = arena[parent].comment.as_ref().map(|c| &c.path);
            if parent_path.map(|p| p.append(&comment.id)) != Some(comment.path.clone()) {
                return Err(TreeError::BrokenPath { id: comment.id });
            }

            arena[parent].children.push(position);
        } else if !anchor_path_is_valid(&comment) {
            return Err(TreeError::BrokenPath { id: comment.id });
        }

        index.insert(comment.id, position);
        arena.push(Slot {
            comment: Some(comment),
            children: Vec::new(),
        });
    }

    // children always sit after their parent, so assembling back to front
    // finds every child already built
    let mut built: Vec<Option<CommentNode>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for position in (0..arena.len()).rev() {
        let slot = &mut arena[position];
        let Some(comment) = slot.comment.take() else {
            continue;
        };

        let mut node = CommentNode::leaf(comment);
        node.children = slot
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[position] = Some(node);
    }

    built
        .into_iter()
        .next()
        .flatten()
        .ok_or(TreeError::RootNotFound)
}

/// Loads `node_id` and its descendants and assembles them into a tree.
pub async fn fetch_tree(
    store: &dyn CommentStore,
    node_id: Uuid,
) -> Result<CommentNode, FetchTreeError> {
    let rows = store.fetch_subtree_rows(node_id).await?;
    Ok(build(rows)?)
}
