use std::sync::Arc;

use axum::Router;

pub mod comment;
pub mod config;
pub mod error;
pub mod json;
pub mod models;
pub mod path;
pub mod store;
pub mod tree;

use store::CommentStore;

#[derive(Clone)]
pub struct App {
    pub store: Arc<dyn CommentStore>,
}

impl App {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        Self { store }
    }
}

pub fn router(app: App) -> Router {
    Router::new()
        .merge(comment::routes::route())
        .with_state(app)
}
