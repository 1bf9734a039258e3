use axum::{
    Router,
    routing::{get, post},
};

use crate::App;

use super::{
    create::{create_comment, create_root},
    delete::delete_comment,
    get::{get_article_comments, get_comment_tree},
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/articles", post(create_root))
        .route("/articles/{article_id}/comments", get(get_article_comments))
        .route("/comments", post(create_comment))
        .route(
            "/comments/{id}",
            get(get_comment_tree).delete(delete_comment),
        )
}
