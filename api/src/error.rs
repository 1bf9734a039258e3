use std::{collections::HashMap, fmt};

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;

use crate::{
    store::StoreError,
    tree::{FetchTreeError, TreeError},
};

/// Errors that know which HTTP status they should surface as.
pub trait ApiRequestError: std::error::Error {
    fn status_code(&self) -> StatusCode;
}

impl ApiRequestError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) | StoreError::ParentNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            StoreError::InvalidPath(_) | StoreError::Pool(_) | StoreError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug)]
pub enum ServerError {
    Store(StoreError),
    Tree(TreeError),
}

impl ServerError {
    fn code(&self) -> &'static str {
        match self {
            ServerError::Store(StoreError::Pool(_) | StoreError::Database(_)) => "DATABASE_ERR",
            ServerError::Store(_) => "STORAGE_ERR",
            ServerError::Tree(_) => "TREE_ERR",
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Store(e) => write!(f, "{e}"),
            ServerError::Tree(e) => write!(f, "{e}"),
        }
    }
}

impl Serialize for ServerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

#[derive(Debug)]
pub enum AppError {
    ServerError {
        error: ServerError,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
    RequestError {
        msg: String,
        status: StatusCode,
    },
}

impl AppError {
    fn server(error: ServerError) -> Self {
        AppError::ServerError {
            error,

            #[cfg(debug_assertions)]
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RequestError { status, .. } => *status,
            AppError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

// "Not Found" -> "NOT_FOUND"
fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("ERR")
        .to_uppercase()
        .replace(' ', "_")
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        let error_response = match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                tracing::error!(error = %error, "Request failed with a server error");

                #[cfg(debug_assertions)]
                let response = {
                    let frames_info = backtrace
                        .as_ref()
                        .map(filter_backtrace)
                        .unwrap_or_default();
                    ErrorResponse {
                        code: error.code().into(),
                        msg: Some(error.to_string()),
                        debug_info: Some(HashMap::from([
                            (
                                "backtrace",
                                serde_json::to_value(&frames_info).unwrap_or_default(),
                            ),
                            ("error", serde_json::to_value(&error).unwrap_or_default()),
                        ])),
                    }
                };

                #[cfg(not(debug_assertions))]
                let response = ErrorResponse {
                    code: "SERVER_ERR".into(),
                    msg: Some("Internal server error".into()),
                };

                response
            }
            AppError::RequestError { msg, status } => ErrorResponse {
                code: status_code_name(status),
                msg: Some(msg),
                #[cfg(debug_assertions)]
                debug_info: None,
            },
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        let status = e.status_code();
        if status.is_server_error() {
            return AppError::server(ServerError::Store(e));
        }

        AppError::RequestError {
            msg: e.to_string(),
            status,
        }
    }
}

impl From<TreeError> for AppError {
    fn from(e: TreeError) -> Self {
        AppError::server(ServerError::Tree(e))
    }
}

impl From<FetchTreeError> for AppError {
    fn from(e: FetchTreeError) -> Self {
        match e {
            FetchTreeError::Store(e) => e.into(),
            FetchTreeError::Tree(e) => e.into(),
        }
    }
}

impl From<(&'static str, StatusCode)> for AppError {
    fn from((msg, status): (&'static str, StatusCode)) -> Self {
        AppError::RequestError {
            msg: msg.into(),
            status,
        }
    }
}

impl From<(String, StatusCode)> for AppError {
    fn from((msg, status): (String, StatusCode)) -> Self {
        AppError::RequestError { msg, status }
    }
}

#[cfg_attr(not(debug_assertions), allow(dead_code))]
#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.to_string_lossy(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let id = Uuid::nil();
        assert_eq!(
            AppError::from(StoreError::NotFound(id)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::ParentNotFound(id)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::AlreadyExists(id)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Database(diesel::result::Error::NotFound)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn tree_errors_are_server_errors() {
        let e = AppError::from(FetchTreeError::Tree(TreeError::RootNotFound));
        assert!(matches!(
            e,
            AppError::ServerError {
                error: ServerError::Tree(TreeError::RootNotFound),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_errors_render_their_status_name() {
        let response =
            AppError::from(("No content provided", StatusCode::BAD_REQUEST)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["msg"], "No content provided");
    }

    #[tokio::test]
    async fn server_errors_hide_behind_a_500() {
        let response = AppError::from(TreeError::RootNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["code"].as_str().is_some_and(|code| code.ends_with("_ERR")));
    }

    #[test]
    fn status_names_are_screaming_snake_case() {
        assert_eq!(status_code_name(StatusCode::NOT_FOUND), "NOT_FOUND");
        assert_eq!(
            status_code_name(StatusCode::UNPROCESSABLE_ENTITY),
            "UNPROCESSABLE_ENTITY"
        );
    }
}
