//! Shared helpers: a stub lesson backend on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use afrikunle_app::AppConfig;
use axum::extract::{Path as UrlPath, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

#[derive(Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

#[derive(Deserialize)]
struct RunBody {
    code: String,
}

fn lessons() -> Value {
    json!([
        {
            "id": 1,
            "title": { "en": "Variables", "fr": "Les variables" },
            "body": {
                "en": "A variable names a value. It can change. Try it.",
                "fr": "Une variable nomme une valeur. Elle peut changer. Essayez."
            },
            "level": "Beginner",
            "quiz": { "question": { "en": "Name a variable", "fr": "Nommez une variable" }, "answer": "x = 1" }
        },
        {
            "id": 2,
            "title": { "en": "Recursion" },
            "body": { "en": "A function that calls itself." },
            "level": "Advanced"
        },
        {
            "id": "hello",
            "title": "Hello, world",
            "body": "print('hello')"
        }
    ])
}

async fn lesson_by_id(UrlPath(id): UrlPath<String>, Query(_q): Query<LangQuery>) -> Response {
    let found = lessons()
        .as_array()
        .and_then(|all| {
            all.iter()
                .find(|l| match &l["id"] {
                    Value::Number(n) => n.to_string() == id,
                    Value::String(s) => *s == id,
                    _ => false,
                })
                .cloned()
        });
    match found {
        Some(lesson) => Json(lesson).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn run_code(Json(body): Json<RunBody>) -> Response {
    if body.code.contains("import os") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Blocked: import os is not allowed" })),
        )
            .into_response();
    }
    if body.code.trim().is_empty() {
        return Json(json!({})).into_response();
    }
    Json(json!({ "output": format!("ran {} chars", body.code.len()) })).into_response()
}

/// The stub backend. Dropping it stops serving.
pub struct Backend {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl Backend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves `/api/lessons/{id}`, `/api/lessons`, `/api/run` and `/health`.
/// The singular `/api/lesson/...` routes are absent, so the client has to
/// probe past them.
pub async fn spawn_backend() -> Backend {
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/lessons", get(|| async { Json(lessons()) }))
        .route("/api/lessons/{id}", get(lesson_by_id))
        .route("/api/run", post(run_code));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Backend { addr, task }
}

/// A base URL nobody listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Configuration pointing at `api_url` with the cache in `cache_dir`.
pub fn config(api_url: &str, cache_dir: &Path) -> AppConfig {
    AppConfig {
        api_url: api_url.to_owned(),
        request_timeout_ms: 2000,
        cache_path: cache_dir.join("cache.json"),
        ..AppConfig::default()
    }
}
