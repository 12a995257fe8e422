//! Shared helpers for the HTTP integration tests.
//!
//! Builds the full router over an in-memory SQLite database and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tower::ServiceExt;

use tinyblog::db::migrations::run_migrations;
use tinyblog::db::repositories::{
    CommentRepository, PostRepository, SqlxCommentRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository, UserRepository,
};
use tinyblog::db::create_test_pool;
use tinyblog::services::{AuthService, CommentService, PostService};
use tinyblog::views::ViewEngine;
use tinyblog::web::{build_router, AppState, CookieSigner};

/// The application plus direct repository access for assertions
pub struct TestApp {
    pub router: Router,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

pub async fn spawn_app() -> TestApp {
    let pool = create_test_pool().await.expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");

    let users = SqlxUserRepository::boxed(pool.clone());
    let posts = SqlxPostRepository::boxed(pool.clone());
    let comments = SqlxCommentRepository::boxed(pool.clone());
    let sessions = SqlxSessionRepository::boxed(pool.clone());

    let state = AppState {
        auth_service: Arc::new(AuthService::new(users.clone(), sessions)),
        post_service: Arc::new(PostService::new(posts.clone())),
        comment_service: Arc::new(CommentService::new(comments.clone(), posts.clone())),
        views: Arc::new(ViewEngine::new().expect("templates")),
        signer: Arc::new(CookieSigner::new(b"integration-test-secret").expect("signer")),
    };

    TestApp {
        router: build_router(state),
        users,
        posts,
        comments,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(encode_form(fields))).unwrap())
            .await
    }

    /// POST a raw body with the given content type
    pub async fn post_raw(
        &self,
        uri: &str,
        content_type: &str,
        body: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register an account and return its session cookie (`session=...`)
    pub async fn register(&self, email: &str, password: &str, name: &str) -> String {
        let response = self
            .post_form(
                "/register",
                &[("email", email), ("password", password), ("name", name)],
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        set_cookie(&response, "session").expect("session cookie after register")
    }

    /// Create a post as the admin and return its id
    pub async fn create_post(&self, admin_cookie: &str, title: &str) -> i64 {
        let response = self
            .post_form(
                "/new-post",
                &[
                    ("title", title),
                    ("subtitle", "Sub"),
                    ("img_url", "http://img"),
                    ("body", "Body"),
                ],
                Some(admin_cookie),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        self.posts
            .list_with_authors()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.post.title == title)
            .map(|p| p.post.id)
            .expect("created post")
    }
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `name=value` of a cookie set by the response, if any
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.split_once('=').is_some_and(|(k, _)| k == name))
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn is_html(response: &Response<Body>) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
