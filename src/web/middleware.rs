//! Request middleware and shared handler types
//!
//! - `resolve_current_user`: turns the session cookie into a [`CurrentUser`]
//!   for every request and consumes displayed flash messages
//! - `require_login` / `require_admin`: route layers for the gated routes
//! - `render_error_pages`: renders [`WebError`] responses through the
//!   `error.html` template

use axum::{
    body::Body,
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::models::User;
use crate::services::{
    AuthService, AuthServiceError, CommentService, CommentServiceError, PostService,
    PostServiceError,
};
use crate::views::{PageVars, ViewEngine};
use crate::web::session::{
    clear_flash_cookie, cookie_value, read_flashes, sets_cookie, CookieSigner, FLASH_COOKIE,
    SESSION_COOKIE,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub views: Arc<ViewEngine>,
    pub signer: Arc<CookieSigner>,
}

/// Who is making the request
#[derive(Debug, Clone, Default)]
pub enum CurrentUser {
    #[default]
    Anonymous,
    Authenticated {
        user: User,
        /// Session token, needed to log out
        token: String,
    },
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user, .. } => Some(user),
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { token, .. } => Some(token),
        }
    }

    /// Standard template variables for this requester
    pub fn page(&self) -> PageVars {
        PageVars::new(self.user())
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

/// Flash messages that arrived with the request
#[derive(Debug, Clone, Default)]
pub struct Flashes(pub Vec<String>);

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Flashes>().cloned().unwrap_or_default())
    }
}

/// Outcome of the admin check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Forbidden,
}

/// Only the account with id 1 may write posts. Anonymous requests are
/// forbidden as well.
pub fn authorize_admin(current: &CurrentUser) -> Authorization {
    match current.user() {
        Some(user) if user.is_admin() => Authorization::Granted,
        _ => Authorization::Forbidden,
    }
}

/// The admin user, for handlers behind the admin gate
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        match (authorize_admin(&current), current) {
            (Authorization::Granted, CurrentUser::Authenticated { user, .. }) => Ok(AdminUser(user)),
            _ => Err(WebError::Forbidden),
        }
    }
}

/// Numeric id from the `{id}` path segment. Anything that is not an
/// integer is a missing page.
#[derive(Debug, Clone, Copy)]
pub struct PostId(pub i64);

impl<S> FromRequestParts<S> for PostId
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| PostId(id))
            .map_err(|rejection| {
                tracing::debug!("Rejected post id: {}", rejection.body_text());
                WebError::NotFound
            })
    }
}

/// URL-encoded form body whose rejection is rendered as an error page
#[derive(Debug, Clone)]
pub struct HtmlForm<T>(pub T);

impl<T, S> FromRequest<S> for HtmlForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Form::<T>::from_request(request, state)
            .await
            .map(|Form(value)| HtmlForm(value))
            .map_err(|rejection| {
                tracing::debug!("Rejected form body: {}", rejection.body_text());
                WebError::BadRequest
            })
    }
}

/// Error page to render, attached to error responses
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub message: String,
}

/// Error returned by handlers; rendered as an HTML error page
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Bad Request")]
    BadRequest,

    #[error("Please log in to access this page.")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("Internal Server Error")]
    Internal(#[source] anyhow::Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<PostServiceError> for WebError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound(_) => Self::NotFound,
            PostServiceError::Internal(e) => Self::Internal(e),
            other => Self::Internal(anyhow::anyhow!("Unhandled post error: {}", other)),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::PostNotFound(_) => Self::NotFound,
            CommentServiceError::Internal(e) => Self::Internal(e),
            other => Self::Internal(anyhow::anyhow!("Unhandled comment error: {}", other)),
        }
    }
}

impl From<AuthServiceError> for WebError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Internal(e) => Self::Internal(e),
            other => Self::Internal(anyhow::anyhow!("Unhandled auth error: {}", other)),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref e) = self {
            tracing::error!("Request failed: {:#}", e);
        }

        let status = self.status();
        let message = self.to_string();
        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorPage { message });
        response
    }
}

/// Resolve the session cookie and collect incoming flash messages.
///
/// Flash messages are cleared once a page has been rendered with them. A
/// redirect, or a response setting new ones, leaves the cookie to the next
/// page.
pub async fn resolve_current_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = cookie_value(request.headers(), SESSION_COOKIE)
        .and_then(|signed| state.signer.verify(signed));

    let current = match token {
        Some(token) => match state.auth_service.resolve_session(&token).await {
            Ok(Some(user)) => CurrentUser::Authenticated { user, token },
            Ok(None) => CurrentUser::Anonymous,
            Err(e) => {
                tracing::error!("Session lookup failed: {:#}", e);
                CurrentUser::Anonymous
            }
        },
        None => CurrentUser::Anonymous,
    };

    let flashes = read_flashes(request.headers());
    let had_flashes = !flashes.is_empty();
    request.extensions_mut().insert(current);
    request.extensions_mut().insert(Flashes(flashes));

    let mut response = next.run(request).await;

    if had_flashes
        && !response.status().is_redirection()
        && !sets_cookie(&response, FLASH_COOKIE)
    {
        if let Ok(value) = HeaderValue::from_str(&clear_flash_cookie()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

/// Reject anonymous requests with 401
pub async fn require_login(request: Request, next: Next) -> Result<Response, WebError> {
    match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser::Authenticated { .. }) => Ok(next.run(request).await),
        _ => Err(WebError::Unauthorized),
    }
}

/// Reject everyone but the admin with 403
pub async fn require_admin(request: Request, next: Next) -> Result<Response, WebError> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .unwrap_or_default();

    match authorize_admin(&current) {
        Authorization::Granted => Ok(next.run(request).await),
        Authorization::Forbidden => {
            tracing::warn!(
                user_id = current.user().map(|u| u.id),
                path = %request.uri().path(),
                "Forbidden admin request"
            );
            Err(WebError::Forbidden)
        }
    }
}

/// Replace the body of error responses with the rendered error page
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .unwrap_or_default();
    let Flashes(flashes) = request
        .extensions()
        .get::<Flashes>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    let mut context = TeraContext::new();
    context.insert("status", &parts.status.as_u16());
    context.insert("error_message", &page.message);
    let html = state
        .views
        .render_page_with_fallback("error.html", &current.page().with_flashes(flashes), context);

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}
