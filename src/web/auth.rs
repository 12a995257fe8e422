//! Account pages
//!
//! - GET/POST /register - create an account and log in
//! - GET/POST /login - open a session
//! - GET /logout - close the session

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use tera::Context as TeraContext;

use crate::models::{FieldErrors, LoginInput, RegisterInput, Session};
use crate::services::AuthServiceError;
use crate::views::PageVars;
use crate::web::session::{clear_session_cookie, flash_cookie, session_cookie};
use crate::web::{render, AppState, CurrentUser, Flashes, HtmlForm, WebError};

/// GET /register
pub async fn register_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
) -> Result<Response, WebError> {
    let page = current.page().with_flashes(flashes);
    render_register(&state, &page, &RegisterInput::default(), &FieldErrors::new(), StatusCode::OK)
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    HtmlForm(input): HtmlForm<RegisterInput>,
) -> Result<Response, WebError> {
    match state.auth_service.register(input.clone()).await {
        Ok((_, session)) => Ok(logged_in_redirect(&state, &session)),
        Err(AuthServiceError::Validation(errors)) => {
            let page = current.page().with_flashes(flashes);
            render_register(&state, &page, &input, &errors, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err @ AuthServiceError::EmailTaken) => {
            Ok(flash_redirect("/login", &err.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /login
pub async fn login_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
) -> Result<Response, WebError> {
    let page = current.page().with_flashes(flashes);
    render_login(&state, &page, &LoginInput::default(), &FieldErrors::new(), StatusCode::OK)
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    HtmlForm(input): HtmlForm<LoginInput>,
) -> Result<Response, WebError> {
    let mut page = current.page().with_flashes(flashes);
    match state.auth_service.login(input.clone()).await {
        Ok((_, session)) => Ok(logged_in_redirect(&state, &session)),
        Err(AuthServiceError::Validation(errors)) => {
            render_login(&state, &page, &input, &errors, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err @ (AuthServiceError::UnknownEmail | AuthServiceError::InvalidPassword)) => {
            page.push_flash(err.to_string());
            render_login(&state, &page, &input, &FieldErrors::new(), StatusCode::OK)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, WebError> {
    let token = current.token().ok_or(WebError::Unauthorized)?;
    state.auth_service.logout(token).await?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Redirect::to("/"),
    )
        .into_response())
}

fn render_register(
    state: &AppState,
    page: &PageVars,
    form: &RegisterInput,
    errors: &FieldErrors,
    status: StatusCode,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok((status, render(state, "register.html", page, context)?).into_response())
}

fn render_login(
    state: &AppState,
    page: &PageVars,
    form: &LoginInput,
    errors: &FieldErrors,
    status: StatusCode,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok((status, render(state, "login.html", page, context)?).into_response())
}

/// Set the signed session cookie and go to the front page
fn logged_in_redirect(state: &AppState, session: &Session) -> Response {
    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    let cookie = session_cookie(&state.signer.sign(&session.id), max_age);
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    )
        .into_response()
}

/// Redirect with a message to show on the next page
pub(crate) fn flash_redirect(to: &str, message: &str) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, flash_cookie(&[message]))]),
        Redirect::to(to),
    )
        .into_response()
}
