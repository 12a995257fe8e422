//! Read-only pages: index, about, contact and the 404 fallback

use axum::{extract::State, response::Html};
use tera::Context as TeraContext;

use crate::web::{render, AppState, CurrentUser, Flashes, WebError};

/// GET / - all posts
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
) -> Result<Html<String>, WebError> {
    let posts = state.post_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("all_posts", &posts);
    render(&state, "index.html", &current.page().with_flashes(flashes), context)
}

/// GET /about
pub async fn about(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
) -> Result<Html<String>, WebError> {
    render(
        &state,
        "about.html",
        &current.page().with_flashes(flashes),
        TeraContext::new(),
    )
}

/// GET /contact
pub async fn contact(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
) -> Result<Html<String>, WebError> {
    render(
        &state,
        "contact.html",
        &current.page().with_flashes(flashes),
        TeraContext::new(),
    )
}

pub async fn not_found() -> WebError {
    WebError::NotFound
}
