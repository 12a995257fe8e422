//! Web layer - HTML handlers and routing
//!
//! Server-rendered pages for the blog:
//! - Public pages: index, post detail, about, contact
//! - Account pages: register, login, logout
//! - Admin pages: new post, edit post, delete post

pub mod auth;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod session;

use axum::{
    middleware as axum_middleware,
    response::Html,
    routing::get,
    Router,
};
use tera::Context as TeraContext;
use tower_http::trace::TraceLayer;

use crate::views::PageVars;

pub use middleware::{
    authorize_admin, AdminUser, AppState, Authorization, CurrentUser, Flashes, HtmlForm, PostId,
    WebError,
};
pub use session::CookieSigner;

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Admin routes (user id 1 only)
    let admin_routes = Router::new()
        .route("/new-post", get(posts::new_post_form).post(posts::create_post))
        .route(
            "/edit-post/{id}",
            get(posts::edit_post_form).post(posts::update_post),
        )
        .route("/delete/{id}", get(posts::delete_post))
        .route_layer(axum_middleware::from_fn(middleware::require_admin));

    // Protected routes (any logged-in user)
    let protected_routes = Router::new()
        .route("/logout", get(auth::logout))
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    Router::new()
        .route("/", get(pages::index))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/post/{id}", get(posts::show_post).post(posts::add_comment))
        .merge(admin_routes)
        .merge(protected_routes)
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        // Runs first so every layer and handler below sees the current user
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_current_user,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render a page template with the standard variables
pub(crate) fn render(
    state: &AppState,
    template: &str,
    page: &PageVars,
    context: TeraContext,
) -> Result<Html<String>, WebError> {
    Ok(Html(state.views.render_page(template, page, context)?))
}
