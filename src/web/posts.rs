//! Post pages
//!
//! - GET/POST /post/{id} - read a post, leave a comment
//! - GET/POST /new-post - admin only
//! - GET/POST /edit-post/{id} - admin only
//! - GET /delete/{id} - admin only

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tera::Context as TeraContext;

use crate::models::{CreateCommentInput, FieldErrors, PostInput, PostWithAuthor};
use crate::services::{CommentServiceError, PostServiceError};
use crate::views::PageVars;
use crate::web::auth::flash_redirect;
use crate::web::{
    render, AdminUser, AppState, CurrentUser, Flashes, HtmlForm, PostId, WebError,
};

const LOGIN_TO_COMMENT: &str = "You need to login or register to comment.";

/// GET /post/{id}
pub async fn show_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    PostId(id): PostId,
) -> Result<Response, WebError> {
    let post = state.post_service.get(id).await?;
    let page = current.page().with_flashes(flashes);
    render_post_page(
        &state,
        &page,
        &post,
        &CreateCommentInput::default(),
        &FieldErrors::new(),
        StatusCode::OK,
    )
    .await
}

/// POST /post/{id} - add a comment and show the page again
pub async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    PostId(id): PostId,
    HtmlForm(input): HtmlForm<CreateCommentInput>,
) -> Result<Response, WebError> {
    let post = state.post_service.get(id).await?;

    let Some(author) = current.user() else {
        return Ok(flash_redirect("/login", LOGIN_TO_COMMENT));
    };

    let page = current.page().with_flashes(flashes);
    match state.comment_service.create(author.id, id, input.clone()).await {
        Ok(_) => {
            render_post_page(
                &state,
                &page,
                &post,
                &CreateCommentInput::default(),
                &FieldErrors::new(),
                StatusCode::OK,
            )
            .await
        }
        Err(CommentServiceError::Validation(errors)) => {
            render_post_page(
                &state,
                &page,
                &post,
                &input,
                &errors,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /new-post
pub async fn new_post_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    AdminUser(_): AdminUser,
) -> Result<Response, WebError> {
    let page = current.page().with_flashes(flashes);
    render_post_form(
        &state,
        &page,
        PostForm::New,
        &PostInput::default(),
        &FieldErrors::new(),
        StatusCode::OK,
    )
}

/// POST /new-post
pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    AdminUser(admin): AdminUser,
    HtmlForm(input): HtmlForm<PostInput>,
) -> Result<Response, WebError> {
    match state.post_service.create(admin.id, input.clone()).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(err) => {
            let page = current.page().with_flashes(flashes);
            form_error_response(&state, &page, PostForm::New, &input, err)
        }
    }
}

/// GET /edit-post/{id}
pub async fn edit_post_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    AdminUser(_): AdminUser,
    PostId(id): PostId,
) -> Result<Response, WebError> {
    let post = state.post_service.get(id).await?;
    let page = current.page().with_flashes(flashes);
    render_post_form(
        &state,
        &page,
        PostForm::Edit {
            id,
            author_name: &post.author_name,
        },
        &PostInput::from_post(&post.post),
        &FieldErrors::new(),
        StatusCode::OK,
    )
}

/// POST /edit-post/{id}
pub async fn update_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(flashes): Flashes,
    AdminUser(_): AdminUser,
    PostId(id): PostId,
    HtmlForm(input): HtmlForm<PostInput>,
) -> Result<Response, WebError> {
    let post = state.post_service.get(id).await?;

    match state.post_service.update(id, input.clone()).await {
        Ok(_) => Ok(Redirect::to(&format!("/post/{}", id)).into_response()),
        Err(err) => {
            let page = current.page().with_flashes(flashes);
            let form = PostForm::Edit {
                id,
                author_name: &post.author_name,
            };
            form_error_response(&state, &page, form, &input, err)
        }
    }
}

/// GET /delete/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    PostId(id): PostId,
) -> Result<Response, WebError> {
    state.post_service.delete(id).await?;
    Ok(Redirect::to("/").into_response())
}

async fn render_post_page(
    state: &AppState,
    page: &PageVars,
    post: &PostWithAuthor,
    form: &CreateCommentInput,
    errors: &FieldErrors,
    status: StatusCode,
) -> Result<Response, WebError> {
    let comments = state.comment_service.list_for_post(post.post.id).await?;

    let mut context = TeraContext::new();
    context.insert("post", post);
    context.insert("comments", &comments);
    context.insert("form", form);
    context.insert("errors", errors);
    Ok((status, render(state, "post.html", page, context)?).into_response())
}

/// Which post form is being shown
#[derive(Debug, Clone, Copy)]
enum PostForm<'a> {
    New,
    Edit { id: i64, author_name: &'a str },
}

fn render_post_form(
    state: &AppState,
    page: &PageVars,
    which: PostForm<'_>,
    form: &PostInput,
    errors: &FieldErrors,
    status: StatusCode,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    match which {
        PostForm::New => {
            context.insert("is_edit", &false);
            context.insert("action", "/new-post");
        }
        PostForm::Edit { id, author_name } => {
            context.insert("is_edit", &true);
            context.insert("action", &format!("/edit-post/{}", id));
            context.insert("author_name", author_name);
        }
    }
    context.insert("form", form);
    context.insert("errors", errors);
    Ok((status, render(state, "make-post.html", page, context)?).into_response())
}

/// Re-render the post form for validation and duplicate-title errors
fn form_error_response(
    state: &AppState,
    page: &PageVars,
    which: PostForm<'_>,
    input: &PostInput,
    err: PostServiceError,
) -> Result<Response, WebError> {
    let status = match err {
        PostServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PostServiceError::DuplicateTitle => StatusCode::CONFLICT,
        other => return Err(other.into()),
    };
    let errors = err.field_errors().unwrap_or_default();
    render_post_form(state, page, which, input, &errors, status)
}
