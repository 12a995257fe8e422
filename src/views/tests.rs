//! Tests for the view engine

use super::*;
use crate::models::{
    Comment, CommentWithAuthor, CreateCommentInput, FieldErrors, Post, PostWithAuthor,
};
use tempfile::TempDir;

fn user(id: i64, name: &str) -> User {
    let mut user = User::new(format!("{}@x.com", name), "h".into(), name.into());
    user.id = id;
    user
}

fn sample_post() -> PostWithAuthor {
    PostWithAuthor {
        post: Post {
            id: 3,
            author_id: 1,
            title: "Hello".into(),
            subtitle: "Sub".into(),
            date: "March 07, 2024".into(),
            body: "<p>Body <em>text</em></p>".into(),
            img_url: "http://img".into(),
        },
        author_name: "Alice".into(),
    }
}

#[test]
fn test_embedded_templates_load() {
    let engine = ViewEngine::new().expect("embedded templates should compile");
    let names = engine.template_names();
    for expected in ["about.html", "base.html", "error.html", "index.html", "make-post.html"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_page_vars_for_anonymous_and_users() {
    let anon = PageVars::new(None);
    assert!(!anon.logged_in);
    assert!(!anon.is_admin);
    assert!(anon.current_user.is_none());

    let admin = user(1, "Alice");
    let vars = PageVars::new(Some(&admin));
    assert!(vars.logged_in && vars.is_admin);
    assert_eq!(vars.current_user.as_deref(), Some("Alice"));

    let reader = user(2, "Bob");
    let vars = PageVars::new(Some(&reader));
    assert!(vars.logged_in && !vars.is_admin);
}

#[test]
fn test_index_shows_admin_controls_only_to_admin() {
    let engine = ViewEngine::new().unwrap();
    let mut context = TeraContext::new();
    context.insert("all_posts", &vec![sample_post()]);

    let admin = user(1, "Alice");
    let html = engine
        .render_page("index.html", &PageVars::new(Some(&admin)), context.clone())
        .unwrap();
    assert!(html.contains("Hello"));
    assert!(html.contains("Posted by Alice on March 07, 2024"));
    assert!(html.contains("/delete/3"));
    assert!(html.contains("/new-post"));
    assert!(html.contains("Log Out"));

    let html = engine
        .render_page("index.html", &PageVars::new(None), context)
        .unwrap();
    assert!(!html.contains("/delete/3"));
    assert!(!html.contains("/new-post"));
    assert!(html.contains("/login"));
}

#[test]
fn test_post_body_is_not_escaped_but_comments_are() {
    let engine = ViewEngine::new().unwrap();
    let mut context = TeraContext::new();
    context.insert("post", &sample_post());
    context.insert(
        "comments",
        &vec![CommentWithAuthor {
            comment: Comment {
                id: 1,
                author_id: 2,
                post_id: 3,
                text: "<b>hi</b>".into(),
            },
            author_name: "Bob".into(),
        }],
    );
    context.insert("form", &CreateCommentInput::default());
    context.insert("errors", &FieldErrors::new());

    let html = engine
        .render_page("post.html", &PageVars::new(None), context)
        .unwrap();
    assert!(html.contains("<p>Body <em>text</em></p>"));
    assert!(html.contains("&lt;b&gt;hi&lt;&#x2F;b&gt;"));
    assert!(html.contains("Bob"));
}

#[test]
fn test_flashes_rendered() {
    let engine = ViewEngine::new().unwrap();
    let page = PageVars::new(None).with_flashes(vec!["Invalid password.".into()]);

    let html = engine
        .render_page("about.html", &page, TeraContext::new())
        .unwrap();
    assert!(html.contains("Invalid password."));
}

#[test]
fn test_override_dir_replaces_template() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("about.html"),
        r#"{% extends "base.html" %}{% block content %}custom about{% endblock content %}"#,
    )
    .unwrap();

    let engine = ViewEngine::with_override_dir(dir.path()).unwrap();
    let html = engine
        .render_page("about.html", &PageVars::new(None), TeraContext::new())
        .unwrap();
    assert!(html.contains("custom about"));

    // untouched templates still come from the binary
    let html = engine
        .render_page("contact.html", &PageVars::new(None), TeraContext::new())
        .unwrap();
    assert!(html.contains("Contact Me"));
}

#[test]
fn test_override_dir_must_exist() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(ViewEngine::with_override_dir(&missing).is_err());
}

#[test]
fn test_broken_override_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("about.html"), "{% if %}").unwrap();

    let err = ViewEngine::with_override_dir(dir.path()).err().unwrap();
    assert!(err.to_string().contains("Template error"));
}

#[test]
fn test_fallback_renders_error_page() {
    let engine = ViewEngine::new().unwrap();
    // post.html needs a `post`; without it rendering fails
    let html = engine.render_page_with_fallback("post.html", &PageVars::new(None), TeraContext::new());
    assert!(html.contains("Internal Server Error"));
}

#[test]
fn test_simple_error_page() {
    let html = simple_error_page("Internal Server Error");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<h1>Internal Server Error</h1>"));
}
