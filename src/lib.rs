//! Tinyblog - a small multi-user blog
//!
//! Server-rendered pages over axum, with accounts, posts and comments stored
//! in SQLite (or MySQL). Only the first registered account may write posts.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;
pub mod web;
