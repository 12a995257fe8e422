//! Post model

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::FieldErrors;

const MAX_TITLE_LEN: usize = 250;
const MAX_IMG_URL_LEN: usize = 250;

/// Blog post.
///
/// `date` is stored already formatted for display ("Month DD, YYYY") and is
/// fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    /// Title (unique)
    pub title: String,
    pub subtitle: String,
    pub date: String,
    /// Rich-text HTML body
    pub body: String,
    pub img_url: String,
}

/// Post joined with its author's display name
#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
}

/// Create/edit form input. Author and date are never taken from the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub body: String,
}

impl PostInput {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        img_url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            img_url: img_url.into(),
            body: body.into(),
        }
    }

    /// Pre-fill values for editing an existing post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            img_url: post.img_url.clone(),
            body: post.body.clone(),
        }
    }

    /// Trim surrounding whitespace from the single-line fields
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.subtitle = self.subtitle.trim().to_string();
        self.img_url = self.img_url.trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        required_short(&self.title, "title", "Title", &mut errors);
        required_short(&self.subtitle, "subtitle", "Subtitle", &mut errors);

        let img_url = self.img_url.trim();
        if img_url.is_empty() {
            errors.insert("img_url", "Image URL is required.".to_string());
        } else if img_url.chars().count() > MAX_IMG_URL_LEN {
            errors.insert("img_url", "Image URL is too long.".to_string());
        } else if !is_http_url(img_url) {
            errors.insert("img_url", "Invalid URL.".to_string());
        }

        if self.body.trim().is_empty() {
            errors.insert("body", "Content is required.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn required_short(value: &str, field: &'static str, label: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors.insert(field, format!("{} is required.", label));
    } else if value.chars().count() > MAX_TITLE_LEN {
        errors.insert(
            field,
            format!("{} must be at most {} characters.", label, MAX_TITLE_LEN),
        );
    }
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !rest.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Display format used for the post date, e.g. "March 07, 2024"
pub fn format_post_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Today's date in post display format (server local time)
pub fn today_post_date() -> String {
    format_post_date(Local::now().date_naive())
}
