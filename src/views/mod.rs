//! Page rendering
//!
//! Templates are Tera files compiled into the binary. A directory given in
//! `templates.path` may replace any of them by file name, which is enough to
//! restyle the site without rebuilding.
//!
//! Every page gets the same standard variables (see [`PageVars`]) on top of
//! its own context.

mod error;

pub use error::ViewError;

use anyhow::{Context, Result};
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::config::TemplateConfig;
use crate::models::User;

/// Templates shipped with the binary: (name, source)
const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("post.html", include_str!("../../templates/post.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("make-post.html", include_str!("../../templates/make-post.html")),
    ("about.html", include_str!("../../templates/about.html")),
    ("contact.html", include_str!("../../templates/contact.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

/// Tera wrapper holding the compiled templates
pub struct ViewEngine {
    tera: Tera,
}

impl ViewEngine {
    /// Engine with the embedded templates only
    pub fn new() -> Result<Self> {
        Self::build(None)
    }

    /// Engine whose embedded templates are overridden by `.html` files in `dir`
    pub fn with_override_dir(dir: &Path) -> Result<Self> {
        Self::build(Some(dir))
    }

    pub fn from_config(config: &TemplateConfig) -> Result<Self> {
        Self::build(config.path.as_deref())
    }

    fn build(override_dir: Option<&Path>) -> Result<Self> {
        let mut templates: BTreeMap<String, String> = EMBEDDED_TEMPLATES
            .iter()
            .map(|(name, source)| (name.to_string(), source.to_string()))
            .collect();

        if let Some(dir) = override_dir {
            if !dir.is_dir() {
                return Err(ViewError::DirectoryNotFound(dir.display().to_string()).into());
            }
            let mut overrides = BTreeMap::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            tracing::info!("Loaded {} template(s) from {:?}", overrides.len(), dir);
            templates.extend(overrides);
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().map(|(n, s)| (n.as_str(), s.as_str())))
            .map_err(|e| ViewError::TemplateError(error_chain(&e)))?;

        Ok(Self { tera })
    }

    /// Render a template with exactly the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ViewError::TemplateError(format!("Failed to render '{}': {}", template, error_chain(&e)))
                .into()
        })
    }

    /// Render a page with the standard variables added to `context`
    pub fn render_page(
        &self,
        template: &str,
        page: &PageVars,
        mut context: TeraContext,
    ) -> Result<String> {
        page.insert_into(&mut context);
        self.render(template, &context)
    }

    /// Render a page, falling back to `error.html` and then to a bare HTML
    /// page. Never fails.
    pub fn render_page_with_fallback(
        &self,
        template: &str,
        page: &PageVars,
        mut context: TeraContext,
    ) -> String {
        page.insert_into(&mut context);
        match self.render(template, &context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("{:#}, trying error template", e);

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "Internal Server Error");

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {:#}, returning simple HTML error page",
                            error_template_err
                        );
                        simple_error_page("Internal Server Error")
                    }
                }
            }
        }
    }

    /// Names of every loaded template
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

/// Standard variables available to every page
#[derive(Debug, Clone, Serialize)]
pub struct PageVars {
    pub logged_in: bool,
    pub is_admin: bool,
    /// Display name of the logged-in user
    pub current_user: Option<String>,
    /// Messages to show once at the top of the page
    pub flashes: Vec<String>,
    pub year: i32,
}

impl PageVars {
    pub fn new(user: Option<&User>) -> Self {
        Self {
            logged_in: user.is_some(),
            is_admin: user.is_some_and(User::is_admin),
            current_user: user.map(|u| u.name.clone()),
            flashes: Vec::new(),
            year: chrono::Local::now().year(),
        }
    }

    pub fn with_flashes(mut self, flashes: Vec<String>) -> Self {
        self.flashes.extend(flashes);
        self
    }

    pub fn push_flash(&mut self, message: impl Into<String>) {
        self.flashes.push(message.into());
    }

    fn insert_into(&self, context: &mut TeraContext) {
        context.insert("logged_in", &self.logged_in);
        context.insert("is_admin", &self.is_admin);
        context.insert("current_user", &self.current_user);
        context.insert("flashes", &self.flashes);
        context.insert("year", &self.year);
    }
}

/// Recursively collect `.html` files, named by their path relative to `base`
fn collect_templates_from_dir(
    base: &Path,
    current: &Path,
    templates: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(current).map_err(ViewError::from)? {
        let path = entry.map_err(ViewError::from)?.path();

        if path.is_dir() {
            collect_templates_from_dir(base, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative = path
                .strip_prefix(base)
                .map_err(|_| ViewError::TemplateError("Failed to get relative path".to_string()))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.insert(name, source);
        }
    }

    Ok(())
}

/// Flatten a Tera error and its causes into one message
fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  Caused by: {}", cause));
        source = cause.source();
    }
    message
}

/// Last-resort page when even `error.html` cannot be rendered
fn simple_error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{message}</title>
</head>
<body>
    <h1>{message}</h1>
    <p><a href="/">Back to the front page</a></p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests;
