//! Page template rendering.

use crate::error::{AppError, AppResult};
use chrono::{Datelike, Utc};
use minijinja::{Environment, context, path_loader};
use std::path::Path;

/// Templates loaded from a directory on disk, plus the values every page sees.
pub struct Templates {
    env: Environment<'static>,
    dashboard_url: String,
}

impl Templates {
    pub fn new(template_dir: impl AsRef<Path>, dashboard_url: impl Into<String>) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(template_dir));
        Self {
            env,
            dashboard_url: dashboard_url.into(),
        }
    }

    pub fn dashboard_url(&self) -> &str {
        &self.dashboard_url
    }

    /// Render `name` for the page identified by `page`.
    pub fn render(&self, name: &str, page: &str) -> AppResult<String> {
        let template = self.env.get_template(name).map_err(|e| {
            if e.kind() == minijinja::ErrorKind::TemplateNotFound {
                AppError::template(format!("Template '{}' not found", name))
            } else {
                AppError::from(e)
            }
        })?;

        let html = template.render(context! {
            page => page,
            dashboard_url => &self.dashboard_url,
            year => Utc::now().year(),
        })?;
        Ok(html)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("dashboard_url", &self.dashboard_url)
            .finish_non_exhaustive()
    }
}
