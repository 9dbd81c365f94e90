//! Informational pages rendered from templates.

use super::AppState;
use crate::error::AppResult;
use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use std::sync::Arc;

/// Route path and page name; each page renders `<name>.html`.
pub const PAGES: [(&str, &str); 12] = [
    ("/", "home"),
    ("/home", "home"),
    ("/Interactive_graphics", "Interactive_graphics"),
    ("/Resources", "Resources"),
    ("/Download", "Download"),
    ("/Upload", "Upload"),
    ("/Contributors", "Contributors"),
    ("/Funding", "Funding"),
    ("/How_to_cite", "How_to_cite"),
    ("/Contact", "Contact"),
    ("/Papers", "Papers"),
    ("/Presentations", "Presentations"),
];

pub fn router() -> Router<Arc<AppState>> {
    PAGES
        .into_iter()
        .fold(Router::new(), |router, (path, page)| {
            router.route(
                path,
                get(move |State(state): State<Arc<AppState>>| async move {
                    render_page(&state, page)
                }),
            )
        })
}

fn render_page(state: &AppState, page: &str) -> AppResult<Html<String>> {
    let html = state.templates.render(&format!("{}.html", page), page)?;
    Ok(Html(html))
}
