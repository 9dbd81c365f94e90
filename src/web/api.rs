//! JSON data API.
//!
//! Every route takes an optional `?dataset=` naming a registered dataset. Data
//! routes also take the record filters described in [`super::filters`].

use super::AppState;
use super::filters::parse_filters;
use crate::error::{AppError, AppResult};
use crate::models::{DEFAULT_ROW_LIMIT, DatasetDescriptor, QueryResult, RecordFilter, SelectRequest};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/datasets", get(list_datasets))
        .route("/records", get(records))
        .route("/categories/{column}", get(categories))
}

/// Split a comma-separated query value, dropping blanks.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct DatasetsResponse {
    pub datasets: Vec<DatasetDescriptor>,
}

pub async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<DatasetsResponse> {
    Json(DatasetsResponse {
        datasets: state.datasets.all().cloned().collect(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub dataset: Option<String>,
    /// Comma-separated column names
    pub columns: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub unbounded: bool,
}

impl RecordsQuery {
    fn into_request(self, filters: Vec<RecordFilter>) -> AppResult<SelectRequest> {
        let columns = self.columns.as_deref().map(split_list).unwrap_or_default();
        let limit = if self.unbounded {
            None
        } else {
            Some(self.limit.unwrap_or(DEFAULT_ROW_LIMIT))
        };
        if limit == Some(0) {
            return Err(AppError::invalid_input(
                "limit must be at least 1; use unbounded=true to read every row",
            ));
        }

        Ok(SelectRequest::columns(columns)
            .with_limit(limit)
            .with_filters(filters))
    }
}

pub async fn records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<QueryResult>> {
    let store = state.store()?;
    let dataset = state.datasets.get(query.dataset.as_deref())?;
    let request = query.into_request(parse_filters(&pairs)?)?;
    Ok(Json(store.read(dataset, &request).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    pub dataset: Option<String>,
    /// Keep only the most frequent values
    pub top: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub column: String,
    pub categories: Vec<JsonValue>,
}

pub async fn categories(
    State(state): State<Arc<AppState>>,
    Path(column): Path<String>,
    Query(query): Query<CategoriesQuery>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<CategoriesResponse>> {
    let store = state.store()?;
    let dataset = state.datasets.get(query.dataset.as_deref())?;
    let filters = parse_filters(&pairs)?;

    let categories = match query.top {
        Some(n) => store
            .most_common_categories(dataset, &column, n, &filters)
            .await?
            .into_iter()
            .map(JsonValue::String)
            .collect(),
        None => {
            store
                .unique_categories(dataset, &column, &filters)
                .await?
        }
    };

    Ok(Json(CategoriesResponse { column, categories }))
}
