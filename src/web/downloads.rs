//! CSV exports of dataset records.

use super::AppState;
use super::files::{attachment_disposition, content_type_for};
use super::filters::parse_filters;
use crate::error::{AppError, AppResult};
use crate::format::{UTF8_BOM, format_as_csv};
use crate::models::QueryResult;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const ALL_DATA_FILE: &str = "Perovskite_database_content_all_data.csv";
pub const BY_DOI_FILE: &str = "Perovskite_database_content_by_DOI.csv";
pub const BY_ID_FILE: &str = "Perovskite_database_content_by_ID.csv";
pub const SELECTED_FILE: &str = "Perovsite database query.csv";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/all", get(all_records))
        .route("/doi", get(records_by_doi))
        .route("/ids", get(records_by_ids).post(records_by_posted_ids))
        .route("/selected", get(selected_records))
}

#[derive(Debug, Default, Deserialize)]
pub struct DatasetQuery {
    pub dataset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DoiQuery {
    pub dataset: Option<String>,
    #[serde(default)]
    pub doi: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdsQuery {
    pub dataset: Option<String>,
    /// Comma-separated record ids
    #[serde(default)]
    pub ids: String,
}

/// Wrap a result as a UTF-8 CSV attachment with a leading BOM.
fn csv_attachment(file_name: &str, result: &QueryResult) -> Response {
    let mut body = String::from(UTF8_BOM);
    body.push_str(&format_as_csv(result));

    info!(
        file = %file_name,
        rows = result.row_count,
        size = %humansize::format_size(body.len(), humansize::WINDOWS),
        "Serving CSV export"
    );

    (
        [
            (header::CONTENT_TYPE, content_type_for(file_name).to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(file_name)),
        ],
        body,
    )
        .into_response()
}

pub async fn all_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatasetQuery>,
) -> AppResult<Response> {
    let store = state.store()?;
    let dataset = state.datasets.get(query.dataset.as_deref())?;
    let result = store.all_records(dataset).await?;
    if result.is_empty() {
        return Err(AppError::no_records(format!(
            "No records found in dataset '{}'",
            dataset.name
        )));
    }
    Ok(csv_attachment(ALL_DATA_FILE, &result))
}

/// Every column of the rows matching the query-string filters.
pub async fn selected_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatasetQuery>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Response> {
    let store = state.store()?;
    let dataset = state.datasets.get(query.dataset.as_deref())?;
    let filters = parse_filters(&pairs)?;
    let filter_count = filters.len();
    let result = store.selected_records(dataset, filters).await?;
    if result.is_empty() {
        return Err(AppError::no_records(format!(
            "No records in dataset '{}' match the {} selected filter(s)",
            dataset.name, filter_count
        )));
    }
    Ok(csv_attachment(SELECTED_FILE, &result))
}

pub async fn records_by_doi(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoiQuery>,
) -> AppResult<Response> {
    let store = state.store()?;
    let dataset = state.datasets.get(query.dataset.as_deref())?;
    let (doi, result) = store.records_by_doi(dataset, &query.doi).await?;
    if result.is_empty() {
        return Err(AppError::no_records(format!(
            "No records found with the DOI number {}",
            doi
        )));
    }
    Ok(csv_attachment(BY_DOI_FILE, &result))
}

pub async fn records_by_ids(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdsQuery>,
) -> AppResult<Response> {
    export_ids(&state, query.dataset.as_deref(), &query.ids).await
}

/// Same export with the id list sent as the request body.
pub async fn records_by_posted_ids(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatasetQuery>,
    body: String,
) -> AppResult<Response> {
    export_ids(&state, query.dataset.as_deref(), &body).await
}

async fn export_ids(state: &AppState, dataset: Option<&str>, ids: &str) -> AppResult<Response> {
    let store = state.store()?;
    let dataset = state.datasets.get(dataset)?;
    let (ids, result) = store.records_by_ids(dataset, ids).await?;
    if result.is_empty() {
        let listed = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::no_records(format!(
            "No records found with the {} numbers {}",
            dataset.primary_key, listed
        )));
    }
    Ok(csv_attachment(BY_ID_FILE, &result))
}
