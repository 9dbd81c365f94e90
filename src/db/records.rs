//! Dataset reads used by the website and the download routes.
//!
//! `RecordStore` owns the shared pool and resolves dataset names through the
//! registry, so callers only deal in dataset names and column lists.

use crate::db::executor::QueryExecutor;
use crate::db::pool::DbPool;
use crate::db::statement;
use crate::error::{AppError, AppResult};
use crate::format::format_value;
use crate::models::{DatasetDescriptor, DatasetRegistry, QueryResult, RecordFilter, SelectRequest};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;

/// URL prefixes stripped from user-supplied DOIs.
const DOI_PREFIXES: [&str; 3] = ["https://doi.org/", "http://doi.org/", "doi.org/"];

/// Normalize a DOI as typed by a user: trim, then drop any resolver prefix.
pub fn normalize_doi(input: &str) -> String {
    let mut doi = input.trim().to_string();
    for prefix in DOI_PREFIXES {
        doi = doi.replace(prefix, "");
    }
    doi
}

/// Parse a comma-separated list of record ids. Entries that are not integers are skipped.
pub fn parse_id_list(input: &str) -> Vec<i64> {
    input
        .replace(char::is_whitespace, "")
        .split(',')
        .filter_map(|item| item.parse::<i64>().ok())
        .collect()
}

/// Order JSON scalars: NULL last, numbers numerically, everything else by text.
fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Greater,
        (_, JsonValue::Null) => Ordering::Less,
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => format_value(a).cmp(&format_value(b)),
    }
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: DbPool,
    executor: QueryExecutor,
    datasets: DatasetRegistry,
}

impl RecordStore {
    pub fn new(pool: DbPool, executor: QueryExecutor, datasets: DatasetRegistry) -> Self {
        Self {
            pool,
            executor,
            datasets,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn datasets(&self) -> &DatasetRegistry {
        &self.datasets
    }

    pub fn dataset(&self, name: Option<&str>) -> AppResult<&DatasetDescriptor> {
        self.datasets.get(name)
    }

    /// Read from a dataset. An empty column list falls back to the dataset's defaults.
    pub async fn read(
        &self,
        dataset: &DatasetDescriptor,
        request: &SelectRequest,
    ) -> AppResult<QueryResult> {
        let columns = if request.columns.is_empty() {
            &dataset.default_columns
        } else {
            &request.columns
        };
        let stmt = statement::select(
            &dataset.schema,
            &dataset.table,
            columns,
            &request.filters,
            request.limit,
            self.pool.db_type(),
        )?;
        self.executor
            .fetch(&self.pool, &stmt.sql, &stmt.params, columns, request.limit)
            .await
    }

    /// Every column of every row.
    pub async fn all_records(&self, dataset: &DatasetDescriptor) -> AppResult<QueryResult> {
        self.read(dataset, &SelectRequest::everything()).await
    }

    /// Every column of the rows matching all `filters`.
    pub async fn selected_records(
        &self,
        dataset: &DatasetDescriptor,
        filters: Vec<RecordFilter>,
    ) -> AppResult<QueryResult> {
        let request = SelectRequest::everything().with_filters(filters);
        self.read(dataset, &request).await
    }

    /// All rows published under a DOI. Returns the normalized DOI with the rows.
    pub async fn records_by_doi(
        &self,
        dataset: &DatasetDescriptor,
        input: &str,
    ) -> AppResult<(String, QueryResult)> {
        let doi_column = dataset.doi_column.as_ref().ok_or_else(|| {
            AppError::invalid_input(format!("Dataset '{}' has no DOI column", dataset.name))
        })?;
        let doi = normalize_doi(input);
        if doi.is_empty() {
            return Err(AppError::invalid_input("A DOI number is required"));
        }

        let request = SelectRequest::everything()
            .with_filter(RecordFilter::Equals(doi_column.clone(), doi.clone()));
        let result = self.read(dataset, &request).await?;
        Ok((doi, result))
    }

    /// All rows whose primary key is in a comma-separated id list.
    pub async fn records_by_ids(
        &self,
        dataset: &DatasetDescriptor,
        input: &str,
    ) -> AppResult<(Vec<i64>, QueryResult)> {
        let ids = parse_id_list(input);
        if ids.is_empty() {
            return Err(AppError::invalid_input(format!(
                "No valid {} numbers found. Give ids as a comma separated list",
                dataset.primary_key
            )));
        }

        let request = SelectRequest::everything().with_filter(RecordFilter::InIntegers(
            dataset.primary_key.clone(),
            ids.clone(),
        ));
        let result = self.read(dataset, &request).await?;
        Ok((ids, result))
    }

    /// `(value, count)` for every distinct value of a column.
    async fn counted_values(
        &self,
        dataset: &DatasetDescriptor,
        column: &str,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<(JsonValue, i64)>> {
        let stmt = statement::value_counts(
            &dataset.schema,
            &dataset.table,
            column,
            filters,
            self.pool.db_type(),
        )?;
        let result = self
            .executor
            .fetch(&self.pool, &stmt.sql, &stmt.params, &[], None)
            .await?;

        let alias = statement::count_alias(column);
        Ok(result
            .rows
            .into_iter()
            .map(|mut row| {
                let count = row.get(alias).and_then(JsonValue::as_i64).unwrap_or(0);
                let value = row.remove(column).unwrap_or(JsonValue::Null);
                (value, count)
            })
            .collect())
    }

    /// The `n` most frequent values of a column, rendered as text and sorted alphabetically.
    pub async fn most_common_categories(
        &self,
        dataset: &DatasetDescriptor,
        column: &str,
        n: usize,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<String>> {
        let mut counts = self.counted_values(dataset, column, filters).await?;
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| compare_values(&a.0, &b.0)));

        let mut categories: Vec<String> = counts
            .into_iter()
            .take(n)
            .map(|(value, _)| match value {
                JsonValue::Null => "None".to_string(),
                other => format_value(&other),
            })
            .collect();
        categories.sort();
        Ok(categories)
    }

    /// Every distinct value of a column, sorted.
    pub async fn unique_categories(
        &self,
        dataset: &DatasetDescriptor,
        column: &str,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<JsonValue>> {
        let stmt = statement::distinct_values(
            &dataset.schema,
            &dataset.table,
            column,
            filters,
            self.pool.db_type(),
        )?;
        let result = self
            .executor
            .fetch(&self.pool, &stmt.sql, &stmt.params, &[], None)
            .await?;

        let mut values: Vec<JsonValue> = result
            .rows
            .into_iter()
            .map(|mut row| row.remove(column).unwrap_or(JsonValue::Null))
            .collect();
        values.sort_by(compare_values);
        Ok(values)
    }

    /// Row counts per value of a column, keyed by display text.
    pub async fn value_counts(
        &self,
        dataset: &DatasetDescriptor,
        column: &str,
    ) -> AppResult<HashMap<String, i64>> {
        Ok(self
            .counted_values(dataset, column, &[])
            .await?
            .into_iter()
            .map(|(value, count)| (format_value(&value), count))
            .collect())
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi(" 10.1039/C6EE00030D "), "10.1039/C6EE00030D");
        assert_eq!(
            normalize_doi("https://doi.org/10.1039/C6EE00030D"),
            "10.1039/C6EE00030D"
        );
        assert_eq!(
            normalize_doi("http://doi.org/10.1039/C6EE00030D"),
            "10.1039/C6EE00030D"
        );
        assert_eq!(normalize_doi("doi.org/10.1/x"), "10.1/x");
        assert_eq!(normalize_doi("   "), "");
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1, 2,3"), vec![1, 2, 3]);
        assert_eq!(parse_id_list("4,abc,,5.5, 6"), vec![4, 6]);
        assert_eq!(parse_id_list("7\n,8\r\n"), vec![7, 8]);
        assert!(parse_id_list("none").is_empty());
    }

    #[test]
    fn test_compare_values() {
        let mut values = vec![json!(10), JsonValue::Null, json!(9), json!(1.5)];
        values.sort_by(compare_values);
        assert_eq!(values, vec![json!(1.5), json!(9), json!(10), JsonValue::Null]);

        let mut values = vec![json!("pin"), json!("nip"), JsonValue::Null];
        values.sort_by(compare_values);
        assert_eq!(values, vec![json!("nip"), json!("pin"), JsonValue::Null]);
    }
}
