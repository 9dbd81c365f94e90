//! Dataset descriptors.
//!
//! A dataset is one queryable table: where it lives, which column identifies a
//! record, and which columns are returned when a caller does not name any.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the dataset served when a request does not pick one.
pub const DEFAULT_DATASET: &str = "singeljunction";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Registry key used in `?dataset=`
    pub name: String,
    pub schema: String,
    pub table: String,
    pub primary_key: String,
    /// Column holding the publication DOI, if the dataset has one
    #[serde(default)]
    pub doi_column: Option<String>,
    /// Empty means every column
    #[serde(default)]
    pub default_columns: Vec<String>,
}

impl DatasetDescriptor {
    /// The single-junction perovskite solar cell dataset.
    pub fn single_junction() -> Self {
        Self {
            name: DEFAULT_DATASET.to_string(),
            schema: "singeljunction".to_string(),
            table: "data".to_string(),
            primary_key: "Ref_ID".to_string(),
            doi_column: Some("Ref_DOI_number".to_string()),
            default_columns: Vec::new(),
        }
    }

    /// `schema.table` as written in queries.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Registry of datasets the service may query, keyed by name.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, DatasetDescriptor>,
}

impl DatasetRegistry {
    /// Registry holding only the built-in dataset.
    pub fn builtin() -> Self {
        let mut datasets = BTreeMap::new();
        let default = DatasetDescriptor::single_junction();
        datasets.insert(default.name.clone(), default);
        Self { datasets }
    }

    /// Registry with no datasets.
    pub fn empty() -> Self {
        Self {
            datasets: BTreeMap::new(),
        }
    }

    /// Add a dataset. Names must be unique.
    pub fn register(&mut self, dataset: DatasetDescriptor) -> AppResult<()> {
        if dataset.name.trim().is_empty() {
            return Err(AppError::configuration("Dataset name cannot be empty"));
        }
        crate::db::statement::validate_qualifier(&dataset.schema)?;
        crate::db::statement::validate_qualifier(&dataset.table)?;
        if self.datasets.contains_key(&dataset.name) {
            return Err(AppError::configuration(format!(
                "Dataset '{}' is defined more than once",
                dataset.name
            )));
        }
        self.datasets.insert(dataset.name.clone(), dataset);
        Ok(())
    }

    /// Built-in registry extended with the descriptors in a JSON file.
    pub fn with_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::configuration(format!(
                "Failed to read datasets file {}: {}",
                path.display(),
                e
            ))
        })?;
        let extra: Vec<DatasetDescriptor> = serde_json::from_str(&content).map_err(|e| {
            AppError::configuration(format!(
                "Invalid datasets file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut registry = Self::builtin();
        for dataset in extra {
            registry.register(dataset)?;
        }
        Ok(registry)
    }

    /// Look up a dataset; `None` selects the default one.
    pub fn get(&self, name: Option<&str>) -> AppResult<&DatasetDescriptor> {
        let name = name.unwrap_or(DEFAULT_DATASET);
        self.datasets
            .get(name)
            .ok_or_else(|| AppError::invalid_input(format!("Unknown dataset: {}", name)))
    }

    pub fn all(&self) -> impl Iterator<Item = &DatasetDescriptor> {
        self.datasets.values()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_dataset() {
        let registry = DatasetRegistry::builtin();
        let dataset = registry.get(None).unwrap();
        assert_eq!(dataset.schema, "singeljunction");
        assert_eq!(dataset.table, "data");
        assert_eq!(dataset.primary_key, "Ref_ID");
        assert_eq!(dataset.qualified_name(), "singeljunction.data");
    }

    #[test]
    fn test_unknown_dataset() {
        let registry = DatasetRegistry::builtin();
        assert!(matches!(
            registry.get(Some("tandem")),
            Err(AppError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_duplicate_dataset_rejected() {
        let mut registry = DatasetRegistry::builtin();
        let result = registry.register(DatasetDescriptor::single_junction());
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut registry = DatasetRegistry::builtin();
        let mut dataset = DatasetDescriptor::single_junction();
        dataset.name = "bad".to_string();
        dataset.schema = "public; drop".to_string();
        assert!(registry.register(dataset).is_err());
    }

    #[test]
    fn test_registry_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "tandem", "schema": "tandem", "table": "data", "primary_key": "Ref_ID",
                "default_columns": ["Ref_ID", "Cell_architecture"]}}]"#
        )
        .unwrap();

        let registry = DatasetRegistry::with_file(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        let tandem = registry.get(Some("tandem")).unwrap();
        assert_eq!(tandem.doi_column, None);
        assert_eq!(tandem.default_columns, vec!["Ref_ID", "Cell_architecture"]);
    }
}
