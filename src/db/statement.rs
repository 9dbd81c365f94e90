//! SQL text for dataset reads.
//!
//! Column names are double-quoted so case-sensitive and reserved names work.
//! Schema and table names are written bare and must be plain identifiers.

use crate::error::{AppError, AppResult};
use crate::models::{DatabaseType, QueryParam, RecordFilter};

/// Quote a column name, doubling any embedded quote.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Check that a schema or table name is a plain identifier.
pub fn validate_qualifier(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::invalid_input(format!(
            "Invalid schema or table name: '{}'",
            name
        )))
    }
}

fn validate_column(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::invalid_input("Column name cannot be empty"));
    }
    if name.contains('\0') {
        return Err(AppError::invalid_input("Column name contains a NUL byte"));
    }
    Ok(())
}

fn column_list(columns: &[String]) -> AppResult<String> {
    if columns.is_empty() {
        return Ok("*".to_string());
    }
    for column in columns {
        validate_column(column)?;
    }
    Ok(columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", "))
}

/// SQL text with the values bound to its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

/// Column alias carrying the row count in value-count queries.
pub const COUNT_ALIAS: &str = "__n";

/// Alias for the count column that cannot shadow `column`.
pub fn count_alias(column: &str) -> &'static str {
    if column == COUNT_ALIAS { "__n_rows" } else { COUNT_ALIAS }
}

/// Collects bound values and hands out their placeholders.
struct Binder {
    db_type: DatabaseType,
    params: Vec<QueryParam>,
}

impl Binder {
    fn bind(&mut self, param: QueryParam) -> String {
        self.params.push(param);
        self.db_type.placeholder(self.params.len())
    }

    fn condition(&mut self, filter: &RecordFilter) -> AppResult<String> {
        let column = filter.column();
        validate_column(column)?;
        let quoted = quote_identifier(column);

        match filter {
            RecordFilter::IsTrue(_) => Ok(format!("{} is true", quoted)),
            RecordFilter::Equals(_, value) => {
                Ok(format!("{} = {}", quoted, self.bind(QueryParam::String(value.clone()))))
            }
            RecordFilter::In(_, values) => {
                if values.is_empty() {
                    return Err(AppError::invalid_input(format!(
                        "At least one value is required for {}",
                        column
                    )));
                }
                let list = values
                    .iter()
                    .map(|v| self.bind(QueryParam::String(v.clone())))
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!("{} in ({})", quoted, list))
            }
            RecordFilter::InIntegers(_, values) => {
                if values.is_empty() {
                    return Err(AppError::invalid_input("At least one value is required"));
                }
                let list = values
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                Ok(format!("{} in ({})", quoted, list))
            }
            RecordFilter::Range { above, below, .. } => {
                let bounds = [
                    above.map(|v| format!("{} > {}", quoted, self.bind(QueryParam::Float(v)))),
                    below.map(|v| format!("{} < {}", quoted, self.bind(QueryParam::Float(v)))),
                ];
                join_bounds(column, bounds)
            }
            RecordFilter::DateRange { after, before, .. } => {
                let bounds = [
                    after.map(|d| format!("{} > {}", quoted, self.bind(QueryParam::Date(d)))),
                    before.map(|d| format!("{} < {}", quoted, self.bind(QueryParam::Date(d)))),
                ];
                join_bounds(column, bounds)
            }
        }
    }
}

fn join_bounds(column: &str, bounds: [Option<String>; 2]) -> AppResult<String> {
    let bounds: Vec<String> = bounds.into_iter().flatten().collect();
    if bounds.is_empty() {
        return Err(AppError::invalid_input(format!(
            "Range on {} needs a lower or upper bound",
            column
        )));
    }
    Ok(bounds.join(" and "))
}

fn where_clause(filters: &[RecordFilter], db_type: DatabaseType) -> AppResult<Statement> {
    let mut binder = Binder {
        db_type,
        params: Vec::new(),
    };
    let conditions = filters
        .iter()
        .map(|filter| binder.condition(filter))
        .collect::<AppResult<Vec<_>>>()?;

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" where {}", conditions.join(" and "))
    };
    Ok(Statement {
        sql,
        params: binder.params,
    })
}

/// Build `select "<col1>", ... from <schema>.<table> [where ...] [limit N]`.
pub fn select(
    schema: &str,
    table: &str,
    columns: &[String],
    filters: &[RecordFilter],
    limit: Option<u32>,
    db_type: DatabaseType,
) -> AppResult<Statement> {
    validate_qualifier(schema)?;
    validate_qualifier(table)?;

    let clause = where_clause(filters, db_type)?;
    let mut sql = format!(
        "select {} from {}.{}{}",
        column_list(columns)?,
        schema,
        table,
        clause.sql
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" limit {}", limit));
    }
    Ok(Statement {
        sql,
        params: clause.params,
    })
}

/// Build a value-count query: one row per distinct value with its row count
/// under [`count_alias`].
pub fn value_counts(
    schema: &str,
    table: &str,
    column: &str,
    filters: &[RecordFilter],
    db_type: DatabaseType,
) -> AppResult<Statement> {
    validate_qualifier(schema)?;
    validate_qualifier(table)?;
    validate_column(column)?;

    let quoted = quote_identifier(column);
    let alias = quote_identifier(count_alias(column));
    let clause = where_clause(filters, db_type)?;
    Ok(Statement {
        sql: format!(
            "select {quoted}, count(*) as {alias} from {schema}.{table}{} group by {quoted}",
            clause.sql
        ),
        params: clause.params,
    })
}

/// Build a distinct-values query for one column.
pub fn distinct_values(
    schema: &str,
    table: &str,
    column: &str,
    filters: &[RecordFilter],
    db_type: DatabaseType,
) -> AppResult<Statement> {
    validate_qualifier(schema)?;
    validate_qualifier(table)?;
    validate_column(column)?;

    let clause = where_clause(filters, db_type)?;
    Ok(Statement {
        sql: format!(
            "select distinct {} from {}.{}{}",
            quote_identifier(column),
            schema,
            table,
            clause.sql
        ),
        params: clause.params,
    })
}
