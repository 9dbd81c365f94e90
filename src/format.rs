//! Output formatting utilities.
//!
//! Renders query results as CSV for the download routes and turns single
//! values into display strings.

use crate::models::QueryResult;
use serde_json::Value as JsonValue;

/// Byte order mark written ahead of CSV downloads so spreadsheet tools pick up UTF-8.
pub const UTF8_BOM: &str = "\u{feff}";

/// Render one value as text. NULL becomes the empty string.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Quote a CSV field when it contains a delimiter, quote, or line break.
fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(csv_field).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// Render a result as CSV: header row, then one line per row, without BOM.
pub fn format_as_csv(result: &QueryResult) -> String {
    let mut output = csv_line(result.columns.iter().map(String::as_str));

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .map(|col| row.get(col).map(format_value).unwrap_or_default())
            .collect();
        output.push_str(&csv_line(values.iter().map(String::as_str)));
    }

    output
}
