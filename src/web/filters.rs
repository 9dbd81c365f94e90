//! Record filters read from the query string.
//!
//! Filter keys may repeat, so they are read from the raw key/value pairs:
//!
//! - `is_true=<column>` keeps rows where a boolean column is true
//! - `in.<column>=<value>` keeps rows whose value is listed; repeat the key for more values
//! - `above.<column>=<number>` and `below.<column>=<number>` bound a numeric column
//! - `after.<column>=<YYYY-MM-DD>` and `before.<column>=<YYYY-MM-DD>` bound a date column
//!
//! Blank values are skipped, since HTML forms submit every field.

use crate::error::{AppError, AppResult};
use crate::models::RecordFilter;
use chrono::NaiveDate;

/// Date format accepted by `after.` and `before.`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Build the filters named in `pairs`, in the order their columns first appear.
/// Keys that are not filters are ignored.
pub fn parse_filters(pairs: &[(String, String)]) -> AppResult<Vec<RecordFilter>> {
    let mut filters = Vec::new();

    for (key, value) in pairs {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if key == "is_true" {
            filters.push(RecordFilter::IsTrue(value.to_string()));
            continue;
        }

        let Some((kind, column)) = key.split_once('.') else {
            continue;
        };
        if column.is_empty() {
            return Err(AppError::invalid_input(format!(
                "Filter '{}' needs a column name",
                key
            )));
        }

        match kind {
            "in" => add_member(&mut filters, column, value),
            "above" | "below" => {
                let bound = parse_number(key, value)?;
                set_range(&mut filters, column, kind == "above", bound);
            }
            "after" | "before" => {
                let bound = parse_date(key, value)?;
                set_date_range(&mut filters, column, kind == "after", bound);
            }
            _ => {}
        }
    }

    for filter in &filters {
        check_bounds(filter)?;
    }
    Ok(filters)
}

fn add_member(filters: &mut Vec<RecordFilter>, column: &str, value: &str) {
    let existing = filters.iter_mut().find_map(|f| match f {
        RecordFilter::In(c, values) if c == column => Some(values),
        _ => None,
    });
    match existing {
        Some(values) => values.push(value.to_string()),
        None => filters.push(RecordFilter::In(column.to_string(), vec![value.to_string()])),
    }
}

fn set_range(filters: &mut Vec<RecordFilter>, column: &str, lower: bool, bound: f64) {
    let existing = filters.iter_mut().find_map(|f| match f {
        RecordFilter::Range {
            column: c,
            above,
            below,
        } if c == column => Some(if lower { above } else { below }),
        _ => None,
    });
    match existing {
        Some(slot) => *slot = Some(bound),
        None => filters.push(RecordFilter::Range {
            column: column.to_string(),
            above: lower.then_some(bound),
            below: (!lower).then_some(bound),
        }),
    }
}

fn set_date_range(filters: &mut Vec<RecordFilter>, column: &str, lower: bool, bound: NaiveDate) {
    let existing = filters.iter_mut().find_map(|f| match f {
        RecordFilter::DateRange {
            column: c,
            after,
            before,
        } if c == column => Some(if lower { after } else { before }),
        _ => None,
    });
    match existing {
        Some(slot) => *slot = Some(bound),
        None => filters.push(RecordFilter::DateRange {
            column: column.to_string(),
            after: lower.then_some(bound),
            before: (!lower).then_some(bound),
        }),
    }
}

fn parse_number(key: &str, value: &str) -> AppResult<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::invalid_input(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_date(key: &str, value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        AppError::invalid_input(format!(
            "{} must be a date like 2016-01-31, got '{}'",
            key, value
        ))
    })
}

/// A range whose lower bound is not below its upper bound selects nothing.
fn check_bounds(filter: &RecordFilter) -> AppResult<()> {
    let empty = match filter {
        RecordFilter::Range {
            above: Some(lo),
            below: Some(hi),
            ..
        } => lo >= hi,
        RecordFilter::DateRange {
            after: Some(lo),
            before: Some(hi),
            ..
        } => lo >= hi,
        _ => false,
    };
    if empty {
        return Err(AppError::invalid_input(format!(
            "Lower bound for {} must be below its upper bound",
            filter.column()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_filters_combine_in_first_seen_order() {
        let filters = parse_filters(&pairs(&[
            ("dataset", "singeljunction"),
            ("in.Cell_architecture", "nip"),
            ("is_true", "Cell_flexible"),
            ("above.JV_default_PCE", "10"),
            ("in.Cell_architecture", "pin"),
            ("below.JV_default_PCE", "18.5"),
            ("after.Ref_publication_date", "2016-01-01"),
        ]))
        .unwrap();

        assert_eq!(
            filters,
            vec![
                RecordFilter::In(
                    "Cell_architecture".into(),
                    vec!["nip".into(), "pin".into()]
                ),
                RecordFilter::IsTrue("Cell_flexible".into()),
                RecordFilter::Range {
                    column: "JV_default_PCE".into(),
                    above: Some(10.0),
                    below: Some(18.5),
                },
                RecordFilter::DateRange {
                    column: "Ref_publication_date".into(),
                    after: NaiveDate::from_ymd_opt(2016, 1, 1),
                    before: None,
                },
            ]
        );
    }

    #[test]
    fn test_blank_and_unrelated_keys_are_ignored() {
        let filters = parse_filters(&pairs(&[
            ("columns", "Ref_ID"),
            ("limit", "5"),
            ("above.JV_default_PCE", ""),
            ("in.Cell_architecture", "  "),
            ("sort.Ref_ID", "asc"),
        ]))
        .unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_bad_values_rejected() {
        for (key, value) in [
            ("above.JV_default_PCE", "high"),
            ("below.JV_default_PCE", "NaN"),
            ("after.Ref_publication_date", "01/02/2016"),
            ("in.", "nip"),
        ] {
            let result = parse_filters(&pairs(&[(key, value)]));
            assert!(
                matches!(result, Err(AppError::InvalidInput { .. })),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = parse_filters(&pairs(&[
            ("above.JV_default_PCE", "20"),
            ("below.JV_default_PCE", "10"),
        ]));
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));

        let result = parse_filters(&pairs(&[
            ("after.Ref_publication_date", "2020-01-01"),
            ("before.Ref_publication_date", "2019-01-01"),
        ]));
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
    }
}
