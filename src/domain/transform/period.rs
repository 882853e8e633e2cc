//! Folds a wide quarter pivot (`23-Q1`, `23-Q2`, ...) into quarter, semester
//! and year shares per category.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::entities::grid::RawGrid;
use crate::domain::entities::period::{PeriodAggregates, Quarter, Shares, Year};
use crate::domain::error::DashboardError;
use crate::domain::transform::cells::parse_percent;

static QUARTER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-Q([1-4])$").expect("quarter label pattern is valid"));

/// Marker in the label column of the row that lists the quarter headers.
pub const HEADER_MARKER: &str = "Row Labels";

/// `23-Q4` → quarter 4 of 2023.
pub fn parse_quarter_label(label: &str) -> Option<Quarter> {
    let caps = QUARTER_LABEL.captures(label.trim())?;
    let yy: u16 = caps[1].parse().ok()?;
    let number: u8 = caps[2].parse().ok()?;
    Some(Quarter::new(Year::from_two_digits(yy), number))
}

/// Aggregates the named category rows of a summary sheet.
///
/// Each category must have a row; a missing one fails the whole sheet. Blank
/// or unparsable values are skipped, so a mean covers the quarters present.
pub fn aggregate_periods(
    grid: &RawGrid,
    sheet: &str,
    categories: &[&str],
) -> Result<PeriodAggregates, DashboardError> {
    let (header_idx, label_col) = find_header(grid).ok_or_else(|| {
        DashboardError::MissingQuarterHeader {
            sheet: sheet.to_string(),
        }
    })?;
    let header = grid.row(header_idx).unwrap_or_default();

    let mut quarter_cols: Vec<(Quarter, usize)> = Vec::new();
    for (col, cell) in header.iter().enumerate() {
        let Some(quarter) = cell.as_text().and_then(parse_quarter_label) else {
            continue;
        };
        if quarter_cols.iter().any(|(q, _)| *q == quarter) {
            warn!(sheet, quarter = %quarter, "duplicate quarter column ignored");
            continue;
        }
        quarter_cols.push((quarter, col));
    }

    let mut by_quarter: BTreeMap<Quarter, Shares> = BTreeMap::new();
    for category in categories {
        let row = find_category_row(grid, header_idx, label_col, category).ok_or_else(|| {
            DashboardError::MissingCategoryRow {
                sheet: sheet.to_string(),
                category: category.to_string(),
            }
        })?;
        for (quarter, col) in &quarter_cols {
            let value = grid.cell(row, *col).and_then(parse_percent);
            let entry = by_quarter.entry(*quarter).or_default();
            if let Some(value) = value {
                entry.insert(category.to_string(), value);
            }
        }
    }

    let by_year = fold(&by_quarter, |q| q.year);
    let by_semester = fold(&by_quarter, Quarter::semester);

    debug!(
        sheet,
        quarters = by_quarter.len(),
        years = by_year.len(),
        "aggregated period shares"
    );
    Ok(PeriodAggregates {
        by_year,
        by_semester,
        by_quarter,
    })
}

fn find_header(grid: &RawGrid) -> Option<(usize, usize)> {
    grid.rows().iter().enumerate().find_map(|(row_idx, row)| {
        row.iter()
            .position(|c| {
                c.as_text()
                    .is_some_and(|t| t.eq_ignore_ascii_case(HEADER_MARKER))
            })
            .map(|col| (row_idx, col))
    })
}

fn find_category_row(
    grid: &RawGrid,
    header_idx: usize,
    label_col: usize,
    category: &str,
) -> Option<usize> {
    (header_idx + 1..grid.len()).find(|row_idx| {
        grid.cell(*row_idx, label_col)
            .and_then(|c| c.as_text())
            .is_some_and(|t| t.eq_ignore_ascii_case(category))
    })
}

/// Mean per category over the quarters sharing a key.
fn fold<K: Ord + Copy>(
    quarters: &BTreeMap<Quarter, Shares>,
    key: impl Fn(Quarter) -> K,
) -> BTreeMap<K, Shares> {
    let mut sums: BTreeMap<K, BTreeMap<String, (f64, usize)>> = BTreeMap::new();
    for (quarter, shares) in quarters {
        let bucket = sums.entry(key(*quarter)).or_default();
        for (category, value) in shares {
            let slot = bucket.entry(category.clone()).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(k, bucket)| {
            let means = bucket
                .into_iter()
                .map(|(category, (sum, count))| (category, sum / count as f64))
                .collect();
            (k, means)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::grid::Cell;
    use crate::domain::entities::period::Semester;

    fn assert_close(actual: Option<&f64>, expected: f64) {
        let actual = actual.copied().expect("value should be present");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn summary_grid() -> RawGrid {
        let header = ["Row Labels", "23-Q1", "23-Q2", "23-Q3", "23-Q4", "24-Q1"];
        RawGrid::new(vec![
            vec![Cell::from("Sum of Share")],
            header.iter().map(|h| Cell::from(*h)).collect(),
            vec![
                Cell::from("DIRECT"),
                Cell::from(0.9),
                Cell::from(0.7),
                Cell::from(0.8),
                Cell::from(0.6),
                Cell::from(0.5),
            ],
            vec![
                Cell::from("TASTI"),
                Cell::from(0.1),
                Cell::from(0.3),
                Cell::from(0.2),
                Cell::from(0.4),
                Cell::from("50%"),
            ],
        ])
    }

    #[test]
    fn quarter_labels_parse() {
        assert_eq!(
            parse_quarter_label("24-Q3"),
            Some(Quarter::new(Year(2024), 3))
        );
        assert_eq!(parse_quarter_label("2024-Q3"), None);
        assert_eq!(parse_quarter_label("24-Q5"), None);
    }

    #[test]
    fn years_and_semesters_are_means() {
        let aggregates =
            aggregate_periods(&summary_grid(), "RevbyNat", &["DIRECT", "TASTI"])
                .expect("aggregation should succeed");

        let y2023 = &aggregates.by_year[&Year(2023)];
        assert_close(y2023.get("TASTI"), 0.25);
        assert_close(y2023.get("DIRECT"), 0.75);

        let s1 = &aggregates.by_semester[&Semester {
            year: Year(2023),
            half: 1,
        }];
        let s2 = &aggregates.by_semester[&Semester {
            year: Year(2023),
            half: 2,
        }];
        assert_close(s1.get("TASTI"), 0.2);
        assert_close(s2.get("TASTI"), 0.3);

        assert_close(aggregates.by_year[&Year(2024)].get("TASTI"), 0.5);
    }

    #[test]
    fn keys_sort_chronologically() {
        let aggregates = aggregate_periods(&summary_grid(), "RevbyNat", &["DIRECT"])
            .expect("aggregation should succeed");

        let quarters: Vec<String> = aggregates.by_quarter.keys().map(ToString::to_string).collect();
        let semesters: Vec<String> = aggregates
            .by_semester
            .keys()
            .map(ToString::to_string)
            .collect();

        assert_eq!(quarters, vec!["23-Q1", "23-Q2", "23-Q3", "23-Q4", "24-Q1"]);
        assert_eq!(semesters, vec!["2023-S1", "2023-S2", "2024-S1"]);
    }

    #[test]
    fn missing_category_row_is_fatal() {
        let result = aggregate_periods(&summary_grid(), "RevbyNat", &["DIRECT", "RETAIL"]);

        match result {
            Err(DashboardError::MissingCategoryRow { sheet, category }) => {
                assert_eq!(sheet, "RevbyNat");
                assert_eq!(category, "RETAIL");
            }
            other => panic!("expected missing category error, got {other:?}"),
        }
    }

    #[test]
    fn missing_header_is_reported() {
        let grid = RawGrid::new(vec![vec![Cell::from("DIRECT"), Cell::from(0.5)]]);

        let result = aggregate_periods(&grid, "RevbyNat", &["DIRECT"]);

        assert!(matches!(
            result,
            Err(DashboardError::MissingQuarterHeader { .. })
        ));
    }

    #[test]
    fn blank_quarter_values_are_skipped() {
        let grid = RawGrid::new(vec![
            vec![Cell::from("Row Labels"), Cell::from("25-Q1"), Cell::from("25-Q2")],
            vec![Cell::from("TASTI"), Cell::from("N/A"), Cell::from(0.4)],
        ]);

        let aggregates =
            aggregate_periods(&grid, "RevbyNat", &["TASTI"]).expect("aggregation should succeed");

        assert_close(aggregates.by_year[&Year(2025)].get("TASTI"), 0.4);
        assert!(aggregates.by_quarter[&Quarter::new(Year(2025), 1)].is_empty());
    }
}
