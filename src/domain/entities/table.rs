use std::collections::HashMap;

use serde::Serialize;

use crate::domain::entities::field::{Field, Route};
use crate::domain::entities::grid::Cell;

/// One labelled column. Labels may repeat until a table is canonicalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub label: String,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(label: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Column-major table. Every column holds exactly `row_count` values.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(mut columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for column in &mut columns {
            column.values.resize(row_count, Cell::Empty);
        }
        Self { columns, row_count }
    }

    /// Builds a table from a header row and positional body rows. A repeated
    /// non-blank label is numbered `label.1`, `label.2`, ...
    pub fn from_rows(header: &[Cell], rows: &[Vec<Cell>]) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let mut seen: HashMap<String, usize> = HashMap::new();
        let columns = (0..width)
            .map(|col_idx| {
                let label = header
                    .get(col_idx)
                    .map(|c| c.display().trim().to_string())
                    .unwrap_or_default();
                let label = number_repeat(&mut seen, label);
                let values = rows
                    .iter()
                    .map(|row| row.get(col_idx).cloned().unwrap_or_default())
                    .collect();
                Column::new(label, values)
            })
            .collect();

        Table::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// First column carrying `label`.
    pub fn column(&self, label: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.label == label)
    }

    pub fn field(&self, field: Field) -> Option<&Column> {
        self.column(field.label())
    }

    pub fn cell(&self, row_idx: usize, label: &str) -> Option<&Cell> {
        self.column(label).and_then(|c| c.values.get(row_idx))
    }

    pub fn row(&self, row_idx: usize) -> Vec<&Cell> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(row_idx))
            .collect()
    }

    /// Copy holding only the rows whose index satisfies `keep`.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Table {
        let kept: Vec<usize> = (0..self.row_count).filter(|idx| keep(*idx)).collect();
        self.take_rows(&kept)
    }

    /// Copy holding the given rows in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = indices
                    .iter()
                    .map(|idx| c.values.get(*idx).cloned().unwrap_or_default())
                    .collect();
                Column::new(c.label.clone(), values)
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }

    /// Copy restricted to the listed labels, in the listed order. Unknown labels are skipped.
    pub fn select(&self, labels: &[&str]) -> Table {
        let columns = labels
            .iter()
            .filter_map(|label| self.column(label).cloned())
            .collect();
        Table {
            columns,
            row_count: self.row_count,
        }
    }

    /// Text matrix for plain rendering.
    pub fn to_text_rows(&self) -> Vec<Vec<String>> {
        (0..self.row_count)
            .map(|idx| self.row(idx).into_iter().map(Cell::display).collect())
            .collect()
    }

    /// Record view over a region share table.
    pub fn to_records(&self) -> Vec<TidyRecord> {
        let period_columns: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| !Field::from_label(&c.label).is_some_and(Field::is_region_identity))
            .collect();

        (0..self.row_count)
            .map(|idx| {
                let text = |field: Field| {
                    self.field(field)
                        .and_then(|c| c.values.get(idx))
                        .and_then(Cell::as_text)
                        .map(str::to_string)
                };
                TidyRecord {
                    island: text(Field::Island),
                    province: text(Field::Province),
                    city: text(Field::City),
                    route: text(Field::Route).as_deref().and_then(Route::parse),
                    periods: period_columns
                        .iter()
                        .map(|c| {
                            let value = c.values.get(idx).and_then(Cell::as_number);
                            (c.label.clone(), value)
                        })
                        .collect(),
                }
            })
            .collect()
    }
}

fn number_repeat(seen: &mut HashMap<String, usize>, label: String) -> String {
    if label.is_empty() {
        return label;
    }
    let count = seen.entry(label.clone()).or_insert(0);
    let numbered = if *count == 0 {
        label
    } else {
        format!("{label}.{count}")
    };
    *count += 1;
    numbered
}

/// One observation of a region sheet after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRecord {
    pub island: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub route: Option<Route>,
    pub periods: Vec<(String, Option<f64>)>,
}
