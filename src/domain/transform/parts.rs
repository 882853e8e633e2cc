//! Customer / part pivot: load, top-N selection and trend labels.

use std::cmp::Ordering;

use tracing::debug;

use crate::domain::entities::field::Field;
use crate::domain::entities::grid::{Cell, RawGrid};
use crate::domain::entities::table::{Column, Table};
use crate::domain::transform::canonical::{canonicalize, CanonicalOptions};
use crate::domain::transform::cells::format_trend;

/// Header is the first row of `grid`. Columns at `dropped` positions and
/// columns without a label are removed, as are rows with no value at all.
pub fn build_part_table(grid: &RawGrid, dropped: &[usize]) -> Table {
    let keep = |idx: &usize| !dropped.contains(idx);
    let header: Vec<Cell> = grid
        .row(0)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter(|(idx, _)| keep(idx))
        .map(|(_, cell)| cell.clone())
        .collect();
    let body: Vec<Vec<Cell>> = grid
        .rows()
        .iter()
        .skip(1)
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(idx, _)| keep(idx))
                .map(|(_, cell)| cell.clone())
                .collect()
        })
        .collect();

    let labelled: Vec<Column> = Table::from_rows(&header, &body)
        .into_columns()
        .into_iter()
        .filter(|c| !c.label.is_empty())
        .collect();
    let table = drop_blank_rows(&Table::new(labelled));

    debug!(
        rows = table.row_count(),
        columns = table.columns().len(),
        "loaded part pivot"
    );
    canonicalize(&table, &CanonicalOptions::parts())
}

fn drop_blank_rows(table: &Table) -> Table {
    table.filter_rows(|idx| table.row(idx).iter().any(|c| !c.is_blank()))
}

fn sort_key(table: &Table, field: Field, idx: usize) -> String {
    table
        .field(field)
        .and_then(|c| c.values.get(idx))
        .map(Cell::display)
        .unwrap_or_default()
}

/// Rows ordered by customer then part number, at most `per_customer` rows for
/// each customer.
pub fn top_parts(table: &Table, per_customer: usize) -> Table {
    let mut order: Vec<usize> = (0..table.row_count()).collect();
    order.sort_by(|a, b| {
        let by = |field| sort_key(table, field, *a).cmp(&sort_key(table, field, *b));
        match by(Field::Customer) {
            Ordering::Equal => by(Field::PartNumber),
            other => other,
        }
    });

    let mut kept = Vec::with_capacity(order.len());
    let mut current: Option<String> = None;
    let mut taken = 0;
    for idx in order {
        let customer = sort_key(table, Field::Customer, idx);
        if current.as_ref() != Some(&customer) {
            current = Some(customer);
            taken = 0;
        }
        if taken < per_customer {
            kept.push(idx);
            taken += 1;
        }
    }
    table.take_rows(&kept)
}

/// Replaces raw trend ratios with their arrow labels.
pub fn label_trends(table: &Table) -> Table {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            if column.label != Field::Trend.label() {
                return column.clone();
            }
            let values = column
                .values
                .iter()
                .map(|v| Cell::from(format_trend(v)))
                .collect();
            Column::new(column.label.clone(), values)
        })
        .collect();
    Table::new(columns)
}
