use std::collections::BTreeSet;

use crate::domain::entities::field::Field;
use crate::domain::entities::filter::{FilterSelection, IdentityFilter, Selection};
use crate::domain::entities::grid::Cell;
use crate::domain::entities::table::Table;
use crate::domain::transform::hierarchy::ISLANDS;

/// Labels never offered as filter choices.
const HIDDEN_OPTIONS: [&str; 3] = ["", "<blank>", "Grand Total"];

/// Display order of the island picker; unknown islands follow alphabetically.
const ISLAND_ORDER: [&str; 5] = ["SUMATERA", "JAWA", "BALI NT", "KALIMANTAN", "SULAWESI"];

/// Conjunction of island, province and route selections. Returns a filtered
/// copy; a dimension whose column is absent is not filtered.
pub fn apply(table: &Table, selection: &FilterSelection) -> Table {
    apply_dimensions(
        table,
        &[
            (Field::Island, &selection.island),
            (Field::Province, &selection.province),
            (Field::Route, &selection.route),
        ],
    )
}

/// Same conjunction over the part view's identity columns.
pub fn apply_identity(table: &Table, filter: &IdentityFilter) -> Table {
    apply_dimensions(
        table,
        &[
            (Field::Branch, &filter.branch),
            (Field::CustomerId, &filter.customer_id),
            (Field::Customer, &filter.customer),
        ],
    )
}

pub fn apply_dimensions(table: &Table, dimensions: &[(Field, &Selection)]) -> Table {
    let active: Vec<(&[Cell], &Selection)> = dimensions
        .iter()
        .filter(|(_, selection)| !selection.is_all())
        .filter_map(|(field, selection)| {
            table
                .field(*field)
                .map(|column| (column.values.as_slice(), *selection))
        })
        .collect();

    if active.is_empty() {
        return table.clone();
    }

    table.filter_rows(|idx| {
        active.iter().all(|(values, selection)| {
            let value = values.get(idx).map(Cell::display);
            selection.matches(value.as_deref().filter(|v| !v.is_empty()))
        })
    })
}

/// Distinct choices for a dimension, blanks and totals removed.
pub fn options(table: &Table, field: Field) -> Vec<String> {
    let Some(column) = table.field(field) else {
        return Vec::new();
    };
    let distinct: BTreeSet<String> = column
        .values
        .iter()
        .map(Cell::display)
        .filter(|v| !HIDDEN_OPTIONS.contains(&v.as_str()))
        .collect();

    if field != Field::Island {
        return distinct.into_iter().collect();
    }

    let mut ordered: Vec<String> = ISLAND_ORDER
        .iter()
        .filter_map(|island| {
            distinct
                .iter()
                .find(|v| v.eq_ignore_ascii_case(island))
                .cloned()
        })
        .collect();
    ordered.extend(
        distinct
            .into_iter()
            .filter(|v| !ISLANDS.contains(&v.to_uppercase().as_str())),
    );
    ordered
}

/// Province choices, narrowed to the selected islands.
pub fn province_options(table: &Table, islands: &Selection) -> Vec<String> {
    let scoped = apply_dimensions(table, &[(Field::Island, islands)]);
    options(&scoped, Field::Province)
}
