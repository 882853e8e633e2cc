//! Island / province / city revenue sheets: share and value tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::entities::field::Field;
use crate::domain::entities::grid::{Cell, RawGrid};
use crate::domain::entities::table::{Column, Table};
use crate::domain::transform::canonical::{
    canonicalize, classify_label, fill_down_within, group_keys, CanonicalOptions, LabelClass,
};
use crate::domain::transform::cells::{
    normalize_route, parse_percent, parse_whole_number, FRACTION_THRESHOLD,
};
use crate::domain::transform::hierarchy::{recover_hierarchy, GeoColumns};

/// Share table: header at `header_row`, every non-identity cell parsed as a fraction.
pub fn build_share_table(grid: &RawGrid, header_row: usize) -> Table {
    let table = region_table(grid, header_row);
    let groups = group_keys(table.columns(), &[Field::Island, Field::Province]);
    let columns = table
        .into_columns()
        .into_iter()
        .map(|column| match Field::from_label(&column.label) {
            Some(Field::City) => {
                let values = fill_down_within(&column.values, &groups);
                Column::new(column.label, values)
            }
            Some(field) if field.is_region_identity() => column,
            _ => {
                let values = column
                    .values
                    .iter()
                    .map(|v| parse_percent(v).map_or(Cell::Empty, Cell::Number))
                    .collect();
                Column::new(column.label, values)
            }
        })
        .collect();
    Table::new(columns)
}

/// Value table: numeric cells coerced, text that does not parse kept as-is.
pub fn build_value_table(grid: &RawGrid, header_row: usize) -> Table {
    let table = region_table(grid, header_row);
    let columns = table
        .into_columns()
        .into_iter()
        .map(|column| {
            if Field::from_label(&column.label).is_some_and(Field::is_region_identity) {
                return column;
            }
            let values = column
                .values
                .iter()
                .map(|v| parse_whole_number(v).map_or_else(|| v.clone(), Cell::Number))
                .collect();
            Column::new(column.label, values)
        })
        .collect();
    Table::new(columns)
}

fn region_table(grid: &RawGrid, header_row: usize) -> Table {
    let header = grid.row(header_row).unwrap_or_default();
    let body = grid.slice_rows(header_row + 1, grid.len());

    let position = |wanted: Field| {
        header
            .iter()
            .position(|cell| classify_label(&cell.display()) == LabelClass::Field(wanted))
    };
    let geo = GeoColumns {
        island: position(Field::Island),
        province: position(Field::Province),
    };

    let recovered = recover_hierarchy(&body, geo);
    let table = canonicalize(
        &Table::from_rows(header, recovered.rows()),
        &CanonicalOptions::regions(),
    );

    let columns = table
        .into_columns()
        .into_iter()
        .map(|column| {
            if column.label == Field::Route.label() {
                let values = column
                    .values
                    .iter()
                    .map(|v| normalize_route(v).map_or(Cell::Empty, Cell::Text))
                    .collect();
                Column::new(column.label, values)
            } else {
                column
            }
        })
        .collect();
    Table::new(columns)
}

/// Non-identity columns holding at least one value, all at or below the fraction threshold.
pub fn share_columns(table: &Table) -> Vec<&Column> {
    table
        .columns()
        .iter()
        .filter(|c| !Field::from_label(&c.label).is_some_and(Field::is_region_identity))
        .filter(|c| {
            let values: Vec<f64> = c.values.iter().filter_map(Cell::as_number).collect();
            !values.is_empty() && values.iter().all(|v| *v <= FRACTION_THRESHOLD)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityShare {
    pub city: String,
    pub route: String,
    pub share: f64,
}

/// Route split of the most recent share column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestShares {
    pub period: String,
    pub by_route: BTreeMap<String, f64>,
    pub by_city: Vec<CityShare>,
}

/// Mean shares of the last share column, per route and per (city, route).
pub fn latest_shares(table: &Table) -> Option<LatestShares> {
    let period = share_columns(table).last().copied()?;
    let routes = table.field(Field::Route)?;
    let cities = table.field(Field::City);

    let mut by_route: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut by_city: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
    for (idx, value) in period.values.iter().enumerate() {
        let Some(share) = value.as_number() else {
            continue;
        };
        let Some(route) = routes.values.get(idx).and_then(Cell::as_text) else {
            continue;
        };
        let slot = by_route.entry(route.to_string()).or_insert((0.0, 0));
        slot.0 += share;
        slot.1 += 1;

        if let Some(city) = cities
            .and_then(|c| c.values.get(idx))
            .and_then(Cell::as_text)
        {
            let slot = by_city
                .entry((city.to_string(), route.to_string()))
                .or_insert((0.0, 0));
            slot.0 += share;
            slot.1 += 1;
        }
    }

    Some(LatestShares {
        period: period.label.clone(),
        by_route: by_route
            .into_iter()
            .map(|(route, (sum, n))| (route, sum / n as f64))
            .collect(),
        by_city: by_city
            .into_iter()
            .map(|((city, route), (sum, n))| CityShare {
                city,
                route,
                share: sum / n as f64,
            })
            .collect(),
    })
}
