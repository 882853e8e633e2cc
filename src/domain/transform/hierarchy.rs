//! Recovers island and province context from grids that announce each group
//! with a single-cell header row instead of repeating it on every data row.

use tracing::debug;

use crate::domain::entities::grid::{Cell, RawGrid};

/// Top-level regions. A single-cell row carrying one of these opens an island
/// group; any other single-cell row opens a province group.
pub const ISLANDS: [&str; 5] = ["SUMATERA", "JAWA", "KALIMANTAN", "SULAWESI", "BALI NT"];

pub fn is_island(label: &str) -> bool {
    let upper = label.trim().to_uppercase();
    ISLANDS.contains(&upper.as_str())
}

/// Group context carried down a single top-to-bottom scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupContext {
    pub island: Option<String>,
    pub province: Option<String>,
}

impl GroupContext {
    /// Context after a group-header row labelled `label`.
    pub fn enter_group(self, label: &str) -> GroupContext {
        let label = label.trim().to_uppercase();
        if is_island(&label) {
            GroupContext {
                island: Some(label),
                province: None,
            }
        } else {
            GroupContext {
                island: self.island,
                province: Some(label),
            }
        }
    }

    /// Writes the context into blank geography cells of a data row.
    pub fn fill_row(&self, row: &mut Vec<Cell>, columns: GeoColumns) {
        let targets = [
            (columns.island, &self.island),
            (columns.province, &self.province),
        ];
        for (col, value) in targets {
            let (Some(col), Some(value)) = (col, value) else {
                continue;
            };
            if row.len() <= col {
                row.resize(col + 1, Cell::Empty);
            }
            if row[col].is_blank() {
                row[col] = Cell::Text(value.clone());
            }
        }
    }
}

/// Positions of the geography columns inside a grid row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoColumns {
    pub island: Option<usize>,
    pub province: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Blank,
    GroupHeader(String),
    Data,
}

/// A row with exactly one filled cell, holding text, is a group header. A row
/// with more filled cells is data. A lone number is treated as blank.
pub fn classify_row(row: &[Cell]) -> RowKind {
    let mut filled = row.iter().filter(|c| !c.is_blank());
    match (filled.next(), filled.next()) {
        (None, _) => RowKind::Blank,
        (Some(cell), None) => match cell.as_text() {
            Some(label) => RowKind::GroupHeader(label.to_string()),
            None => RowKind::Blank,
        },
        (Some(_), Some(_)) => RowKind::Data,
    }
}

/// Data rows of `grid` with inherited geography. Group-header and blank rows are
/// dropped. Malformed hierarchies are tolerated; uncovered cells stay blank.
pub fn recover_hierarchy(grid: &RawGrid, columns: GeoColumns) -> RawGrid {
    let mut context = GroupContext::default();
    let mut rows = Vec::with_capacity(grid.len());
    let mut headers = 0_usize;

    for row in grid.rows() {
        match classify_row(row) {
            RowKind::Blank => {}
            RowKind::GroupHeader(label) => {
                headers += 1;
                context = context.enter_group(&label);
            }
            RowKind::Data => {
                let mut row = row.clone();
                context.fill_row(&mut row, columns);
                rows.push(row);
            }
        }
    }

    debug!(
        group_headers = headers,
        data_rows = rows.len(),
        "recovered row hierarchy"
    );
    RawGrid::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    const GEO: GeoColumns = GeoColumns {
        island: Some(0),
        province: Some(1),
    };

    #[test]
    fn island_header_sets_island_and_clears_province() {
        let context = GroupContext {
            island: Some("JAWA".to_string()),
            province: Some("JAWA BARAT".to_string()),
        };

        let next = context.enter_group("sumatera");

        assert_eq!(next.island.as_deref(), Some("SUMATERA"));
        assert_eq!(next.province, None);
    }

    #[test]
    fn other_header_sets_province_only() {
        let context = GroupContext::default().enter_group("Jawa");

        let next = context.enter_group("Jawa Tengah");

        assert_eq!(next.island.as_deref(), Some("JAWA"));
        assert_eq!(next.province.as_deref(), Some("JAWA TENGAH"));
    }

    #[test]
    fn classify_counts_filled_cells() {
        assert_eq!(classify_row(&row(&["", " ", ""])), RowKind::Blank);
        assert_eq!(
            classify_row(&row(&["", "BALI NT", ""])),
            RowKind::GroupHeader("BALI NT".to_string())
        );
        assert_eq!(classify_row(&row(&["x", "", "y"])), RowKind::Data);
        assert_eq!(classify_row(&[Cell::Empty, Cell::Number(4.0)]), RowKind::Blank);
    }

    #[test]
    fn data_rows_inherit_island_without_overwriting() {
        let grid = RawGrid::new(vec![
            row(&["SUMATERA"]),
            vec![
                Cell::from(""),
                Cell::from("Province X"),
                Cell::from(""),
                Cell::from("CityA"),
                Cell::from("DIRECT"),
                Cell::from(10.0),
            ],
            vec![
                Cell::from("JAWA"),
                Cell::from(""),
                Cell::from(""),
                Cell::from("CityB"),
                Cell::from("TASTI"),
                Cell::from(20.0),
            ],
        ]);

        let recovered = recover_hierarchy(&grid, GEO);

        assert_eq!(recovered.len(), 2, "group header row should be dropped");
        assert_eq!(recovered.cell(0, 0), Some(&Cell::from("SUMATERA")));
        assert_eq!(recovered.cell(0, 1), Some(&Cell::from("Province X")));
        assert_eq!(
            recovered.cell(1, 0),
            Some(&Cell::from("JAWA")),
            "explicit island should never be overwritten"
        );
    }

    #[test]
    fn province_header_flows_into_following_rows() {
        let grid = RawGrid::new(vec![
            row(&["KALIMANTAN"]),
            row(&["", "", "Kalimantan Timur"]),
            row(&["", "", "", "Balikpapan", "DIRECT"]),
            row(&["", "", "", "Samarinda", "TASTI"]),
            row(&["SULAWESI"]),
            row(&["", "", "", "Makassar", "DIRECT"]),
        ]);

        let recovered = recover_hierarchy(&grid, GEO);

        assert_eq!(recovered.len(), 3);
        for idx in 0..2 {
            assert_eq!(recovered.cell(idx, 0), Some(&Cell::from("KALIMANTAN")));
            assert_eq!(recovered.cell(idx, 1), Some(&Cell::from("KALIMANTAN TIMUR")));
        }
        assert_eq!(recovered.cell(2, 0), Some(&Cell::from("SULAWESI")));
        assert_eq!(
            recovered.cell(2, 1),
            Some(&Cell::Empty),
            "island header should clear province context"
        );
    }

    #[test]
    fn short_rows_are_extended_to_reach_geo_columns() {
        let grid = RawGrid::new(vec![row(&["JAWA"]), row(&["", "", "x", "y"])]);

        let columns = GeoColumns {
            island: Some(5),
            province: None,
        };

        let recovered = recover_hierarchy(&grid, columns);

        assert_eq!(recovered.cell(0, 5), Some(&Cell::from("JAWA")));
    }
}
