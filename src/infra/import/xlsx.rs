use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info};

use crate::domain::entities::grid::{Cell, RawGrid};
use crate::domain::error::DashboardError;
use crate::usecase::ports::source::{ReadOptions, WorkbookSource};

pub fn data_to_cell(cell: &Data) -> Cell {
    match cell {
        Data::String(v) => Cell::from(v.as_str()),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(v) => Cell::Text(v.to_string()),
        Data::DateTime(v) => Cell::Text(v.to_string()),
        Data::DateTimeIso(v) => Cell::Text(v.to_string()),
        Data::DurationIso(v) => Cell::Text(v.to_string()),
        Data::Error(_) => Cell::Empty,
        Data::Empty => Cell::Empty,
    }
}

/// Positional grid anchored at A1, so row and column indices match the sheet
/// even when the used range starts further down or right.
pub fn range_to_grid(range: &Range<Data>) -> RawGrid {
    let (top, left) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); top];
    rows.extend(range.rows().map(|r| {
        let mut row = vec![Cell::Empty; left];
        row.extend(r.iter().map(data_to_cell));
        row
    }));
    RawGrid::new(rows)
}

/// Spreadsheet workbook on disk (`.xlsx`, `.xls`, `.ods`), read through calamine.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    path: PathBuf,
}

impl XlsxWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<calamine::Sheets<std::io::BufReader<std::fs::File>>, DashboardError> {
        open_workbook_auto(&self.path)
            .map_err(|err| DashboardError::source_unavailable(self.location(), err))
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn list_sheets(&self) -> Result<Vec<String>, DashboardError> {
        Ok(self.open()?.sheet_names())
    }

    fn read_sheet(&self, name: &str, options: &ReadOptions) -> Result<RawGrid, DashboardError> {
        let mut workbook = self.open()?;
        if !workbook.sheet_names().iter().any(|sheet| sheet == name) {
            return Err(DashboardError::sheet_not_found(name));
        }

        let range = workbook
            .worksheet_range(name)
            .map_err(|err| DashboardError::source_unavailable(self.location(), err))?;
        let grid = options.apply(range_to_grid(&range));

        info!(sheet = name, rows = grid.len(), "read sheet");
        debug!(
            sheet = name,
            width = grid.width(),
            first_row = options.first_row(),
            "sheet layout"
        );
        Ok(grid)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_cells_map_to_grid_cells() {
        assert_eq!(data_to_cell(&Data::String(" JAWA ".to_string())), Cell::from(" JAWA "));
        assert_eq!(data_to_cell(&Data::Float(0.25)), Cell::Number(0.25));
        assert_eq!(data_to_cell(&Data::Int(12)), Cell::Number(12.0));
        assert_eq!(data_to_cell(&Data::String(String::new())), Cell::Empty);
        assert_eq!(data_to_cell(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn range_is_padded_to_a1() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Row Labels".to_string()));
        range.set_value((3, 2), Data::Float(0.5));

        let grid = range_to_grid(&range);

        assert_eq!(grid.len(), 4);
        assert_eq!(grid.cell(2, 1), Some(&Cell::from("Row Labels")));
        assert_eq!(grid.cell(3, 2), Some(&Cell::Number(0.5)));
        assert_eq!(grid.cell(0, 0), None);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let workbook = XlsxWorkbook::new(std::env::temp_dir().join("bip-dashboard-missing.xlsx"));

        let result = workbook.list_sheets();

        assert!(matches!(result, Err(DashboardError::SourceUnavailable { .. })));
    }
}
