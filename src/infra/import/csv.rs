use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::info;

use crate::domain::entities::grid::{Cell, RawGrid};
use crate::domain::error::DashboardError;
use crate::usecase::ports::source::{ReadOptions, WorkbookSource};

/// Text field from a CSV export. Anything that parses as a float becomes a number.
pub fn field_to_cell(value: &str) -> Cell {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => Cell::Number(number),
        _ => Cell::Text(value.to_string()),
    }
}

/// A directory of `<sheet>.csv` files standing in for a workbook. Empty lines
/// are skipped by the reader, so row positions count non-empty lines only.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

impl WorkbookSource for CsvWorkbook {
    fn list_sheets(&self) -> Result<Vec<String>, DashboardError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|err| DashboardError::source_unavailable(self.location(), err))?;

        let mut sheets = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| DashboardError::source_unavailable(self.location(), err))?
                .path();
            if !is_csv(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|name| name.to_str()) {
                sheets.push(stem.to_string());
            }
        }
        sheets.sort();
        Ok(sheets)
    }

    fn read_sheet(&self, name: &str, options: &ReadOptions) -> Result<RawGrid, DashboardError> {
        if !self.dir.is_dir() {
            return Err(DashboardError::source_unavailable(
                self.location(),
                "not a directory",
            ));
        }
        let path = self.sheet_path(name);
        if !path.is_file() {
            return Err(DashboardError::sheet_not_found(name));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|err| DashboardError::source_unavailable(path.display().to_string(), err))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|err| DashboardError::source_unavailable(path.display().to_string(), err))?;
            rows.push(record.iter().map(field_to_cell).collect());
        }
        let grid = options.apply(RawGrid::new(rows));

        info!(sheet = name, rows = grid.len(), "read csv sheet");
        Ok(grid)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
