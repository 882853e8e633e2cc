use serde::Serialize;
use tracing::info;

use crate::domain::entities::table::Table;
use crate::domain::error::DashboardError;
use crate::usecase::ports::source::{ReadOptions, WorkbookSource};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetPreview {
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub total_columns: usize,
}

impl SheetPreview {
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

/// Raw look at any sheet, first row taken as header.
pub struct ExplorerService<S> {
    source: S,
    max_rows: usize,
}

impl<S: WorkbookSource> ExplorerService<S> {
    pub fn new(source: S, max_rows: usize) -> Self {
        Self { source, max_rows }
    }

    pub fn list_sheets(&self) -> Result<Vec<String>, DashboardError> {
        self.source.list_sheets()
    }

    pub fn preview(&self, sheet: &str) -> Result<SheetPreview, DashboardError> {
        let grid = self.source.read_sheet(sheet, &ReadOptions::default())?;
        let header = grid.row(0).unwrap_or_default();
        let body = grid.rows().get(1..).unwrap_or_default();
        let table = Table::from_rows(header, body);

        let shown: Vec<usize> = (0..table.row_count().min(self.max_rows)).collect();
        let preview = SheetPreview {
            sheet: sheet.to_string(),
            columns: table.labels().into_iter().map(str::to_string).collect(),
            rows: table.take_rows(&shown).to_text_rows(),
            total_rows: table.row_count(),
            total_columns: table.columns().len(),
        };
        info!(
            sheet,
            shown = preview.rows.len(),
            total = preview.total_rows,
            "previewed sheet"
        );
        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::grid::{Cell, RawGrid};
    use crate::infra::import::memory::MemoryWorkbook;

    fn workbook(rows: usize) -> MemoryWorkbook {
        let mut grid = vec![vec![Cell::from("Part"), Cell::from("Qty")]];
        grid.extend((0..rows).map(|i| vec![Cell::from(format!("P{i}")), Cell::from(i as i64)]));
        MemoryWorkbook::new().with_sheet("PN Varians", RawGrid::new(grid))
    }

    #[test]
    fn preview_caps_rows_and_reports_totals() {
        let explorer = ExplorerService::new(workbook(5), 3);

        let preview = explorer.preview("PN Varians").expect("preview should build");

        assert_eq!(preview.columns, vec!["Part", "Qty"]);
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.rows[2], vec!["P2", "2"]);
        assert_eq!(preview.total_rows, 5);
        assert!(preview.is_truncated());
    }

    #[test]
    fn empty_sheet_previews_as_empty() {
        let explorer = ExplorerService::new(MemoryWorkbook::new().with_sheet("Blank", RawGrid::default()), 10);

        let preview = explorer.preview("Blank").expect("preview should build");

        assert!(preview.columns.is_empty());
        assert_eq!(preview.total_rows, 0);
        assert!(!preview.is_truncated());
    }

    #[test]
    fn sheets_are_listed_from_source() {
        let explorer = ExplorerService::new(workbook(0), 10);

        assert_eq!(explorer.list_sheets().expect("should list"), vec!["PN Varians"]);
    }
}
