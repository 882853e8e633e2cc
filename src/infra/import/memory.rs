use crate::domain::entities::grid::RawGrid;
use crate::domain::error::DashboardError;
use crate::usecase::ports::source::{ReadOptions, WorkbookSource};

/// Sheets held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, RawGrid)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a sheet.
    pub fn with_sheet(mut self, name: impl Into<String>, grid: RawGrid) -> Self {
        let name = name.into();
        match self.sheets.iter_mut().find(|(sheet, _)| *sheet == name) {
            Some((_, existing)) => *existing = grid,
            None => self.sheets.push((name, grid)),
        }
        self
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn list_sheets(&self) -> Result<Vec<String>, DashboardError> {
        Ok(self.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_sheet(&self, name: &str, options: &ReadOptions) -> Result<RawGrid, DashboardError> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, grid)| options.apply(grid.clone()))
            .ok_or_else(|| DashboardError::sheet_not_found(name))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
