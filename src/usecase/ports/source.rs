use crate::domain::entities::grid::RawGrid;
use crate::domain::error::DashboardError;

/// Leading rows to discard before a grid is handed to a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadOptions {
    /// Rows dropped from the top of the sheet.
    pub skip_rows: usize,
    /// Header position counted after `skip_rows`; rows above it are dropped
    /// so the header becomes row 0.
    pub header_row_offset: Option<usize>,
}

impl ReadOptions {
    pub fn skip(rows: usize) -> Self {
        Self {
            skip_rows: rows,
            header_row_offset: None,
        }
    }

    pub fn first_row(&self) -> usize {
        self.skip_rows + self.header_row_offset.unwrap_or(0)
    }

    pub fn apply(&self, grid: RawGrid) -> RawGrid {
        match self.first_row() {
            0 => grid,
            start => grid.slice_rows(start, grid.len()),
        }
    }
}

/// A workbook that can hand out raw sheet grids.
///
/// Implementations fail with `SourceUnavailable` when the backing file cannot
/// be opened and with `SheetNotFound` for an unknown sheet name.
pub trait WorkbookSource {
    fn list_sheets(&self) -> Result<Vec<String>, DashboardError>;
    fn read_sheet(&self, name: &str, options: &ReadOptions) -> Result<RawGrid, DashboardError>;

    /// Human readable origin, used in log lines and error messages.
    fn location(&self) -> String;
}

impl<S: WorkbookSource + ?Sized> WorkbookSource for &S {
    fn list_sheets(&self) -> Result<Vec<String>, DashboardError> {
        (**self).list_sheets()
    }

    fn read_sheet(&self, name: &str, options: &ReadOptions) -> Result<RawGrid, DashboardError> {
        (**self).read_sheet(name, options)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

impl<S: WorkbookSource + ?Sized> WorkbookSource for Box<S> {
    fn list_sheets(&self) -> Result<Vec<String>, DashboardError> {
        (**self).list_sheets()
    }

    fn read_sheet(&self, name: &str, options: &ReadOptions) -> Result<RawGrid, DashboardError> {
        (**self).read_sheet(name, options)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::grid::Cell;

    fn numbered(rows: usize) -> RawGrid {
        RawGrid::new((0..rows).map(|i| vec![Cell::from(i as i64)]).collect())
    }

    #[test]
    fn default_options_keep_every_row() {
        let grid = ReadOptions::default().apply(numbered(3));

        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn skip_and_header_offset_add_up() {
        let options = ReadOptions {
            skip_rows: 2,
            header_row_offset: Some(1),
        };

        let grid = options.apply(numbered(6));

        assert_eq!(grid.len(), 3);
        assert_eq!(grid.cell(0, 0), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn skipping_past_the_end_yields_empty_grid() {
        assert!(ReadOptions::skip(10).apply(numbered(2)).is_empty());
    }
}
