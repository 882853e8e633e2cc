use thiserror::Error;

/// Structural failures that halt the affected view. Cell-level problems never
/// surface here; they resolve to blank.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("workbook source '{location}' is unavailable: {reason}")]
    SourceUnavailable { location: String, reason: String },
    #[error("sheet '{sheet}' not found in workbook")]
    SheetNotFound { sheet: String },
    #[error("sheet '{sheet}' has no '{category}' row")]
    MissingCategoryRow { sheet: String, category: String },
    #[error("sheet '{sheet}' has no quarter header row")]
    MissingQuarterHeader { sheet: String },
}

impl DashboardError {
    pub fn source_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        DashboardError::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sheet_not_found(sheet: impl Into<String>) -> Self {
        DashboardError::SheetNotFound {
            sheet: sheet.into(),
        }
    }

    /// Whether the whole render must stop, as opposed to a single view.
    pub fn is_fatal_for_session(&self) -> bool {
        matches!(self, DashboardError::SourceUnavailable { .. })
    }
}
