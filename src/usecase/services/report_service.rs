use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{DashboardConfig, DEFAULT_TOP_N};
use crate::domain::entities::field::{Field, Route};
use crate::domain::entities::filter::{FilterSelection, IdentityFilter};
use crate::domain::entities::grid::RawGrid;
use crate::domain::entities::period::PeriodAggregates;
use crate::domain::entities::table::{Table, TidyRecord};
use crate::domain::error::DashboardError;
use crate::domain::transform::canonical::{select_year, YearSelection};
use crate::domain::transform::filter;
use crate::domain::transform::parts::{build_part_table, label_trends, top_parts};
use crate::domain::transform::period::aggregate_periods;
use crate::domain::transform::region::{
    build_share_table, build_value_table, latest_shares, LatestShares,
};
use crate::domain::transform::trend::{
    exponential_trend, linear_trend, monthly_series, ExponentialTrend, MonthlyPoint,
};
use crate::infra::cache::ttl::TtlCache;
use crate::usecase::ports::source::{ReadOptions, WorkbookSource};

#[derive(Debug, Clone, Serialize)]
pub struct RegionView {
    pub shares: Table,
    pub records: Vec<TidyRecord>,
    pub latest: Option<LatestShares>,
    pub islands: Vec<String>,
    pub provinces: Vec<String>,
    pub routes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetCounter {
    pub sheet: String,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NationalSummary {
    pub periods: PeriodAggregates,
    pub counters: Vec<SheetCounter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartQuery {
    pub identity: IdentityFilter,
    pub year: YearSelection,
    pub top_n: usize,
}

impl Default for PartQuery {
    fn default() -> Self {
        Self {
            identity: IdentityFilter::default(),
            year: YearSelection::All,
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartView {
    pub table: Table,
    pub branches: Vec<String>,
    pub customer_ids: Vec<String>,
    pub customers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartTrend {
    pub part_number: String,
    pub points: Vec<MonthlyPoint>,
    /// Yearly growth as a fraction of the mean annual total.
    pub linear: f64,
    pub exponential: Option<ExponentialTrend>,
}

/// Builds every dashboard view from one workbook source. Raw sheets are kept
/// for the configured TTL, so repeated views within a session read each sheet
/// once.
pub struct ReportService<S> {
    source: S,
    config: DashboardConfig,
    sheets: TtlCache<(String, ReadOptions), RawGrid>,
}

impl<S: WorkbookSource> ReportService<S> {
    pub fn new(source: S, config: DashboardConfig) -> Self {
        let sheets = TtlCache::new(config.cache_ttl);
        Self {
            source,
            config,
            sheets,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    fn sheet(&mut self, name: &str, options: ReadOptions) -> Result<RawGrid, DashboardError> {
        let source = &self.source;
        self.sheets
            .get_or_try_insert_with(&(name.to_string(), options), Utc::now(), || {
                source.read_sheet(name, &options)
            })
    }

    pub fn region_shares(&mut self) -> Result<Table, DashboardError> {
        let layout = self.config.region_layout;
        let name = self.config.sheets.regions.clone();
        let grid = self.sheet(&name, ReadOptions::default())?;
        let block = grid.slice_rows(0, layout.share_end_row);
        Ok(build_share_table(&block, layout.share_header_row))
    }

    pub fn region_values(&mut self) -> Result<Table, DashboardError> {
        let layout = self.config.region_layout;
        let name = self.config.sheets.regions.clone();
        let grid = self.sheet(&name, ReadOptions::default())?;
        Ok(build_value_table(&grid, layout.value_header_row))
    }

    pub fn region_view(&mut self, selection: &FilterSelection) -> Result<RegionView, DashboardError> {
        let shares = self.region_shares()?;
        let filtered = filter::apply(&shares, selection);

        let view = RegionView {
            records: filtered.to_records(),
            latest: latest_shares(&filtered),
            islands: filter::options(&shares, Field::Island),
            provinces: filter::province_options(&shares, &selection.island),
            routes: filter::options(&shares, Field::Route),
            shares: filtered,
        };
        info!(rows = view.records.len(), "built region view");
        Ok(view)
    }

    pub fn national_summary(&mut self) -> Result<NationalSummary, DashboardError> {
        let name = self.config.sheets.national.clone();
        let grid = self.sheet(&name, ReadOptions::default())?;
        let categories: Vec<&str> = Route::ALL.iter().map(|r| r.as_str()).collect();
        let periods = aggregate_periods(&grid, &name, &categories)?;

        let counted = [
            self.config.sheets.national.clone(),
            self.config.sheets.provinces.clone(),
            self.config.sheets.regions.clone(),
            self.config.sheets.variants.clone(),
        ];
        let mut counters = Vec::with_capacity(counted.len());
        for sheet in counted {
            match self.sheet(&sheet, ReadOptions::default()) {
                Ok(grid) => counters.push(count_sheet(sheet, &grid)),
                Err(DashboardError::SheetNotFound { sheet }) => {
                    warn!(sheet = %sheet, "counter sheet missing");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(NationalSummary { periods, counters })
    }

    pub fn parts(&mut self) -> Result<Table, DashboardError> {
        let name = self.config.sheets.parts.clone();
        let grid = self.sheet(&name, ReadOptions::skip(self.config.part_layout.skip_rows))?;
        Ok(build_part_table(&grid, &self.config.part_layout.dropped_columns))
    }

    pub fn part_view(&mut self, query: &PartQuery) -> Result<PartView, DashboardError> {
        let parts = self.parts()?;
        let filtered = filter::apply_identity(&parts, &query.identity);
        let by_year = select_year(&filtered, query.year, &self.config.year_blocks);
        let table = label_trends(&top_parts(&by_year, query.top_n));

        Ok(PartView {
            table,
            branches: filter::options(&parts, Field::Branch),
            customer_ids: filter::options(&parts, Field::CustomerId),
            customers: filter::options(&parts, Field::Customer),
        })
    }

    pub fn part_numbers(&mut self) -> Result<Vec<String>, DashboardError> {
        Ok(filter::options(&self.parts()?, Field::PartNumber))
    }

    /// Monthly series and trends of the first row carrying `part_number`.
    pub fn part_trend(
        &mut self,
        part_number: &str,
        year: YearSelection,
    ) -> Result<Option<PartTrend>, DashboardError> {
        let parts = self.parts()?;
        let wanted = part_number.trim();
        let Some(row_idx) = parts
            .field(Field::PartNumber)
            .and_then(|column| column.values.iter().position(|v| v.display() == wanted))
        else {
            return Ok(None);
        };

        let blocks = self.config.year_blocks;
        let years = match year {
            YearSelection::All => blocks.years(),
            YearSelection::Year(year) => vec![year],
        };
        let points = monthly_series(&parts, row_idx, &years, &blocks);

        Ok(Some(PartTrend {
            part_number: wanted.to_string(),
            linear: linear_trend(&points),
            exponential: exponential_trend(&points),
            points,
        }))
    }
}

/// Every row below the header, blank interior rows included, and the
/// number of labelled header cells.
fn count_sheet(sheet: String, grid: &RawGrid) -> SheetCounter {
    let rows = grid.len().saturating_sub(1);
    let columns = grid
        .row(0)
        .map(|header| header.iter().filter(|c| !c.is_blank()).count())
        .unwrap_or(0);
    SheetCounter {
        sheet,
        rows,
        columns,
    }
}
