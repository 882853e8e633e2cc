use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use bip_dashboard::config::{DashboardConfig, WorkbookLocation, DEFAULT_TOP_N};
use bip_dashboard::domain::entities::field::Field;
use bip_dashboard::domain::entities::filter::{FilterSelection, IdentityFilter, Selection};
use bip_dashboard::domain::entities::grid::Cell;
use bip_dashboard::domain::entities::period::{Shares, Year};
use bip_dashboard::domain::entities::table::Table;
use bip_dashboard::domain::error::DashboardError;
use bip_dashboard::domain::transform::canonical::YearSelection;
use bip_dashboard::domain::transform::cells::{format_share, format_whole_number};
use bip_dashboard::infra::fetch::remote::{HttpDownloader, WorkbookCache};
use bip_dashboard::infra::import::csv::CsvWorkbook;
use bip_dashboard::infra::import::xlsx::XlsxWorkbook;
use bip_dashboard::usecase::ports::source::WorkbookSource;
use bip_dashboard::usecase::services::explorer_service::ExplorerService;
use bip_dashboard::usecase::services::report_service::{
    NationalSummary, PartQuery, PartTrend, PartView, RegionView, ReportService,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(about = "Revenue share and top part reports from the BIP workbook.")]
struct Cli {
    /// Workbook file, directory of `<sheet>.csv` files, or http(s) URL.
    /// Overrides `BIP_WORKBOOK`.
    #[arg(long, global = true)]
    workbook: Option<String>,

    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// National DIRECT / TASTI shares by year, semester and quarter.
    Summary,
    /// Island, province and city shares. Repeat a filter flag to accept several values.
    Regions {
        #[arg(long)]
        island: Vec<String>,
        #[arg(long)]
        province: Vec<String>,
        #[arg(long)]
        route: Vec<String>,
        /// Show the revenue value block instead of shares.
        #[arg(long)]
        values: bool,
    },
    /// Top parts per customer.
    Parts {
        #[arg(long, default_value = "ALL")]
        branch: String,
        #[arg(long, default_value = "ALL")]
        customer_id: String,
        #[arg(long, default_value = "ALL")]
        customer: String,
        #[arg(long)]
        year: Option<u16>,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        /// Print the distinct part numbers instead of the table.
        #[arg(long)]
        list: bool,
    },
    /// Monthly series and growth trend of one part number.
    Trend {
        part: String,
        #[arg(long)]
        year: Option<u16>,
    },
    /// Summary, regions and parts in one run. A failing view is reported and skipped.
    Dashboard,
    /// Sheet names of the workbook.
    Sheets,
    /// First rows of any sheet.
    Explore { sheet: String },
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = DashboardConfig::from_env();
    if let Some(workbook) = &cli.workbook {
        config.workbook = WorkbookLocation::parse(workbook);
    }
    info!(workbook = ?config.workbook, "startup");

    let source = open_source(&config)?;
    let format = cli.format;
    match cli.command {
        Command::Sheets => {
            let explorer = ExplorerService::new(&source, config.explorer_max_rows);
            let sheets = explorer.list_sheets().context("failed to list sheets")?;
            emit(format, &sheets, || sheets.join("\n"))
        }
        Command::Explore { sheet } => {
            let explorer = ExplorerService::new(&source, config.explorer_max_rows);
            let preview = explorer
                .preview(&sheet)
                .with_context(|| format!("failed to preview sheet: {sheet}"))?;
            emit(format, &preview, || {
                let mut out = render_rows(&preview.columns, &preview.rows);
                if preview.is_truncated() {
                    out.push_str(&format!(
                        "\n({} of {} rows shown)",
                        preview.rows.len(),
                        preview.total_rows
                    ));
                }
                out
            })
        }
        Command::Summary => {
            let mut service = ReportService::new(&source, config);
            let summary = service
                .national_summary()
                .context("failed to build national summary")?;
            emit(format, &summary, || render_summary(&summary))
        }
        Command::Regions {
            island,
            province,
            route,
            values,
        } => {
            let mut service = ReportService::new(&source, config);
            if values {
                let table = service
                    .region_values()
                    .context("failed to build region values")?;
                return emit(format, &table, || {
                    render_table(&table, |_, v| format_whole_number(v))
                });
            }
            let selection = FilterSelection {
                island: selection_from_values(island),
                province: selection_from_values(province),
                route: selection_from_values(route),
            };
            let view = service
                .region_view(&selection)
                .context("failed to build region view")?;
            emit(format, &view, || render_regions(&view))
        }
        Command::Parts {
            branch,
            customer_id,
            customer,
            year,
            top,
            list,
        } => {
            let mut service = ReportService::new(&source, config);
            if list {
                let numbers = service
                    .part_numbers()
                    .context("failed to list part numbers")?;
                return emit(format, &numbers, || numbers.join("\n"));
            }
            let query = PartQuery {
                identity: IdentityFilter {
                    branch: Selection::from_choice(&branch),
                    customer_id: Selection::from_choice(&customer_id),
                    customer: Selection::from_choice(&customer),
                },
                year: year_selection(year),
                top_n: top,
            };
            let view = service
                .part_view(&query)
                .context("failed to build part view")?;
            emit(format, &view, || render_parts(&view))
        }
        Command::Trend { part, year } => {
            let mut service = ReportService::new(&source, config);
            let trend = service
                .part_trend(&part, year_selection(year))
                .with_context(|| format!("failed to build trend for part: {part}"))?
                .with_context(|| format!("part number not found: {part}"))?;
            emit(format, &trend, || render_trend(&trend))
        }
        Command::Dashboard => run_dashboard(source.as_ref(), config, format),
    }
}

fn open_source(config: &DashboardConfig) -> Result<Box<dyn WorkbookSource>> {
    match &config.workbook {
        WorkbookLocation::Local(path) if path.is_dir() => Ok(Box::new(CsvWorkbook::new(path))),
        WorkbookLocation::Local(path) => Ok(Box::new(XlsxWorkbook::new(path))),
        WorkbookLocation::Remote(url) => {
            let downloader = HttpDownloader::new(config.fetch_timeout)?;
            let cache = WorkbookCache::new(
                downloader,
                url,
                &config.cache_dir,
                config.cache_ttl,
                config.min_workbook_bytes,
            );
            let path: PathBuf = cache
                .ensure_local(Utc::now())
                .with_context(|| format!("failed to fetch workbook: {url}"))?;
            Ok(Box::new(XlsxWorkbook::new(path)))
        }
    }
}

/// Every view once; a view-level failure is logged and the rest still render.
fn run_dashboard(
    source: &dyn WorkbookSource,
    config: DashboardConfig,
    format: OutputFormat,
) -> Result<()> {
    let top_n = config.top_n;
    let mut service = ReportService::new(source, config);

    let summary = keep_going("national summary", service.national_summary())?;
    let regions = keep_going("region view", service.region_view(&FilterSelection::default()))?;
    let query = PartQuery {
        top_n,
        ..PartQuery::default()
    };
    let parts = keep_going("part view", service.part_view(&query))?;

    #[derive(Serialize)]
    struct Dashboard<'a> {
        summary: &'a Option<NationalSummary>,
        regions: &'a Option<RegionView>,
        parts: &'a Option<PartView>,
    }
    let dashboard = Dashboard {
        summary: &summary,
        regions: &regions,
        parts: &parts,
    };
    emit(format, &dashboard, || {
        let mut sections = Vec::new();
        if let Some(summary) = &summary {
            sections.push(format!("== National summary ==\n{}", render_summary(summary)));
        }
        if let Some(regions) = &regions {
            sections.push(format!("== Regions ==\n{}", render_regions(regions)));
        }
        if let Some(parts) = &parts {
            sections.push(format!("== Top parts ==\n{}", render_parts(parts)));
        }
        sections.join("\n\n")
    })
}

fn keep_going<T>(view: &str, result: Result<T, DashboardError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal_for_session() => Err(err).context(format!("failed to build {view}")),
        Err(err) => {
            error!(view, error = %err, "view unavailable");
            Ok(None)
        }
    }
}

fn selection_from_values(values: Vec<String>) -> Selection {
    if values.is_empty() {
        Selection::All
    } else {
        Selection::only(values)
    }
}

fn year_selection(year: Option<u16>) -> YearSelection {
    year.map_or(YearSelection::All, |y| YearSelection::Year(Year(y)))
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).context("failed to encode json")?;
            println!("{json}");
        }
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

fn render_rows(header: &[String], rows: &[Vec<String>]) -> String {
    let width = |idx: usize| {
        rows.iter()
            .filter_map(|row| row.get(idx))
            .chain(header.get(idx))
            .map(|v| v.chars().count())
            .max()
            .unwrap_or(0)
    };
    let widths: Vec<usize> = (0..header.len()).map(width).collect();
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(header)];
    out.extend(rows.iter().map(|row| line(row.as_slice())));
    out.join("\n")
}

/// Text rendering of a table; numbers go through `number` with their column label.
fn render_table(table: &Table, number: impl Fn(&str, f64) -> String) -> String {
    let header: Vec<String> = table.labels().into_iter().map(str::to_string).collect();
    let rows: Vec<Vec<String>> = (0..table.row_count())
        .map(|idx| {
            table
                .columns()
                .iter()
                .map(|column| match column.values.get(idx) {
                    Some(Cell::Number(v)) => number(&column.label, *v),
                    Some(cell) => cell.display(),
                    None => String::new(),
                })
                .collect()
        })
        .collect();
    render_rows(&header, &rows)
}

fn render_shares<K: ToString>(periods: impl Iterator<Item = (K, Shares)>) -> String {
    let header = vec!["Period".to_string(), "DIRECT".to_string(), "TASTI".to_string()];
    let rows: Vec<Vec<String>> = periods
        .map(|(period, shares)| {
            let share = |key: &str| shares.get(key).map(|v| format_share(*v)).unwrap_or_default();
            vec![period.to_string(), share("DIRECT"), share("TASTI")]
        })
        .collect();
    render_rows(&header, &rows)
}

fn render_summary(summary: &NationalSummary) -> String {
    let periods = &summary.periods;
    let counters: Vec<Vec<String>> = summary
        .counters
        .iter()
        .map(|c| vec![c.sheet.clone(), c.rows.to_string(), c.columns.to_string()])
        .collect();
    [
        render_shares(periods.by_year.iter().map(|(k, v)| (*k, v.clone()))),
        render_shares(periods.by_semester.iter().map(|(k, v)| (*k, v.clone()))),
        render_shares(periods.by_quarter.iter().map(|(k, v)| (*k, v.clone()))),
        render_rows(
            &["Sheet".to_string(), "Rows".to_string(), "Columns".to_string()],
            &counters,
        ),
    ]
    .join("\n\n")
}

fn render_regions(view: &RegionView) -> String {
    let mut out = render_table(&view.shares, |_, v| format_share(v));
    if let Some(latest) = &view.latest {
        let routes: Vec<String> = latest
            .by_route
            .iter()
            .map(|(route, share)| format!("{route} {}", format_share(*share)))
            .collect();
        out.push_str(&format!("\n\nLatest ({}): {}", latest.period, routes.join(", ")));
    }
    out
}

fn render_parts(view: &PartView) -> String {
    render_table(&view.table, |label, v| {
        if label == Field::PartNumber.label() {
            Cell::Number(v).display()
        } else {
            format_whole_number(v)
        }
    })
}

fn render_trend(trend: &PartTrend) -> String {
    let header = vec!["Month".to_string(), "Value".to_string()];
    let rows: Vec<Vec<String>> = trend
        .points
        .iter()
        .map(|p| vec![p.label.clone(), format_whole_number(p.value)])
        .collect();
    let exponential = trend
        .exponential
        .as_ref()
        .map(|e| format!("{:+.1}%", e.pct_change))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{}\n\nPart {}: linear {}/year, exponential {}",
        render_rows(&header, &rows),
        trend.part_number,
        format_share(trend.linear),
        exponential
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_column_width() {
        let header = vec!["Island".to_string(), "Share".to_string()];
        let rows = vec![vec!["BALI NT".to_string(), "12.0%".to_string()]];

        let text = render_rows(&header, &rows);

        assert_eq!(text, "Island   Share\nBALI NT  12.0%");
    }

    #[test]
    fn empty_filter_flags_select_everything() {
        assert_eq!(selection_from_values(Vec::new()), Selection::All);
        assert_eq!(
            selection_from_values(vec!["JAWA".to_string()]),
            Selection::only(["JAWA"])
        );
    }

    #[test]
    fn cli_parses_repeated_filters() {
        let cli = Cli::try_parse_from([
            "bip-dashboard",
            "regions",
            "--island",
            "JAWA",
            "--island",
            "BALI NT",
            "--format",
            "json",
        ])
        .expect("should parse");

        match cli.command {
            Command::Regions { island, .. } => assert_eq!(island, vec!["JAWA", "BALI NT"]),
            _ => panic!("expected regions command"),
        }
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn parts_list_flag_defaults_off() {
        let listed = Cli::try_parse_from(["bip-dashboard", "parts", "--list"]).expect("should parse");
        let table = Cli::try_parse_from(["bip-dashboard", "parts"]).expect("should parse");

        assert!(matches!(listed.command, Command::Parts { list: true, .. }));
        assert!(matches!(
            table.command,
            Command::Parts { list: false, top: DEFAULT_TOP_N, .. }
        ));
    }
}
