use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bip_dashboard::config::DashboardConfig;
use bip_dashboard::domain::entities::filter::{IdentityFilter, Selection};
use bip_dashboard::domain::entities::grid::{Cell, RawGrid};
use bip_dashboard::domain::entities::period::{Semester, Year};
use bip_dashboard::domain::error::DashboardError;
use bip_dashboard::domain::transform::canonical::YearSelection;
use bip_dashboard::infra::import::csv::CsvWorkbook;
use bip_dashboard::infra::import::memory::MemoryWorkbook;
use bip_dashboard::usecase::services::report_service::{PartQuery, ReportService};

const NATIONAL_CSV: &str = "\
Revenue share by route
Row Labels,23-Q1,23-Q2,23-Q3,23-Q4
DIRECT,0.9,0.7,0.8,0.6
TASTI,10%,30%,20%,40%
";

const PARTS_CSV: &str = "\
Top part report
Branch,x,Cust No,Cust Name,Part,January,February,January,February,Trend
Medan,,C1,Alpha,P1,10,20,30,40,0.5
,,,,P2,1,1,1,1,0
Jakarta,,C2,Beta,1001,5,5,5,5,-0.2
";

fn temp_workbook_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("bip-dashboard-it-{prefix}-{nanos}"));
    fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}

fn parts_config() -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.part_layout.skip_rows = 1;
    config.part_layout.dropped_columns = vec![1];
    config
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn national_summary_means_quarters_into_semesters_and_years() {
    let dir = temp_workbook_dir("national");
    fs::write(dir.join("RevbyNat.csv"), NATIONAL_CSV).expect("should write csv");
    let mut service = ReportService::new(CsvWorkbook::new(&dir), DashboardConfig::default());

    let summary = service.national_summary().expect("summary should build");
    let periods = &summary.periods;

    assert!(close(periods.by_year[&Year(2023)]["TASTI"], 0.25));
    let first_half = Semester {
        year: Year(2023),
        half: 1,
    };
    let second_half = Semester {
        year: Year(2023),
        half: 2,
    };
    assert!(close(periods.by_semester[&first_half]["TASTI"], 0.2));
    assert!(close(periods.by_semester[&second_half]["TASTI"], 0.3));
    assert!(close(periods.by_year[&Year(2023)]["DIRECT"], 0.75));
    assert_eq!(periods.by_quarter.len(), 4);
    assert_eq!(summary.counters.len(), 1);
    assert_eq!(summary.counters[0].sheet, "RevbyNat");

    fs::remove_dir_all(&dir).expect("should cleanup temp dir");
}

#[test]
fn part_view_and_trend_from_csv_pivot() {
    let dir = temp_workbook_dir("parts");
    fs::write(dir.join("Top10Part.csv"), PARTS_CSV).expect("should write csv");
    let mut service = ReportService::new(CsvWorkbook::new(&dir), parts_config());

    let view = service
        .part_view(&PartQuery {
            identity: IdentityFilter {
                customer: Selection::from_choice("Beta"),
                ..IdentityFilter::default()
            },
            year: YearSelection::Year(Year(2023)),
            top_n: 10,
        })
        .expect("part view should build");

    assert_eq!(view.table.row_count(), 1);
    assert_eq!(view.table.cell(0, "Branch"), Some(&Cell::from("Jakarta")));
    assert_eq!(view.table.cell(0, "January"), Some(&Cell::Number(5.0)));
    assert_eq!(view.branches, vec!["Jakarta", "Medan"]);

    let trend = service
        .part_trend("1001", YearSelection::Year(Year(2024)))
        .expect("trend should build")
        .expect("numeric part number should be found");
    assert_eq!(trend.points.len(), 12);
    assert_eq!(trend.points[0].label, "Jan-24");
    assert_eq!(trend.points[0].value, 5.0);
    assert_eq!(trend.points[11].value, 0.0, "missing months count as zero");

    fs::remove_dir_all(&dir).expect("should cleanup temp dir");
}

#[test]
fn one_failing_view_leaves_the_others_usable() {
    let national = RawGrid::new(vec![
        vec![Cell::from("Row Labels"), Cell::from("24-Q1")],
        vec![Cell::from("DIRECT"), Cell::Number(0.6)],
        vec![Cell::from("TASTI"), Cell::Number(0.4)],
    ]);
    let workbook = MemoryWorkbook::new().with_sheet("RevbyNat", national);
    let mut service = ReportService::new(workbook, DashboardConfig::default());

    let parts = service.part_view(&PartQuery::default());

    assert!(matches!(parts, Err(DashboardError::SheetNotFound { ref sheet }) if sheet == "Top10Part"));
    assert!(!parts.expect_err("parts should fail").is_fatal_for_session());
    assert!(service.national_summary().is_ok());
}
