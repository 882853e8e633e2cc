use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::warn;

use crate::domain::entities::period::YearBlocks;

pub const DEFAULT_WORKBOOK: &str = "BIP Dash.xlsx";
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookLocation {
    Local(PathBuf),
    Remote(String),
}

impl WorkbookLocation {
    /// `http://` and `https://` values are remote, anything else is a path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let lowered = value.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            WorkbookLocation::Remote(value.to_string())
        } else {
            WorkbookLocation::Local(PathBuf::from(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub regions: String,
    pub national: String,
    pub provinces: String,
    pub variants: String,
    pub parts: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            regions: "RevbyKab".to_string(),
            national: "RevbyNat".to_string(),
            provinces: "RevbyProv".to_string(),
            variants: "PN Varians".to_string(),
            parts: "Top10Part".to_string(),
        }
    }
}

/// Row positions inside the region sheet. The share block occupies rows
/// `[0, share_end_row)`; the value block starts at `value_header_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    pub share_header_row: usize,
    pub share_end_row: usize,
    pub value_header_row: usize,
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self {
            share_header_row: 3,
            share_end_row: 358,
            value_header_row: 364,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLayout {
    pub skip_rows: usize,
    /// Column positions removed before the header is interpreted.
    pub dropped_columns: Vec<usize>,
}

impl Default for PartLayout {
    fn default() -> Self {
        Self {
            skip_rows: 5,
            dropped_columns: std::iter::once(1).chain(43..48).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub workbook: WorkbookLocation,
    pub cache_dir: PathBuf,
    pub cache_ttl: chrono::Duration,
    pub fetch_timeout: Duration,
    pub min_workbook_bytes: u64,
    pub sheets: SheetNames,
    pub region_layout: RegionLayout,
    pub part_layout: PartLayout,
    pub year_blocks: YearBlocks,
    pub explorer_max_rows: usize,
    pub top_n: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            workbook: WorkbookLocation::Local(PathBuf::from(DEFAULT_WORKBOOK)),
            cache_dir: default_cache_dir(),
            cache_ttl: chrono::Duration::seconds(600),
            fetch_timeout: Duration::from_secs(60),
            min_workbook_bytes: 10 * 1024,
            sheets: SheetNames::default(),
            region_layout: RegionLayout::default(),
            part_layout: PartLayout::default(),
            year_blocks: YearBlocks::default(),
            explorer_max_rows: 3000,
            top_n: DEFAULT_TOP_N,
        }
    }
}

pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("com", "hellhbbd", "bip-dashboard")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("bip-dashboard"))
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `BIP_*` variables. Values that do not parse are
    /// logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("BIP_WORKBOOK").filter(|v| !v.trim().is_empty()) {
            config.workbook = WorkbookLocation::parse(&value);
        }
        if let Some(value) = lookup("BIP_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
            config.cache_dir = PathBuf::from(value);
        }
        if let Some(secs) = parse_secs(&lookup, "BIP_CACHE_TTL_SECS") {
            config.cache_ttl = chrono::Duration::seconds(secs as i64);
        }
        if let Some(secs) = parse_secs(&lookup, "BIP_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u32>() {
        Ok(secs) => Some(u64::from(secs)),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring invalid setting");
            None
        }
    }
}
