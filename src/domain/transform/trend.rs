//! Monthly series and growth trends for a single part.

use serde::Serialize;

use crate::domain::entities::grid::Cell;
use crate::domain::entities::period::{Month, Year, YearBlocks};
use crate::domain::entities::table::Table;
use crate::domain::transform::canonical::month_column;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// 1-based position in the series.
    pub index: usize,
    pub year: Year,
    /// `Jan-23`.
    pub label: String,
    pub value: f64,
}

/// Twelve points per year for the row at `row_idx`. Missing columns and blank
/// cells count as zero so every year spans the full calendar.
pub fn monthly_series(
    table: &Table,
    row_idx: usize,
    years: &[Year],
    blocks: &YearBlocks,
) -> Vec<MonthlyPoint> {
    let mut points = Vec::with_capacity(years.len() * 12);
    for year in years {
        for month in Month::ALL {
            let value = month_column(table, month, *year, blocks)
                .and_then(|c| c.values.get(row_idx))
                .and_then(Cell::as_number)
                .unwrap_or(0.0);
            points.push(MonthlyPoint {
                index: points.len() + 1,
                year: *year,
                label: format!("{}-{:02}", month.short_name(), year.0 % 100),
                value,
            });
        }
    }
    points
}

/// Least-squares slope and intercept of `ys` over `xs`.
fn fit_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len() as f64;
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (num, den) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            (num + (x - mean_x) * (y - mean_y), den + (x - mean_x).powi(2))
        });
    if den == 0.0 {
        return None;
    }
    let slope = num / den;
    Some((slope, mean_y - slope * mean_x))
}

/// Yearly growth as a fraction of the mean annual total.
///
/// Annual sums are regressed on the year number; the slope is divided by the
/// mean annual sum. Zero with fewer than two years or a zero mean.
pub fn linear_trend(points: &[MonthlyPoint]) -> f64 {
    let mut annual: Vec<(Year, f64)> = Vec::new();
    for point in points {
        match annual.last_mut() {
            Some((year, sum)) if *year == point.year => *sum += point.value,
            _ => annual.push((point.year, point.value)),
        }
    }

    let xs: Vec<f64> = annual.iter().map(|(y, _)| f64::from(y.0)).collect();
    let ys: Vec<f64> = annual.iter().map(|(_, v)| *v).collect();
    let mean = ys.iter().sum::<f64>() / ys.len().max(1) as f64;
    if mean == 0.0 {
        return 0.0;
    }
    fit_line(&xs, &ys).map_or(0.0, |(slope, _)| slope / mean)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExponentialTrend {
    /// `A·e^(k·x)` evaluated at every point of the series.
    pub fitted: Vec<f64>,
    pub rate: f64,
    /// Percent change between the first and last fitted values.
    pub pct_change: f64,
}

/// Fits `ln y = ln A + k·x` over the positive points. `None` with fewer than
/// two of them.
pub fn exponential_trend(points: &[MonthlyPoint]) -> Option<ExponentialTrend> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = points
        .iter()
        .filter(|p| p.value > 0.0)
        .map(|p| (p.index as f64, p.value.ln()))
        .unzip();
    let (rate, log_a) = fit_line(&xs, &ys)?;

    let fitted: Vec<f64> = points
        .iter()
        .map(|p| (log_a + rate * p.index as f64).exp())
        .collect();
    let first = fitted.first().copied().unwrap_or(0.0);
    let last = fitted.last().copied().unwrap_or(0.0);
    let pct_change = if first == 0.0 {
        0.0
    } else {
        (last - first) / first.abs() * 100.0
    };

    Some(ExponentialTrend {
        fitted,
        rate,
        pct_change,
    })
}
