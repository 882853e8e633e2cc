use crate::domain::entities::grid::Cell;

/// Values above this are whole-number percents; at or below they are fractions.
pub const FRACTION_THRESHOLD: f64 = 1.5;

/// Label that closes a block of identity rows in pivot exports.
pub const GRAND_TOTAL: &str = "GRAND TOTAL";

/// Coerces a share cell into a fraction. Never fails: anything unparsable is blank.
pub fn parse_percent(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Empty => return None,
        Cell::Number(v) => finite(*v)?,
        Cell::Text(text) => parse_numeric_text(text)?,
    };
    Some(scale_share(value))
}

/// Coerces a monetary or count cell. `%` and grouping separators are ignored.
pub fn parse_whole_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(v) => finite(*v),
        Cell::Text(text) => parse_numeric_text(text),
    }
}

fn scale_share(value: f64) -> f64 {
    if value > FRACTION_THRESHOLD {
        value / 100.0
    } else {
        value
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().and_then(finite)
}

/// Route labels are compared uppercased.
pub fn normalize_route(cell: &Cell) -> Option<String> {
    cell.as_text().map(str::to_uppercase)
}

pub fn is_grand_total(cell: &Cell) -> bool {
    cell.as_text()
        .is_some_and(|v| v.eq_ignore_ascii_case(GRAND_TOTAL))
}

/// `0.123` → `12.3%`.
pub fn format_share(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Rounds to the nearest integer and groups thousands: `1234.6` → `1,235`.
pub fn format_whole_number(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Growth indicator for the part table's trend column.
pub fn format_trend(cell: &Cell) -> String {
    let Some(value) = parse_whole_number(cell) else {
        return String::new();
    };
    let pct = if value.abs() < FRACTION_THRESHOLD {
        value * 100.0
    } else {
        value
    };
    let pct = pct.round() as i64;
    match pct.signum() {
        1 => format!("🔺 {pct}%"),
        -1 => format!("🔻 {}%", pct.abs()),
        _ => "0%".to_string(),
    }
}
