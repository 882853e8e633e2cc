//! Maps loosely named and duplicated source columns onto the canonical schema.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::entities::field::Field;
use crate::domain::entities::grid::Cell;
use crate::domain::entities::period::{Month, Year, YearBlocks};
use crate::domain::entities::table::{Column, Table};
use crate::domain::transform::cells::{is_grand_total, parse_whole_number};

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Contains(&'static [&'static str]),
    Exact(&'static str),
}

impl Matcher {
    fn matches(self, lowered: &str) -> bool {
        match self {
            Matcher::Contains(needles) => needles.iter().any(|n| lowered.contains(n)),
            Matcher::Exact(expected) => lowered == expected,
        }
    }
}

/// Evaluated top to bottom; the first matching rule names the column.
const RULES: &[(Matcher, Field)] = &[
    (Matcher::Contains(&["pulau", "island"]), Field::Island),
    (Matcher::Contains(&["prov"]), Field::Province),
    (Matcher::Contains(&["kab", "kota", "city"]), Field::City),
    (Matcher::Contains(&["route"]), Field::Route),
    (Matcher::Contains(&["part"]), Field::PartNumber),
    (
        Matcher::Contains(&["customer no", "cust no", "customer id", "id code"]),
        Field::CustomerId,
    ),
    (
        Matcher::Contains(&["cust name", "customer name"]),
        Field::CustomerName,
    ),
    (Matcher::Exact("customer"), Field::Customer),
    (Matcher::Contains(&["branch"]), Field::Branch),
    (Matcher::Contains(&["trend", "tren"]), Field::Trend),
    (Matcher::Contains(&["type"]), Field::RecordType),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodBase {
    Month(Month),
    GrandTotal,
}

/// A month or grand-total column inside a year-suffixed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodColumn {
    pub base: PeriodBase,
    pub block: u16,
}

impl PeriodColumn {
    /// `January` is block 0, `January.2` is block 2.
    pub fn parse(label: &str) -> Option<PeriodColumn> {
        let label = label.trim();
        let (base, block) = match label.rsplit_once('.') {
            Some((base, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
                (base, suffix.parse().ok()?)
            }
            _ => (label, 0),
        };
        let base = if base.eq_ignore_ascii_case(Field::GrandTotal.label()) {
            PeriodBase::GrandTotal
        } else {
            PeriodBase::Month(Month::from_name(base)?)
        };
        Some(PeriodColumn { base, block })
    }

    pub fn label(&self) -> String {
        let base = match self.base {
            PeriodBase::Month(month) => month.name(),
            PeriodBase::GrandTotal => Field::GrandTotal.label(),
        };
        if self.block == 0 {
            base.to_string()
        } else {
            format!("{base}.{}", self.block)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelClass {
    Field(Field),
    Period(PeriodColumn),
    Other,
}

pub fn classify_label(label: &str) -> LabelClass {
    if let Some(period) = PeriodColumn::parse(label) {
        return LabelClass::Period(period);
    }
    let lowered = label.trim().to_lowercase();
    if lowered.is_empty() {
        return LabelClass::Other;
    }
    RULES
        .iter()
        .find(|(matcher, _)| matcher.matches(&lowered))
        .map_or(LabelClass::Other, |(_, field)| LabelClass::Field(*field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Blank cells inherit the nearest value above.
    Plain,
    /// As `Plain`, but a `GRAND TOTAL` cell is nulled and stops inheritance for
    /// the rest of the column.
    UntilSentinel,
}

#[derive(Debug, Clone, Copy)]
pub struct CanonicalOptions {
    pub fill_mode: FillMode,
    pub fill_fields: &'static [Field],
    /// Columns whose combined value bounds a fill-down. A `Plain` fill
    /// restarts whenever the key changes. Scope columns are filled first.
    pub fill_scope: &'static [Field],
    pub preferred_order: &'static [Field],
    pub coerce_periods: bool,
}

impl CanonicalOptions {
    /// Customer and part pivots.
    pub fn parts() -> Self {
        Self {
            fill_mode: FillMode::UntilSentinel,
            fill_fields: &[Field::CustomerId, Field::Customer, Field::Branch],
            fill_scope: &[],
            preferred_order: &[
                Field::Branch,
                Field::CustomerId,
                Field::Customer,
                Field::PartNumber,
            ],
            coerce_periods: true,
        }
    }

    /// Island / province / city sheets.
    pub fn regions() -> Self {
        Self {
            fill_mode: FillMode::Plain,
            fill_fields: &[Field::Island, Field::Province],
            fill_scope: &[Field::Island],
            preferred_order: &[
                Field::Island,
                Field::Province,
                Field::City,
                Field::Route,
                Field::RecordType,
            ],
            coerce_periods: false,
        }
    }
}

/// Produces a copy of `table` with canonical, unique column labels.
///
/// A table with no recognizable geography or identity column is returned
/// unchanged; the caller decides whether it is usable.
pub fn canonicalize(table: &Table, options: &CanonicalOptions) -> Table {
    let classes: Vec<LabelClass> = table
        .columns()
        .iter()
        .map(|c| classify_label(&c.label))
        .collect();
    if !classes.iter().any(|c| matches!(c, LabelClass::Field(_))) {
        debug!(labels = ?table.labels(), "no canonical columns recognized");
        return table.clone();
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(table.columns().len());
    for (column, class) in table.columns().iter().zip(&classes) {
        let label = match class {
            LabelClass::Field(field) => field.label().to_string(),
            LabelClass::Period(period) => period.label(),
            LabelClass::Other => column.label.trim().to_string(),
        };
        if !seen.insert(label.clone()) {
            debug!(source = %column.label, canonical = %label, "dropping duplicate column");
            continue;
        }
        let values = match class {
            LabelClass::Period(_) if options.coerce_periods => column
                .values
                .iter()
                .map(|v| parse_whole_number(v).map_or(Cell::Empty, Cell::Number))
                .collect(),
            _ => column.values.clone(),
        };
        columns.push(Column::new(label, values));
    }

    merge_customer_name(&mut columns);

    let fill = |column: &mut Column, groups: &[String]| {
        column.values = match options.fill_mode {
            FillMode::Plain => fill_down_within(&column.values, groups),
            FillMode::UntilSentinel => fill_down_until_sentinel(&column.values),
        };
    };
    let wanted = |column: &Column, scope: bool| {
        Field::from_label(&column.label).is_some_and(|field| {
            options.fill_fields.contains(&field) && options.fill_scope.contains(&field) == scope
        })
    };

    for column in columns.iter_mut().filter(|c| wanted(&**c, true)) {
        fill(column, &[]);
    }
    let groups = group_keys(&columns, options.fill_scope);
    for column in columns.iter_mut().filter(|c| wanted(&**c, false)) {
        fill(column, &groups);
    }

    Table::new(reorder(columns, options.preferred_order))
}

/// The customer name column, when present, becomes the customer column.
fn merge_customer_name(columns: &mut Vec<Column>) {
    let Some(name_idx) = columns
        .iter()
        .position(|c| c.label == Field::CustomerName.label())
    else {
        return;
    };
    let names = columns.remove(name_idx);
    match columns
        .iter_mut()
        .find(|c| c.label == Field::Customer.label())
    {
        Some(customer) => customer.values = names.values,
        None => columns.push(Column::new(Field::Customer.label(), names.values)),
    }
}

fn normalized(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(v) => Cell::Text(v.trim().to_string()),
        other => other.clone(),
    }
}

/// Blank cells inherit the nearest value above, never across a change of
/// group. `groups[i]` keys row `i`; rows past the end of `groups` share one
/// group, so an empty slice fills the whole column.
pub fn fill_down_within(values: &[Cell], groups: &[String]) -> Vec<Cell> {
    let mut last = Cell::Empty;
    let mut current: Option<&str> = None;
    values
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let group = groups.get(idx).map(String::as_str);
            if idx > 0 && group != current {
                last = Cell::Empty;
            }
            current = group;
            if !cell.is_blank() {
                last = normalized(cell);
            }
            last.clone()
        })
        .collect()
}

/// Per-row key built from the values of `fields`, in order.
pub fn group_keys(columns: &[Column], fields: &[Field]) -> Vec<String> {
    let scoped: Vec<&Column> = fields
        .iter()
        .filter_map(|field| columns.iter().find(|c| c.label == field.label()))
        .collect();
    if scoped.is_empty() {
        return Vec::new();
    }
    let rows = scoped.iter().map(|c| c.values.len()).max().unwrap_or(0);
    (0..rows)
        .map(|idx| {
            scoped
                .iter()
                .map(|c| c.values.get(idx).map(Cell::display).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\u{1f}")
        })
        .collect()
}

pub fn fill_down_until_sentinel(values: &[Cell]) -> Vec<Cell> {
    let mut last = Cell::Empty;
    let mut halted = false;
    values
        .iter()
        .map(|cell| {
            if is_grand_total(cell) {
                halted = true;
                return Cell::Empty;
            }
            if !cell.is_blank() {
                let value = normalized(cell);
                if !halted {
                    last = value.clone();
                }
                value
            } else if halted {
                Cell::Empty
            } else {
                last.clone()
            }
        })
        .collect()
}

/// Preferred identity columns first, `Trend` last, everything else in source order.
fn reorder(columns: Vec<Column>, preferred: &[Field]) -> Vec<Column> {
    let mut front: Vec<Option<Column>> = vec![None; preferred.len()];
    let mut middle = Vec::new();
    let mut trend = None;

    for column in columns {
        match Field::from_label(&column.label) {
            Some(Field::Trend) => trend = Some(column),
            Some(field) => match preferred.iter().position(|p| *p == field) {
                Some(slot) => front[slot] = Some(column),
                None => middle.push(column),
            },
            None => middle.push(column),
        }
    }

    front
        .into_iter()
        .flatten()
        .chain(middle)
        .chain(trend)
        .collect()
}

/// Columns of a canonical table that belong to a period block.
pub fn period_columns(table: &Table) -> Vec<(PeriodColumn, &Column)> {
    table
        .columns()
        .iter()
        .filter_map(|c| PeriodColumn::parse(&c.label).map(|p| (p, c)))
        .collect()
}

/// Resolves "month M of year Y" to the column of the matching block.
pub fn month_column<'a>(
    table: &'a Table,
    month: Month,
    year: Year,
    blocks: &YearBlocks,
) -> Option<&'a Column> {
    let suffix = blocks.suffix_for(year)?;
    table.column(&format!("{}{suffix}", month.name()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearSelection {
    #[default]
    All,
    Year(Year),
}

/// Identity columns plus the selected period columns, `Trend` last.
///
/// A single year keeps that block's twelve months under bare month names.
/// `All` keeps every period column under its source label.
pub fn select_year(table: &Table, selection: YearSelection, blocks: &YearBlocks) -> Table {
    let identity = [
        Field::Branch,
        Field::CustomerId,
        Field::Customer,
        Field::PartNumber,
    ];
    let mut columns: Vec<Column> = identity
        .iter()
        .filter_map(|f| table.field(*f).cloned())
        .collect();

    match selection {
        YearSelection::All => {
            columns.extend(period_columns(table).into_iter().map(|(_, c)| c.clone()));
        }
        YearSelection::Year(year) => {
            for month in Month::ALL {
                if let Some(column) = month_column(table, month, year, blocks) {
                    columns.push(Column::new(month.name(), column.values.clone()));
                }
            }
        }
    }

    if let Some(trend) = table.field(Field::Trend) {
        columns.push(trend.clone());
    }
    Table::new(columns)
}
