use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    pub fn short_name(self) -> &'static str {
        &self.name()[..3]
    }

    pub fn from_name(name: &str) -> Option<Month> {
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Calendar year, e.g. `2023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Year(pub u16);

/// Half year; ordering is `(year, half)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Semester {
    pub year: Year,
    pub half: u8,
}

/// Quarter; ordering is `(year, number)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quarter {
    pub year: Year,
    pub number: u8,
}

impl Year {
    /// Two-digit years always belong to the 2000s.
    pub fn from_two_digits(yy: u16) -> Year {
        Year(2000 + yy)
    }
}

impl Quarter {
    pub fn new(year: Year, number: u8) -> Self {
        Self { year, number }
    }

    pub fn semester(self) -> Semester {
        Semester {
            year: self.year,
            half: if self.number <= 2 { 1 } else { 2 },
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-S{}", self.year, self.half)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-Q{}", self.year.0 % 100, self.number)
    }
}

macro_rules! serialize_as_label {
    ($($ty:ty),*) => {
        $(impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        })*
    };
}

serialize_as_label!(Year, Semester, Quarter);

/// Category label to share, e.g. `{"DIRECT": 0.7, "TASTI": 0.3}`.
pub type Shares = BTreeMap<String, f64>;

/// Quarter values of a summary sheet folded into semesters and years.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PeriodAggregates {
    pub by_year: BTreeMap<Year, Shares>,
    pub by_semester: BTreeMap<Semester, Shares>,
    pub by_quarter: BTreeMap<Quarter, Shares>,
}

/// Year-suffixed repeated column groups: the first block carries no suffix,
/// block `n` carries `.n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearBlocks {
    pub first_year: u16,
    pub count: u16,
}

impl YearBlocks {
    pub fn years(&self) -> Vec<Year> {
        (0..self.count).map(|n| Year(self.first_year + n)).collect()
    }

    pub fn suffix_for(&self, year: Year) -> Option<String> {
        let block = year.0.checked_sub(self.first_year)?;
        if block >= self.count {
            return None;
        }
        Some(if block == 0 {
            String::new()
        } else {
            format!(".{block}")
        })
    }
}

impl Default for YearBlocks {
    fn default() -> Self {
        Self {
            first_year: 2023,
            count: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_orders_by_year_then_number() {
        let mut quarters = vec![
            Quarter::new(Year(2024), 1),
            Quarter::new(Year(2023), 4),
            Quarter::new(Year(2023), 2),
        ];
        quarters.sort();

        let labels: Vec<String> = quarters.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["23-Q2", "23-Q4", "24-Q1"]);
    }

    #[test]
    fn quarter_folds_into_semester() {
        let q2 = Quarter::new(Year(2025), 2);
        let q3 = Quarter::new(Year(2025), 3);

        assert_eq!(q2.semester().to_string(), "2025-S1");
        assert_eq!(q3.semester().to_string(), "2025-S2");
    }

    #[test]
    fn year_blocks_resolve_suffixes() {
        let blocks = YearBlocks::default();

        assert_eq!(blocks.suffix_for(Year(2023)).as_deref(), Some(""));
        assert_eq!(blocks.suffix_for(Year(2025)).as_deref(), Some(".2"));
        assert_eq!(blocks.suffix_for(Year(2026)), None);
        assert_eq!(blocks.suffix_for(Year(2019)), None);
        assert_eq!(blocks.suffix_for(Year(2024)).as_deref(), Some(".1"));
    }

    #[test]
    fn month_names_round_trip() {
        assert_eq!(Month::from_name(" march "), Some(Month::March));
        assert_eq!(Month::September.short_name(), "Sep");
    }
}
