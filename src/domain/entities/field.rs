use serde::Serialize;

/// Canonical column names shared by every normalized sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    Island,
    Province,
    City,
    Route,
    RecordType,
    PartNumber,
    CustomerId,
    CustomerName,
    Customer,
    Branch,
    Trend,
    GrandTotal,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Island => "Island",
            Field::Province => "Province",
            Field::City => "City",
            Field::Route => "Route",
            Field::RecordType => "Type",
            Field::PartNumber => "Part Number",
            Field::CustomerId => "ID Code",
            Field::CustomerName => "Customer Name",
            Field::Customer => "Customer",
            Field::Branch => "Branch",
            Field::Trend => "Trend",
            Field::GrandTotal => "Grand Total",
        }
    }

    /// Geography and category columns that never carry period values.
    pub fn is_region_identity(self) -> bool {
        matches!(
            self,
            Field::Island | Field::Province | Field::City | Field::Route | Field::RecordType
        )
    }

    pub fn from_label(label: &str) -> Option<Field> {
        FIELDS.iter().copied().find(|f| f.label() == label)
    }
}

const FIELDS: [Field; 12] = [
    Field::Island,
    Field::Province,
    Field::City,
    Field::Route,
    Field::RecordType,
    Field::PartNumber,
    Field::CustomerId,
    Field::CustomerName,
    Field::Customer,
    Field::Branch,
    Field::Trend,
    Field::GrandTotal,
];

/// Distribution route of a revenue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    Direct,
    Tasti,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::Direct, Route::Tasti];

    pub fn as_str(self) -> &'static str {
        match self {
            Route::Direct => "DIRECT",
            Route::Tasti => "TASTI",
        }
    }

    pub fn parse(value: &str) -> Option<Route> {
        match value.trim().to_uppercase().as_str() {
            "DIRECT" => Some(Route::Direct),
            "TASTI" => Some(Route::Tasti),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
