use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldValue – a single cell of the vehicle table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as seen by the cascading filter.
/// Used as a `BTreeSet` key downstream, so `FieldValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

// -- Manual Eq/Ord so we can put FieldValue in BTreeSet --

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use FieldValue::*;
        fn discriminant(v: &FieldValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) | Float(_) => 1,
                Text(_) => 2,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Null => write!(f, "<unset>"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    fn from_opt_text(value: &Option<String>) -> Self {
        value.clone().map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }

    fn from_opt_float(value: Option<f64>) -> Self {
        value.map(FieldValue::Float).unwrap_or(FieldValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Field – the attributes a vehicle record can carry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Manufacturer,
    FuelType,
    Model,
    Year,
    Transmission,
    Description,
    Co2TailpipeGpm,
    CombinedMpg,
    GhgScore,
}

impl Field {
    /// Identity fields every dataset variant must carry.
    pub const IDENTITY: [Field; 3] = [Field::Manufacturer, Field::FuelType, Field::Model];

    /// Canonical column name after loader normalisation.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Manufacturer => "manufacturer",
            Field::FuelType => "fuel_type",
            Field::Model => "model",
            Field::Year => "year",
            Field::Transmission => "transmission",
            Field::Description => "description",
            Field::Co2TailpipeGpm => "co2_tailpipe_gpm",
            Field::CombinedMpg => "combined_mpg",
            Field::GhgScore => "ghg_score",
        }
    }

    /// Human readable label for widgets.
    pub fn label(self) -> &'static str {
        match self {
            Field::Manufacturer => "Manufacturer",
            Field::FuelType => "Fuel type",
            Field::Model => "Model",
            Field::Year => "Year",
            Field::Transmission => "Transmission",
            Field::Description => "Description",
            Field::Co2TailpipeGpm => "CO₂ tailpipe (g/mile)",
            Field::CombinedMpg => "Combined MPG",
            Field::GhgScore => "GHG score",
        }
    }

    /// Numeric metric columns feed the estimator and are never selection steps.
    pub fn is_metric(self) -> bool {
        matches!(
            self,
            Field::Co2TailpipeGpm | Field::CombinedMpg | Field::GhgScore
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// VehicleRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single vehicle (one row of the source table).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub manufacturer: String,
    pub fuel_type: String,
    pub model: String,
    pub year: Option<i64>,
    pub transmission: Option<String>,
    pub description: Option<String>,
    /// Tailpipe CO₂ in grams per mile, as sourced.
    pub co2_tailpipe_gpm: Option<f64>,
    /// Combined fuel economy in miles per (US) gallon.
    pub combined_mpg: Option<f64>,
    /// Greenhouse-gas score, observed range 1–10.
    pub ghg_score: Option<f64>,
}

impl VehicleRecord {
    pub fn new(manufacturer: &str, fuel_type: &str, model: &str) -> Self {
        Self {
            manufacturer: manufacturer.to_string(),
            fuel_type: fuel_type.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    /// Dynamically-typed view of one attribute.
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::Manufacturer => FieldValue::Text(self.manufacturer.clone()),
            Field::FuelType => FieldValue::Text(self.fuel_type.clone()),
            Field::Model => FieldValue::Text(self.model.clone()),
            Field::Year => self.year.map(FieldValue::Integer).unwrap_or(FieldValue::Null),
            Field::Transmission => FieldValue::from_opt_text(&self.transmission),
            Field::Description => FieldValue::from_opt_text(&self.description),
            Field::Co2TailpipeGpm => FieldValue::from_opt_float(self.co2_tailpipe_gpm),
            Field::CombinedMpg => FieldValue::from_opt_float(self.combined_mpg),
            Field::GhgScore => FieldValue::from_opt_float(self.ghg_score),
        }
    }

    /// Equality test used by the filter engine, without cloning strings.
    pub fn matches(&self, field: Field, value: &FieldValue) -> bool {
        match (field, value) {
            (Field::Manufacturer, FieldValue::Text(v)) => self.manufacturer == *v,
            (Field::FuelType, FieldValue::Text(v)) => self.fuel_type == *v,
            (Field::Model, FieldValue::Text(v)) => self.model == *v,
            (Field::Transmission, FieldValue::Text(v)) => {
                self.transmission.as_deref() == Some(v.as_str())
            }
            (Field::Description, FieldValue::Text(v)) => {
                self.description.as_deref() == Some(v.as_str())
            }
            (_, FieldValue::Null) => false,
            _ => self.value(field) == *value,
        }
    }

    /// Short one-line label, e.g. `Toyota Corolla (2019, Petrol)`.
    pub fn summary(&self) -> String {
        let mut extra = Vec::new();
        if let Some(year) = self.year {
            extra.push(year.to_string());
        }
        extra.push(self.fuel_type.clone());
        if let Some(t) = &self.transmission {
            extra.push(t.clone());
        }
        format!("{} {} ({})", self.manufacturer, self.model, extra.join(", "))
    }
}

// ---------------------------------------------------------------------------
// VehicleTable – the complete loaded table
// ---------------------------------------------------------------------------

/// Ordered, read-only collection of vehicle records.
#[derive(Debug, Clone, Default)]
pub struct VehicleTable {
    records: Vec<VehicleRecord>,
    /// Rows the loader discarded for missing required fields.
    pub dropped_rows: usize,
}

impl VehicleTable {
    pub fn from_records(records: Vec<VehicleRecord>) -> Self {
        Self {
            records,
            dropped_rows: 0,
        }
    }

    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&VehicleRecord> {
        self.records.get(index)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
