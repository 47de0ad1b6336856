//! Declarative description of a dataset variant: which columns form the
//! cascading picker, how each step sorts, and how the source is read.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::error::LoadError;
use crate::data::filter::{SortDirection, Step};
use crate::data::loader::LoadOptions;
use crate::data::model::Field;
use crate::data::resolve::DuplicatePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub field: Field,
    #[serde(default)]
    pub sort: SortDirection,
    /// Widget label; defaults to the field's own label.
    #[serde(default)]
    pub label: Option<String>,
}

impl StepConfig {
    pub fn new(field: Field, sort: SortDirection) -> Self {
        Self {
            field,
            sort,
            label: None,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.field.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetProfile {
    pub name: String,
    pub steps: Vec<StepConfig>,
    pub required_fields: Vec<Field>,
    pub delimiter: char,
    pub encoding: String,
    pub duplicate_policy: DuplicatePolicy,
    pub default_distance_km: f64,
}

impl Default for DatasetProfile {
    fn default() -> Self {
        Self::make_fuel_model_year()
    }
}

impl DatasetProfile {
    fn with_last_step(name: &str, last: StepConfig) -> Self {
        let mut steps: Vec<StepConfig> = Field::IDENTITY
            .iter()
            .map(|f| StepConfig::new(*f, SortDirection::Ascending))
            .collect();
        let mut required = Field::IDENTITY.to_vec();
        required.push(last.field);
        required.push(Field::Co2TailpipeGpm);
        steps.push(last);

        Self {
            name: name.to_string(),
            steps,
            required_fields: required,
            delimiter: ',',
            encoding: "utf-8".to_string(),
            duplicate_policy: DuplicatePolicy::FirstMatch,
            default_distance_km: 100.0,
        }
    }

    /// Manufacturer → fuel type → model → year (most recent first).
    pub fn make_fuel_model_year() -> Self {
        Self::with_last_step(
            "make-fuel-model-year",
            StepConfig::new(Field::Year, SortDirection::Descending),
        )
    }

    /// Manufacturer → fuel type → model → transmission.
    pub fn make_fuel_model_transmission() -> Self {
        Self::with_last_step(
            "make-fuel-model-transmission",
            StepConfig::new(Field::Transmission, SortDirection::Ascending),
        )
    }

    /// Manufacturer → fuel type → model → description.
    pub fn make_fuel_model_description() -> Self {
        Self::with_last_step(
            "make-fuel-model-description",
            StepConfig::new(Field::Description, SortDirection::Ascending),
        )
    }

    pub fn presets() -> Vec<Self> {
        vec![
            Self::make_fuel_model_year(),
            Self::make_fuel_model_transmission(),
            Self::make_fuel_model_description(),
        ]
    }

    /// Read a custom profile from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        let profile: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing profile {}", path.display()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            bail!("profile '{}' has no selection steps", self.name);
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.field.is_metric() {
                bail!(
                    "profile '{}': {} is a metric and cannot be a selection step",
                    self.name,
                    step.field
                );
            }
            if self.steps[..i].iter().any(|s| s.field == step.field) {
                bail!("profile '{}': step {} appears twice", self.name, step.field);
            }
        }
        if !self.delimiter.is_ascii() {
            bail!(
                "profile '{}': delimiter '{}' is not a single-byte character",
                self.name,
                self.delimiter
            );
        }
        if !(self.default_distance_km >= 1.0) {
            bail!(
                "profile '{}': default distance must be at least 1 km",
                self.name
            );
        }
        Ok(())
    }

    /// Ordered steps as the filter engine consumes them.
    pub fn field_order(&self) -> Vec<Step> {
        self.steps
            .iter()
            .map(|s| Step {
                field: s.field,
                sort: s.sort,
            })
            .collect()
    }

    /// Loader options. Every step field is required so the picker never
    /// offers a blank entry.
    pub fn load_options(&self) -> Result<LoadOptions, LoadError> {
        let mut required = self.required_fields.clone();
        for step in &self.steps {
            if !required.contains(&step.field) {
                required.push(step.field);
            }
        }
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(LoadError::InvalidDelimiter(self.delimiter))?;
        Ok(LoadOptions {
            delimiter,
            encoding: self.encoding.clone(),
            required_fields: required,
        })
    }
}
