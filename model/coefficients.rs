//! # Mixed-Logit Coefficient Table
//!
//! Population means and standard deviations of the random utility
//! coefficients, one set per (country, outbreak scenario). The built-in
//! values are the published mixed-logit estimates; an alternative table can
//! be read from TOML, and is validated completely before it is accepted.

use crate::config::{Country, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const NUM_ATTRIBUTES: usize = 8;

/// The named utility coefficients of the choice model, in canonical order.
///
/// The canonical order is also the column order of the draw panel, so it
/// must never be rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    /// Alternative-specific constant of the mandate alternative.
    MandateIntercept,
    /// Alternative-specific constant of the opt-out alternative.
    OptOutIntercept,
    ScopeAll,
    ExemptionMedRel,
    ExemptionMedRelPers,
    Coverage70,
    Coverage90,
    /// Utility per expected life saved per 100,000 people.
    LivesSavedSlope,
}

impl Attribute {
    pub const ALL: [Attribute; NUM_ATTRIBUTES] = [
        Attribute::MandateIntercept,
        Attribute::OptOutIntercept,
        Attribute::ScopeAll,
        Attribute::ExemptionMedRel,
        Attribute::ExemptionMedRelPers,
        Attribute::Coverage70,
        Attribute::Coverage90,
        Attribute::LivesSavedSlope,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Attribute::MandateIntercept => "mandate-intercept",
            Attribute::OptOutIntercept => "opt-out-intercept",
            Attribute::ScopeAll => "scope-all",
            Attribute::ExemptionMedRel => "exemption-medrel",
            Attribute::ExemptionMedRelPers => "exemption-medrelpers",
            Attribute::Coverage70 => "coverage-70",
            Attribute::Coverage90 => "coverage-90",
            Attribute::LivesSavedSlope => "lives-saved-slope",
        }
    }
}

impl FromStr for Attribute {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attribute| attribute.name() == s)
            .ok_or_else(|| TableError::UnknownAttribute(s.to_string()))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Custom error type for loading, validating and saving coefficient tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read or write coefficient file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML coefficient file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize coefficient table to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Invalid entry key: {0}")]
    InvalidKey(#[from] crate::config::ConfigError),
    #[error("Unknown coefficient name '{0}'.")]
    UnknownAttribute(String),
    #[error("Entry {country}/{severity} has no mean for '{attribute}'.")]
    MissingMean {
        country: Country,
        severity: Severity,
        attribute: Attribute,
    },
    #[error("Entry {country}/{severity} has a non-finite mean for '{attribute}': {value}.")]
    InvalidMean {
        country: Country,
        severity: Severity,
        attribute: Attribute,
        value: f64,
    },
    #[error(
        "Entry {country}/{severity} has an invalid standard deviation for '{attribute}': {value}. Standard deviations must be finite and non-negative."
    )]
    InvalidStandardDeviation {
        country: Country,
        severity: Severity,
        attribute: Attribute,
        value: f64,
    },
    #[error("Entry {country}/{severity} appears more than once.")]
    DuplicateEntry { country: Country, severity: Severity },
}

/// Means and standard deviations of the normally distributed coefficients
/// for a single (country, scenario) cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientSet {
    means: [f64; NUM_ATTRIBUTES],
    standard_deviations: [f64; NUM_ATTRIBUTES],
}

impl CoefficientSet {
    pub fn new(
        means: [f64; NUM_ATTRIBUTES],
        standard_deviations: [f64; NUM_ATTRIBUTES],
    ) -> Self {
        Self {
            means,
            standard_deviations,
        }
    }

    pub fn mean(&self, attribute: Attribute) -> f64 {
        self.means[attribute.index()]
    }

    pub fn standard_deviation(&self, attribute: Attribute) -> f64 {
        self.standard_deviations[attribute.index()]
    }

    pub fn means(&self) -> &[f64; NUM_ATTRIBUTES] {
        &self.means
    }

    pub fn standard_deviations(&self) -> &[f64; NUM_ATTRIBUTES] {
        &self.standard_deviations
    }
}

/// Static lookup of coefficient sets keyed by country and outbreak scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    sets: BTreeMap<(Country, Severity), CoefficientSet>,
}

// Column order follows `Attribute::ALL`.
const BUILTIN_ESTIMATES: [(Country, Severity, [f64; NUM_ATTRIBUTES], [f64; NUM_ATTRIBUTES]); 6] = [
    (
        Country::Australia,
        Severity::Mild,
        [0.464, -0.572, -0.319, -0.157, -0.267, 0.171, 0.158, 0.072],
        [1.104, 5.340, 1.731, 0.443, 1.254, 0.698, 1.689, 0.101],
    ),
    (
        Country::Australia,
        Severity::Severe,
        [0.535, -0.694, 0.190, -0.181, -0.305, 0.371, 0.398, 0.079],
        [1.019, 5.021, 1.756, 0.722, 1.252, 0.641, 1.548, 0.103],
    ),
    (
        Country::Italy,
        Severity::Mild,
        [0.625, -0.238, -0.276, -0.176, -0.289, 0.185, 0.148, 0.039],
        [1.560, 4.748, 1.601, 0.718, 1.033, 0.615, 1.231, 0.080],
    ),
    (
        Country::Italy,
        Severity::Severe,
        [0.799, -0.463, 0.174, -0.178, -0.207, 0.305, 0.515, 0.045],
        [1.518, 4.194, 1.448, 0.575, 1.082, 0.745, 1.259, 0.082],
    ),
    (
        Country::France,
        Severity::Mild,
        [0.899, 0.307, -0.160, -0.121, -0.124, 0.232, 0.264, 0.049],
        [1.560, 4.138, 1.258, 0.818, 0.972, 0.550, 1.193, 0.081],
    ),
    (
        Country::France,
        Severity::Severe,
        [0.884, 0.083, -0.019, -0.192, -0.247, 0.267, 0.398, 0.052],
        [1.601, 3.244, 1.403, 0.690, 1.050, 0.548, 1.145, 0.085],
    ),
];

impl CoefficientTable {
    /// The published estimates for AU, IT and FR under both outbreak scenarios.
    pub fn builtin() -> Self {
        let sets = BUILTIN_ESTIMATES
            .iter()
            .map(|&(country, severity, means, sds)| {
                ((country, severity), CoefficientSet::new(means, sds))
            })
            .collect();
        Self { sets }
    }

    pub fn get(&self, country: Country, severity: Severity) -> Option<&CoefficientSet> {
        self.sets.get(&(country, severity))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Country, Severity, &CoefficientSet)> {
        self.sets
            .iter()
            .map(|(&(country, severity), set)| (country, severity, set))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(text)?;
        let mut sets = BTreeMap::new();
        for entry in &file.entry {
            let (country, severity, set) = entry.validate()?;
            if sets.insert((country, severity), set).is_some() {
                return Err(TableError::DuplicateEntry { country, severity });
            }
        }
        log::debug!("Validated coefficient table with {} entries", sets.len());
        Ok(Self { sets })
    }

    /// Loads and validates a coefficient table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path)?;
        let table = Self::from_toml_str(&text)?;
        log::info!(
            "Loaded {} coefficient sets from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn to_toml_string(&self) -> Result<String, TableError> {
        let file = TableFile {
            entry: self
                .iter()
                .map(|(country, severity, set)| EntryFile::from_set(country, severity, set))
                .collect(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Saves the table in the same human-readable TOML layout `load` accepts.
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let toml_string = self.to_toml_string()?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

// --- On-disk layout ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    entry: Vec<EntryFile>,
}

/// One `[[entry]]` block. Standard deviations left out are zero, i.e. the
/// coefficient is treated as fixed across respondents.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryFile {
    country: String,
    severity: String,
    means: BTreeMap<String, f64>,
    #[serde(default, rename = "standard-deviations")]
    standard_deviations: BTreeMap<String, f64>,
}

impl EntryFile {
    fn from_set(country: Country, severity: Severity, set: &CoefficientSet) -> Self {
        let named = |values: &[f64; NUM_ATTRIBUTES]| {
            Attribute::ALL
                .iter()
                .map(|attribute| (attribute.name().to_string(), values[attribute.index()]))
                .collect()
        };
        Self {
            country: country.code().to_string(),
            severity: severity.code().to_string(),
            means: named(set.means()),
            standard_deviations: named(set.standard_deviations()),
        }
    }

    fn validate(&self) -> Result<(Country, Severity, CoefficientSet), TableError> {
        let country: Country = self.country.parse()?;
        let severity: Severity = self.severity.parse()?;

        let mut means = [None; NUM_ATTRIBUTES];
        for (name, &value) in &self.means {
            let attribute: Attribute = name.parse()?;
            if !value.is_finite() {
                return Err(TableError::InvalidMean {
                    country,
                    severity,
                    attribute,
                    value,
                });
            }
            means[attribute.index()] = Some(value);
        }

        let mut sds = [0.0; NUM_ATTRIBUTES];
        for (name, &value) in &self.standard_deviations {
            let attribute: Attribute = name.parse()?;
            if !value.is_finite() || value < 0.0 {
                return Err(TableError::InvalidStandardDeviation {
                    country,
                    severity,
                    attribute,
                    value,
                });
            }
            sds[attribute.index()] = value;
        }

        let mut resolved = [0.0; NUM_ATTRIBUTES];
        for attribute in Attribute::ALL {
            resolved[attribute.index()] =
                means[attribute.index()].ok_or(TableError::MissingMean {
                    country,
                    severity,
                    attribute,
                })?;
        }

        Ok((country, severity, CoefficientSet::new(resolved, sds)))
    }
}
