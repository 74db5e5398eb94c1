//! # Policy Configuration and Input Validation
//!
//! This module is the only place where outside input becomes model input.
//! It owns the typed description of a mandate design (`PolicyConfiguration`)
//! and the raw, serde-facing mirrors used by scenario files and the CLI.
//!
//! - Strict Codes: countries, outbreak scenarios, scopes and exemption
//!   policies are parsed from fixed short codes. Anything else is a
//!   `ConfigError`, never a silent fallback to a default level.
//! - No Zero Substitution: a missing or malformed number is rejected here,
//!   so the simulator and the aggregator only ever see complete values.
//! - Raw vs. Typed: `Raw*` structs mirror the TOML layout one-to-one and are
//!   turned into typed values by their `validate` methods.

use crate::economics::{BenefitMetric, CostBreakdown, Settings};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance used when matching a user-supplied coverage fraction to a level.
const COVERAGE_MATCH_TOLERANCE: f64 = 1e-9;

/// A comprehensive error type for every configuration and validation failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown country code '{0}'. Expected one of AU, IT, FR.")]
    UnknownCountry(String),
    #[error("Unknown outbreak scenario '{0}'. Expected 'mild' or 'severe'.")]
    UnknownSeverity(String),
    #[error("Unknown mandate scope '{0}'. Expected 'highrisk' or 'all'.")]
    UnknownScope(String),
    #[error("Unknown exemption policy '{0}'. Expected 'medical', 'medrel' or 'medrelpers'.")]
    UnknownExemptionPolicy(String),
    #[error("Unknown benefit metric '{0}'. Expected 'vsl', 'vsly', 'qalys' or 'healthsys'.")]
    UnknownBenefitMetric(String),
    #[error("Coverage threshold {0} is not supported. Expected 0.5, 0.7 or 0.9.")]
    UnsupportedCoverage(f64),
    #[error("'{field}' expects a number, but '{value}' could not be parsed.")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Lives saved per 100,000 must be a finite, non-negative number (got {0}).")]
    InvalidLivesSaved(f64),
    #[error("'{field}' must be a finite, non-negative number (got {value}).")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("Failed to read scenario file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML scenario file: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Rejects negative, NaN and infinite amounts.
pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidAmount { field, value })
    }
}

/// Countries for which the discrete-choice experiment was fielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Country {
    Australia,
    Italy,
    France,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::Australia, Country::Italy, Country::France];

    pub fn code(self) -> &'static str {
        match self {
            Country::Australia => "AU",
            Country::Italy => "IT",
            Country::France => "FR",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Country::Australia => "Australia",
            Country::Italy => "Italy",
            Country::France => "France",
        }
    }
}

impl FromStr for Country {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AU" => Ok(Country::Australia),
            "IT" => Ok(Country::Italy),
            "FR" => Ok(Country::France),
            _ => Err(ConfigError::UnknownCountry(s.to_string())),
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outbreak scenario presented to respondents. Coefficients differ per scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Mild,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 2] = [Severity::Mild, Severity::Severe];

    pub fn code(self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Severe => "severe",
        }
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "severe" => Ok(Severity::Severe),
            _ => Err(ConfigError::UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Who the mandate applies to. `HighRiskOnly` is the reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    HighRiskOnly,
    All,
}

impl Scope {
    pub fn code(self) -> &'static str {
        match self {
            Scope::HighRiskOnly => "highrisk",
            Scope::All => "all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scope::HighRiskOnly => "High-risk occupations only",
            Scope::All => "All occupations and public spaces",
        }
    }
}

impl FromStr for Scope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highrisk" => Ok(Scope::HighRiskOnly),
            "all" => Ok(Scope::All),
            _ => Err(ConfigError::UnknownScope(s.to_string())),
        }
    }
}

/// Which exemptions are granted. `MedicalOnly` is the reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExemptionPolicy {
    MedicalOnly,
    MedicalReligious,
    MedicalReligiousPersonal,
}

impl ExemptionPolicy {
    pub fn code(self) -> &'static str {
        match self {
            ExemptionPolicy::MedicalOnly => "medical",
            ExemptionPolicy::MedicalReligious => "medrel",
            ExemptionPolicy::MedicalReligiousPersonal => "medrelpers",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExemptionPolicy::MedicalOnly => "Medical only",
            ExemptionPolicy::MedicalReligious => "Medical and religious",
            ExemptionPolicy::MedicalReligiousPersonal => "Medical, religious and personal belief",
        }
    }
}

impl FromStr for ExemptionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "medical" => Ok(ExemptionPolicy::MedicalOnly),
            "medrel" => Ok(ExemptionPolicy::MedicalReligious),
            "medrelpers" => Ok(ExemptionPolicy::MedicalReligiousPersonal),
            _ => Err(ConfigError::UnknownExemptionPolicy(s.to_string())),
        }
    }
}

/// Vaccination coverage at which the mandate is lifted. 50% is the reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverageThreshold {
    Half,
    Seventy,
    Ninety,
}

impl CoverageThreshold {
    pub fn fraction(self) -> f64 {
        match self {
            CoverageThreshold::Half => 0.5,
            CoverageThreshold::Seventy => 0.7,
            CoverageThreshold::Ninety => 0.9,
        }
    }

    pub fn from_fraction(value: f64) -> Result<Self, ConfigError> {
        [
            CoverageThreshold::Half,
            CoverageThreshold::Seventy,
            CoverageThreshold::Ninety,
        ]
        .into_iter()
        .find(|level| (level.fraction() - value).abs() < COVERAGE_MATCH_TOLERANCE)
        .ok_or(ConfigError::UnsupportedCoverage(value))
    }
}

impl FromStr for CoverageThreshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            field: "coverage",
            value: s.to_string(),
        })?;
        CoverageThreshold::from_fraction(value)
    }
}

impl fmt::Display for CoverageThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}% vaccinated", self.fraction() * 100.0)
    }
}

/// One fully specified mandate design. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfiguration {
    country: Country,
    severity: Severity,
    scope: Scope,
    exemption_policy: ExemptionPolicy,
    coverage_threshold: CoverageThreshold,
    lives_saved_per_100k: f64,
}

impl PolicyConfiguration {
    pub fn new(
        country: Country,
        severity: Severity,
        scope: Scope,
        exemption_policy: ExemptionPolicy,
        coverage_threshold: CoverageThreshold,
        lives_saved_per_100k: f64,
    ) -> Result<Self, ConfigError> {
        if !lives_saved_per_100k.is_finite() || lives_saved_per_100k < 0.0 {
            return Err(ConfigError::InvalidLivesSaved(lives_saved_per_100k));
        }
        Ok(Self {
            country,
            severity,
            scope,
            exemption_policy,
            coverage_threshold,
            lives_saved_per_100k,
        })
    }

    /// The reference design for a country and scenario: every categorical
    /// attribute at its base level.
    pub fn reference(
        country: Country,
        severity: Severity,
        lives_saved_per_100k: f64,
    ) -> Result<Self, ConfigError> {
        Self::new(
            country,
            severity,
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            lives_saved_per_100k,
        )
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn exemption_policy(&self) -> ExemptionPolicy {
        self.exemption_policy
    }

    pub fn coverage_threshold(&self) -> CoverageThreshold {
        self.coverage_threshold
    }

    pub fn lives_saved_per_100k(&self) -> f64 {
        self.lives_saved_per_100k
    }

    pub fn is_reference_design(&self) -> bool {
        self.scope == Scope::HighRiskOnly
            && self.exemption_policy == ExemptionPolicy::MedicalOnly
            && self.coverage_threshold == CoverageThreshold::Half
    }
}

// --- Raw, file-facing mirrors ---

/// The `[policy]` table of a scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicy {
    pub country: String,
    pub outbreak: String,
    pub scope: String,
    pub exemptions: String,
    pub coverage: f64,
    pub lives_per_100k: f64,
}

impl RawPolicy {
    pub fn validate(&self) -> Result<PolicyConfiguration, ConfigError> {
        PolicyConfiguration::new(
            self.country.parse()?,
            self.outbreak.parse()?,
            self.scope.parse()?,
            self.exemptions.parse()?,
            CoverageThreshold::from_fraction(self.coverage)?,
            self.lives_per_100k,
        )
    }
}

/// The `[settings]` table of a scenario file.
///
/// `valuation` falls back to the benefit metric's default for the policy's
/// country, and a blank `currency` is inferred from the country as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    pub population: f64,
    #[serde(default)]
    pub valuation: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub horizon_years: Option<f64>,
    #[serde(default)]
    pub benefit_metric: Option<String>,
}

impl RawSettings {
    pub fn validate(&self, country: Country) -> Result<Settings, ConfigError> {
        let metric = match &self.benefit_metric {
            Some(code) => code.parse()?,
            None => BenefitMetric::Vsl,
        };
        let valuation = self
            .valuation
            .unwrap_or_else(|| metric.default_valuation(country));

        let mut settings = Settings::new(self.population, valuation)?.with_benefit_metric(metric);
        if let Some(horizon) = self.horizon_years {
            settings = settings.with_horizon_years(horizon)?;
        }

        if let Some(label) = &self.currency {
            settings = settings.with_currency_label(label.trim());
        }
        Ok(settings.with_inferred_currency(country))
    }
}

/// The optional `[costs]` table. Components left out are zero ("not entered").
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RawCosts {
    pub it_systems: f64,
    pub communications: f64,
    pub enforcement: f64,
    pub compensation: f64,
    pub administration: f64,
    pub other: f64,
}

impl RawCosts {
    pub fn validate(&self) -> Result<CostBreakdown, ConfigError> {
        CostBreakdown::new(
            self.it_systems,
            self.communications,
            self.enforcement,
            self.compensation,
            self.administration,
            self.other,
        )
    }
}

/// A complete scenario as stored on disk.
///
/// ```toml
/// [settings]
/// population = 1000000
/// valuation = 5400000
///
/// [policy]
/// country = "AU"
/// outbreak = "mild"
/// scope = "highrisk"
/// exemptions = "medical"
/// coverage = 0.5
/// lives_per_100k = 10
///
/// [costs]
/// enforcement = 100000000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub settings: RawSettings,
    pub policy: RawPolicy,
    #[serde(default)]
    pub costs: Option<RawCosts>,
}

/// Validated inputs for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationInput {
    pub settings: Settings,
    pub policy: PolicyConfiguration,
    pub costs: Option<CostBreakdown>,
}

impl ScenarioFile {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<EvaluationInput, ConfigError> {
        let policy = self.policy.validate()?;
        let settings = self.settings.validate(policy.country())?;
        let costs = self.costs.as_ref().map(RawCosts::validate).transpose()?;
        Ok(EvaluationInput {
            settings,
            policy,
            costs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_policy() -> RawPolicy {
        RawPolicy {
            country: "AU".to_string(),
            outbreak: "mild".to_string(),
            scope: "highrisk".to_string(),
            exemptions: "medical".to_string(),
            coverage: 0.5,
            lives_per_100k: 10.0,
        }
    }

    #[test]
    fn codes_parse_case_insensitively() {
        assert_eq!("au".parse::<Country>().unwrap(), Country::Australia);
        assert_eq!(" Severe ".parse::<Severity>().unwrap(), Severity::Severe);
        assert_eq!("ALL".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!(
            "medrelpers".parse::<ExemptionPolicy>().unwrap(),
            ExemptionPolicy::MedicalReligiousPersonal
        );
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(matches!(
            "DE".parse::<Country>(),
            Err(ConfigError::UnknownCountry(code)) if code == "DE"
        ));
        assert!(matches!(
            "moderate".parse::<Severity>(),
            Err(ConfigError::UnknownSeverity(_))
        ));
        assert!(matches!(
            "some".parse::<Scope>(),
            Err(ConfigError::UnknownScope(_))
        ));
        assert!(matches!(
            "personal".parse::<ExemptionPolicy>(),
            Err(ConfigError::UnknownExemptionPolicy(_))
        ));
    }

    #[test]
    fn coverage_matches_only_supported_levels() {
        assert_eq!(
            CoverageThreshold::from_fraction(0.7).unwrap(),
            CoverageThreshold::Seventy
        );
        assert_eq!(
            "0.9".parse::<CoverageThreshold>().unwrap(),
            CoverageThreshold::Ninety
        );
        assert!(matches!(
            CoverageThreshold::from_fraction(0.6),
            Err(ConfigError::UnsupportedCoverage(v)) if v == 0.6
        ));
        assert!(matches!(
            "seventy".parse::<CoverageThreshold>(),
            Err(ConfigError::InvalidNumber { field: "coverage", .. })
        ));
    }

    #[test]
    fn lives_saved_must_be_finite_and_non_negative() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let result = PolicyConfiguration::reference(Country::France, Severity::Mild, bad);
            assert!(matches!(result, Err(ConfigError::InvalidLivesSaved(_))));
        }
        assert!(PolicyConfiguration::reference(Country::France, Severity::Mild, 0.0).is_ok());
    }

    #[test]
    fn reference_design_is_detected() {
        let reference =
            PolicyConfiguration::reference(Country::Italy, Severity::Severe, 5.0).unwrap();
        assert!(reference.is_reference_design());

        let mut raw = raw_policy();
        raw.coverage = 0.9;
        assert!(!raw.validate().unwrap().is_reference_design());
    }

    #[test]
    fn scenario_file_fills_valuation_and_currency_from_country() {
        let text = r#"
            [settings]
            population = 2000000

            [policy]
            country = "FR"
            outbreak = "severe"
            scope = "all"
            exemptions = "medrel"
            coverage = 0.7
            lives_per_100k = 4.5
        "#;
        let input = ScenarioFile::from_toml_str(text).unwrap().validate().unwrap();

        assert_eq!(input.policy.country(), Country::France);
        assert_eq!(input.policy.scope(), Scope::All);
        assert_eq!(input.settings.valuation_per_unit(), 3_000_000.0);
        assert_eq!(input.settings.currency_label(), "EUR");
        assert_eq!(input.settings.horizon_years(), 1.0);
        assert!(input.costs.is_none());
    }

    #[test]
    fn generic_currency_label_is_replaced_by_the_country_currency() {
        let scenario = |currency: &str| {
            format!(
                r#"
                [settings]
                population = 1000000
                currency = "{currency}"

                [policy]
                country = "FR"
                outbreak = "mild"
                scope = "highrisk"
                exemptions = "medical"
                coverage = 0.5
                lives_per_100k = 10
                "#
            )
        };
        let currency_of = |label: &str| {
            ScenarioFile::from_toml_str(&scenario(label))
                .unwrap()
                .validate()
                .unwrap()
                .settings
                .currency_label()
                .to_string()
        };

        assert_eq!(currency_of("local currency units"), "EUR");
        assert_eq!(currency_of("  "), "EUR");
        assert_eq!(currency_of(" CHF "), "CHF");
    }

    #[test]
    fn scenario_file_missing_cost_components_are_zero() {
        let text = r#"
            [settings]
            population = 1000000
            valuation = 5400000
            currency = "AUD"

            [policy]
            country = "AU"
            outbreak = "mild"
            scope = "highrisk"
            exemptions = "medical"
            coverage = 0.5
            lives_per_100k = 10

            [costs]
            enforcement = 60000000
            other = 40000000
        "#;
        let input = ScenarioFile::from_toml_str(text).unwrap().validate().unwrap();
        let costs = input.costs.unwrap();
        assert_eq!(costs.it_systems(), 0.0);
        assert_eq!(costs.total(), 100_000_000.0);
    }

    #[test]
    fn scenario_file_rejects_negative_costs_and_unknown_fields() {
        let negative = r#"
            [settings]
            population = 1000000
            [policy]
            country = "AU"
            outbreak = "mild"
            scope = "highrisk"
            exemptions = "medical"
            coverage = 0.5
            lives_per_100k = 10
            [costs]
            admin = 5
        "#;
        assert!(matches!(
            ScenarioFile::from_toml_str(negative),
            Err(ConfigError::TomlParseError(_))
        ));

        let text = negative.replace("admin = 5", "administration = -5");
        let parsed = ScenarioFile::from_toml_str(&text).unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(ConfigError::InvalidAmount {
                field: "administration",
                ..
            })
        ));
    }
}
