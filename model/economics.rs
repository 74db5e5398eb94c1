//! # Cost–Benefit Aggregation
//!
//! Turns a policy's lives-saved figure, the population and a monetary
//! valuation into benefit, cost, net benefit and benefit-cost ratio.
//! Everything here is a pure function of its inputs: the same settings,
//! configuration, costs and support estimate always give the same metrics,
//! which is what makes before/after comparisons meaningful.

use crate::config::{ConfigError, Country, PolicyConfiguration, Severity, non_negative};
use std::fmt;
use std::str::FromStr;

const LIVES_PER_UNIT_POPULATION: f64 = 100_000.0;
const DEFAULT_POPULATION: f64 = 1_000_000.0;
const GENERIC_CURRENCY_LABEL: &str = "local currency units";

/// How one life saved is converted into money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BenefitMetric {
    /// Value of a statistical life, per life saved.
    Vsl,
    /// Value of a statistical life-year, per life-year gained.
    Vsly,
    /// Monetary value per QALY gained.
    Qaly,
    /// Average health-system cost savings per life saved.
    HealthSystemSavings,
}

impl BenefitMetric {
    pub fn code(self) -> &'static str {
        match self {
            BenefitMetric::Vsl => "vsl",
            BenefitMetric::Vsly => "vsly",
            BenefitMetric::Qaly => "qalys",
            BenefitMetric::HealthSystemSavings => "healthsys",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BenefitMetric::Vsl => "Value of statistical life (per life saved)",
            BenefitMetric::Vsly => "Value of a statistical life-year (per life-year gained)",
            BenefitMetric::Qaly => "Monetary value per QALY gained",
            BenefitMetric::HealthSystemSavings => {
                "Average health system cost savings per life saved"
            }
        }
    }

    /// Country default in local currency.
    pub fn default_valuation(self, country: Country) -> f64 {
        match (self, country) {
            (BenefitMetric::Vsl, Country::Australia) => 5_400_000.0,
            (BenefitMetric::Vsl, Country::France) => 3_000_000.0,
            (BenefitMetric::Vsl, Country::Italy) => 2_800_000.0,
            (BenefitMetric::Vsly, Country::Australia) => 230_000.0,
            (BenefitMetric::Vsly, Country::France) => 100_000.0,
            (BenefitMetric::Vsly, Country::Italy) => 80_000.0,
            (BenefitMetric::Qaly, Country::Australia) => 50_000.0,
            (BenefitMetric::Qaly, Country::France) => 40_000.0,
            (BenefitMetric::Qaly, Country::Italy) => 30_000.0,
            (BenefitMetric::HealthSystemSavings, Country::Australia) => 100_000.0,
            (BenefitMetric::HealthSystemSavings, Country::France) => 80_000.0,
            (BenefitMetric::HealthSystemSavings, Country::Italy) => 60_000.0,
        }
    }
}

impl FromStr for BenefitMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vsl" => Ok(BenefitMetric::Vsl),
            "vsly" => Ok(BenefitMetric::Vsly),
            "qalys" | "qaly" => Ok(BenefitMetric::Qaly),
            "healthsys" => Ok(BenefitMetric::HealthSystemSavings),
            _ => Err(ConfigError::UnknownBenefitMetric(s.to_string())),
        }
    }
}

impl fmt::Display for BenefitMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Currency implied by the country, used when no label was given.
pub fn currency_label_for(country: Country) -> &'static str {
    match country {
        Country::Australia => "AUD",
        Country::France | Country::Italy => "EUR",
    }
}

/// Population and valuation inputs shared by every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    population: f64,
    valuation_per_unit: f64,
    currency_label: String,
    horizon_years: f64,
    benefit_metric: BenefitMetric,
}

impl Settings {
    pub fn new(population: f64, valuation_per_unit: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            population: non_negative("population", population)?,
            valuation_per_unit: non_negative("valuation", valuation_per_unit)?,
            currency_label: GENERIC_CURRENCY_LABEL.to_string(),
            horizon_years: 1.0,
            benefit_metric: BenefitMetric::Vsl,
        })
    }

    pub fn with_currency_label(mut self, label: impl Into<String>) -> Self {
        self.currency_label = label.into();
        self
    }

    /// Only used to scale default costs; the aggregator itself ignores it.
    pub fn with_horizon_years(mut self, years: f64) -> Result<Self, ConfigError> {
        self.horizon_years = non_negative("horizon_years", years)?;
        Ok(self)
    }

    pub fn with_benefit_metric(mut self, metric: BenefitMetric) -> Self {
        self.benefit_metric = metric;
        self
    }

    /// Replaces a blank or generic currency label with the country's currency.
    pub fn with_inferred_currency(self, country: Country) -> Self {
        let label = self.currency_label.trim();
        if label.is_empty() || label == GENERIC_CURRENCY_LABEL {
            self.with_currency_label(currency_label_for(country))
        } else {
            self
        }
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn valuation_per_unit(&self) -> f64 {
        self.valuation_per_unit
    }

    pub fn currency_label(&self) -> &str {
        &self.currency_label
    }

    pub fn horizon_years(&self) -> f64 {
        self.horizon_years
    }

    pub fn benefit_metric(&self) -> BenefitMetric {
        self.benefit_metric
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            valuation_per_unit: BenefitMetric::Vsl.default_valuation(Country::Australia),
            currency_label: GENERIC_CURRENCY_LABEL.to_string(),
            horizon_years: 1.0,
            benefit_metric: BenefitMetric::Vsl,
        }
    }
}

/// Implementation costs of a mandate, in the settings' currency.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    it_systems: f64,
    communications: f64,
    enforcement: f64,
    compensation: f64,
    administration: f64,
    other: f64,
}

impl CostBreakdown {
    pub fn new(
        it_systems: f64,
        communications: f64,
        enforcement: f64,
        compensation: f64,
        administration: f64,
        other: f64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            it_systems: non_negative("it_systems", it_systems)?,
            communications: non_negative("communications", communications)?,
            enforcement: non_negative("enforcement", enforcement)?,
            compensation: non_negative("compensation", compensation)?,
            administration: non_negative("administration", administration)?,
            other: non_negative("other", other)?,
        })
    }

    pub fn it_systems(&self) -> f64 {
        self.it_systems
    }

    pub fn communications(&self) -> f64 {
        self.communications
    }

    pub fn enforcement(&self) -> f64 {
        self.enforcement
    }

    pub fn compensation(&self) -> f64 {
        self.compensation
    }

    pub fn administration(&self) -> f64 {
        self.administration
    }

    pub fn other(&self) -> f64 {
        self.other
    }

    /// Named components in a fixed order, for reporting.
    pub fn components(&self) -> [(&'static str, f64); 6] {
        [
            ("it_systems", self.it_systems),
            ("communications", self.communications),
            ("enforcement", self.enforcement),
            ("compensation", self.compensation),
            ("administration", self.administration),
            ("other", self.other),
        ]
    }

    pub fn total(&self) -> f64 {
        self.it_systems
            + self.communications
            + self.enforcement
            + self.compensation
            + self.administration
            + self.other
    }
}

/// Output of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    /// `None` when the coefficient table has no entry for the configuration.
    pub support_probability: Option<f64>,
    pub lives_saved_total: f64,
    pub benefit_monetary: f64,
    /// Zero means costs have not been entered.
    pub cost_total: f64,
    pub net_benefit: f64,
    /// `None` when `cost_total` is zero.
    pub bcr: Option<f64>,
}

/// Aggregates lives saved, benefit, cost, net benefit and BCR.
///
/// Returns `None` when no configuration has been applied yet. Missing costs
/// count as zero, which leaves every field populated except `bcr`.
pub fn compute_derived_metrics(
    settings: &Settings,
    config: Option<&PolicyConfiguration>,
    costs: Option<&CostBreakdown>,
    support_probability: Option<f64>,
) -> Option<DerivedMetrics> {
    let config = config?;

    let lives_saved_total =
        (config.lives_saved_per_100k() / LIVES_PER_UNIT_POPULATION) * settings.population();
    let benefit_monetary = lives_saved_total * settings.valuation_per_unit();
    let cost_total = costs.map_or(0.0, CostBreakdown::total);
    let net_benefit = benefit_monetary - cost_total;
    let bcr = (cost_total > 0.0).then(|| benefit_monetary / cost_total);

    Some(DerivedMetrics {
        support_probability,
        lives_saved_total,
        benefit_monetary,
        cost_total,
        net_benefit,
        bcr,
    })
}

/// Stylised yearly cost per million people, by country.
fn cost_per_million(country: Country) -> CostBreakdown {
    let (it_systems, communications, enforcement, compensation, administration, other) =
        match country {
            Country::Australia => (
                1_200_000.0,
                800_000.0,
                1_800_000.0,
                2_200_000.0,
                800_000.0,
                500_000.0,
            ),
            Country::France => (
                1_000_000.0,
                700_000.0,
                1_500_000.0,
                1_800_000.0,
                700_000.0,
                400_000.0,
            ),
            Country::Italy => (
                900_000.0,
                600_000.0,
                1_400_000.0,
                1_600_000.0,
                600_000.0,
                400_000.0,
            ),
        };
    CostBreakdown {
        it_systems,
        communications,
        enforcement,
        compensation,
        administration,
        other,
    }
}

/// Severe outbreaks need more enforcement and compensation; mild ones less.
pub fn severity_cost_multiplier(severity: Severity) -> f64 {
    match severity {
        Severity::Mild => 0.8,
        Severity::Severe => 1.3,
    }
}

/// Evidence-based default costs for a configuration, scaled by population,
/// horizon and outbreak severity and rounded to whole currency units.
pub fn default_costs(settings: &Settings, config: &PolicyConfiguration) -> CostBreakdown {
    let horizon = if settings.horizon_years() > 0.0 {
        settings.horizon_years()
    } else {
        1.0
    };
    let scale = (settings.population() / 1_000_000.0)
        * horizon
        * severity_cost_multiplier(config.severity());
    let base = cost_per_million(config.country());
    let scaled = |per_million: f64| (per_million * scale).round();

    CostBreakdown {
        it_systems: scaled(base.it_systems),
        communications: scaled(base.communications),
        enforcement: scaled(base.enforcement),
        compensation: scaled(base.compensation),
        administration: scaled(base.administration),
        other: scaled(base.other),
    }
}
