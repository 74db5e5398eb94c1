//! # Mixed-Logit Choice Simulator
//!
//! Estimates the share of the population preferring a mandate to the
//! opt-out alternative by Monte Carlo integration over the random
//! coefficients. For every draw `r` the individual coefficients are
//! `beta_r = mean + sd * z_r`; the mandate's utility is the sum of the
//! coefficients its design switches on, the opt-out's utility is its own
//! constant, and the binary logit gives `p_r`. The estimate is the mean of
//! `p_r` over the panel.
//!
//! Every configuration is summed over the draws in panel order, so results
//! are bit-for-bit reproducible whether configurations are evaluated one at
//! a time or as a parallel batch.

use crate::coefficients::{Attribute, CoefficientSet, CoefficientTable, NUM_ATTRIBUTES};
use crate::config::{CoverageThreshold, ExemptionPolicy, PolicyConfiguration, Scope};
use crate::draws::DrawPanel;
use ndarray::ArrayView1;
use rayon::prelude::*;

/// Logistic function, evaluated so that `exp` never overflows.
///
/// For `x >= 0` this is exactly `1 / (1 + exp(-x))`; for negative `x` the
/// algebraically equal `exp(x) / (1 + exp(x))` is used instead.
pub fn stable_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// How strongly each coefficient enters the mandate alternative's utility.
///
/// Categorical attributes are dummy coded against their reference level
/// (high-risk scope, medical exemptions only, 50% coverage). The opt-out
/// alternative only carries its own constant and is handled separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesignVector {
    weights: [f64; NUM_ATTRIBUTES],
}

impl DesignVector {
    pub fn for_policy(config: &PolicyConfiguration) -> Self {
        let mut weights = [0.0; NUM_ATTRIBUTES];
        weights[Attribute::MandateIntercept.index()] = 1.0;

        if config.scope() == Scope::All {
            weights[Attribute::ScopeAll.index()] = 1.0;
        }

        match config.exemption_policy() {
            ExemptionPolicy::MedicalOnly => {}
            ExemptionPolicy::MedicalReligious => {
                weights[Attribute::ExemptionMedRel.index()] = 1.0;
            }
            ExemptionPolicy::MedicalReligiousPersonal => {
                weights[Attribute::ExemptionMedRelPers.index()] = 1.0;
            }
        }

        match config.coverage_threshold() {
            CoverageThreshold::Half => {}
            CoverageThreshold::Seventy => weights[Attribute::Coverage70.index()] = 1.0,
            CoverageThreshold::Ninety => weights[Attribute::Coverage90.index()] = 1.0,
        }

        weights[Attribute::LivesSavedSlope.index()] = config.lives_saved_per_100k();

        Self { weights }
    }

    pub fn weight(&self, attribute: Attribute) -> f64 {
        self.weights[attribute.index()]
    }

    /// Attributes that contribute to the mandate's utility, in canonical order.
    pub fn active_attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::ALL
            .into_iter()
            .filter(|&attribute| attribute != Attribute::OptOutIntercept)
            .filter(|&attribute| self.weights[attribute.index()] != 0.0)
    }
}

/// Individual coefficients `mean + sd * z` for one draw.
pub fn individual_coefficients(
    coefficients: &CoefficientSet,
    z: ArrayView1<f64>,
) -> [f64; NUM_ATTRIBUTES] {
    let mut beta = [0.0; NUM_ATTRIBUTES];
    for attribute in Attribute::ALL {
        beta[attribute.index()] = coefficients.mean(attribute)
            + coefficients.standard_deviation(attribute) * z[attribute.index()];
    }
    beta
}

/// `U(mandate) - U(opt-out)` for one simulated respondent.
pub fn utility_difference(
    coefficients: &CoefficientSet,
    design: &DesignVector,
    z: ArrayView1<f64>,
) -> f64 {
    let beta = individual_coefficients(coefficients, z);
    let mandate: f64 = design
        .active_attributes()
        .map(|attribute| beta[attribute.index()] * design.weight(attribute))
        .sum();
    mandate - beta[Attribute::OptOutIntercept.index()]
}

/// Monte Carlo estimator over a shared coefficient table and draw panel.
#[derive(Debug, Clone, Copy)]
pub struct MixedLogitSimulator<'a> {
    table: &'a CoefficientTable,
    panel: &'a DrawPanel,
}

impl<'a> MixedLogitSimulator<'a> {
    pub fn new(table: &'a CoefficientTable, panel: &'a DrawPanel) -> Self {
        Self { table, panel }
    }

    /// Probability that a randomly drawn respondent chooses the mandate.
    ///
    /// Returns `None` when the table has no coefficients for the
    /// configuration's country and outbreak scenario. That is an expected,
    /// incomplete state rather than an error.
    pub fn estimate_support(&self, config: &PolicyConfiguration) -> Option<f64> {
        let Some(coefficients) = self.table.get(config.country(), config.severity()) else {
            log::debug!(
                "No coefficients for {}/{}; support is undefined",
                config.country(),
                config.severity()
            );
            return None;
        };

        let design = DesignVector::for_policy(config);
        let total: f64 = self
            .panel
            .rows()
            .map(|z| stable_sigmoid(utility_difference(coefficients, &design, z)))
            .sum();

        Some(total / self.panel.num_draws() as f64)
    }

    /// Evaluates many configurations in parallel. Output order matches input order.
    pub fn estimate_batch(&self, configs: &[PolicyConfiguration]) -> Vec<Option<f64>> {
        configs
            .par_iter()
            .map(|config| self.estimate_support(config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Country, Severity};
    use approx::assert_relative_eq;

    fn configuration(
        scope: Scope,
        exemption_policy: ExemptionPolicy,
        coverage: CoverageThreshold,
        lives: f64,
    ) -> PolicyConfiguration {
        PolicyConfiguration::new(
            Country::Australia,
            Severity::Mild,
            scope,
            exemption_policy,
            coverage,
            lives,
        )
        .unwrap()
    }

    #[test]
    fn stable_sigmoid_matches_naive_form_in_typical_range() {
        for step in -500..=500 {
            let x = step as f64 / 10.0;
            let naive = 1.0 / (1.0 + (-x).exp());
            assert_relative_eq!(stable_sigmoid(x), naive, max_relative = 1e-12);
        }
    }

    #[test]
    fn stable_sigmoid_saturates_without_nan() {
        assert_eq!(stable_sigmoid(1e6), 1.0);
        assert_eq!(stable_sigmoid(-1e6), 0.0);
        assert_eq!(stable_sigmoid(0.0), 0.5);
        assert!(stable_sigmoid(-800.0) >= 0.0);
    }

    #[test]
    fn reference_design_only_switches_on_intercept_and_lives() {
        let config = configuration(
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            10.0,
        );
        let design = DesignVector::for_policy(&config);
        let active: Vec<Attribute> = design.active_attributes().collect();
        assert_eq!(
            active,
            vec![Attribute::MandateIntercept, Attribute::LivesSavedSlope]
        );
        assert_eq!(design.weight(Attribute::LivesSavedSlope), 10.0);
    }

    #[test]
    fn reference_utility_equals_intercept_baseline() {
        let table = CoefficientTable::builtin();
        let coefficients = table.get(Country::Australia, Severity::Mild).unwrap();
        let panel = DrawPanel::from_seed(11, 50).unwrap();
        let lives = 7.5;
        let design = DesignVector::for_policy(&configuration(
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            lives,
        ));

        for z in panel.rows() {
            let beta = individual_coefficients(coefficients, z);
            let baseline = beta[Attribute::MandateIntercept.index()]
                + beta[Attribute::LivesSavedSlope.index()] * lives
                - beta[Attribute::OptOutIntercept.index()];
            assert_eq!(utility_difference(coefficients, &design, z), baseline);
        }
    }

    #[test]
    fn each_level_adds_exactly_its_own_coefficient() {
        let table = CoefficientTable::builtin();
        let coefficients = table.get(Country::Australia, Severity::Mild).unwrap();
        let panel = DrawPanel::from_seed(3, 10).unwrap();
        let reference = DesignVector::for_policy(&configuration(
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            0.0,
        ));
        let cases = [
            (
                configuration(
                    Scope::All,
                    ExemptionPolicy::MedicalOnly,
                    CoverageThreshold::Half,
                    0.0,
                ),
                Attribute::ScopeAll,
            ),
            (
                configuration(
                    Scope::HighRiskOnly,
                    ExemptionPolicy::MedicalReligious,
                    CoverageThreshold::Half,
                    0.0,
                ),
                Attribute::ExemptionMedRel,
            ),
            (
                configuration(
                    Scope::HighRiskOnly,
                    ExemptionPolicy::MedicalReligiousPersonal,
                    CoverageThreshold::Half,
                    0.0,
                ),
                Attribute::ExemptionMedRelPers,
            ),
            (
                configuration(
                    Scope::HighRiskOnly,
                    ExemptionPolicy::MedicalOnly,
                    CoverageThreshold::Seventy,
                    0.0,
                ),
                Attribute::Coverage70,
            ),
            (
                configuration(
                    Scope::HighRiskOnly,
                    ExemptionPolicy::MedicalOnly,
                    CoverageThreshold::Ninety,
                    0.0,
                ),
                Attribute::Coverage90,
            ),
        ];

        for (config, attribute) in cases {
            let design = DesignVector::for_policy(&config);
            for z in panel.rows() {
                let beta = individual_coefficients(coefficients, z);
                let delta = utility_difference(coefficients, &design, z)
                    - utility_difference(coefficients, &reference, z);
                assert_relative_eq!(delta, beta[attribute.index()], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn support_is_a_probability_and_reproducible() {
        let table = CoefficientTable::builtin();
        let panel = DrawPanel::from_seed(123_456_789, 1000).unwrap();
        let simulator = MixedLogitSimulator::new(&table, &panel);
        let config = configuration(
            Scope::All,
            ExemptionPolicy::MedicalReligiousPersonal,
            CoverageThreshold::Ninety,
            25.0,
        );

        let first = simulator.estimate_support(&config).unwrap();
        let second = simulator.estimate_support(&config).unwrap();
        assert!(first > 0.0 && first < 1.0);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn more_lives_saved_raises_support() {
        let table = CoefficientTable::builtin();
        let panel = DrawPanel::from_seed(5, 2000).unwrap();
        let simulator = MixedLogitSimulator::new(&table, &panel);
        let low = configuration(
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            0.0,
        );
        let high = configuration(
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            50.0,
        );
        assert!(simulator.estimate_support(&high) > simulator.estimate_support(&low));
    }

    #[test]
    fn missing_table_entry_yields_none() {
        let table = CoefficientTable::from_toml_str("").unwrap();
        let panel = DrawPanel::from_seed(1, 10).unwrap();
        let simulator = MixedLogitSimulator::new(&table, &panel);
        let config = configuration(
            Scope::HighRiskOnly,
            ExemptionPolicy::MedicalOnly,
            CoverageThreshold::Half,
            1.0,
        );
        assert_eq!(simulator.estimate_support(&config), None);
    }

    #[test]
    fn batch_matches_sequential_bit_for_bit() {
        let table = CoefficientTable::builtin();
        let panel = DrawPanel::from_seed(99, 500).unwrap();
        let simulator = MixedLogitSimulator::new(&table, &panel);

        let mut configs = Vec::new();
        for scope in [Scope::HighRiskOnly, Scope::All] {
            for exemption in [
                ExemptionPolicy::MedicalOnly,
                ExemptionPolicy::MedicalReligious,
                ExemptionPolicy::MedicalReligiousPersonal,
            ] {
                for coverage in [
                    CoverageThreshold::Half,
                    CoverageThreshold::Seventy,
                    CoverageThreshold::Ninety,
                ] {
                    configs.push(configuration(scope, exemption, coverage, 12.0));
                }
            }
        }

        let batch = simulator.estimate_batch(&configs);
        assert_eq!(batch.len(), configs.len());
        for (config, estimate) in configs.iter().zip(batch) {
            let sequential = simulator.estimate_support(config).unwrap();
            assert_eq!(estimate.unwrap().to_bits(), sequential.to_bits());
        }
    }
}
