//! Lives-saved equivalents (marginal rates of substitution) of the
//! categorical design changes in a configuration, computed from the mean
//! coefficients: `mrs = -beta_attribute / beta_lives`.
//!
//! A positive value means the change is as unattractive as losing that many
//! expected lives saved per 100,000 people; a negative value means it is as
//! attractive as gaining that many.

use crate::coefficients::{Attribute, CoefficientTable};
use crate::config::{CoverageThreshold, ExemptionPolicy, PolicyConfiguration, Scope};

/// Callers never show more rows than there are categorical attributes.
pub const MRS_MAX_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    MorePreferred,
    LessPreferred,
}

impl Preference {
    fn of(value: f64) -> Self {
        if value >= 0.0 {
            Preference::LessPreferred
        } else {
            Preference::MorePreferred
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MrsRow {
    pub attribute: Attribute,
    pub label: &'static str,
    /// Expected lives saved per 100,000 with the same effect on utility.
    pub value: f64,
    pub direction: Preference,
}

/// The non-reference levels switched on by a configuration, each with its
/// row label, in display order: scope, exemptions, coverage.
pub fn changed_attributes(config: &PolicyConfiguration) -> Vec<(Attribute, &'static str)> {
    let mut changes = Vec::with_capacity(MRS_MAX_ROWS);

    if config.scope() == Scope::All {
        changes.push((
            Attribute::ScopeAll,
            "Scope: high-risk occupations → all occupations & public spaces",
        ));
    }

    match config.exemption_policy() {
        ExemptionPolicy::MedicalOnly => {}
        ExemptionPolicy::MedicalReligious => changes.push((
            Attribute::ExemptionMedRel,
            "Exemptions: medical only → medical + religious",
        )),
        ExemptionPolicy::MedicalReligiousPersonal => changes.push((
            Attribute::ExemptionMedRelPers,
            "Exemptions: medical only → medical + religious + personal belief",
        )),
    }

    match config.coverage_threshold() {
        CoverageThreshold::Half => {}
        CoverageThreshold::Seventy => changes.push((
            Attribute::Coverage70,
            "Coverage threshold: 50% → 70% vaccinated",
        )),
        CoverageThreshold::Ninety => changes.push((
            Attribute::Coverage90,
            "Coverage threshold: 50% → 90% vaccinated",
        )),
    }

    changes
}

/// MRS rows for the configuration, empty when the country/scenario is not in
/// the table or the lives-saved coefficient is zero.
pub fn compute_mrs(table: &CoefficientTable, config: &PolicyConfiguration) -> Vec<MrsRow> {
    let Some(coefficients) = table.get(config.country(), config.severity()) else {
        return Vec::new();
    };

    let beta_lives = coefficients.mean(Attribute::LivesSavedSlope);
    if beta_lives == 0.0 || !beta_lives.is_finite() {
        log::debug!(
            "Lives-saved coefficient is {beta_lives} for {}/{}; MRS undefined",
            config.country(),
            config.severity()
        );
        return Vec::new();
    }

    changed_attributes(config)
        .into_iter()
        .take(MRS_MAX_ROWS)
        .map(|(attribute, label)| {
            let value = -coefficients.mean(attribute) / beta_lives;
            MrsRow {
                attribute,
                label,
                value,
                direction: Preference::of(value),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::{CoefficientSet, NUM_ATTRIBUTES};
    use crate::config::{Country, Severity};
    use approx::assert_relative_eq;

    fn config(
        country: Country,
        severity: Severity,
        scope: Scope,
        exemption_policy: ExemptionPolicy,
        coverage: CoverageThreshold,
    ) -> PolicyConfiguration {
        PolicyConfiguration::new(country, severity, scope, exemption_policy, coverage, 10.0)
            .unwrap()
    }

    #[test]
    fn scope_all_in_severe_australia_is_more_preferred() {
        let table = CoefficientTable::builtin();
        let rows = compute_mrs(
            &table,
            &config(
                Country::Australia,
                Severity::Severe,
                Scope::All,
                ExemptionPolicy::MedicalOnly,
                CoverageThreshold::Half,
            ),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attribute, Attribute::ScopeAll);
        assert_relative_eq!(rows[0].value, -0.190 / 0.079, epsilon = 1e-12);
        assert_relative_eq!(rows[0].value, -2.405, epsilon = 1e-3);
        assert_eq!(rows[0].direction, Preference::MorePreferred);
    }

    #[test]
    fn negative_coefficients_are_less_preferred() {
        let table = CoefficientTable::builtin();
        let rows = compute_mrs(
            &table,
            &config(
                Country::Italy,
                Severity::Mild,
                Scope::All,
                ExemptionPolicy::MedicalReligiousPersonal,
                CoverageThreshold::Seventy,
            ),
        );

        let attributes: Vec<Attribute> = rows.iter().map(|row| row.attribute).collect();
        assert_eq!(
            attributes,
            vec![
                Attribute::ScopeAll,
                Attribute::ExemptionMedRelPers,
                Attribute::Coverage70
            ]
        );
        assert_relative_eq!(rows[0].value, 0.276 / 0.039, epsilon = 1e-12);
        assert_eq!(rows[0].direction, Preference::LessPreferred);
        assert_eq!(rows[1].direction, Preference::LessPreferred);
        assert_relative_eq!(rows[2].value, -0.185 / 0.039, epsilon = 1e-12);
        assert_eq!(rows[2].direction, Preference::MorePreferred);
    }

    #[test]
    fn reference_design_has_no_rows() {
        let table = CoefficientTable::builtin();
        let rows = compute_mrs(
            &table,
            &config(
                Country::France,
                Severity::Severe,
                Scope::HighRiskOnly,
                ExemptionPolicy::MedicalOnly,
                CoverageThreshold::Half,
            ),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn zero_lives_coefficient_yields_no_rows() {
        let mut means = [0.3; NUM_ATTRIBUTES];
        means[Attribute::LivesSavedSlope.index()] = 0.0;
        let set = CoefficientSet::new(means, [0.0; NUM_ATTRIBUTES]);
        let text = format!(
            "[[entry]]\ncountry = \"FR\"\nseverity = \"mild\"\n[entry.means]\n{}",
            Attribute::ALL
                .iter()
                .map(|a| format!("{} = {}\n", a.name(), set.mean(*a)))
                .collect::<String>()
        );
        let table = CoefficientTable::from_toml_str(&text).unwrap();

        let rows = compute_mrs(
            &table,
            &config(
                Country::France,
                Severity::Mild,
                Scope::All,
                ExemptionPolicy::MedicalReligious,
                CoverageThreshold::Ninety,
            ),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn unknown_cell_yields_no_rows() {
        let table = CoefficientTable::from_toml_str("").unwrap();
        let rows = compute_mrs(
            &table,
            &config(
                Country::Australia,
                Severity::Mild,
                Scope::All,
                ExemptionPolicy::MedicalOnly,
                CoverageThreshold::Half,
            ),
        );
        assert!(rows.is_empty());
    }
}
