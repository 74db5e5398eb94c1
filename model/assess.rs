//! Traffic-light style classification of derived metrics, and the
//! "what changed" comparison between two evaluations.

use crate::economics::{DerivedMetrics, Settings};

const SUPPORT_LOW_BELOW: f64 = 0.5;
const SUPPORT_MEDIUM_BELOW: f64 = 0.7;
const HEADLINE_BROAD_SUPPORT: f64 = 0.6;
const BCR_UNFAVOURABLE_BELOW: f64 = 0.8;
const BCR_UNCERTAIN_BELOW: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportBand {
    Low,
    Medium,
    High,
}

impl SupportBand {
    pub fn classify(probability: f64) -> Self {
        if probability < SUPPORT_LOW_BELOW {
            SupportBand::Low
        } else if probability < SUPPORT_MEDIUM_BELOW {
            SupportBand::Medium
        } else {
            SupportBand::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcrBand {
    NotDefined,
    Unfavourable,
    Uncertain,
    Favourable,
}

impl BcrBand {
    pub fn classify(bcr: Option<f64>) -> Self {
        match bcr {
            None => BcrBand::NotDefined,
            Some(ratio) if ratio < BCR_UNFAVOURABLE_BELOW => BcrBand::Unfavourable,
            Some(ratio) if ratio < BCR_UNCERTAIN_BELOW => BcrBand::Uncertain,
            Some(_) => BcrBand::Favourable,
        }
    }
}

/// Which of the two monetary inputs have been supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCompleteness {
    Complete,
    BenefitOnly,
    CostsOnly,
    Incomplete,
}

impl DataCompleteness {
    pub fn classify(cost_total: f64, valuation_per_unit: f64) -> Self {
        match (cost_total > 0.0, valuation_per_unit > 0.0) {
            (true, true) => DataCompleteness::Complete,
            (false, true) => DataCompleteness::BenefitOnly,
            (true, false) => DataCompleteness::CostsOnly,
            (false, false) => DataCompleteness::Incomplete,
        }
    }
}

/// Overall verdict combining support with the benefit-cost ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlineRating {
    /// High support and a BCR of at least 1.
    Strong,
    /// Broad support and a BCR of at least 1.
    Favourable,
    /// Limited support and no BCR of at least 1.
    Weak,
    TradeOff,
}

impl HeadlineRating {
    /// A missing support estimate ranks as limited support, and a missing
    /// BCR as one below 1.
    pub fn classify(support: Option<f64>, bcr: Option<f64>) -> Self {
        let support = support.unwrap_or(0.0);
        let pays_off = bcr.is_some_and(|ratio| ratio >= BCR_UNCERTAIN_BELOW);

        if support >= SUPPORT_MEDIUM_BELOW && pays_off {
            HeadlineRating::Strong
        } else if support >= HEADLINE_BROAD_SUPPORT && pays_off {
            HeadlineRating::Favourable
        } else if support < SUPPORT_LOW_BELOW && !pays_off {
            HeadlineRating::Weak
        } else {
            HeadlineRating::TradeOff
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    /// `None` when support could not be estimated.
    pub support: Option<SupportBand>,
    pub bcr: BcrBand,
    pub data: DataCompleteness,
    pub headline: HeadlineRating,
}

pub fn assess(metrics: &DerivedMetrics, settings: &Settings) -> Assessment {
    Assessment {
        support: metrics.support_probability.map(SupportBand::classify),
        bcr: BcrBand::classify(metrics.bcr),
        data: DataCompleteness::classify(metrics.cost_total, settings.valuation_per_unit()),
        headline: HeadlineRating::classify(metrics.support_probability, metrics.bcr),
    }
}

/// Change from one evaluation to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsDelta {
    /// Percentage points; `None` unless both evaluations have an estimate.
    pub support_points: Option<f64>,
    /// `None` unless both evaluations have a defined BCR.
    pub bcr: Option<f64>,
    pub lives_saved: f64,
    pub cost: f64,
}

impl MetricsDelta {
    pub fn between(before: &DerivedMetrics, after: &DerivedMetrics) -> Self {
        let support_points = before
            .support_probability
            .zip(after.support_probability)
            .map(|(b, a)| (a - b) * 100.0);
        Self {
            support_points,
            bcr: before.bcr.zip(after.bcr).map(|(b, a)| a - b),
            lives_saved: after.lives_saved_total - before.lives_saved_total,
            cost: after.cost_total - before.cost_total,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.support_points.is_none_or(|d| d == 0.0)
            && self.bcr.is_none_or(|d| d == 0.0)
            && self.lives_saved == 0.0
            && self.cost == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metrics(support: Option<f64>, cost: f64, bcr: Option<f64>) -> DerivedMetrics {
        DerivedMetrics {
            support_probability: support,
            lives_saved_total: 100.0,
            benefit_monetary: 1_000.0,
            cost_total: cost,
            net_benefit: 1_000.0 - cost,
            bcr,
        }
    }

    #[test]
    fn support_band_edges() {
        assert_eq!(SupportBand::classify(0.4999), SupportBand::Low);
        assert_eq!(SupportBand::classify(0.5), SupportBand::Medium);
        assert_eq!(SupportBand::classify(0.6999), SupportBand::Medium);
        assert_eq!(SupportBand::classify(0.7), SupportBand::High);
    }

    #[test]
    fn bcr_band_edges() {
        assert_eq!(BcrBand::classify(None), BcrBand::NotDefined);
        assert_eq!(BcrBand::classify(Some(0.79)), BcrBand::Unfavourable);
        assert_eq!(BcrBand::classify(Some(0.8)), BcrBand::Uncertain);
        assert_eq!(BcrBand::classify(Some(1.0)), BcrBand::Favourable);
    }

    #[test]
    fn headline_rating_combines_support_and_bcr() {
        use HeadlineRating::*;
        assert_eq!(HeadlineRating::classify(Some(0.7), Some(1.0)), Strong);
        assert_eq!(HeadlineRating::classify(Some(0.69), Some(2.0)), Favourable);
        assert_eq!(HeadlineRating::classify(Some(0.6), Some(1.0)), Favourable);
        assert_eq!(HeadlineRating::classify(Some(0.8), Some(0.99)), TradeOff);
        assert_eq!(HeadlineRating::classify(Some(0.55), Some(3.0)), TradeOff);
        assert_eq!(HeadlineRating::classify(Some(0.49), Some(0.5)), Weak);
        assert_eq!(HeadlineRating::classify(Some(0.3), None), Weak);
        assert_eq!(HeadlineRating::classify(Some(0.3), Some(1.5)), TradeOff);
        assert_eq!(HeadlineRating::classify(None, None), Weak);
    }

    #[test]
    fn data_completeness_reflects_inputs() {
        let settings = Settings::new(1.0, 10.0).unwrap();
        let assessment = assess(&metrics(Some(0.8), 0.0, None), &settings);
        assert_eq!(assessment.data, DataCompleteness::BenefitOnly);
        assert_eq!(assessment.support, Some(SupportBand::High));
        assert_eq!(assessment.bcr, BcrBand::NotDefined);
        assert_eq!(assessment.headline, HeadlineRating::TradeOff);

        let unvalued = Settings::new(1.0, 0.0).unwrap();
        assert_eq!(
            assess(&metrics(None, 5.0, Some(0.0)), &unvalued).data,
            DataCompleteness::CostsOnly
        );
        assert_eq!(
            assess(&metrics(None, 0.0, None), &unvalued).data,
            DataCompleteness::Incomplete
        );
        assert_eq!(assess(&metrics(None, 0.0, None), &unvalued).support, None);
    }

    #[test]
    fn delta_reports_changes_and_undefined_ratios() {
        let before = metrics(Some(0.55), 0.0, None);
        let after = metrics(Some(0.62), 500.0, Some(2.0));
        let delta = MetricsDelta::between(&before, &after);

        assert_relative_eq!(delta.support_points.unwrap(), 7.0, epsilon = 1e-9);
        assert_eq!(delta.bcr, None);
        assert_eq!(delta.cost, 500.0);
        assert_eq!(delta.lives_saved, 0.0);
        assert!(!delta.is_unchanged());

        assert!(MetricsDelta::between(&after, &after).is_unchanged());
    }
}
