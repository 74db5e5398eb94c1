//! Facade that owns a coefficient table and a draw panel and exposes every
//! calculation the command line needs.

use crate::assess::{self, Assessment};
use crate::coefficients::CoefficientTable;
use crate::config::PolicyConfiguration;
use crate::draws::{DrawError, DrawPanel};
use crate::economics::{self, CostBreakdown, DerivedMetrics, Settings};
use crate::mrs::{self, MrsRow};
use crate::simulate::MixedLogitSimulator;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Calculator {
    table: CoefficientTable,
    panel: Arc<DrawPanel>,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    /// Built-in coefficients with the process-wide default panel.
    pub fn new() -> Self {
        Self {
            table: CoefficientTable::builtin(),
            panel: DrawPanel::shared(),
        }
    }

    /// Built-in coefficients with a freshly generated panel.
    pub fn with_seed(seed: u32, num_draws: usize) -> Result<Self, DrawError> {
        Ok(Self {
            table: CoefficientTable::builtin(),
            panel: Arc::new(DrawPanel::from_seed(seed, num_draws)?),
        })
    }

    pub fn with_table(mut self, table: CoefficientTable) -> Self {
        log::info!("Using coefficient table with {} entries", table.len());
        self.table = table;
        self
    }

    pub fn table(&self) -> &CoefficientTable {
        &self.table
    }

    pub fn panel(&self) -> &DrawPanel {
        &self.panel
    }

    fn simulator(&self) -> MixedLogitSimulator<'_> {
        MixedLogitSimulator::new(&self.table, &self.panel)
    }

    pub fn estimate_support(&self, config: &PolicyConfiguration) -> Option<f64> {
        self.simulator().estimate_support(config)
    }

    pub fn estimate_support_batch(&self, configs: &[PolicyConfiguration]) -> Vec<Option<f64>> {
        self.simulator().estimate_batch(configs)
    }

    pub fn compute_mrs(&self, config: &PolicyConfiguration) -> Vec<MrsRow> {
        mrs::compute_mrs(&self.table, config)
    }

    /// Derived metrics with support estimated from this calculator's panel.
    pub fn compute_derived_metrics(
        &self,
        settings: &Settings,
        config: Option<&PolicyConfiguration>,
        costs: Option<&CostBreakdown>,
    ) -> Option<DerivedMetrics> {
        let support = config.and_then(|c| self.estimate_support(c));
        economics::compute_derived_metrics(settings, config, costs, support)
    }

    pub fn default_costs(&self, settings: &Settings, config: &PolicyConfiguration) -> CostBreakdown {
        economics::default_costs(settings, config)
    }

    pub fn assess(&self, metrics: &DerivedMetrics, settings: &Settings) -> Assessment {
        assess::assess(metrics, settings)
    }
}
