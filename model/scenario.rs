//! In-memory register of saved scenarios, with a small pinned set for
//! side-by-side comparison.

use crate::config::PolicyConfiguration;
use crate::economics::{CostBreakdown, DerivedMetrics, Settings};
use thiserror::Error;

/// At most this many scenarios can be pinned at once.
pub const MAX_PINNED: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("No saved scenario has id {0}.")]
    UnknownScenario(u32),
}

/// A snapshot of the inputs and outputs of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedScenario {
    pub id: u32,
    pub settings: Settings,
    pub policy: PolicyConfiguration,
    pub costs: Option<CostBreakdown>,
    pub metrics: DerivedMetrics,
    pub pinned: bool,
}

/// Scenarios in the order they were saved.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegister {
    scenarios: Vec<SavedScenario>,
}

impl ScenarioRegister {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u32 {
        self.scenarios.iter().map(|s| s.id).max().map_or(1, |id| id + 1)
    }

    /// Stores a snapshot and returns its id.
    pub fn save(
        &mut self,
        settings: &Settings,
        policy: &PolicyConfiguration,
        costs: Option<&CostBreakdown>,
        metrics: &DerivedMetrics,
    ) -> u32 {
        let id = self.next_id();
        self.scenarios.push(SavedScenario {
            id,
            settings: settings.clone(),
            policy: *policy,
            costs: costs.copied(),
            metrics: *metrics,
            pinned: false,
        });
        log::debug!("Saved scenario {id}");
        id
    }

    pub fn get(&self, id: u32) -> Option<&SavedScenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: u32) -> Result<SavedScenario, ScenarioError> {
        let index = self
            .scenarios
            .iter()
            .position(|s| s.id == id)
            .ok_or(ScenarioError::UnknownScenario(id))?;
        Ok(self.scenarios.remove(index))
    }

    /// Flips the pinned flag and returns the new state. Pinning a fourth
    /// scenario unpins the earliest-saved pinned one.
    pub fn toggle_pin(&mut self, id: u32) -> Result<bool, ScenarioError> {
        let index = self
            .scenarios
            .iter()
            .position(|s| s.id == id)
            .ok_or(ScenarioError::UnknownScenario(id))?;

        if self.scenarios[index].pinned {
            self.scenarios[index].pinned = false;
            return Ok(false);
        }

        if self.pinned().count() >= MAX_PINNED {
            if let Some(oldest) = self.scenarios.iter_mut().find(|s| s.pinned) {
                log::debug!("Unpinning scenario {} to make room", oldest.id);
                oldest.pinned = false;
            }
        }
        self.scenarios[index].pinned = true;
        Ok(true)
    }

    pub fn pinned(&self) -> impl Iterator<Item = &SavedScenario> {
        self.scenarios.iter().filter(|s| s.pinned)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedScenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
