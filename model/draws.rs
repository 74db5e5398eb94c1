//! # Deterministic Draw Panel
//!
//! The mixed-logit integral is approximated with a fixed panel of
//! standard-normal draws, one per coefficient per simulated respondent.
//!
//! - Reproducibility: draws come from a Mulberry32 stream seeded with a
//!   fixed integer and transformed with Box–Muller. All arithmetic is
//!   wrapping 32-bit integer math followed by a single division, so the
//!   same seed gives bit-identical panels on every platform.
//! - Generate Once: the panel is built a single time and shared read-only.
//!   `DrawPanel::shared` holds the default panel for the whole process.
//! - Layout: an `N x 8` matrix, row `r` is respondent `r`, columns follow
//!   `Attribute::ALL`.

use crate::coefficients::{Attribute, NUM_ATTRIBUTES};
use ndarray::{Array2, ArrayView1};
use std::f64::consts::PI;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Seed of the default panel. Changing it changes every published estimate.
pub const DEFAULT_SEED: u32 = 123_456_789;

/// Number of simulated respondents in the default panel.
pub const DEFAULT_NUM_DRAWS: usize = 1000;

const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;
const UNIFORM_SCALE: f64 = 4_294_967_296.0;

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("A draw panel needs at least one draw.")]
    NoDraws,
}

/// Small counter-based uniform generator (Mulberry32).
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next uniform value in `[0, 1)`.
    pub fn next_uniform(&mut self) -> f64 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / UNIFORM_SCALE
    }

    // Zero would put ln(0) into Box–Muller.
    fn next_positive_uniform(&mut self) -> f64 {
        loop {
            let u = self.next_uniform();
            if u != 0.0 {
                return u;
            }
        }
    }

    /// One standard-normal sample via the cosine branch of Box–Muller.
    pub fn next_standard_normal(&mut self) -> f64 {
        let u = self.next_positive_uniform();
        let v = self.next_positive_uniform();
        (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
    }
}

/// An immutable panel of standard-normal draws.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPanel {
    seed: u32,
    draws: Array2<f64>,
}

static SHARED_PANEL: OnceLock<Arc<DrawPanel>> = OnceLock::new();

impl DrawPanel {
    /// Builds a panel of `num_draws` rows from a fresh generator seeded with `seed`.
    pub fn from_seed(seed: u32, num_draws: usize) -> Result<Self, DrawError> {
        if num_draws == 0 {
            return Err(DrawError::NoDraws);
        }
        Ok(Self::fill(seed, num_draws))
    }

    /// The default panel, generated on first use and then reused for the
    /// lifetime of the process.
    pub fn shared() -> Arc<DrawPanel> {
        Arc::clone(
            SHARED_PANEL.get_or_init(|| Arc::new(Self::fill(DEFAULT_SEED, DEFAULT_NUM_DRAWS))),
        )
    }

    fn fill(seed: u32, num_draws: usize) -> Self {
        let mut generator = Mulberry32::new(seed);
        // Row-major fill: every attribute of draw r before any of draw r + 1.
        let draws = Array2::from_shape_fn((num_draws, NUM_ATTRIBUTES), |_| {
            generator.next_standard_normal()
        });
        log::info!(
            "Generated {} standard-normal draws for {} coefficients from seed {}",
            num_draws,
            NUM_ATTRIBUTES,
            seed
        );
        Self { seed, draws }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn num_draws(&self) -> usize {
        self.draws.nrows()
    }

    pub fn value(&self, r: usize, attribute: Attribute) -> f64 {
        self.draws[[r, attribute.index()]]
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.draws.rows().into_iter()
    }

    pub fn column(&self, attribute: Attribute) -> ArrayView1<'_, f64> {
        self.draws.column(attribute.index())
    }
}
