//! Calculator trait and shared evaluation context.

use pf_core::units::constants::G0_MPS2;
use pf_model::{Fluid, PipeSection};

use crate::error::CalcResult;

/// What every calculator sees besides the section itself.
#[derive(Debug, Clone, Copy)]
pub struct CalcContext<'a> {
    pub fluid: &'a Fluid,
    /// Gravitational acceleration, m/s².
    pub gravity: f64,
}

impl<'a> CalcContext<'a> {
    pub fn new(fluid: &'a Fluid) -> Self {
        Self {
            fluid,
            gravity: G0_MPS2,
        }
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }
}

/// One pressure-loss contribution.
///
/// Implementations read the section's current state (flow, temperature,
/// inlet pressure) and write their term into
/// `section.calculation_output.pressure_drop`.
pub trait LossCalculator {
    fn name(&self) -> &'static str;

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()>;
}
