//! pf-calc: per-section pressure-loss calculators.
//!
//! Each calculator implements [`LossCalculator`] and writes one term of a
//! section's [`pf_model::PressureDropDetails`]. The solver runs them in a
//! fixed order; see [`standard_pipeline`].
//!
//! Also hosts the compressible-flow solvers used by gas sections.

pub mod common;
pub mod elevation;
pub mod error;
pub mod fittings;
pub mod fixed;
pub mod friction;
pub mod gas_flow;
pub mod orifice;
pub mod traits;
pub mod valve;

pub use elevation::ElevationCalculator;
pub use error::{CalcError, CalcResult};
pub use fittings::FittingLossCalculator;
pub use fixed::{NormalizedLossCalculator, UserFixedLossCalculator};
pub use friction::FrictionCalculator;
pub use gas_flow::{GasFlowCalculator, GasFlowDirection, GasFlowInputs, GasState};
pub use orifice::OrificeCalculator;
pub use traits::{CalcContext, LossCalculator};
pub use valve::ControlValveCalculator;

use pf_model::PipeSection;

/// Calculators that run before the compressible-flow correction, in order.
pub fn standard_pipeline() -> Vec<Box<dyn LossCalculator>> {
    vec![
        Box::new(FittingLossCalculator),
        Box::new(FrictionCalculator),
        Box::new(ElevationCalculator),
        Box::new(ControlValveCalculator),
        Box::new(OrificeCalculator),
        Box::new(UserFixedLossCalculator),
    ]
}

/// Run the full loss pipeline on one section and return its total loss.
///
/// `gas` replaces the pipe-and-fittings term for gas sections; liquids ignore it.
pub fn evaluate_section(
    section: &mut PipeSection,
    ctx: &CalcContext<'_>,
    gas: &GasFlowCalculator,
) -> CalcResult<f64> {
    section.calculation_output = Default::default();
    for calc in standard_pipeline() {
        calc.calculate(section, ctx)?;
        tracing::trace!(section = section.id(), calculator = calc.name(), "loss term evaluated");
    }
    gas.calculate(section, ctx)?;
    NormalizedLossCalculator.calculate(section, ctx)?;
    Ok(section.calculation_output.pressure_drop.finalize_total())
}
