//! Hydrostatic head.

use pf_model::PipeSection;

use crate::common::require_positive;
use crate::error::{CalcError, CalcResult};
use crate::traits::{CalcContext, LossCalculator};

/// `dP = rho g dz` for liquids; gases and equipment sections contribute zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElevationCalculator;

impl LossCalculator for ElevationCalculator {
    fn name(&self) -> &'static str {
        "elevation"
    }

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()> {
        if ctx.fluid.is_gas() || section.has_component() {
            section.calculation_output.pressure_drop.elevation_change = Some(0.0);
            return Ok(());
        }
        if !(ctx.gravity.is_finite() && ctx.gravity > 0.0) {
            return Err(CalcError::non_physical(format!("gravity {}", ctx.gravity)));
        }
        let t = require_positive("temperature", section.temperature)?;
        let p = require_positive("pressure", section.pressure)?;
        let rho = ctx.fluid.density_at(t, p)?;
        if !(rho > 0.0) {
            return Err(CalcError::non_physical(format!("density {rho}")));
        }
        let dp = rho * ctx.gravity * section.elevation_change();
        section.calculation_output.pressure_drop.elevation_change = Some(dp);
        Ok(())
    }
}
