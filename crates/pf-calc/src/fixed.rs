//! User-declared fixed losses and the normalized friction gradient.

use pf_model::PipeSection;

use crate::error::CalcResult;
use crate::traits::{CalcContext, LossCalculator};

/// Applies `user_specified_fixed_loss` unless equipment governs the section.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFixedLossCalculator;

impl LossCalculator for UserFixedLossCalculator {
    fn name(&self) -> &'static str {
        "user_fixed_loss"
    }

    fn calculate(&self, section: &mut PipeSection, _ctx: &CalcContext<'_>) -> CalcResult<()> {
        let declared = section.spec().user_specified_fixed_loss;
        let governed = section.has_component();
        let output = &mut section.calculation_output;
        let applied = match declared {
            Some(dp) if governed => {
                output.note(format!(
                    "user_specified_fixed_loss of {dp} Pa ignored: section loss is governed by its control valve or orifice"
                ));
                None
            }
            other => other,
        };
        output.pressure_drop.user_specified_fixed_loss = applied;
        Ok(())
    }
}

/// Pipe-and-fittings loss per 100 m of equivalent length.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLossCalculator;

impl LossCalculator for NormalizedLossCalculator {
    fn name(&self) -> &'static str {
        "normalized_loss"
    }

    fn calculate(&self, section: &mut PipeSection, _ctx: &CalcContext<'_>) -> CalcResult<()> {
        let normalized = match (
            section.calculation_output.pressure_drop.pipe_and_fittings,
            section.equivalent_length,
        ) {
            (Some(dp), Some(le)) if dp > 0.0 && le > 0.0 => Some(dp / le * 100.0),
            _ => None,
        };
        section.calculation_output.pressure_drop.normalized_friction_loss = normalized;
        Ok(())
    }
}
