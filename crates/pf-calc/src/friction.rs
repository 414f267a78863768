//! Darcy-Weisbach pipe friction.

use pf_model::{FlowScheme, FrictionFactorType, PipeSection};

use crate::common::{FlowState, section_diameter, shacham_friction_factor};
use crate::error::CalcResult;
use crate::traits::{CalcContext, LossCalculator};

/// Computes `pipe_length_k`, `total_k` and the combined pipe-and-fittings loss.
///
/// Runs after [`crate::FittingLossCalculator`] so the fitting K is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrictionCalculator;

impl LossCalculator for FrictionCalculator {
    fn name(&self) -> &'static str {
        "friction"
    }

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()> {
        if section.has_component() || !section.has_pipeline_segment() {
            section.pipe_length_k = Some(0.0);
            section.total_k = Some(0.0);
            section.equivalent_length = None;
            let details = &mut section.calculation_output.pressure_drop;
            details.pipe_length_k = Some(0.0);
            details.total_k = Some(0.0);
            details.pipe_and_fittings = Some(0.0);
            return Ok(());
        }

        let diameter = section_diameter(section)?;
        let state = FlowState::at(section, ctx.fluid, diameter)?;
        let re = state.positive_reynolds()?;
        let spec = section.spec();
        let darcy = shacham_friction_factor(re, spec.roughness / diameter)?;

        let pipe_length_k = darcy * spec.length / diameter;
        let fitting_k = section.fitting_k.unwrap_or(0.0);
        let user_k = spec.user_k.unwrap_or(0.0);
        let total_k = (pipe_length_k + fitting_k + user_k) * spec.safety_factor;
        let dp = total_k * state.velocity_head();
        let reported = match spec.friction_factor_type {
            FrictionFactorType::Darcy => darcy,
            FrictionFactorType::Fanning => darcy / 4.0,
        };

        section.pipe_length_k = Some(pipe_length_k);
        section.total_k = Some(total_k);
        section.equivalent_length = Some(total_k * diameter / darcy);

        let details = &mut section.calculation_output.pressure_drop;
        details.pipe_length_k = Some(pipe_length_k);
        details.total_k = Some(total_k);
        details.pipe_and_fittings = Some(dp);
        details.reynolds_number = Some(re);
        details.frictional_factor = Some(reported);
        details.flow_scheme = Some(FlowScheme::from_reynolds(re));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_model::{Fluid, PipeSectionSpec};

    fn water_pipe(length: f64) -> PipeSection {
        let mut s = PipeSection::new(PipeSectionSpec {
            id: "p".into(),
            length,
            pipe_diameter: Some(0.1),
            ..PipeSectionSpec::default()
        })
        .unwrap();
        s.mass_flow_rate = Some(1.0);
        s.temperature = Some(293.15);
        s.pressure = Some(101_325.0);
        s
    }

    #[test]
    fn zero_length_has_no_friction() {
        let fluid = Fluid::liquid("water", 998.2, 1e-3).unwrap();
        let mut s = water_pipe(0.0);
        FrictionCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        assert_eq!(s.pipe_length_k, Some(0.0));
        assert_eq!(s.calculation_output.pressure_drop.pipe_and_fittings, Some(0.0));
    }

    #[test]
    fn zero_flow_fails() {
        let fluid = Fluid::liquid("water", 998.2, 1e-3).unwrap();
        let mut s = water_pipe(50.0);
        s.mass_flow_rate = Some(0.0);
        let err = FrictionCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap_err();
        assert!(err.to_string().contains("Reynolds"));
    }

    #[test]
    fn darcy_weisbach_and_equivalent_length() {
        let fluid = Fluid::liquid("water", 998.2, 1e-3).unwrap();
        let mut s = water_pipe(50.0);
        FrictionCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        let d = &s.calculation_output.pressure_drop;
        let f = d.frictional_factor.unwrap();
        let v = 1.0 / (998.2 * crate::common::area(0.1));
        let expected = f * 50.0 / 0.1 * 0.5 * 998.2 * v * v;
        assert!((d.pipe_and_fittings.unwrap() - expected).abs() < 1e-9);
        assert!((s.equivalent_length.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(d.flow_scheme, Some(FlowScheme::Turbulent));
    }

    #[test]
    fn fanning_is_quarter_of_darcy() {
        let fluid = Fluid::liquid("water", 998.2, 1e-3).unwrap();
        let mut darcy = water_pipe(50.0);
        let mut fanning = PipeSection::new(PipeSectionSpec {
            friction_factor_type: FrictionFactorType::Fanning,
            ..darcy.spec().clone()
        })
        .unwrap();
        fanning.mass_flow_rate = darcy.mass_flow_rate;
        fanning.temperature = darcy.temperature;
        fanning.pressure = darcy.pressure;
        let ctx = CalcContext::new(&fluid);
        FrictionCalculator.calculate(&mut darcy, &ctx).unwrap();
        FrictionCalculator.calculate(&mut fanning, &ctx).unwrap();
        let fd = darcy.calculation_output.pressure_drop.frictional_factor.unwrap();
        let ff = fanning.calculation_output.pressure_drop.frictional_factor.unwrap();
        assert!((fd / ff - 4.0).abs() < 1e-12);
        assert_eq!(
            darcy.calculation_output.pressure_drop.pipe_and_fittings,
            fanning.calculation_output.pressure_drop.pipe_and_fittings
        );
    }

    #[test]
    fn safety_factor_scales_total_k() {
        let fluid = Fluid::liquid("water", 998.2, 1e-3).unwrap();
        let mut s = PipeSection::new(PipeSectionSpec {
            id: "sf".into(),
            length: 50.0,
            pipe_diameter: Some(0.1),
            user_k: Some(2.0),
            safety_factor: 1.2,
            ..PipeSectionSpec::default()
        })
        .unwrap();
        s.mass_flow_rate = Some(1.0);
        s.temperature = Some(293.15);
        s.pressure = Some(101_325.0);
        FrictionCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        let expected = (s.pipe_length_k.unwrap() + 2.0) * 1.2;
        assert!((s.total_k.unwrap() - expected).abs() < 1e-12);
    }
}
