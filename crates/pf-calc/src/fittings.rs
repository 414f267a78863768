//! 2-K fitting losses (Hooper) with area-ratio entrance, exit and swage terms.

use pf_core::units::constants::M_PER_INCH;
use pf_model::{Fitting, FittingBreakdown, FittingStyle, FittingType, PipeSection};

use crate::common::{FlowState, section_diameter, shacham_friction_factor};
use crate::error::{CalcError, CalcResult};
use crate::traits::{CalcContext, LossCalculator};

/// Tabulated `(k1, k_inf)` for a fitting type and style.
///
/// Returns `None` for the area-ratio types handled by formula.
pub fn two_k_coefficients(fitting_type: FittingType, style: FittingStyle) -> Option<(f64, f64)> {
    use FittingStyle::*;
    use FittingType::*;
    let row = match (fitting_type, style) {
        (Elbow90, Scrd) => (800.0, 0.40),
        (Elbow90, LongRadius) => (800.0, 0.20),
        (Elbow90, _) => (800.0, 0.25),
        (Elbow45, LongRadius) => (500.0, 0.15),
        (Elbow45, _) => (500.0, 0.20),
        (UBend, Scrd) => (1000.0, 0.60),
        (UBend, LongRadius) => (1000.0, 0.30),
        (UBend, _) => (1000.0, 0.35),
        (StubInElbow, _) => (1000.0, 1.00),
        (TeeElbow, Scrd) => (500.0, 0.70),
        (TeeElbow, StubIn) => (1000.0, 1.00),
        (TeeElbow, _) => (800.0, 0.80),
        (TeeThrough, Scrd) => (200.0, 0.10),
        (TeeThrough, StubIn) => (100.0, 0.00),
        (TeeThrough, _) => (150.0, 0.05),
        (BlockValveFullLineSize, _) => (300.0, 0.10),
        (BlockValveReducedTrim09, _) => (500.0, 0.15),
        (BlockValveReducedTrim08, _) => (1000.0, 0.25),
        (GlobeValve, _) => (1500.0, 4.00),
        (DiaphragmValve, _) => (1000.0, 2.00),
        (ButterflyValve, _) => (800.0, 0.25),
        (CheckValveSwing, _) => (1500.0, 1.50),
        (CheckValveLift, _) => (2000.0, 10.0),
        (CheckValveTilting, _) => (1000.0, 0.50),
        (PipeEntranceNormal | PipeEntranceRaised | PipeExit | InletSwage | OutletSwage, _) => {
            return None;
        }
    };
    Some(row)
}

/// Hooper contraction coefficient referenced to the upstream (large) bore.
///
/// `beta` is small/large diameter; `re` and `f` are evaluated upstream.
pub fn contraction_k(beta: f64, re: f64, f: f64) -> f64 {
    let b2 = beta * beta;
    let b4 = b2 * b2;
    if re < 2500.0 {
        (1.2 + 160.0 / re) * (1.0 / b4 - 1.0)
    } else {
        (0.6 + 0.48 * f) * (1.0 / b2) * (1.0 / b2 - 1.0)
    }
}

/// Hooper expansion coefficient referenced to the upstream (small) bore.
pub fn expansion_k(beta: f64, re: f64, f: f64) -> f64 {
    let b2 = beta * beta;
    if re < 4000.0 {
        2.0 * (1.0 - b2 * b2)
    } else {
        let one_minus = 1.0 - b2;
        (1.0 + 0.8 * f) * one_minus * one_minus
    }
}

/// Loss coefficient of a change of bore, on the pipe velocity basis.
///
/// Flow passes from `upstream` to `downstream`; `re_pipe` is the Reynolds
/// number in the section bore `pipe`.
fn swage_k(upstream: f64, downstream: f64, pipe: f64, re_pipe: f64, roughness: f64) -> CalcResult<f64> {
    if (upstream - downstream).abs() <= f64::EPSILON * pipe {
        return Ok(0.0);
    }
    let re_up = re_pipe * pipe / upstream;
    let f_up = shacham_friction_factor(re_up, roughness / upstream)?;
    let beta = upstream.min(downstream) / upstream.max(downstream);
    let k_up = if downstream < upstream {
        contraction_k(beta, re_up, f_up)
    } else {
        expansion_k(beta, re_up, f_up)
    };
    Ok(k_up * (pipe / upstream).powi(4))
}

/// Applies the 2-K method to every fitting on a section.
#[derive(Debug, Clone, Copy, Default)]
pub struct FittingLossCalculator;

impl FittingLossCalculator {
    /// Loss coefficient of one fitting.
    ///
    /// `re` is the section Reynolds number, `diameter` the section bore.
    pub fn k_each(&self, fitting: &Fitting, section: &PipeSection, re: f64, diameter: f64) -> CalcResult<f64> {
        if !(diameter > 0.0) {
            return Err(CalcError::non_physical(format!("fitting diameter {diameter}")));
        }
        if !(re > 0.0) {
            return Err(CalcError::non_physical(format!("fitting Reynolds number {re}")));
        }
        if let Some((k1, k_inf)) = two_k_coefficients(fitting.fitting_type, fitting.style) {
            let d_in = diameter / M_PER_INCH;
            return Ok(k1 / re + k_inf * (1.0 + 1.0 / d_in));
        }

        let spec = section.spec();
        let inlet_ratio = spec.inlet_diameter.map_or(1.0, |d| diameter / d);
        let outlet_ratio = spec.outlet_diameter.map_or(1.0, |d| diameter / d);
        let k = match fitting.fitting_type {
            FittingType::PipeEntranceNormal => (160.0 / re + 0.5) * inlet_ratio.powi(4),
            FittingType::PipeEntranceRaised => (160.0 / re + 1.0) * inlet_ratio.powi(4),
            FittingType::PipeExit => outlet_ratio.powi(4),
            FittingType::InletSwage => match spec.inlet_diameter {
                Some(d_in) => swage_k(d_in, diameter, diameter, re, spec.roughness)?,
                None => 0.0,
            },
            FittingType::OutletSwage => match spec.outlet_diameter {
                Some(d_out) => swage_k(diameter, d_out, diameter, re, spec.roughness)?,
                None => 0.0,
            },
            _ => 0.0,
        };
        Ok(k)
    }
}

impl LossCalculator for FittingLossCalculator {
    fn name(&self) -> &'static str {
        "fittings"
    }

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()> {
        section.calculation_output.fittings.clear();
        if !section.has_pipeline_segment() || section.has_component() || section.fittings().is_empty() {
            section.fitting_k = Some(0.0);
            section.calculation_output.pressure_drop.fitting_k = Some(0.0);
            return Ok(());
        }

        let diameter = section_diameter(section)?;
        let state = FlowState::at(section, ctx.fluid, diameter)?;
        let re = state.positive_reynolds()?;

        let mut breakdown = Vec::with_capacity(section.fittings().len());
        for fitting in section.fittings() {
            let k_each = self.k_each(fitting, section, re, diameter)?;
            breakdown.push(FittingBreakdown {
                fitting_type: fitting.fitting_type,
                count: fitting.count,
                k_each,
                k_total: f64::from(fitting.count) * k_each,
            });
        }
        let total: f64 = breakdown.iter().map(|b| b.k_total).sum();

        section.fitting_k = Some(total);
        section.calculation_output.pressure_drop.fitting_k = Some(total);
        section.calculation_output.fittings = breakdown;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_model::{ControlValve, Fluid, PipeSectionSpec};

    fn section(fittings: Vec<Fitting>) -> PipeSection {
        let mut s = PipeSection::new(PipeSectionSpec {
            id: "run".into(),
            length: 20.0,
            pipe_diameter: Some(0.1),
            fittings,
            ..PipeSectionSpec::default()
        })
        .unwrap();
        s.mass_flow_rate = Some(5.0);
        s.temperature = Some(293.15);
        s.pressure = Some(3e5);
        s
    }

    fn water() -> Fluid {
        Fluid::liquid("water", 998.2, 1e-3).unwrap()
    }

    #[test]
    fn elbow_follows_two_k() {
        let fluid = water();
        let mut s = section(vec![Fitting::new(FittingType::Elbow90, 1).unwrap()]);
        FittingLossCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        let re = crate::common::reynolds(5.0, 0.1, 1e-3);
        let expected = 800.0 / re + 0.25 * (1.0 + M_PER_INCH / 0.1);
        assert!((s.fitting_k.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn counts_multiply() {
        let fluid = water();
        let ctx = CalcContext::new(&fluid);
        let mut one = section(vec![Fitting::new(FittingType::GlobeValve, 1).unwrap()]);
        let mut four = section(vec![Fitting::new(FittingType::GlobeValve, 4).unwrap()]);
        FittingLossCalculator.calculate(&mut one, &ctx).unwrap();
        FittingLossCalculator.calculate(&mut four, &ctx).unwrap();
        assert!((four.fitting_k.unwrap() - 4.0 * one.fitting_k.unwrap()).abs() < 1e-12);
        let entry = &four.calculation_output.fittings[0];
        assert!((entry.k_each * f64::from(entry.count) - entry.k_total).abs() < 1e-12);
    }

    #[test]
    fn zero_without_pipeline_or_with_equipment() {
        let fluid = water();
        let ctx = CalcContext::new(&fluid);
        let mut s = PipeSection::new(PipeSectionSpec {
            id: "cv".into(),
            length: 5.0,
            pipe_diameter: Some(0.1),
            fittings: vec![Fitting::new(FittingType::Elbow90, 2).unwrap()],
            control_valve: Some(ControlValve {
                cv: Some(100.0),
                ..ControlValve::default()
            }),
            ..PipeSectionSpec::default()
        })
        .unwrap();
        FittingLossCalculator.calculate(&mut s, &ctx).unwrap();
        assert_eq!(s.fitting_k, Some(0.0));
        assert!(s.calculation_output.fittings.is_empty());
    }

    #[test]
    fn stagnant_flow_is_rejected() {
        let fluid = water();
        let mut s = section(vec![Fitting::new(FittingType::TeeThrough, 1).unwrap()]);
        s.mass_flow_rate = Some(0.0);
        assert!(FittingLossCalculator.calculate(&mut s, &CalcContext::new(&fluid)).is_err());
    }

    #[test]
    fn swage_terms_convert_to_pipe_basis() {
        // sudden contraction 0.2 m -> 0.1 m, turbulent
        let k = swage_k(0.2, 0.1, 0.1, 1e6, 4.57e-5).unwrap();
        let re_up = 1e6 * 0.1 / 0.2;
        let f = shacham_friction_factor(re_up, 4.57e-5 / 0.2).unwrap();
        let expected = contraction_k(0.5, re_up, f) * 0.5f64.powi(4);
        assert!((k - expected).abs() < 1e-12);
        assert!(k > 0.0);

        // expansion referenced to its own (upstream) bore needs no conversion
        let k = swage_k(0.1, 0.2, 0.1, 1e6, 4.57e-5).unwrap();
        assert!(k > 0.5 && k < 0.6);
        assert_eq!(swage_k(0.1, 0.1, 0.1, 1e6, 4.57e-5).unwrap(), 0.0);
    }

    #[test]
    fn entrance_and_exit_on_same_bore() {
        let fluid = water();
        let mut s = section(vec![
            Fitting::new(FittingType::PipeEntranceNormal, 1).unwrap(),
            Fitting::new(FittingType::PipeExit, 1).unwrap(),
        ]);
        FittingLossCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        let re = crate::common::reynolds(5.0, 0.1, 1e-3);
        let expected = 160.0 / re + 0.5 + 1.0;
        assert!((s.fitting_k.unwrap() - expected).abs() < 1e-12);
    }
}
