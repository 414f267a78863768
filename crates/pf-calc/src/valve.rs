//! Control valve sizing (IEC 60534-2-1).

use pf_core::units::constants::{CV_PER_KV, PA_PER_BAR, SECONDS_PER_HOUR};
use pf_core::{BisectConfig, PfError, Root, bisect};
use pf_model::{ControlValve, Fluid, PipeSection, ValveSizing};

use crate::common::require_positive;
use crate::error::{CalcError, CalcResult};
use crate::traits::{CalcContext, LossCalculator};

/// Liquid pressure recovery factor when the valve gives none.
pub const DEFAULT_FL: f64 = 0.9;

/// IEC 60534 N6 constant for Kv with W in kg/h, P in bar, rho in kg/m³.
const N6: f64 = 27.3;

/// Gas sizing factor C1 relates to xT by `C1 = 31.6 / sqrt(xT)`.
const C1_XT_CONSTANT: f64 = 31.6;

const OUT_OF_RANGE: &str = "Specified Cv is outside the achievable range for this valve";

/// Required flow coefficient at one pressure drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KvPoint {
    pub kv: f64,
    pub choked: bool,
    /// Pressure drop actually producing flow after the choke cap, Pa.
    pub effective_dp: f64,
}

/// Inlet conditions seen by a valve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveInlet {
    pub mass_flow: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// `xT` from the valve, or back-derived from `C1`.
pub fn resolve_xt(valve: &ControlValve) -> Option<f64> {
    valve
        .xt
        .or_else(|| valve.c1.map(|c1| (C1_XT_CONSTANT / c1).powi(2)))
}

/// `C1` from the valve, or derived from `xT`.
pub fn resolve_c1(valve: &ControlValve) -> Option<f64> {
    valve
        .c1
        .or_else(|| valve.xt.map(|xt| C1_XT_CONSTANT / xt.sqrt()))
}

/// Kv needed to pass the inlet flow at pressure drop `dp`.
pub fn required_kv(fluid: &Fluid, valve: &ControlValve, inlet: &ValveInlet, dp: f64) -> CalcResult<KvPoint> {
    if !(dp.is_finite() && dp > 0.0) {
        return Err(CalcError::non_physical(format!("valve pressure drop {dp}")));
    }
    let p1 = inlet.pressure;
    let rho = fluid.density_at(inlet.temperature, p1)?;

    if fluid.is_liquid() {
        let q = inlet.mass_flow / rho * SECONDS_PER_HOUR;
        let sg = fluid.specific_gravity()?;
        let (effective_dp, choked) = match (fluid.vapor_pressure(), fluid.critical_pressure()) {
            (Some(pv), Some(pc)) => {
                let fl = valve.fl.unwrap_or(DEFAULT_FL);
                let ff = 0.96 - 0.28 * (pv / pc).sqrt();
                let dp_choked = fl * fl * (p1 - ff * pv);
                if !(dp_choked > 0.0) {
                    return Err(CalcError::non_physical(format!(
                        "choked pressure drop {dp_choked} Pa (vapor pressure above inlet)"
                    )));
                }
                (dp.min(dp_choked), dp >= dp_choked)
            }
            _ => (dp, false),
        };
        let kv = q / (effective_dp / PA_PER_BAR / sg).sqrt();
        return Ok(KvPoint {
            kv,
            choked,
            effective_dp,
        });
    }

    let xt = resolve_xt(valve).ok_or_else(|| CalcError::missing("xt or c1 for gas control valve"))?;
    let k = fluid
        .specific_heat_ratio()
        .ok_or_else(|| CalcError::missing("specific_heat_ratio"))?;
    let fk = k / 1.4;
    let x_max = fk * xt;
    let x = dp / p1;
    let choked = x >= x_max;
    let x_eff = x.min(x_max);
    let y = 1.0 - x_eff / (3.0 * fk * xt);
    let w = inlet.mass_flow * SECONDS_PER_HOUR;
    let kv = w / (N6 * y * (x_eff * p1 / PA_PER_BAR * rho).sqrt());
    Ok(KvPoint {
        kv,
        choked,
        effective_dp: x_eff * p1,
    })
}

/// Pressure drop at which the valve passes the flow with the given Cv.
///
/// Bisection over `[1 Pa, P1 - 1 Pa]`; fails when no drop in that range
/// matches.
pub fn solve_pressure_drop(fluid: &Fluid, valve: &ControlValve, inlet: &ValveInlet, cv: f64) -> CalcResult<f64> {
    let target_kv = cv / CV_PER_KV;
    let hi = inlet.pressure - 1.0;
    if hi <= 1.0 {
        return Err(CalcError::infeasible(OUT_OF_RANGE));
    }
    let cfg = BisectConfig {
        max_iterations: 80,
        f_tol: 1e-6,
    };
    let residual = |dp: f64| -> Result<f64, PfError> {
        let point = required_kv(fluid, valve, inlet, dp)?;
        Ok(point.kv / target_kv - 1.0)
    };
    match bisect("control valve pressure drop", residual, 1.0, hi, cfg) {
        Ok(root) => settle(root),
        Err(PfError::NotBracketed { .. }) => Err(CalcError::infeasible(OUT_OF_RANGE)),
        Err(e) => Err(e.into()),
    }
}

/// Relative Kv mismatch still accepted from a bisection that ran out of iterations.
const CAPPED_KV_TOLERANCE: f64 = 1e-3;

/// Accept a converged root; an unconverged one only when its Kv mismatch is small.
///
/// A bracket that narrows onto a jump in the Kv curve never converges, so the
/// requested Cv is not reachable there.
fn settle(root: Root) -> CalcResult<f64> {
    if root.converged {
        return Ok(root.x);
    }
    tracing::warn!(
        dp = root.x,
        residual = root.fx,
        iterations = root.iterations,
        "valve bisection hit its iteration cap"
    );
    if root.fx.abs() <= CAPPED_KV_TOLERANCE {
        Ok(root.x)
    } else {
        Err(CalcError::infeasible(OUT_OF_RANGE))
    }
}

/// Control valve loss, either from a specified drop or a specified Cv/Cg.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlValveCalculator;

impl ControlValveCalculator {
    fn sizing(&self, valve: &ControlValve, kv: Option<f64>, dp: f64, choked: bool) -> ValveSizing {
        let cv = kv.map(|kv| kv * CV_PER_KV);
        ValveSizing {
            kv,
            cv,
            cg: cv.and_then(|cv| resolve_c1(valve).map(|c1| c1 * cv)),
            pressure_drop: Some(dp),
            choked,
        }
    }
}

impl LossCalculator for ControlValveCalculator {
    fn name(&self) -> &'static str {
        "control_valve"
    }

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()> {
        let Some(valve) = section.control_valve().cloned() else {
            section.calculation_output.pressure_drop.control_valve_pressure_drop = None;
            section.calculation_output.valve = None;
            return Ok(());
        };
        let mass_flow = section
            .mass_flow_rate
            .ok_or_else(|| CalcError::missing(format!("mass_flow_rate for valve section '{}'", section.id())))?;
        let inlet = ValveInlet {
            mass_flow,
            pressure: require_positive("pressure", section.pressure)?,
            temperature: require_positive("temperature", section.temperature)?,
        };

        let target_cv = match (valve.cv, valve.cg) {
            (Some(cv), _) => Some(cv),
            (None, Some(cg)) => {
                let c1 = resolve_c1(&valve)
                    .ok_or_else(|| CalcError::missing("c1 or xt to convert cg to cv"))?;
                Some(cg / c1)
            }
            (None, None) => None,
        };

        let (sizing, note) = match (valve.pressure_drop, target_cv) {
            (Some(dp), _) if dp >= inlet.pressure => {
                return Err(CalcError::infeasible(format!(
                    "Specified control valve pressure drop {dp} Pa must be lower than the inlet pressure {} Pa",
                    inlet.pressure
                )));
            }
            (Some(dp), _) if dp == 0.0 || mass_flow == 0.0 => (
                self.sizing(&valve, None, dp, false),
                "control valve fully open: no sizing at zero pressure drop or flow",
            ),
            (Some(dp), _) => {
                let point = required_kv(ctx.fluid, &valve, &inlet, dp)?;
                (
                    self.sizing(&valve, Some(point.kv), dp, point.choked),
                    "control valve pressure drop specified; implied Cv back-solved",
                )
            }
            (None, Some(_)) if mass_flow == 0.0 => (
                self.sizing(&valve, None, 0.0, false),
                "no flow through control valve; pressure drop is zero",
            ),
            (None, Some(cv)) => {
                let dp = solve_pressure_drop(ctx.fluid, &valve, &inlet, cv)?;
                let point = required_kv(ctx.fluid, &valve, &inlet, dp)?;
                (
                    self.sizing(&valve, Some(point.kv), dp, point.choked),
                    "control valve Cv specified; pressure drop solved by bisection",
                )
            }
            (None, None) => (
                self.sizing(&valve, None, 0.0, false),
                "adjustable control valve not yet tuned; pressure drop taken as zero",
            ),
        };

        let output = &mut section.calculation_output;
        output.pressure_drop.control_valve_pressure_drop = sizing.pressure_drop;
        output.valve = Some(sizing);
        output.note(note);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_model::{FluidSpec, Phase, PipeSectionSpec};

    fn water() -> Fluid {
        Fluid::liquid("water", 998.2, 1e-3).unwrap()
    }

    fn inlet(mass_flow: f64, pressure: f64) -> ValveInlet {
        ValveInlet {
            mass_flow,
            pressure,
            temperature: 293.15,
        }
    }

    fn valve_section(valve: ControlValve) -> PipeSection {
        let mut s = PipeSection::new(PipeSectionSpec {
            id: "fcv".into(),
            control_valve: Some(valve),
            ..PipeSectionSpec::default()
        })
        .unwrap();
        s.mass_flow_rate = Some(10.0);
        s.pressure = Some(5e5);
        s.temperature = Some(293.15);
        s
    }

    #[test]
    fn simplified_liquid_kv() {
        let valve = ControlValve::default();
        let point = required_kv(&water(), &valve, &inlet(10.0, 5e5), 1e5).unwrap();
        let q = 10.0 / 998.2 * 3600.0;
        let expected = q * (998.2 / 999.0f64).sqrt();
        assert!((point.kv - expected).abs() < 1e-9);
        assert!(!point.choked);
    }

    #[test]
    fn liquid_choke_caps_effective_drop() {
        let fluid = Fluid::new(FluidSpec {
            name: "water".into(),
            phase: Phase::Liquid,
            density: Some(998.2),
            viscosity: 1e-3,
            vapor_pressure: Some(2_339.0),
            critical_pressure: Some(22.064e6),
            ..FluidSpec::default()
        })
        .unwrap();
        let valve = ControlValve {
            fl: Some(0.9),
            ..ControlValve::default()
        };
        let point = required_kv(&fluid, &valve, &inlet(10.0, 5e5), 4.9e5).unwrap();
        assert!(point.choked);
        assert!(point.effective_dp < 4.9e5);
    }

    #[test]
    fn gas_valve_needs_xt_or_c1() {
        let gas = Fluid::gas("N2", 28.0134, 1.0, 1.4, 1.8e-5).unwrap();
        let err = required_kv(&gas, &ControlValve::default(), &inlet(1.0, 5e5), 1e5).unwrap_err();
        assert!(err.to_string().contains("xt or c1"));
    }

    #[test]
    fn c1_and_xt_are_inverse() {
        let valve = ControlValve {
            c1: Some(35.0),
            ..ControlValve::default()
        };
        let xt = resolve_xt(&valve).unwrap();
        let back = ControlValve {
            xt: Some(xt),
            ..ControlValve::default()
        };
        assert!((resolve_c1(&back).unwrap() - 35.0).abs() < 1e-12);
    }

    #[test]
    fn specified_drop_reports_implied_cv() {
        let fluid = water();
        let mut s = valve_section(ControlValve {
            pressure_drop: Some(1e5),
            xt: Some(0.7),
            ..ControlValve::default()
        });
        ControlValveCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        let sizing = s.calculation_output.valve.clone().unwrap();
        assert!((sizing.cv.unwrap() / sizing.kv.unwrap() - CV_PER_KV).abs() < 1e-12);
        assert!(sizing.cg.is_some());
        assert_eq!(s.calculation_output.pressure_drop.control_valve_pressure_drop, Some(1e5));
        assert_eq!(s.calculation_output.notes.len(), 1);
    }

    #[test]
    fn drop_above_inlet_pressure_fails() {
        let fluid = water();
        let mut s = valve_section(ControlValve {
            pressure_drop: Some(6e5),
            ..ControlValve::default()
        });
        assert!(ControlValveCalculator.calculate(&mut s, &CalcContext::new(&fluid)).is_err());
    }

    #[test]
    fn tiny_cv_is_unreachable() {
        let fluid = water();
        let mut s = valve_section(ControlValve {
            cv: Some(0.01),
            ..ControlValve::default()
        });
        let err = ControlValveCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap_err();
        assert_eq!(err.to_string(), OUT_OF_RANGE);
    }

    #[test]
    fn untuned_adjustable_valve_is_open() {
        let fluid = water();
        let mut s = valve_section(ControlValve {
            adjustable: true,
            ..ControlValve::default()
        });
        ControlValveCalculator.calculate(&mut s, &CalcContext::new(&fluid)).unwrap();
        assert_eq!(s.calculation_output.pressure_drop.control_valve_pressure_drop, Some(0.0));
    }

    #[test]
    fn capped_bisection_is_rejected_unless_nearly_matched() {
        let capped = |fx: f64| Root {
            x: 2.5e4,
            fx,
            iterations: 80,
            converged: false,
        };
        assert_eq!(settle(capped(5e-4)).unwrap(), 2.5e4);
        let err = settle(capped(0.2)).unwrap_err();
        assert_eq!(err.to_string(), OUT_OF_RANGE);
        let done = Root { converged: true, ..capped(0.2) };
        assert_eq!(settle(done).unwrap(), 2.5e4);
    }
}
