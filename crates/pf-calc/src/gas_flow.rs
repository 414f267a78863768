//! Compressible flow through a constant-area section.
//!
//! Two models are offered: isothermal flow with friction, solved by fixed
//! point on the integrated momentum balance, and adiabatic (Fanno) flow,
//! solved exactly in terms of the Mach number. Both run from the known end of
//! the section towards the unknown end and clamp to the sonic state when the
//! requested loss cannot be carried.

use pf_core::brent;
use pf_core::units::constants::R_UNIVERSAL;
use pf_model::{Fluid, GasFlowModel, GasFlowOutcome, PipeSection};

use crate::common::area;
use crate::error::{CalcError, CalcResult};
use crate::traits::{CalcContext, LossCalculator};

const ISOTHERMAL_ITERATIONS: usize = 25;
const ISOTHERMAL_REL_TOL: f64 = 1e-6;
const FANNO_XTOL: f64 = 1e-12;
const FANNO_ITERATIONS: usize = 200;
const MIN_MACH: f64 = 1e-6;

/// Which end of the section carries the known pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasFlowDirection {
    /// Inlet known, solve the outlet.
    Forward,
    /// Outlet known, solve the inlet.
    Backward,
}

/// Physical inputs for one compressible-flow solve. All values SI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasFlowInputs {
    /// Pressure at the known end.
    pub boundary_pressure: f64,
    /// Static temperature at the known end.
    pub temperature: f64,
    pub mass_flow: f64,
    pub diameter: f64,
    pub length: f64,
    /// Total loss coefficient, friction included.
    pub k_total: f64,
    /// kg/mol.
    pub molar_mass: f64,
    pub z_factor: f64,
    pub specific_heat_ratio: f64,
    pub direction: GasFlowDirection,
}

impl GasFlowInputs {
    /// Collect inputs from a section whose `pressure` and `temperature` hold
    /// the state at the known end, listing every missing one.
    pub fn from_section(section: &PipeSection, fluid: &Fluid, direction: GasFlowDirection) -> CalcResult<Self> {
        let molar_mass = fluid.molar_mass_kg_per_mol().ok();
        let fields = [
            ("pressure", section.pressure),
            ("temperature", section.temperature),
            ("mass_flow_rate", section.mass_flow_rate),
            ("pipe_diameter", section.flow_diameter()),
            ("total_k", section.total_k),
            ("molar_mass", molar_mass),
            ("z_factor", fluid.z_factor()),
            ("specific_heat_ratio", fluid.specific_heat_ratio()),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(CalcError::MissingGasInputs {
                fields: missing.join(", "),
            });
        }
        let get = |i: usize| fields[i].1.unwrap_or_default();
        let inputs = Self {
            boundary_pressure: get(0),
            temperature: get(1),
            mass_flow: get(2),
            diameter: get(3),
            length: section.length(),
            k_total: get(4),
            molar_mass: get(5),
            z_factor: get(6),
            specific_heat_ratio: get(7),
            direction,
        };
        inputs.validate()?;
        Ok(inputs)
    }

    /// Check every physical input, naming the first offender.
    pub fn validate(&self) -> CalcResult<()> {
        let checks = [
            ("pressure", self.boundary_pressure, true),
            ("temperature", self.temperature, true),
            ("pipe_diameter", self.diameter, true),
            ("molar_mass", self.molar_mass, true),
            ("z_factor", self.z_factor, true),
            ("mass_flow_rate", self.mass_flow, false),
            ("length", self.length, false),
            ("total_k", self.k_total, false),
        ];
        for (name, v, strict) in checks {
            let ok = v.is_finite() && if strict { v > 0.0 } else { v >= 0.0 };
            if !ok {
                return Err(CalcError::non_physical(format!("gas-flow input {name} = {v}")));
            }
        }
        if !(self.specific_heat_ratio.is_finite() && self.specific_heat_ratio > 1.0) {
            return Err(CalcError::non_physical(format!(
                "gas-flow input specific_heat_ratio = {} (must exceed 1)",
                self.specific_heat_ratio
            )));
        }
        Ok(())
    }

    /// Mass flux, kg/(m² s).
    fn mass_flux(&self) -> f64 {
        self.mass_flow / area(self.diameter)
    }

    /// `z R T / MW` at temperature `t`, m²/s².
    fn specific_rt(&self, t: f64) -> f64 {
        self.z_factor * R_UNIVERSAL * t / self.molar_mass
    }

    fn state_at(&self, pressure: f64, temperature: f64) -> (f64, f64, f64) {
        let rt = self.specific_rt(temperature);
        let density = pressure / rt;
        let velocity = self.mass_flux() / density;
        let mach = velocity / (self.specific_heat_ratio * rt).sqrt();
        (density, velocity, mach)
    }

    fn no_loss(&self) -> bool {
        self.length == 0.0 || self.k_total == 0.0 || self.mass_flow == 0.0
    }
}

/// Outcome of a compressible-flow solve at the unknown end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasState {
    pub pressure: f64,
    pub temperature: f64,
    pub density: f64,
    pub velocity: f64,
    pub mach: f64,
    /// Mach number at the known end.
    pub boundary_mach: f64,
    pub is_choked: bool,
    pub critical_pressure: Option<f64>,
}

impl GasState {
    fn build(inputs: &GasFlowInputs, pressure: f64, temperature: f64, is_choked: bool, critical: Option<f64>) -> Self {
        let (density, velocity, mach) = inputs.state_at(pressure, temperature);
        let (_, _, boundary_mach) = inputs.state_at(inputs.boundary_pressure, inputs.temperature);
        Self {
            pressure,
            temperature,
            density,
            velocity,
            mach,
            boundary_mach,
            is_choked,
            critical_pressure: critical,
        }
    }

    fn unchanged(inputs: &GasFlowInputs) -> Self {
        Self::build(inputs, inputs.boundary_pressure, inputs.temperature, false, None)
    }
}

/// Dispatch on the network's gas-flow model.
pub fn solve(model: GasFlowModel, inputs: &GasFlowInputs) -> CalcResult<GasState> {
    match model {
        GasFlowModel::Isothermal => solve_isothermal(inputs),
        GasFlowModel::Adiabatic => solve_adiabatic(inputs),
    }
}

/// Isothermal flow with friction.
///
/// Iterates `P2^2 = P1^2 - (K + 2 ln(P1/P2)) G^2 zRT/MW` from the known end.
/// The critical pressure is `G sqrt(zRT/MW)`; an outlet that would fall
/// below it is clamped there and flagged as choked.
pub fn solve_isothermal(inputs: &GasFlowInputs) -> CalcResult<GasState> {
    inputs.validate()?;
    if inputs.no_loss() {
        return Ok(GasState::unchanged(inputs));
    }
    let t = inputs.temperature;
    let rt = inputs.specific_rt(t);
    let g = inputs.mass_flux();
    let c = g * g * rt;
    let critical = g * rt.sqrt();
    let k = inputs.k_total;
    let known = inputs.boundary_pressure;

    match inputs.direction {
        GasFlowDirection::Forward => {
            let p1 = known;
            if p1 <= critical {
                return Err(CalcError::infeasible(format!(
                    "gas inlet pressure {p1} Pa is at or below the critical pressure {critical} Pa"
                )));
            }
            let first = p1 * p1 - k * c;
            if first <= critical * critical {
                return Ok(GasState::build(inputs, critical, t, true, Some(critical)));
            }
            let mut p2 = first.sqrt();
            for iteration in 1..=ISOTHERMAL_ITERATIONS {
                let radicand = p1 * p1 - (k + 2.0 * (p1 / p2).ln()) * c;
                if radicand <= critical * critical {
                    return Ok(GasState::build(inputs, critical, t, true, Some(critical)));
                }
                let next = radicand.sqrt();
                let change = (next - p2).abs();
                p2 = next;
                if change <= ISOTHERMAL_REL_TOL * p1 {
                    break;
                }
                if iteration == ISOTHERMAL_ITERATIONS {
                    tracing::warn!(p2, change, "isothermal fixed point hit its iteration cap");
                }
            }
            Ok(GasState::build(inputs, p2, t, false, Some(critical)))
        }
        GasFlowDirection::Backward => {
            let choked = known < critical;
            let p2 = known.max(critical);
            let mut p1 = (p2 * p2 + k * c).sqrt();
            for iteration in 1..=ISOTHERMAL_ITERATIONS {
                let next = (p2 * p2 + (k + 2.0 * (p1 / p2).ln()) * c).sqrt();
                let change = (next - p1).abs();
                p1 = next;
                if change <= ISOTHERMAL_REL_TOL * p1 {
                    break;
                }
                if iteration == ISOTHERMAL_ITERATIONS {
                    tracing::warn!(p1, change, "isothermal fixed point hit its iteration cap");
                }
            }
            Ok(GasState::build(inputs, p1, t, choked, Some(critical)))
        }
    }
}

/// Fanno parameter `f L* / D` for Mach `m`.
pub fn fanno_parameter(m: f64, k: f64) -> f64 {
    let m2 = m * m;
    (1.0 - m2) / (k * m2) + (k + 1.0) / (2.0 * k) * ((k + 1.0) * m2 / (2.0 + (k - 1.0) * m2)).ln()
}

/// Adiabatic flow with friction (Fanno line).
///
/// The known-end Mach number fixes the distance to sonic conditions; the
/// section's total K moves along the line to the unknown end. Temperature
/// follows from constant stagnation temperature and pressure from
/// continuity, `P = G / M * sqrt(zRT / (k MW))`.
pub fn solve_adiabatic(inputs: &GasFlowInputs) -> CalcResult<GasState> {
    inputs.validate()?;
    if inputs.no_loss() {
        return Ok(GasState::unchanged(inputs));
    }
    let k = inputs.specific_heat_ratio;
    let g = inputs.mass_flux();
    let (_, _, known_mach) = inputs.state_at(inputs.boundary_pressure, inputs.temperature);

    let static_temperature = |t0: f64, m: f64| t0 / (1.0 + 0.5 * (k - 1.0) * m * m);
    let pressure_at = |t: f64, m: f64| g / m * (inputs.specific_rt(t) / k).sqrt();

    let (known_mach, boundary_choked) = if known_mach >= 1.0 {
        (1.0, true)
    } else {
        (known_mach, false)
    };
    let t0 = inputs.temperature * (1.0 + 0.5 * (k - 1.0) * known_mach * known_mach);
    let critical = pressure_at(2.0 * t0 / (k + 1.0), 1.0);

    let (mach, choked) = match inputs.direction {
        GasFlowDirection::Forward => {
            let target = fanno_parameter(known_mach, k) - inputs.k_total;
            if boundary_choked || target <= 0.0 {
                (1.0, true)
            } else {
                let root = brent(
                    "fanno outlet mach",
                    |m| Ok(fanno_parameter(m, k) - target),
                    known_mach,
                    1.0,
                    FANNO_XTOL,
                    FANNO_ITERATIONS,
                )?;
                (root.x, false)
            }
        }
        GasFlowDirection::Backward => {
            let target = fanno_parameter(known_mach, k) + inputs.k_total;
            let root = brent(
                "fanno inlet mach",
                |m| Ok(fanno_parameter(m, k) - target),
                MIN_MACH,
                known_mach,
                FANNO_XTOL,
                FANNO_ITERATIONS,
            )?;
            (root.x, boundary_choked)
        }
    };

    let t = static_temperature(t0, mach);
    let p = if mach == 1.0 { critical } else { pressure_at(t, mach) };
    Ok(GasState::build(inputs, p, t, choked, Some(critical)))
}

/// Replaces the incompressible pipe-and-fittings loss of a gas section with
/// the compressible-flow result.
///
/// Runs after [`crate::FrictionCalculator`], whose `total_k` it consumes.
/// Forward solves start from `section.pressure`; backward solves start from
/// `outlet_pressure`. Liquids and equipment-only sections are left untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasFlowCalculator {
    pub model: GasFlowModel,
    pub direction: GasFlowDirection,
    pub outlet_pressure: Option<f64>,
}

impl GasFlowCalculator {
    pub fn forward(model: GasFlowModel) -> Self {
        Self {
            model,
            direction: GasFlowDirection::Forward,
            outlet_pressure: None,
        }
    }

    pub fn backward(model: GasFlowModel, outlet_pressure: f64) -> Self {
        Self {
            model,
            direction: GasFlowDirection::Backward,
            outlet_pressure: Some(outlet_pressure),
        }
    }
}

impl LossCalculator for GasFlowCalculator {
    fn name(&self) -> &'static str {
        "gas_flow"
    }

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()> {
        if !ctx.fluid.is_gas() || section.has_component() || !section.has_pipeline_segment() {
            section.calculation_output.gas_flow = None;
            return Ok(());
        }
        let mut inputs = GasFlowInputs::from_section(section, ctx.fluid, self.direction)?;
        if self.direction == GasFlowDirection::Backward {
            inputs.boundary_pressure = self
                .outlet_pressure
                .ok_or_else(|| CalcError::missing("outlet pressure for backward gas-flow solve"))?;
            inputs.validate()?;
        }
        let state = solve(self.model, &inputs)?;
        let (inlet, outlet) = match self.direction {
            GasFlowDirection::Forward => (inputs.boundary_pressure, state.pressure),
            GasFlowDirection::Backward => (state.pressure, inputs.boundary_pressure),
        };
        let (inlet_mach, outlet_mach) = match self.direction {
            GasFlowDirection::Forward => (state.boundary_mach, state.mach),
            GasFlowDirection::Backward => (state.mach, state.boundary_mach),
        };
        if state.is_choked {
            tracing::warn!(section = section.id(), "gas flow is choked");
            section
                .calculation_output
                .note("gas flow choked; pressure clamped to the critical pressure");
        }
        let output = &mut section.calculation_output;
        output.pressure_drop.pipe_and_fittings = Some(inlet - outlet);
        output.gas_flow = Some(GasFlowOutcome {
            is_choked: state.is_choked,
            critical_pressure: state.critical_pressure,
            inlet_mach: Some(inlet_mach),
            outlet_mach: Some(outlet_mach),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nitrogen(direction: GasFlowDirection) -> GasFlowInputs {
        GasFlowInputs {
            boundary_pressure: 5e5,
            temperature: 300.0,
            mass_flow: 0.5,
            diameter: 0.05,
            length: 100.0,
            k_total: 30.0,
            molar_mass: 0.028_013_4,
            z_factor: 1.0,
            specific_heat_ratio: 1.4,
            direction,
        }
    }

    #[test]
    fn zero_length_or_k_returns_boundary() {
        for inputs in [
            GasFlowInputs {
                length: 0.0,
                ..nitrogen(GasFlowDirection::Forward)
            },
            GasFlowInputs {
                k_total: 0.0,
                ..nitrogen(GasFlowDirection::Backward)
            },
        ] {
            assert_eq!(solve_isothermal(&inputs).unwrap().pressure, 5e5);
            assert_eq!(solve_adiabatic(&inputs).unwrap().pressure, 5e5);
        }
    }

    #[test]
    fn isothermal_forward_satisfies_momentum_balance() {
        let inputs = nitrogen(GasFlowDirection::Forward);
        let state = solve_isothermal(&inputs).unwrap();
        assert!(!state.is_choked);
        let p1 = inputs.boundary_pressure;
        let p2 = state.pressure;
        let c = inputs.mass_flux().powi(2) * inputs.specific_rt(300.0);
        let residual = p1 * p1 - p2 * p2 - (inputs.k_total + 2.0 * (p1 / p2).ln()) * c;
        assert!(residual.abs() / (p1 * p1) < 1e-5);
        assert_eq!(state.temperature, 300.0);
    }

    #[test]
    fn isothermal_backward_inverts_forward() {
        let fwd = solve_isothermal(&nitrogen(GasFlowDirection::Forward)).unwrap();
        let back = solve_isothermal(&GasFlowInputs {
            boundary_pressure: fwd.pressure,
            ..nitrogen(GasFlowDirection::Backward)
        })
        .unwrap();
        assert!((back.pressure - 5e5).abs() < 5.0);
    }

    #[test]
    fn undersized_line_chokes_at_critical_pressure() {
        let inputs = GasFlowInputs {
            boundary_pressure: 2e6,
            mass_flow: 5.0,
            k_total: 200.0,
            ..nitrogen(GasFlowDirection::Forward)
        };
        let iso = solve_isothermal(&inputs).unwrap();
        assert!(iso.is_choked);
        assert_eq!(Some(iso.pressure), iso.critical_pressure);

        let fanno = solve_adiabatic(&inputs).unwrap();
        assert!(fanno.is_choked);
        assert_eq!(Some(fanno.pressure), fanno.critical_pressure);
        assert!((fanno.mach - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fanno_parameter_vanishes_at_sonic() {
        assert!(fanno_parameter(1.0, 1.4).abs() < 1e-15);
        assert!(fanno_parameter(0.3, 1.4) > fanno_parameter(0.5, 1.4));
    }

    #[test]
    fn adiabatic_forward_and_backward_agree() {
        let fwd = solve_adiabatic(&nitrogen(GasFlowDirection::Forward)).unwrap();
        assert!(fwd.pressure < 5e5);
        assert!(fwd.temperature < 300.0);
        assert!(fwd.mach > fwd.boundary_mach);

        // the inlet Mach recovered from the outlet state should match
        let back = solve_adiabatic(&GasFlowInputs {
            boundary_pressure: fwd.pressure,
            temperature: fwd.temperature,
            ..nitrogen(GasFlowDirection::Backward)
        })
        .unwrap();
        assert!((back.pressure - 5e5).abs() / 5e5 < 1e-6);
        assert!((back.temperature - 300.0).abs() < 1e-6);
    }

    #[test]
    fn inputs_are_validated() {
        let err = solve_isothermal(&GasFlowInputs {
            diameter: 0.0,
            ..nitrogen(GasFlowDirection::Forward)
        })
        .unwrap_err();
        assert!(err.to_string().contains("pipe_diameter"));
        let err = solve_adiabatic(&GasFlowInputs {
            specific_heat_ratio: 1.0,
            ..nitrogen(GasFlowDirection::Forward)
        })
        .unwrap_err();
        assert!(err.to_string().contains("specific_heat_ratio"));
    }
}
