//! Solver-owned output records attached to sections and networks.

use pf_core::round_to;
use serde::{Deserialize, Serialize};

use crate::components::FittingType;

/// Decimal places kept by [`Rounded::rounded`].
pub const SNAPSHOT_DECIMALS: i32 = 9;

/// Copy with every float rounded for deterministic snapshot comparison.
pub trait Rounded {
    fn rounded(&self) -> Self;
}

pub(crate) fn round(v: f64) -> f64 {
    round_to(v, SNAPSHOT_DECIMALS)
}

pub(crate) fn round_opt(v: Option<f64>) -> Option<f64> {
    v.map(round)
}

/// Flow regime from the Reynolds number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowScheme {
    Laminar,
    Transitional,
    Turbulent,
}

impl FlowScheme {
    /// Laminar below 2100, turbulent from 4000.
    pub fn from_reynolds(re: f64) -> Self {
        if re < 2100.0 {
            FlowScheme::Laminar
        } else if re < 4000.0 {
            FlowScheme::Transitional
        } else {
            FlowScheme::Turbulent
        }
    }
}

/// Pressure-loss contributions of one section, Pa.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureDropDetails {
    pub pipe_and_fittings: Option<f64>,
    pub elevation_change: Option<f64>,
    pub control_valve_pressure_drop: Option<f64>,
    pub orifice_pressure_drop: Option<f64>,
    pub user_specified_fixed_loss: Option<f64>,
    pub total_segment_loss: Option<f64>,
    /// Pa per 100 m of equivalent length.
    pub normalized_friction_loss: Option<f64>,
    pub reynolds_number: Option<f64>,
    pub frictional_factor: Option<f64>,
    pub flow_scheme: Option<FlowScheme>,
    pub fitting_k: Option<f64>,
    pub pipe_length_k: Option<f64>,
    pub total_k: Option<f64>,
}

impl PressureDropDetails {
    /// Sum of the present loss terms.
    pub fn total(&self) -> f64 {
        [
            self.pipe_and_fittings,
            self.elevation_change,
            self.control_valve_pressure_drop,
            self.orifice_pressure_drop,
            self.user_specified_fixed_loss,
        ]
        .into_iter()
        .flatten()
        .sum()
    }

    /// Store [`PressureDropDetails::total`] as `total_segment_loss`.
    pub fn finalize_total(&mut self) -> f64 {
        let total = self.total();
        self.total_segment_loss = Some(total);
        total
    }

    /// Add another section's contributions term by term.
    pub fn accumulate(&mut self, other: &PressureDropDetails) {
        fn add(acc: &mut Option<f64>, v: Option<f64>) {
            if let Some(v) = v {
                *acc = Some(acc.unwrap_or(0.0) + v);
            }
        }
        add(&mut self.pipe_and_fittings, other.pipe_and_fittings);
        add(&mut self.elevation_change, other.elevation_change);
        add(&mut self.control_valve_pressure_drop, other.control_valve_pressure_drop);
        add(&mut self.orifice_pressure_drop, other.orifice_pressure_drop);
        add(&mut self.user_specified_fixed_loss, other.user_specified_fixed_loss);
        add(&mut self.total_segment_loss, other.total_segment_loss);
        add(&mut self.fitting_k, other.fitting_k);
        add(&mut self.pipe_length_k, other.pipe_length_k);
        add(&mut self.total_k, other.total_k);
    }
}

impl Rounded for PressureDropDetails {
    fn rounded(&self) -> Self {
        Self {
            pipe_and_fittings: round_opt(self.pipe_and_fittings),
            elevation_change: round_opt(self.elevation_change),
            control_valve_pressure_drop: round_opt(self.control_valve_pressure_drop),
            orifice_pressure_drop: round_opt(self.orifice_pressure_drop),
            user_specified_fixed_loss: round_opt(self.user_specified_fixed_loss),
            total_segment_loss: round_opt(self.total_segment_loss),
            normalized_friction_loss: round_opt(self.normalized_friction_loss),
            reynolds_number: round_opt(self.reynolds_number),
            frictional_factor: round_opt(self.frictional_factor),
            flow_scheme: self.flow_scheme,
            fitting_k: round_opt(self.fitting_k),
            pipe_length_k: round_opt(self.pipe_length_k),
            total_k: round_opt(self.total_k),
        }
    }
}

/// One line of the 2-K fitting breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingBreakdown {
    pub fitting_type: FittingType,
    pub count: u32,
    pub k_each: f64,
    pub k_total: f64,
}

/// Control valve sizing outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValveSizing {
    pub kv: Option<f64>,
    pub cv: Option<f64>,
    pub cg: Option<f64>,
    pub pressure_drop: Option<f64>,
    pub choked: bool,
}

/// Orifice sizing outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrificeSizing {
    pub beta: Option<f64>,
    pub orifice_diameter: Option<f64>,
    pub pipe_diameter: Option<f64>,
    pub discharge_coefficient: Option<f64>,
    pub expansibility: Option<f64>,
    pub differential_pressure: Option<f64>,
    pub permanent_loss: Option<f64>,
}

/// Compressible-flow outcome for a gas section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GasFlowOutcome {
    pub is_choked: bool,
    pub critical_pressure: Option<f64>,
    pub inlet_mach: Option<f64>,
    pub outlet_mach: Option<f64>,
}

/// Everything the calculators record for one section (or a whole network).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutput {
    pub pressure_drop: PressureDropDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fittings: Vec<FittingBreakdown>,
    pub valve: Option<ValveSizing>,
    pub orifice: Option<OrificeSizing>,
    pub gas_flow: Option<GasFlowOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl CalculationOutput {
    pub fn note(&mut self, text: impl Into<String>) {
        self.notes.push(text.into());
    }
}

impl Rounded for CalculationOutput {
    fn rounded(&self) -> Self {
        Self {
            pressure_drop: self.pressure_drop.rounded(),
            fittings: self
                .fittings
                .iter()
                .map(|f| FittingBreakdown {
                    k_each: round(f.k_each),
                    k_total: round(f.k_total),
                    ..f.clone()
                })
                .collect(),
            valve: self.valve.as_ref().map(|v| ValveSizing {
                kv: round_opt(v.kv),
                cv: round_opt(v.cv),
                cg: round_opt(v.cg),
                pressure_drop: round_opt(v.pressure_drop),
                choked: v.choked,
            }),
            orifice: self.orifice.as_ref().map(|o| OrificeSizing {
                beta: round_opt(o.beta),
                orifice_diameter: round_opt(o.orifice_diameter),
                pipe_diameter: round_opt(o.pipe_diameter),
                discharge_coefficient: round_opt(o.discharge_coefficient),
                expansibility: round_opt(o.expansibility),
                differential_pressure: round_opt(o.differential_pressure),
                permanent_loss: round_opt(o.permanent_loss),
            }),
            gas_flow: self.gas_flow.as_ref().map(|g| GasFlowOutcome {
                is_choked: g.is_choked,
                critical_pressure: round_opt(g.critical_pressure),
                inlet_mach: round_opt(g.inlet_mach),
                outlet_mach: round_opt(g.outlet_mach),
            }),
            notes: self.notes.clone(),
        }
    }
}

/// Thermodynamic state at a section or network boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePoint {
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
    pub density: Option<f64>,
    pub velocity: Option<f64>,
    pub mach_number: Option<f64>,
}

impl Rounded for StatePoint {
    fn rounded(&self) -> Self {
        Self {
            pressure: round_opt(self.pressure),
            temperature: round_opt(self.temperature),
            density: round_opt(self.density),
            velocity: round_opt(self.velocity),
            mach_number: round_opt(self.mach_number),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub inlet: StatePoint,
    pub outlet: StatePoint,
}

impl Rounded for ResultSummary {
    fn rounded(&self) -> Self {
        Self {
            inlet: self.inlet.rounded(),
            outlet: self.outlet.rounded(),
        }
    }
}
