//! Shared flow-state helpers and friction-factor correlations.

use std::f64::consts::PI;

use pf_model::{Fluid, PipeSection};

use crate::error::{CalcError, CalcResult};

/// Laminar/turbulent switch for the friction factor.
pub const LAMINAR_REYNOLDS: f64 = 2100.0;

pub fn area(diameter: f64) -> f64 {
    0.25 * PI * diameter * diameter
}

/// Reynolds number for a mass flow through a circular bore.
pub fn reynolds(mass_flow: f64, diameter: f64, viscosity: f64) -> f64 {
    4.0 * mass_flow / (PI * diameter * viscosity)
}

/// Darcy friction factor: `64/Re` below Re 2100, Shacham's explicit
/// Colebrook approximation above.
pub fn shacham_friction_factor(re: f64, relative_roughness: f64) -> CalcResult<f64> {
    if !(re.is_finite() && re > 0.0) {
        return Err(CalcError::non_physical(format!(
            "Reynolds number must be positive (got {re})"
        )));
    }
    if re < LAMINAR_REYNOLDS {
        return Ok(64.0 / re);
    }
    let e = relative_roughness / 3.7;
    let inner = (e + 14.5 / re).log10();
    let outer = -2.0 * (e - 5.02 / re * inner).log10();
    Ok(1.0 / (outer * outer))
}

/// Accept a present, strictly positive value.
pub fn require_positive(what: &str, v: Option<f64>) -> CalcResult<f64> {
    match v {
        None => Err(CalcError::missing(what)),
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(CalcError::non_physical(format!("{what} must be positive (got {v})"))),
    }
}

/// Local flow conditions at a section's inlet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowState {
    pub mass_flow: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub density: f64,
    pub diameter: f64,
    pub velocity: f64,
    pub reynolds: f64,
}

impl FlowState {
    /// Evaluate the section's current state through `diameter`.
    ///
    /// Zero flow is accepted here; callers that need a Reynolds number reject it.
    pub fn at(section: &PipeSection, fluid: &Fluid, diameter: f64) -> CalcResult<Self> {
        let mass_flow = section
            .mass_flow_rate
            .ok_or_else(|| CalcError::missing(format!("mass_flow_rate for section '{}'", section.id())))?;
        if !(mass_flow.is_finite() && mass_flow >= 0.0) {
            return Err(CalcError::non_physical(format!("mass_flow_rate {mass_flow}")));
        }
        let temperature = require_positive("temperature", section.temperature)?;
        let pressure = require_positive("pressure", section.pressure)?;
        let density = fluid.density_at(temperature, pressure)?;
        if !(density > 0.0) {
            return Err(CalcError::non_physical(format!("density {density}")));
        }
        let velocity = mass_flow / (density * area(diameter));
        Ok(Self {
            mass_flow,
            temperature,
            pressure,
            density,
            diameter,
            velocity,
            reynolds: reynolds(mass_flow, diameter, fluid.viscosity()),
        })
    }

    /// The Reynolds number, rejecting stagnant flow.
    pub fn positive_reynolds(&self) -> CalcResult<f64> {
        if self.reynolds > 0.0 && self.reynolds.is_finite() {
            Ok(self.reynolds)
        } else {
            Err(CalcError::non_physical(format!(
                "Reynolds number must be positive (got {})",
                self.reynolds
            )))
        }
    }

    /// Dynamic pressure `rho V^2 / 2`.
    pub fn velocity_head(&self) -> f64 {
        0.5 * self.density * self.velocity * self.velocity
    }
}

/// Diameter carrying the section's velocity, or an error naming it.
pub fn section_diameter(section: &PipeSection) -> CalcResult<f64> {
    require_positive(
        &format!("pipe_diameter for section '{}'", section.id()),
        section.flow_diameter(),
    )
}
