//! Orifice plates (ISO 5167-2, Reader-Harris/Gallagher).

use std::f64::consts::PI;

use pf_core::{BisectConfig, PfError, bisect};
use pf_model::{Fluid, Orifice, OrificeSizing, OrificeTaps, PipeSection};

use crate::common::{area, reynolds};
use crate::error::{CalcError, CalcResult};
use crate::traits::{CalcContext, LossCalculator};

const EXPANSIBILITY_ITERATIONS: usize = 50;

/// Beta range searched when only a pressure drop is given.
pub const BETA_SEARCH: (f64, f64) = (0.1, 0.99);

/// Tap spacing `(L1, L2')` relative to the pipe diameter.
fn tap_spacing(taps: OrificeTaps, pipe_diameter: f64) -> (f64, f64) {
    match taps {
        OrificeTaps::Corner => (0.0, 0.0),
        OrificeTaps::Flange => {
            let l = 0.0254 / pipe_diameter;
            (l, l)
        }
        OrificeTaps::DAndDHalf => (1.0, 0.47),
    }
}

/// Reader-Harris/Gallagher discharge coefficient.
pub fn discharge_coefficient(beta: f64, re_d: f64, pipe_diameter: f64, taps: OrificeTaps) -> f64 {
    let (l1, l2) = tap_spacing(taps, pipe_diameter);
    let b2 = beta * beta;
    let b4 = b2 * b2;
    let b8 = b4 * b4;
    let a = (19_000.0 * beta / re_d).powf(0.8);
    let m2 = 2.0 * l2 / (1.0 - beta);

    let upstream_tap = if l1 >= 0.4333 {
        0.039
    } else {
        0.043 + 0.080 * (-10.0 * l1).exp() - 0.123 * (-7.0 * l1).exp()
    };

    let mut c = 0.5961 + 0.0261 * b2 - 0.216 * b8
        + 0.000_521 * (1e6 * beta / re_d).powf(0.7)
        + (0.0188 + 0.0063 * a) * beta.powf(3.5) * (1e6 / re_d).powf(0.3)
        + upstream_tap * (1.0 - 0.11 * a) * b4 / (1.0 - b4)
        - 0.031 * (m2 - 0.8 * m2.powf(1.1)) * beta.powf(1.3);
    // small-bore correction below 71.12 mm
    if pipe_diameter < 0.071_12 {
        c += 0.011 * (0.75 - beta) * (2.8 - pipe_diameter / 0.0254);
    }
    c
}

/// Expansibility factor for a compressible fluid.
pub fn expansibility(beta: f64, dp: f64, p1: f64, k: f64) -> f64 {
    let b4 = beta.powi(4);
    1.0 - (0.351 + 0.256 * b4 + 0.93 * b4 * b4) * (1.0 - ((p1 - dp) / p1).powf(1.0 / k))
}

/// Unrecovered fraction of the differential pressure.
pub fn permanent_loss_ratio(beta: f64, c: f64) -> f64 {
    let b2 = beta * beta;
    let root = (1.0 - b2 * b2 * (1.0 - c * c)).sqrt();
    (root - c * b2) / (root + c * b2)
}

/// Upstream conditions and bore geometry for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct OrificeFlow<'a> {
    pub fluid: &'a Fluid,
    pub mass_flow: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub pipe_diameter: f64,
    pub taps: OrificeTaps,
}

/// Solved differential across the plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrificeSolution {
    pub beta: f64,
    pub differential_pressure: f64,
    pub discharge_coefficient: f64,
    pub expansibility: f64,
    pub permanent_loss: f64,
}

impl OrificeFlow<'_> {
    /// Differential pressure producing the mass flow through a plate of `beta`.
    pub fn solve(&self, beta: f64) -> CalcResult<OrificeSolution> {
        if !(beta > 0.0 && beta < 1.0) {
            return Err(CalcError::non_physical(format!(
                "orifice beta ratio must lie in (0, 1) (got {beta})"
            )));
        }
        let rho = self.fluid.density_at(self.temperature, self.pressure)?;
        let re_d = reynolds(self.mass_flow, self.pipe_diameter, self.fluid.viscosity());
        let c = discharge_coefficient(beta, re_d, self.pipe_diameter, self.taps);
        let bore = area(beta * self.pipe_diameter);
        let approach = 1.0 / (1.0 - beta.powi(4)).sqrt();
        let dp_for = |eps: f64| {
            let v = self.mass_flow / (c * approach * eps * bore);
            v * v / (2.0 * rho)
        };

        let mut eps = 1.0;
        let mut dp = dp_for(eps);
        if self.fluid.is_gas() {
            let k = self
                .fluid
                .specific_heat_ratio()
                .ok_or_else(|| CalcError::missing("specific_heat_ratio"))?;
            let mut converged = false;
            for _ in 0..EXPANSIBILITY_ITERATIONS {
                if dp >= self.pressure {
                    return Err(CalcError::non_physical(format!(
                        "orifice differential {dp} Pa exceeds inlet pressure {} Pa",
                        self.pressure
                    )));
                }
                let next = expansibility(beta, dp, self.pressure, k);
                let done = (next - eps).abs() < 1e-12;
                eps = next;
                dp = dp_for(eps);
                if done {
                    converged = true;
                    break;
                }
            }
            if !converged {
                return Err(PfError::ConvergenceFailed {
                    what: "orifice expansibility",
                    iterations: EXPANSIBILITY_ITERATIONS,
                }
                .into());
            }
        }

        Ok(OrificeSolution {
            beta,
            differential_pressure: dp,
            discharge_coefficient: c,
            expansibility: eps,
            permanent_loss: permanent_loss_ratio(beta, c) * dp,
        })
    }

    /// Beta whose permanent loss matches `target` Pa.
    pub fn solve_beta(&self, target: f64) -> CalcResult<OrificeSolution> {
        let cfg = BisectConfig {
            max_iterations: 50,
            f_tol: 1.0,
        };
        let residual = |beta: f64| -> Result<f64, PfError> {
            Ok(self.solve(beta)?.permanent_loss - target)
        };
        let root = bisect("orifice beta", residual, BETA_SEARCH.0, BETA_SEARCH.1, cfg)?;
        if !root.converged {
            tracing::warn!(
                beta = root.x,
                residual = root.fx,
                "orifice beta bisection hit its iteration cap"
            );
        }
        self.solve(root.x)
    }
}

/// Orifice loss with soft failure when the flow state is not yet available.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrificeCalculator;

impl OrificeCalculator {
    fn degrade(section: &mut PipeSection, reason: String) {
        tracing::warn!(section = section.id(), %reason, "orifice pressure drop set to zero");
        let output = &mut section.calculation_output;
        output.pressure_drop.orifice_pressure_drop = Some(0.0);
        output.note(format!("orifice pressure drop not evaluated: {reason}"));
    }

    fn flow<'a>(section: &PipeSection, fluid: &'a Fluid, orifice: &Orifice) -> Result<OrificeFlow<'a>, String> {
        let mass_flow = match section.mass_flow_rate {
            Some(m) if m > 0.0 => m,
            _ => return Err("mass flow unavailable".into()),
        };
        let pressure = section.pressure.filter(|p| *p > 0.0).ok_or("inlet pressure unavailable")?;
        let temperature = section
            .temperature
            .filter(|t| *t > 0.0)
            .ok_or("temperature unavailable")?;
        let pipe_diameter = orifice
            .pipe_diameter
            .or(section.flow_diameter())
            .ok_or("pipe diameter unavailable")?;
        Ok(OrificeFlow {
            fluid,
            mass_flow,
            pressure,
            temperature,
            pipe_diameter,
            taps: orifice.taps,
        })
    }
}

impl LossCalculator for OrificeCalculator {
    fn name(&self) -> &'static str {
        "orifice"
    }

    fn calculate(&self, section: &mut PipeSection, ctx: &CalcContext<'_>) -> CalcResult<()> {
        let Some(orifice) = section.orifice().cloned() else {
            section.calculation_output.pressure_drop.orifice_pressure_drop = None;
            section.calculation_output.orifice = None;
            return Ok(());
        };
        let pipe_diameter = orifice.pipe_diameter.or(section.flow_diameter());

        // beta from the ratio, or from the bore over the pipe diameter
        let beta = match (orifice.d_over_d_ratio, orifice.orifice_diameter) {
            (Some(beta), _) => Some(beta),
            (None, Some(d)) => {
                let pipe = pipe_diameter.ok_or_else(|| {
                    CalcError::missing(format!("pipe_diameter for orifice on section '{}'", section.id()))
                })?;
                Some(d / pipe)
            }
            (None, None) => None,
        };
        if let Some(beta) = beta {
            if !(beta > 0.0 && beta < 1.0) {
                return Err(CalcError::non_physical(format!(
                    "orifice beta ratio must lie in (0, 1) (got {beta})"
                )));
            }
        }

        let Some(beta) = beta else {
            let target = orifice.pressure_drop.ok_or_else(|| {
                CalcError::missing("orifice pressure_drop, d_over_d_ratio or orifice_diameter")
            })?;
            section.calculation_output.pressure_drop.orifice_pressure_drop = Some(target);
            let flow = Self::flow(section, ctx.fluid, &orifice);
            let sizing = match flow.map(|f| f.solve_beta(target).map(|s| (f, s))) {
                Ok(Ok((f, s))) => sizing(&f, &s),
                Ok(Err(e)) => {
                    section.calculation_output.note(format!("orifice beta not solved: {e}"));
                    OrificeSizing {
                        pipe_diameter,
                        permanent_loss: Some(target),
                        ..OrificeSizing::default()
                    }
                }
                Err(reason) => {
                    section.calculation_output.note(format!("orifice beta not solved: {reason}"));
                    OrificeSizing {
                        pipe_diameter,
                        permanent_loss: Some(target),
                        ..OrificeSizing::default()
                    }
                }
            };
            section.calculation_output.orifice = Some(sizing);
            return Ok(());
        };

        let flow = match Self::flow(section, ctx.fluid, &orifice) {
            Ok(flow) => flow,
            Err(reason) => {
                Self::degrade(section, reason);
                return Ok(());
            }
        };
        match flow.solve(beta) {
            Ok(solution) => {
                let output = &mut section.calculation_output;
                output.pressure_drop.orifice_pressure_drop = Some(solution.permanent_loss);
                output.orifice = Some(sizing(&flow, &solution));
            }
            Err(e) => Self::degrade(section, e.to_string()),
        }
        Ok(())
    }
}

fn sizing(flow: &OrificeFlow<'_>, s: &OrificeSolution) -> OrificeSizing {
    OrificeSizing {
        beta: Some(s.beta),
        orifice_diameter: Some(s.beta * flow.pipe_diameter),
        pipe_diameter: Some(flow.pipe_diameter),
        discharge_coefficient: Some(s.discharge_coefficient),
        expansibility: Some(s.expansibility),
        differential_pressure: Some(s.differential_pressure),
        permanent_loss: Some(s.permanent_loss),
    }
}

/// Mass flow through a plate at a given differential (inverse of [`OrificeFlow::solve`]).
pub fn mass_flow_at(beta: f64, pipe_diameter: f64, c: f64, eps: f64, rho: f64, dp: f64) -> f64 {
    let d = beta * pipe_diameter;
    c / (1.0 - beta.powi(4)).sqrt() * eps * PI / 4.0 * d * d * (2.0 * dp * rho).sqrt()
}
