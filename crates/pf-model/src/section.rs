//! Pipe sections: one network segment with geometry, equipment and outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::components::{ControlValve, Fitting, Orifice};
use crate::error::{ModelError, ModelResult, non_negative, positive, positive_opt};
use crate::fluid::Fluid;
use crate::outputs::{CalculationOutput, ResultSummary};

/// Default absolute roughness of commercial steel, m.
pub const DEFAULT_ROUGHNESS: f64 = 4.57e-5;

/// Convention for the reported friction factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionFactorType {
    #[default]
    Darcy,
    /// Darcy / 4.
    Fanning,
}

impl fmt::Display for FrictionFactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrictionFactorType::Darcy => "darcy",
            FrictionFactorType::Fanning => "fanning",
        })
    }
}

impl FromStr for FrictionFactorType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "darcy" | "moody" => Ok(FrictionFactorType::Darcy),
            "fanning" => Ok(FrictionFactorType::Fanning),
            _ => Err(ModelError::UnknownVariant {
                what: "friction factor type",
                value: s.to_string(),
            }),
        }
    }
}

/// Construction input for [`PipeSection`]. All values SI.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeSectionSpec {
    pub id: String,
    pub start_node: Option<String>,
    pub end_node: Option<String>,
    pub length: f64,
    /// Outlet elevation minus inlet elevation.
    pub elevation_change: f64,
    pub roughness: f64,
    pub pipe_diameter: Option<f64>,
    pub inlet_diameter: Option<f64>,
    pub outlet_diameter: Option<f64>,
    pub fittings: Vec<Fitting>,
    pub user_k: Option<f64>,
    pub safety_factor: f64,
    pub user_specified_fixed_loss: Option<f64>,
    pub control_valve: Option<ControlValve>,
    pub orifice: Option<Orifice>,
    pub boundary_pressure: Option<f64>,
    pub flow_splitting_factor: f64,
    pub friction_factor_type: FrictionFactorType,
    pub mass_flow_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
}

impl Default for PipeSectionSpec {
    fn default() -> Self {
        Self {
            id: String::new(),
            start_node: None,
            end_node: None,
            length: 0.0,
            elevation_change: 0.0,
            roughness: DEFAULT_ROUGHNESS,
            pipe_diameter: None,
            inlet_diameter: None,
            outlet_diameter: None,
            fittings: Vec::new(),
            user_k: None,
            safety_factor: 1.0,
            user_specified_fixed_loss: None,
            control_valve: None,
            orifice: None,
            boundary_pressure: None,
            flow_splitting_factor: 1.0,
            friction_factor_type: FrictionFactorType::Darcy,
            mass_flow_rate: None,
            temperature: None,
            pressure: None,
        }
    }
}

/// A validated network segment.
///
/// Geometry and equipment are fixed at construction; the public fields are
/// owned by the solver and overwritten on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeSection {
    spec: PipeSectionSpec,
    pub fitting_k: Option<f64>,
    pub pipe_length_k: Option<f64>,
    pub total_k: Option<f64>,
    pub mass_flow_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub equivalent_length: Option<f64>,
    pub calculation_output: CalculationOutput,
    pub result_summary: ResultSummary,
}

impl PipeSection {
    pub fn new(spec: PipeSectionSpec) -> ModelResult<Self> {
        if spec.id.trim().is_empty() {
            return Err(ModelError::Missing {
                what: "section id".into(),
            });
        }
        non_negative("length", spec.length)?;
        if !spec.elevation_change.is_finite() || spec.elevation_change.abs() > spec.length {
            return Err(ModelError::invalid(
                "elevation_change",
                format!(
                    "|{}| exceeds section length {} in section '{}'",
                    spec.elevation_change, spec.length, spec.id
                ),
            ));
        }
        non_negative("roughness", spec.roughness)?;
        positive_opt("pipe_diameter", spec.pipe_diameter)?;
        positive_opt("inlet_diameter", spec.inlet_diameter)?;
        positive_opt("outlet_diameter", spec.outlet_diameter)?;
        positive("safety_factor", spec.safety_factor)?;
        positive("flow_splitting_factor", spec.flow_splitting_factor)?;
        if let Some(k) = spec.user_k {
            non_negative("user_k", k)?;
        }
        if let Some(dp) = spec.user_specified_fixed_loss {
            if !dp.is_finite() {
                return Err(ModelError::invalid("user_specified_fixed_loss", "must be finite"));
            }
        }
        positive_opt("boundary_pressure", spec.boundary_pressure)?;
        if let Some(m) = spec.mass_flow_rate {
            non_negative("mass_flow_rate", m)?;
        }
        positive_opt("temperature", spec.temperature)?;
        positive_opt("pressure", spec.pressure)?;
        for fitting in &spec.fittings {
            fitting.validate()?;
        }
        if spec.control_valve.is_some() && spec.orifice.is_some() {
            return Err(ModelError::invalid(
                "section",
                format!(
                    "section '{}' declares both a control valve and an orifice",
                    spec.id
                ),
            ));
        }
        if let Some(valve) = &spec.control_valve {
            valve.validate()?;
        }
        if let Some(orifice) = &spec.orifice {
            orifice.validate()?;
        }

        Ok(Self {
            mass_flow_rate: spec.mass_flow_rate,
            temperature: spec.temperature,
            pressure: spec.pressure,
            spec,
            fitting_k: None,
            pipe_length_k: None,
            total_k: None,
            equivalent_length: None,
            calculation_output: CalculationOutput::default(),
            result_summary: ResultSummary::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// The validated construction input.
    pub fn spec(&self) -> &PipeSectionSpec {
        &self.spec
    }

    pub fn length(&self) -> f64 {
        self.spec.length
    }

    pub fn elevation_change(&self) -> f64 {
        self.spec.elevation_change
    }

    pub fn pipe_diameter(&self) -> Option<f64> {
        self.spec.pipe_diameter
    }

    pub fn fittings(&self) -> &[Fitting] {
        &self.spec.fittings
    }

    pub fn control_valve(&self) -> Option<&ControlValve> {
        self.spec.control_valve.as_ref()
    }

    pub fn orifice(&self) -> Option<&Orifice> {
        self.spec.orifice.as_ref()
    }

    pub fn has_pipeline_segment(&self) -> bool {
        self.spec.length > 0.0
    }

    /// True when a control valve or orifice governs the section's loss.
    pub fn has_component(&self) -> bool {
        self.spec.control_valve.is_some() || self.spec.orifice.is_some()
    }

    /// Diameter used for velocity: the pipe diameter, else the inlet diameter.
    pub fn flow_diameter(&self) -> Option<f64> {
        self.spec.pipe_diameter.or(self.spec.inlet_diameter)
    }

    /// Volumetric flow at the section's current state, m³/s.
    pub fn current_volumetric_flow_rate(&self, fluid: &Fluid) -> ModelResult<f64> {
        let m = self.require_positive("mass_flow_rate", self.mass_flow_rate)?;
        let t = self.require_positive("temperature", self.temperature)?;
        let p = self.require_positive("pressure", self.pressure)?;
        let rho = fluid.density_at(t, p)?;
        if rho == 0.0 {
            return Err(ModelError::invalid(
                "density",
                format!("resolved to zero in section '{}'", self.spec.id),
            ));
        }
        Ok(m / rho)
    }

    fn require_positive(&self, what: &'static str, v: Option<f64>) -> ModelResult<f64> {
        match v {
            Some(v) => positive(what, v),
            None => Err(ModelError::Missing {
                what: format!("{what} for section '{}'", self.spec.id),
            }),
        }
    }

    /// Replace the valve's pressure drop, as the optimizer does.
    pub fn set_control_valve_pressure_drop(&mut self, pressure_drop: f64) -> ModelResult<()> {
        let id = self.spec.id.clone();
        let valve = self.spec.control_valve.as_mut().ok_or_else(|| ModelError::Missing {
            what: format!("control valve on section '{id}'"),
        })?;
        valve.pressure_drop = Some(non_negative("control_valve.pressure_drop", pressure_drop)?);
        Ok(())
    }

    /// Pin explicit endpoints, used when cutting subnetworks.
    pub(crate) fn with_endpoints(mut self, start: &str, end: &str) -> Self {
        self.spec.start_node = Some(start.to_string());
        self.spec.end_node = Some(end.to_string());
        self
    }

    /// Clear solver-owned outputs, keeping assigned flow and state.
    pub fn reset_outputs(&mut self) {
        self.fitting_k = None;
        self.pipe_length_k = None;
        self.total_k = None;
        self.equivalent_length = None;
        self.calculation_output = CalculationOutput::default();
        self.result_summary = ResultSummary::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FittingType;

    fn pipe(id: &str) -> PipeSectionSpec {
        PipeSectionSpec {
            id: id.into(),
            length: 50.0,
            pipe_diameter: Some(0.1),
            ..PipeSectionSpec::default()
        }
    }

    #[test]
    fn elevation_cannot_exceed_length() {
        let spec = PipeSectionSpec {
            elevation_change: 60.0,
            ..pipe("riser")
        };
        let err = PipeSection::new(spec).unwrap_err();
        assert!(err.to_string().contains("elevation_change"));
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(
            PipeSection::new(PipeSectionSpec {
                pipe_diameter: Some(0.0),
                ..pipe("d0")
            })
            .is_err()
        );
        assert!(
            PipeSection::new(PipeSectionSpec {
                length: -1.0,
                ..pipe("neg")
            })
            .is_err()
        );
        assert!(
            PipeSection::new(PipeSectionSpec {
                flow_splitting_factor: 0.0,
                ..pipe("split")
            })
            .is_err()
        );
        assert!(
            PipeSection::new(PipeSectionSpec {
                fittings: vec![Fitting {
                    fitting_type: FittingType::Elbow90,
                    style: Default::default(),
                    count: 0,
                }],
                ..pipe("fit")
            })
            .is_err()
        );
    }

    #[test]
    fn pipeline_and_component_flags() {
        let run = PipeSection::new(pipe("run")).unwrap();
        assert!(run.has_pipeline_segment());
        assert!(!run.has_component());

        let valve = PipeSection::new(PipeSectionSpec {
            id: "cv".into(),
            control_valve: Some(ControlValve {
                adjustable: true,
                ..ControlValve::default()
            }),
            ..PipeSectionSpec::default()
        })
        .unwrap();
        assert!(!valve.has_pipeline_segment());
        assert!(valve.has_component());
    }

    #[test]
    fn volumetric_flow_needs_state() {
        let water = Fluid::liquid("water", 1000.0, 1e-3).unwrap();
        let mut section = PipeSection::new(pipe("q")).unwrap();
        assert!(section.current_volumetric_flow_rate(&water).is_err());

        section.mass_flow_rate = Some(2.0);
        section.temperature = Some(300.0);
        section.pressure = Some(2e5);
        let q = section.current_volumetric_flow_rate(&water).unwrap();
        assert!((q - 0.002).abs() < 1e-15);

        section.pressure = Some(0.0);
        assert!(section.current_volumetric_flow_rate(&water).is_err());
    }

    #[test]
    fn optimizer_can_reset_valve_drop() {
        let mut section = PipeSection::new(PipeSectionSpec {
            id: "cv".into(),
            control_valve: Some(ControlValve {
                adjustable: true,
                ..ControlValve::default()
            }),
            ..PipeSectionSpec::default()
        })
        .unwrap();
        section.set_control_valve_pressure_drop(12_000.0).unwrap();
        assert_eq!(section.control_valve().unwrap().pressure_drop, Some(12_000.0));

        let mut plain = PipeSection::new(pipe("plain")).unwrap();
        assert!(plain.set_control_valve_pressure_drop(1.0).is_err());
    }

    #[test]
    fn friction_convention_parses() {
        assert_eq!("Fanning".parse::<FrictionFactorType>().unwrap(), FrictionFactorType::Fanning);
        assert!("colebrook".parse::<FrictionFactorType>().is_err());
    }
}
