//! Single-phase fluid property model.

use std::fmt;
use std::str::FromStr;

use pf_core::units::constants::{R_UNIVERSAL, WATER_DENSITY_REF};
use pf_core::units::{Density, Pressure, Temperature, kgpm3};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, positive, positive_opt};

/// Fluid phase as declared by the loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Liquid,
    Gas,
    Vapor,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Liquid => "liquid",
            Phase::Gas => "gas",
            Phase::Vapor => "vapor",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "liquid" => Ok(Phase::Liquid),
            "gas" => Ok(Phase::Gas),
            "vapor" | "vapour" => Ok(Phase::Vapor),
            _ => Err(ModelError::UnknownVariant {
                what: "phase",
                value: s.to_string(),
            }),
        }
    }
}

/// Construction input for [`Fluid`].
///
/// `molecular_weight` may be given in kg/mol or kg/kmol; values above 0.5 are
/// taken as kg/kmol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluidSpec {
    pub name: String,
    pub phase: Phase,
    /// Liquid density, kg/m³.
    pub density: Option<f64>,
    /// Dynamic viscosity, Pa·s.
    pub viscosity: f64,
    pub molecular_weight: Option<f64>,
    pub z_factor: Option<f64>,
    pub specific_heat_ratio: Option<f64>,
    /// Vapor pressure, Pa.
    pub vapor_pressure: Option<f64>,
    /// Thermodynamic critical pressure, Pa.
    pub critical_pressure: Option<f64>,
}

/// Validated fluid.
#[derive(Debug, Clone, PartialEq)]
pub struct Fluid {
    name: String,
    phase: Phase,
    density: Option<f64>,
    viscosity: f64,
    molecular_weight: Option<f64>,
    z_factor: Option<f64>,
    specific_heat_ratio: Option<f64>,
    vapor_pressure: Option<f64>,
    critical_pressure: Option<f64>,
}

impl Fluid {
    pub fn new(spec: FluidSpec) -> ModelResult<Self> {
        let viscosity = positive("viscosity", spec.viscosity)?;
        let density = positive_opt("density", spec.density)?;
        let molecular_weight = positive_opt("molecular_weight", spec.molecular_weight)?;
        let z_factor = positive_opt("z_factor", spec.z_factor)?;
        let specific_heat_ratio = positive_opt("specific_heat_ratio", spec.specific_heat_ratio)?;
        let vapor_pressure = positive_opt("vapor_pressure", spec.vapor_pressure)?;
        let critical_pressure = positive_opt("critical_pressure", spec.critical_pressure)?;

        match spec.phase {
            Phase::Liquid => {
                if density.is_none() {
                    return Err(ModelError::Missing {
                        what: "density (liquid fluid)".into(),
                    });
                }
            }
            Phase::Gas | Phase::Vapor => {
                let missing: Vec<&str> = [
                    ("molecular_weight", molecular_weight),
                    ("z_factor", z_factor),
                    ("specific_heat_ratio", specific_heat_ratio),
                ]
                .into_iter()
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| name)
                .collect();
                if !missing.is_empty() {
                    return Err(ModelError::Missing {
                        what: format!("{} ({} fluid)", missing.join(", "), spec.phase),
                    });
                }
            }
        }

        Ok(Self {
            name: spec.name,
            phase: spec.phase,
            density,
            viscosity,
            molecular_weight,
            z_factor,
            specific_heat_ratio,
            vapor_pressure,
            critical_pressure,
        })
    }

    /// Incompressible liquid with constant density.
    pub fn liquid(name: &str, density: f64, viscosity: f64) -> ModelResult<Self> {
        Self::new(FluidSpec {
            name: name.to_string(),
            phase: Phase::Liquid,
            density: Some(density),
            viscosity,
            ..FluidSpec::default()
        })
    }

    /// Real gas described by molecular weight, compressibility and k.
    pub fn gas(
        name: &str,
        molecular_weight: f64,
        z_factor: f64,
        specific_heat_ratio: f64,
        viscosity: f64,
    ) -> ModelResult<Self> {
        Self::new(FluidSpec {
            name: name.to_string(),
            phase: Phase::Gas,
            viscosity,
            molecular_weight: Some(molecular_weight),
            z_factor: Some(z_factor),
            specific_heat_ratio: Some(specific_heat_ratio),
            ..FluidSpec::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_gas(&self) -> bool {
        matches!(self.phase, Phase::Gas | Phase::Vapor)
    }

    pub fn is_liquid(&self) -> bool {
        self.phase == Phase::Liquid
    }

    pub fn viscosity(&self) -> f64 {
        self.viscosity
    }

    pub fn density(&self) -> Option<f64> {
        self.density
    }

    pub fn molecular_weight(&self) -> Option<f64> {
        self.molecular_weight
    }

    pub fn z_factor(&self) -> Option<f64> {
        self.z_factor
    }

    pub fn specific_heat_ratio(&self) -> Option<f64> {
        self.specific_heat_ratio
    }

    pub fn vapor_pressure(&self) -> Option<f64> {
        self.vapor_pressure
    }

    pub fn critical_pressure(&self) -> Option<f64> {
        self.critical_pressure
    }

    /// Molar mass in kg/mol.
    pub fn molar_mass_kg_per_mol(&self) -> ModelResult<f64> {
        let mw = self.molecular_weight.ok_or_else(|| ModelError::Missing {
            what: "molecular_weight".into(),
        })?;
        Ok(if mw > 0.5 { mw / 1000.0 } else { mw })
    }

    fn require_z(&self) -> ModelResult<f64> {
        self.z_factor.ok_or_else(|| ModelError::Missing {
            what: "z_factor".into(),
        })
    }

    /// Density at the given state.
    ///
    /// Liquids return their constant density; gases follow
    /// `rho = P * MW / (z * R * T)`.
    pub fn current_density(&self, t: Temperature, p: Pressure) -> ModelResult<Density> {
        Ok(kgpm3(self.density_at(t.value, p.value)?))
    }

    /// [`Fluid::current_density`] on raw SI values.
    pub fn density_at(&self, t: f64, p: f64) -> ModelResult<f64> {
        if self.is_liquid() {
            return self.density.ok_or_else(|| ModelError::Missing {
                what: "density".into(),
            });
        }
        let t = positive("temperature", t)?;
        let p = positive("pressure", p)?;
        let mw = positive("molecular_weight", self.molar_mass_kg_per_mol()?)?;
        let z = positive("z_factor", self.require_z()?)?;
        Ok(p * mw / (z * R_UNIVERSAL * t))
    }

    /// Real-gas sonic velocity `sqrt(k z R T / MW)`, m/s.
    pub fn sonic_velocity(&self, t: f64) -> ModelResult<f64> {
        let t = positive("temperature", t)?;
        let k = self.specific_heat_ratio.ok_or_else(|| ModelError::Missing {
            what: "specific_heat_ratio".into(),
        })?;
        let z = self.require_z()?;
        let mw = self.molar_mass_kg_per_mol()?;
        Ok((k * z * R_UNIVERSAL * t / mw).sqrt())
    }

    /// Liquid specific gravity relative to water at reference conditions.
    pub fn specific_gravity(&self) -> ModelResult<f64> {
        let rho = self.density.ok_or_else(|| ModelError::Missing {
            what: "density".into(),
        })?;
        Ok(rho / WATER_DENSITY_REF)
    }
}
