//! Per-section equipment records: control valves, orifices and fittings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, positive_opt};

/// Control valve sizing data.
///
/// An adjustable valve has its `pressure_drop` solved by the optimizer; a
/// fixed valve must declare `pressure_drop`, `cv` or `cg`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlValve {
    pub tag: Option<String>,
    pub cv: Option<f64>,
    pub cg: Option<f64>,
    /// Gas sizing factor `Cg / Cv`.
    pub c1: Option<f64>,
    /// Pressure differential ratio factor.
    pub xt: Option<f64>,
    /// Liquid pressure recovery factor.
    pub fl: Option<f64>,
    /// Pressure drop across the valve, Pa.
    pub pressure_drop: Option<f64>,
    pub adjustable: bool,
}

impl ControlValve {
    pub fn validate(&self) -> ModelResult<()> {
        positive_opt("control_valve.cv", self.cv)?;
        positive_opt("control_valve.cg", self.cg)?;
        positive_opt("control_valve.c1", self.c1)?;
        positive_opt("control_valve.xt", self.xt)?;
        positive_opt("control_valve.fl", self.fl)?;
        positive_opt("control_valve.pressure_drop", self.pressure_drop)?;
        if !self.adjustable
            && self.pressure_drop.is_none()
            && self.cv.is_none()
            && self.cg.is_none()
        {
            return Err(ModelError::Missing {
                what: "control_valve requires one of pressure_drop, cv or cg".into(),
            });
        }
        Ok(())
    }
}

/// Pressure tap arrangement of an orifice plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrificeTaps {
    Corner,
    #[default]
    Flange,
    /// D and D/2 taps.
    DAndDHalf,
}

impl FromStr for OrificeTaps {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corner" => Ok(OrificeTaps::Corner),
            "flange" => Ok(OrificeTaps::Flange),
            "d" | "d-d/2" | "d_d2" | "d and d/2" => Ok(OrificeTaps::DAndDHalf),
            _ => Err(ModelError::UnknownVariant {
                what: "orifice taps",
                value: s.to_string(),
            }),
        }
    }
}

/// Restriction orifice plate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Orifice {
    pub tag: Option<String>,
    /// Beta ratio d/D.
    pub d_over_d_ratio: Option<f64>,
    pub orifice_diameter: Option<f64>,
    pub pipe_diameter: Option<f64>,
    /// Permanent pressure loss, Pa.
    pub pressure_drop: Option<f64>,
    pub taps: OrificeTaps,
}

impl Orifice {
    pub fn validate(&self) -> ModelResult<()> {
        positive_opt("orifice.orifice_diameter", self.orifice_diameter)?;
        positive_opt("orifice.pipe_diameter", self.pipe_diameter)?;
        positive_opt("orifice.pressure_drop", self.pressure_drop)?;
        if let Some(beta) = self.d_over_d_ratio {
            if !(beta.is_finite() && (0.0..=1.0).contains(&beta)) {
                return Err(ModelError::invalid(
                    "orifice.d_over_d_ratio",
                    format!("must lie in [0, 1] (got {beta})"),
                ));
            }
        }
        if self.d_over_d_ratio.is_none()
            && self.orifice_diameter.is_none()
            && self.pressure_drop.is_none()
        {
            return Err(ModelError::Missing {
                what: "orifice requires one of d_over_d_ratio, orifice_diameter or pressure_drop"
                    .into(),
            });
        }
        Ok(())
    }
}

/// Fitting kinds understood by the 2-K loss method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittingType {
    Elbow90,
    Elbow45,
    UBend,
    StubInElbow,
    TeeElbow,
    TeeThrough,
    BlockValveFullLineSize,
    BlockValveReducedTrim09,
    BlockValveReducedTrim08,
    GlobeValve,
    DiaphragmValve,
    ButterflyValve,
    CheckValveSwing,
    CheckValveLift,
    CheckValveTilting,
    PipeEntranceNormal,
    PipeEntranceRaised,
    PipeExit,
    InletSwage,
    OutletSwage,
}

impl FittingType {
    pub fn as_str(self) -> &'static str {
        use FittingType::*;
        match self {
            Elbow90 => "elbow_90",
            Elbow45 => "elbow_45",
            UBend => "u_bend",
            StubInElbow => "stub_in_elbow",
            TeeElbow => "tee_elbow",
            TeeThrough => "tee_through",
            BlockValveFullLineSize => "block_valve_full_line_size",
            BlockValveReducedTrim09 => "block_valve_reduced_trim_0.9d",
            BlockValveReducedTrim08 => "block_valve_reduced_trim_0.8d",
            GlobeValve => "globe_valve",
            DiaphragmValve => "diaphragm_valve",
            ButterflyValve => "butterfly_valve",
            CheckValveSwing => "check_valve_swing",
            CheckValveLift => "lift_check_valve",
            CheckValveTilting => "tilting_check_valve",
            PipeEntranceNormal => "pipe_entrance_normal",
            PipeEntranceRaised => "pipe_entrance_raise",
            PipeExit => "pipe_exit",
            InletSwage => "inlet_swage",
            OutletSwage => "outlet_swage",
        }
    }

    const ALL: [FittingType; 20] = [
        FittingType::Elbow90,
        FittingType::Elbow45,
        FittingType::UBend,
        FittingType::StubInElbow,
        FittingType::TeeElbow,
        FittingType::TeeThrough,
        FittingType::BlockValveFullLineSize,
        FittingType::BlockValveReducedTrim09,
        FittingType::BlockValveReducedTrim08,
        FittingType::GlobeValve,
        FittingType::DiaphragmValve,
        FittingType::ButterflyValve,
        FittingType::CheckValveSwing,
        FittingType::CheckValveLift,
        FittingType::CheckValveTilting,
        FittingType::PipeEntranceNormal,
        FittingType::PipeEntranceRaised,
        FittingType::PipeExit,
        FittingType::InletSwage,
        FittingType::OutletSwage,
    ];
}

impl fmt::Display for FittingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FittingType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        FittingType::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| ModelError::UnknownVariant {
                what: "fitting type",
                value: s.to_string(),
            })
    }
}

/// Construction style selecting a row of the 2-K table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittingStyle {
    /// Threaded.
    Scrd,
    /// Short radius.
    ShortRadius,
    /// Long radius.
    LongRadius,
    StubIn,
    #[default]
    Default,
}

impl FromStr for FittingStyle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scrd" | "threaded" => Ok(FittingStyle::Scrd),
            "sr" | "short_radius" => Ok(FittingStyle::ShortRadius),
            "lr" | "long_radius" => Ok(FittingStyle::LongRadius),
            "stub-in" | "stub_in" | "stubin" => Ok(FittingStyle::StubIn),
            "" | "default" => Ok(FittingStyle::Default),
            _ => Err(ModelError::UnknownVariant {
                what: "fitting style",
                value: s.to_string(),
            }),
        }
    }
}

/// A counted group of identical fittings on one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fitting {
    pub fitting_type: FittingType,
    pub style: FittingStyle,
    pub count: u32,
}

impl Fitting {
    pub fn new(fitting_type: FittingType, count: u32) -> ModelResult<Self> {
        Self::with_style(fitting_type, FittingStyle::Default, count)
    }

    pub fn with_style(fitting_type: FittingType, style: FittingStyle, count: u32) -> ModelResult<Self> {
        let fitting = Self {
            fitting_type,
            style,
            count,
        };
        fitting.validate()?;
        Ok(fitting)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.count == 0 {
            return Err(ModelError::invalid("fitting.count", "must be greater than zero"));
        }
        Ok(())
    }

    /// True for the area-ratio types that are not tabulated 2-K rows.
    pub fn is_transition(&self) -> bool {
        matches!(
            self.fitting_type,
            FittingType::PipeEntranceNormal
                | FittingType::PipeEntranceRaised
                | FittingType::PipeExit
                | FittingType::InletSwage
                | FittingType::OutletSwage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_valve_needs_a_sizing_input() {
        assert!(ControlValve::default().validate().is_err());
        let adjustable = ControlValve {
            adjustable: true,
            ..ControlValve::default()
        };
        assert!(adjustable.validate().is_ok());
        let sized = ControlValve {
            cv: Some(40.0),
            ..ControlValve::default()
        };
        assert!(sized.validate().is_ok());
    }

    #[test]
    fn valve_rejects_nonpositive_fields() {
        let valve = ControlValve {
            cv: Some(40.0),
            xt: Some(0.0),
            ..ControlValve::default()
        };
        assert!(valve.validate().unwrap_err().to_string().contains("xt"));
    }

    #[test]
    fn orifice_beta_range_and_presence() {
        let bad = Orifice {
            d_over_d_ratio: Some(1.2),
            ..Orifice::default()
        };
        assert!(bad.validate().is_err());
        assert!(Orifice::default().validate().is_err());
        let ok = Orifice {
            pressure_drop: Some(5_000.0),
            ..Orifice::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn fitting_count_must_be_positive() {
        assert!(Fitting::new(FittingType::Elbow90, 0).is_err());
        assert!(Fitting::new(FittingType::Elbow90, 3).is_ok());
    }

    #[test]
    fn fitting_names_parse() {
        for t in FittingType::ALL {
            assert_eq!(t.as_str().parse::<FittingType>().unwrap(), t);
        }
        assert!("gate".parse::<FittingType>().is_err());
        assert_eq!("LR".parse::<FittingStyle>().unwrap(), FittingStyle::LongRadius);
        assert_eq!("stub-in".parse::<FittingStyle>().unwrap(), FittingStyle::StubIn);
        assert_eq!("corner".parse::<OrificeTaps>().unwrap(), OrificeTaps::Corner);
    }
}
