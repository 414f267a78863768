//! SI quantity aliases at the typed API boundary, plus physical constants.
//!
//! Model fields are plain SI `f64`; the uom types appear only where a caller
//! benefits from unit-checked arguments (`Fluid::current_density`).

use uom::si::f64::{MassDensity, Pressure as UomPressure, ThermodynamicTemperature};

pub type Density = MassDensity;
pub type Pressure = UomPressure;
pub type Temperature = ThermodynamicTemperature;

#[inline]
pub fn pa(v: f64) -> Pressure {
    Pressure::new::<uom::si::pressure::pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    Temperature::new::<uom::si::thermodynamic_temperature::kelvin>(v)
}

#[inline]
pub fn kgpm3(v: f64) -> Density {
    Density::new::<uom::si::mass_density::kilogram_per_cubic_meter>(v)
}

pub mod constants {
    /// Standard gravity, m/s².
    pub const G0_MPS2: f64 = 9.806_65;

    /// Universal gas constant, J/(mol K).
    pub const R_UNIVERSAL: f64 = 8.314_462_618;

    pub const PA_PER_BAR: f64 = 100_000.0;
    pub const M_PER_INCH: f64 = 0.0254;
    pub const SECONDS_PER_HOUR: f64 = 3_600.0;

    /// Reference water density for specific gravity, kg/m³.
    pub const WATER_DENSITY_REF: f64 = 999.0;

    /// Cv = 1.156 Kv.
    pub const CV_PER_KV: f64 = 1.156;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_hold_si_values() {
        assert_eq!(pa(101_325.0).value, 101_325.0);
        assert_eq!(k(293.15).value, 293.15);
        assert_eq!(kgpm3(998.2).value, 998.2);
    }
}
