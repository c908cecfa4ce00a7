// rcs-core/src/units.rs
//
// The engine runs on plain f64 in US customary plant units (psia, °F, lbm,
// ft³, BTU, gpm, kW). Property backends work in SI; the uom quantities below
// are the bridge between the two.

use uom::si::available_energy::{btu_it_per_pound, joule_per_kilogram};
use uom::si::f64::{
    AvailableEnergy as UomAvailableEnergy, MassDensity as UomMassDensity,
    Pressure as UomPressure, SpecificHeatCapacity as UomSpecificHeatCapacity,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};
use uom::si::mass_density::{kilogram_per_cubic_meter, pound_per_cubic_foot};
use uom::si::pressure::{pascal, pound_force_per_square_inch};
use uom::si::specific_heat_capacity::{
    btu_it_per_pound_degree_fahrenheit, joule_per_kilogram_kelvin,
};
use uom::si::thermodynamic_temperature::{degree_fahrenheit, kelvin};

pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type MassDensity = UomMassDensity;
pub type SpecificEnergy = UomAvailableEnergy;
pub type SpecificHeat = UomSpecificHeatCapacity;

/// Standard atmosphere [psia].
pub const ATMOSPHERIC_PSIA: f64 = 14.696;
/// Cubic feet per US gallon.
pub const FT3_PER_GAL: f64 = 0.133_680_556;
/// BTU/hr per kW.
pub const BTU_PER_HR_PER_KW: f64 = 3412.142;
pub const SECONDS_PER_HOUR: f64 = 3600.0;
/// psia·ft³ → BTU (144 in²/ft² over 778.169 ft·lbf/BTU).
pub const PSIA_FT3_TO_BTU: f64 = 144.0 / 778.169;

#[inline]
pub fn psig_to_psia(psig: f64) -> f64 {
    psig + ATMOSPHERIC_PSIA
}

#[inline]
pub fn psia_to_psig(psia: f64) -> f64 {
    psia - ATMOSPHERIC_PSIA
}

/// Volume moved by `gpm` over `dt_s` seconds [ft³].
#[inline]
pub fn gpm_to_ft3(gpm: f64, dt_s: f64) -> f64 {
    gpm * FT3_PER_GAL * dt_s / 60.0
}

/// Volumetric flow [gpm] equivalent to `ft3` moved over `dt_s` seconds.
#[inline]
pub fn ft3_to_gpm(ft3: f64, dt_s: f64) -> f64 {
    if dt_s <= 0.0 {
        0.0
    } else {
        ft3 / FT3_PER_GAL * 60.0 / dt_s
    }
}

#[inline]
pub fn kw_to_btu_per_hr(kw: f64) -> f64 {
    kw * BTU_PER_HR_PER_KW
}

#[inline]
pub fn psia(v: f64) -> Pressure {
    Pressure::new::<pound_force_per_square_inch>(v)
}

#[inline]
pub fn deg_f(v: f64) -> Temperature {
    Temperature::new::<degree_fahrenheit>(v)
}

/// Plant pressure [psia] → Pa.
#[inline]
pub fn psia_to_pascal(p_psia: f64) -> f64 {
    psia(p_psia).get::<pascal>()
}

/// Pa → plant pressure [psia].
#[inline]
pub fn pascal_to_psia(p_pa: f64) -> f64 {
    Pressure::new::<pascal>(p_pa).get::<pound_force_per_square_inch>()
}

/// °F → K.
#[inline]
pub fn f_to_kelvin(t_f: f64) -> f64 {
    deg_f(t_f).get::<kelvin>()
}

/// kg/m³ → lbm/ft³.
#[inline]
pub fn density_from_si(rho_kg_m3: f64) -> f64 {
    MassDensity::new::<kilogram_per_cubic_meter>(rho_kg_m3).get::<pound_per_cubic_foot>()
}

/// J/kg → BTU/lbm.
#[inline]
pub fn enthalpy_from_si(h_j_kg: f64) -> f64 {
    SpecificEnergy::new::<joule_per_kilogram>(h_j_kg).get::<btu_it_per_pound>()
}

/// J/(kg·K) → BTU/(lbm·°F).
#[inline]
pub fn specific_heat_from_si(cp_j_kg_k: f64) -> f64 {
    SpecificHeat::new::<joule_per_kilogram_kelvin>(cp_j_kg_k)
        .get::<btu_it_per_pound_degree_fahrenheit>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_absolute_roundtrip() {
        assert!((psia_to_psig(psig_to_psia(450.0)) - 450.0).abs() < 1e-12);
    }

    #[test]
    fn temperature_scales_agree_with_uom() {
        assert!((deg_f(212.0).get::<kelvin>() - 373.15).abs() < 1e-9);
        assert!((f_to_kelvin(32.0) - 273.15).abs() < 1e-9);
    }

    #[test]
    fn flow_volume_conversions() {
        // 75 gpm over one minute
        let v = gpm_to_ft3(75.0, 60.0);
        assert!((v - 75.0 * FT3_PER_GAL).abs() < 1e-12);
        assert!((ft3_to_gpm(v, 60.0) - 75.0).abs() < 1e-9);
        assert_eq!(ft3_to_gpm(1.0, 0.0), 0.0);
    }

    #[test]
    fn pressure_conversions_roundtrip() {
        assert!((psia_to_pascal(ATMOSPHERIC_PSIA) - 101_325.0).abs() < 5.0);
        assert!((pascal_to_psia(psia_to_pascal(365.0)) - 365.0).abs() < 1e-9);
    }

    #[test]
    fn property_conversions_match_steam_table_units() {
        // 1000 kg/m³ ≈ 62.43 lbm/ft³
        assert!((density_from_si(1000.0) - 62.428).abs() < 1e-3);
        assert!((enthalpy_from_si(2326.0) - 1.0).abs() < 1e-6);
        assert!((specific_heat_from_si(4186.8) - 1.0).abs() < 1e-6);
        assert!((kw_to_btu_per_hr(1.0) - BTU_PER_HR_PER_KW).abs() < 1e-12);
    }
}
