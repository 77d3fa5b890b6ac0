use std::f64::consts::PI;

use super::seawater;

/// Surface roughness length of a smooth water surface, m.
pub const ROUGHNESS_LENGTH_M: f64 = 1e-5;
/// Reference height for wind speed, m.
pub const REFERENCE_HEIGHT_M: f64 = 10.0;
/// Boltzmann constant, J/K.
const BOLTZMANN: f64 = 1.380649e-23;
/// Effective radius of an O2 molecule, m.
const O2_RADIUS_M: f64 = 1.72e-10;
/// Specific gas constant of dry air, J kg⁻¹ K⁻¹.
const DRY_AIR_GAS_CONSTANT: f64 = 287.058;
/// Schmidt number the transfer velocity is normalized to.
const REFERENCE_SCHMIDT: f64 = 600.0;
/// Empirical scale of the wind power law, m/s at 1 m/s wind.
const TRANSFER_SCALE: f64 = 1.7e-5;
const WIND_EXPONENT: f64 = 1.81;

/// Wind speed adjusted from anemometer height to 10 m with a logarithmic
/// profile over a smooth water surface.
pub fn wind_at_reference_height(wind_speed: f64, anemometer_height_m: f64) -> f64 {
    wind_speed * (REFERENCE_HEIGHT_M / ROUGHNESS_LENGTH_M).ln()
        / (anemometer_height_m / ROUGHNESS_LENGTH_M).ln()
}

/// Saturation vapour pressure over water, Pa (Buck 1996).
pub fn vapour_pressure(air_temperature: f64) -> f64 {
    let t = air_temperature;
    611.21 * ((18.678 - t / 234.5) * (t / (257.14 + t))).exp()
}

/// Density of saturated moist air, kg/m³.
pub fn moist_air_density(air_temperature: f64, pressure_mb: f64) -> f64 {
    let pressure_pa = pressure_mb * 100.0;
    (pressure_pa - 0.378 * vapour_pressure(air_temperature))
        / (DRY_AIR_GAS_CONSTANT * (air_temperature + 273.15))
}

/// Diffusivity of O2 in seawater from the Stokes-Einstein relation (slip
/// boundary), m²/s.
pub fn oxygen_diffusivity(temperature: f64, salinity: f64) -> f64 {
    BOLTZMANN * (temperature + 273.15)
        / (4.0 * PI * seawater::seawater_viscosity(temperature, salinity) * O2_RADIUS_M)
}

/// Schmidt number of O2 in seawater.
pub fn schmidt_number(temperature: f64, salinity: f64) -> f64 {
    seawater::kinematic_viscosity(temperature, salinity) / oxygen_diffusivity(temperature, salinity)
}

/// Oxygen mass-transfer coefficient across the air-water interface, m/day.
///
/// The transfer velocity scales with the square root of the air/water
/// density ratio, the inverse square root of the Schmidt number, and the
/// 10 m wind speed raised to 1.81. It is zero in still air and rises
/// monotonically with wind.
///
/// # Arguments
/// * `water_temperature` - °C
/// * `salinity` - ppt
/// * `air_temperature` - °C
/// * `wind_speed` - m/s, measured at `anemometer_height_m`
/// * `pressure_mb` - barometric pressure, mb
/// * `anemometer_height_m` - usually 10
pub fn mass_transfer_coefficient(
    water_temperature: f64,
    salinity: f64,
    air_temperature: f64,
    wind_speed: f64,
    pressure_mb: f64,
    anemometer_height_m: f64,
) -> f64 {
    let u10 = wind_at_reference_height(wind_speed, anemometer_height_m);
    let rho_w = seawater::density(water_temperature, salinity);
    let rho_a = moist_air_density(air_temperature, pressure_mb);
    let sc = schmidt_number(water_temperature, salinity);

    let k_m_per_s = TRANSFER_SCALE
        * (rho_a / rho_w).sqrt()
        * (sc / REFERENCE_SCHMIDT).powf(-0.5)
        * u10.powf(WIND_EXPONENT);

    k_m_per_s * 86_400.0
}
