//! Seawater properties at one atmosphere.
//!
//! # Units
//!
//! - Temperature: °C
//! - Salinity: ppt (g/kg)
//! - Density: kg/m³
//! - Dynamic viscosity: kg m⁻¹ s⁻¹ (Pa·s)

/// One-atmosphere seawater density, UNESCO EOS-80 (Millero & Poisson 1981).
///
/// ```
/// use swmp_metab::physics::seawater::density;
///
/// // Pure water is densest near 4 °C
/// assert!((density(4.0, 0.0) - 1000.0).abs() < 0.1);
/// ```
pub fn density(temperature: f64, salinity: f64) -> f64 {
    let t = temperature;
    let s = salinity;

    // Pure water (Bigg 1967)
    let rho_w = 999.842594 + 6.793952e-2 * t - 9.095290e-3 * t.powi(2)
        + 1.001685e-4 * t.powi(3)
        - 1.120083e-6 * t.powi(4)
        + 6.536336e-9 * t.powi(5);

    let a = 8.24493e-1 - 4.0899e-3 * t + 7.6438e-5 * t.powi(2) - 8.2467e-7 * t.powi(3)
        + 5.3875e-9 * t.powi(4);
    let b = -5.72466e-3 + 1.0227e-4 * t - 1.6546e-6 * t.powi(2);
    let c = 4.8314e-4;

    rho_w + a * s + b * s.powf(1.5) + c * s.powi(2)
}

/// Dynamic viscosity of pure water (Sharqawy et al. 2010, eq. 23).
pub fn water_viscosity(temperature: f64) -> f64 {
    4.2844e-5 + 1.0 / (0.157 * (temperature + 64.993).powi(2) - 91.296)
}

/// Dynamic viscosity of seawater (Sharqawy et al. 2010, eq. 22), valid for
/// 0-180 °C and 0-150 g/kg.
pub fn seawater_viscosity(temperature: f64, salinity: f64) -> f64 {
    let t = temperature;
    let s = salinity / 1000.0;
    let a = 1.541 + 1.998e-2 * t - 9.52e-5 * t.powi(2);
    let b = 7.974 - 7.561e-2 * t + 4.724e-4 * t.powi(2);

    water_viscosity(t) * (1.0 + a * s + b * s.powi(2))
}

/// Kinematic viscosity of seawater, m²/s.
pub fn kinematic_viscosity(temperature: f64, salinity: f64) -> f64 {
    seawater_viscosity(temperature, salinity) / density(temperature, salinity)
}
