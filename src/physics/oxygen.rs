/// Millibars per standard atmosphere.
pub const MB_PER_ATM: f64 = 1013.25;

/// Dissolved oxygen at saturation, mg/L.
///
/// Benson & Krause (1984) equilibrium concentration at one atmosphere with
/// the salinity correction of Green & Carritt, as tabulated in Standard
/// Methods 4500-O. When `pressure_atm` is given the concentration is scaled
/// for the partial pressure of water vapour and the non-ideality of oxygen.
///
/// Valid for 0-40 °C and 0-40 ppt.
///
/// ```
/// use swmp_metab::physics::oxygen_saturation;
///
/// let c = oxygen_saturation(20.0, 0.0, None);
/// assert!((c - 9.09).abs() < 0.01);
/// ```
pub fn oxygen_saturation(temperature: f64, salinity: f64, pressure_atm: Option<f64>) -> f64 {
    let t = temperature;
    let tk = t + 273.15;

    let ln_c = -139.34411 + 1.575701e5 / tk - 6.642308e7 / tk.powi(2) + 1.243800e10 / tk.powi(3)
        - 8.621949e11 / tk.powi(4)
        - salinity * (1.7674e-2 - 10.754 / tk + 2140.7 / tk.powi(2));
    let c_star = ln_c.exp();

    match pressure_atm {
        None => c_star,
        Some(p) => {
            // Vapour pressure of water, atm
            let p_wv = (11.8571 - 3840.70 / tk - 216961.0 / tk.powi(2)).exp();
            let theta = 0.000975 - 1.426e-5 * t + 6.436e-8 * t.powi(2);
            c_star * p * (1.0 - p_wv / p) * (1.0 - theta * p) / ((1.0 - p_wv) * (1.0 - theta))
        }
    }
}
