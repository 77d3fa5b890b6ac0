//! Canonical parameter names reported by each station category.

use crate::station::Category;

/// Water temperature, °C.
pub const TEMP: &str = "temp";
/// Salinity, ppt.
pub const SAL: &str = "sal";
/// Dissolved oxygen concentration, mg/L.
pub const DO_MGL: &str = "do_mgl";
/// Sonde depth, m.
pub const DEPTH: &str = "depth";
/// Air temperature, °C.
pub const ATEMP: &str = "atemp";
/// Barometric pressure, mb.
pub const BP: &str = "bp";
/// Wind speed, m/s.
pub const WSPD: &str = "wspd";

pub const WATER_QUALITY: &[&str] = &[
    "temp", "spcond", "sal", "do_pct", "do_mgl", "depth", "cdepth", "level", "clevel", "ph",
    "turb", "chlfluor",
];

pub const NUTRIENT: &[&str] = &["po4f", "chla_n", "no3f", "no2f", "nh4f", "no23f", "ke_n", "urea"];

pub const WEATHER: &[&str] = &[
    "atemp", "rh", "bp", "wspd", "maxwspd", "wdir", "sdwdir", "totpar", "totprcp", "cumprcp",
    "totsorad",
];

/// Parameters a station of the given category reports.
pub fn for_category(category: Category) -> &'static [&'static str] {
    match category {
        Category::WaterQuality => WATER_QUALITY,
        Category::Nutrient => NUTRIENT,
        Category::Weather => WEATHER,
    }
}

/// Columns the metabolism calculator reads. Depth may be replaced by a
/// configured constant.
pub const METABOLISM_INPUTS: &[&str] = &[DO_MGL, TEMP, SAL, ATEMP, WSPD, BP];
