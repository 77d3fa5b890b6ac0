use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use super::{SunEvent, SunEventProvider};

/// Julian date of the J2000.0 epoch (2000-01-01 12:00 TT).
const J2000: f64 = 2_451_545.0;
/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Apparent altitude of the sun's upper limb at rise and set, degrees,
/// including refraction.
const HORIZON_DEG: f64 = -0.833;
/// Obliquity of the ecliptic, degrees.
const OBLIQUITY_DEG: f64 = 23.4397;

/// Sunrise and sunset from the NOAA low-precision solar position
/// approximation, accurate to a minute or two at mid latitudes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoaaSunCalculator;

impl NoaaSunCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Julian dates of (sunrise, sunset) for a calendar date, or `None` when
    /// the sun stays above or below the horizon all day.
    fn rise_set_julian(latitude: f64, longitude: f64, date: NaiveDate) -> Option<(f64, f64)> {
        let epoch = NaiveDate::from_ymd_opt(2000, 1, 1)?;
        let n = (date - epoch).num_days() as f64 + 0.0008;

        // Mean solar noon, then solar mean anomaly and equation of center
        let j_star = n - longitude / 360.0;
        let m = (357.5291 + 0.985_600_28 * j_star).rem_euclid(360.0);
        let m_rad = m.to_radians();
        let c = 1.9148 * m_rad.sin() + 0.0200 * (2.0 * m_rad).sin() + 0.0003 * (3.0 * m_rad).sin();

        let lambda = (m + c + 180.0 + 102.9372).rem_euclid(360.0).to_radians();
        let transit = J2000 + j_star + 0.0053 * m_rad.sin() - 0.0069 * (2.0 * lambda).sin();

        let sin_decl = lambda.sin() * OBLIQUITY_DEG.to_radians().sin();
        let cos_decl = sin_decl.asin().cos();
        let phi = latitude.to_radians();

        let cos_hour_angle =
            (HORIZON_DEG.to_radians().sin() - phi.sin() * sin_decl) / (phi.cos() * cos_decl);
        if !(-1.0..=1.0).contains(&cos_hour_angle) {
            return None;
        }
        let half_day = cos_hour_angle.acos().to_degrees() / 360.0;

        Some((transit - half_day, transit + half_day))
    }
}

fn julian_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    let seconds = ((jd - UNIX_EPOCH_JD) * 86_400.0).round();
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
}

impl SunEventProvider for NoaaSunCalculator {
    fn sun_event(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<FixedOffset>,
        event: SunEvent,
    ) -> Option<DateTime<FixedOffset>> {
        let (rise, set) = Self::rise_set_julian(latitude, longitude, at.date_naive())?;
        let jd = match event {
            SunEvent::Sunrise => rise,
            SunEvent::Sunset => set,
        };
        julian_to_utc(jd).map(|t| t.with_timezone(at.offset()))
    }
}
