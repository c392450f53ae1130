/*
    Asteria, satellite orbit propagation and determination
    Copyright (C) 2026 The Asteria contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::j2000;
use crate::linalg::Vector3;
use crate::time::Epoch;
use std::f64::consts::TAU;

/// Provider of solar and lunar positions in the inertial frame, in meters.
///
/// The force models consume this through a shared handle so that concurrent runs
/// with different providers cannot step on each other.
pub trait Ephemeris: Send + Sync {
    fn sun_position(&self, epoch: Epoch) -> Vector3<f64>;
    fn moon_position(&self, epoch: Epoch) -> Vector3<f64>;
}

/// Low-precision analytic series for the Sun and the Moon (Montenbruck & Gill,
/// sect. 3.3.2). Accurate to roughly 0.01 deg for the Sun and 0.1 deg for the
/// Moon, which is plenty for third-body and shadow computations.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalyticEphemeris;

/// Mean obliquity of the ecliptic at J2000, in radians.
const OBLIQUITY: f64 = 23.439_291_11 * std::f64::consts::PI / 180.0;
/// Arcseconds per radian.
const ARCS: f64 = 206_264.806_247_096_36;

fn julian_centuries(epoch: Epoch) -> f64 {
    (epoch - j2000()).to_unit(hifitime::Unit::Day) / 36_525.0
}

fn frac(x: f64) -> f64 {
    x - x.floor()
}

/// Rotate an ecliptic position to the equatorial (inertial) frame.
fn ecliptic_to_equatorial(ecl: Vector3<f64>) -> Vector3<f64> {
    let (sin_e, cos_e) = OBLIQUITY.sin_cos();
    Vector3::new(
        ecl.x,
        cos_e * ecl.y - sin_e * ecl.z,
        sin_e * ecl.y + cos_e * ecl.z,
    )
}

impl Ephemeris for AnalyticEphemeris {
    fn sun_position(&self, epoch: Epoch) -> Vector3<f64> {
        let t = julian_centuries(epoch);
        // Mean anomaly and ecliptic longitude of the Sun
        let m = TAU * frac(0.993_133 + 99.997_361 * t);
        let l = TAU
            * frac(
                0.785_945_3
                    + (6_892.0 * m.sin() + 72.0 * (2.0 * m).sin() + 6_191.2 * t) / 1_296_000.0
                    + m / TAU,
            );
        let r = (149.619 - 2.499 * m.cos() - 0.021 * (2.0 * m).cos()) * 1e9;
        ecliptic_to_equatorial(Vector3::new(r * l.cos(), r * l.sin(), 0.0))
    }

    fn moon_position(&self, epoch: Epoch) -> Vector3<f64> {
        let t = julian_centuries(epoch);

        // Mean elements of the lunar orbit
        let l0 = frac(0.606_433 + 1_336.851_344 * t); // mean longitude (revolutions)
        let l = TAU * frac(0.374_897 + 1_325.552_410 * t); // Moon's mean anomaly
        let lp = TAU * frac(0.993_133 + 99.997_361 * t); // Sun's mean anomaly
        let d = TAU * frac(0.827_361 + 1_236.853_086 * t); // mean elongation
        let f = TAU * frac(0.259_086 + 1_342.227_825 * t); // argument of latitude

        // Perturbations in longitude, in arcseconds
        let dl = 22_640.0 * l.sin() - 4_586.0 * (l - 2.0 * d).sin() + 2_370.0 * (2.0 * d).sin()
            + 769.0 * (2.0 * l).sin()
            - 668.0 * lp.sin()
            - 412.0 * (2.0 * f).sin()
            - 212.0 * (2.0 * l - 2.0 * d).sin()
            - 206.0 * (l + lp - 2.0 * d).sin()
            + 192.0 * (l + 2.0 * d).sin()
            - 165.0 * (lp - 2.0 * d).sin()
            + 148.0 * (l - lp).sin()
            - 125.0 * d.sin()
            - 110.0 * (l + lp).sin()
            - 55.0 * (2.0 * f - 2.0 * d).sin();

        let lon = TAU * frac(l0 + dl / 1_296_000.0);

        // Perturbed argument of latitude and latitude
        let s = f + (dl + 412.0 * (2.0 * f).sin() + 541.0 * lp.sin()) / ARCS;
        let h = f - 2.0 * d;
        let n = -526.0 * h.sin() + 44.0 * (l + h).sin() - 31.0 * (h - l).sin()
            - 23.0 * (lp + h).sin()
            + 11.0 * (h - lp).sin()
            - 25.0 * (f - 2.0 * l).sin()
            + 21.0 * (f - l).sin();
        let lat = (18_520.0 * s.sin() + n) / ARCS;

        // Geocentric distance, in meters
        let r = (385_000.0 - 20_905.0 * l.cos() - 3_699.0 * (2.0 * d - l).cos()
            - 2_956.0 * (2.0 * d).cos()
            - 570.0 * (2.0 * l).cos()
            + 246.0 * (2.0 * l - 2.0 * d).cos()
            - 205.0 * (lp - 2.0 * d).cos()
            - 171.0 * (l + 2.0 * d).cos()
            - 152.0 * (l + lp - 2.0 * d).cos())
            * 1e3;

        let (sin_lat, cos_lat) = lat.sin_cos();
        ecliptic_to_equatorial(Vector3::new(
            r * cos_lat * lon.cos(),
            r * cos_lat * lon.sin(),
            r * sin_lat,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::ASTRONOMICAL_UNIT;

    #[test]
    fn sun_distance_within_annual_bounds() {
        let eph = AnalyticEphemeris;
        for month in 1..=12 {
            let epoch = Epoch::from_gregorian_utc_at_midnight(2024, month, 15);
            let d = eph.sun_position(epoch).norm();
            assert!(
                (0.97..=1.03).contains(&(d / ASTRONOMICAL_UNIT)),
                "sun distance {d} m in month {month}"
            );
        }
    }

    #[test]
    fn moon_distance_within_orbital_bounds() {
        let eph = AnalyticEphemeris;
        for day in [1, 8, 15, 22] {
            let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 6, day);
            let d = eph.moon_position(epoch).norm();
            assert!(
                (3.5e8..=4.1e8).contains(&d),
                "moon distance {d} m on day {day}"
            );
        }
    }
}
