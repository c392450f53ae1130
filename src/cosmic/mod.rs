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

use crate::linalg::{Matrix3, Vector3, Vector6};
use crate::time::Epoch;
use std::f64::consts::TAU;
use std::fmt;

/// Low-precision analytic solar and lunar ephemerides.
pub mod ephemeris;
pub use self::ephemeris::{AnalyticEphemeris, Ephemeris};

/// Earth gravitational parameter, in m^3/s^2 (JGM-3).
pub const GM_EARTH: f64 = 3.986_004_415e14;
/// Earth equatorial radius, in m (JGM-3).
pub const EARTH_EQ_RADIUS: f64 = 6_378_136.3;
/// Earth flattening (WGS-84).
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// Earth rotation rate, in rad/s.
pub const EARTH_ROTATION_RATE: f64 = 7.292_115_146_706_979e-5;
/// Sun gravitational parameter, in m^3/s^2.
pub const GM_SUN: f64 = 1.327_124_400_18e20;
/// Moon gravitational parameter, in m^3/s^2.
pub const GM_MOON: f64 = 4.902_800_066e12;
/// Astronomical unit, in m.
pub const ASTRONOMICAL_UNIT: f64 = 1.495_978_707e11;
/// Sun photospheric radius, in m.
pub const SUN_RADIUS: f64 = 6.96e8;
/// Solar radiation pressure at one astronomical unit, in N/m^2.
pub const SRP_FLUX_1AU: f64 = 4.56e-6;

/// The J2000 reference epoch.
pub fn j2000() -> Epoch {
    Epoch::from_gregorian_utc_hms(2000, 1, 1, 12, 0, 0)
}

/// Greenwich mean sidereal angle at the provided epoch, in radians in `[0, 2pi)`.
pub fn gmst(epoch: Epoch) -> f64 {
    // IAU 1982 linear model, sufficient for the frame rotation of a rotating-frame
    // force model (UT1 approximated by UTC).
    let days = (epoch - j2000()).to_unit(hifitime::Unit::Day);
    (4.894_961_212_823_058_7 + 6.300_388_098_984_890_6 * days).rem_euclid(TAU)
}

/// Rotation from the inertial frame to the Earth-fixed rotating frame at `epoch`.
pub fn dcm_inertial_to_body(epoch: Epoch) -> Matrix3<f64> {
    let theta = gmst(epoch);
    let (sin_t, cos_t) = theta.sin_cos();
    Matrix3::new(cos_t, sin_t, 0.0, -sin_t, cos_t, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation from the Earth-fixed rotating frame to the inertial frame at `epoch`.
pub fn dcm_body_to_inertial(epoch: Epoch) -> Matrix3<f64> {
    dcm_inertial_to_body(epoch).transpose()
}

/// Geodetic latitude (radians) and height (meters) above the reference ellipsoid
/// of an Earth-fixed position, via Bowring's single-pass formula.
pub fn geodetic(radius: &Vector3<f64>) -> (f64, f64) {
    let a = EARTH_EQ_RADIUS;
    let b = a * (1.0 - EARTH_FLATTENING);
    let e2 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
    let ep2 = e2 / (1.0 - e2);

    let z = radius.z;
    let p = (radius.x.powi(2) + radius.y.powi(2)).sqrt();
    if p < 1e-6 {
        // On the rotation axis the latitude is exactly +/- pi/2.
        return (z.signum() * std::f64::consts::FRAC_PI_2, z.abs() - b);
    }

    let u = (z * a).atan2(p * b);
    let lat = (z + ep2 * b * u.sin().powi(3)).atan2(p - e2 * a * u.cos().powi(3));
    let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    let height = p / lat.cos() - n;
    (lat, height)
}

/// A satellite state in the Earth-fixed rotating frame: epoch, position (m) and
/// velocity (m/s). Immutable per integration step; integrators produce new states.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SatState {
    pub epoch: Epoch,
    pub radius: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl SatState {
    pub fn new(epoch: Epoch, radius: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            epoch,
            radius,
            velocity,
        }
    }

    /// Rebuild a state from the flat vector the integrators advance.
    pub fn from_vector(epoch: Epoch, vector: &Vector6<f64>) -> Self {
        Self {
            epoch,
            radius: Vector3::new(vector[0], vector[1], vector[2]),
            velocity: Vector3::new(vector[3], vector[4], vector[5]),
        }
    }

    /// The flat position/velocity vector consumed by the integrators.
    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.radius.x,
            self.radius.y,
            self.radius.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
        )
    }

    pub fn rmag(&self) -> f64 {
        self.radius.norm()
    }

    pub fn vmag(&self) -> f64 {
        self.velocity.norm()
    }

    /// Geodetic height above the reference ellipsoid, in meters.
    pub fn height(&self) -> f64 {
        geodetic(&self.radius).1
    }
}

impl fmt::Display for SatState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] position = [{:.3}, {:.3}, {:.3}] m\tvelocity = [{:.6}, {:.6}, {:.6}] m/s",
            self.epoch,
            self.radius.x,
            self.radius.y,
            self.radius.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gmst_advances_one_rotation_per_sidereal_day() {
        use hifitime::TimeUnits;
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let sidereal_day = 86_164.0905.seconds();
        let delta = (gmst(t0 + sidereal_day) - gmst(t0)).rem_euclid(TAU);
        // One full turn modulo 2pi, to within the linear model's accuracy
        assert!(delta < 1e-4 || TAU - delta < 1e-4, "delta = {delta}");
    }

    #[test]
    fn geodetic_height_roundtrip() {
        let a = EARTH_EQ_RADIUS;
        let e2 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
        for &(lat_deg, h) in &[(0.0, 0.0), (45.0, 250e3), (-60.0, 800e3), (89.9, 400e3)] {
            let lat = f64::to_radians(lat_deg);
            let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
            let r = Vector3::new(
                (n + h) * lat.cos(),
                0.0,
                (n * (1.0 - e2) + h) * lat.sin(),
            );
            let (lat_out, h_out) = geodetic(&r);
            assert_abs_diff_eq!(lat_out, lat, epsilon = 1e-8);
            assert_abs_diff_eq!(h_out, h, epsilon = 1e-2);
        }
    }

    #[test]
    fn polar_position_is_not_degenerate() {
        let (lat, h) = geodetic(&Vector3::new(0.0, 0.0, 6_800_000.0));
        assert_abs_diff_eq!(lat, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert!(h > 0.0 && h.is_finite());
    }

    #[test]
    fn state_vector_roundtrip() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let state = SatState::new(
            epoch,
            Vector3::new(7e6, -1e5, 2e3),
            Vector3::new(0.1, 7.4e3, -2.0),
        );
        assert_eq!(SatState::from_vector(epoch, &state.to_vector()), state);
    }
}
