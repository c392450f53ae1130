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

use super::{AccelModel, DynamicsError};
use crate::cosmic::{
    dcm_inertial_to_body, Ephemeris, SatState, ASTRONOMICAL_UNIT, EARTH_EQ_RADIUS, SRP_FLUX_1AU,
    SUN_RADIUS,
};
use crate::linalg::Vector3;
use std::sync::Arc;

/// Illumination of a satellite position with respect to Earth's shadow cone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IlluminationState {
    Lit,
    Penumbra,
    Umbra,
}

impl IlluminationState {
    /// The ternary factor applied to the solar radiation force.
    pub fn factor(self) -> f64 {
        match self {
            Self::Lit => 1.0,
            Self::Penumbra => 0.5,
            Self::Umbra => 0.0,
        }
    }
}

/// Classifies a position against Earth's umbra/penumbra cone along the Sun
/// direction, using the apparent angular radii of the Sun and of the Earth as
/// seen from the satellite. Both positions in the same (Earth-fixed) frame.
pub fn illumination(radius: &Vector3<f64>, sun: &Vector3<f64>) -> IlluminationState {
    let to_sun = sun - radius;
    let app_sun = (SUN_RADIUS / to_sun.norm()).asin();
    let app_earth = (EARTH_EQ_RADIUS / radius.norm()).min(1.0).asin();
    // Angular separation between the Earth direction and the Sun direction
    let sep = (-radius)
        .normalize()
        .dot(&to_sun.normalize())
        .clamp(-1.0, 1.0)
        .acos();

    if sep >= app_earth + app_sun {
        IlluminationState::Lit
    } else if sep < app_earth - app_sun {
        IlluminationState::Umbra
    } else {
        IlluminationState::Penumbra
    }
}

/// Solar radiation pressure, gated by the shadow function.
#[derive(Clone)]
pub struct SolarPressure {
    /// Reflectivity-to-mass ratio `cr * area / mass`, in m^2/kg.
    pub k_srp: f64,
    pub ephemeris: Arc<dyn Ephemeris>,
}

impl SolarPressure {
    pub fn new(k_srp: f64, ephemeris: Arc<dyn Ephemeris>) -> Self {
        Self { k_srp, ephemeris }
    }
}

impl AccelModel for SolarPressure {
    fn accel(&self, osc: &SatState) -> Result<Vector3<f64>, DynamicsError> {
        let sun = dcm_inertial_to_body(osc.epoch) * self.ephemeris.sun_position(osc.epoch);
        let factor = illumination(&osc.radius, &sun).factor();
        if factor == 0.0 {
            return Ok(Vector3::zeros());
        }
        let from_sun = osc.radius - sun;
        let d = from_sun.norm();
        let pressure = SRP_FLUX_1AU * (ASTRONOMICAL_UNIT / d).powi(2);
        Ok(factor * pressure * self.k_srp * from_sun / d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUN_X: f64 = ASTRONOMICAL_UNIT;

    #[test]
    fn sunside_is_lit() {
        let sun = Vector3::new(SUN_X, 0.0, 0.0);
        let state = illumination(&Vector3::new(7_000e3, 0.0, 0.0), &sun);
        assert_eq!(state, IlluminationState::Lit);
    }

    #[test]
    fn antisolar_axis_is_umbra() {
        let sun = Vector3::new(SUN_X, 0.0, 0.0);
        let state = illumination(&Vector3::new(-7_000e3, 0.0, 0.0), &sun);
        assert_eq!(state, IlluminationState::Umbra);
    }

    #[test]
    fn shadow_edge_is_penumbra() {
        let sun = Vector3::new(SUN_X, 0.0, 0.0);
        // Grazing the limb: the shadow edge sits within the penumbral band
        let state = illumination(&Vector3::new(-7_000e3, EARTH_EQ_RADIUS, 0.0), &sun);
        assert_eq!(state, IlluminationState::Penumbra);
    }

    #[test]
    fn srp_pushes_away_from_the_sun_when_lit() {
        let eph = Arc::new(crate::cosmic::AnalyticEphemeris);
        let epoch = crate::time::Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let sun = dcm_inertial_to_body(epoch) * eph.sun_position(epoch);
        // Place the satellite on the sunward side
        let radius = sun.normalize() * 7_000e3;
        let state = SatState::new(epoch, radius, Vector3::zeros());
        let srp = SolarPressure::new(0.02, eph);
        let a = srp.accel(&state).unwrap();
        assert!(a.dot(&(radius - sun)) > 0.0);
        // Magnitude around k * 4.56e-6 N/m^2
        let expected = 0.02 * SRP_FLUX_1AU;
        assert!((a.norm() / expected - 1.0).abs() < 0.1);
    }
}
