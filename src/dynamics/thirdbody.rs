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
use crate::cosmic::{dcm_inertial_to_body, Ephemeris, SatState, GM_MOON, GM_SUN};
use crate::linalg::Vector3;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThirdBodyKind {
    Sun,
    Moon,
}

/// Point-mass third-body perturbation in the differenced Newtonian form
/// `gm * ((s - r)/|s - r|^3 - s/|s|^3)`, which keeps the cancellation between
/// the direct and indirect terms under control.
#[derive(Clone)]
pub struct ThirdBody {
    pub kind: ThirdBodyKind,
    pub ephemeris: Arc<dyn Ephemeris>,
}

impl ThirdBody {
    pub fn sun(ephemeris: Arc<dyn Ephemeris>) -> Self {
        Self {
            kind: ThirdBodyKind::Sun,
            ephemeris,
        }
    }

    pub fn moon(ephemeris: Arc<dyn Ephemeris>) -> Self {
        Self {
            kind: ThirdBodyKind::Moon,
            ephemeris,
        }
    }

    fn gm(&self) -> f64 {
        match self.kind {
            ThirdBodyKind::Sun => GM_SUN,
            ThirdBodyKind::Moon => GM_MOON,
        }
    }
}

impl AccelModel for ThirdBody {
    fn accel(&self, osc: &SatState) -> Result<Vector3<f64>, DynamicsError> {
        let inertial = match self.kind {
            ThirdBodyKind::Sun => self.ephemeris.sun_position(osc.epoch),
            ThirdBodyKind::Moon => self.ephemeris.moon_position(osc.epoch),
        };
        let s = dcm_inertial_to_body(osc.epoch) * inertial;
        let d = s - osc.radius;
        Ok(self.gm() * (d / d.norm().powi(3) - s / s.norm().powi(3)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::AnalyticEphemeris;
    use crate::time::Epoch;

    #[test]
    fn lunar_perturbation_magnitude_in_leo() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 4, 10);
        let state = SatState::new(
            epoch,
            Vector3::new(7_000e3, 0.0, 0.0),
            Vector3::zeros(),
        );
        let moon = ThirdBody::moon(Arc::new(AnalyticEphemeris));
        let a = moon.accel(&state).unwrap().norm();
        // Tidal acceleration in LEO is of order 2 gm r / d^3 ~ 1e-6 m/s^2
        assert!(a > 1e-8 && a < 1e-5, "lunar perturbation {a} m/s^2");
    }

    #[test]
    fn differencing_vanishes_at_the_geocenter() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 4, 10);
        let state = SatState::new(epoch, Vector3::zeros(), Vector3::zeros());
        let sun = ThirdBody::sun(Arc::new(AnalyticEphemeris));
        assert!(sun.accel(&state).unwrap().norm() < 1e-20);
    }
}
