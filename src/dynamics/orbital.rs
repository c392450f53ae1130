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

use super::{AccelModel, DynamicsError, Eom, HeightOutOfBoundsSnafu};
use crate::cosmic::{geodetic, SatState, EARTH_ROTATION_RATE};
use crate::linalg::{Vector3, Vector6};
use crate::time::Epoch;
use snafu::ensure;
use std::sync::Arc;

/// Default force model validity range above the reference ellipsoid, in m.
pub const DEFAULT_MIN_HEIGHT: f64 = 100e3;
pub const DEFAULT_MAX_HEIGHT: f64 = 100_000e3;

/// The composite force model, in the Earth-fixed rotating frame: the sum of
/// the configured acceleration models plus the centrifugal and Coriolis terms
/// of the frame rotation.
///
/// Every evaluation first checks the geodetic height against the configured
/// bounds; propagation must not silently continue below the atmosphere model
/// or above the validity range.
#[derive(Clone)]
pub struct OrbitalDynamics {
    pub accel_models: Vec<Arc<dyn AccelModel>>,
    pub min_height: f64,
    pub max_height: f64,
}

impl OrbitalDynamics {
    /// A model from the provided accelerations, with the default height bounds.
    pub fn new(accel_models: Vec<Arc<dyn AccelModel>>) -> Self {
        Self {
            accel_models,
            min_height: DEFAULT_MIN_HEIGHT,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }

    pub fn with_height_bounds(mut self, min_height: f64, max_height: f64) -> Self {
        self.min_height = min_height;
        self.max_height = max_height;
        self
    }

    /// The total acceleration at this state, rotating-frame terms included.
    pub fn accel(&self, osc: &SatState) -> Result<Vector3<f64>, DynamicsError> {
        let (_, height) = geodetic(&osc.radius);
        ensure!(
            height >= self.min_height && height <= self.max_height,
            HeightOutOfBoundsSnafu {
                height_m: height,
                min_m: self.min_height,
                max_m: self.max_height,
            }
        );

        // Centrifugal and Coriolis accelerations of the co-rotating frame:
        // -w x (w x r) - 2 w x v, with w along +z.
        let w = EARTH_ROTATION_RATE;
        let mut total = Vector3::new(
            w * w * osc.radius.x + 2.0 * w * osc.velocity.y,
            w * w * osc.radius.y - 2.0 * w * osc.velocity.x,
            0.0,
        );
        for model in &self.accel_models {
            total += model.accel(osc)?;
        }
        Ok(total)
    }
}

impl Eom<6> for OrbitalDynamics {
    fn eom(&self, state: &Vector6<f64>, epoch: Epoch) -> Result<Vector6<f64>, DynamicsError> {
        let osc = SatState::from_vector(epoch, state);
        let accel = self.accel(&osc)?;
        Ok(Vector6::new(
            osc.velocity.x,
            osc.velocity.y,
            osc.velocity.z,
            accel.x,
            accel.y,
            accel.z,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::EARTH_EQ_RADIUS;
    use crate::dynamics::Harmonics;
    use crate::io::gravity::HarmonicsMem;

    fn point_mass_dynamics() -> OrbitalDynamics {
        OrbitalDynamics::new(vec![Arc::new(Harmonics::earth(
            HarmonicsMem::point_mass(),
            0,
        ))])
    }

    #[test]
    fn rejects_height_below_minimum() {
        let dynamics = point_mass_dynamics();
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let low = SatState::new(
            epoch,
            Vector3::new(EARTH_EQ_RADIUS + 50e3, 0.0, 0.0),
            Vector3::new(0.0, 7.8e3, 0.0),
        );
        match dynamics.accel(&low) {
            Err(DynamicsError::HeightOutOfBounds { height_m, min_m, .. }) => {
                assert!((height_m - 50e3).abs() < 1.0);
                assert_eq!(min_m, DEFAULT_MIN_HEIGHT);
            }
            other => panic!("expected height error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_height_above_maximum() {
        let dynamics = point_mass_dynamics().with_height_bounds(100e3, 2_000e3);
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let high = SatState::new(
            epoch,
            Vector3::new(EARTH_EQ_RADIUS + 3_000e3, 0.0, 0.0),
            Vector3::zeros(),
        );
        assert!(matches!(
            dynamics.accel(&high),
            Err(DynamicsError::HeightOutOfBounds { .. })
        ));
    }

    #[test]
    fn geostationary_equilibrium() {
        // At the geostationary radius, gravity balances the centrifugal term
        // for a satellite at rest in the rotating frame.
        let dynamics = point_mass_dynamics();
        let r_geo = (crate::cosmic::GM_EARTH / EARTH_ROTATION_RATE.powi(2)).cbrt();
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let geo = SatState::new(epoch, Vector3::new(r_geo, 0.0, 0.0), Vector3::zeros());
        let a = dynamics.accel(&geo).unwrap();
        assert!(a.norm() < 1e-9, "residual acceleration {} m/s^2", a.norm());
    }
}
