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
use crate::cosmic::SatState;
use crate::linalg::Vector3;
use crate::time::Epoch;
use std::sync::Arc;

/// Atmospheric density provider: `(height above ellipsoid, epoch) -> kg/m^3`.
/// Space-weather-aware models plug in here; the drag term only consumes the
/// density value.
pub trait AtmosphereModel: Send + Sync {
    fn density(&self, height_m: f64, epoch: Epoch) -> f64;
}

/// Piecewise-exponential static atmosphere (Vallado 4th ed., table 8-4).
/// Rows are (base height km, nominal density kg/m^3, scale height km).
#[derive(Clone, Copy, Debug, Default)]
pub struct ExponentialAtmosphere;

const EXP_ATMOSPHERE: [(f64, f64, f64); 12] = [
    (0.0, 1.225, 7.249),
    (100.0, 5.297e-7, 5.877),
    (150.0, 2.070e-9, 22.523),
    (200.0, 2.789e-10, 37.105),
    (250.0, 7.248e-11, 45.546),
    (300.0, 2.418e-11, 53.628),
    (350.0, 9.518e-12, 53.298),
    (400.0, 3.725e-12, 58.515),
    (500.0, 6.967e-13, 60.828),
    (600.0, 1.454e-13, 71.835),
    (700.0, 3.614e-14, 88.667),
    (1000.0, 3.019e-15, 268.0),
];

impl AtmosphereModel for ExponentialAtmosphere {
    fn density(&self, height_m: f64, _epoch: Epoch) -> f64 {
        let h_km = height_m / 1e3;
        let (h0, rho0, scale) = EXP_ATMOSPHERE
            .iter()
            .rev()
            .find(|(h0, _, _)| h_km >= *h0)
            .copied()
            .unwrap_or(EXP_ATMOSPHERE[0]);
        rho0 * ((h0 - h_km) / scale).exp()
    }
}

/// Atmospheric drag as defined in Vallado 4th ed., page 551. The velocity of
/// the Earth-fixed rotating frame already co-rotates with the atmosphere, so
/// the state velocity is the airspeed.
#[derive(Clone)]
pub struct Drag {
    /// Ballistic coefficient `cd * area / mass`, in m^2/kg.
    pub bc: f64,
    pub atmosphere: Arc<dyn AtmosphereModel>,
}

impl Drag {
    pub fn new(bc: f64, atmosphere: Arc<dyn AtmosphereModel>) -> Self {
        Self { bc, atmosphere }
    }
}

impl AccelModel for Drag {
    fn accel(&self, osc: &SatState) -> Result<Vector3<f64>, DynamicsError> {
        let rho = self.atmosphere.density(osc.height(), osc.epoch);
        Ok(-0.5 * self.bc * rho * osc.vmag() * osc.velocity)
    }
}
