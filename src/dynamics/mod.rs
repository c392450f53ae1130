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

use crate::cosmic::SatState;
use crate::linalg::{SVector, Vector3};
use crate::time::Epoch;
use snafu::Snafu;

/// Spherical-harmonic geopotential evaluator.
pub mod harmonics;
pub use self::harmonics::{GeopotentialContext, Harmonics};

/// Atmospheric drag.
pub mod drag;
pub use self::drag::{AtmosphereModel, Drag, ExponentialAtmosphere};

/// Solar radiation pressure, gated by the umbra/penumbra shadow function.
pub mod solarpressure;
pub use self::solarpressure::{illumination, IlluminationState, SolarPressure};

/// Luni-solar point-mass perturbations.
pub mod thirdbody;
pub use self::thirdbody::{ThirdBody, ThirdBodyKind};

/// The composite force model.
pub mod orbital;
pub use self::orbital::OrbitalDynamics;

/// A trait for immutable models that return an acceleration contribution, in
/// the Earth-fixed rotating frame, from a satellite state.
pub trait AccelModel: Send + Sync {
    fn accel(&self, osc: &SatState) -> Result<Vector3<f64>, DynamicsError>;
}

/// The right-hand side of the differential equation the integrators advance:
/// exactly `(state, epoch) -> d(state)/dt`. Any other shape is a type error.
pub trait Eom<const N: usize>: Send + Sync {
    fn eom(&self, state: &SVector<f64, N>, epoch: Epoch) -> Result<SVector<f64, N>, DynamicsError>;
}

/// Dynamical model errors. These are domain errors: the propagation must not
/// silently continue outside the force model's validity range.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    #[snafu(display(
        "height {height_m:.1} m outside force model bounds [{min_m:.1}, {max_m:.1}] m"
    ))]
    HeightOutOfBounds {
        height_m: f64,
        min_m: f64,
        max_m: f64,
    },
}
