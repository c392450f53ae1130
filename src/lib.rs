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

/*! # asteria

Numerical propagation of satellite orbits under a composite force model
(spherical-harmonic geopotential, rotating-frame terms, optional drag,
solar radiation pressure and luni-solar perturbations), and refinement of an
unknown initial state by fitting the propagated trajectory to sparse, noisy
observations with a batch nonlinear least-squares estimator.

All functions which may fail return an error; asteria never hides a failure
behind a default or NaN value.
*/

/// Earth constants, frames, geodetic conversions and the auxiliary solar/lunar ephemeris.
pub mod cosmic;

/// The force models which can be combined into the equations of motion.
pub mod dynamics;

/// The RK4 / ABM8 integrator pair and the fixed-step propagation driver.
pub mod propagators;

/// Trajectory handling, i.e. the dense forecast cache and its time queries.
pub mod md;

/// Orbit determination: observations, residuals and the batch least-squares solver.
pub mod od;

/// The parallel index-fan-out engine used to build finite-difference Jacobians.
pub mod executor;

/// Gravity potential coefficient storage.
pub mod io;

mod errors;
pub use self::errors::{AsteriaError, ErrorKind};

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use nalgebra::base::*;
}

pub use self::cosmic::SatState;
