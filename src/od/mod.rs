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

use crate::md::trajectory::ForecastError;
use crate::propagators::PropagationError;
use snafu::Snafu;

/// Observations, measurement models and tracking sessions.
pub mod msr;
pub use msr::{MeasurementModel, Observation, ObservationSession};

/// The residual/derivative provider: couples a parametrized force model and
/// the propagator to a set of observations.
pub mod estimate;
pub use estimate::{EstimationProblem, PerturbationSteps};

/// The batch nonlinear least-squares solver.
pub mod blse;
pub use blse::{BatchLeastSquares, EstimateSolution, Iteration, SolverKind};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ODError {
    #[snafu(display(
        "{observations} residual rows cannot estimate {parameters} parameters"
    ))]
    InsufficientObservations {
        observations: usize,
        parameters: usize,
    },

    #[snafu(display("normal equations are singular in iteration {iteration}"))]
    SingularNormalEquations { iteration: usize },

    #[snafu(context(false))]
    #[snafu(display("propagation failed during estimation: {source}"))]
    Propagation { source: PropagationError },

    #[snafu(context(false))]
    #[snafu(display("forecast query failed during estimation: {source}"))]
    Forecast { source: ForecastError },
}
