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

use crate::dynamics::DynamicsError;
use crate::io::gravity::GravityError;
use crate::md::trajectory::ForecastError;
use crate::od::ODError;
use crate::propagators::PropagationError;
use snafu::Snafu;

/// Classification of a failure, so callers can decide whether a retry with
/// different inputs makes sense.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The inputs violate a modeled bound (height out of range, query outside
    /// the forecast interval, too few observations). Retrying without changing
    /// the inputs cannot succeed.
    Domain,
    /// The computation broke down numerically (singular normal equations,
    /// multistep history misuse). A different damping, step size or initial
    /// guess may succeed.
    Numerical,
    /// A failure of the parallel engine itself. Errors raised inside a worker
    /// keep their own kind; worker panics resurface as panics on the caller.
    Concurrency,
}

/// The crate-level error: any failure of propagation or estimation converts
/// into this via `?`.
#[derive(Debug, Snafu)]
pub enum AsteriaError {
    #[snafu(context(false))]
    #[snafu(display("{source}"))]
    Dynamics { source: DynamicsError },

    #[snafu(context(false))]
    #[snafu(display("{source}"))]
    Gravity { source: GravityError },

    #[snafu(context(false))]
    #[snafu(display("{source}"))]
    Propagation { source: PropagationError },

    #[snafu(context(false))]
    #[snafu(display("{source}"))]
    Forecast { source: ForecastError },

    #[snafu(context(false))]
    #[snafu(display("{source}"))]
    Estimation { source: ODError },
}

impl AsteriaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Dynamics { .. } | Self::Gravity { .. } | Self::Forecast { .. } => {
                ErrorKind::Domain
            }
            Self::Propagation { source } => propagation_kind(source),
            Self::Estimation { source } => match source {
                ODError::InsufficientObservations { .. } => ErrorKind::Domain,
                ODError::SingularNormalEquations { .. } => ErrorKind::Numerical,
                ODError::Propagation { source } => propagation_kind(source),
                ODError::Forecast { .. } => ErrorKind::Domain,
            },
        }
    }
}

fn propagation_kind(error: &PropagationError) -> ErrorKind {
    match error {
        PropagationError::Dynamics { .. } | PropagationError::ZeroStep => ErrorKind::Domain,
        PropagationError::InsufficientHistory { .. } => ErrorKind::Numerical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        let height: AsteriaError = DynamicsError::HeightOutOfBounds {
            height_m: 50e3,
            min_m: 100e3,
            max_m: 100_000e3,
        }
        .into();
        assert_eq!(height.kind(), ErrorKind::Domain);

        let singular: AsteriaError = ODError::SingularNormalEquations { iteration: 1 }.into();
        assert_eq!(singular.kind(), ErrorKind::Numerical);

        let history: AsteriaError =
            PropagationError::InsufficientHistory {
                available: 3,
                required: 8,
            }
            .into();
        assert_eq!(history.kind(), ErrorKind::Numerical);

        let too_few: AsteriaError = ODError::InsufficientObservations {
            observations: 3,
            parameters: 6,
        }
        .into();
        assert_eq!(too_few.kind(), ErrorKind::Domain);
    }
}
