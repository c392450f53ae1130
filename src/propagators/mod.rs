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
use crate::dynamics::{DynamicsError, Eom};
use crate::md::trajectory::Forecast;
use crate::time::{Duration, Epoch};
use log::debug;
use snafu::Snafu;

/// Single-step 4th-order Runge-Kutta.
pub mod rk4;

/// 8th-order Adams-Bashforth-Moulton predictor-corrector.
pub mod abm8;

/// Integrators and the propagation driver never catch dynamical errors; they
/// surface directly from the force model call.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(context(false))]
    #[snafu(display("force model failed during propagation: {source}"))]
    Dynamics { source: DynamicsError },

    #[snafu(display(
        "multistep integrator requires {required} prior samples, only {available} available"
    ))]
    InsufficientHistory { available: usize, required: usize },

    #[snafu(display("propagation step must be non-zero"))]
    ZeroStep,
}

/// Fixed-step propagation driver: RK4 seeds the first seven transitions, ABM8
/// advances the steady state, and a final short RK4 step lands exactly on the
/// requested epoch. Supports both forward and backward propagation.
#[derive(Clone, Copy, Debug)]
pub struct Propagator {
    step: Duration,
}

/// Two epochs closer than this are considered identical when driving to the
/// final time.
const EPOCH_TOL_S: f64 = 1e-9;

impl Propagator {
    /// A driver with the provided cache step size. The sign is ignored; the
    /// propagation direction follows the requested final epoch.
    pub fn new(step: Duration) -> Result<Self, PropagationError> {
        if step.to_seconds().abs() < EPOCH_TOL_S {
            return Err(PropagationError::ZeroStep);
        }
        Ok(Self { step: step.abs() })
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Propagates `initial` until `t_final`, producing the dense forecast
    /// cache of every integration sample.
    pub fn propagate<D: Eom<6>>(
        &self,
        dynamics: &D,
        initial: SatState,
        t_final: Epoch,
    ) -> Result<Forecast, PropagationError> {
        let forward = t_final >= initial.epoch;
        let signed_step = if forward { self.step } else { -self.step };
        let h = signed_step.to_seconds();

        debug!(
            "propagating from {} to {} at {} s per step",
            initial.epoch,
            t_final,
            h
        );

        let mut samples = Vec::with_capacity(
            ((t_final - initial.epoch).to_seconds() / h).abs() as usize + 2,
        );
        let mut history: Vec<abm8::Sample<6>> = Vec::new();

        let mut state = initial.to_vector();
        let mut epoch = initial.epoch;
        // The derivative at the initial state seeds the multistep history, so a
        // state outside the force model's domain fails before any step.
        let mut deriv = dynamics.eom(&state, epoch)?;
        samples.push(initial);
        history.push((state, deriv, epoch));

        loop {
            let remaining = (t_final - epoch).to_seconds();
            if remaining.abs() < EPOCH_TOL_S {
                break;
            }

            let full_step = remaining.abs() >= h.abs() - EPOCH_TOL_S;
            if full_step && history.len() >= abm8::STEPS {
                let (next, next_deriv, next_epoch) =
                    abm8::step(dynamics, &history, signed_step)?;
                state = next;
                deriv = next_deriv;
                epoch = next_epoch;
            } else {
                // Bootstrap and the final partial step both use RK4
                let this_step = if full_step {
                    signed_step
                } else {
                    t_final - epoch
                };
                state = rk4::step(dynamics, &state, epoch, this_step)?;
                epoch = if full_step { epoch + this_step } else { t_final };
                deriv = dynamics.eom(&state, epoch)?;
            }

            samples.push(SatState::from_vector(epoch, &state));
            history.push((state, deriv, epoch));
            if history.len() > abm8::STEPS {
                history.remove(0);
            }
        }

        debug!("propagation complete, {} samples cached", samples.len());
        Ok(Forecast::new(samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hifitime::TimeUnits;

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(
            Propagator::new(0.0.seconds()),
            Err(PropagationError::ZeroStep)
        ));
    }

    #[test]
    fn step_sign_is_normalized() {
        let prop = Propagator::new((-10.0).seconds()).unwrap();
        assert!(prop.step().to_seconds() > 0.0);
    }
}
