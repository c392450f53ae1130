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

use super::{ObservationSession, ODError};
use crate::cosmic::SatState;
use crate::dynamics::OrbitalDynamics;
use crate::executor::parallel_for;
use crate::linalg::{DMatrix, DVector, Vector3};
use crate::md::trajectory::Forecast;
use crate::propagators::Propagator;
use crate::time::Epoch;
use log::debug;
use std::sync::{Arc, Mutex};
use typed_builder::TypedBuilder;

/// Fixed forward-difference perturbation steps, one per parameter family.
///
/// These sizes trade truncation against cancellation error for typical LEO
/// geometries and are deliberately not adaptive; changing them changes the
/// convergence behavior on real data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerturbationSteps {
    /// Step for the three initial position components, in m.
    pub position_m: f64,
    /// Step for the three initial velocity components, in m/s.
    pub velocity_mps: f64,
    /// Step for the ballistic coefficient, in m^2/kg.
    pub drag_coeff: f64,
}

impl Default for PerturbationSteps {
    fn default() -> Self {
        Self {
            position_m: 25.0,
            velocity_mps: 0.025,
            drag_coeff: 0.0016,
        }
    }
}

/// The residual/derivative provider: couples a parametrized force model, the
/// propagation driver and a fixed set of observation sessions.
///
/// The parameter vector is the initial Earth-fixed state `[x, y, z, vx, vy,
/// vz]` at `epoch`, optionally followed by the ballistic coefficient. The
/// `dynamics` closure rebuilds the force model from a candidate parameter
/// vector, which is how the drag parameter reaches the drag model.
///
/// Sessions and the coefficient tables inside the force model are read-only
/// for the duration of a solve and shared by reference across the worker
/// threads; each propagation owns its forecast.
#[derive(Clone, TypedBuilder)]
pub struct EstimationProblem {
    /// Epoch of the estimated initial state.
    pub epoch: Epoch,
    pub sessions: Vec<ObservationSession>,
    /// Builds the force model for a candidate parameter vector.
    pub dynamics: Arc<dyn Fn(&DVector<f64>) -> OrbitalDynamics + Send + Sync>,
    pub prop: Propagator,
    /// When set, the parameter vector carries the ballistic coefficient as a
    /// seventh component.
    #[builder(default = false)]
    pub estimate_drag: bool,
    #[builder(default)]
    pub steps: PerturbationSteps,
}

impl EstimationProblem {
    /// Number of estimated parameters: the six state components plus the
    /// optional ballistic coefficient.
    pub fn num_params(&self) -> usize {
        6 + usize::from(self.estimate_drag)
    }

    /// Total number of residual rows across every session.
    pub fn residual_rows(&self) -> usize {
        self.sessions.iter().map(|s| s.residual_rows()).sum()
    }

    fn step_for(&self, param: usize) -> f64 {
        if param < 3 {
            self.steps.position_m
        } else if param < 6 {
            self.steps.velocity_mps
        } else {
            self.steps.drag_coeff
        }
    }

    fn span_end(&self) -> Epoch {
        self.sessions
            .iter()
            .flat_map(|s| s.observations.iter().map(|o| o.epoch))
            .max()
            .unwrap_or(self.epoch)
    }

    /// Propagates one forecast from a candidate parameter vector, covering
    /// every observation epoch.
    pub fn forecast(&self, params: &DVector<f64>) -> Result<Forecast, ODError> {
        let dynamics = (self.dynamics)(params);
        let initial = SatState::new(
            self.epoch,
            Vector3::new(params[0], params[1], params[2]),
            Vector3::new(params[3], params[4], params[5]),
        );
        Ok(self.prop.propagate(&dynamics, initial, self.span_end())?)
    }

    /// Stacked predictions for every observation, in session order.
    fn predictions(&self, forecast: &Forecast) -> Result<DVector<f64>, ODError> {
        let mut out = DVector::zeros(self.residual_rows());
        let mut row = 0;
        for session in &self.sessions {
            let size = session.model.size();
            for obs in &session.observations {
                let state = forecast.at(obs.epoch)?;
                out.rows_mut(row, size)
                    .copy_from(&session.model.predict(&state, &session.site));
                row += size;
            }
        }
        Ok(out)
    }

    /// `observed - predicted` with the angular wrap of each session's model.
    fn residuals_from(&self, predictions: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.residual_rows());
        let mut row = 0;
        for session in &self.sessions {
            let size = session.model.size();
            for obs in &session.observations {
                let predicted = predictions.rows(row, size).into_owned();
                out.rows_mut(row, size)
                    .copy_from(&session.model.residual(&obs.observed, &predicted));
                row += size;
            }
        }
        out
    }

    /// The residual vector at a candidate parameter vector. One propagation.
    pub fn residuals(&self, params: &DVector<f64>) -> Result<DVector<f64>, ODError> {
        let forecast = self.forecast(params)?;
        let predictions = self.predictions(&forecast)?;
        Ok(self.residuals_from(&predictions))
    }

    /// The residual vector and the forward-difference Jacobian of the
    /// predictions at a candidate parameter vector.
    ///
    /// The reference forecast and one forecast per perturbed parameter are
    /// independent, so all `P + 1` propagations fan out through the parallel
    /// engine; each writes its forecast into its own slot. The first failing
    /// propagation aborts the fan-out and surfaces here.
    pub fn residuals_and_jacobian(
        &self,
        params: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), ODError> {
        let n = self.num_params();
        let slots: Vec<Mutex<Option<Forecast>>> = (0..=n).map(|_| Mutex::new(None)).collect();

        debug!("fanning out {} forecasts for the Jacobian", n + 1);
        parallel_for(0, n + 1, |i| {
            let run = if i == 0 {
                self.forecast(params)?
            } else {
                let mut nudged = params.clone();
                nudged[i - 1] += self.step_for(i - 1);
                self.forecast(&nudged)?
            };
            *slots[i].lock().unwrap() = Some(run);
            Ok::<(), ODError>(())
        })?;

        let mut runs = slots.into_iter().map(|slot| {
            slot.into_inner()
                .unwrap()
                .expect("every forecast slot is filled when the fan-out succeeds")
        });
        let reference = runs.next().expect("reference slot");

        let reference_pred = self.predictions(&reference)?;
        let residuals = self.residuals_from(&reference_pred);

        let mut jacobian = DMatrix::zeros(self.residual_rows(), n);
        for (col, forecast) in runs.enumerate() {
            let perturbed_pred = self.predictions(&forecast)?;
            let diff = self.difference(&perturbed_pred, &reference_pred);
            jacobian.set_column(col, &(diff / self.step_for(col)));
        }

        Ok((residuals, jacobian))
    }

    /// Componentwise difference of two stacked prediction vectors, wrapped in
    /// each session's measurement space.
    fn difference(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.residual_rows());
        let mut row = 0;
        for session in &self.sessions {
            let size = session.model.size();
            for _ in &session.observations {
                let lhs = a.rows(row, size).into_owned();
                let rhs = b.rows(row, size).into_owned();
                out.rows_mut(row, size)
                    .copy_from(&session.model.difference(&lhs, &rhs));
                row += size;
            }
        }
        out
    }

    /// Per-component mean and standard deviation of a residual vector, the
    /// component index being the row within each observation's block. Sized to
    /// the widest measurement model among the sessions.
    pub fn residual_stats(&self, residuals: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
        let width = self
            .sessions
            .iter()
            .map(|s| s.model.size())
            .max()
            .unwrap_or(0);
        let mut sums = vec![0.0; width];
        let mut sq_sums = vec![0.0; width];
        let mut counts = vec![0usize; width];

        let mut row = 0;
        for session in &self.sessions {
            let size = session.model.size();
            for _ in &session.observations {
                for c in 0..size {
                    let value = residuals[row + c];
                    sums[c] += value;
                    sq_sums[c] += value * value;
                    counts[c] += 1;
                }
                row += size;
            }
        }

        let mut mean = DVector::zeros(width);
        let mut std_dev = DVector::zeros(width);
        for c in 0..width {
            if counts[c] > 0 {
                let n = counts[c] as f64;
                mean[c] = sums[c] / n;
                std_dev[c] = (sq_sums[c] / n - mean[c] * mean[c]).max(0.0).sqrt();
            }
        }
        (mean, std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::Harmonics;
    use crate::io::gravity::HarmonicsMem;
    use crate::od::msr::{MeasurementModel, Observation};
    use approx::assert_abs_diff_eq;
    use hifitime::TimeUnits;

    fn problem(estimate_drag: bool, sessions: Vec<ObservationSession>) -> EstimationProblem {
        EstimationProblem::builder()
            .epoch(Epoch::from_gregorian_utc_at_midnight(2024, 3, 1))
            .sessions(sessions)
            .dynamics(Arc::new(|_: &DVector<f64>| {
                OrbitalDynamics::new(vec![Arc::new(Harmonics::earth(
                    HarmonicsMem::point_mass(),
                    0,
                ))])
            }))
            .prop(Propagator::new(10.0.seconds()).unwrap())
            .estimate_drag(estimate_drag)
            .build()
    }

    #[test]
    fn parameter_and_row_counts() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let sessions = vec![
            ObservationSession::positions(
                (0..3)
                    .map(|_| Observation::new(epoch, DVector::zeros(3)))
                    .collect(),
            ),
            ObservationSession::new(
                Vector3::zeros(),
                MeasurementModel::RaDec,
                (0..2)
                    .map(|_| Observation::new(epoch, DVector::zeros(2)))
                    .collect(),
            ),
        ];
        let without_drag = problem(false, sessions.clone());
        assert_eq!(without_drag.num_params(), 6);
        assert_eq!(without_drag.residual_rows(), 13);
        let with_drag = problem(true, sessions);
        assert_eq!(with_drag.num_params(), 7);
    }

    #[test]
    fn perturbation_steps_follow_the_parameter_family() {
        let prob = problem(true, Vec::new());
        assert_eq!(prob.step_for(0), 25.0);
        assert_eq!(prob.step_for(2), 25.0);
        assert_eq!(prob.step_for(3), 0.025);
        assert_eq!(prob.step_for(5), 0.025);
        assert_eq!(prob.step_for(6), 0.0016);
    }

    #[test]
    fn residual_stats_by_component() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let prob = problem(
            false,
            vec![ObservationSession::positions(
                (0..2)
                    .map(|_| Observation::new(epoch, DVector::zeros(3)))
                    .collect(),
            )],
        );
        // Two observations: rows [1, 2, 3] and [3, 2, 1]
        let residuals = DVector::from_column_slice(&[1.0, 2.0, 3.0, 3.0, 2.0, 1.0]);
        let (mean, std_dev) = prob.residual_stats(&residuals);
        assert_abs_diff_eq!(mean[0], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(mean[1], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(mean[2], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(std_dev[0], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(std_dev[1], 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(std_dev[2], 1.0, epsilon = 1e-14);
    }
}
