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

use crate::cosmic::{dcm_body_to_inertial, SatState};
use crate::linalg::{DVector, Vector3};
use crate::time::Epoch;
use std::f64::consts::{PI, TAU};

/// One measured quantity vector at one epoch, already converted into the
/// measurement space of its session's [`MeasurementModel`].
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub epoch: Epoch,
    pub observed: DVector<f64>,
}

impl Observation {
    pub fn new(epoch: Epoch, observed: DVector<f64>) -> Self {
        Self { epoch, observed }
    }
}

/// How a cached state projects into the measurement space of a session.
///
/// The measurer hierarchy collapses into this tagged variant: each arm knows
/// its row count, its projection, and how to difference two projections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementModel {
    /// Earth-fixed position components, in m. Three rows per observation.
    Position,
    /// Topocentric right ascension and declination as seen from the session
    /// site, in rad. Two rows per observation.
    RaDec,
}

impl MeasurementModel {
    /// Number of rows one observation contributes to the residual vector.
    pub const fn size(&self) -> usize {
        match self {
            Self::Position => 3,
            Self::RaDec => 2,
        }
    }

    /// Projects a state into this measurement space. `site` is the observing
    /// station position in the Earth-fixed frame, in m; the position variant
    /// ignores it.
    pub fn predict(&self, state: &SatState, site: &Vector3<f64>) -> DVector<f64> {
        match self {
            Self::Position => DVector::from_column_slice(&[
                state.radius.x,
                state.radius.y,
                state.radius.z,
            ]),
            Self::RaDec => {
                // Angles are inertial-frame quantities, so the topocentric
                // vector is rotated out of the co-rotating frame first.
                let rel = dcm_body_to_inertial(state.epoch) * (state.radius - site);
                let range = rel.norm();
                let ra = rel.y.atan2(rel.x).rem_euclid(TAU);
                let dec = (rel.z / range).asin();
                DVector::from_column_slice(&[ra, dec])
            }
        }
    }

    /// `a - b` in this measurement space. Right ascension differences are
    /// wrapped into `(-pi, pi]` so that residuals and finite differences never
    /// jump across the `0 / 2pi` branch cut.
    pub fn difference(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        let mut diff = a - b;
        if let Self::RaDec = self {
            diff[0] = wrap_angle(diff[0]);
        }
        diff
    }

    /// The residual `observed - predicted` for one observation.
    pub fn residual(&self, observed: &DVector<f64>, predicted: &DVector<f64>) -> DVector<f64> {
        self.difference(observed, predicted)
    }
}

fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid maps exactly +pi to -pi; keep the (-pi, pi] convention
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// A read-only batch of observations sharing one site and one measurement
/// model. Sessions are inputs to the estimation and are never mutated by it.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationSession {
    /// Observing station position in the Earth-fixed frame, in m.
    pub site: Vector3<f64>,
    pub model: MeasurementModel,
    pub observations: Vec<Observation>,
}

impl ObservationSession {
    pub fn new(
        site: Vector3<f64>,
        model: MeasurementModel,
        observations: Vec<Observation>,
    ) -> Self {
        Self {
            site,
            model,
            observations,
        }
    }

    /// A session of Earth-fixed position measurements, e.g. from converted
    /// GNSS or TLE state vectors. No site is involved.
    pub fn positions(observations: Vec<Observation>) -> Self {
        Self::new(Vector3::zeros(), MeasurementModel::Position, observations)
    }

    /// Rows this session contributes to the residual vector.
    pub fn residual_rows(&self) -> usize {
        self.observations.len() * self.model.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn position_predict_returns_the_radius() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let state = SatState::new(
            epoch,
            Vector3::new(7e6, -1.2e6, 3.4e5),
            Vector3::new(0.0, 7.5e3, 0.0),
        );
        let predicted = MeasurementModel::Position.predict(&state, &Vector3::zeros());
        assert_eq!(predicted.len(), 3);
        assert_eq!(predicted[0], 7e6);
        assert_eq!(predicted[1], -1.2e6);
        assert_eq!(predicted[2], 3.4e5);
    }

    #[test]
    fn radec_of_a_zenith_pass_over_the_north_pole() {
        // Satellite straight above the pole: declination must be +pi/2
        // regardless of the sidereal angle.
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let site = Vector3::new(0.0, 0.0, 6_356_752.0);
        let state = SatState::new(
            epoch,
            Vector3::new(0.0, 0.0, 7_000_000.0),
            Vector3::zeros(),
        );
        let predicted = MeasurementModel::RaDec.predict(&state, &site);
        assert_abs_diff_eq!(predicted[1], std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn right_ascension_residual_wraps_the_branch_cut() {
        let observed = DVector::from_column_slice(&[0.01, 0.3]);
        let predicted = DVector::from_column_slice(&[TAU - 0.01, 0.3]);
        let residual = MeasurementModel::RaDec.residual(&observed, &predicted);
        assert_abs_diff_eq!(residual[0], 0.02, epsilon = 1e-14);
        assert_abs_diff_eq!(residual[1], 0.0, epsilon = 1e-14);
    }

    #[test]
    fn position_residual_is_a_plain_difference() {
        let observed = DVector::from_column_slice(&[1.0, 2.0, 3.0]);
        let predicted = DVector::from_column_slice(&[0.5, 2.5, 3.0]);
        let residual = MeasurementModel::Position.residual(&observed, &predicted);
        assert_eq!(residual, DVector::from_column_slice(&[0.5, -0.5, 0.0]));
    }

    #[test]
    fn session_row_count() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        let obs = (0..4)
            .map(|_| Observation::new(epoch, DVector::zeros(2)))
            .collect();
        let session = ObservationSession::new(Vector3::zeros(), MeasurementModel::RaDec, obs);
        assert_eq!(session.residual_rows(), 8);
    }
}
