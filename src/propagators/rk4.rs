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

use crate::dynamics::{DynamicsError, Eom};
use crate::linalg::SVector;
use crate::time::{Duration, Epoch};

/// One step of the classic 4-stage explicit Runge-Kutta method, local
/// truncation error `O(h^5)`. Used to bootstrap the multistep integrator and
/// to land exactly on the final epoch.
pub fn step<const N: usize, D: Eom<N>>(
    dynamics: &D,
    state: &SVector<f64, N>,
    epoch: Epoch,
    step: Duration,
) -> Result<SVector<f64, N>, DynamicsError> {
    let h = step.to_seconds();
    let half = step * 0.5;

    let k1 = dynamics.eom(state, epoch)?;
    let k2 = dynamics.eom(&(state + k1 * (h * 0.5)), epoch + half)?;
    let k3 = dynamics.eom(&(state + k2 * (h * 0.5)), epoch + half)?;
    let k4 = dynamics.eom(&(state + k3 * h), epoch + step)?;

    Ok(state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hifitime::TimeUnits;

    /// dx/dt = x, whose exact solution is e^t.
    struct Exponential;

    impl Eom<1> for Exponential {
        fn eom(
            &self,
            state: &SVector<f64, 1>,
            _epoch: Epoch,
        ) -> Result<SVector<f64, 1>, DynamicsError> {
            Ok(*state)
        }
    }

    #[test]
    fn fourth_order_on_the_exponential() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let x0 = SVector::<f64, 1>::new(1.0);

        let err = |h: f64| {
            let mut x = x0;
            let mut t = epoch;
            let n = (1.0 / h).round() as usize;
            for _ in 0..n {
                x = step(&Exponential, &x, t, h.seconds()).unwrap();
                t += h.seconds();
            }
            (x[0] - 1.0f64.exp()).abs()
        };

        assert_relative_eq!(
            err(0.1) + 1.0f64.exp(),
            1.0f64.exp(),
            max_relative = 1e-6
        );
        // Halving the step divides the global error by about 2^4
        let ratio = err(0.1) / err(0.05);
        assert!((10.0..25.0).contains(&ratio), "order ratio {ratio}");
    }
}
