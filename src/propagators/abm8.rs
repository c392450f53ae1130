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

use super::{InsufficientHistorySnafu, PropagationError};
use crate::dynamics::Eom;
use crate::linalg::SVector;
use crate::time::{Duration, Epoch};
use snafu::ensure;

/// Number of `(state, derivative, epoch)` samples the multistep method needs.
pub const STEPS: usize = 8;

/// 8th-order Adams-Bashforth predictor coefficients, over 120960, newest
/// sample first.
const AB8: [f64; 8] = [
    434_241.0 / 120_960.0,
    -1_152_169.0 / 120_960.0,
    2_183_877.0 / 120_960.0,
    -2_664_477.0 / 120_960.0,
    2_102_243.0 / 120_960.0,
    -1_041_723.0 / 120_960.0,
    295_767.0 / 120_960.0,
    -36_799.0 / 120_960.0,
];

/// 8th-order Adams-Moulton corrector coefficients, over 120960: the first
/// entry weighs the predicted derivative, the rest the history, newest first.
const AM8: [f64; 8] = [
    36_799.0 / 120_960.0,
    139_849.0 / 120_960.0,
    -121_797.0 / 120_960.0,
    123_133.0 / 120_960.0,
    -88_547.0 / 120_960.0,
    41_499.0 / 120_960.0,
    -11_351.0 / 120_960.0,
    1_375.0 / 120_960.0,
];

/// One `(state, derivative at that state, epoch)` sample of the integration
/// history.
pub type Sample<const N: usize> = (SVector<f64, N>, SVector<f64, N>, Epoch);

/// One predictor-corrector step of the 8th-order Adams-Bashforth-Moulton pair:
/// a single corrector pass (not a fixed-point iteration), in PECE form so the
/// stored history derivative is the one at the corrected state.
///
/// `history` must hold at least [`STEPS`] samples ordered oldest to newest and
/// separated by exactly `step`; the newest 8 are used.
pub fn step<const N: usize, D: Eom<N>>(
    dynamics: &D,
    history: &[Sample<N>],
    step: Duration,
) -> Result<Sample<N>, PropagationError> {
    ensure!(
        history.len() >= STEPS,
        InsufficientHistorySnafu {
            available: history.len(),
            required: STEPS,
        }
    );

    let h = step.to_seconds();
    let (latest_state, _, latest_epoch) = &history[history.len() - 1];
    let next_epoch = *latest_epoch + step;

    // Predictor: y* = y_n + h * sum_k ab[k] f_{n-k}
    let mut predicted = *latest_state;
    for (k, coeff) in AB8.iter().enumerate() {
        let (_, deriv, _) = &history[history.len() - 1 - k];
        predicted += deriv * (h * coeff);
    }

    // Single corrector pass with the derivative at the predicted state
    let f_predicted = dynamics.eom(&predicted, next_epoch)?;
    let mut corrected = *latest_state;
    corrected += f_predicted * (h * AM8[0]);
    for (k, coeff) in AM8.iter().enumerate().skip(1) {
        let (_, deriv, _) = &history[history.len() - k];
        corrected += deriv * (h * coeff);
    }

    let f_corrected = dynamics.eom(&corrected, next_epoch)?;
    Ok((corrected, f_corrected, next_epoch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::DynamicsError;
    use hifitime::TimeUnits;

    struct Decay;

    impl Eom<1> for Decay {
        fn eom(
            &self,
            state: &SVector<f64, 1>,
            _epoch: Epoch,
        ) -> Result<SVector<f64, 1>, DynamicsError> {
            Ok(-state)
        }
    }

    #[test]
    fn requires_eight_samples() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let history: Vec<Sample<1>> = (0..5)
            .map(|i| {
                let t = epoch + (i as f64).seconds();
                let x = SVector::<f64, 1>::new((-(i as f64)).exp());
                (x, -x, t)
            })
            .collect();
        match step(&Decay, &history, 1.0.seconds()) {
            Err(PropagationError::InsufficientHistory {
                available,
                required,
            }) => {
                assert_eq!(available, 5);
                assert_eq!(required, STEPS);
            }
            other => panic!("expected insufficient history, got {other:?}"),
        }
    }

    #[test]
    fn tracks_the_exponential_decay() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let h = 0.05f64;
        let mut history: Vec<Sample<1>> = (0..8)
            .map(|i| {
                let t = epoch + (i as f64 * h).seconds();
                let x = SVector::<f64, 1>::new((-(i as f64) * h).exp());
                (x, -x, t)
            })
            .collect();
        for _ in 0..40 {
            let next = step(&Decay, &history, h.seconds()).unwrap();
            history.push(next);
        }
        let (state, _, last_epoch) = history.last().unwrap();
        let elapsed = (*last_epoch - epoch).to_seconds();
        assert!((state[0] - (-elapsed).exp()).abs() < 1e-10);
    }
}
