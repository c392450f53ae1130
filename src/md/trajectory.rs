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
use crate::time::Epoch;
use snafu::Snafu;

#[derive(Debug, Snafu, Clone, PartialEq)]
pub enum ForecastError {
    #[snafu(display("epoch {epoch} outside the forecast interval [{start}, {end}]"))]
    OutOfRange {
        epoch: Epoch,
        start: Epoch,
        end: Epoch,
    },

    #[snafu(display("forecast holds no samples"))]
    NoData,
}

/// A dense, time-ordered cache of integrated states, owned by the propagation
/// run that created it and read-only once built.
///
/// Point queries locate the bracketing samples by binary search and linearly
/// interpolate position and velocity between them. This is intentionally cheap
/// and approximate: the cache step is small relative to observation spacing,
/// and queries landing exactly on a sample return it without interpolation.
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    states: Vec<SatState>,
}

impl Forecast {
    /// Builds the cache from the samples of one propagation run. The states
    /// are produced chronologically in either direction, so they are sorted
    /// here and duplicate epochs are dropped.
    pub fn new(mut states: Vec<SatState>) -> Self {
        states.sort_by_key(|s| s.epoch);
        states.dedup_by_key(|s| s.epoch);
        Self { states }
    }

    pub fn states(&self) -> &[SatState] {
        &self.states
    }

    pub fn first(&self) -> Result<&SatState, ForecastError> {
        self.states.first().ok_or(ForecastError::NoData)
    }

    pub fn last(&self) -> Result<&SatState, ForecastError> {
        self.states.last().ok_or(ForecastError::NoData)
    }

    /// Evaluate the forecast at this specific epoch. Querying outside the
    /// cached interval is an error, never a silent extrapolation.
    pub fn at(&self, epoch: Epoch) -> Result<SatState, ForecastError> {
        let start = self.first()?.epoch;
        let end = self.last()?.epoch;
        if epoch < start || epoch > end {
            return Err(ForecastError::OutOfRange { epoch, start, end });
        }

        match self.states.binary_search_by(|s| s.epoch.cmp(&epoch)) {
            // We actually have this exact sample
            Ok(idx) => Ok(self.states[idx]),
            Err(idx) => {
                // idx is the insertion point, so the bracket is [idx-1, idx];
                // the range check above guarantees both exist.
                let before = &self.states[idx - 1];
                let after = &self.states[idx];
                let span = (after.epoch - before.epoch).to_seconds();
                let tau = (epoch - before.epoch).to_seconds() / span;
                Ok(SatState::new(
                    epoch,
                    before.radius.lerp(&after.radius, tau),
                    before.velocity.lerp(&after.velocity, tau),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Vector3;
    use hifitime::TimeUnits;

    fn sample_forecast() -> (Epoch, Forecast) {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 2, 2);
        let states = (0..10)
            .map(|i| {
                let f = i as f64;
                SatState::new(
                    t0 + (f * 10.0).seconds(),
                    Vector3::new(7e6 + 1e3 * f, -2e3 * f, 40.0 * f * f),
                    Vector3::new(1.0 * f, 7.5e3, -3.0 * f),
                )
            })
            .collect();
        (t0, Forecast::new(states))
    }

    #[test]
    fn exact_sample_epoch_returns_the_sample() {
        let (t0, forecast) = sample_forecast();
        let query = t0 + 30.0.seconds();
        let got = forecast.at(query).unwrap();
        assert_eq!(&got, &forecast.states()[3]);
    }

    #[test]
    fn midpoint_query_lies_between_the_brackets() {
        let (t0, forecast) = sample_forecast();
        let got = forecast.at(t0 + 35.0.seconds()).unwrap();
        let lo = &forecast.states()[3];
        let hi = &forecast.states()[4];
        for i in 0..3 {
            let (min, max) = if lo.radius[i] <= hi.radius[i] {
                (lo.radius[i], hi.radius[i])
            } else {
                (hi.radius[i], lo.radius[i])
            };
            assert!((min..=max).contains(&got.radius[i]));
        }
    }

    #[test]
    fn out_of_range_queries_fail() {
        let (t0, forecast) = sample_forecast();
        assert!(matches!(
            forecast.at(t0 - 1.0.seconds()),
            Err(ForecastError::OutOfRange { .. })
        ));
        assert!(matches!(
            forecast.at(t0 + 91.0.seconds()),
            Err(ForecastError::OutOfRange { .. })
        ));
    }

    #[test]
    fn backward_runs_are_reordered() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 2, 2);
        let states: Vec<SatState> = (0..5)
            .rev()
            .map(|i| {
                SatState::new(
                    t0 + (i as f64).seconds(),
                    Vector3::new(i as f64, 0.0, 0.0),
                    Vector3::zeros(),
                )
            })
            .collect();
        let forecast = Forecast::new(states);
        assert_eq!(forecast.first().unwrap().epoch, t0);
        assert_eq!(
            forecast.last().unwrap().epoch,
            t0 + 4.0.seconds()
        );
    }
}
