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

use log::info;
use snafu::{ensure, Snafu};

/// Read-only access to a table of fully-normalized spherical-harmonic
/// coefficients. Tables are loaded once and shared by reference across
/// concurrent propagations.
pub trait GravityPotentialStor: Send + Sync {
    /// The maximum degree `n` this storage holds.
    fn max_degree(&self) -> usize;
    /// Returns `(C_nm, S_nm)` for the provided degree and order.
    ///
    /// Callers must not request a degree or order beyond `max_degree`.
    fn cs_nm(&self, degree: usize, order: usize) -> (f64, f64);
}

#[derive(Debug, Snafu, PartialEq)]
pub enum GravityError {
    #[snafu(display(
        "coefficient table for degree {degree} requires {expected} (C, S) pairs, got {actual}"
    ))]
    InvalidTableSize {
        degree: usize,
        expected: usize,
        actual: usize,
    },
}

/// In-memory coefficient table in the flat triangular layout: `(n+1)(n+2)/2`
/// `(C, S)` pairs for `n` degrees, term `(n, m)` at index `n(n+1)/2 + m`.
#[derive(Clone, Debug)]
pub struct HarmonicsMem {
    degree: usize,
    data: Vec<(f64, f64)>,
}

impl HarmonicsMem {
    /// Flat index of the `(n, m)` term.
    #[inline]
    pub const fn index(n: usize, m: usize) -> usize {
        n * (n + 1) / 2 + m
    }

    /// Number of `(C, S)` pairs a table of maximum degree `degree` must hold.
    #[inline]
    pub const fn table_size(degree: usize) -> usize {
        (degree + 1) * (degree + 2) / 2
    }

    /// Degree-0 table: the point-mass term only.
    pub fn point_mass() -> Self {
        Self {
            degree: 0,
            data: vec![(1.0, 0.0)],
        }
    }

    /// Earth J2-only table from the JGM-3 model (normalized C_20).
    pub fn j2_jgm3() -> Self {
        let mut data = vec![(0.0, 0.0); Self::table_size(2)];
        data[Self::index(0, 0)] = (1.0, 0.0);
        data[Self::index(2, 0)] = (-4.841_653_748_864_70e-4, 0.0);
        Self { degree: 2, data }
    }

    /// Earth zonal table (J2, J3, J4) from the JGM-3 model, for quick
    /// medium-fidelity runs without an external coefficient file.
    pub fn zonals_jgm3() -> Self {
        let mut data = vec![(0.0, 0.0); Self::table_size(4)];
        data[Self::index(0, 0)] = (1.0, 0.0);
        data[Self::index(2, 0)] = (-4.841_653_748_864_70e-4, 0.0);
        data[Self::index(3, 0)] = (9.571_612_070_934_73e-7, 0.0);
        data[Self::index(4, 0)] = (5.399_658_666_389_39e-7, 0.0);
        Self { degree: 4, data }
    }

    /// Builds a table from an externally loaded flat sequence of `(C, S)` pairs,
    /// ordered by the triangular indexing scheme.
    pub fn from_flat(degree: usize, data: Vec<(f64, f64)>) -> Result<Self, GravityError> {
        let expected = Self::table_size(degree);
        ensure!(
            data.len() == expected,
            InvalidTableSizeSnafu {
                degree,
                expected,
                actual: data.len()
            }
        );
        info!("harmonics table loaded with degree {degree} ({expected} terms)");
        Ok(Self { degree, data })
    }
}

impl GravityPotentialStor for HarmonicsMem {
    fn max_degree(&self) -> usize {
        self.degree
    }

    fn cs_nm(&self, degree: usize, order: usize) -> (f64, f64) {
        self.data[Self::index(degree, order)]
    }
}
