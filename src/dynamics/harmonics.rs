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

use super::{AccelModel, DynamicsError};
use crate::cosmic::{SatState, EARTH_EQ_RADIUS, GM_EARTH};
use crate::io::gravity::GravityPotentialStor;
use crate::linalg::Vector3;
use log::warn;

/// Keeps `cos(phi)` away from exactly zero at the poles so that the `tan(phi)`
/// term of the Legendre derivative recurrence cannot divide by zero.
const POLE_COS_EPS: f64 = 1e-10;

#[inline]
const fn tri(n: usize, m: usize) -> usize {
    n * (n + 1) / 2 + m
}

/// Working buffers for one geopotential evaluation, sized to the requested
/// degree: the `cos/sin(m lambda)` recurrence and the normalized associated
/// Legendre recurrence. Mutated internally per evaluation, logically pure from
/// the caller's perspective.
#[derive(Clone, Debug)]
pub struct GeopotentialContext {
    degree: usize,
    cos_ml: Vec<f64>,
    sin_ml: Vec<f64>,
    pnm: Vec<f64>,
}

impl GeopotentialContext {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            cos_ml: vec![0.0; degree + 1],
            sin_ml: vec![0.0; degree + 1],
            pnm: vec![0.0; tri(degree, degree) + 1],
        }
    }

    /// Fills the trigonometric and Legendre recurrences for this evaluation
    /// point. `b_nm`/`c_nm` are the precomputed normalization factors of the
    /// three-term recurrence.
    fn fill(&mut self, sin_phi: f64, cos_phi: f64, lambda: f64, b_nm: &[f64], c_nm: &[f64]) {
        let (sin_l, cos_l) = lambda.sin_cos();
        self.cos_ml[0] = 1.0;
        self.sin_ml[0] = 0.0;
        for m in 1..=self.degree {
            self.cos_ml[m] = cos_l * self.cos_ml[m - 1] - sin_l * self.sin_ml[m - 1];
            self.sin_ml[m] = cos_l * self.sin_ml[m - 1] + sin_l * self.cos_ml[m - 1];
        }

        self.pnm[tri(0, 0)] = 1.0;
        if self.degree >= 1 {
            self.pnm[tri(1, 0)] = 3.0f64.sqrt() * sin_phi;
            self.pnm[tri(1, 1)] = 3.0f64.sqrt() * cos_phi;
        }
        // Diagonal and first sub-diagonal
        for m in 2..=self.degree {
            let mf = m as f64;
            self.pnm[tri(m, m)] =
                cos_phi * (1.0 + 1.0 / (2.0 * mf)).sqrt() * self.pnm[tri(m - 1, m - 1)];
        }
        for m in 1..self.degree {
            let mf = m as f64;
            self.pnm[tri(m + 1, m)] = (2.0 * mf + 3.0).sqrt() * sin_phi * self.pnm[tri(m, m)];
        }
        // Remaining columns by the three-term recurrence
        for m in 0..=self.degree {
            for n in (m + 2)..=self.degree {
                let idx = tri(n, m);
                self.pnm[idx] = b_nm[idx] * sin_phi * self.pnm[tri(n - 1, m)]
                    - c_nm[idx] * self.pnm[tri(n - 2, m)];
            }
        }
    }

    #[inline]
    fn p(&self, n: usize, m: usize) -> f64 {
        if m > n {
            0.0
        } else {
            self.pnm[tri(n, m)]
        }
    }
}

/// Spherical-harmonic geopotential evaluator: scalar potential and acceleration
/// from a table of fully-normalized coefficients, evaluated in the Earth-fixed
/// rotating frame.
#[derive(Clone)]
pub struct Harmonics<S: GravityPotentialStor> {
    stor: S,
    mu: f64,
    eq_radius: f64,
    degree: usize,
    // Normalization factors of the Legendre recurrences, precomputed once
    b_nm: Vec<f64>,
    c_nm: Vec<f64>,
    f_nm: Vec<f64>,
    ctx: GeopotentialContext,
}

impl<S: GravityPotentialStor> Harmonics<S> {
    /// Creates an evaluator truncated at `degree`. A degree beyond the loaded
    /// table is clamped to the table's maximum, not an error.
    pub fn new(stor: S, degree: usize, mu: f64, eq_radius: f64) -> Self {
        let degree = if degree > stor.max_degree() {
            warn!(
                "requested degree {degree} beyond the loaded table, clamping to {}",
                stor.max_degree()
            );
            stor.max_degree()
        } else {
            degree
        };

        let size = tri(degree, degree) + 1;
        let mut b_nm = vec![0.0; size];
        let mut c_nm = vec![0.0; size];
        let mut f_nm = vec![0.0; size];
        for m in 0..=degree {
            let mf = m as f64;
            for n in m..=degree {
                let nf = n as f64;
                let idx = tri(n, m);
                if n >= m + 2 {
                    b_nm[idx] =
                        (((2.0 * nf + 1.0) * (2.0 * nf - 1.0)) / ((nf - mf) * (nf + mf))).sqrt();
                    c_nm[idx] = (((2.0 * nf + 1.0) * (nf + mf - 1.0) * (nf - mf - 1.0))
                        / ((nf - mf) * (nf + mf) * (2.0 * nf - 3.0)))
                        .sqrt();
                }
                // d P_nm / d phi = f_nm * P_n(m+1) - m tan(phi) P_nm
                f_nm[idx] = ((nf - mf) * (nf + mf + 1.0)).sqrt();
                if m == 0 {
                    f_nm[idx] /= 2.0f64.sqrt();
                }
            }
        }

        Self {
            stor,
            mu,
            eq_radius,
            degree,
            b_nm,
            c_nm,
            f_nm,
            ctx: GeopotentialContext::new(degree),
        }
    }

    /// Earth evaluator with the JGM-3 gravitational parameter and radius.
    pub fn earth(stor: S, degree: usize) -> Self {
        Self::new(stor, degree, GM_EARTH, EARTH_EQ_RADIUS)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    fn spherical(&self, radius: &Vector3<f64>) -> (f64, f64, f64, f64) {
        let r = radius.norm();
        let sin_phi = radius.z / r;
        let cos_phi = ((radius.x.powi(2) + radius.y.powi(2)).sqrt() / r).max(POLE_COS_EPS);
        let lambda = radius.y.atan2(radius.x);
        (r, sin_phi, cos_phi, lambda)
    }

    /// The scalar gravitational potential at an Earth-fixed position, in
    /// m^2/s^2.
    pub fn potential(&self, radius: &Vector3<f64>) -> f64 {
        let (r, sin_phi, cos_phi, lambda) = self.spherical(radius);
        let mut ctx = self.ctx.clone();
        ctx.fill(sin_phi, cos_phi, lambda, &self.b_nm, &self.c_nm);

        let rho = self.eq_radius / r;
        let mut rho_n = 1.0;
        let mut total = 0.0;
        for n in 0..=self.degree {
            let mut sum = 0.0;
            for m in 0..=n {
                let (c, s) = self.stor.cs_nm(n, m);
                sum += ctx.p(n, m) * (c * ctx.cos_ml[m] + s * ctx.sin_ml[m]);
            }
            total += rho_n * sum;
            rho_n *= rho;
        }
        self.mu / r * total
    }

    /// The geopotential acceleration at an Earth-fixed position, in m/s^2.
    /// Always returns a value; the polar singularity of the derivative
    /// recurrence is clamped away.
    pub fn accel_at(&self, radius: &Vector3<f64>) -> Vector3<f64> {
        let (r, sin_phi, cos_phi, lambda) = self.spherical(radius);
        let mut ctx = self.ctx.clone();
        ctx.fill(sin_phi, cos_phi, lambda, &self.b_nm, &self.c_nm);

        let tan_phi = sin_phi / cos_phi;
        let rho = self.eq_radius / r;
        let mut rho_n = 1.0;
        let mut du_dr = 0.0;
        let mut du_dphi = 0.0;
        let mut du_dlam = 0.0;
        for n in 0..=self.degree {
            let mut sum_r = 0.0;
            let mut sum_phi = 0.0;
            let mut sum_lam = 0.0;
            for m in 0..=n {
                let (c, s) = self.stor.cs_nm(n, m);
                let cos_m = ctx.cos_ml[m];
                let sin_m = ctx.sin_ml[m];
                let p = ctx.p(n, m);
                let d = c * cos_m + s * sin_m;
                let mf = m as f64;

                sum_r += (n as f64 + 1.0) * p * d;
                sum_phi += (self.f_nm[tri(n, m)] * ctx.p(n, m + 1) - mf * tan_phi * p) * d;
                // The lambda partial swaps the sin/cos coefficients and scales by m
                sum_lam += mf * p * (s * cos_m - c * sin_m);
            }
            du_dr += rho_n * sum_r;
            du_dphi += rho_n * sum_phi;
            du_dlam += rho_n * sum_lam;
            rho_n *= rho;
        }

        let mu_over_r2 = self.mu / (r * r);
        let a_r = -mu_over_r2 * du_dr;
        let a_phi = mu_over_r2 * du_dphi;
        let a_lam = mu_over_r2 * du_dlam / cos_phi;

        // Rotate the local spherical partials to Cartesian
        let (sin_l, cos_l) = lambda.sin_cos();
        Vector3::new(
            a_r * cos_phi * cos_l - a_phi * sin_phi * cos_l - a_lam * sin_l,
            a_r * cos_phi * sin_l - a_phi * sin_phi * sin_l + a_lam * cos_l,
            a_r * sin_phi + a_phi * cos_phi,
        )
    }
}

impl<S: GravityPotentialStor> AccelModel for Harmonics<S> {
    fn accel(&self, osc: &SatState) -> Result<Vector3<f64>, DynamicsError> {
        Ok(self.accel_at(&osc.radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gravity::HarmonicsMem;
    use approx::assert_relative_eq;

    fn point_mass_accel(r: &Vector3<f64>) -> Vector3<f64> {
        -GM_EARTH * r / r.norm().powi(3)
    }

    #[test]
    fn degree_zero_reduces_to_point_mass() {
        let harmonics = Harmonics::earth(HarmonicsMem::point_mass(), 0);
        for r in [
            Vector3::new(7.0e6, 0.0, 0.0),
            Vector3::new(-2.4e6, 5.1e6, 3.3e6),
            Vector3::new(0.0, 0.0, 8.0e6),
            Vector3::new(1.2e7, -3.0e6, -9.9e5),
        ] {
            let got = harmonics.accel_at(&r);
            let want = point_mass_accel(&r);
            assert_relative_eq!(got, want, max_relative = 1e-12);
        }
    }

    #[test]
    fn degree_clamps_to_table_maximum() {
        let harmonics = Harmonics::earth(HarmonicsMem::j2_jgm3(), 50);
        assert_eq!(harmonics.degree(), 2);
    }

    /// Closed-form J2 acceleration, e.g. Vallado 4th ed. eq. 8-30.
    fn j2_accel(r: &Vector3<f64>) -> Vector3<f64> {
        let j2 = 4.841_653_748_864_70e-4 * 5.0f64.sqrt();
        let rm = r.norm();
        let z2 = (r.z / rm).powi(2);
        let k = -1.5 * j2 * GM_EARTH / rm.powi(2) * (EARTH_EQ_RADIUS / rm).powi(2);
        point_mass_accel(r)
            + k * Vector3::new(
                (1.0 - 5.0 * z2) * r.x / rm,
                (1.0 - 5.0 * z2) * r.y / rm,
                (3.0 - 5.0 * z2) * r.z / rm,
            )
    }

    #[test]
    fn j2_matches_closed_form() {
        let harmonics = Harmonics::earth(HarmonicsMem::j2_jgm3(), 2);
        for r in [
            Vector3::new(7.0e6, 0.0, 0.0),
            Vector3::new(4.2e6, -3.9e6, 2.7e6),
            Vector3::new(-1.1e6, 2.2e6, 6.6e6),
        ] {
            assert_relative_eq!(harmonics.accel_at(&r), j2_accel(&r), max_relative = 1e-10);
        }
    }

    #[test]
    fn polar_evaluation_is_finite() {
        // Exactly on the rotation axis, where tan(phi) would blow up unclamped
        let harmonics = Harmonics::earth(HarmonicsMem::j2_jgm3(), 2);
        let r = Vector3::new(0.0, 0.0, 7.2e6);
        let got = harmonics.accel_at(&r);
        assert!(got.iter().all(|c| c.is_finite()));
        assert_relative_eq!(got, j2_accel(&r), max_relative = 1e-9);
    }

    #[test]
    fn potential_at_reference_radius() {
        let harmonics = Harmonics::earth(HarmonicsMem::point_mass(), 0);
        let r = Vector3::new(EARTH_EQ_RADIUS, 0.0, 0.0);
        assert_relative_eq!(
            harmonics.potential(&r),
            GM_EARTH / EARTH_EQ_RADIUS,
            max_relative = 1e-12
        );
    }
}
