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

use super::estimate::EstimationProblem;
use super::{InsufficientObservationsSnafu, ODError, SingularNormalEquationsSnafu};
use crate::linalg::{DMatrix, DVector};
use log::{debug, info, warn};
use snafu::{ensure, OptionExt};
use typed_builder::TypedBuilder;

/// Solver choice for the batch least-squares estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Plain normal equations: `(J^T J) dp = J^T r`, solved by Cholesky.
    NormalEquations,
    /// Levenberg-Marquardt: `(J^T J + lambda * D) dp = J^T r` with `D` the
    /// diagonal of `J^T J` (or identity), lambda adapted per step.
    LevenbergMarquardt,
}

/// One solver iteration, immutable once recorded. The sequence is append-only
/// and used only for reporting; the numeric loop reads nothing back from it
/// except through the parameter vector it carries.
#[derive(Clone, Debug)]
pub struct Iteration {
    /// 1-based iteration index.
    pub index: usize,
    /// Norm of the residual vector at `params`.
    pub residual_norm: f64,
    /// Parameter vector after this iteration.
    pub params: DVector<f64>,
    /// Correction applied this iteration; all zeros for a rejected
    /// Levenberg-Marquardt step.
    pub correction: DVector<f64>,
    /// Raw residual vector at `params`.
    pub residuals: DVector<f64>,
}

/// The converged (or best-effort) estimate with its full iteration history.
#[derive(Clone, Debug)]
pub struct EstimateSolution {
    pub iterations: Vec<Iteration>,
    pub converged: bool,
    /// Final parameter vector.
    pub params: DVector<f64>,
    /// Root-mean-square of the final residual vector.
    pub residual_rms: f64,
    /// Per-component mean of the final residuals.
    pub residual_mean: DVector<f64>,
    /// Per-component standard deviation of the final residuals.
    pub residual_std: DVector<f64>,
}

/// Configuration for the batch nonlinear least-squares estimator.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(doc)]
pub struct BatchLeastSquares {
    #[builder(default = SolverKind::NormalEquations)]
    pub solver: SolverKind,
    /// Convergence tolerance on the relative change of the residual norm
    /// between accepted iterations.
    #[builder(default = 1e-3)]
    pub tolerance: f64,
    #[builder(default = 10)]
    pub max_iterations: usize,
    /// Initial damping factor for Levenberg-Marquardt.
    #[builder(default = 10.0)]
    pub lm_lambda_init: f64,
    /// Factor to divide lambda by after an accepted step.
    #[builder(default = 10.0)]
    pub lm_lambda_decrease: f64,
    /// Factor to multiply lambda by after a rejected step.
    #[builder(default = 10.0)]
    pub lm_lambda_increase: f64,
    #[builder(default = 1e-12)]
    pub lm_lambda_min: f64,
    #[builder(default = 1e12)]
    pub lm_lambda_max: f64,
    /// Damp with `diag(J^T J)` rather than the identity.
    #[builder(default = true)]
    pub lm_use_diag_scaling: bool,
}

impl BatchLeastSquares {
    /// Refines `initial` against the problem's observations.
    ///
    /// Each iteration solves the normal equations built from the residuals and
    /// the forward-difference Jacobian at the current parameter vector, then
    /// applies the correction. A rejected Levenberg-Marquardt step leaves the
    /// parameter vector unchanged and only grows the damping factor.
    /// Convergence is declared when the residual norm changes by less than
    /// `tolerance`, relatively, across an accepted step.
    ///
    /// Fewer residual rows than parameters is a domain error raised before any
    /// propagation; singular normal equations are a numerical error naming the
    /// iteration.
    pub fn estimate(
        &self,
        problem: &EstimationProblem,
        initial: DVector<f64>,
    ) -> Result<EstimateSolution, ODError> {
        let num_params = problem.num_params();
        let rows = problem.residual_rows();
        ensure!(
            rows >= num_params,
            InsufficientObservationsSnafu {
                observations: rows,
                parameters: num_params,
            }
        );

        info!(
            "starting batch least squares: {rows} residual rows, {num_params} parameters, {:?}",
            self.solver
        );

        let mut params = initial;
        let mut lambda = self.lm_lambda_init;
        let mut iterations: Vec<Iteration> = Vec::new();
        let mut converged = false;

        // Residuals and their norm at the current accepted parameter vector
        let mut residuals = problem.residuals(&params)?;
        let mut norm = residuals.norm();

        for index in 1..=self.max_iterations {
            let (_, jacobian) = problem.residuals_and_jacobian(&params)?;
            info!(
                "[{index}/{}] residual norm {norm:.6e}",
                self.max_iterations
            );

            let jtj = jacobian.transpose() * &jacobian;
            let jtr = jacobian.transpose() * &residuals;

            let (correction, accepted, new_norm, new_residuals) = match self.solver {
                SolverKind::NormalEquations => {
                    let chol = jtj
                        .cholesky()
                        .context(SingularNormalEquationsSnafu { iteration: index })?;
                    let correction = chol.solve(&jtr);
                    let candidate = &params + &correction;
                    let candidate_residuals = problem.residuals(&candidate)?;
                    let candidate_norm = candidate_residuals.norm();
                    params = candidate;
                    (correction, true, candidate_norm, candidate_residuals)
                }
                SolverKind::LevenbergMarquardt => {
                    let mut damping = if self.lm_use_diag_scaling {
                        DMatrix::from_diagonal(&jtj.diagonal())
                    } else {
                        DMatrix::identity(num_params, num_params)
                    };
                    for i in 0..num_params {
                        // Positive floor keeps the augmented matrix definite
                        if damping[(i, i)] <= 0.0 {
                            damping[(i, i)] = 1e-6;
                        }
                    }

                    let augmented = &jtj + damping * lambda;
                    let chol = augmented
                        .cholesky()
                        .context(SingularNormalEquationsSnafu { iteration: index })?;
                    let correction = chol.solve(&jtr);
                    let candidate = &params + &correction;
                    let candidate_residuals = problem.residuals(&candidate)?;
                    let candidate_norm = candidate_residuals.norm();

                    if candidate_norm < norm {
                        lambda = (lambda / self.lm_lambda_decrease).max(self.lm_lambda_min);
                        debug!(
                            "accepted step, residual norm {norm:.6e} -> {candidate_norm:.6e}, lambda = {lambda:.3e}"
                        );
                        params = candidate;
                        (correction, true, candidate_norm, candidate_residuals)
                    } else {
                        lambda = (lambda * self.lm_lambda_increase).min(self.lm_lambda_max);
                        debug!(
                            "rejected step, residual norm {norm:.6e} -> {candidate_norm:.6e}, lambda = {lambda:.3e}"
                        );
                        (
                            DVector::zeros(num_params),
                            false,
                            norm,
                            residuals.clone(),
                        )
                    }
                }
            };

            iterations.push(Iteration {
                index,
                residual_norm: new_norm,
                params: params.clone(),
                correction,
                residuals: new_residuals.clone(),
            });

            if accepted {
                let relative_change = if norm > 0.0 {
                    (norm - new_norm).abs() / norm
                } else {
                    0.0
                };
                residuals = new_residuals;
                norm = new_norm;
                if relative_change < self.tolerance {
                    info!("converged in {index} iterations, residual norm {norm:.6e}");
                    converged = true;
                    break;
                }
            }
        }

        if !converged {
            warn!(
                "no convergence after {} iterations, residual norm {norm:.6e}",
                self.max_iterations
            );
        }

        let (residual_mean, residual_std) = problem.residual_stats(&residuals);
        let residual_rms = if rows > 0 {
            norm / (rows as f64).sqrt()
        } else {
            0.0
        };

        Ok(EstimateSolution {
            iterations,
            converged,
            params,
            residual_rms,
            residual_mean,
            residual_std,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let solver = BatchLeastSquares::builder().build();
        assert_eq!(solver.solver, SolverKind::NormalEquations);
        assert_eq!(solver.tolerance, 1e-3);
        assert_eq!(solver.max_iterations, 10);
        assert_eq!(solver.lm_lambda_init, 10.0);
        assert!(solver.lm_use_diag_scaling);
    }
}
