use crate::types::FitError;
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};

/// Number of coefficients of a quadratic in the raw power basis
const N_COEF: usize = 3;

/// Relative tolerance below which a diagonal of R counts as zero
const RANK_TOLERANCE: f64 = 1e-10;

/// Coefficients of `y = intercept + b1·x + b2·x²`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticCoefficients {
    pub intercept: f64,
    pub b1: f64,
    pub b2: f64,
}

impl QuadraticCoefficients {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.intercept + x * (self.b1 + x * self.b2)
    }
}

/// Goodness-of-fit summary of a least-squares fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    pub n_points: usize,
    pub degrees_of_freedom: usize,
    pub residual_std_error: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Standard errors of intercept, b1, b2
    pub std_errors: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    pub coefficients: QuadraticCoefficients,
    pub statistics: FitStatistics,
}

/// Ordinary least-squares fit of `y` on `x` with a raw degree-2 polynomial.
///
/// Solved with Householder QR on the `[1, x, x²]` design matrix.
pub fn fit_quadratic(x: &[f64], y: &[f64]) -> Result<PolynomialFit, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < N_COEF {
        return Err(FitError::TooFewPoints {
            required: N_COEF,
            got: n,
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let mut design = Array2::<f64>::zeros((n, N_COEF));
    for (i, &xi) in x.iter().enumerate() {
        design[[i, 0]] = 1.0;
        design[[i, 1]] = xi;
        design[[i, 2]] = xi * xi;
    }
    let column_norms: Vec<f64> = (0..N_COEF)
        .map(|j| design.column(j).dot(&design.column(j)).sqrt())
        .collect();

    let mut rhs = Array1::from(y.to_vec());
    householder_qr(&mut design, &mut rhs);

    for (k, &norm) in column_norms.iter().enumerate() {
        if design[[k, k]].abs() <= RANK_TOLERANCE * norm.max(f64::MIN_POSITIVE) {
            return Err(FitError::RankDeficient { column: k });
        }
    }

    let r = design.slice(s![0..N_COEF, ..]).to_owned();
    let beta = back_substitute(&r, &rhs.slice(s![0..N_COEF]).to_owned());
    let coefficients = QuadraticCoefficients {
        intercept: beta[0],
        b1: beta[1],
        b2: beta[2],
    };

    let statistics = fit_statistics(x, y, &coefficients, &r);

    Ok(PolynomialFit {
        coefficients,
        statistics,
    })
}

/// In-place Householder triangularization of `a`, applying the same
/// reflections to `b`. On return the upper `N_COEF` rows of `a` hold R and
/// `b` holds Qᵀb.
fn householder_qr(a: &mut Array2<f64>, b: &mut Array1<f64>) {
    let (rows, cols) = a.dim();

    for k in 0..cols.min(rows) {
        let mut v = a.slice(s![k.., k]).to_owned();
        let alpha = v.dot(&v).sqrt();
        if alpha == 0.0 {
            continue;
        }
        let sign = if v[0] >= 0.0 { 1.0 } else { -1.0 };
        v[0] += sign * alpha;
        let v_norm_sq = v.dot(&v);
        if v_norm_sq == 0.0 {
            continue;
        }

        for j in k..cols {
            let mut column = a.slice_mut(s![k.., j]);
            let factor = 2.0 * v.dot(&column) / v_norm_sq;
            column.scaled_add(-factor, &v);
        }

        let mut tail = b.slice_mut(s![k..]);
        let factor = 2.0 * v.dot(&tail) / v_norm_sq;
        tail.scaled_add(-factor, &v);
    }
}

/// Solve the upper-triangular system `r · β = c`
fn back_substitute(r: &Array2<f64>, c: &Array1<f64>) -> Array1<f64> {
    let n = c.len();
    let mut beta = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut acc = c[i];
        for j in (i + 1)..n {
            acc -= r[[i, j]] * beta[j];
        }
        beta[i] = acc / r[[i, i]];
    }
    beta
}

/// Inverse of an upper-triangular matrix
fn invert_upper(r: &Array2<f64>) -> Array2<f64> {
    let n = r.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    for col in 0..n {
        let mut unit = Array1::<f64>::zeros(n);
        unit[col] = 1.0;
        let solved = back_substitute(r, &unit);
        inv.column_mut(col).assign(&solved);
    }
    inv
}

fn fit_statistics(
    x: &[f64],
    y: &[f64],
    coefficients: &QuadraticCoefficients,
    r: &Array2<f64>,
) -> FitStatistics {
    let n = x.len();
    let dof = n - N_COEF;

    let rss: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - coefficients.evaluate(xi)).powi(2))
        .sum();
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|&yi| (yi - mean_y).powi(2)).sum();

    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 1.0 };
    let (residual_std_error, adj_r_squared) = if dof > 0 {
        (
            (rss / dof as f64).sqrt(),
            1.0 - (1.0 - r_squared) * (n - 1) as f64 / dof as f64,
        )
    } else {
        (f64::NAN, f64::NAN)
    };

    // Var(β) = σ² (RᵀR)⁻¹ = σ² R⁻¹ R⁻ᵀ, so each SE is σ times a row norm of R⁻¹.
    let r_inv = invert_upper(r);
    let mut std_errors = [f64::NAN; 3];
    for (i, se) in std_errors.iter_mut().enumerate() {
        let row = r_inv.row(i);
        *se = residual_std_error * row.dot(&row).sqrt();
    }

    FitStatistics {
        n_points: n,
        degrees_of_freedom: dof,
        residual_std_error,
        r_squared,
        adj_r_squared,
        std_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_exact_quadratic_recovery() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&v| 2.0 + 3.0 * v + 0.5 * v * v).collect();

        let fit = fit_quadratic(&x, &y).unwrap();
        assert_abs_diff_eq!(fit.coefficients.intercept, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.coefficients.b1, 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.coefficients.b2, 0.5, epsilon = 1e-6);

        assert_abs_diff_eq!(fit.statistics.r_squared, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.statistics.residual_std_error, 0.0, epsilon = 1e-9);
        assert_eq!(fit.statistics.degrees_of_freedom, 2);
    }

    #[test]
    fn test_reflectance_scale_fit() {
        // Quantile-like inputs live in [0, 0.2]; make sure the small x² column
        // does not trip the rank check.
        let x: Vec<f64> = (1..=99).map(|i| i as f64 * 0.001).collect();
        let y: Vec<f64> = x.iter().map(|&v| 0.002 + 0.95 * v + 1.5 * v * v).collect();

        let fit = fit_quadratic(&x, &y).unwrap();
        assert_abs_diff_eq!(fit.coefficients.intercept, 0.002, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients.b1, 0.95, epsilon = 1e-7);
        assert_abs_diff_eq!(fit.coefficients.b2, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_noisy_fit_statistics() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 1.0 + 0.5 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();

        let fit = fit_quadratic(&x, &y).unwrap();
        let stats = &fit.statistics;
        assert_eq!(stats.n_points, 20);
        assert_eq!(stats.degrees_of_freedom, 17);
        assert!(stats.r_squared > 0.99 && stats.r_squared < 1.0);
        assert!(stats.adj_r_squared < stats.r_squared);
        assert!(stats.residual_std_error > 0.0);
        assert!(stats.std_errors.iter().all(|se| se.is_finite() && *se > 0.0));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            fit_quadratic(&[0.1, 0.2], &[0.1, 0.2]).unwrap_err(),
            FitError::TooFewPoints { required: 3, got: 2 }
        );
        assert_eq!(
            fit_quadratic(&[0.1, 0.2, 0.3], &[0.1, 0.2]).unwrap_err(),
            FitError::LengthMismatch { x: 3, y: 2 }
        );
        assert!(matches!(
            fit_quadratic(&[0.05; 10], &[0.01; 10]),
            Err(FitError::RankDeficient { .. })
        ));
        assert_eq!(
            fit_quadratic(&[0.1, f64::INFINITY, 0.3], &[0.1, 0.2, 0.3]).unwrap_err(),
            FitError::NonFinite
        );
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin().abs() * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|&v| v * 1.1 - 0.001).collect();
        let a = fit_quadratic(&x, &y).unwrap();
        let b = fit_quadratic(&x, &y).unwrap();
        assert_eq!(a, b);
    }
}
