//! Dormand-Prince 5(4) Coefficients
//!
//! Coefficients for the 7-stage embedded RK5(4) pair from:
//! Dormand, J.R. & Prince, P.J. (1980). "A family of embedded Runge-Kutta
//! formulae". Journal of Computational and Applied Mathematics 6(1), 19-26.
//!
//! The 5th-order solution advances the state (local extrapolation); the
//! 4th-order companion only feeds the error estimate. The last stage is
//! evaluated at the new state with the 5th-order weights (first same as
//! last), so it doubles as the first stage of the following step.

/// Number of stages in the DOPRI5 method
pub const STAGES: usize = 7;

/// Order of the higher-order method (used for advancing the solution)
pub const ORDER: u8 = 5;

/// Order of the embedded method (used for error estimation)
pub const EMBEDDED_ORDER: u8 = 4;

/// Node coefficients (c_i): stage i is evaluated at x_n + c[i]*h
pub const C: [f64; STAGES] = [
    0.0,        // c[0]
    1.0 / 5.0,  // c[1]
    3.0 / 10.0, // c[2]
    4.0 / 5.0,  // c[3]
    8.0 / 9.0,  // c[4]
    1.0,        // c[5]
    1.0,        // c[6] (FSAL stage)
];

/// Runge-Kutta matrix (a_ij) coefficients
///
/// k_i = f(x_n + c_i*h, y_n + h * sum_{j=0}^{i-1} a_{i,j} * k_j)
///
/// Stored as A[i][j] for row i, column j (j < i)
pub const A: [[f64; 6]; STAGES] = [
    [0.0; 6],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    // Row 6 repeats the 5th-order weights (FSAL)
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// Weights for the 5th-order solution (b_i)
///
/// y_{n+1} = y_n + h * sum_i b[i] * k_i
pub const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Weights for the embedded 4th-order solution (b_hat_i)
pub const B_HAT: [f64; STAGES] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Error weights: B[i] - B_HAT[i], kept as exact rationals
///
/// err ≈ h * sum_i (b[i] - b_hat[i]) * k_i
pub const B_ERR: [f64; STAGES] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-14;

    #[test]
    fn test_row_sum_condition() {
        for i in 0..STAGES {
            let row_sum: f64 = A[i].iter().sum();
            assert!(
                (row_sum - C[i]).abs() < TOL,
                "Row {} sum = {}, expected c[{}] = {}",
                i,
                row_sum,
                i,
                C[i]
            );
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let b_sum: f64 = B.iter().sum();
        assert!((b_sum - 1.0).abs() < TOL, "5th order weights sum to {}", b_sum);

        let b_hat_sum: f64 = B_HAT.iter().sum();
        assert!(
            (b_hat_sum - 1.0).abs() < TOL,
            "4th order weights sum to {}",
            b_hat_sum
        );
    }

    #[test]
    fn test_error_weights_match_difference() {
        for i in 0..STAGES {
            assert!(
                (B_ERR[i] - (B[i] - B_HAT[i])).abs() < TOL,
                "B_ERR[{}] = {}, expected {}",
                i,
                B_ERR[i],
                B[i] - B_HAT[i]
            );
        }
        let err_sum: f64 = B_ERR.iter().sum();
        assert!(err_sum.abs() < TOL, "Error weights sum to {}", err_sum);
    }

    #[test]
    fn test_fsal_row_matches_weights() {
        for j in 0..6 {
            assert_eq!(A[STAGES - 1][j], B[j]);
        }
        assert_eq!(B[STAGES - 1], 0.0);
    }

    #[test]
    fn test_quadrature_order_conditions() {
        // sum b_i c_i^{q-1} = 1/q for q = 1..=5
        for q in 1..=ORDER as i32 {
            let s: f64 = (0..STAGES).map(|i| B[i] * C[i].powi(q - 1)).sum();
            assert!(
                (s - 1.0 / q as f64).abs() < TOL,
                "order condition q={} gives {}",
                q,
                s
            );
        }
        for q in 1..=EMBEDDED_ORDER as i32 {
            let s: f64 = (0..STAGES).map(|i| B_HAT[i] * C[i].powi(q - 1)).sum();
            assert!((s - 1.0 / q as f64).abs() < TOL);
        }
    }
}
