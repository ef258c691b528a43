//! Adaptive Dormand-Prince 5(4) Integrator
//!
//! Advances a system of `neq` coupled first-order ODEs from `x_start` to
//! `x_end` and records the solution on `n` evenly spaced output abscissas.
//! Between two output abscissas the integrator takes as many adaptive
//! internal steps as the precision goal requires, and clamps the last one
//! so every output point is hit exactly rather than interpolated.
//!
//! Reference: Hairer, E., Nørsett, S.P., & Wanner, G. (1993). "Solving
//! Ordinary Differential Equations I: Nonstiff Problems". Springer.

use log::{debug, info, warn};
use thiserror::Error;

use crate::coefficients::{A, B_ERR, C, STAGES};

/// Keeps the error scale positive when a component and its slope vanish
const TINY: f64 = 1.0e-30;

/// System of ordinary differential equations: dy/dx = f(x, y)
///
/// Implemented for every `Fn(f64, &[f64], &mut [f64])`, so a closure with
/// annotated argument types can be handed to [`OdeSolver::new`] directly.
pub trait OdeSystem {
    /// Evaluate the right-hand side of the ODE system
    ///
    /// # Arguments
    /// * `x` - Current value of the independent variable
    /// * `y` - Current state vector (length `neq`)
    /// * `dydx` - Output: derivative dy/dx (length `neq`)
    fn rhs(&self, x: f64, y: &[f64], dydx: &mut [f64]);
}

impl<F> OdeSystem for F
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    fn rhs(&self, x: f64, y: &[f64], dydx: &mut [f64]) {
        self(x, y, dydx)
    }
}

/// Precision goal and step-size bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precision {
    /// Target relative local error per step
    pub epsilon: f64,
    /// First trial step size
    pub h_start: f64,
    /// Smallest step size allowed after a rejection; 0 disables the floor
    /// and only step underflow (`x + h == x`) stops the integration
    pub h_min: f64,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            h_start: 1e-6,
            h_min: 0.0,
        }
    }
}

impl Precision {
    /// Create a precision setting from its three knobs
    pub fn new(epsilon: f64, h_start: f64, h_min: f64) -> Self {
        Self {
            epsilon,
            h_start,
            h_min,
        }
    }

    fn validate(&self) -> Result<(), IntegrationError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(IntegrationError::InvalidPrecision {
                message: format!("epsilon must be positive and finite (got {})", self.epsilon),
            });
        }
        if !self.h_start.is_finite() || self.h_start <= 0.0 {
            return Err(IntegrationError::InvalidPrecision {
                message: format!("h_start must be positive and finite (got {})", self.h_start),
            });
        }
        if !self.h_min.is_finite() || self.h_min < 0.0 {
            return Err(IntegrationError::InvalidPrecision {
                message: format!("h_min must be non-negative and finite (got {})", self.h_min),
            });
        }
        Ok(())
    }
}

/// Step-size controller using an I-controller
///
/// h_new = safety * h * error^(-1/5)
/// where 5 = embedded order + 1 for DOPRI5
#[derive(Debug, Clone, PartialEq)]
pub struct StepController {
    /// Safety factor (0.8-0.9 typical)
    pub safety: f64,
    /// Maximum growth factor per step
    pub max_factor: f64,
    /// Minimum reduction factor per step
    pub min_factor: f64,
    /// Exponent = 1/(order + 1) for I-controller
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / 5.0,
        }
    }
}

impl StepController {
    /// Create a controller with custom bounds; the exponent stays 1/5
    pub fn new(safety: f64, max_factor: f64, min_factor: f64) -> Self {
        Self {
            safety,
            max_factor,
            min_factor,
            ..Self::default()
        }
    }

    /// Step size factor after an accepted step (`error <= 1`)
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }

        let factor = self.safety * error.powf(-self.exponent);
        factor.max(self.min_factor).min(self.max_factor)
    }

    /// Step size factor after a rejected step; never above `safety`, so a
    /// rejected step always shrinks
    pub fn shrink_factor(&self, error: f64) -> f64 {
        self.compute_factor(error).min(self.safety)
    }

    fn validate(&self) -> Result<(), IntegrationError> {
        let invalid = |message: String| Err(IntegrationError::InvalidController { message });
        if !(self.safety > 0.0 && self.safety < 1.0) {
            return invalid(format!("safety must lie in (0, 1) (got {})", self.safety));
        }
        if !(self.min_factor > 0.0 && self.min_factor < 1.0) {
            return invalid(format!("min_factor must lie in (0, 1) (got {})", self.min_factor));
        }
        if !self.max_factor.is_finite() || self.max_factor < self.min_factor {
            return invalid(format!(
                "max_factor must be finite and at least min_factor = {} (got {})",
                self.min_factor, self.max_factor
            ));
        }
        Ok(())
    }
}

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Total number of right-hand-side evaluations
    pub fn_evals: u64,
    /// Number of accepted steps
    pub accepted_steps: u64,
    /// Number of rejected steps
    pub rejected_steps: u64,
}

/// Lifecycle of an [`OdeSolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not solved yet
    Configured,
    /// Inside the stepping loop
    Solving,
    /// Last `solve()` succeeded; results are valid
    Solved,
    /// Last `solve()` failed; results are cleared
    Failed,
}

/// Errors that can occur during integration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    /// Equation count is zero
    #[error("equation count must be positive")]
    NoEquations,

    /// Fewer than two output points requested
    #[error("at least 2 output points are required (got {0})")]
    TooFewOutputPoints(usize),

    /// Interval is empty, reversed, or not finite
    #[error("integration interval must satisfy start < end (got start = {start}, end = {end})")]
    EmptyInterval {
        /// First abscissa
        start: f64,
        /// Last abscissa
        end: f64,
    },

    /// Initial-condition vector has the wrong length
    #[error("expected {expected} initial conditions, got {found}")]
    InitialConditionLength {
        /// Equation count
        expected: usize,
        /// Length of the supplied vector
        found: usize,
    },

    /// An initial condition is NaN or infinite
    #[error("initial condition y[{index}] is not finite")]
    NonFiniteInitialCondition {
        /// Index of the offending component
        index: usize,
    },

    /// Precision knobs out of range
    #[error("invalid precision: {message}")]
    InvalidPrecision {
        /// Description of the invalid setting
        message: String,
    },

    /// Step-size controller bounds out of range
    #[error("invalid step controller: {message}")]
    InvalidController {
        /// Description of the invalid setting
        message: String,
    },

    /// Step size collapsed without meeting the precision goal
    #[error("step size {h:e} too small at x = {x}; precision goal not met")]
    StepSizeTooSmall {
        /// Abscissa at which the step collapsed
        x: f64,
        /// Step size that fell below the floor
        h: f64,
    },

    /// Non-finite state detected during integration
    #[error("non-finite state detected at x = {x}")]
    NonFiniteState {
        /// Abscissa at which the state became non-finite
        x: f64,
    },
}

/// Owned copy of a solved output grid
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Output abscissas
    pub x: Vec<f64>,
    /// `y[eq][i]` is equation `eq` at `x[i]`
    pub y: Vec<Vec<f64>>,
}

/// Stage vectors and trial states, allocated once per solve
#[derive(Debug, Clone, Default)]
struct Workspace {
    k: [Vec<f64>; STAGES],
    y: Vec<f64>,
    y_stage: Vec<f64>,
}

impl Workspace {
    fn reset(&mut self, neq: usize) {
        for v in self.k.iter_mut().chain([&mut self.y, &mut self.y_stage]) {
            v.clear();
            v.resize(neq, 0.0);
        }
    }
}

/// Adaptive ODE integrator with a fixed output grid
///
/// # Example
/// ```
/// use spline_ode::{OdeSolver, Precision};
///
/// // dy/dx = -2xy, y(0) = 1  =>  y = exp(-x^2)
/// let rhs = |x: f64, y: &[f64], dydx: &mut [f64]| dydx[0] = -2.0 * x * y[0];
///
/// let mut solver = OdeSolver::new(20, 1, rhs);
/// solver.set_initial_conditions(0.0, 1.0, &[1.0]);
/// solver.set_precision(Precision::new(1e-10, 1e-6, 0.0));
/// solver.solve().unwrap();
///
/// let x = solver.x_values();
/// let y = solver.y_values(0).unwrap();
/// assert_eq!(x[19], 1.0);
/// assert!((y[19] - (-1.0f64).exp()).abs() < 1e-10);
/// ```
#[derive(Clone)]
pub struct OdeSolver<S> {
    system: S,
    neq: usize,
    n_out: usize,
    x_start: f64,
    x_end: f64,
    y0: Vec<f64>,
    precision: Precision,
    controller: StepController,
    verbose: bool,
    status: Status,
    xs: Vec<f64>,
    ys: Vec<Vec<f64>>,
    work: Workspace,
    /// Integration statistics of the last solve
    pub stats: Stats,
}

impl<S: OdeSystem> OdeSolver<S> {
    /// Create a solver for `neq` equations recorded at `n_out` output points.
    ///
    /// The configuration is only checked by [`solve`](Self::solve).
    pub fn new(n_out: usize, neq: usize, system: S) -> Self {
        Self {
            system,
            neq,
            n_out,
            x_start: 0.0,
            x_end: 0.0,
            y0: vec![0.0; neq],
            precision: Precision::default(),
            controller: StepController::default(),
            verbose: false,
            status: Status::Configured,
            xs: Vec::new(),
            ys: Vec::new(),
            work: Workspace::default(),
            stats: Stats::default(),
        }
    }

    /// Set the interval `[x_start, x_end]` and the state at `x_start`.
    pub fn set_initial_conditions(&mut self, x_start: f64, x_end: f64, y0: &[f64]) {
        self.x_start = x_start;
        self.x_end = x_end;
        self.y0 = y0.to_vec();
    }

    /// Override the precision goal and step-size bounds
    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// Override the step-size controller
    pub fn set_controller(&mut self, controller: StepController) {
        self.controller = controller;
    }

    /// Log every accepted step at `info` level
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Current precision setting
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Number of coupled equations
    pub fn equation_count(&self) -> usize {
        self.neq
    }

    /// Number of output points
    pub fn output_point_count(&self) -> usize {
        self.n_out
    }

    /// The right-hand side this solver was built with
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Outcome of the last solve
    pub fn status(&self) -> Status {
        self.status
    }

    /// Output abscissas; empty unless the last solve succeeded
    pub fn x_values(&self) -> &[f64] {
        &self.xs
    }

    /// Solution of equation `eq` at every output abscissa.
    ///
    /// `None` if `eq` is out of range or no successful solve has run.
    pub fn y_values(&self, eq: usize) -> Option<&[f64]> {
        self.ys.get(eq).map(Vec::as_slice)
    }

    /// Owned copy of the output grid after a successful solve
    pub fn solution(&self) -> Option<Solution> {
        (self.status == Status::Solved).then(|| Solution {
            x: self.xs.clone(),
            y: self.ys.clone(),
        })
    }

    /// Integrate over the whole interval and record the output grid.
    ///
    /// Any previous results are overwritten on success and cleared on
    /// failure.
    ///
    /// # Returns
    /// * `Ok(())` - results available via [`x_values`](Self::x_values) and
    ///   [`y_values`](Self::y_values)
    /// * `Err(IntegrationError)` - configuration rejected or step collapse
    pub fn solve(&mut self) -> Result<(), IntegrationError> {
        self.stats = Stats::default();
        self.xs.clear();
        self.ys.clear();

        if let Err(e) = self.validate_inputs() {
            self.status = Status::Failed;
            return Err(e);
        }

        let grid = self.output_grid();
        self.status = Status::Solving;

        match self.integrate_grid(&grid) {
            Ok(()) => {
                self.xs = grid;
                self.status = Status::Solved;
                let summary = format!(
                    "solved {} equation(s) on [{}, {}]: {} accepted, {} rejected, {} evaluations",
                    self.neq,
                    self.x_start,
                    self.x_end,
                    self.stats.accepted_steps,
                    self.stats.rejected_steps,
                    self.stats.fn_evals
                );
                if self.verbose {
                    info!("{summary}");
                } else {
                    debug!("{summary}");
                }
                Ok(())
            }
            Err(e) => {
                warn!("integration failed: {e}");
                self.ys.clear();
                self.status = Status::Failed;
                Err(e)
            }
        }
    }

    /// Evenly spaced abscissas; the last one is `x_end` exactly.
    fn output_grid(&self) -> Vec<f64> {
        let last = self.n_out - 1;
        let dx = (self.x_end - self.x_start) / last as f64;
        (0..self.n_out)
            .map(|i| {
                if i == last {
                    self.x_end
                } else {
                    self.x_start + i as f64 * dx
                }
            })
            .collect()
    }

    fn integrate_grid(&mut self, grid: &[f64]) -> Result<(), IntegrationError> {
        let neq = self.neq;
        self.work.reset(neq);
        self.work.y.copy_from_slice(&self.y0);
        self.ys = vec![vec![0.0; grid.len()]; neq];
        for (column, &v) in self.ys.iter_mut().zip(&self.y0) {
            column[0] = v;
        }

        let mut x = grid[0];
        let mut h = self.precision.h_start.max(self.precision.h_min);

        // Stage 0 is carried over between steps (FSAL)
        self.system.rhs(x, &self.work.y, &mut self.work.k[0]);
        self.stats.fn_evals += 1;

        for (i, &target) in grid.iter().enumerate().skip(1) {
            while x < target {
                let h_free = h;
                let clamped = x + h >= target;
                if clamped {
                    h = target - x;
                }

                self.compute_stages(x, h);
                let error = self.compute_error(h);

                if error <= 1.0 {
                    x = if clamped { target } else { x + h };
                    // The last stage state is the 5th-order solution and its
                    // derivative is the first stage of the next step.
                    std::mem::swap(&mut self.work.y, &mut self.work.y_stage);
                    self.work.k.swap(0, STAGES - 1);
                    self.stats.accepted_steps += 1;

                    if !self.work.y.iter().all(|v| v.is_finite()) {
                        return Err(IntegrationError::NonFiniteState { x });
                    }
                    if self.verbose {
                        info!("x = {:.10e}  h = {:.3e}  err = {:.3e}", x, h, error);
                    }

                    let h_next = h * self.controller.compute_factor(error);
                    h = if clamped { h_next.max(h_free) } else { h_next };
                } else {
                    self.stats.rejected_steps += 1;
                    let h_next = h * self.controller.shrink_factor(error);
                    if self.step_collapsed(x, h_next) {
                        return Err(IntegrationError::StepSizeTooSmall { x, h: h_next });
                    }
                    h = h_next;
                }
            }

            for (column, &v) in self.ys.iter_mut().zip(&self.work.y) {
                column[i] = v;
            }
        }

        Ok(())
    }

    fn step_collapsed(&self, x: f64, h: f64) -> bool {
        if self.precision.h_min > 0.0 {
            h < self.precision.h_min
        } else {
            x + h == x
        }
    }

    /// Compute stages 1-6; stage 0 must already hold f(x, y)
    #[allow(clippy::needless_range_loop)]
    fn compute_stages(&mut self, x: f64, h: f64) {
        let work = &mut self.work;
        let neq = work.y.len();

        for i in 1..STAGES {
            // y_stage = y + h * sum_{j=0}^{i-1} a[i][j] * k[j]
            for n in 0..neq {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * work.k[j][n];
                }
                work.y_stage[n] = work.y[n] + h * sum;
            }

            self.system.rhs(x + C[i] * h, &work.y_stage, &mut work.k[i]);
        }
        self.stats.fn_evals += (STAGES - 1) as u64;
    }

    /// Compute the normalized error estimate
    ///
    /// Uses the infinity norm of the relative error:
    /// error = max_i( |h * sum_j (b[j] - b_hat[j]) * k[j][i]| / scale[i] ) / epsilon
    /// where scale[i] = |y[i]| + |h * dydx[i]| + TINY
    #[allow(clippy::needless_range_loop)]
    fn compute_error(&self, h: f64) -> f64 {
        let work = &self.work;
        let mut max_err: f64 = 0.0;

        for n in 0..work.y.len() {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += B_ERR[i] * work.k[i][n];
            }
            err_n *= h;

            let scale = work.y[n].abs() + (h * work.k[0][n]).abs() + TINY;
            max_err = max_err.max(err_n.abs() / scale);
        }

        max_err / self.precision.epsilon
    }

    /// Validate configuration before any computation
    fn validate_inputs(&self) -> Result<(), IntegrationError> {
        if self.neq == 0 {
            return Err(IntegrationError::NoEquations);
        }
        if self.n_out < 2 {
            return Err(IntegrationError::TooFewOutputPoints(self.n_out));
        }
        if !self.x_start.is_finite() || !self.x_end.is_finite() || self.x_start >= self.x_end {
            return Err(IntegrationError::EmptyInterval {
                start: self.x_start,
                end: self.x_end,
            });
        }
        if self.y0.len() != self.neq {
            return Err(IntegrationError::InitialConditionLength {
                expected: self.neq,
                found: self.y0.len(),
            });
        }
        if let Some(index) = self.y0.iter().position(|v| !v.is_finite()) {
            return Err(IntegrationError::NonFiniteInitialCondition { index });
        }
        self.precision.validate()?;
        self.controller.validate()
    }
}
