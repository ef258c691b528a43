//! Cubic Spline Interpolation
//!
//! Fits a piecewise-cubic curve with continuous first and second derivatives
//! through `N >= 3` tabulated samples and evaluates the curve, its slope and
//! its curvature anywhere in (and, by extrapolation, outside) the sampled
//! domain.
//!
//! Construction solves the tridiagonal system for the knot curvatures with a
//! single forward-elimination sweep and a single back-substitution sweep:
//! O(N) time and O(N) scratch storage. Every query after that reuses the
//! stored curvatures, so a spline is typically built once and probed many
//! times.
//!
//! # Lookup strategies
//!
//! Locating the bracketing knot pair is the only non-constant part of a
//! query. [`Lookup`] selects how it is done:
//!
//! - [`Lookup::Arbitrary`]: binary search, O(log N), correct for any spacing
//! - [`Lookup::UniformLinear`]: direct index arithmetic, O(1), knots must be
//!   evenly spaced
//! - [`Lookup::UniformLogarithmic`]: direct index arithmetic in `ln x`,
//!   O(1), knots must be geometrically spaced with a positive first knot
//!
//! Declaring a uniform mode for knots that are not spaced that way does not
//! fail; it brackets the wrong interval and returns a meaningless value.
//!
//! # Extrapolation
//!
//! Queries outside `[domain_start, domain_end]` are evaluated with the cubic
//! of the nearest boundary interval. The result is an extrapolation, not a
//! clamped boundary value; use [`Spline::contains`] to tell the two apart.
//!
//! # Example
//!
//! ```rust
//! use spline_ode::{Boundary, Lookup, Spline};
//!
//! let x: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();
//! let y: Vec<f64> = x.iter().map(|t| t * t * t).collect();
//!
//! // Clamp both ends to the exact slope of x^3 so the cubic is reproduced.
//! let spline = Spline::new(
//!     &x,
//!     &y,
//!     Boundary::Clamped(0.0),
//!     Boundary::Clamped(3.0),
//!     Lookup::UniformLinear,
//!     "cube",
//! )
//! .unwrap();
//!
//! let v = spline.value_at(0.55).unwrap();
//! assert!((v - 0.55f64.powi(3)).abs() < 1e-12);
//! ```

use log::{error, trace};
use thiserror::Error;

/// Legacy boundary hint threshold: slopes above this select a natural end.
pub const NATURAL_SENTINEL: f64 = 0.99e30;

/// Boundary condition at one end of the spline
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Boundary {
    /// Second derivative is zero at the end
    #[default]
    Natural,
    /// First derivative at the end is fixed to the given slope
    Clamped(f64),
}

impl Boundary {
    /// Decode a legacy slope hint.
    ///
    /// Hints above [`NATURAL_SENTINEL`] (`0.99e30`) select
    /// [`Boundary::Natural`]; anything else is taken as a clamped slope.
    pub fn from_hint(dydx: f64) -> Self {
        if dydx > NATURAL_SENTINEL {
            Boundary::Natural
        } else {
            Boundary::Clamped(dydx)
        }
    }
}

/// Strategy used to locate the bracketing knot pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lookup {
    /// Binary search over the knots; any strictly increasing spacing
    #[default]
    Arbitrary,
    /// Knots are evenly spaced in `x`
    UniformLinear,
    /// Knots are evenly spaced in `ln x` (requires a positive first knot)
    UniformLogarithmic,
}

/// Errors raised while building or evaluating a [`Spline`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    /// Abscissa and ordinate arrays differ in length
    #[error("spline '{label}': {x_len} abscissas but {y_len} ordinates")]
    LengthMismatch {
        /// Diagnostic name of the spline
        label: String,
        /// Number of abscissas supplied
        x_len: usize,
        /// Number of ordinates supplied
        y_len: usize,
    },

    /// Fewer than three knots were supplied
    #[error("spline '{label}': at least 3 knots are required, got {found}")]
    TooFewKnots {
        /// Diagnostic name of the spline
        label: String,
        /// Number of knots supplied
        found: usize,
    },

    /// A knot coordinate is NaN or infinite
    #[error("spline '{label}': knot {index} is not finite")]
    NonFiniteKnot {
        /// Diagnostic name of the spline
        label: String,
        /// Index of the offending knot
        index: usize,
    },

    /// Abscissas are not strictly increasing
    #[error(
        "spline '{label}': abscissas must increase (x[{index}] = {previous} >= x[{}] = {current})",
        .index + 1
    )]
    NotStrictlyIncreasing {
        /// Diagnostic name of the spline
        label: String,
        /// Index of the first knot of the offending pair
        index: usize,
        /// Abscissa at `index`
        previous: f64,
        /// Abscissa at `index + 1`
        current: f64,
    },

    /// A clamped boundary slope is NaN or infinite
    #[error("spline '{label}': clamped boundary slope {slope} is not finite")]
    NonFiniteSlope {
        /// Diagnostic name of the spline
        label: String,
        /// The rejected slope
        slope: f64,
    },

    /// Logarithmic lookup requested with a non-positive first knot
    #[error("spline '{label}': logarithmic lookup needs a positive first knot, got {start}")]
    NonPositiveLogDomain {
        /// Diagnostic name of the spline
        label: String,
        /// First abscissa
        start: f64,
    },

    /// The bracketing interval located for a query has zero width
    #[error("spline '{label}': zero-width interval [{klo}, {khi}] located at x = {x}")]
    DegenerateInterval {
        /// Diagnostic name of the spline
        label: String,
        /// Query point
        x: f64,
        /// Lower knot index
        klo: usize,
        /// Upper knot index
        khi: usize,
    },
}

/// Local coordinates of a query point inside its bracketing interval
struct Segment {
    klo: usize,
    khi: usize,
    h: f64,
    a: f64,
    b: f64,
}

/// Cubic spline through tabulated samples
///
/// A `Spline` owns copies of its knots and curvature coefficients and never
/// mutates them after construction. `Clone` is a full deep copy, and the
/// type is `Send + Sync`, so one instance can serve concurrent read-only
/// queries from many threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    label: String,
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots
    y2: Vec<f64>,
    x_start: f64,
    x_end: f64,
    lookup: Lookup,
}

impl Spline {
    /// Fit a cubic spline through `(x[i], y[i])`.
    ///
    /// # Arguments
    /// * `x` - Abscissas, strictly increasing, at least 3
    /// * `y` - Ordinates, same length as `x`
    /// * `start` - Boundary condition at `x[0]`
    /// * `end` - Boundary condition at `x[N-1]`
    /// * `lookup` - Bracketing strategy; must match the knot spacing
    /// * `label` - Diagnostic name reported in errors
    ///
    /// # Errors
    /// Any malformed input is reported before the system is solved.
    pub fn new(
        x: &[f64],
        y: &[f64],
        start: Boundary,
        end: Boundary,
        lookup: Lookup,
        label: impl Into<String>,
    ) -> Result<Self, SplineError> {
        let label = label.into();
        validate_knots(x, y, &label)?;
        for boundary in [start, end] {
            if let Boundary::Clamped(slope) = boundary {
                if !slope.is_finite() {
                    return Err(SplineError::NonFiniteSlope { label, slope });
                }
            }
        }
        if lookup == Lookup::UniformLogarithmic && x[0] <= 0.0 {
            return Err(SplineError::NonPositiveLogDomain {
                label,
                start: x[0],
            });
        }

        let y2 = second_derivatives(x, y, start, end);

        Ok(Self {
            label,
            x: x.to_vec(),
            y: y.to_vec(),
            y2,
            x_start: x[0],
            x_end: x[x.len() - 1],
            lookup,
        })
    }

    /// Fit a spline with natural boundary conditions at both ends.
    pub fn natural(
        x: &[f64],
        y: &[f64],
        lookup: Lookup,
        label: impl Into<String>,
    ) -> Result<Self, SplineError> {
        Self::new(x, y, Boundary::Natural, Boundary::Natural, lookup, label)
    }

    /// Spline value at `x`.
    ///
    /// Outside the domain this extrapolates with the boundary cubic.
    pub fn value_at(&self, x: f64) -> Result<f64, SplineError> {
        let s = self.segment(x)?;
        let (a, b) = (s.a, s.b);
        Ok(a * self.y[s.klo]
            + b * self.y[s.khi]
            + ((a * a * a - a) * self.y2[s.klo] + (b * b * b - b) * self.y2[s.khi]) * (s.h * s.h)
                / 6.0)
    }

    /// First derivative of the spline at `x`.
    pub fn derivative_at(&self, x: f64) -> Result<f64, SplineError> {
        let s = self.segment(x)?;
        let (a, b) = (s.a, s.b);
        let curvature =
            -(3.0 * a * a - 1.0) * self.y2[s.klo] + (3.0 * b * b - 1.0) * self.y2[s.khi];
        Ok((self.y[s.khi] - self.y[s.klo]) / s.h + s.h / 6.0 * curvature)
    }

    /// Second derivative of the spline at `x` (piecewise linear in `x`).
    pub fn second_derivative_at(&self, x: f64) -> Result<f64, SplineError> {
        let s = self.segment(x)?;
        Ok(s.a * self.y2[s.klo] + s.b * self.y2[s.khi])
    }

    /// Evaluate the spline at every point of `xs`.
    pub fn values_at(&self, xs: &[f64]) -> Result<Vec<f64>, SplineError> {
        xs.iter().map(|&x| self.value_at(x)).collect()
    }

    /// Indices `(klo, klo + 1)` of the interval used to evaluate `x`.
    ///
    /// The index is clamped to `[0, N-2]`, so points outside the domain map
    /// to the nearest boundary interval.
    pub fn bracket(&self, x: f64) -> (usize, usize) {
        let n = self.x.len();
        let klo = match self.lookup {
            Lookup::UniformLinear => {
                index_from_fraction((x - self.x_start) / (self.x_end - self.x_start), n)
            }
            Lookup::UniformLogarithmic => index_from_fraction(
                (x / self.x_start).ln() / (self.x_end / self.x_start).ln(),
                n,
            ),
            Lookup::Arbitrary => {
                let above = self.x.partition_point(|&v| v <= x);
                above.saturating_sub(1).min(n - 2)
            }
        };
        (klo, klo + 1)
    }

    /// Whether `x` lies inside `[domain_start, domain_end]`.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_start && x <= self.x_end
    }

    /// `(domain_start, domain_end)`
    pub fn domain(&self) -> (f64, f64) {
        (self.x_start, self.x_end)
    }

    /// Number of knots
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always `false`: a constructed spline has at least three knots.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Knot abscissas
    pub fn knots_x(&self) -> &[f64] {
        &self.x
    }

    /// Knot ordinates
    pub fn knots_y(&self) -> &[f64] {
        &self.y
    }

    /// Lookup strategy chosen at construction
    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    /// Diagnostic name
    pub fn label(&self) -> &str {
        &self.label
    }

    fn segment(&self, x: f64) -> Result<Segment, SplineError> {
        let (klo, khi) = self.bracket(x);
        let h = self.x[khi] - self.x[klo];
        if h == 0.0 {
            error!(
                "spline '{}': h = 0 at x = {} (klo = {}, khi = {}, n = {}, domain = [{}, {}])",
                self.label,
                x,
                klo,
                khi,
                self.x.len(),
                self.x_start,
                self.x_end
            );
            return Err(SplineError::DegenerateInterval {
                label: self.label.clone(),
                x,
                klo,
                khi,
            });
        }
        if !self.contains(x) {
            trace!(
                "spline '{}': extrapolating at x = {} outside [{}, {}]",
                self.label,
                x,
                self.x_start,
                self.x_end
            );
        }
        Ok(Segment {
            klo,
            khi,
            h,
            a: (self.x[khi] - x) / h,
            b: (x - self.x[klo]) / h,
        })
    }
}

fn validate_knots(x: &[f64], y: &[f64], label: &str) -> Result<(), SplineError> {
    if x.len() != y.len() {
        return Err(SplineError::LengthMismatch {
            label: label.to_string(),
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < 3 {
        return Err(SplineError::TooFewKnots {
            label: label.to_string(),
            found: x.len(),
        });
    }
    if let Some(index) = x
        .iter()
        .zip(y)
        .position(|(xi, yi)| !xi.is_finite() || !yi.is_finite())
    {
        return Err(SplineError::NonFiniteKnot {
            label: label.to_string(),
            index,
        });
    }
    if let Some(index) = x.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SplineError::NotStrictlyIncreasing {
            label: label.to_string(),
            index,
            previous: x[index],
            current: x[index + 1],
        });
    }
    Ok(())
}

/// Solve the tridiagonal continuity system for the knot curvatures.
///
/// Forward elimination stores the decomposition factors in `y2` and the
/// transformed right-hand side in `u`; back substitution then overwrites
/// `y2` with the second derivatives.
fn second_derivatives(x: &[f64], y: &[f64], start: Boundary, end: Boundary) -> Vec<f64> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];

    if let Boundary::Clamped(dydx) = start {
        y2[0] = -0.5;
        u[0] = (3.0 / (x[1] - x[0])) * ((y[1] - y[0]) / (x[1] - x[0]) - dydx);
    }

    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let jump = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * jump / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }

    let (qn, un) = match end {
        Boundary::Natural => (0.0, 0.0),
        Boundary::Clamped(dydx) => {
            let h = x[n - 1] - x[n - 2];
            (0.5, (3.0 / h) * (dydx - (y[n - 1] - y[n - 2]) / h))
        }
    };
    y2[n - 1] = (un - qn * u[n - 2]) / (qn * y2[n - 2] + 1.0);

    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

/// Map a fractional position in `[0, 1]` to a lower knot index in `[0, n-2]`.
fn index_from_fraction(t: f64, n: usize) -> usize {
    let pos = (t * (n - 1) as f64).floor();
    // NaN and negatives land on the first interval
    if !(pos > 0.0) {
        return 0;
    }
    (pos as usize).min(n - 2)
}
