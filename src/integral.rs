// Adaptive Romberg quadrature used to build cross section tables.

use crate::constants::{INTEGRATION_PRECISION, MAX_REFINEMENTS, ROMBERG_ORDER};

/// How the integration variable is treated.
///
/// Energy-loss integrands are often steep power laws in the transfer
/// fraction `v` (e.g. ~1/v^2 just above the cut), so integrating in
/// `ln v` flattens them and lets the quadrature converge in a few
/// refinements instead of many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// Plain closed Romberg rule on `[a, b]`.
    Closed,
    /// Substitute `x = e^w` and integrate in `w`. Requires a positive
    /// interval; falls back to the closed rule otherwise.
    LogSubstitution,
}

/// Adaptive quadrature with Romberg extrapolation.
///
/// The integrator refines a trapezoid rule, extrapolating the last
/// `order` estimates to zero step width after each refinement. If the
/// extrapolation error does not drop below `precision` within
/// `max_refinements` doublings, the best available estimate is returned
/// and a diagnostic is printed; a slightly degraded table node is
/// preferable to a build that never finishes.
#[derive(Debug, Clone, Copy)]
pub struct Integral {
    order: usize,
    max_refinements: usize,
    precision: f64,
}

impl Default for Integral {
    fn default() -> Self {
        Integral {
            order: ROMBERG_ORDER,
            max_refinements: MAX_REFINEMENTS,
            precision: INTEGRATION_PRECISION,
        }
    }
}

impl Integral {
    pub fn new(order: usize, max_refinements: usize, precision: f64) -> Result<Self, String> {
        if order < 2 {
            return Err(format!("Romberg order must be at least 2, got {}", order));
        }
        if max_refinements < order {
            return Err(format!(
                "max_refinements ({}) must not be smaller than the Romberg order ({})",
                max_refinements, order
            ));
        }
        if !(precision > 0.0) {
            return Err(format!("precision must be positive, got {}", precision));
        }
        Ok(Integral {
            order,
            max_refinements,
            precision,
        })
    }

    /// Integrate `f` over `[lower, upper]`.
    ///
    /// A zero-width interval integrates to exactly zero. Reversed bounds
    /// flip the sign, as usual.
    pub fn integrate<F>(&self, lower: f64, upper: f64, f: F, method: IntegrationMethod) -> f64
    where
        F: Fn(f64) -> f64,
    {
        if lower == upper {
            return 0.0;
        }
        let (a, b, sign) = if lower < upper {
            (lower, upper, 1.0)
        } else {
            (upper, lower, -1.0)
        };
        let value = match method {
            IntegrationMethod::Closed => self.romberg(a, b, &f),
            IntegrationMethod::LogSubstitution => {
                if a > 0.0 {
                    self.romberg(a.ln(), b.ln(), &|w: f64| {
                        let x = w.exp();
                        f(x) * x
                    })
                } else {
                    self.romberg(a, b, &f)
                }
            }
        };
        sign * value
    }

    fn romberg(&self, a: f64, b: f64, f: &dyn Fn(f64) -> f64) -> f64 {
        let width = b - a;
        let mut trapezoid = 0.5 * width * (f(a) + f(b));
        let mut h2 = vec![1.0];
        let mut estimates = vec![trapezoid];
        let mut best = trapezoid;
        let mut last_correction = f64::INFINITY;

        for k in 1..=self.max_refinements {
            // Halve the step by adding the midpoints of the current intervals.
            let intervals = 1usize << (k - 1);
            let step = width / intervals as f64;
            let mut midpoint_sum = 0.0;
            let mut x = a + 0.5 * step;
            for _ in 0..intervals {
                midpoint_sum += f(x);
                x += step;
            }
            trapezoid = 0.5 * (trapezoid + step * midpoint_sum);
            h2.push(h2[k - 1] * 0.25);
            estimates.push(trapezoid);

            if estimates.len() >= self.order {
                let start = estimates.len() - self.order;
                let (value, correction) = extrapolate_to_zero(&h2[start..], &estimates[start..]);
                best = value;
                last_correction = correction;
                if correction.abs() <= self.precision * value.abs().max(f64::MIN_POSITIVE) {
                    return value;
                }
            }
        }

        println!(
            "[integral] no convergence after {} refinements, returning best estimate {} (last correction {})",
            self.max_refinements, best, last_correction
        );
        best
    }
}

/// Neville extrapolation of the estimates to zero squared step width.
/// Returns the extrapolated value and the size of the final correction.
fn extrapolate_to_zero(h2: &[f64], estimates: &[f64]) -> (f64, f64) {
    let n = estimates.len();
    let mut tableau = estimates.to_vec();
    let mut correction = 0.0;
    for m in 1..n {
        for i in 0..(n - m) {
            let updated =
                (h2[i] * tableau[i + 1] - h2[i + m] * tableau[i]) / (h2[i] - h2[i + m]);
            if i == 0 {
                correction = updated - tableau[0];
            }
            tableau[i] = updated;
        }
    }
    (tableau[0], correction)
}
