// Tabulated 1D / 2D interpolants over transformed coordinate axes.
//
// Tables are built once from a generating function, evaluated millions of
// times during transport, and never mutated afterwards. Evaluation is
// deterministic and side-effect-free, so built interpolants can be shared
// across transport threads without synchronization.

use serde::{Deserialize, Serialize};

/// Stored stand-in for `ln(0)` when a table keeps its values in log space.
/// Maps back to ~1e-100 on evaluation, i.e. effectively zero rate.
const LOG_OF_ZERO: f64 = -230.0;

/// One coordinate axis of a table.
///
/// Nodes are placed uniformly in the transformed coordinate: `ln x` for a
/// logarithmic axis (energy axes spanning many decades), plain `x`
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Number of nodes, at least 2.
    pub nodes: usize,
    /// Lower domain bound (physical coordinate).
    pub min: f64,
    /// Upper domain bound (physical coordinate).
    pub max: f64,
    /// Place nodes uniformly in `ln x` instead of `x`.
    pub log: bool,
}

impl Axis {
    fn validate(&self, name: &str) -> Result<(), String> {
        if self.nodes < 2 {
            return Err(format!("{}: need at least 2 nodes, got {}", name, self.nodes));
        }
        if !(self.min < self.max) {
            return Err(format!(
                "{}: domain bounds must satisfy min < max, got [{}, {}]",
                name, self.min, self.max
            ));
        }
        if self.log && self.min <= 0.0 {
            return Err(format!(
                "{}: logarithmic axis requires a positive domain, got min = {}",
                name, self.min
            ));
        }
        Ok(())
    }

    fn transform(&self, x: f64) -> f64 {
        if self.log {
            x.ln()
        } else {
            x
        }
    }

    fn back_transform(&self, t: f64) -> f64 {
        if self.log {
            t.exp()
        } else {
            t
        }
    }

    /// Node coordinates in transformed space, uniformly spaced.
    fn node_coordinates(&self) -> Vec<f64> {
        let t_min = self.transform(self.min);
        let t_max = self.transform(self.max);
        let step = (t_max - t_min) / (self.nodes - 1) as f64;
        (0..self.nodes).map(|i| t_min + step * i as f64).collect()
    }
}

/// Configuration of a 1D table. Immutable once the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interpolant1dDef {
    pub axis: Axis,
    /// Number of nodes used per local fit.
    pub order: usize,
    /// Use rational (Bulirsch-Stoer) instead of polynomial local fits.
    pub rational: bool,
    /// Store `ln y` and exponentiate on evaluation. Keeps strongly varying
    /// positive functions well conditioned; non-positive samples are stored
    /// as an effective zero.
    pub log_values: bool,
}

impl Interpolant1dDef {
    fn validate(&self) -> Result<(), String> {
        self.axis.validate("axis")?;
        if self.order < 2 {
            return Err(format!("interpolation order must be at least 2, got {}", self.order));
        }
        Ok(())
    }
}

/// A built 1D table: transformed node coordinates plus stored values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpolant1d {
    def: Interpolant1dDef,
    coords: Vec<f64>,
    values: Vec<f64>,
}

impl Interpolant1d {
    /// Evaluate `function` at every node and store the (possibly
    /// log-transformed) results.
    pub fn build<F>(def: &Interpolant1dDef, function: F) -> Result<Self, String>
    where
        F: Fn(f64) -> f64,
    {
        def.validate()?;
        let coords = def.axis.node_coordinates();
        let mut values = Vec::with_capacity(coords.len());
        for &t in &coords {
            let y = function(def.axis.back_transform(t));
            values.push(store_value(y, def.log_values));
        }
        Ok(Interpolant1d {
            def: *def,
            coords,
            values,
        })
    }

    pub fn def(&self) -> &Interpolant1dDef {
        &self.def
    }

    /// Evaluate the table at `x`.
    ///
    /// Queries outside the built domain extrapolate from the edge window.
    /// That is permitted but is an accuracy degradation, not an error.
    pub fn interpolate(&self, x: f64) -> f64 {
        let t = if self.def.axis.log && x <= 0.0 {
            // Non-positive query on a log axis: pin to the lower edge.
            self.coords[0]
        } else {
            self.def.axis.transform(x)
        };
        let (start, len) = window(&self.coords, t, self.def.order);
        let raw = if self.def.rational {
            rational(&self.coords[start..start + len], &self.values[start..start + len], t)
        } else {
            neville(&self.coords[start..start + len], &self.values[start..start + len], t)
        };
        if self.def.log_values {
            raw.exp()
        } else {
            raw
        }
    }
}

/// Configuration of a 2D table. The second axis carries the local fit
/// options; the first (energy) axis is always fitted polynomially.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interpolant2dDef {
    pub axis1: Axis,
    pub axis2: Axis,
    pub order: usize,
    pub rational: bool,
    pub log_values: bool,
}

impl Interpolant2dDef {
    fn validate(&self) -> Result<(), String> {
        self.axis1.validate("axis1")?;
        self.axis2.validate("axis2")?;
        if self.order < 2 {
            return Err(format!("interpolation order must be at least 2, got {}", self.order));
        }
        Ok(())
    }

    fn row_def(&self) -> Interpolant1dDef {
        Interpolant1dDef {
            axis: self.axis2,
            order: self.order,
            rational: self.rational,
            log_values: self.log_values,
        }
    }
}

/// A built 2D table: one 1D row per first-axis node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpolant2d {
    def: Interpolant2dDef,
    coords1: Vec<f64>,
    rows: Vec<Interpolant1d>,
}

impl Interpolant2d {
    /// Evaluate `function` on the full node grid (`axis1.nodes` x
    /// `axis2.nodes` calls).
    pub fn build<F>(def: &Interpolant2dDef, function: F) -> Result<Self, String>
    where
        F: Fn(f64, f64) -> f64,
    {
        def.validate()?;
        let coords1 = def.axis1.node_coordinates();
        let row_def = def.row_def();
        let mut rows = Vec::with_capacity(coords1.len());
        for &t1 in &coords1 {
            let x1 = def.axis1.back_transform(t1);
            rows.push(Interpolant1d::build(&row_def, |x2| function(x1, x2))?);
        }
        Ok(Interpolant2d {
            def: *def,
            coords1,
            rows,
        })
    }

    pub fn def(&self) -> &Interpolant2dDef {
        &self.def
    }

    /// Evaluate the table at `(x1, x2)`. Extrapolation outside the built
    /// domain is permitted on both axes.
    pub fn interpolate(&self, x1: f64, x2: f64) -> f64 {
        let t1 = if self.def.axis1.log && x1 <= 0.0 {
            self.coords1[0]
        } else {
            self.def.axis1.transform(x1)
        };
        let (start, len) = window(&self.coords1, t1, self.def.order);
        let mut samples = Vec::with_capacity(len);
        for row in &self.rows[start..start + len] {
            samples.push(row.interpolate(x2));
        }
        neville(&self.coords1[start..start + len], &samples, t1)
    }

    /// Solve `interpolate(x1, y) == target` for `y` on the second axis.
    ///
    /// Precondition: the table is monotonically non-decreasing in the
    /// second coordinate at fixed `x1`. Cumulative rate tables satisfy this
    /// by construction. Targets outside the tabulated range clamp to the
    /// corresponding axis bound.
    pub fn find_limit(&self, x1: f64, target: f64) -> f64 {
        let mut lo = self.def.axis2.min;
        let mut hi = self.def.axis2.max;
        if target <= self.interpolate(x1, lo) {
            return lo;
        }
        if target >= self.interpolate(x1, hi) {
            return hi;
        }
        let tolerance = 1e-13 * (hi - lo).abs();
        while hi - lo > tolerance {
            let mid = 0.5 * (lo + hi);
            if self.interpolate(x1, mid) < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

fn store_value(y: f64, log_values: bool) -> f64 {
    if log_values {
        if y > 0.0 {
            y.ln()
        } else {
            LOG_OF_ZERO
        }
    } else {
        y
    }
}

/// Select the window of `order` consecutive nodes centered on `t`,
/// clamped to the table bounds. Queries past either edge keep the edge
/// window, which is what makes extrapolation fall out of the local fit.
fn window(coords: &[f64], t: f64, order: usize) -> (usize, usize) {
    let n = coords.len();
    let len = order.min(n);
    let step = (coords[n - 1] - coords[0]) / (n - 1) as f64;
    let position = ((t - coords[0]) / step).floor() as isize;
    let start = position - (len as isize - 1) / 2;
    let start = start.clamp(0, (n - len) as isize) as usize;
    (start, len)
}

/// Neville polynomial interpolation through the given nodes, evaluated
/// at `x`.
fn neville(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    let mut p = ys.to_vec();
    for m in 1..n {
        for i in 0..(n - m) {
            p[i] = ((x - xs[i + m]) * p[i] - (x - xs[i]) * p[i + 1]) / (xs[i] - xs[i + m]);
        }
    }
    p[0]
}

/// Bulirsch-Stoer rational interpolation. Falls back to the polynomial
/// form if the rational tableau develops a pole at the evaluation point.
fn rational(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    const TINY: f64 = 1e-30;
    let n = xs.len();
    let mut nearest = 0;
    let mut min_dist = (x - xs[0]).abs();
    for i in 1..n {
        let dist = (x - xs[i]).abs();
        if dist < min_dist {
            min_dist = dist;
            nearest = i;
        }
    }
    if min_dist == 0.0 {
        return ys[nearest];
    }
    let mut c = ys.to_vec();
    let mut d: Vec<f64> = ys.iter().map(|y| y + TINY).collect();
    let mut y = ys[nearest];
    let mut ns = nearest as isize - 1;
    for m in 1..n {
        for i in 0..(n - m) {
            let w = c[i + 1] - d[i];
            let h = xs[i + m] - x;
            let t = (xs[i] - x) * d[i] / h;
            let dd = t - c[i + 1];
            if dd == 0.0 {
                return neville(xs, ys, x);
            }
            let dd = w / dd;
            d[i] = c[i + 1] * dd;
            c[i] = t * dd;
        }
        let dy = if 2 * (ns + 1) < (n - m) as isize {
            c[(ns + 1) as usize]
        } else {
            let v = d[ns as usize];
            ns -= 1;
            v
        };
        y += dy;
    }
    y
}
