//! Bracketing scalar root finders.

use crate::error::{PfError, PfResult};
use crate::numeric::ensure_finite;

/// Outcome of a bracketing solve.
#[derive(Clone, Copy, Debug)]
pub struct Root {
    pub x: f64,
    pub fx: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Bisection configuration.
#[derive(Clone, Copy, Debug)]
pub struct BisectConfig {
    pub max_iterations: usize,
    /// Stop once |f(x)| falls below this.
    pub f_tol: f64,
}

/// Bisection on `[a, b]`.
///
/// The bracket must straddle a sign change. When the iteration cap is hit the
/// best midpoint is returned with `converged = false`.
pub fn bisect<F>(what: &'static str, mut f: F, a: f64, b: f64, cfg: BisectConfig) -> PfResult<Root>
where
    F: FnMut(f64) -> PfResult<f64>,
{
    let (mut lo, mut hi) = (a.min(b), a.max(b));
    let mut f_lo = ensure_finite(f(lo)?, what)?;
    let f_hi = ensure_finite(f(hi)?, what)?;

    if f_lo.abs() <= cfg.f_tol {
        return Ok(Root { x: lo, fx: f_lo, iterations: 0, converged: true });
    }
    if f_hi.abs() <= cfg.f_tol {
        return Ok(Root { x: hi, fx: f_hi, iterations: 0, converged: true });
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(PfError::NotBracketed { what, fa: f_lo, fb: f_hi });
    }

    let mut mid = 0.5 * (lo + hi);
    let mut f_mid = f_lo;
    for iter in 1..=cfg.max_iterations {
        mid = 0.5 * (lo + hi);
        f_mid = ensure_finite(f(mid)?, what)?;
        if f_mid.abs() <= cfg.f_tol {
            return Ok(Root { x: mid, fx: f_mid, iterations: iter, converged: true });
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Ok(Root {
        x: mid,
        fx: f_mid,
        iterations: cfg.max_iterations,
        converged: false,
    })
}

/// Brent's method on `[a, b]`, converging to `xtol` in x.
pub fn brent<F>(
    what: &'static str,
    mut f: F,
    a: f64,
    b: f64,
    xtol: f64,
    max_iterations: usize,
) -> PfResult<Root>
where
    F: FnMut(f64) -> PfResult<f64>,
{
    let (mut a, mut b) = (a, b);
    let mut fa = ensure_finite(f(a)?, what)?;
    let mut fb = ensure_finite(f(b)?, what)?;

    if fa == 0.0 {
        return Ok(Root { x: a, fx: fa, iterations: 0, converged: true });
    }
    if fb == 0.0 {
        return Ok(Root { x: b, fx: fb, iterations: 0, converged: true });
    }
    if fa.signum() == fb.signum() {
        return Err(PfError::NotBracketed { what, fa, fb });
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for iter in 1..=max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * xtol;
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 {
            return Ok(Root { x: b, fx: fb, iterations: iter, converged: true });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            // inverse quadratic interpolation, secant when a == c
            let s = fb / fa;
            let mut p;
            let mut q;
            if a == c {
                p = 2.0 * m * s;
                q = 1.0 - s;
            } else {
                let qa = fa / fc;
                let r = fb / fc;
                p = s * (2.0 * m * qa * (qa - r) - (b - a) * (r - 1.0));
                q = (qa - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        } else {
            d = m;
            e = m;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(m) };
        fb = ensure_finite(f(b)?, what)?;
    }

    Err(PfError::ConvergenceFailed {
        what,
        iterations: max_iterations,
    })
}
