//! Closed form real-root solvers for quadratic, cubic and quartic polynomials.
//!
//! Coefficients are always given lowest order first, so `coeffs[0]` is the
//! constant term. All internal arithmetic happens in `f64` no matter what
//! precision the caller hands in.

use arrayvec::ArrayVec;

/// Quantities smaller than this are treated as zero before taking square roots.
pub const EQN_EPS: f64 = 1e-9;

/// Leading coefficients below this fraction of the largest coefficient are
/// dropped when [`solve_polynomial`] decides on the degree.
const DEGREE_EPS: f64 = 1e-12;

fn is_zero(x: f64) -> bool {
    x > -EQN_EPS && x < EQN_EPS
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadraticRoots {
    /// Two distinct real roots.
    Distinct(f64, f64),
    /// One repeated real root.
    Double(f64),
    /// A complex conjugate pair `re ± im·i`, with `im > 0`.
    Complex { re: f64, im: f64 },
    /// The quadratic coefficient was zero.
    Degenerate,
}

impl QuadraticRoots {
    pub fn count(&self) -> usize {
        match self {
            QuadraticRoots::Distinct(..) => 2,
            QuadraticRoots::Double(_) => 1,
            QuadraticRoots::Complex { .. } | QuadraticRoots::Degenerate => 0,
        }
    }

    pub fn real(&self) -> ArrayVec<f64, 2> {
        let mut out = ArrayVec::new();
        match *self {
            QuadraticRoots::Distinct(r0, r1) => {
                out.push(r0);
                out.push(r1);
            }
            QuadraticRoots::Double(r) => out.push(r),
            QuadraticRoots::Complex { .. } | QuadraticRoots::Degenerate => {}
        }
        out
    }
}

/// Solves `c[2]·x² + c[1]·x + c[0] = 0`.
///
/// `c[2]` must not be zero.
pub fn solve_quadratic<T: Copy + Into<f64>>(coeffs: &[T; 3]) -> QuadraticRoots {
    let c: f64 = coeffs[0].into();
    let b: f64 = coeffs[1].into();
    let a: f64 = coeffs[2].into();
    debug_assert!(a != 0.0, "quadratic coefficient must be non-zero");
    if a == 0.0 {
        return QuadraticRoots::Degenerate;
    }

    let d = b * b - 4.0 * a * c;
    if d > 0.0 {
        // q never cancels, so both roots keep full precision
        let sqrt_d = d.sqrt();
        let q = -0.5 * (b + if b < 0.0 { -sqrt_d } else { sqrt_d });
        QuadraticRoots::Distinct(q / a, c / q)
    } else if d == 0.0 {
        QuadraticRoots::Double(-b / (2.0 * a))
    } else {
        QuadraticRoots::Complex {
            re: -b / (2.0 * a),
            im: ((-d).sqrt() / (2.0 * a)).abs(),
        }
    }
}

/// Solves `c[3]·x³ + c[2]·x² + c[1]·x + c[0] = 0`.
///
/// Returns three roots (possibly repeated) when the discriminant allows it,
/// one otherwise. `c[3]` must not be zero.
pub fn solve_cubic<T: Copy + Into<f64>>(coeffs: &[T; 4]) -> ArrayVec<f64, 3> {
    let mut x = ArrayVec::new();
    let lead: f64 = coeffs[3].into();
    debug_assert!(lead != 0.0, "cubic coefficient must be non-zero");
    if lead == 0.0 {
        return x;
    }

    let coeff = |i: usize| -> f64 { coeffs[i].into() };
    let a1 = coeff(2) / lead;
    let a2 = coeff(1) / lead;
    let a3 = coeff(0) / lead;

    let q = (a1 * a1 - 3.0 * a2) / 9.0;
    let r = (2.0 * a1 * a1 * a1 - 9.0 * a1 * a2 + 27.0 * a3) / 54.0;
    let q_cubed = q * q * q;
    let d = q_cubed - r * r;

    if d >= 0.0 {
        if q_cubed <= 0.0 {
            // q == r == 0: triple root
            let root = -a1 / 3.0;
            x.push(root);
            x.push(root);
            x.push(root);
            return x;
        }

        let theta = (r / q_cubed.sqrt()).clamp(-1.0, 1.0).acos();
        let sqrt_q = q.sqrt();
        let two_pi = 2.0 * std::f64::consts::PI;
        x.push(-2.0 * sqrt_q * (theta / 3.0).cos() - a1 / 3.0);
        x.push(-2.0 * sqrt_q * ((theta + two_pi) / 3.0).cos() - a1 / 3.0);
        x.push(-2.0 * sqrt_q * ((theta + 2.0 * two_pi) / 3.0).cos() - a1 / 3.0);
    } else {
        let mut e = ((-d).sqrt() + r.abs()).cbrt();
        if r > 0.0 {
            e = -e;
        }
        x.push((e + q / e) - a1 / 3.0);
    }

    x
}

/// Solves `c[4]·x⁴ + c[3]·x³ + c[2]·x² + c[1]·x + c[0] = 0` for its real roots.
///
/// The quartic is depressed to `y⁴ + p·y² + q·y + r = 0`, split into two
/// quadratics through the largest root of its resolvent cubic, and the
/// substitution is undone at the end. Repeated roots are reported once per
/// quadratic factor. `c[4]` must not be zero.
pub fn solve_quartic<T: Copy + Into<f64>>(coeffs: &[T; 5]) -> ArrayVec<f64, 4> {
    let mut s = ArrayVec::<f64, 4>::new();
    let lead: f64 = coeffs[4].into();
    debug_assert!(lead != 0.0, "quartic coefficient must be non-zero");
    if lead == 0.0 {
        return s;
    }

    // normal form: x^4 + Ax^3 + Bx^2 + Cx + D = 0
    let coeff = |i: usize| -> f64 { coeffs[i].into() };
    let div = 1.0 / lead;
    let a = coeff(3) * div;
    let b = coeff(2) * div;
    let c = coeff(1) * div;
    let d = coeff(0) * div;

    // x = y - A/4
    let sq_a = a * a;
    let p = -0.375 * sq_a + b;
    let q = 0.125 * sq_a * a - 0.5 * a * b + c;
    let r = -0.01171875 * sq_a * sq_a + 0.0625 * sq_a * b - 0.25 * a * c + d;

    if is_zero(r) {
        // y(y^3 + py + q) = 0
        s.extend(solve_cubic(&[q, p, 0.0, 1.0]));
        s.push(0.0);
    } else {
        let resolvent = solve_cubic(&[0.5 * r * p - 0.125 * q * q, -r, -0.5 * p, 1.0]);
        if resolvent.is_empty() {
            return s;
        }
        // the largest resolvent root keeps both square-root arguments non-negative
        let z = resolvent.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let mut u = z * z - r;
        let mut v = 2.0 * z - p;

        if is_zero(u) {
            u = 0.0;
        } else if u > 0.0 {
            u = u.sqrt();
        } else {
            return s;
        }

        if is_zero(v) {
            v = 0.0;
        } else if v > 0.0 {
            v = v.sqrt();
        } else {
            return s;
        }

        let v = if q < 0.0 { -v } else { v };
        s.extend(solve_quadratic(&[z - u, v, 1.0]).real());
        s.extend(solve_quadratic(&[z + u, -v, 1.0]).real());
    }

    let sub = 0.25 * a;
    for root in s.iter_mut() {
        *root -= sub;
    }

    s
}

/// Real roots of a polynomial of degree at most four, choosing the solver by
/// the highest coefficient that is not negligible. A constant polynomial has
/// no roots.
pub fn solve_polynomial(coeffs: &[f64; 5]) -> ArrayVec<f64, 4> {
    let scale = coeffs.iter().fold(0.0f64, |m, c| m.max(c.abs()));
    let mut out = ArrayVec::new();
    if scale == 0.0 {
        return out;
    }

    let negligible = |c: f64| c.abs() <= DEGREE_EPS * scale;
    let degree = (0..5).rev().find(|&i| !negligible(coeffs[i])).unwrap_or(0);

    match degree {
        4 => out = solve_quartic(coeffs),
        3 => out.extend(solve_cubic(&[coeffs[0], coeffs[1], coeffs[2], coeffs[3]])),
        2 => out.extend(solve_quadratic(&[coeffs[0], coeffs[1], coeffs[2]]).real()),
        1 => out.push(-coeffs[0] / coeffs[1]),
        _ => {}
    }

    out
}

/// Evaluates the polynomial at `x` with Horner's scheme.
pub fn eval_polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
