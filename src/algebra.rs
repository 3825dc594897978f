//! Pointwise operations over piecewise-linear signals: min/max with exact
//! crossing-point insertion, negation, and sliding-window sup/inf.

use crate::signal::Signal;

/// Decimal places kept when rounding interval horizons, to stop floating
/// point drift from inflating the sliding-window scan.
pub const HORIZON_EPSILON_DECIMALS: i32 = 2;

pub fn et_round(x: f64) -> f64 {
    let scale = 10f64.powi(HORIZON_EPSILON_DECIMALS);
    (x * scale).round() / scale
}

fn merged_times(a: &Signal, b: &Signal) -> Vec<f64> {
    let mut times: Vec<f64> = a.samples().map(|s| s.time).chain(b.samples().map(|s| s.time)).collect();
    times.sort_by(|x, y| x.partial_cmp(y).unwrap());
    times.dedup();
    times
}

/// Pointwise combination of two signals over their shared domain, inserting
/// an exact breakpoint wherever `pick(a(t), b(t))` switches which operand is
/// selected (a sign change of `a(t) - b(t)`).
fn compute_minmax(a: &Signal, b: &Signal, pick: impl Fn(f64, f64) -> f64) -> Signal {
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }
    let begin = a.begin_time().max(b.begin_time());
    let end = a.end_time().min(b.end_time());
    let mut out = Signal::empty();
    if end < begin {
        return out;
    }

    let times = merged_times(a, b);
    let mut prev_t: Option<f64> = None;
    let mut prev_diff: Option<f64> = None;

    for &t in times.iter() {
        if t < begin || t > end {
            continue;
        }
        let av = a.value_at(t);
        let bv = b.value_at(t);
        let diff = av - bv;

        if let (Some(pt), Some(pd)) = (prev_t, prev_diff) {
            if pd.is_finite() && diff.is_finite() && pd != 0.0 && diff != 0.0 && pd.signum() != diff.signum() {
                // Linear interpolation of the zero-crossing of (a - b)
                // between the previous and current sample times.
                let frac = pd / (pd - diff);
                let cross_t = pt + frac * (t - pt);
                let cross_v = a.value_at(cross_t);
                out.append_sample(cross_t, pick(cross_v, cross_v));
            }
        }

        out.append_sample(t, pick(av, bv));
        prev_t = Some(t);
        prev_diff = Some(diff);
    }

    out
}

pub fn compute_and(a: &Signal, b: &Signal) -> Signal {
    compute_minmax(a, b, f64::min)
}

pub fn compute_or(a: &Signal, b: &Signal) -> Signal {
    compute_minmax(a, b, f64::max)
}

/// Negation: relies on `f64` negation handling `+/-infinity` natively.
pub fn compute_not(a: &Signal) -> Signal {
    let mut out = Signal::empty();
    for s in a.samples() {
        out.append_sample_with_derivative(s.time, -s.value, -s.derivative);
    }
    out
}

enum WindowKind {
    Eventually,
    Always,
}

/// Breakpoint-based sliding-window sup (Eventually) / inf (Always) over
/// `[t + a, t + b]`, re-evaluated at every breakpoint of the input signal
/// inside the window. This is the straightforward O(n*w) approach; the
/// O(n) monotonic-deque algorithm is a performance optimisation left to
/// callers who need it.
fn window_extremum(sig: &Signal, a: f64, b: f64, kind: WindowKind) -> Signal {
    if sig.is_empty() {
        return Signal::empty();
    }
    let mut out = Signal::empty();
    let domain_end = sig.end_time() - a;
    let mut t = sig.begin_time() - a.min(0.0);
    t = t.max(sig.begin_time());

    let mut candidate_times: Vec<f64> = sig.samples().map(|s| s.time - a).chain(sig.samples().map(|s| s.time - b)).collect();
    candidate_times.retain(|&x| x >= sig.begin_time() - a && x <= domain_end);
    candidate_times.push(t);
    candidate_times.push(domain_end);
    candidate_times.sort_by(|x, y| x.partial_cmp(y).unwrap());
    candidate_times.dedup();

    for &ct in candidate_times.iter() {
        let win_lo = ct + a;
        let win_hi = ct + b;
        if win_hi > sig.end_time() + 1e-9 {
            continue;
        }
        let mut extremum = match kind {
            WindowKind::Eventually => f64::NEG_INFINITY,
            WindowKind::Always => f64::INFINITY,
        };
        let mut saw_any = false;
        for s in sig.samples() {
            if s.time >= win_lo - 1e-12 && s.time <= win_hi + 1e-12 {
                saw_any = true;
                extremum = match kind {
                    WindowKind::Eventually => extremum.max(s.value),
                    WindowKind::Always => extremum.min(s.value),
                };
            }
        }
        if !saw_any {
            extremum = sig.value_at(win_lo);
        } else {
            extremum = match kind {
                WindowKind::Eventually => extremum.max(sig.value_at(win_lo)).max(sig.value_at(win_hi)),
                WindowKind::Always => extremum.min(sig.value_at(win_lo)).min(sig.value_at(win_hi)),
            };
        }
        out.append_sample(ct, extremum);
    }

    out
}

pub fn compute_timed_eventually(sig: &Signal, a: f64, b: f64) -> Signal {
    window_extremum(sig, a, b, WindowKind::Eventually)
}

pub fn compute_timed_globally(sig: &Signal, a: f64, b: f64) -> Signal {
    window_extremum(sig, a, b, WindowKind::Always)
}
