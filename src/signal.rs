//! Piecewise-linear signals: the data structure every transducer node reads
//! and writes during evaluation.

use std::collections::VecDeque;

/// Sentinel standing in for +infinity, used as the default upper-bound fill.
pub const TOP: f64 = f64::INFINITY;
/// Sentinel standing in for -infinity, used as the default lower-bound fill.
pub const BOTTOM: f64 = f64::NEG_INFINITY;

const RESIZE_EPSILON: f64 = 1e-14;

/// A breakpoint of a piecewise-linear function: between this sample and the
/// next, the value advances linearly at `derivative`. The last sample of a
/// signal always has `derivative == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
    pub derivative: f64,
}

impl Sample {
    pub fn value_at(&self, t: f64) -> f64 {
        self.value + self.derivative * (t - self.time)
    }
}

/// An ordered sequence of [`Sample`]s spanning `[begin_time, end_time]`.
///
/// Sample times are strictly increasing. An empty signal has
/// `begin_time == end_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    begin_time: f64,
    end_time: f64,
    samples: VecDeque<Sample>,
}

impl Signal {
    pub fn empty() -> Self {
        Signal { begin_time: 0.0, end_time: 0.0, samples: VecDeque::new() }
    }

    /// A single-sample signal, as used for TOP/BOTTOM default fills.
    pub fn single(t: f64, v: f64) -> Self {
        let mut sig = Signal::empty();
        sig.samples.push_back(Sample { time: t, value: v, derivative: 0.0 });
        sig.begin_time = t;
        sig.end_time = t;
        sig
    }

    /// Build a piecewise-linear signal from parallel time/value arrays,
    /// assumed strictly monotone in time.
    pub fn from_arrays(times: &[f64], values: &[f64]) -> Self {
        assert_eq!(times.len(), values.len(), "from_arrays: mismatched lengths");
        let mut sig = Signal::empty();
        if times.is_empty() {
            return sig;
        }
        for i in 0..times.len() {
            let derivative = if i + 1 < times.len() {
                (values[i + 1] - values[i]) / (times[i + 1] - times[i])
            } else {
                0.0
            };
            sig.samples.push_back(Sample { time: times[i], value: values[i], derivative });
        }
        sig.begin_time = times[0];
        sig.end_time = *times.last().unwrap();
        sig
    }

    pub fn begin_time(&self) -> f64 {
        self.begin_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Value of the first sample, or `default` if the signal is empty. This is
    /// the scalar every transducer evaluator returns to its caller.
    pub fn front_value(&self, default: f64) -> f64 {
        self.samples.front().map(|s| s.value).unwrap_or(default)
    }

    /// Clears the signal and pins both endpoints at `t`, as a prelude to
    /// building a fresh result in place (used by the atomic predicate).
    pub fn reset_to(&mut self, t: f64) {
        self.samples.clear();
        self.begin_time = t;
        self.end_time = t;
    }

    /// If the signal ended up empty after an evaluation step, pin it to a
    /// single default sample at `begin_time`. Every transducer output must
    /// leave its signal non-empty (see the node contract).
    pub fn ensure_nonempty(&mut self, default: f64) {
        if self.samples.is_empty() {
            self.samples.push_back(Sample { time: self.begin_time, value: default, derivative: 0.0 });
            self.end_time = self.begin_time;
        }
    }

    pub fn append_sample(&mut self, t: f64, v: f64) {
        self.append_sample_with_derivative(t, v, 0.0);
    }

    /// Appends `(t, v, d)`. A no-op if `t <= end_time` and the signal is
    /// already non-empty; the previous last sample's derivative is corrected
    /// to connect it to the new point.
    pub fn append_sample_with_derivative(&mut self, t: f64, v: f64, d: f64) {
        if self.samples.is_empty() {
            self.samples.push_back(Sample { time: t, value: v, derivative: d });
            self.begin_time = t;
            self.end_time = t;
            return;
        }
        if t <= self.end_time {
            return;
        }
        {
            let prev = self.samples.back_mut().unwrap();
            prev.derivative = (v - prev.value) / (t - prev.time);
        }
        self.samples.push_back(Sample { time: t, value: v, derivative: d });
        self.end_time = t;
    }

    pub fn append_signal(&mut self, other: &Signal) {
        for s in other.samples.iter() {
            self.append_sample_with_derivative(s.time, s.value, s.derivative);
        }
    }

    /// Trims/extends the signal to span exactly `[s, t]`, filling any new
    /// territory with `v`. See the data model notes for the exact front/back
    /// rules; this mirrors the source algorithm rather than reinventing it.
    pub fn resize(&mut self, s: f64, t: f64, v: f64) {
        if t < s - RESIZE_EPSILON {
            self.samples.clear();
            self.begin_time = 0.0;
            self.end_time = 0.0;
            return;
        }
        let t = t.max(s);

        if self.begin_time > s {
            let front_value = self.samples.front().map(|f| f.value).unwrap_or(v);
            self.samples.push_front(Sample { time: s, value: front_value, derivative: 0.0 });
        } else {
            let mut dropped_last: Option<Sample> = None;
            while let Some(front) = self.samples.front().copied() {
                if front.time < s {
                    dropped_last = self.samples.pop_front();
                } else {
                    break;
                }
            }
            if self.samples.is_empty() {
                if let Some(first) = dropped_last {
                    let value = first.value_at(s);
                    self.samples.push_back(Sample { time: s, value, derivative: 0.0 });
                    self.end_time = self.end_time.max(s);
                }
            } else if let Some(first) = dropped_last {
                let head_time = self.samples.front().unwrap().time;
                if head_time > s {
                    let value = first.value_at(s);
                    self.samples.push_front(Sample { time: s, value, derivative: first.derivative });
                }
            }
        }

        if self.end_time < t {
            let needs_extension = !self
                .samples
                .back()
                .map(|b| b.value == v && b.derivative == 0.0)
                .unwrap_or(false);
            if needs_extension {
                match self.samples.back_mut() {
                    Some(back) if back.time == self.end_time => {
                        back.value = v;
                        back.derivative = 0.0;
                    }
                    _ => self.samples.push_back(Sample { time: self.end_time, value: v, derivative: 0.0 }),
                }
            }
        } else {
            while let Some(back) = self.samples.back() {
                if back.time > t {
                    self.samples.pop_back();
                } else {
                    break;
                }
            }
        }

        if self.samples.is_empty() {
            self.samples.push_back(Sample { time: s, value: v, derivative: 0.0 });
        }
        self.begin_time = s;
        self.end_time = t;
    }

    pub fn shift(&mut self, a: f64) {
        self.begin_time += a;
        self.end_time += a;
        for s in self.samples.iter_mut() {
            s.time += a;
        }
    }

    /// Drops trailing samples whose value or derivative is a TOP/BOTTOM sentinel.
    pub fn remove_inf(&mut self) {
        while let Some(back) = self.samples.back() {
            let is_inf = |x: f64| x == TOP || x == BOTTOM;
            if is_inf(back.value) || is_inf(back.derivative) {
                self.samples.pop_back();
            } else {
                break;
            }
        }
        self.end_time = self.samples.back().map(|s| s.time).unwrap_or(self.begin_time);
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.end_time = self.begin_time;
    }

    /// Left-neighbour lookup, *not* interpolation: returns the value of the
    /// exact sample at `t` if one exists, else the last sample strictly
    /// before `t`, else the `dir`-appropriate default (TOP for +1, BOTTOM for
    /// -1, 0.0 otherwise).
    pub fn get_value(&self, t: f64, dir: i32) -> f64 {
        let mut prev: Option<f64> = None;
        for s in self.samples.iter() {
            if s.time == t {
                return s.value;
            }
            if s.time > t {
                return prev.unwrap_or(default_for_dir(dir));
            }
            prev = Some(s.value);
        }
        default_for_dir(dir)
    }

    /// Extends the signal so its last sample sits exactly at `end_time`
    /// (only the tail extension is active; front-pruning is intentionally
    /// unimplemented, see DESIGN.md).
    pub fn simplify(&mut self) {
        if let Some(back) = self.samples.back().copied() {
            if back.time < self.end_time {
                let value = back.value_at(self.end_time);
                self.samples.push_back(Sample { time: self.end_time, value, derivative: 0.0 });
            }
        }
    }

    /// Interpolating evaluation used internally by the signal algebra. This
    /// is deliberately distinct from [`Signal::get_value`], which performs a
    /// non-interpolating left-neighbour lookup for atomic predicates.
    pub(crate) fn value_at(&self, t: f64) -> f64 {
        let Some(front) = self.samples.front() else {
            return 0.0;
        };
        if t <= front.time {
            return front.value;
        }
        let mut prev = *front;
        for s in self.samples.iter().skip(1) {
            if s.time >= t {
                return prev.value_at(t);
            }
            prev = *s;
        }
        prev.value_at(t)
    }
}

fn default_for_dir(dir: i32) -> f64 {
    match dir {
        1 => TOP,
        -1 => BOTTOM,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_after_end_time_is_noop() {
        let mut sig = Signal::empty();
        sig.append_sample(0.0, 1.0);
        sig.append_sample(1.0, 2.0);
        sig.append_sample(0.5, 99.0);
        assert_eq!(sig.end_time(), 1.0);
        assert_eq!(sig.front_value(0.0), 1.0);
    }

    #[test]
    fn first_append_sets_both_endpoints() {
        let mut sig = Signal::empty();
        sig.append_sample(3.0, 7.0);
        assert_eq!(sig.begin_time(), 3.0);
        assert_eq!(sig.end_time(), 3.0);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut sig = Signal::from_arrays(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        sig.resize(0.5, 1.5, 0.0);
        let once = sig.clone();
        sig.resize(0.5, 1.5, 0.0);
        assert_eq!(sig, once);
    }

    #[test]
    fn shift_composes() {
        let mut a = Signal::from_arrays(&[0.0, 1.0], &[1.0, 2.0]);
        let mut b = a.clone();
        a.shift(1.0);
        a.shift(2.0);
        b.shift(3.0);
        assert_eq!(a, b);
    }

    #[test]
    fn simplify_extends_to_end_time() {
        let mut sig = Signal::from_arrays(&[0.0, 1.0], &[1.0, 2.0]);
        sig.resize(0.0, 3.0, 2.0);
        sig.simplify();
        assert_eq!(sig.end_time(), 3.0);
        assert_eq!(sig.samples().last().unwrap().time, 3.0);
    }

    #[test]
    fn degenerate_resize_clears_signal() {
        let mut sig = Signal::from_arrays(&[0.0, 1.0], &[1.0, 2.0]);
        sig.resize(5.0, 3.0, 0.0);
        assert!(sig.is_empty());
        assert_eq!(sig.begin_time(), 0.0);
        assert_eq!(sig.end_time(), 0.0);
    }

    #[test]
    fn get_value_is_left_neighbour_not_interpolated() {
        let sig = Signal::from_arrays(&[0.0, 2.0], &[0.0, 10.0]);
        // A true interpolation at t=1 would return 5.0; get_value must not.
        assert_eq!(sig.get_value(1.0, 0), 0.0);
        assert_eq!(sig.get_value(0.0, 0), 0.0);
        assert_eq!(sig.get_value(2.0, 0), 10.0);
    }

    #[test]
    fn get_value_defaults_beyond_signal() {
        let sig = Signal::from_arrays(&[0.0, 1.0], &[0.0, 1.0]);
        assert_eq!(sig.get_value(5.0, 1), TOP);
        assert_eq!(sig.get_value(5.0, -1), BOTTOM);
        assert_eq!(sig.get_value(-5.0, 1), TOP);
    }

    #[test]
    fn remove_inf_drops_sentinel_tail() {
        let mut sig = Signal::from_arrays(&[0.0, 1.0], &[1.0, 2.0]);
        sig.append_sample(2.0, TOP);
        sig.remove_inf();
        assert_eq!(sig.end_time(), 1.0);
    }
}
