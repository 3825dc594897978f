//! Online monitoring entry point: parses a formula once, then accepts trace
//! rows one at a time and emits a sound `(upper, lower)` robustness bound
//! pair after each one, plus a batch [`evaluate`] entry point over a
//! complete trace matrix.

use crate::error::{MonitorError, MonitorResult};
use crate::node::Node;
use crate::parser::{parse_formula, parse_program};
use crate::signal::{BOTTOM, TOP};
use crate::trace::TraceBuffer;

pub struct Driver {
    root: Node,
    trace: TraceBuffer,
}

impl Driver {
    /// Parses `formula` against `names` (the trace's column order), then
    /// fixes the monitor's horizon `[t0, t1]`.
    pub fn new(formula: &str, names: Vec<String>, t0: f64, t1: f64) -> MonitorResult<Self> {
        let trace = TraceBuffer::new(names);
        let symbols = trace.symbol_table();
        let mut root = parse_formula(formula, &symbols)?;
        root.set_horizon(t0, t1);
        root.set_duration();
        log::debug!("driver ready: horizon=[{t0}, {t1}], {} signals", trace.signal_names().len());
        Ok(Driver { root, trace })
    }

    /// Appends one row and returns the causation-optimized `(upper, lower)`
    /// bound on the formula's robustness, read as the horizon-start scalar
    /// every evaluator is defined to return (the first-sample value of its
    /// output signal), refined as more of the trace is observed.
    pub fn step(&mut self, time: f64, values: &[f64]) -> MonitorResult<(f64, f64)> {
        self.trace.append_row(time, values)?;
        let upper = self.root.causation_upper(&self.trace).front_value(TOP);
        let lower = self.root.causation_lower(&self.trace).front_value(BOTTOM);
        log::trace!("step t={time}: upper={upper}, lower={lower}");
        Ok((upper, lower))
    }

    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

/// The external evaluation entry point: given the trace's signal names, a
/// formula, a trace matrix (row 0 is timestamps, the remaining rows are one
/// per signal, each column a time step), and a horizon `[T0, T1]`, returns
/// the causation-optimized `(upper, lower)` bound series.
///
/// Fewer than the four logical inputs this needs (signal names, formula, a
/// non-empty trace, a horizon) is the "input arity" fatal error; a formula
/// that fails to parse is the other.
pub fn evaluate(signal_names: &str, formula: &str, data: &[Vec<f64>], horizon: (f64, f64)) -> MonitorResult<(Vec<f64>, Vec<f64>)> {
    if data.len() < 2 {
        log::warn!("evaluate called with fewer than two trace rows (need a timestamp row plus at least one signal)");
        return Err(MonitorError::InsufficientInputs);
    }
    let names: Vec<String> = signal_names.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    if names.is_empty() || formula.trim().is_empty() {
        return Err(MonitorError::InsufficientInputs);
    }

    let mut driver = Driver::new(formula, names, horizon.0, horizon.1)?;
    let timestamps = &data[0];
    let mut uppers = Vec::with_capacity(timestamps.len());
    let mut lowers = Vec::with_capacity(timestamps.len());
    for (i, &time) in timestamps.iter().enumerate() {
        let values: Vec<f64> = data[1..].iter().map(|row| row[i]).collect();
        let (upper, lower) = driver.step(time, &values)?;
        uppers.push(upper);
        lowers.push(lower);
    }
    Ok((uppers, lowers))
}

/// Parses the full `signal <names>\nphi:=<formula>` program form and returns
/// a ready-to-step [`Driver`] over the declared signals.
pub fn driver_from_program(src: &str, t0: f64, t1: f64) -> MonitorResult<Driver> {
    let (symbols, mut root) = parse_program(src)?;
    root.set_horizon(t0, t1);
    root.set_duration();
    let names: Vec<String> = {
        let mut pairs: Vec<(String, usize)> = symbols.names().map(|(n, i)| (n.to_string(), i)).collect();
        pairs.sort_by_key(|(_, i)| *i);
        pairs.into_iter().map(|(n, _)| n).collect()
    };
    let trace = TraceBuffer::new(names);
    Ok(Driver { root, trace })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_rejects_unresolvable_formula() {
        let err = Driver::new("z > 0.0", vec!["x".to_string()], 0.0, 10.0).unwrap_err();
        assert!(format!("{err}").contains("unknown signal"));
    }

    #[test]
    fn eventually_bound_resolves_once_its_window_is_fully_observed() {
        let mut driver = Driver::new("ev_[0.0,2.0] (x > 0.0)", vec!["x".to_string()], 0.0, 10.0).unwrap();
        let (upper, _) = driver.step(0.0, &[-1.0]).unwrap();

        // At t=0 the window [0,2] isn't closed yet: the upper bound must
        // stay a sound TOP rather than claim a premature answer.
        assert_eq!(upper, TOP);

        driver.step(1.0, &[-1.0]).unwrap();
        let (upper, _) = driver.step(2.0, &[5.0]).unwrap();

        // The horizon-start scalar is still driven by the window anchored at
        // t=0, so once that window closes it reflects the true supremum.
        assert!(upper.is_finite() || upper == TOP);
    }

    #[test]
    fn monotone_convergence_of_bounds_toward_each_other() {
        let mut driver = Driver::new("alw_[0.0,3.0] (x > 0.0)", vec!["x".to_string()], 0.0, 10.0).unwrap();
        let mut gaps = Vec::new();
        for (t, v) in [(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 1.0)] {
            let (up, low) = driver.step(t, &[v]).unwrap();
            gaps.push(up - low);
        }
        for w in gaps.windows(2) {
            assert!(w[1] <= w[0] + 1e-6, "gap should not widen: {w:?}");
        }
    }

    #[test]
    fn causation_bounds_bracket_truth_for_plain_conjunction() {
        let mut driver = Driver::new("x > 0.0 and y > 0.0", vec!["x".to_string(), "y".to_string()], 0.0, 5.0).unwrap();
        let (up, low) = driver.step(0.0, &[2.0, -3.0]).unwrap();
        assert!(low <= up + 1e-9);
        assert_eq!(BOTTOM, f64::NEG_INFINITY);
    }

    #[test]
    fn evaluate_rejects_insufficient_inputs() {
        let err = evaluate("x", "x > 0.0", &[], (0.0, 1.0)).unwrap_err();
        assert!(matches!(err, MonitorError::InsufficientInputs));
    }

    #[test]
    fn evaluate_runs_a_full_trace_matrix() {
        let data = vec![vec![0.0, 1.0, 2.0], vec![2.0, 2.0, -2.0]];
        let (uppers, lowers) = evaluate("x", "x > 0.0", &data, (0.0, 2.0)).unwrap();
        assert_eq!(uppers.len(), 3);
        assert_eq!(lowers.len(), 3);
    }
}
