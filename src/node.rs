//! The transducer tree: a tagged-variant [`Node`] enum carrying one evaluator
//! per STL connective, each producing a baseline robustness bound and a
//! tighter causation-optimized bound.

use crate::algebra::{compute_and, compute_not, compute_or, compute_timed_eventually, compute_timed_globally, et_round};
use crate::signal::{Signal, BOTTOM, TOP};
use crate::trace::TraceBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    LessThan,
    GreaterThan,
}

/// The right-hand side of an atomic predicate: either a literal threshold or
/// a reference to another trace column.
#[derive(Debug, Clone, Copy)]
pub enum ValueExpr {
    Const(f64),
    Signal(usize),
}

/// A transducer tree node. Atoms are the base case; every other variant
/// combines the bounds of its children rather than touching the trace
/// directly.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Atom { column: usize, comparator: Comparator, rhs: ValueExpr },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Eventually { a: f64, b: f64, child: Box<Node> },
    Always { a: f64, b: f64, child: Box<Node> },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    start_time: f64,
    end_time: f64,
}

impl Node {
    pub fn atom(column: usize, comparator: Comparator, rhs: ValueExpr) -> Self {
        Node { kind: NodeKind::Atom { column, comparator, rhs }, start_time: 0.0, end_time: 0.0 }
    }

    pub fn and(lhs: Node, rhs: Node) -> Self {
        Node { kind: NodeKind::And(Box::new(lhs), Box::new(rhs)), start_time: 0.0, end_time: 0.0 }
    }

    pub fn or(lhs: Node, rhs: Node) -> Self {
        Node { kind: NodeKind::Or(Box::new(lhs), Box::new(rhs)), start_time: 0.0, end_time: 0.0 }
    }

    pub fn not(child: Node) -> Self {
        Node { kind: NodeKind::Not(Box::new(child)), start_time: 0.0, end_time: 0.0 }
    }

    pub fn eventually(a: f64, b: f64, child: Node) -> Self {
        Node { kind: NodeKind::Eventually { a, b, child: Box::new(child) }, start_time: 0.0, end_time: 0.0 }
    }

    pub fn always(a: f64, b: f64, child: Node) -> Self {
        Node { kind: NodeKind::Always { a, b, child: Box::new(child) }, start_time: 0.0, end_time: 0.0 }
    }

    /// Sets the monitoring horizon `[t0, t1]` on this node and every
    /// descendant; all nodes in the tree share the same horizon.
    pub fn set_horizon(&mut self, t0: f64, t1: f64) {
        self.start_time = t0;
        self.end_time = t1;
        match &mut self.kind {
            NodeKind::Atom { .. } => {}
            NodeKind::And(l, r) | NodeKind::Or(l, r) => {
                l.set_horizon(t0, t1);
                r.set_horizon(t0, t1);
            }
            NodeKind::Not(c) => c.set_horizon(t0, t1),
            NodeKind::Eventually { child, .. } | NodeKind::Always { child, .. } => child.set_horizon(t0, t1),
        }
    }

    /// Part of the node contract (set_horizon / set_duration / attach trace
    /// before the first step). With `start_time`/`end_time` fixed directly
    /// by `set_horizon`, there is no further per-node state this derives;
    /// the recursive call exists so the whole tree stays reachable from the
    /// root the way the driver contract expects.
    pub fn set_duration(&mut self) {
        match &mut self.kind {
            NodeKind::Atom { .. } => {}
            NodeKind::And(l, r) | NodeKind::Or(l, r) => {
                l.set_duration();
                r.set_duration();
            }
            NodeKind::Not(c) => c.set_duration(),
            NodeKind::Eventually { child, .. } | NodeKind::Always { child, .. } => child.set_duration(),
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Builds the atom's output signal for one polarity (`default` is `TOP`
    /// for an upper-style evaluator, `BOTTOM` for a lower-style one). The
    /// three cases of §4.D: no data yet, data beyond the horizon, and data
    /// landing inside it.
    fn atom_signal(&self, trace: &TraceBuffer, column: usize, comparator: Comparator, rhs: ValueExpr, default: f64) -> Signal {
        let mut sig = Signal::empty();
        let n = trace.num_rows();
        if n == 0 {
            sig.append_sample(self.start_time, default);
            return sig;
        }
        let times = trace.times();
        let b = times[n - 1];

        if b < self.start_time {
            sig.append_sample(self.start_time, default);
        } else if b > self.end_time {
            sig.append_sample(self.start_time, default);
            sig.append_sample(self.end_time, default);
        } else {
            sig.append_sample(self.start_time, default);
            if n > 2 {
                sig.append_sample(times[n - 2], default);
            }
            let v_l = trace.column(column)[n - 1];
            let v_r = match rhs {
                ValueExpr::Const(c) => c,
                ValueExpr::Signal(idx) => trace.column(idx)[n - 1],
            };
            let value = match comparator {
                Comparator::LessThan => v_r - v_l,
                Comparator::GreaterThan => v_l - v_r,
            };
            sig.append_sample(b, value);
        }
        sig
    }

    pub fn robustness_upper(&self, trace: &TraceBuffer) -> Signal {
        match &self.kind {
            NodeKind::Atom { column, comparator, rhs } => self.atom_signal(trace, *column, *comparator, *rhs, TOP),
            NodeKind::And(l, r) => compute_and(&l.robustness_upper(trace), &r.robustness_upper(trace)),
            NodeKind::Or(l, r) => compute_or(&l.robustness_upper(trace), &r.robustness_upper(trace)),
            NodeKind::Not(c) => {
                let lower = c.robustness_lower(trace);
                if lower.is_empty() {
                    Signal::single(self.start_time, TOP)
                } else {
                    compute_not(&lower)
                }
            }
            NodeKind::Eventually { a, b, child } => {
                let mut out = compute_timed_eventually(&child.robustness_upper(trace), *a, *b);
                out.ensure_nonempty(TOP);
                out
            }
            NodeKind::Always { a, b, child } => {
                let mut out = compute_timed_globally(&child.robustness_upper(trace), *a, *b);
                out.ensure_nonempty(TOP);
                out
            }
        }
    }

    pub fn robustness_lower(&self, trace: &TraceBuffer) -> Signal {
        match &self.kind {
            NodeKind::Atom { column, comparator, rhs } => self.atom_signal(trace, *column, *comparator, *rhs, BOTTOM),
            NodeKind::And(l, r) => compute_and(&l.robustness_lower(trace), &r.robustness_lower(trace)),
            NodeKind::Or(l, r) => compute_or(&l.robustness_lower(trace), &r.robustness_lower(trace)),
            NodeKind::Not(c) => {
                let upper = c.robustness_upper(trace);
                if upper.is_empty() {
                    Signal::single(self.start_time, BOTTOM)
                } else {
                    compute_not(&upper)
                }
            }
            NodeKind::Eventually { a, b, child } => {
                let mut out = compute_timed_eventually(&child.robustness_lower(trace), *a, *b);
                out.ensure_nonempty(BOTTOM);
                out
            }
            NodeKind::Always { a, b, child } => {
                let mut out = compute_timed_globally(&child.robustness_lower(trace), *a, *b);
                out.ensure_nonempty(BOTTOM);
                out
            }
        }
    }

    /// A causation-optimized upper bound: always `<=` [`Node::robustness_upper`]
    /// pointwise over the domain both are defined on. Atoms have no separate
    /// causation signal (see §4.D): the base case is that causation equals
    /// the plain robustness bound.
    pub fn causation_upper(&self, trace: &TraceBuffer) -> Signal {
        match &self.kind {
            NodeKind::Atom { .. } => self.robustness_upper(trace),
            NodeKind::And(l, r) => {
                let mut cau_up = compute_and(&l.causation_upper(trace), &r.causation_upper(trace));
                let end = cau_up.end_time();
                cau_up.resize(self.start_time, end, TOP);
                cau_up.ensure_nonempty(TOP);
                cau_up
            }
            NodeKind::Or(l, r) => {
                let (u_l, u_r) = (l.causation_upper(trace), r.causation_upper(trace));
                let (z_u_l, z_u_r) = (l.robustness_upper(trace), r.robustness_upper(trace));

                let mut cau_up_l = compute_or(&u_l, &z_u_r);
                let end_l = u_l.end_time().min(z_u_r.end_time());
                cau_up_l.resize(self.start_time, end_l, TOP);

                let mut cau_up_r = compute_or(&z_u_l, &u_r);
                let end_r = z_u_l.end_time().min(u_r.end_time());
                cau_up_r.resize(self.start_time, end_r, TOP);

                let mut cau_up = compute_and(&cau_up_l, &cau_up_r);
                let end = cau_up.end_time();
                cau_up.resize(self.start_time, end, TOP);
                cau_up.ensure_nonempty(TOP);
                cau_up
            }
            NodeKind::Not(c) => {
                let lower = c.causation_lower(trace);
                if lower.is_empty() {
                    Signal::single(self.start_time, TOP)
                } else {
                    compute_not(&lower)
                }
            }
            NodeKind::Eventually { a, b, child } => {
                let cau_m = self.temporal_leg_discounted(&child.causation_upper(trace), *a, *b, compute_timed_globally, TOP);
                let z_m = self.temporal_leg_plain(&child.robustness_upper(trace), *a, *b, compute_timed_eventually, TOP);
                let mut out = compute_or(&cau_m, &z_m);
                let end = cau_m.end_time().min(z_m.end_time());
                out.resize(self.start_time, end, TOP);
                out.ensure_nonempty(TOP);
                out
            }
            NodeKind::Always { a, b, child } => {
                let child_cau_up = child.causation_upper(trace);
                if child_cau_up.end_time() < *a {
                    return Signal::single(self.start_time, TOP);
                }
                let mut m = compute_timed_globally(&child_cau_up, *a, *b);
                let target_end = (et_round(m.end_time().min(self.end_time))).max(self.start_time);
                m.resize(self.start_time, target_end, 0.0);
                m
            }
        }
    }

    /// Dual of [`Node::causation_upper`]: always `>=` [`Node::robustness_lower`].
    pub fn causation_lower(&self, trace: &TraceBuffer) -> Signal {
        match &self.kind {
            NodeKind::Atom { .. } => self.robustness_lower(trace),
            NodeKind::And(l, r) => {
                let (l_low, r_low) = (l.causation_lower(trace), r.causation_lower(trace));
                let (z_l_low, z_r_low) = (l.robustness_lower(trace), r.robustness_lower(trace));

                let mut cau_low_l = compute_and(&l_low, &z_r_low);
                let end_l = l_low.end_time().min(z_r_low.end_time());
                cau_low_l.resize(self.start_time, end_l, BOTTOM);

                let mut cau_low_r = compute_and(&z_l_low, &r_low);
                let end_r = z_l_low.end_time().min(r_low.end_time());
                cau_low_r.resize(self.start_time, end_r, BOTTOM);

                let mut cau_low = compute_or(&cau_low_l, &cau_low_r);
                let end = cau_low.end_time();
                cau_low.resize(self.start_time, end, BOTTOM);
                cau_low.ensure_nonempty(BOTTOM);
                cau_low
            }
            NodeKind::Or(l, r) => {
                let mut cau_low = compute_or(&l.causation_lower(trace), &r.causation_lower(trace));
                let end = cau_low.end_time();
                cau_low.resize(self.start_time, end, BOTTOM);
                cau_low.ensure_nonempty(BOTTOM);
                cau_low
            }
            NodeKind::Not(c) => {
                let upper = c.causation_upper(trace);
                if upper.is_empty() {
                    Signal::single(self.start_time, BOTTOM)
                } else {
                    compute_not(&upper)
                }
            }
            NodeKind::Eventually { a, b, child } => {
                let child_cau_low = child.causation_lower(trace);
                if child_cau_low.end_time() < *a {
                    return Signal::single(self.start_time, BOTTOM);
                }
                let mut m = compute_timed_eventually(&child_cau_low, *a, *b);
                let target_end = (et_round(m.end_time().min(self.end_time))).max(self.start_time);
                m.resize(self.start_time, target_end, 0.0);
                m
            }
            NodeKind::Always { a, b, child } => {
                let cau_m = self.temporal_leg_discounted(&child.causation_lower(trace), *a, *b, compute_timed_eventually, BOTTOM);
                let z_m = self.temporal_leg_plain(&child.robustness_lower(trace), *a, *b, compute_timed_globally, BOTTOM);
                let mut out = compute_and(&cau_m, &z_m);
                let end = cau_m.end_time().min(z_m.end_time());
                out.resize(self.start_time, end, BOTTOM);
                out.ensure_nonempty(BOTTOM);
                out
            }
        }
    }

    /// The `cauM` leg shared by `Eventually.causation_upper` and
    /// `Always.causation_lower`: windows the child's own causation signal,
    /// resized to `max(start_time, et_round(min(window.endTime, end_time)))`
    /// with a neutral `0.0` fill (the final OR/AND against the `zM` leg, and
    /// the outer `ensure_nonempty`, supply the real TOP/BOTTOM default).
    fn temporal_leg_discounted(&self, child_signal: &Signal, a: f64, b: f64, window_fn: impl Fn(&Signal, f64, f64) -> Signal, early_default: f64) -> Signal {
        if child_signal.end_time() < a {
            return Signal::single(self.start_time, early_default);
        }
        let mut m = window_fn(child_signal, a, b);
        let target_end = (et_round(m.end_time().min(self.end_time))).max(self.start_time);
        m.resize(self.start_time, target_end, 0.0);
        m
    }

    /// The `zM` leg: windows the child's plain robustness signal, resized to
    /// `et_round(min(window.endTime - b + a, end_time))` (no `max(start_time,
    /// ..)` wrap, unlike the discounted leg — the `-b+a` term corrects for
    /// the portion of the window not yet observed).
    fn temporal_leg_plain(&self, child_signal: &Signal, a: f64, b: f64, window_fn: impl Fn(&Signal, f64, f64) -> Signal, early_default: f64) -> Signal {
        if child_signal.end_time() < a {
            return Signal::single(self.start_time, early_default);
        }
        let mut m = window_fn(child_signal, a, b);
        let target_end = et_round((m.end_time() - b + a).min(self.end_time));
        m.resize(self.start_time, target_end, 0.0);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_row_trace(t: f64, x: f64) -> TraceBuffer {
        let mut trace = TraceBuffer::new(vec!["x".to_string()]);
        trace.append_row(t, &[x]).unwrap();
        trace
    }

    #[test]
    fn atom_before_horizon_yields_top_bottom_front() {
        let trace = single_row_trace(-0.5, 3.0);
        let mut node = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(1.0));
        node.set_horizon(0.0, 10.0);
        assert_eq!(node.robustness_upper(&trace).front_value(TOP), TOP);
        assert_eq!(node.robustness_lower(&trace).front_value(BOTTOM), BOTTOM);
    }

    #[test]
    fn atom_inside_horizon_carries_real_value_in_last_sample() {
        let mut trace = TraceBuffer::new(vec!["x".to_string()]);
        trace.append_row(0.0, &[2.0]).unwrap();
        trace.append_row(1.0, &[2.0]).unwrap();
        let mut node = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(1.0));
        node.set_horizon(0.0, 10.0);

        let up = node.robustness_upper(&trace);
        assert_eq!(up.front_value(TOP), TOP);
        assert!((up.samples().last().unwrap().value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn and_causation_lower_matches_hand_checked_asymmetric_combination() {
        let mut trace = TraceBuffer::new(vec!["x".to_string()]);
        trace.append_row(0.0, &[2.0]).unwrap();
        trace.append_row(1.0, &[0.5]).unwrap();

        let mut gt = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(1.0));
        let mut lt = Node::atom(0, Comparator::LessThan, ValueExpr::Const(3.0));
        gt.set_horizon(0.0, 10.0);
        lt.set_horizon(0.0, 10.0);
        let mut conj = Node::and(gt, lt);
        conj.set_horizon(0.0, 10.0);

        let cau_low = conj.causation_lower(&trace);
        assert!((cau_low.samples().last().unwrap().value - (-0.5)).abs() < 1e-9);
    }

    #[test]
    fn not_swaps_upper_and_lower() {
        let trace = single_row_trace(0.0, 3.0);
        let atom = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(0.0));
        let mut negated = Node::not(atom);
        negated.set_horizon(0.0, 10.0);

        let up = negated.robustness_upper(&trace);
        assert_eq!(up.front_value(TOP), TOP);
    }

    #[test]
    fn causation_upper_never_exceeds_baseline_upper_for_and() {
        let mut trace = TraceBuffer::new(vec!["x".to_string(), "y".to_string()]);
        trace.append_row(0.0, &[1.0, -1.0]).unwrap();
        trace.append_row(1.0, &[2.0, -2.0]).unwrap();
        trace.append_row(2.0, &[-1.0, 1.0]).unwrap();

        let mut a = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(0.0));
        let mut b = Node::atom(1, Comparator::GreaterThan, ValueExpr::Const(0.0));
        a.set_horizon(0.0, 10.0);
        b.set_horizon(0.0, 10.0);
        let mut conj = Node::and(a, b);
        conj.set_horizon(0.0, 10.0);

        let cau = conj.causation_upper(&trace);
        let base = conj.robustness_upper(&trace);
        for t in [0.0, 1.0, 2.0] {
            assert!(cau.value_at(t) <= base.value_at(t) + 1e-9, "t={t}");
        }
    }

    #[test]
    fn eventually_causation_upper_is_top_before_child_window_known() {
        let trace = single_row_trace(0.0, 0.0);
        let mut atom = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(-1.0));
        atom.set_horizon(0.0, 10.0);
        let mut ev = Node::eventually(0.0, 5.0, atom);
        ev.set_horizon(0.0, 10.0);
        let cau = ev.causation_upper(&trace);
        assert!(cau.front_value(TOP) == TOP || cau.samples().next().unwrap().value == TOP);
    }

    #[test]
    fn set_horizon_propagates_same_bounds_to_children() {
        let atom = Node::atom(0, Comparator::GreaterThan, ValueExpr::Const(0.0));
        let mut ev = Node::eventually(0.0, 3.0, atom);
        ev.set_horizon(2.0, 9.0);
        if let NodeKind::Eventually { child, .. } = &ev.kind {
            assert_eq!(child.start_time(), 2.0);
            assert_eq!(child.end_time(), 9.0);
        } else {
            panic!("expected Eventually node");
        }
    }
}
