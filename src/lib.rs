//! Online Signal Temporal Logic monitoring with causation-optimized
//! robustness bounds.
//!
//! A formula is parsed once into a transducer tree ([`node::Node`]); trace
//! rows are then fed in one at a time through a [`driver::Driver`], which
//! emits a sound `(upper, lower)` bound on the formula's robustness after
//! every row.

pub mod algebra;
pub mod driver;
pub mod error;
pub mod node;
pub mod signal;
pub mod trace;
pub mod parser;

pub use driver::{driver_from_program, evaluate, Driver};
pub use error::{MonitorError, MonitorResult};
pub use node::{Comparator, Node, ValueExpr};
pub use signal::{Sample, Signal, BOTTOM, TOP};
pub use trace::{SymbolTable, TraceBuffer};
