use thiserror::Error;

/// Errors that can abort monitoring before any (upper, lower) pair is produced.
///
/// Everything else the core handles (empty signals, degenerate horizons, missing
/// interval parameters) is resolved locally with a default value and never
/// surfaces here.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("malformed formula source: {reason}")]
    MalformedSource { reason: String },

    #[error("unknown signal name: {name}")]
    UnknownSignal { name: String },

    #[error("trace row has {got} columns, expected {expected}")]
    TraceShape { expected: usize, got: usize },

    #[error("trace timestamps must strictly increase, got {time} out of order")]
    NonMonotonicTime { time: f64 },

    #[error("insufficient inputs: a formula, a trace, and a horizon are all required")]
    InsufficientInputs,
}

pub type MonitorResult<T> = Result<T, MonitorError>;
