//! Append-only column-major trace buffer and the name -> column index map
//! used to resolve atomic-predicate variables at parse time.

use hashbrown::HashMap;

use crate::error::{MonitorError, MonitorResult};

/// Maps signal names to their column index in a [`TraceBuffer`]. Built once
/// from the header row and shared by the parser to resolve variable
/// references in atomic predicates.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    columns: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { columns: HashMap::new() }
    }

    pub fn from_names(names: &[String]) -> Self {
        let mut columns = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            columns.insert(name.clone(), i);
        }
        SymbolTable { columns }
    }

    pub fn resolve(&self, name: &str) -> MonitorResult<usize> {
        self.columns.get(name).copied().ok_or_else(|| MonitorError::UnknownSignal { name: name.to_string() })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates the declared names in no particular order, paired with their
    /// resolved column index; used to recover a name list from a table built
    /// straight off a parsed `signal <names>` header.
    pub fn names(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A column-major matrix of trace rows: row 0 is the timestamp column,
/// columns 1.. are signal values in the order given by the [`SymbolTable`].
/// Append-only; timestamps must strictly increase.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    times: Vec<f64>,
    last_time: Option<f64>,
}

impl TraceBuffer {
    pub fn new(names: Vec<String>) -> Self {
        let columns = vec![Vec::new(); names.len()];
        TraceBuffer { names, columns, times: Vec::new(), last_time: None }
    }

    pub fn signal_names(&self) -> &[String] {
        &self.names
    }

    pub fn symbol_table(&self) -> SymbolTable {
        SymbolTable::from_names(&self.names)
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Appends one row of values (in column order). Rejects a row whose
    /// width doesn't match the header, or a timestamp that doesn't strictly
    /// increase past the last appended time.
    pub fn append_row(&mut self, time: f64, values: &[f64]) -> MonitorResult<()> {
        if values.len() != self.names.len() {
            return Err(MonitorError::TraceShape { expected: self.names.len(), got: values.len() });
        }
        if let Some(last) = self.last_time {
            if time <= last {
                return Err(MonitorError::NonMonotonicTime { time });
            }
        }
        for (col, v) in self.columns.iter_mut().zip(values.iter()) {
            col.push(*v);
        }
        self.last_time = Some(time);
        self.times_push(time);
        Ok(())
    }

    fn times_push(&mut self, time: f64) {
        self.times.push(time);
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn column(&self, idx: usize) -> &[f64] {
        &self.columns[idx]
    }

    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_table_resolves_known_names() {
        let table = SymbolTable::from_names(&["x".to_string(), "y".to_string()]);
        assert_eq!(table.resolve("x").unwrap(), 0);
        assert_eq!(table.resolve("y").unwrap(), 1);
        assert!(table.resolve("z").is_err());
    }

    #[test]
    fn append_row_rejects_wrong_width() {
        let mut trace = TraceBuffer::new(vec!["x".to_string()]);
        let err = trace.append_row(0.0, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, MonitorError::TraceShape { expected: 1, got: 2 }));
    }

    #[test]
    fn append_row_rejects_non_monotonic_time() {
        let mut trace = TraceBuffer::new(vec!["x".to_string()]);
        trace.append_row(1.0, &[1.0]).unwrap();
        let err = trace.append_row(1.0, &[2.0]).unwrap_err();
        assert!(matches!(err, MonitorError::NonMonotonicTime { .. }));
    }

    #[test]
    fn append_row_accumulates_columns() {
        let mut trace = TraceBuffer::new(vec!["x".to_string(), "y".to_string()]);
        trace.append_row(0.0, &[1.0, 10.0]).unwrap();
        trace.append_row(1.0, &[2.0, 20.0]).unwrap();
        assert_eq!(trace.column(0), &[1.0, 2.0]);
        assert_eq!(trace.column(1), &[10.0, 20.0]);
        assert_eq!(trace.times(), &[0.0, 1.0]);
        assert_eq!(trace.num_rows(), 2);
    }
}
