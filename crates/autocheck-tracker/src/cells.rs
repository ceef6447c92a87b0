//! Notebook-style cell history: ordered inputs, outputs keyed by execution
//! count.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value as Json;

/// Source of the cells a tracker reports.
pub trait CellHistory {
    /// Every input so far, oldest first.
    fn inputs(&self) -> Vec<String>;

    /// Every recorded output, keyed by the execution count of its input.
    fn outputs(&self) -> BTreeMap<u64, Json>;
}

/// In-memory cell history.
#[derive(Debug, Default, Clone)]
pub struct CellLog {
    inputs: Vec<String>,
    outputs: BTreeMap<u64, Json>,
}

impl CellLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input cell and return its execution count, starting at 1.
    pub fn push_input(&mut self, source: impl Into<String>) -> u64 {
        self.inputs.push(source.into());
        self.inputs.len() as u64
    }

    pub fn set_output(&mut self, count: u64, output: impl Into<Json>) {
        self.outputs.insert(count, output.into());
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl CellHistory for CellLog {
    fn inputs(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn outputs(&self) -> BTreeMap<u64, Json> {
        self.outputs.clone()
    }
}

/// A [`CellLog`] shared between the code that executes cells and the tracker.
#[derive(Debug, Default, Clone)]
pub struct SharedCellLog(Arc<Mutex<CellLog>>);

impl SharedCellLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, CellLog> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CellHistory for SharedCellLog {
    fn inputs(&self) -> Vec<String> {
        self.lock().inputs()
    }

    fn outputs(&self) -> BTreeMap<u64, Json> {
        self.lock().outputs()
    }
}
