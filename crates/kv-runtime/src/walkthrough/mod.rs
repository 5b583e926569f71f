//! # Store Walk-throughs
//!
//! Scripted sessions against a store or the registry. Each step's result
//! is recorded as a status code (0 for success, `KvError::status_code`
//! otherwise) so a run can be printed or checked.

mod global;
mod store;

pub use global::global_walkthrough;
pub use store::store_walkthrough;

use shared_types::KvResult;
use std::fmt;

pub const EXAMPLE_VALUE_LENGTH: usize = 64;
pub const EXAMPLE_KEY_LENGTH: usize = 16;

/// Status code of a result: 0 for success.
pub fn status<T>(result: &KvResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.status_code(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Step { op: String, status: i32 },
    Note(String),
}

/// Ordered record of one walk-through.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    title: String,
    lines: Vec<Line>,
}

impl Transcript {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    /// Record `result` under `op` and hand it back.
    pub fn step<T>(&mut self, op: impl Into<String>, result: KvResult<T>) -> KvResult<T> {
        let op = op.into();
        let status = status(&result);
        tracing::debug!("[kv-runtime] {} -> {}", op, status);
        self.lines.push(Line::Step { op, status });
        result
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.lines.push(Line::Note(line.into()));
    }

    /// Statuses of every step named `op`, in order.
    pub fn statuses(&self, op: &str) -> Vec<i32> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Step { op: o, status } if o == op => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Note(note) => Some(note.as_str()),
            Line::Step { .. } => None,
        })
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.title)?;
        for line in &self.lines {
            match line {
                Line::Step { op, status } => writeln!(f, "{} -> {}", op, status)?,
                Line::Note(note) => writeln!(f, "{}", note)?,
            }
        }
        Ok(())
    }
}
