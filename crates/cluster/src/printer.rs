//! User-facing output of progress steps.
//!
//! Progress lines are the product of the CLI, not diagnostics, so they
//! go through a [`StepPrinter`] instead of `tracing`.

use std::io::Write;
use std::sync::{Arc, Mutex};

use ace_core::progress::ProgressMessage;

pub trait StepPrinter: Send + Sync {
    /// Print one progress step.
    fn print_step(&self, message: &ProgressMessage);

    /// Print an informational line that is not a progress step.
    fn print_line(&self, line: &str);
}

/// Writes steps to stdout, and steps flagged as errors to stderr.
#[derive(Debug, Default)]
pub struct StdoutPrinter;

impl StepPrinter for StdoutPrinter {
    fn print_step(&self, message: &ProgressMessage) {
        if message.error {
            let _ = writeln!(std::io::stderr(), "{}", message.text);
        } else {
            self.print_line(&message.text);
        }
    }

    fn print_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Collects printed lines in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferPrinter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything printed so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl StepPrinter for BufferPrinter {
    fn print_step(&self, message: &ProgressMessage) {
        self.print_line(&message.text);
    }

    fn print_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
