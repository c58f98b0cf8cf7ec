//! Reporting collaborator interface.
//!
//! The scan driver never prints. It hands plain data to a [`ScanReporter`]:
//! step boundaries, progress counters, the per-step summary and the finished
//! series. Every method has an empty default so implementors pick what they
//! need.

use crate::scan::{ScanResult, StepReport};

/// Receives scan events in order.
pub trait ScanReporter {
    /// A step is about to generate `sample_size` particles.
    fn step_started(&mut self, _step: usize, _sample_size: u64) {}

    /// Particle `processed` (0-based) of `step` has been accumulated.
    /// Emitted every `cycle_report` particles, in increasing order. With more
    /// than one thread, events arrive once per completed wave of chunks.
    fn progress(&mut self, _step: usize, _processed: u64) {}

    /// A step has been fitted and combined.
    fn step_finished(&mut self, _report: &StepReport) {}

    /// All steps are done.
    fn scan_finished(&mut self, _result: &ScanResult) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ScanReporter for NullReporter {}
