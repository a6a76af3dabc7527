//! Defines the [`Diagnostics`] accessor of a scheduler.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::resolve::{Channel, Target};

#[derive(Debug, Default)]
struct Counters {
    boundaries: AtomicU64,
    transitions_issued: AtomicU64,
    transitions_cancelled: AtomicU64,
    loops: AtomicU64,
    completions: AtomicU64,
    commands_retried: AtomicU64,
    commands_dropped: AtomicU64,
}

/// A point-in-time copy of the [`Diagnostics`] counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    /// Keyframe boundaries processed by runners.
    pub boundaries: u64,
    pub transitions_issued: u64,
    pub transitions_cancelled: u64,
    /// Loop wraps (one continuity reseed each).
    pub loops: u64,
    /// Natural completions.
    pub completions: u64,
    /// Commands retried after a forced restart of the state container.
    pub commands_retried: u64,
    /// Commands dropped after a failed retry.
    pub commands_dropped: u64,
}

/// Observability of a [`Scheduler`](crate::scheduler::Scheduler): counters and the last resolved
/// targets.
///
/// Clones share the same data: build one, hand a clone to
/// [`Scheduler::with_diagnostics`](crate::scheduler::Scheduler::with_diagnostics) and read it from
/// anywhere.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    counters: Arc<Counters>,
    last_targets: Arc<Mutex<BTreeMap<Channel, Target>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> DiagnosticsReport {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DiagnosticsReport {
            boundaries: read(&self.counters.boundaries),
            transitions_issued: read(&self.counters.transitions_issued),
            transitions_cancelled: read(&self.counters.transitions_cancelled),
            loops: read(&self.counters.loops),
            completions: read(&self.counters.completions),
            commands_retried: read(&self.counters.commands_retried),
            commands_dropped: read(&self.counters.commands_dropped),
        }
    }

    /// The targets resolved at the latest boundary (or seek).
    pub fn get_last_targets(&self) -> BTreeMap<Channel, Target> {
        self.last_targets.lock().clone()
    }

    // ########################################
    // Recorders.

    pub(crate) fn record_boundary(&self, targets: &BTreeMap<Channel, Target>, issued: usize) {
        self.counters.boundaries.fetch_add(1, Ordering::Relaxed);
        self.counters
            .transitions_issued
            .fetch_add(issued as u64, Ordering::Relaxed);
        self.record_targets(targets);
    }
    pub(crate) fn record_targets(&self, targets: &BTreeMap<Channel, Target>) {
        *self.last_targets.lock() = targets.clone();
    }
    pub(crate) fn record_cancelled(&self, count: usize) {
        self.counters
            .transitions_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
    }
    pub(crate) fn record_loop(&self) {
        self.counters.loops.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_completion(&self) {
        self.counters.completions.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_retry(&self) {
        self.counters.commands_retried.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_drop(&self) {
        self.counters.commands_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let report = self.report();
        write!(
            f,
            "Diagnostics [boundaries={}, transitions={}, cancelled={}, loops={}, completions={}, dropped={}]",
            report.boundaries,
            report.transitions_issued,
            report.transitions_cancelled,
            report.loops,
            report.completions,
            report.commands_dropped
        )
    }
}
