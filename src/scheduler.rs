//! Fan-out of locus processing over a bounded pool of single-use worker
//! threads, with a liveness poll and a sequential retry tail.
//!
//! Task states only move forward: `Pending -> Running -> Done`, or
//! `Pending/Running -> Stalled` at teardown. A stalled task is re-armed as
//! `Pending` for the sequential pass and can only finish there, so a late
//! result from an abandoned worker is discarded.

use crate::locus::{Locus, LocusId};
use crate::processor::LocusOutput;
use crate::types::{HashMap, HashMapExt};
use anyhow::Result;
use crossfire::mpmc;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Unit of work the scheduler fans out, one call per locus.
pub trait LocusProcess: Send + Sync + 'static {
    fn process(&self, locus: &Locus) -> Result<LocusOutput>;
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Done = 2,
    Stalled = 3,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Done,
            _ => TaskState::Stalled,
        }
    }
}

/// Completion table shared between workers and the polling thread.
///
/// Reads are plain atomic loads, so polling never blocks a worker.
#[derive(Debug)]
struct TaskTable {
    states: Vec<AtomicU8>,
    completed: AtomicUsize,
}

impl TaskTable {
    fn new(n: usize) -> Self {
        Self {
            states: (0..n).map(|_| AtomicU8::new(TaskState::Pending as u8)).collect(),
            completed: AtomicUsize::new(0),
        }
    }

    fn state(&self, idx: usize) -> TaskState {
        TaskState::from_u8(self.states[idx].load(Ordering::Acquire))
    }

    fn transition(&self, idx: usize, from: TaskState, to: TaskState) -> bool {
        let ok = self.states[idx]
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if ok && to == TaskState::Done {
            self.completed.fetch_add(1, Ordering::AcqRel);
        }
        ok
    }

    fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Mark every unfinished task stalled; returns their indices in order.
    fn sweep(&self) -> Vec<usize> {
        let mut stalled = Vec::new();
        for idx in 0..self.states.len() {
            loop {
                let current = self.state(idx);
                if current == TaskState::Done {
                    break;
                }
                if current == TaskState::Stalled || self.transition(idx, current, TaskState::Stalled)
                {
                    stalled.push(idx);
                    break;
                }
            }
        }
        stalled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub total: usize,
    pub parallel_done: usize,
    pub stalled: usize,
    pub retried_done: usize,
    /// Loci that failed even on sequential retry; absent from the output.
    pub failed: Vec<LocusId>,
}

#[derive(Debug, Clone)]
pub struct LocusScheduler {
    threads: usize,
    poll_interval: Duration,
}

impl LocusScheduler {
    pub fn new(threads: usize, poll_interval: Duration) -> Self {
        Self { threads: threads.max(1), poll_interval }
    }

    /// Process every locus and return the outputs in locus order, whichever
    /// phase produced them.
    pub fn run<P: LocusProcess>(
        &self,
        processor: Arc<P>,
        mut loci: Vec<Locus>,
    ) -> (Vec<LocusOutput>, ScheduleReport) {
        loci.sort_by(|a, b| a.id.cmp(&b.id));
        let total = loci.len();
        let mut report = ScheduleReport { total, ..ScheduleReport::default() };
        if total == 0 {
            return (Vec::new(), report);
        }

        let loci = Arc::new(loci);
        let table = Arc::new(TaskTable::new(total));
        let teardown = Arc::new(AtomicBool::new(false));
        let (tx_res, rx_res) = mpmc::unbounded_blocking::<(usize, LocusOutput)>();

        tracing::info!(loci = total, threads = self.threads, "starting parallel processing of loci");
        crossfire::detect_backoff_cfg();
        let (tx_permit, rx_permit) = mpmc::bounded_blocking::<()>(self.threads);

        // One thread per locus, at most `threads` at a time, until every task
        // is dispatched or the pool is torn down.
        let dispatcher = {
            let processor = Arc::clone(&processor);
            let loci = Arc::clone(&loci);
            let table = Arc::clone(&table);
            let teardown = Arc::clone(&teardown);
            thread::Builder::new()
                .name("locus-dispatch".to_string())
                .spawn(move || {
                    for idx in 0..loci.len() {
                        if teardown.load(Ordering::Acquire) || tx_permit.send(()).is_err() {
                            break;
                        }
                        if teardown.load(Ordering::Acquire)
                            || !table.transition(idx, TaskState::Pending, TaskState::Running)
                        {
                            break;
                        }

                        let processor = Arc::clone(&processor);
                        let loci_ref = Arc::clone(&loci);
                        let table_ref = Arc::clone(&table);
                        let tx_res = tx_res.clone();
                        let worker_rx_permit = rx_permit.clone();
                        let worker = thread::Builder::new()
                            .name(format!("locus-{}", loci[idx].id))
                            .spawn(move || {
                                let locus = &loci_ref[idx];
                                match run_guarded(processor.as_ref(), locus) {
                                    Ok(out) => {
                                        if table_ref.transition(idx, TaskState::Running, TaskState::Done) {
                                            let _ = tx_res.send((idx, out));
                                        } else {
                                            tracing::debug!(locus = %locus.id, "discarding result of stalled locus");
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!(locus = %locus.id, error = %e, "locus failed in worker");
                                    }
                                }
                                let _ = worker_rx_permit.recv();
                            });
                        if let Err(e) = worker {
                            // Left running; the sweep turns it into a sequential retry.
                            tracing::warn!(locus = %loci[idx].id, error = %e, "failed to spawn worker");
                            let _ = rx_permit.recv();
                        }
                    }
                })
        };
        if let Err(e) = dispatcher {
            tracing::warn!(error = %e, "failed to spawn dispatcher, all loci will run sequentially");
        }

        let mut results: HashMap<usize, LocusOutput> = HashMap::with_capacity(total);
        let mut previous = 0usize;
        loop {
            thread::sleep(self.poll_interval);
            while let Ok((idx, out)) = rx_res.try_recv() {
                results.insert(idx, out);
            }
            let finished = table.completed();
            let isoforms: usize = results.values().map(|o| o.records.len()).sum();
            tracing::info!(finished, total, isoforms, "polled locus pool");
            if finished == total || finished == previous {
                break;
            }
            previous = finished;
        }

        // Whole-pool teardown: stop dispatch and abandon running workers.
        teardown.store(true, Ordering::Release);
        let stalled = table.sweep();
        let done = total - stalled.len();
        while results.len() < done {
            match rx_res.recv() {
                Ok((idx, out)) => {
                    results.insert(idx, out);
                }
                Err(_) => break,
            }
        }
        report.parallel_done = results.len();
        report.stalled = stalled.len();
        if !stalled.is_empty() {
            tracing::warn!(stalled = stalled.len(), "loci took too long to complete, terminating pool");
        }

        for idx in stalled {
            let locus = &loci[idx];
            table.transition(idx, TaskState::Stalled, TaskState::Pending);
            table.transition(idx, TaskState::Pending, TaskState::Running);
            tracing::info!(locus = %locus.id, "processing locus single-threaded");
            match run_guarded(processor.as_ref(), locus) {
                Ok(out) => {
                    table.transition(idx, TaskState::Running, TaskState::Done);
                    results.insert(idx, out);
                    report.retried_done += 1;
                }
                Err(e) => {
                    tracing::warn!(locus = %locus.id, error = %e, "locus failed on retry, dropping");
                    report.failed.push(locus.id.clone());
                }
            }
        }

        let mut outputs = Vec::with_capacity(results.len());
        for idx in 0..total {
            if let Some(out) = results.remove(&idx) {
                outputs.push(out);
            }
        }
        (outputs, report)
    }
}

/// Run one locus, turning a panic into an error.
fn run_guarded<P: LocusProcess>(processor: &P, locus: &Locus) -> Result<LocusOutput> {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(locus))) {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("processing of locus {} panicked", locus.id)),
    }
}
