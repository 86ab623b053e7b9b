//! Scheduler - iterative transaction passes.
//!
//! A pass drains a FIFO work list of updater jobs to completion; jobs queued
//! while the list drains (child mounts, deferred follow-ups, boundary
//! deliveries) join the same list. Requests that arrive while a pass or
//! batch is active collect in the dirty list instead and run as the next
//! pass; the outer loop repeats until no pass produces new work. The whole
//! thing is a work loop over explicit queues, so deep trees and long
//! setState chains never grow the call stack per pass.

use std::collections::{HashSet, VecDeque};

use crate::adapter::HostAdapter;
use crate::runtime::Runtime;
use crate::types::UpdaterId;
use crate::updater::{Job, Phase};

/// FIFO job list of one pass. An id appears once per job queued on its
/// updater; executing it pops that updater's front job.
pub(crate) type Work = VecDeque<UpdaterId>;

// =============================================================================
// Scheduler
// =============================================================================

#[derive(Default)]
pub(crate) struct Scheduler {
    /// Updaters with requests waiting for the next pass. May hold
    /// duplicates; pass setup dedups while preserving first-seen order.
    dirty: Vec<UpdaterId>,
    pub(crate) in_pass: bool,
    pub(crate) batch_depth: u32,
}

impl Scheduler {
    /// While active, update requests batch into `dirty` instead of running
    /// synchronously.
    pub(crate) fn is_active(&self) -> bool {
        self.in_pass || self.batch_depth > 0
    }

    pub(crate) fn enqueue(&mut self, id: UpdaterId) {
        self.dirty.push(id);
    }
}

// =============================================================================
// Pass Execution
// =============================================================================

impl<A: HostAdapter> Runtime<A> {
    /// Run passes until the dirty list stays empty. Re-entrant and
    /// batched-context calls return immediately; the active outer call or
    /// the batch close will pick the work up.
    pub(crate) fn run_passes(&mut self) {
        if self.scheduler.is_active() {
            return;
        }
        self.scheduler.in_pass = true;
        loop {
            let dirty = std::mem::take(&mut self.scheduler.dirty);
            if dirty.is_empty() {
                break;
            }
            let mut seen = HashSet::new();
            let mut ids = Vec::new();
            for id in dirty {
                // duplicates collapse to one hydrate; the pending updates
                // they stand for already sit folded on the updater
                if !seen.insert(id) {
                    continue;
                }
                match self.up(id) {
                    Some(up) if !up.flags.contains(Phase::DISPOSED) => ids.push(id),
                    _ => continue,
                }
            }
            // ancestors hydrate first; their re-render may re-prop or
            // dispose the descendants further down the list
            ids.sort_by_key(|&id| self.up(id).map_or(u64::MAX, |up| up.mount_order));

            let mut work = Work::new();
            for id in ids {
                if let Some(up) = self.up_mut(id) {
                    if up.jobs.is_empty() {
                        up.add_job(Job::Hydrate);
                    }
                    work.push_back(id);
                }
            }
            self.drain(&mut work);
        }
        self.scheduler.in_pass = false;
    }

    /// Drain one work list to empty, including jobs it spawns.
    pub(crate) fn drain(&mut self, work: &mut Work) {
        while let Some(id) = work.pop_front() {
            self.exec_job(id, work);
        }
    }

    fn exec_job(&mut self, id: UpdaterId, work: &mut Work) {
        // stale ids (disposed slot, bumped generation) fall through
        let job = match self.up_mut(id) {
            Some(up) if !up.flags.contains(Phase::DISPOSED) => up.jobs.pop_front(),
            _ => None,
        };
        match job {
            Some(Job::Hydrate) => self.hydrate(id, work),
            Some(Job::Resolve) => self.resolve(id, work),
            None => {}
        }
    }
}
