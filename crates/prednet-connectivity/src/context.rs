// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Execution context for distributed runs.

Every operation that touches more than one worker receives an explicit
[`ExecutionContext`]: rank and size come from it, and so do the blocking
points (barriers and the sum-reduction of the normalization pass).

`Local` is a group of one. `Distributed` wraps any [`Communicator`]; the
crate ships [`ThreadGroup`], an in-process group with one member per
thread.
*/

use crate::types::{ConnError, ConnResult, Phase};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Collective operations shared by all members of a worker group
pub trait Communicator: Send + Sync + fmt::Debug {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Block until every member reached the same barrier
    fn barrier(&self, phase: Phase) -> ConnResult<()>;

    /// Sum `value` over all members; every member receives the same total
    fn all_reduce_sum(&self, value: f64, phase: Phase) -> ConnResult<f64>;
}

/// Rank, size and collectives of the current worker
#[derive(Debug, Clone, Default)]
pub enum ExecutionContext {
    #[default]
    Local,
    Distributed(Arc<dyn Communicator>),
}

impl ExecutionContext {
    pub fn distributed(comm: impl Communicator + 'static) -> Self {
        ExecutionContext::Distributed(Arc::new(comm))
    }

    /// One context per member of a new in-process group, in rank order
    pub fn thread_group(size: usize) -> Vec<ExecutionContext> {
        ThreadGroup::new(size)
            .into_iter()
            .map(ExecutionContext::distributed)
            .collect()
    }

    pub fn rank(&self) -> usize {
        match self {
            ExecutionContext::Local => 0,
            ExecutionContext::Distributed(comm) => comm.rank(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            ExecutionContext::Local => 1,
            ExecutionContext::Distributed(comm) => comm.size(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    pub fn barrier(&self, phase: Phase) -> ConnResult<()> {
        match self {
            ExecutionContext::Local => Ok(()),
            ExecutionContext::Distributed(comm) => comm.barrier(phase),
        }
    }

    pub fn all_reduce_sum(&self, value: f64, phase: Phase) -> ConnResult<f64> {
        match self {
            ExecutionContext::Local => Ok(value),
            ExecutionContext::Distributed(comm) => comm.all_reduce_sum(value, phase),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectiveOp {
    Barrier,
    Sum,
}

impl fmt::Display for CollectiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectiveOp::Barrier => f.write_str("barrier"),
            CollectiveOp::Sum => f.write_str("all-reduce sum"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Contribution {
    op: CollectiveOp,
    phase: Phase,
    value: f64,
}

#[derive(Debug)]
struct GroupState {
    arrived: usize,
    generation: u64,
    contributions: Vec<Option<Contribution>>,
    result: f64,
    broken: Option<String>,
}

#[derive(Debug)]
struct GroupShared {
    size: usize,
    state: Mutex<GroupState>,
    cvar: Condvar,
}

/// Member of an in-process worker group.
///
/// Collectives are rendezvous points: the last member to arrive computes the
/// result and wakes the others. Contributions are summed in rank order, so
/// the reduced value does not depend on arrival order. All members must
/// enter the same operation for the same phase; otherwise the group breaks.
///
/// Dropping a member (including by unwinding) breaks the group: collectives
/// still pending, or entered later, fail with `ConnError::Collective`.
#[derive(Debug)]
pub struct ThreadGroup {
    rank: usize,
    shared: Arc<GroupShared>,
}

impl ThreadGroup {
    /// Create all `size` members of a group
    pub fn new(size: usize) -> Vec<ThreadGroup> {
        let shared = Arc::new(GroupShared {
            size,
            state: Mutex::new(GroupState {
                arrived: 0,
                generation: 0,
                contributions: vec![None; size],
                result: 0.0,
                broken: None,
            }),
            cvar: Condvar::new(),
        });
        (0..size)
            .map(|rank| ThreadGroup {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn rendezvous(&self, op: CollectiveOp, value: f64, phase: Phase) -> ConnResult<f64> {
        let mut state = self.shared.state.lock();
        if let Some(reason) = &state.broken {
            return Err(ConnError::Collective {
                rank: self.rank,
                phase,
                reason: reason.clone(),
            });
        }

        let generation = state.generation;
        state.contributions[self.rank] = Some(Contribution { op, phase, value });
        state.arrived += 1;

        if state.arrived == self.shared.size {
            if let Some(reason) = mismatch(&state.contributions) {
                error!(target: "prednet-connectivity", "[W{}] {}", self.rank, reason);
                state.broken = Some(reason.clone());
                self.shared.cvar.notify_all();
                return Err(ConnError::Collective {
                    rank: self.rank,
                    phase,
                    reason,
                });
            }

            let total = state
                .contributions
                .iter()
                .flatten()
                .map(|c| c.value)
                .sum::<f64>();
            state.result = total;
            state.arrived = 0;
            state.contributions.iter_mut().for_each(|c| *c = None);
            state.generation += 1;
            self.shared.cvar.notify_all();
            debug!(target: "prednet-connectivity", "[W{}] collective complete ({})", self.rank, phase);
            return Ok(total);
        }

        while state.generation == generation && state.broken.is_none() {
            self.shared.cvar.wait(&mut state);
        }

        if state.generation != generation {
            Ok(state.result)
        } else {
            Err(ConnError::Collective {
                rank: self.rank,
                phase,
                reason: state
                    .broken
                    .clone()
                    .unwrap_or_else(|| "group broken".to_string()),
            })
        }
    }
}

/// Describe the first member whose call differs from rank 0's
fn mismatch(contributions: &[Option<Contribution>]) -> Option<String> {
    let first = contributions.first().copied().flatten()?;
    contributions
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(rank, c)| match c {
            Some(c) if c.op == first.op && c.phase == first.phase => None,
            Some(c) => Some(format!(
                "mismatched collectives: worker 0 entered {} ({}), worker {} entered {} ({})",
                first.op, first.phase, rank, c.op, c.phase
            )),
            None => Some(format!("worker {} did not contribute", rank)),
        })
}

impl Communicator for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self, phase: Phase) -> ConnResult<()> {
        self.rendezvous(CollectiveOp::Barrier, 0.0, phase).map(|_| ())
    }

    fn all_reduce_sum(&self, value: f64, phase: Phase) -> ConnResult<f64> {
        self.rendezvous(CollectiveOp::Sum, value, phase)
    }
}

impl Drop for ThreadGroup {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if state.broken.is_none() {
            let reason = if std::thread::panicking() {
                error!(target: "prednet-connectivity", "[W{}] worker panicked, breaking group", self.rank);
                format!("worker {} panicked", self.rank)
            } else {
                format!("worker {} left the group", self.rank)
            };
            state.broken = Some(reason);
        }
        self.shared.cvar.notify_all();
    }
}
