//! The collective-communication contract.
//!
//! Every call to [`Distribution::all_gather`] is a full barrier: all workers
//! must reach the same call in the same order. The result is the
//! concatenation of every worker's contribution in rank order, then local
//! order, and is delivered to every worker.

use std::any::Any;
use std::sync::{Arc, Barrier, Mutex, PoisonError};

/// Failures of the collective primitive itself.
#[derive(Debug, thiserror::Error)]
pub enum CollectiveError {
    /// Workers contributed payloads of different types to the same call,
    /// which means their call sequences have diverged.
    #[error("collective payload type mismatch: rank {rank} contributed a different type")]
    TypeMismatch { rank: usize },
}

/// A fixed set of workers cooperating through collective gathers.
pub trait Distribution {
    /// This worker's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers.
    fn size(&self) -> usize;

    /// Gather every worker's `local` values, concatenated in rank order.
    fn all_gather<T: Clone + Send + 'static>(&self, local: Vec<T>)
    -> Result<Vec<T>, CollectiveError>;
}

/// A single worker: gathering returns the local values unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Solo;

impl Distribution for Solo {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather<T: Clone + Send + 'static>(
        &self,
        local: Vec<T>,
    ) -> Result<Vec<T>, CollectiveError> {
        Ok(local)
    }
}

type Slot = Option<Box<dyn Any + Send>>;

#[derive(Debug)]
struct Shared {
    slots: Mutex<Vec<Slot>>,
    barrier: Barrier,
}

/// Workers running as threads of one process.
///
/// [`ThreadGroup::new`] returns one handle per rank; move each handle into
/// its own thread. Each gather deposits the local payload in the rank's slot,
/// waits for all ranks, reads every slot, and waits again so that no rank
/// overwrites its slot before the others have finished reading.
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    shared: Arc<Shared>,
    rank: usize,
    size: usize,
}

impl ThreadGroup {
    /// Create handles for `size` workers (at least one).
    pub fn new(size: usize) -> Vec<ThreadGroup> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            slots: Mutex::new((0..size).map(|_| None).collect()),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| ThreadGroup {
                shared: Arc::clone(&shared),
                rank,
                size,
            })
            .collect()
    }
}

impl Distribution for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_gather<T: Clone + Send + 'static>(
        &self,
        local: Vec<T>,
    ) -> Result<Vec<T>, CollectiveError> {
        {
            let mut slots = self
                .shared
                .slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slots[self.rank] = Some(Box::new(local));
        }
        self.shared.barrier.wait();

        // No early return between the two waits: a rank that leaves here
        // without the second wait would strand the others.
        let gathered = {
            let slots = self
                .shared
                .slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut out = Vec::new();
            let mut mismatch = None;
            for (rank, slot) in slots.iter().enumerate() {
                match slot.as_ref().and_then(|s| s.downcast_ref::<Vec<T>>()) {
                    Some(part) => out.extend(part.iter().cloned()),
                    None => {
                        mismatch.get_or_insert(rank);
                    }
                }
            }
            match mismatch {
                Some(rank) => Err(CollectiveError::TypeMismatch { rank }),
                None => Ok(out),
            }
        };

        self.shared.barrier.wait();
        gathered
    }
}
