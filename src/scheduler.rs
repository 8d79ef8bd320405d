//! Task scheduling.
//!
//! Both schedulers run a job over a growing set of tasks until none remain.
//! A job consumes one task and may push follow-up tasks; there is no other
//! termination signal.
//!
//! | Scheduler | Threads | Order |
//! |-----------|---------|-------|
//! | [`StackScheduler`] | caller | exact depth-first (LIFO stack) |
//! | [`PoolScheduler`] | N workers | most-recently-submitted first, approximately depth-first |

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Drives a job over tasks until the work set is empty.
pub trait Scheduler {
    /// Run `job` over `seeds` and everything the job spawns.
    ///
    /// The first job error is returned; work still queued at that point is
    /// abandoned.
    fn run<T, F>(&self, seeds: Vec<T>, job: F) -> Result<()>
    where
        T: Send,
        F: Fn(T, &mut Vec<T>) -> Result<()> + Sync;
}

// ============================================================================
// StackScheduler
// ============================================================================

/// Single-threaded explicit work stack.
///
/// Children are pushed so the first one a job emitted is the next popped,
/// which reproduces recursive depth-first order without recursion.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackScheduler;

impl Scheduler for StackScheduler {
    fn run<T, F>(&self, seeds: Vec<T>, job: F) -> Result<()>
    where
        T: Send,
        F: Fn(T, &mut Vec<T>) -> Result<()> + Sync,
    {
        let mut stack: Vec<T> = seeds.into_iter().rev().collect();
        let mut spawned = Vec::new();
        while let Some(task) = stack.pop() {
            job(task, &mut spawned)?;
            stack.extend(spawned.drain(..).rev());
        }
        Ok(())
    }
}

// ============================================================================
// PoolScheduler
// ============================================================================

/// Bounded worker pool over a shared priority queue.
///
/// Every submitted task gets the next value of a submission counter; the
/// queue always hands out the highest one, i.e. the most recent submission.
/// Workers therefore keep descending into fresh branches, which approximates
/// depth-first order even though completion order across workers is not
/// deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolScheduler {
    /// Worker count. `0` uses the available parallelism.
    pub threads: usize,
}

impl PoolScheduler {
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }

    /// Number of workers the pool actually starts.
    pub fn workers(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
        }
    }
}

struct Queued<T> {
    seq: u64,
    task: T,
}

impl<T> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Queued<T> {}

impl<T> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Queued<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

struct Queue<T> {
    heap: BinaryHeap<Queued<T>>,
    next_seq: u64,
    in_flight: usize,
    error: Option<Error>,
}

impl<T> Queue<T> {
    fn submit(&mut self, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Queued { seq, task });
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            warn!(%error, abandoned = self.heap.len(), "propagation task failed");
            self.error = Some(error);
        }
        self.heap.clear();
    }
}

struct Shared<T> {
    queue: Mutex<Queue<T>>,
    ready: Condvar,
}

impl Scheduler for PoolScheduler {
    fn run<T, F>(&self, seeds: Vec<T>, job: F) -> Result<()>
    where
        T: Send,
        F: Fn(T, &mut Vec<T>) -> Result<()> + Sync,
    {
        if seeds.is_empty() {
            return Ok(());
        }

        let mut queue = Queue {
            heap: BinaryHeap::with_capacity(seeds.len()),
            next_seq: 0,
            in_flight: 0,
            error: None,
        };
        for task in seeds {
            queue.submit(task);
        }
        let shared = Shared {
            queue: Mutex::new(queue),
            ready: Condvar::new(),
        };

        let workers = self.workers();
        debug!(workers, "starting propagation pool");
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| work(&shared, &job));
            }
        });

        match shared.queue.into_inner().error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Worker loop: pull until the queue is empty and nothing is in flight.
fn work<T, F>(shared: &Shared<T>, job: &F)
where
    T: Send,
    F: Fn(T, &mut Vec<T>) -> Result<()> + Sync,
{
    let mut spawned = Vec::new();
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.error.is_some() {
                    return;
                }
                if let Some(next) = queue.heap.pop() {
                    queue.in_flight += 1;
                    break next.task;
                }
                if queue.in_flight == 0 {
                    shared.ready.notify_all();
                    return;
                }
                shared.ready.wait(&mut queue);
            }
        };

        // A panicking job must still release its in-flight slot, or the
        // remaining workers would wait forever.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(task, &mut spawned)));

        let mut queue = shared.queue.lock();
        queue.in_flight -= 1;
        match outcome {
            Ok(Ok(())) => {
                for child in spawned.drain(..) {
                    queue.submit(child);
                }
            }
            Ok(Err(error)) => {
                spawned.clear();
                queue.fail(error);
            }
            Err(_) => {
                spawned.clear();
                queue.fail(Error::Scheduler("propagation worker panicked".into()));
            }
        }
        drop(queue);
        shared.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Binary tree of depth 3 expressed as path strings.
    fn expand(task: String, out: &mut Vec<String>) -> Result<()> {
        if task.len() < 3 {
            out.push(format!("{task}0"));
            out.push(format!("{task}1"));
        }
        Ok(())
    }

    #[test]
    fn test_stack_is_depth_first() {
        let order = Mutex::new(Vec::new());
        StackScheduler
            .run(vec![String::new()], |task, out| {
                order.lock().push(task.clone());
                expand(task, out)
            })
            .unwrap();
        let order = order.into_inner();
        assert_eq!(
            order,
            vec!["", "0", "00", "000", "001", "01", "010", "011", "1", "10", "100", "101", "11", "110", "111"]
        );
    }

    #[test]
    fn test_stack_stops_on_error() {
        let seen = AtomicUsize::new(0);
        let result = StackScheduler.run(vec![0u32], |task, out| {
            seen.fetch_add(1, AtomicOrdering::SeqCst);
            if task == 2 {
                return Err(Error::Policy("boom".into()));
            }
            out.push(task + 1);
            Ok(())
        });
        assert!(matches!(result, Err(Error::Policy(_))));
        assert_eq!(seen.load(AtomicOrdering::SeqCst), 3);
    }

    #[test]
    fn test_pool_visits_everything() {
        for threads in [1, 2, 4, 8] {
            let seen = AtomicUsize::new(0);
            PoolScheduler::new(threads)
                .run(vec![String::new()], |task, out| {
                    seen.fetch_add(1, AtomicOrdering::SeqCst);
                    expand(task, out)
                })
                .unwrap();
            assert_eq!(seen.load(AtomicOrdering::SeqCst), 15, "threads = {threads}");
        }
    }

    #[test]
    fn test_single_worker_prefers_latest_submission() {
        let order = Mutex::new(Vec::new());
        PoolScheduler::new(1)
            .run(vec![String::new()], |task, out| {
                order.lock().push(task.clone());
                expand(task, out)
            })
            .unwrap();
        let order = order.into_inner();
        // Latest child first: descends "1" before "0", but still depth-first.
        assert_eq!(&order[..4], &["", "1", "11", "111"]);
        assert_eq!(order.len(), 15);
    }

    #[test]
    fn test_pool_surfaces_first_error() {
        let result = PoolScheduler::new(4).run((0..64u32).collect(), |task, _out| {
            if task == 17 {
                Err(Error::Policy(format!("task {task}")))
            } else {
                Ok(())
            }
        });
        match result {
            Err(Error::Policy(msg)) => assert_eq!(msg, "task 17"),
            other => panic!("expected policy error, got {other:?}"),
        }
    }

    #[test]
    fn test_pool_reports_panic() {
        let result = PoolScheduler::new(2).run(vec![1u8, 2, 3], |task, _out| {
            if task == 2 {
                panic!("worker blew up");
            }
            Ok(())
        });
        assert!(matches!(result, Err(Error::Scheduler(_))));
    }

    #[test]
    fn test_pool_empty_seed_set() {
        PoolScheduler::new(4).run(Vec::<u8>::new(), |_, _| Ok(())).unwrap();
    }

    #[test]
    fn test_zero_threads_uses_available_parallelism() {
        assert!(PoolScheduler::new(0).workers() >= 1);
        assert_eq!(PoolScheduler::new(3).workers(), 3);
    }
}
