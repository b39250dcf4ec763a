//! # Worker Pool
//!
//! Bounded parallel execution of per-element work.
//!
//! A fixed number of workers run on a `rayon` thread pool. Each worker pulls
//! the next item index from a shared atomic cursor, so items are dispatched
//! strictly in slice order regardless of how long individual items take.
//! Finished items are sent over a channel to the calling thread, which is the
//! only place results are collected and the only place the completion
//! observer runs.
//!
//! The only state shared between workers is the cursor, the halt flag and
//! the sending half of the channel.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use log::{debug, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};

/// A bounded pool running one closure per item.
pub struct WorkerPool {
    pool: ThreadPool,
    num_threads: usize,
    robust: bool,
    interrupt: Option<Arc<AtomicBool>>,
}

impl WorkerPool {
    /// Builds a pool of `num_threads` workers. Zero is a usage error.
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::usage("the number of parallel jobs must be at least 1"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("vws-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            num_threads,
            robust: false,
            interrupt: None,
        })
    }

    /// In robust mode every item is attempted regardless of failures.
    /// Otherwise the first failure stops further dispatch.
    pub fn robust(mut self, robust: bool) -> Self {
        self.robust = robust;
        self
    }

    /// Stops dispatching once `flag` is set; `run` then returns
    /// `Error::Interrupted`.
    pub fn interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn is_robust(&self) -> bool {
        self.robust
    }

    /// Runs `work` on each item and returns `(index, result)` for every item
    /// that was dispatched, in index order.
    ///
    /// `is_failure` classifies results for the halt decision and
    /// `on_complete` is called on the calling thread as results arrive.
    /// In non-robust mode items after the first failure are not dispatched;
    /// work already in flight still finishes and is reported.
    pub fn run<T, R, W, F, O>(
        &self,
        items: &[T],
        work: W,
        is_failure: F,
        mut on_complete: O,
    ) -> Result<Vec<(usize, R)>>
    where
        T: Sync,
        R: Send,
        W: Fn(&T) -> R + Sync,
        F: Fn(&R) -> bool + Sync,
        O: FnMut(usize, &R),
    {
        let cursor = AtomicUsize::new(0);
        let halted = AtomicBool::new(false);
        let interrupted = AtomicBool::new(false);
        let workers = self.num_threads.min(items.len());
        let robust = self.robust;
        let interrupt = self.interrupt.as_deref();
        let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();

        let (cursor, halted, interrupted) = (&cursor, &halted, &interrupted);
        let (work, is_failure) = (&work, &is_failure);
        let pool = &self.pool;
        let (tx, rx) = mpsc::channel::<(usize, R)>();

        debug!(
            "dispatching {} items to {} workers (robust: {})",
            items.len(),
            workers,
            robust
        );
        std::thread::scope(|scope| {
            scope.spawn(move || {
                pool.scope(move |s| {
                    for _ in 0..workers {
                        let tx = tx.clone();
                        s.spawn(move |_| loop {
                            if halted.load(Ordering::SeqCst) {
                                break;
                            }
                            if interrupt.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                                interrupted.store(true, Ordering::SeqCst);
                                break;
                            }
                            let index = cursor.fetch_add(1, Ordering::SeqCst);
                            if index >= items.len() {
                                break;
                            }
                            let result = work(&items[index]);
                            if !robust && is_failure(&result) {
                                halted.store(true, Ordering::SeqCst);
                            }
                            if tx.send((index, result)).is_err() {
                                break;
                            }
                        });
                    }
                });
            });

            for (index, result) in rx {
                on_complete(index, &result);
                slots[index] = Some(result);
            }
        });

        if interrupted.load(Ordering::SeqCst) {
            warn!("interrupted, not all items were dispatched");
            return Err(Error::Interrupted);
        }
        if halted.load(Ordering::SeqCst) {
            debug!("dispatch halted after a failure");
        }
        Ok(slots
            .into_iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|result| (index, result)))
            .collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("robust", &self.robust)
            .finish()
    }
}
