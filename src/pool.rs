//! Bounded worker pool for the read-only phases of the pipeline.
//!
//! Workers only ever see shared immutable data (the loaded graph) or storage
//! owned by a single vertex. Anything that mutates the solver model stays on
//! the solver thread, see [`crate::solver`].

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::ConfigError;

#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Start a pool with `threads` workers, or one per core when `None`.
    pub fn new(threads: Option<usize>) -> Result<Self, ConfigError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("row-worker-{i}"));
        if let Some(threads) = threads {
            if threads == 0 {
                return Err(ConfigError::ZeroThreads);
            }
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|err| ConfigError::WorkerPool(err.to_string()))?;
        Ok(WorkerPool { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` with this pool as the target of every parallel iterator inside it.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}
