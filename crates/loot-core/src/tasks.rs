//! Background work on a small worker pool
//!
//! Tasks share no mutable state; each hands its own result back through a
//! channel. Nothing cancels a running task: a rescan submits a new one and the
//! caller keeps whichever result it wants.

use crate::descriptor::LootTableDescriptor;
use crate::enchantments::{load_enchantments, EnchantmentDescriptor};
use crate::error::{Error, Result};
use crate::reconcile::visible_tables;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A unit of background work
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    fn name(&self) -> String;

    fn run(&self) -> Result<Self::Output>;
}

/// A finished task
#[derive(Debug)]
pub struct TaskOutcome<T> {
    pub name: String,
    pub payload: T,
    pub duration: Duration,
}

/// Receiving end for one submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: String,
    receiver: Receiver<Result<TaskOutcome<T>>>,
}

impl<T> TaskHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the task finishes
    pub fn wait(self) -> Result<TaskOutcome<T>> {
        self.receiver.recv().unwrap_or_else(|_| Err(self.dropped()))
    }

    /// The outcome if the task has already finished
    pub fn try_wait(&self) -> Option<Result<TaskOutcome<T>>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.dropped())),
        }
    }

    fn dropped(&self) -> Error {
        Error::TaskFailed {
            name: self.name.clone(),
            message: "worker stopped without reporting a result".to_string(),
        }
    }
}

/// Worker pool sized from the machine's parallelism
pub struct TaskRunner {
    pool: ThreadPool,
}

/// `max(2, available parallelism / 2)`
pub fn default_pool_size() -> usize {
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (available / 2).max(2)
}

impl TaskRunner {
    pub fn new() -> Result<Self> {
        Self::with_threads(default_pool_size())
    }

    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("loot-worker-{i}"))
            .build()
            .map_err(|e| Error::TaskFailed {
                name: "worker pool".to_string(),
                message: e.to_string(),
            })?;
        debug!("Started worker pool with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `task` and return a handle to its outcome
    pub fn submit<T: Task>(&self, task: T) -> TaskHandle<T::Output> {
        let name = task.name();
        let (sender, receiver) = mpsc::channel();
        self.pool.spawn(move || {
            let started = Instant::now();
            let result = task.run().map(|payload| {
                let outcome = TaskOutcome {
                    name: task.name(),
                    payload,
                    duration: started.elapsed(),
                };
                info!("Task {} finished in {} ms", outcome.name, outcome.duration.as_millis());
                outcome
            });
            // The handle may already be gone; nobody is waiting then.
            let _ = sender.send(result);
        });
        TaskHandle { name, receiver }
    }
}

/// Discovery plus reconciliation for one modpack
#[derive(Debug, Clone)]
pub struct ScanTask {
    pub modpack_root: PathBuf,
}

impl ScanTask {
    pub fn new(modpack_root: impl Into<PathBuf>) -> Self {
        Self {
            modpack_root: modpack_root.into(),
        }
    }
}

impl Task for ScanTask {
    type Output = Vec<LootTableDescriptor>;

    fn name(&self) -> String {
        format!("scan {}", self.modpack_root.display())
    }

    fn run(&self) -> Result<Self::Output> {
        visible_tables(&self.modpack_root)
    }
}

/// Enchantment registry load for one modpack
#[derive(Debug, Clone)]
pub struct EnchantmentTask {
    pub modpack_root: PathBuf,
}

impl Task for EnchantmentTask {
    type Output = Vec<EnchantmentDescriptor>;

    fn name(&self) -> String {
        format!("enchantments {}", self.modpack_root.display())
    }

    fn run(&self) -> Result<Self::Output> {
        Ok(load_enchantments(&self.modpack_root))
    }
}
