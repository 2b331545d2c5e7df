//! # Stages: execution contexts a relay can hand itself off to.
//!
//! A [`Stage`] accepts boxed [`StageTask`]s and runs them later, somewhere
//! else. The relay dispatcher only needs `execute`; everything about threads and
//! scheduling belongs to the stage.
//!
//! ## Built-in stages
//! - [`TokioStage`] spawns each task onto a tokio runtime and tracks it with a
//!   [`TaskTracker`], so a host can wait for in-flight work on shutdown.
//! - [`QueueStage`] pushes tasks into an unbounded queue drained by its paired
//!   [`StageQueue`] on whatever thread calls [`StageQueue::run_pending`].
//!
//! ## Identity
//! Two stages are the same stage when they are the same allocation
//! ([`same_stage`]); a relay only hands off when the target differs from the
//! stage it is already running on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;

use crate::error::panic_message;

/// A unit of work submitted to a [`Stage`].
pub trait StageTask: Send + 'static {
    fn run(self: Box<Self>);
}

impl<F> StageTask for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>) {
        (*self)()
    }
}

/// An execution context that runs submitted work asynchronously.
pub trait Stage: Send + Sync + 'static {
    /// Accepts `task` for later execution. Must not run it inline.
    fn execute(&self, task: Box<dyn StageTask>);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a stage.
pub type StageRef = Arc<dyn Stage>;

/// True when both handles point at the same stage instance.
#[inline]
pub fn same_stage(a: &StageRef, b: &StageRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Stage backed by a tokio runtime.
///
/// Every task is spawned through a shared [`TaskTracker`]; clones share it.
/// Panics inside a task are caught and logged instead of aborting the worker.
#[derive(Clone, Debug)]
pub struct TokioStage {
    name: Arc<str>,
    handle: Handle,
    tracker: TaskTracker,
}

impl TokioStage {
    /// Creates a stage spawning onto `handle`.
    pub fn new(name: impl Into<Arc<str>>, handle: Handle) -> Self {
        Self {
            name: name.into(),
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Creates a stage on the runtime the caller is running in.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime, like [`Handle::current`].
    pub fn current(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Handle::current())
    }

    /// Tracker of every task this stage has spawned.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }
}

impl Stage for TokioStage {
    fn execute(&self, task: Box<dyn StageTask>) {
        let name = Arc::clone(&self.name);
        self.tracker.spawn_on(
            async move {
                let run = AssertUnwindSafe(async move { task.run() });
                if let Err(panic_err) = run.catch_unwind().await {
                    tracing::error!(
                        stage = %name,
                        info = %panic_message(&*panic_err),
                        "stage task panicked"
                    );
                }
            },
            &self.handle,
        );
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Stage that queues work until its [`StageQueue`] is drained.
#[derive(Debug)]
pub struct QueueStage {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Box<dyn StageTask>>,
}

/// Receiving half of a [`QueueStage`].
pub struct StageQueue {
    rx: mpsc::UnboundedReceiver<Box<dyn StageTask>>,
}

impl QueueStage {
    /// Creates a stage and the queue that feeds it.
    pub fn new(name: impl Into<Arc<str>>) -> (Self, StageQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.into(),
                tx,
            },
            StageQueue { rx },
        )
    }
}

impl Stage for QueueStage {
    fn execute(&self, task: Box<dyn StageTask>) {
        if self.tx.send(task).is_err() {
            tracing::warn!(stage = %self.name, "stage queue closed; task dropped");
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl StageQueue {
    /// Runs queued tasks on the calling thread until the queue is empty,
    /// including tasks queued by the tasks it runs. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task.run();
            ran += 1;
        }
        ran
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl std::fmt::Debug for StageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageQueue")
            .field("len", &self.rx.len())
            .finish()
    }
}
