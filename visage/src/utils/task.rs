//! Task plumbing of the visage runtime.
//!
//! Snippet runners, tweens and delays all run as tokio tasks spawned through [`run`]. Under
//! `#[visage::runtime]`, every such task registers its completion with a process-wide registry,
//! and the runtime drains that registry ([`wait_for_tasks`]) before returning.
use std::future::Future;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;

use crate::errors::{Error, RuntimeError, Unknown};

/// Outcome reported by a finished task.
///
/// A task may return either `()` or `Result<(), Error>`: both convert into a `TaskResult`.
pub enum TaskResult {
    Ok,
    Err(Error),
}

/// Handle on a spawned task (a snippet runner for instance). Aborting it cancels the task.
pub type TaskHandler = JoinHandle<Result<(), Error>>;

type Completion = oneshot::Receiver<TaskResult>;

/// Completions of the tasks the runtime still has to wait for.
struct Registry {
    sender: UnboundedSender<Completion>,
    pending: Mutex<UnboundedReceiver<Completion>>,
}

static REGISTRY: OnceCell<Registry> = OnceCell::const_new();

impl From<Result<(), Error>> for TaskResult {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => TaskResult::Ok,
            Err(err) => TaskResult::Err(err),
        }
    }
}

impl From<()> for TaskResult {
    fn from(_: ()) -> Self {
        TaskResult::Ok
    }
}

/// Opens the task registry. `#[visage::runtime]` calls it before running its body.
pub async fn init_task_channel() {
    REGISTRY
        .get_or_init(|| async {
            let (sender, pending) = mpsc::unbounded_channel();
            Registry {
                sender,
                pending: Mutex::new(pending),
            }
        })
        .await;
}

/// Waits for every task registered through [`run`], including the ones spawned while waiting.
///
/// Failed tasks are logged. An aborted task (a cancelled runner) reports nothing and is skipped.
pub async fn wait_for_tasks() {
    let registry = match REGISTRY.get() {
        Some(registry) => registry,
        None => return,
    };

    let mut pending = registry.pending.lock().await;
    while let Ok(completion) = pending.try_recv() {
        if let Ok(TaskResult::Err(err)) = completion.await {
            log::error!("Task failed: {}", err);
        }
    }
}

/// Spawns a future as a tokio task.
///
/// Under `#[visage::runtime]` the task is registered and the runtime will not return before it is
/// done (or aborted). Under a bare tokio runtime the task is spawned untracked.
///
/// # Errors
/// * `RuntimeError`: no tokio runtime is running on this thread.
/// * `Unknown`: the task registry is closed.
///
/// # Example
/// ```
/// use visage::utils::task;
///
/// #[visage::runtime]
/// async fn main() {
///     task::run(async move {
///         visage::pause!(100);
///         println!("Blink done");
///     }).unwrap();
/// }
/// ```
pub fn run<F, T>(future: F) -> Result<TaskHandler, Error>
where
    F: Future<Output = T> + Send + 'static,
    T: Into<TaskResult> + Send + 'static,
{
    tokio::runtime::Handle::try_current().map_err(|_| RuntimeError)?;

    let (done, completion) = oneshot::channel();
    let handler = tokio::spawn(async move {
        // Nobody listens under a bare tokio runtime.
        let _ = done.send(future.await.into());
        Ok(())
    });

    match REGISTRY.get() {
        Some(registry) => registry
            .sender
            .send(completion)
            .map_err(|err| Unknown {
                info: err.to_string(),
            })?,
        None => log::trace!("Task spawned outside #[visage::runtime]: untracked"),
    }

    Ok(handler)
}

/// Sleeps for the given number of milliseconds (async).
#[macro_export]
macro_rules! pause {
    ($ms:expr) => {
        $crate::utils::tokio::time::sleep($crate::utils::tokio::time::Duration::from_millis(
            $ms as u64,
        ))
        .await
    };
}

/// Blocks the current thread for the given number of milliseconds.
#[macro_export]
macro_rules! pause_sync {
    ($ms:expr) => {
        std::thread::sleep(std::time::Duration::from_millis($ms as u64))
    };
}
