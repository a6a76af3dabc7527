use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;

use crate::errors::Error;
use crate::pause;
use crate::render::TransitionHandle;
use crate::resolve::Apply;
use crate::scheduler::Scheduler;

/// Lifecycle of the task walking the keyframes of one snippet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunnerState {
    /// Spawned, waiting for its start.
    Idle,
    /// Preparing the next keyframe boundary.
    Running,
    /// Transitions issued: waiting for all of them to complete.
    Awaiting,
    /// Wrapped to the start of a looping snippet.
    Looping,
    Completed,
    Cancelled,
}

impl RunnerState {
    /// Indicates if the runner task is still alive.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunnerState::Idle | RunnerState::Running | RunnerState::Awaiting | RunnerState::Looping
        )
    }
}

/// What a runner does next.
pub(crate) enum Step {
    /// The runner was replaced, or its snippet removed.
    Gone,
    /// No keyframe left.
    End,
    Boundary {
        time: f64,
        next: f64,
        epoch: u64,
        applies: Vec<Apply>,
    },
}

/// Outcome of a boundary once its transitions are done.
pub(crate) enum Commit {
    Advanced,
    /// A seek moved the snippet meanwhile.
    Outdated,
    Gone,
}

/// Outcome of the end of a curve.
pub(crate) enum Finish {
    Looped,
    Completed,
    Gone,
}

/// Walks the keyframe boundaries of a snippet: issues one transition per channel for the next
/// boundary, waits for all of them, moves on. Loops or completes at the end of the curves.
///
/// `halted` holds the runner at the next boundary while true (paused snippet or scheduler).
pub(crate) async fn run(
    scheduler: Scheduler,
    name: String,
    id: u64,
    mut halted: watch::Receiver<bool>,
    delay_ms: u64,
) -> Result<(), Error> {
    if delay_ms > 0 {
        pause!(delay_ms);
        if !scheduler.begin(&name, id) {
            return Ok(());
        }
    }

    let mut time_applied = false;
    loop {
        if halted.wait_for(|halted| !*halted).await.is_err() {
            break;
        }

        match scheduler.plan(&name, id, time_applied) {
            Step::Gone => break,
            Step::End => match scheduler.finish(&name, id) {
                Finish::Looped => time_applied = false,
                Finish::Completed | Finish::Gone => break,
            },
            Step::Boundary {
                time,
                next,
                epoch,
                applies,
            } => {
                log::trace!(
                    "Snippet '{}': {} transition(s) from {}s to {}s",
                    name,
                    applies.len(),
                    time,
                    next
                );
                let handles = match scheduler.issue(&name, id, &applies) {
                    Some(handles) => handles,
                    None => break,
                };

                join_all(handles.iter().map(TransitionHandle::finished)).await;
                tokio::task::yield_now().await;

                match scheduler.commit(&name, id, next, epoch) {
                    Commit::Advanced | Commit::Outdated => time_applied = true,
                    Commit::Gone => break,
                }
            }
        }
    }
    log::debug!("Runner #{} of snippet '{}' is done", id, name);
    Ok(())
}
