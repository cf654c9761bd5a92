//! Async task poller
//!
//! Mutating calls return a task ID; the change is only visible once the task
//! reaches a terminal state. `wait_for_task` polls until then and hands the
//! finished task to a caller-supplied extractor that turns task metadata into
//! the operation's result.
//!
//! An extractor can answer `Error::NotReady` to request another poll. Delete
//! uses this to wait until the pool stops listing the removed member, which
//! can lag behind the task finishing.

use std::future::Future;
use std::time::Duration;

use cloud_api::{CloudApi, TaskInfo, TaskState};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Interval between task status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How `wait_for_task` polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Fail as soon as the task reports `ERROR`. When false the errored task is
    /// passed to the extractor, which decides the outcome.
    pub stop_on_task_error: bool,
    /// Total wait budget across all polls.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            stop_on_task_error: true,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Poll `task_id` until it is terminal, then return what `extract` makes of it.
///
/// - Transport errors while fetching the task are wrapped with the task ID and
///   returned without retry.
/// - A task in `ERROR` state fails with `Error::TaskFailed` (unless
///   `stop_on_task_error` is off).
/// - `Error::NotReady` from the extractor schedules another poll; any other
///   extractor error is returned as is.
/// - Exceeding `options.timeout` returns `Error::Timeout`.
pub async fn wait_for_task<A, T, F, Fut>(
    api: &A,
    task_id: &str,
    options: WaitOptions,
    mut extract: F,
) -> Result<T>
where
    A: CloudApi + ?Sized,
    F: FnMut(TaskInfo) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    // A budget past the clock's range never expires.
    let deadline = Instant::now().checked_add(options.timeout);
    let mut last_pending: Option<String> = None;

    loop {
        let task = api
            .get_task(task_id)
            .await
            .map_err(|source| Error::TaskFetch {
                task_id: task_id.to_string(),
                source,
            })?;
        metrics::counter!("lbmember_task_polls_total").increment(1);
        debug!(task_id, state = %task.state, "polled task");

        match task.state {
            TaskState::New | TaskState::Running => {}
            TaskState::Error if options.stop_on_task_error => {
                let detail = task
                    .error
                    .unwrap_or_else(|| String::from("no error detail reported"));
                warn!(task_id, error = %detail, "task failed");
                record_outcome("failed");
                return Err(Error::TaskFailed {
                    task_id: task_id.to_string(),
                    detail,
                });
            }
            TaskState::Finished | TaskState::Error => match extract(task).await {
                Ok(value) => {
                    record_outcome("finished");
                    return Ok(value);
                }
                Err(Error::NotReady(reason)) => {
                    debug!(task_id, reason = %reason, "task finished, result not ready yet");
                    last_pending = Some(reason);
                }
                Err(e) => {
                    record_outcome("extraction_failed");
                    return Err(e);
                }
            },
        }

        let now = Instant::now();
        let pause = match deadline {
            Some(deadline) if now >= deadline => {
                warn!(
                    task_id,
                    timeout_secs = options.timeout.as_secs(),
                    "gave up waiting for task"
                );
                record_outcome("timeout");
                return Err(Error::Timeout {
                    task_id: task_id.to_string(),
                    timeout_secs: options.timeout.as_secs(),
                    last_pending,
                });
            }
            Some(deadline) => options.poll_interval.min(deadline - now),
            None => options.poll_interval,
        };
        tokio::time::sleep(pause).await;
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("lbmember_task_outcomes_total", "outcome" => outcome).increment(1);
}

/// Parse the affected member ID out of a finished task.
///
/// The remote reports it as the first entry of `created_resources.members`.
pub fn extract_member_id(task: &TaskInfo) -> Result<String> {
    let extraction_error = |reason: &str| Error::Extraction {
        task_id: task.id.clone(),
        what: "pool member ID",
        reason: reason.to_string(),
        raw: serde_json::to_string(task).unwrap_or_else(|e| format!("<unprintable task: {e}>")),
    };

    let resources = task
        .created_resources
        .as_ref()
        .ok_or_else(|| extraction_error("task has no created_resources"))?;
    let members = resources
        .get("members")
        .and_then(|m| m.as_array())
        .ok_or_else(|| extraction_error("created_resources has no members list"))?;
    let first = members
        .first()
        .ok_or_else(|| extraction_error("members list is empty"))?;
    first
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| extraction_error("member ID is not a string"))
}
