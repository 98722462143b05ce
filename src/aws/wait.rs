//! Waits for a snapshot import task to settle.

use tracing::info;

use super::ec2::Ec2Cli;
use super::types::ImportSnapshotTask;
use crate::error::{Elapsed, OpsError};
use crate::poll::{Pause, PollPolicy, PollStatus, poll_until};
use crate::process::CommandRunner;

const COMPLETED: &str = "completed";
const FAILURE_STATES: [&str; 3] = ["deleted", "deleting", "failed"];
pub(super) const IMPORT_OPERATION: &str = "snapshot import";

/// Classifies one `describe-import-snapshot-tasks` response.
///
/// Any entry in a failure state fails the wait; every entry `completed`
/// finishes it with the first snapshot id. An empty response is pending.
pub(super) fn classify(tasks: &[ImportSnapshotTask]) -> PollStatus<Option<String>> {
    if let Some(failed) = tasks.iter().find(|task| {
        FAILURE_STATES.contains(&task.snapshot_task_detail.status.as_str())
    }) {
        let detail = &failed.snapshot_task_detail;
        return PollStatus::Failed(detail.status_message.as_ref().map_or_else(
            || detail.status.clone(),
            |message| format!("{}: {message}", detail.status),
        ));
    }
    if !tasks.is_empty()
        && tasks
            .iter()
            .all(|task| task.snapshot_task_detail.status == COMPLETED)
    {
        return PollStatus::Ready(
            tasks
                .iter()
                .find_map(|task| task.snapshot_task_detail.snapshot_id.clone()),
        );
    }
    PollStatus::Pending
}

/// Validates the task handle with one describe call, then polls until the
/// import settles. Returns the imported snapshot id.
pub(super) async fn wait_for_snapshot<R: CommandRunner>(
    ec2: &Ec2Cli<R>,
    task_id: &str,
    policy: PollPolicy,
    pause: &dyn Pause,
) -> Result<String, OpsError> {
    ec2.describe_import_snapshot_tasks(task_id)?;
    info!(
        task = task_id,
        "waiting for snapshot - can take like 5min...."
    );

    let outcome = poll_until(IMPORT_OPERATION, policy, pause, || {
        let status = ec2
            .describe_import_snapshot_tasks(task_id)
            .map(|tasks| classify(&tasks));
        std::future::ready(status)
    })
    .await?;

    info!(
        task = task_id,
        attempts = outcome.attempts,
        "import done - took {}",
        Elapsed(outcome.elapsed)
    );
    outcome.value.ok_or_else(|| OpsError::Provider {
        message: format!("import task {task_id} completed without a snapshot id"),
    })
}
