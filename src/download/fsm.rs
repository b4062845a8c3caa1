//! The download-task state machine. This module owns only the
//! legal-transition table and the small pieces of state it carries;
//! driving the transitions from real peer-search/transfer data is
//! `engine`'s job.

use crate::persistence::DownloadStatus;

/// Why a transition was attempted, so illegal ones can be logged with
/// context instead of silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PickUp,
    SearchResultsSingleOrAuto,
    SearchResultsNeedSelection,
    Select,
    SelectionExpired,
    RetrySearch,
    PeerAcked,
    TransferCompleted,
    RetryBackoffElapsed,
    /// A step failed (empty search, rejected candidates, peer/transfer
    /// error) and the task still has retries left.
    StepFailedRetryable,
    /// A step failed and retries are exhausted.
    StepFailedExhausted,
}

/// Returns the resulting state if `trigger` is legal from `from`, or
/// `None` if the transition is not reachable — every state this task
/// can ever be in is reachable only through the transitions listed
/// here.
pub fn apply(from: DownloadStatus, trigger: Trigger) -> Option<DownloadStatus> {
    use DownloadStatus::*;
    use Trigger::*;
    match (from, trigger) {
        (Pending, PickUp) => Some(Searching),

        (Searching, SearchResultsSingleOrAuto) => Some(Queued),
        (Searching, SearchResultsNeedSelection) => Some(PendingSelection),
        (Searching, StepFailedRetryable) => Some(Deferred),
        (Searching, StepFailedExhausted) => Some(Failed),

        (PendingSelection, Select) => Some(Queued),
        (PendingSelection, SelectionExpired) => Some(Failed),
        (PendingSelection, RetrySearch) => Some(Searching),
        (PendingSelection, SearchResultsSingleOrAuto) => Some(Queued),
        (PendingSelection, SearchResultsNeedSelection) => Some(PendingSelection),
        (PendingSelection, StepFailedRetryable) => Some(Deferred),
        (PendingSelection, StepFailedExhausted) => Some(Failed),

        (Deferred, RetryBackoffElapsed) => Some(Searching),

        (Queued, PeerAcked) => Some(Downloading),
        (Queued, RetrySearch) => Some(Searching),
        (Queued, StepFailedRetryable) => Some(Deferred),
        (Queued, StepFailedExhausted) => Some(Failed),

        (Downloading, TransferCompleted) => Some(Completed),
        (Downloading, StepFailedRetryable) => Some(Deferred),
        (Downloading, StepFailedExhausted) => Some(Failed),

        _ => None,
    }
}

pub fn is_non_terminal(status: DownloadStatus) -> bool {
    !status.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use DownloadStatus::*;
    use Trigger::*;

    #[test]
    fn pending_only_advances_via_pick_up() {
        assert_eq!(apply(Pending, PickUp), Some(Searching));
        assert_eq!(apply(Pending, Select), None);
    }

    #[test]
    fn searching_branches_on_selection_mode() {
        assert_eq!(apply(Searching, SearchResultsSingleOrAuto), Some(Queued));
        assert_eq!(apply(Searching, SearchResultsNeedSelection), Some(PendingSelection));
        assert_eq!(apply(Searching, StepFailedRetryable), Some(Deferred));
        assert_eq!(apply(Searching, StepFailedExhausted), Some(Failed));
    }

    #[test]
    fn pending_selection_expires_to_failed() {
        assert_eq!(apply(PendingSelection, SelectionExpired), Some(Failed));
        assert_eq!(apply(PendingSelection, Select), Some(Queued));
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        assert_eq!(apply(Completed, PickUp), None);
        assert_eq!(apply(Failed, RetryBackoffElapsed), None);
    }

    #[test]
    fn deferred_returns_to_searching_after_backoff() {
        assert_eq!(apply(Deferred, RetryBackoffElapsed), Some(Searching));
    }
}
