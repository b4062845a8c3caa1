//! Matching an in-flight transfer to its task and aggregating its
//! per-file state into one progress snapshot.

use crate::clients::peer_search::TransferState;
use std::collections::HashMap;

const COMPLETED_FLAGS: &[&str] = &["completed", "succeeded"];
const ERROR_FLAGS: &[&str] = &["errored", "cancelled", "canceled", "timedout", "rejected", "failed"];

pub fn normalize_directory(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_string()
}

fn state_tokens(state: &str) -> Vec<String> {
    state.split(',').map(|s| s.trim().to_lowercase()).collect()
}

fn is_completed_state(state: &str) -> bool {
    state_tokens(state).iter().any(|t| COMPLETED_FLAGS.contains(&t.as_str()))
}

fn is_error_state(state: &str) -> bool {
    state_tokens(state).iter().any(|t| ERROR_FLAGS.contains(&t.as_str()))
}

fn is_terminal_state(state: &str) -> bool {
    is_completed_state(state) || is_error_state(state)
}

#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub files_completed: i64,
    pub files_total: i64,
    pub bytes_transferred: i64,
    pub bytes_total: i64,
    pub average_speed: u64,
}

#[derive(Debug, Clone)]
pub enum ProgressOutcome {
    InProgress(ProgressSnapshot),
    Completed(ProgressSnapshot),
    Failed { snapshot: ProgressSnapshot, message: String },
}

/// Matches a transfer to a task by `(peer_username, peer_directory)`,
/// where the directory is normalized before comparison.
pub fn matches_task(transfer: &TransferState, peer_username: &str, peer_directory: &str) -> bool {
    transfer.username == peer_username && normalize_directory(&transfer.directory) == normalize_directory(peer_directory)
}

pub fn aggregate(transfer: &TransferState) -> ProgressOutcome {
    let files_total = transfer.files.len() as i64;
    let files_completed = transfer.files.iter().filter(|f| is_completed_state(&f.state)).count() as i64;
    let bytes_transferred: i64 = transfer.files.iter().map(|f| f.bytes_transferred as i64).sum();
    let bytes_total: i64 = transfer.files.iter().map(|f| f.size as i64).sum();
    let average_speed: u64 = transfer
        .files
        .iter()
        .filter(|f| !is_terminal_state(&f.state))
        .filter_map(|f| f.speed)
        .sum();

    let snapshot = ProgressSnapshot { files_completed, files_total, bytes_transferred, bytes_total, average_speed };

    let all_completed = files_total > 0 && transfer.files.iter().all(|f| is_completed_state(&f.state));
    let all_terminal = files_total > 0 && transfer.files.iter().all(|f| is_terminal_state(&f.state));
    let any_error = transfer.files.iter().any(|f| is_error_state(&f.state));
    let all_bytes_transferred = bytes_total > 0 && bytes_transferred >= bytes_total;

    if all_completed || (all_bytes_transferred && !any_error) {
        return ProgressOutcome::Completed(snapshot);
    }
    if all_terminal && any_error {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for f in &transfer.files {
            *counts.entry(f.state.clone()).or_insert(0) += 1;
        }
        let mut parts: Vec<String> = counts.into_iter().map(|(state, count)| format!("{}: {}", state, count)).collect();
        parts.sort();
        return ProgressOutcome::Failed { snapshot, message: parts.join(", ") };
    }

    ProgressOutcome::InProgress(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::peer_search::TransferFileState;

    fn transfer(files: Vec<(&str, &str, u64, u64)>) -> TransferState {
        TransferState {
            username: "peer".into(),
            directory: "Album".into(),
            files: files
                .into_iter()
                .map(|(name, state, transferred, size)| TransferFileState {
                    filename: name.into(), state: state.into(), bytes_transferred: transferred, size, speed: Some(100),
                })
                .collect(),
        }
    }

    #[test]
    fn directory_normalization_ignores_separator_style_and_trailing_slash() {
        assert_eq!(normalize_directory("Music\\Album\\"), "Music/Album");
        assert_eq!(normalize_directory("Music/Album/"), "Music/Album");
    }

    #[test]
    fn all_completed_files_yields_completed_outcome() {
        let t = transfer(vec![("01.flac", "Completed, Succeeded", 100, 100), ("02.flac", "Succeeded", 100, 100)]);
        assert!(matches!(aggregate(&t), ProgressOutcome::Completed(_)));
    }

    #[test]
    fn any_error_after_all_terminal_yields_failed_with_message() {
        let t = transfer(vec![("01.flac", "Succeeded", 100, 100), ("02.flac", "Errored", 0, 100)]);
        match aggregate(&t) {
            ProgressOutcome::Failed { message, .. } => {
                assert!(message.contains("Errored"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn still_transferring_is_in_progress() {
        let t = transfer(vec![("01.flac", "InProgress", 50, 100)]);
        assert!(matches!(aggregate(&t), ProgressOutcome::InProgress(_)));
    }
}
