//! sync::status
//!
//! Read-only comparison of the local snapshot against the remote head.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::types::ObjectId;
use crate::sync::snapshot::SyncSnapshot;

/// Where a binding stands relative to its remote branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// The remote branch holds commits this binding did not publish
    pub has_remote_changes: bool,
    /// Commit recorded by the last successful push
    pub local_commit: Option<ObjectId>,
    /// Current remote head
    pub remote_commit: Option<ObjectId>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Suggested next step for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAdvice {
    /// Remote matches the last push
    InSync,
    /// Remote moved; a forced push would overwrite it
    RemoteAhead,
    /// The pushed branch no longer exists on the remote
    RemoteMissing,
    /// Nothing has been published yet
    NeverPushed,
}

impl SyncStatus {
    /// Compare a snapshot with the remote head.
    pub fn compute(snapshot: &SyncSnapshot, remote: Option<ObjectId>) -> Self {
        let has_remote_changes = match (&remote, &snapshot.last_commit) {
            (None, None) => false,
            (None, Some(_)) | (Some(_), None) => true,
            (Some(remote), Some(local)) => remote != local,
        };
        Self {
            has_remote_changes,
            local_commit: snapshot.last_commit.clone(),
            remote_commit: remote,
            last_synced_at: snapshot.last_synced_at,
        }
    }

    pub fn advice(&self) -> StatusAdvice {
        if self.local_commit.is_none() {
            StatusAdvice::NeverPushed
        } else if self.remote_commit.is_none() {
            StatusAdvice::RemoteMissing
        } else if self.has_remote_changes {
            StatusAdvice::RemoteAhead
        } else {
            StatusAdvice::InSync
        }
    }
}
