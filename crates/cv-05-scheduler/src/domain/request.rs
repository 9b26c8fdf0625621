//! Anchor request entity and its state machine.

use crate::error::SchedulerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::AnchorClass;
use std::fmt;

/// Status of one anchor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting to be batched.
    Pending,
    /// Assigned to a sealed batch.
    Batched,
    /// The batch is being processed by the orchestrator.
    Processing,
    /// Anchored successfully.
    Completed,
    /// Terminal failure (retries exhausted).
    Failed,
}

impl RequestStatus {
    /// Whether `self → next` is a legal transition.
    ///
    /// `Processing → Pending` is the retry path; it is only taken while
    /// retries remain.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Batched)
                | (Batched, Processing)
                | (Processing, Completed)
                | (Processing, Pending)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Batched => "batched",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One queued anchor request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRequest {
    /// Request identifier.
    pub request_id: String,
    /// Proof the request belongs to.
    pub proof_id: String,
    /// Source-ledger account URL.
    pub account_url: String,
    /// Source-ledger transaction hash.
    pub tx_hash: String,
    /// Anchor class.
    pub class: AnchorClass,
    /// Target chain name.
    pub target_chain: String,
    /// Current status.
    pub status: RequestStatus,
    /// Retry attempts so far.
    pub retry_count: u32,
    /// When the request was submitted.
    pub submitted_at: DateTime<Utc>,
    /// When the request next becomes due.
    pub next_attempt_at: DateTime<Utc>,
    /// Batch the request was sealed into, once batched.
    pub batch_id: Option<String>,
    /// Last failure reason, if any.
    pub last_error: Option<String>,
}

impl AnchorRequest {
    /// Apply a validated status transition.
    pub fn transition(&mut self, next: RequestStatus) -> Result<(), SchedulerError> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Resolution of a processed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// Batch not yet resolved.
    InFlight,
    /// Anchored on chain.
    Completed {
        /// Anchor transaction hash.
        anchor_tx_hash: String,
        /// Anchor block number.
        block_number: u64,
    },
    /// Processing failed; members were re-queued or terminated.
    Failed {
        /// Failure reason.
        reason: String,
    },
}

impl BatchOutcome {
    /// Whether the batch has been resolved.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, BatchOutcome::InFlight)
    }
}
