//! Run state and outcome reporting.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pipeline run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RunStatus {
    /// No run started yet
    Idle,
    /// Frame loop in progress
    Running,
    /// Source exhausted, all closed segments finalized
    Completed,
    /// Cooperative cancellation honored
    Cancelled,
    /// Setup failed before any segment was created
    Failed,
}

impl RunStatus {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed
        )
    }
}

/// Completion signal for a run.
///
/// Audio-merge failures are non-fatal per part; the count is surfaced here
/// so callers are not limited to log scraping.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunOutcome {
    /// Terminal state of the run
    pub status: RunStatus,
    /// Last progress percentage emitted (exactly 100 on natural completion)
    pub final_progress: u8,
    /// Frames read from the source before termination
    pub frames_read: u64,
    /// Parts finalized with audio attached
    pub parts_finalized: u32,
    /// Parts whose audio merge failed (finalized file absent)
    pub audio_merge_failures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Idle.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
