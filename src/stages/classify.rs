use crate::jenkins::Stage;

use super::StageVisit;

/// Which hydrated stages are worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every stage without children.
    AllLeaves,
    /// FAILED or ABORTED stages none of whose direct children failed.
    ///
    /// A grouping stage is often marked failed only because a descendant failed; this keeps
    /// just the deepest failing stage.
    FailedLeaves,
}

impl Selection {
    pub fn includes(self, stage: &Stage) -> bool {
        match self {
            Self::AllLeaves => stage.children.is_empty(),
            Self::FailedLeaves => stage.status.is_failure() && !stage.has_failed_child(),
        }
    }
}

/// Filter visits in traversal order.
pub fn select(visits: &[StageVisit], selection: Selection) -> Vec<&StageVisit> {
    visits
        .iter()
        .filter(|visit| selection.includes(&visit.stage))
        .collect()
}
