//! Sync plan generation

use super::diff::Diff;
use crate::types::{PlannedAction, SyncAction};

/// A complete sync plan
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Store mutations, uploads first
    pub actions: Vec<PlannedAction>,
    /// Source entries that need no work
    pub skipped: usize,
}

impl SyncPlan {
    /// Get counts by action type
    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts {
            skips: self.skipped,
            ..Default::default()
        };
        for action in &self.actions {
            match action.action {
                SyncAction::Upload => counts.uploads += 1,
                SyncAction::Delete => counts.deletes += 1,
            }
        }
        counts
    }

    /// Whether the plan mutates nothing
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Counts of actions in a sync plan
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanCounts {
    pub uploads: usize,
    pub deletes: usize,
    pub skips: usize,
}

/// Generate a sync plan from a diff
pub fn generate_plan(diff: Diff) -> SyncPlan {
    let mut actions = Vec::with_capacity(diff.to_upload.len() + diff.to_delete.len());

    actions.extend(
        diff.to_upload
            .into_iter()
            .map(|e| PlannedAction::new(e, SyncAction::Upload)),
    );
    actions.extend(
        diff.to_delete
            .into_iter()
            .map(|e| PlannedAction::new(e, SyncAction::Delete)),
    );

    SyncPlan {
        actions,
        skipped: diff.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceFile;

    #[test]
    fn test_generate_plan_orders_uploads_first() {
        let diff = Diff {
            to_upload: vec![SourceFile::new("u", "2026-01-01T00:00:00Z", "https://x/u")],
            to_delete: vec![SourceFile::new("d", "2025-01-01T00:00:00Z", "https://x/d")],
            skipped: 4,
        };

        let plan = generate_plan(diff);
        assert_eq!(plan.actions[0].action, SyncAction::Upload);
        assert_eq!(plan.actions[1].action, SyncAction::Delete);
        assert_eq!(
            plan.counts(),
            PlanCounts {
                uploads: 1,
                deletes: 1,
                skips: 4
            }
        );
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_empty_plan() {
        let plan = generate_plan(Diff::default());
        assert!(plan.is_empty());
        assert_eq!(plan.counts(), PlanCounts::default());
    }
}
