use serde::Serialize;

use crate::model::forest::Forest;
use crate::model::task::TaskId;
use crate::ops::traversal::PreOrder;

/// Aggregate counts over a subtree or the whole forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// e.g. `"50.0%"`; `"0.0%"` when there are no tasks
    pub completion_rate: String,
    /// Deepest level reached, roots at depth 1; 0 when there are no tasks
    pub max_depth: usize,
}

impl TaskStats {
    pub fn from_counts(total_tasks: usize, completed_tasks: usize, max_depth: usize) -> Self {
        TaskStats {
            total_tasks,
            completed_tasks,
            completion_rate: completion_rate(completed_tasks, total_tasks),
            max_depth,
        }
    }

    pub fn empty() -> Self {
        Self::from_counts(0, 0, 0)
    }
}

/// Stats for the subtree rooted at `root`. An absent root counts as empty.
pub fn task_stats(forest: &Forest, root: &TaskId) -> TaskStats {
    collect(PreOrder::new(forest, root))
}

/// Stats for every root tree combined: counts are summed, depth is the
/// maximum over the roots.
pub fn forest_stats(forest: &Forest) -> TaskStats {
    collect(PreOrder::forest(forest))
}

/// Per-root stats in display order
pub fn root_stats(forest: &Forest) -> Vec<(TaskId, TaskStats)> {
    forest
        .roots()
        .iter()
        .map(|id| (id.clone(), task_stats(forest, id)))
        .collect()
}

/// `completed / total` as a percentage with one decimal, rounded half up.
///
/// Works in tenths of a percent on integers so ties such as 1/16 = 6.25%
/// always round to `"6.3%"`.
pub fn completion_rate(completed: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    let completed = completed as u128;
    let total = total as u128;
    let tenths = (completed * 2000 + total) / (total * 2);
    format!("{}.{}%", tenths / 10, tenths % 10)
}

fn collect(walk: PreOrder<'_>) -> TaskStats {
    let mut total = 0;
    let mut completed = 0;
    let mut max_depth = 0;
    for (depth, task) in walk {
        total += 1;
        if task.completed() {
            completed += 1;
        }
        max_depth = max_depth.max(depth);
    }
    TaskStats::from_counts(total, completed, max_depth)
}
