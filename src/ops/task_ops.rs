use std::collections::HashSet;

use crate::model::forest::{Forest, LinkError};
use crate::model::task::{Task, TaskId, TaskPatch};

/// Error type for task operations.
///
/// Every operation that returns an error has left the forest unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),
    #[error("id prefix '{prefix}' is ambiguous ({count} matches)")]
    Ambiguous { prefix: String, count: usize },
    #[error("invalid move: {0}")]
    InvalidMove(String),
}

impl From<LinkError> for TaskError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::UnknownParent(id) => TaskError::NotFound(id),
            LinkError::DuplicateId(id) => TaskError::DuplicateId(id),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Create a detached task with a fresh id. The title is trimmed and must not
/// be empty.
pub fn create_task(title: &str, description: &str) -> Result<Task, TaskError> {
    let title = validate_title(title)?;
    Ok(Task::new(TaskId::generate(), title).with_description(description))
}

/// Build a forest from nested tasks, e.g. freshly parsed from disk.
/// Fails on the first repeated id.
pub fn forest_from_tasks(tasks: Vec<Task>) -> Result<Forest, TaskError> {
    let mut forest = Forest::new();
    for task in tasks {
        forest.insert_subtree(None, task)?;
    }
    Ok(forest)
}

/// Depth-first search of nested tasks: each root, then its children left to
/// right. The first match wins.
pub fn find_by_id<'a>(tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
    let mut stack: Vec<&Task> = tasks.iter().rev().collect();
    while let Some(task) = stack.pop() {
        if task.id == *id {
            return Some(task);
        }
        stack.extend(task.children.iter().rev());
    }
    None
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Append a new root task. Returns the assigned id.
pub fn add_root(forest: &mut Forest, title: &str, description: &str) -> Result<TaskId, TaskError> {
    let task = create_task(title, description)?;
    let id = task.id.clone();
    forest.insert_subtree(None, task)?;
    Ok(id)
}

/// Append a new child as the last subtask of `parent_id`. Returns the assigned id.
pub fn add_child(
    forest: &mut Forest,
    parent_id: &TaskId,
    title: &str,
    description: &str,
) -> Result<TaskId, TaskError> {
    if !forest.contains(parent_id) {
        return Err(TaskError::NotFound(parent_id.clone()));
    }
    let task = create_task(title, description)?;
    let id = task.id.clone();
    forest.insert_subtree(Some(parent_id), task)?;
    Ok(id)
}

/// Delete a task together with its whole subtree, wherever it sits.
/// Returns the removed subtree.
pub fn delete_task(forest: &mut Forest, task_id: &TaskId) -> Result<Task, TaskError> {
    forest
        .remove_subtree(task_id)
        .ok_or_else(|| TaskError::NotFound(task_id.clone()))
}

/// Apply a partial update to one task. The title is validated before anything
/// is written.
pub fn edit_task(forest: &mut Forest, task_id: &TaskId, patch: TaskPatch) -> Result<(), TaskError> {
    let title = patch.title.as_deref().map(validate_title).transpose()?;
    let node = forest
        .node_mut(task_id)
        .ok_or_else(|| TaskError::NotFound(task_id.clone()))?;
    if let Some(title) = title {
        node.title = title;
    }
    if let Some(description) = patch.description {
        node.description = description;
    }
    if let Some(completed) = patch.completed {
        node.completed = completed;
    }
    Ok(())
}

/// Flip the completion flag of one task. Children are not touched.
/// Returns the new value.
pub fn toggle_task(forest: &mut Forest, task_id: &TaskId) -> Result<bool, TaskError> {
    let node = forest
        .node_mut(task_id)
        .ok_or_else(|| TaskError::NotFound(task_id.clone()))?;
    node.completed = !node.completed;
    Ok(node.completed)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Where to place a task among its siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    /// First sibling
    Top,
    /// Last sibling
    Bottom,
    /// Directly after the sibling with this id
    After(TaskId),
    /// At this index once the task has been lifted out (clamped to the end)
    Index(usize),
}

/// Replace the root sequence. `new_order` must be a permutation of the
/// current root ids.
pub fn reorder_roots(forest: &mut Forest, new_order: &[TaskId]) -> Result<(), TaskError> {
    apply_order(forest, None, new_order)
}

/// Replace one task's children sequence. `new_order` must be a permutation
/// of its current children.
pub fn reorder_children(
    forest: &mut Forest,
    parent_id: &TaskId,
    new_order: &[TaskId],
) -> Result<(), TaskError> {
    if !forest.contains(parent_id) {
        return Err(TaskError::NotFound(parent_id.clone()));
    }
    apply_order(forest, Some(parent_id), new_order)
}

/// Move a task among its siblings.
pub fn move_task(
    forest: &mut Forest,
    task_id: &TaskId,
    position: InsertPosition,
) -> Result<(), TaskError> {
    let parent = forest
        .node(task_id)
        .ok_or_else(|| TaskError::NotFound(task_id.clone()))?
        .parent
        .clone();
    let mut order: Vec<TaskId> = forest
        .siblings(parent.as_ref())
        .unwrap_or_default()
        .iter()
        .filter(|id| *id != task_id)
        .cloned()
        .collect();

    let idx = match &position {
        InsertPosition::Top => 0,
        InsertPosition::Bottom => order.len(),
        InsertPosition::After(after_id) => {
            order
                .iter()
                .position(|id| id == after_id)
                .ok_or_else(|| TaskError::NotFound(after_id.clone()))?
                + 1
        }
        InsertPosition::Index(n) => (*n).min(order.len()),
    };
    order.insert(idx, task_id.clone());
    apply_order(forest, parent.as_ref(), &order)
}

/// Move a task with its subtree under a new parent (appended last), or to
/// the end of the roots when `new_parent` is `None`.
pub fn reparent_task(
    forest: &mut Forest,
    task_id: &TaskId,
    new_parent: Option<&TaskId>,
) -> Result<(), TaskError> {
    if !forest.contains(task_id) {
        return Err(TaskError::NotFound(task_id.clone()));
    }
    if let Some(p) = new_parent {
        if !forest.contains(p) {
            return Err(TaskError::NotFound(p.clone()));
        }
        if forest.pre_order_ids(task_id).contains(&p) {
            return Err(TaskError::InvalidMove(format!(
                "{} cannot be moved under itself or its own subtask",
                task_id
            )));
        }
    }
    let task = delete_task(forest, task_id)?;
    forest.insert_subtree(new_parent, task)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolve user input to an id: an exact match, or a prefix shared by
/// exactly one id.
pub fn resolve_id(forest: &Forest, input: &str) -> Result<TaskId, TaskError> {
    let input = input.trim();
    let exact = TaskId::from(input);
    if forest.contains(&exact) {
        return Ok(exact);
    }
    if input.is_empty() {
        return Err(TaskError::InvalidInput("empty task id".into()));
    }
    let matches: Vec<&TaskId> = forest
        .ids()
        .filter(|id| id.as_str().starts_with(input))
        .collect();
    match matches.as_slice() {
        [] => Err(TaskError::NotFound(exact)),
        [only] => Ok((*only).clone()),
        _ => Err(TaskError::Ambiguous {
            prefix: input.to_string(),
            count: matches.len(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::InvalidInput("title must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Check that `new_order` is a permutation of the sibling list under
/// `parent`, then install it.
fn apply_order(
    forest: &mut Forest,
    parent: Option<&TaskId>,
    new_order: &[TaskId],
) -> Result<(), TaskError> {
    let current = forest.siblings(parent).unwrap_or_default();
    if current.len() != new_order.len() {
        return Err(TaskError::InvalidOrder(format!(
            "expected {} ids, got {}",
            current.len(),
            new_order.len()
        )));
    }
    let known: HashSet<&TaskId> = current.iter().collect();
    let mut seen = HashSet::with_capacity(new_order.len());
    for id in new_order {
        if !known.contains(id) {
            return Err(TaskError::InvalidOrder(format!("{} is not a sibling here", id)));
        }
        if !seen.insert(id) {
            return Err(TaskError::InvalidOrder(format!("{} listed twice", id)));
        }
    }

    if let Some(siblings) = forest.siblings_mut(parent) {
        *siblings = new_order.to_vec();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    /// A -> [B(done), C -> [D(done)]], E
    fn sample_forest() -> Forest {
        forest_from_tasks(vec![
            Task::new(id("a"), "A")
                .with_child(Task::new(id("b"), "B").with_completed(true))
                .with_child(
                    Task::new(id("c"), "C")
                        .with_child(Task::new(id("d"), "D").with_completed(true)),
                ),
            Task::new(id("e"), "E").with_description("errands"),
        ])
        .unwrap()
    }

    fn all_ids(forest: &Forest) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = forest.ids().cloned().collect();
        ids.sort();
        ids
    }

    // --- Construction ---

    #[test]
    fn test_create_task_trims_and_defaults() {
        let task = create_task("  Write report ", "").unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.description, "");
        assert!(!task.completed);
        assert!(task.children.is_empty());
    }

    #[test]
    fn test_create_task_rejects_blank_title() {
        assert!(matches!(
            create_task("   ", "desc"),
            Err(TaskError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_forest_from_tasks_rejects_duplicate_ids() {
        let result = forest_from_tasks(vec![
            Task::new(id("a"), "A"),
            Task::new(id("b"), "B").with_child(Task::new(id("a"), "A again")),
        ]);
        assert_eq!(result, Err(TaskError::DuplicateId(id("a"))));
    }

    #[test]
    fn test_find_by_id_nested_pre_order() {
        let tasks = sample_forest().to_tasks();
        assert_eq!(find_by_id(&tasks, &id("d")).unwrap().title, "D");
        assert!(find_by_id(&tasks, &id("zz")).is_none());
    }

    #[test]
    fn test_find_by_id_first_match_wins() {
        // Not constructible through a Forest, but the search order must
        // still be deterministic.
        let tasks = vec![
            Task::new(id("r"), "R").with_child(Task::new(id("x"), "first")),
            Task::new(id("x"), "second"),
        ];
        assert_eq!(find_by_id(&tasks, &id("x")).unwrap().title, "first");
    }

    #[test]
    fn test_find_returns_every_reachable_node() {
        let forest = sample_forest();
        let nested = forest.to_tasks();
        let mut stack: Vec<&Task> = nested.iter().collect();
        while let Some(task) = stack.pop() {
            assert_eq!(forest.subtree(&task.id).as_ref(), Some(task));
            assert_eq!(find_by_id(&nested, &task.id), Some(task));
            stack.extend(task.children.iter());
        }
        assert!(forest.find(&TaskId::generate()).is_none());
    }

    // --- CRUD ---

    #[test]
    fn test_add_root_appends_last() {
        let mut forest = sample_forest();
        let new_id = add_root(&mut forest, "F", "").unwrap();
        assert_eq!(forest.roots().last(), Some(&new_id));
        assert_eq!(forest.find(&new_id).unwrap().title(), "F");
    }

    #[test]
    fn test_add_child_appends_last() {
        let mut forest = sample_forest();
        let new_id = add_child(&mut forest, &id("a"), "New sub", "notes").unwrap();
        let a = forest.node(&id("a")).unwrap();
        assert_eq!(a.children, vec![id("b"), id("c"), new_id.clone()]);
        let child = forest.find(&new_id).unwrap();
        assert_eq!(child.description(), "notes");
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn test_add_child_unknown_parent_is_noop() {
        let mut forest = sample_forest();
        let before = forest.clone();
        let result = add_child(&mut forest, &id("missing"), "X", "");
        assert_eq!(result, Err(TaskError::NotFound(id("missing"))));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_add_child_blank_title_is_noop() {
        let mut forest = sample_forest();
        let before = forest.clone();
        assert!(add_child(&mut forest, &id("a"), "", "").is_err());
        assert_eq!(forest, before);
    }

    #[test]
    fn test_delete_removes_subtree_only() {
        let mut forest = sample_forest();
        let removed = delete_task(&mut forest, &id("c")).unwrap();
        assert_eq!(removed.children[0].id, id("d"));
        assert!(forest.find(&id("c")).is_none());
        assert!(forest.find(&id("d")).is_none());
        assert_eq!(all_ids(&forest), vec![id("a"), id("b"), id("e")]);
        assert_eq!(forest.node(&id("a")).unwrap().children, vec![id("b")]);
        assert!(forest.node(&id("b")).unwrap().completed);
    }

    #[test]
    fn test_delete_root() {
        let mut forest = sample_forest();
        delete_task(&mut forest, &id("a")).unwrap();
        assert_eq!(forest.roots(), &[id("e")]);
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut forest = sample_forest();
        let before = forest.clone();
        assert!(delete_task(&mut forest, &id("nope")).is_err());
        assert_eq!(forest, before);
    }

    #[test]
    fn test_edit_title_and_description() {
        let mut forest = sample_forest();
        let patch = TaskPatch {
            title: Some(" Renamed ".into()),
            description: Some("more detail".into()),
            completed: None,
        };
        edit_task(&mut forest, &id("c"), patch).unwrap();
        let c = forest.find(&id("c")).unwrap();
        assert_eq!(c.title(), "Renamed");
        assert_eq!(c.description(), "more detail");
        assert!(!c.completed());
        assert_eq!(forest.find(&id("a")).unwrap().title(), "A");
    }

    #[test]
    fn test_edit_blank_title_rejected_before_mutation() {
        let mut forest = sample_forest();
        let before = forest.clone();
        let patch = TaskPatch {
            title: Some("  ".into()),
            description: Some("would be lost".into()),
            completed: None,
        };
        assert!(matches!(
            edit_task(&mut forest, &id("c"), patch),
            Err(TaskError::InvalidInput(_))
        ));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_edit_unknown_is_noop() {
        let mut forest = sample_forest();
        let before = forest.clone();
        let result = edit_task(&mut forest, &id("zz"), TaskPatch::title("X"));
        assert_eq!(result, Err(TaskError::NotFound(id("zz"))));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_toggle_is_local_and_self_inverse() {
        let mut forest = sample_forest();
        let before = forest.clone();

        assert!(toggle_task(&mut forest, &id("c")).unwrap());
        assert!(forest.node(&id("c")).unwrap().completed);
        // Children keep their own flag
        assert!(forest.node(&id("d")).unwrap().completed);
        assert!(!forest.node(&id("a")).unwrap().completed);

        assert!(!toggle_task(&mut forest, &id("c")).unwrap());
        assert_eq!(forest, before);
    }

    #[test]
    fn test_toggle_unknown_is_noop() {
        let mut forest = sample_forest();
        assert!(toggle_task(&mut forest, &id("zz")).is_err());
    }

    // --- Ordering ---

    #[test]
    fn test_reorder_roots_permutation() {
        let mut forest = sample_forest();
        reorder_roots(&mut forest, &[id("e"), id("a")]).unwrap();
        assert_eq!(forest.roots(), &[id("e"), id("a")]);
    }

    #[test]
    fn test_reorder_roots_missing_id_fails() {
        let mut forest = sample_forest();
        let before = forest.clone();
        let result = reorder_roots(&mut forest, &[id("e")]);
        assert!(matches!(result, Err(TaskError::InvalidOrder(_))));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_reorder_roots_foreign_or_repeated_id_fails() {
        let mut forest = sample_forest();
        let before = forest.clone();
        assert!(matches!(
            reorder_roots(&mut forest, &[id("a"), id("b")]),
            Err(TaskError::InvalidOrder(_))
        ));
        assert!(matches!(
            reorder_roots(&mut forest, &[id("a"), id("a")]),
            Err(TaskError::InvalidOrder(_))
        ));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_reorder_children() {
        let mut forest = sample_forest();
        reorder_children(&mut forest, &id("a"), &[id("c"), id("b")]).unwrap();
        assert_eq!(forest.node(&id("a")).unwrap().children, vec![id("c"), id("b")]);
        assert!(reorder_children(&mut forest, &id("a"), &[id("c")]).is_err());
    }

    #[test]
    fn test_move_task_positions() {
        let mut forest = sample_forest();
        add_root(&mut forest, "F", "").unwrap();
        let f = forest.roots()[2].clone();

        move_task(&mut forest, &f, InsertPosition::Top).unwrap();
        assert_eq!(forest.roots(), &[f.clone(), id("a"), id("e")]);

        move_task(&mut forest, &f, InsertPosition::After(id("a"))).unwrap();
        assert_eq!(forest.roots(), &[id("a"), f.clone(), id("e")]);

        move_task(&mut forest, &id("a"), InsertPosition::Bottom).unwrap();
        assert_eq!(forest.roots(), &[f.clone(), id("e"), id("a")]);

        move_task(&mut forest, &id("a"), InsertPosition::Index(1)).unwrap();
        assert_eq!(forest.roots(), &[f.clone(), id("a"), id("e")]);

        move_task(&mut forest, &f, InsertPosition::Index(99)).unwrap();
        assert_eq!(forest.roots(), &[id("a"), id("e"), f]);
    }

    #[test]
    fn test_move_subtask_among_siblings() {
        let mut forest = sample_forest();
        move_task(&mut forest, &id("c"), InsertPosition::Top).unwrap();
        assert_eq!(forest.node(&id("a")).unwrap().children, vec![id("c"), id("b")]);
    }

    #[test]
    fn test_move_after_non_sibling_fails() {
        let mut forest = sample_forest();
        let before = forest.clone();
        let result = move_task(&mut forest, &id("b"), InsertPosition::After(id("e")));
        assert_eq!(result, Err(TaskError::NotFound(id("e"))));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_reparent_task() {
        let mut forest = sample_forest();
        reparent_task(&mut forest, &id("c"), Some(&id("e"))).unwrap();
        assert_eq!(forest.node(&id("e")).unwrap().children, vec![id("c")]);
        assert_eq!(forest.node(&id("c")).unwrap().parent, Some(id("e")));
        assert_eq!(forest.find(&id("d")).unwrap().depth(), 3);

        reparent_task(&mut forest, &id("d"), None).unwrap();
        assert_eq!(forest.roots(), &[id("a"), id("e"), id("d")]);
        assert_eq!(forest.find(&id("d")).unwrap().depth(), 1);
    }

    #[test]
    fn test_reparent_under_own_subtree_fails() {
        let mut forest = sample_forest();
        let before = forest.clone();
        assert!(matches!(
            reparent_task(&mut forest, &id("a"), Some(&id("d"))),
            Err(TaskError::InvalidMove(_))
        ));
        assert!(matches!(
            reparent_task(&mut forest, &id("a"), Some(&id("a"))),
            Err(TaskError::InvalidMove(_))
        ));
        assert_eq!(forest, before);
    }

    // --- Lookup ---

    #[test]
    fn test_resolve_id_exact_and_prefix() {
        let forest = forest_from_tasks(vec![
            Task::new(id("abc123"), "one"),
            Task::new(id("abd456"), "two"),
        ])
        .unwrap();
        assert_eq!(resolve_id(&forest, "abc123").unwrap(), id("abc123"));
        assert_eq!(resolve_id(&forest, "abd").unwrap(), id("abd456"));
        assert_eq!(
            resolve_id(&forest, "ab"),
            Err(TaskError::Ambiguous {
                prefix: "ab".into(),
                count: 2
            })
        );
        assert_eq!(resolve_id(&forest, "x"), Err(TaskError::NotFound(id("x"))));
        assert!(resolve_id(&forest, " ").is_err());
    }
}
