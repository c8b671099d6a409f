use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::task::{Task, TaskId};

/// A task stored in the arena. Children are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// `None` for root tasks
    pub parent: Option<TaskId>,
    /// Child ids in display order
    pub children: Vec<TaskId>,
}

/// The ordered set of root task trees, stored flat and keyed by id.
///
/// Every id appears at most once, and every node except a root is listed in
/// exactly one parent's `children`. Only the linking primitives below touch
/// `nodes`/`roots`, which is what keeps the structure a forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    pub(crate) nodes: IndexMap<TaskId, Node>,
    pub(crate) roots: Vec<TaskId>,
}

/// Why a subtree could not be linked into the forest
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LinkError {
    UnknownParent(TaskId),
    DuplicateId(TaskId),
}

/// Borrowed view of one task and its position in the forest
#[derive(Debug, Clone, Copy)]
pub struct TaskRef<'a> {
    forest: &'a Forest,
    id: &'a TaskId,
    node: &'a Node,
}

impl<'a> TaskRef<'a> {
    pub fn id(&self) -> &'a TaskId {
        self.id
    }

    pub fn title(&self) -> &'a str {
        &self.node.title
    }

    pub fn description(&self) -> &'a str {
        &self.node.description
    }

    pub fn completed(&self) -> bool {
        self.node.completed
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn parent(&self) -> Option<TaskRef<'a>> {
        self.node.parent.as_ref().and_then(|p| self.forest.find(p))
    }

    pub fn children(&self) -> impl Iterator<Item = TaskRef<'a>> + 'a {
        let forest = self.forest;
        self.node.children.iter().filter_map(move |c| forest.find(c))
    }

    /// Depth of this task, roots are at depth 1
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.node.parent.as_ref();
        while let Some(p) = current {
            depth += 1;
            current = self.forest.nodes.get(p).and_then(|n| n.parent.as_ref());
        }
        depth
    }

    /// Materialize this task and its subtree in nested form
    pub fn to_task(&self) -> Task {
        // The id is known to be present, so assembly cannot fail.
        self.forest
            .assemble(self.id)
            .unwrap_or_else(|| Task::new(self.id.clone(), self.node.title.clone()))
    }
}

impl Forest {
    pub fn new() -> Self {
        Forest::default()
    }

    /// Number of tasks at every depth
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root ids in display order
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &TaskId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a task by id
    pub fn find(&self, id: &TaskId) -> Option<TaskRef<'_>> {
        self.nodes
            .get_key_value(id)
            .map(|(id, node)| TaskRef {
                forest: self,
                id,
                node,
            })
    }

    /// Root tasks in display order
    pub fn root_tasks(&self) -> impl Iterator<Item = TaskRef<'_>> + '_ {
        self.roots.iter().filter_map(move |id| self.find(id))
    }

    /// All ids, in the order the tasks were linked
    pub fn ids(&self) -> impl Iterator<Item = &TaskId> + '_ {
        self.nodes.keys()
    }

    /// The sibling list containing a task's parent's children, or the roots
    /// when `parent` is `None`.
    pub fn siblings(&self, parent: Option<&TaskId>) -> Option<&[TaskId]> {
        match parent {
            None => Some(&self.roots),
            Some(p) => self.nodes.get(p).map(|n| n.children.as_slice()),
        }
    }

    /// Nested copy of the task with this id and everything below it
    pub fn subtree(&self, id: &TaskId) -> Option<Task> {
        self.assemble(id)
    }

    /// Nested copy of the whole forest, roots in display order
    pub fn to_tasks(&self) -> Vec<Task> {
        self.roots.iter().filter_map(|id| self.assemble(id)).collect()
    }

    // -----------------------------------------------------------------------
    // Linking primitives
    // -----------------------------------------------------------------------

    pub(crate) fn node_mut(&mut self, id: &TaskId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn siblings_mut(&mut self, parent: Option<&TaskId>) -> Option<&mut Vec<TaskId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(p) => self.nodes.get_mut(p).map(|n| &mut n.children),
        }
    }

    /// Link a detached subtree as the last child of `parent` (or as the last
    /// root). Rejects the whole subtree, leaving the forest untouched, if any
    /// id in it is already present or repeated.
    pub(crate) fn insert_subtree(
        &mut self,
        parent: Option<&TaskId>,
        task: Task,
    ) -> Result<(), LinkError> {
        if let Some(p) = parent
            && !self.nodes.contains_key(p)
        {
            return Err(LinkError::UnknownParent(p.clone()));
        }

        {
            let mut seen = HashSet::new();
            let mut stack = vec![&task];
            while let Some(t) = stack.pop() {
                if self.nodes.contains_key(&t.id) || !seen.insert(&t.id) {
                    return Err(LinkError::DuplicateId(t.id.clone()));
                }
                stack.extend(t.children.iter());
            }
        }

        let top = task.id.clone();
        let mut pending = vec![(parent.cloned(), task)];
        while let Some((owner, task)) = pending.pop() {
            let Task {
                id,
                title,
                description,
                completed,
                children,
            } = task;
            let child_ids = children.iter().map(|c| c.id.clone()).collect();
            for child in children.into_iter().rev() {
                pending.push((Some(id.clone()), child));
            }
            self.nodes.insert(
                id,
                Node {
                    title,
                    description,
                    completed,
                    parent: owner,
                    children: child_ids,
                },
            );
        }

        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.push(top);
        }
        Ok(())
    }

    /// Unlink a task and drop it with its whole subtree. Returns the removed
    /// subtree in nested form.
    pub(crate) fn remove_subtree(&mut self, id: &TaskId) -> Option<Task> {
        let parent = self.nodes.get(id)?.parent.clone();
        let task = self.assemble(id)?;
        let doomed: Vec<TaskId> = self.pre_order_ids(id).into_iter().cloned().collect();

        if let Some(siblings) = self.siblings_mut(parent.as_ref()) {
            siblings.retain(|c| c != id);
        }
        for removed in &doomed {
            self.nodes.shift_remove(removed);
        }
        Some(task)
    }

    /// Ids of a subtree in pre-order, using an explicit stack
    pub(crate) fn pre_order_ids(&self, root: &TaskId) -> Vec<&TaskId> {
        let Some((key, _)) = self.nodes.get_key_value(root) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Build the nested form bottom-up: walking pre-order in reverse visits
    /// every child before its parent.
    fn assemble(&self, root: &TaskId) -> Option<Task> {
        let order = self.pre_order_ids(root);
        let mut built: HashMap<&TaskId, Task> = HashMap::with_capacity(order.len());
        for id in order.into_iter().rev() {
            let node = &self.nodes[id];
            let children = node
                .children
                .iter()
                .filter_map(|c| built.remove(c))
                .collect();
            built.insert(
                id,
                Task {
                    id: id.clone(),
                    title: node.title.clone(),
                    description: node.description.clone(),
                    completed: node.completed,
                    children,
                },
            );
        }
        built.remove(root)
    }
}
