//! Pre-order and level-order walks over the forest.
//!
//! Both walks use an explicit stack or queue, so deep trees cost heap rather
//! than call-stack space. Items are `(depth, task)` with roots at depth 1.

use std::collections::VecDeque;

use crate::model::forest::{Forest, TaskRef};
use crate::model::task::TaskId;

/// Depth-first walk: a task, then each child subtree left to right.
pub struct PreOrder<'a> {
    forest: &'a Forest,
    stack: Vec<(usize, &'a TaskId)>,
}

impl<'a> PreOrder<'a> {
    /// Walk the subtree rooted at `root`. Empty if `root` is absent.
    pub fn new(forest: &'a Forest, root: &TaskId) -> Self {
        let stack = forest
            .find(root)
            .map(|t| vec![(1, t.id())])
            .unwrap_or_default();
        PreOrder { forest, stack }
    }

    /// Walk every root tree in display order
    pub fn forest(forest: &'a Forest) -> Self {
        let stack = forest.roots().iter().rev().map(|id| (1, id)).collect();
        PreOrder { forest, stack }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, TaskRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, id)) = self.stack.pop() {
            let Some(task) = self.forest.find(id) else {
                continue;
            };
            self.stack
                .extend(task.node().children.iter().rev().map(|c| (depth + 1, c)));
            return Some((depth, task));
        }
        None
    }
}

/// Breadth-first walk: all tasks at one depth before the next, children
/// enqueued left to right.
pub struct LevelOrder<'a> {
    forest: &'a Forest,
    queue: VecDeque<(usize, &'a TaskId)>,
}

impl<'a> LevelOrder<'a> {
    /// Walk the subtree rooted at `root`. Empty if `root` is absent.
    pub fn new(forest: &'a Forest, root: &TaskId) -> Self {
        let queue = forest
            .find(root)
            .map(|t| VecDeque::from([(1, t.id())]))
            .unwrap_or_default();
        LevelOrder { forest, queue }
    }

    /// Walk every root tree, seeding the queue with all roots in display order
    pub fn forest(forest: &'a Forest) -> Self {
        let queue = forest.roots().iter().map(|id| (1, id)).collect();
        LevelOrder { forest, queue }
    }
}

impl<'a> Iterator for LevelOrder<'a> {
    type Item = (usize, TaskRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, id)) = self.queue.pop_front() {
            let Some(task) = self.forest.find(id) else {
                continue;
            };
            self.queue
                .extend(task.node().children.iter().map(|c| (depth + 1, c)));
            return Some((depth, task));
        }
        None
    }
}

/// Titles of the subtree at `root` in pre-order
pub fn pre_order(forest: &Forest, root: &TaskId) -> Vec<String> {
    titles(PreOrder::new(forest, root))
}

/// Titles of the subtree at `root` in level order
pub fn level_order(forest: &Forest, root: &TaskId) -> Vec<String> {
    titles(LevelOrder::new(forest, root))
}

/// Titles of the whole forest in pre-order
pub fn forest_pre_order(forest: &Forest) -> Vec<String> {
    titles(PreOrder::forest(forest))
}

/// Titles of the whole forest in level order
pub fn forest_level_order(forest: &Forest) -> Vec<String> {
    titles(LevelOrder::forest(forest))
}

fn titles<'a>(walk: impl Iterator<Item = (usize, TaskRef<'a>)>) -> Vec<String> {
    walk.map(|(_, task)| task.title().to_string()).collect()
}
