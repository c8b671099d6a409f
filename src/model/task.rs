use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identifier.
///
/// Fresh ids are UUID v4 strings. Ids loaded from disk are kept verbatim;
/// loading rejects an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh, globally unique id
    pub fn generate() -> Self {
        TaskId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first eight characters, used for display and prefix lookup
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

/// A task with its whole subtree, in the nested shape used on disk and in exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id, stable for the lifetime of the task
    pub id: TaskId,
    /// Display title
    pub title: String,
    /// Free-form description (empty when absent)
    #[serde(default)]
    pub description: String,
    /// Completion flag. Local to this node, never derived from children.
    #[serde(default)]
    pub completed: bool,
    /// Subtasks in display order
    #[serde(default)]
    pub children: Vec<Task>,
}

impl Task {
    /// Build a detached task with an explicit id. Does not validate the title.
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Task {
            id,
            title: title.into(),
            description: String::new(),
            completed: false,
            children: Vec::new(),
        }
    }

    /// Builder-style description setter
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style completion setter
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Task) -> Self {
        self.children.push(child);
        self
    }

    /// Number of tasks below this one, at any depth
    pub fn subtask_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Task> = self.children.iter().collect();
        while let Some(task) = stack.pop() {
            count += 1;
            stack.extend(task.children.iter());
        }
        count
    }
}

/// Partial update applied by an edit. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        TaskPatch {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}
