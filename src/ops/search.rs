use std::ops::Range;

use regex::Regex;

use crate::model::forest::Forest;
use crate::model::task::TaskId;
use crate::ops::traversal::PreOrder;

/// Which field of a task matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Id,
    Title,
    Description,
}

impl MatchField {
    pub fn label(self) -> &'static str {
        match self {
            MatchField::Id => "id",
            MatchField::Title => "title",
            MatchField::Description => "description",
        }
    }
}

/// One matching field of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub task_id: TaskId,
    pub depth: usize,
    pub field: MatchField,
    /// Byte ranges of every non-overlapping match
    pub spans: Vec<Range<usize>>,
}

/// Search every task in pre-order. A task yields at most one hit per field.
pub fn search(forest: &Forest, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for (depth, task) in PreOrder::forest(forest) {
        let fields = [
            (MatchField::Id, task.id().as_str()),
            (MatchField::Title, task.title()),
            (MatchField::Description, task.description()),
        ];
        for (field, text) in fields {
            let spans = find_matches(re, text);
            if !spans.is_empty() {
                hits.push(SearchHit {
                    task_id: task.id().clone(),
                    depth,
                    field,
                    spans,
                });
            }
        }
    }
    hits
}

fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}
