use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::model::forest::{Forest, TaskRef};
use crate::model::task::TaskId;
use crate::ops::search::{MatchField, SearchHit};
use crate::ops::stats::TaskStats;
use crate::ops::traversal::PreOrder;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootStatsJson {
    pub id: TaskId,
    pub title: String,
    #[serde(flatten)]
    pub stats: TaskStats,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub totals: TaskStats,
    pub roots: Vec<RootStatsJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitJson {
    pub task_id: TaskId,
    pub title: String,
    pub field: &'static str,
    pub spans: Vec<[usize; 2]>,
}

pub fn search_hit_to_json(forest: &Forest, hit: &SearchHit) -> SearchHitJson {
    SearchHitJson {
        task_id: hit.task_id.clone(),
        title: forest
            .find(&hit.task_id)
            .map(|t| t.title().to_string())
            .unwrap_or_default(),
        field: hit.field.label(),
        spans: hit.spans.iter().map(|r| [r.start, r.end]).collect(),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn checkbox(completed: bool) -> &'static str {
    if completed { "[x]" } else { "[ ]" }
}

/// One line per task, indented two spaces per level:
/// `[x] 1f0c2a9e  Title`.
///
/// With `open_only`, completed tasks are hidden together with everything below them.
pub fn render_tree(forest: &Forest, root: Option<&TaskId>, open_only: bool) -> String {
    let walk = match root {
        Some(id) => PreOrder::new(forest, id),
        None => PreOrder::forest(forest),
    };
    let mut out = String::new();
    let mut hidden_below: Option<usize> = None;
    for (depth, task) in walk {
        if let Some(limit) = hidden_below {
            if depth > limit {
                continue;
            }
            hidden_below = None;
        }
        if open_only && task.completed() {
            hidden_below = Some(depth);
            continue;
        }
        out.push_str(&"  ".repeat(depth - 1));
        out.push_str(&format!(
            "{} {}  {}\n",
            checkbox(task.completed()),
            task.id().short(),
            task.title()
        ));
    }
    out
}

/// Detail block for one task followed by its subtree
pub fn render_task_detail(forest: &Forest, task: TaskRef<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("id:          {}\n", task.id()));
    out.push_str(&format!("title:       {}\n", task.title()));
    out.push_str(&format!(
        "status:      {}\n",
        if task.completed() { "done" } else { "open" }
    ));
    if !task.description().is_empty() {
        out.push_str(&format!("description: {}\n", task.description()));
    }
    if let Some(parent) = task.parent() {
        out.push_str(&format!(
            "parent:      {}  {}\n",
            parent.id().short(),
            parent.title()
        ));
    }
    out.push_str(&format!("depth:       {}\n", task.depth()));
    let subtasks = task.children().count();
    if subtasks > 0 {
        out.push('\n');
        out.push_str(&render_tree(forest, Some(task.id()), false));
    }
    out
}

pub fn render_stats(stats: &TaskStats) -> String {
    format!(
        "Total tasks:      {}\nCompleted:        {}\nCompletion rate:  {}\nMax depth:        {}\n",
        stats.total_tasks, stats.completed_tasks, stats.completion_rate, stats.max_depth
    )
}

/// Per-root table with a totals row. Title widths are measured in terminal
/// columns so wide characters stay aligned.
pub fn render_stats_table(rows: &[(String, TaskStats)], totals: &TaskStats) -> String {
    let name_w = rows
        .iter()
        .map(|(title, _)| title.width())
        .max()
        .unwrap_or(0)
        .max(5); // "Total"

    let line = |name: &str, done: &str, total: &str, rate: &str, depth: &str| {
        format!(
            " {}  {:>5}  {:>5}  {:>6}  {:>5}\n",
            pad_to_width(name, name_w),
            done,
            total,
            rate,
            depth
        )
    };

    let mut out = line("Task", "done", "total", "rate", "depth");
    for (title, s) in rows {
        out.push_str(&line(
            title,
            &s.completed_tasks.to_string(),
            &s.total_tasks.to_string(),
            &s.completion_rate,
            &s.max_depth.to_string(),
        ));
    }
    out.push_str(&line(
        "Total",
        &totals.completed_tasks.to_string(),
        &totals.total_tasks.to_string(),
        &totals.completion_rate,
        &totals.max_depth.to_string(),
    ));
    out
}

pub fn render_search_hits(forest: &Forest, hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for hit in hits {
        let Some(task) = forest.find(&hit.task_id) else {
            continue;
        };
        let text = match hit.field {
            MatchField::Description => task.description(),
            _ => task.title(),
        };
        out.push_str(&format!(
            "{}  {:<11}  {}\n",
            task.id().short(),
            hit.field.label(),
            text
        ));
    }
    out
}

fn pad_to_width(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Task;
    use crate::ops::stats::{forest_stats, task_stats};
    use crate::ops::task_ops::forest_from_tasks;
    use insta::assert_snapshot;

    fn sample() -> Forest {
        forest_from_tasks(vec![
            Task::new("a".into(), "A")
                .with_child(Task::new("b".into(), "B").with_completed(true))
                .with_child(
                    Task::new("c".into(), "C")
                        .with_child(Task::new("d".into(), "D").with_completed(true)),
                ),
            Task::new("e".into(), "E"),
        ])
        .unwrap()
    }

    #[test]
    fn tree_full() {
        let out = render_tree(&sample(), None, false);
        assert_snapshot!(out, @r"
        [ ] a  A
          [x] b  B
          [ ] c  C
            [x] d  D
        [ ] e  E
        ");
    }

    #[test]
    fn tree_open_only_hides_done_subtrees() {
        let mut forest = sample();
        crate::ops::task_ops::toggle_task(&mut forest, &"c".into()).unwrap();
        let out = render_tree(&forest, None, true);
        assert_eq!(out, "[ ] a  A\n[ ] e  E\n");
    }

    #[test]
    fn tree_of_subtree_starts_at_left_margin() {
        let out = render_tree(&sample(), Some(&"c".into()), false);
        assert_eq!(out, "[ ] c  C\n  [x] d  D\n");
    }

    #[test]
    fn stats_block() {
        let forest = sample();
        let out = render_stats(&task_stats(&forest, &"a".into()));
        assert_eq!(
            out,
            "Total tasks:      4\nCompleted:        2\nCompletion rate:  50.0%\nMax depth:        3\n"
        );
    }

    #[test]
    fn stats_table_aligns_wide_titles() {
        let forest = sample();
        let rows = vec![
            ("A".to_string(), task_stats(&forest, &"a".into())),
            ("日本語".to_string(), task_stats(&forest, &"e".into())),
        ];
        let out = render_stats_table(&rows, &forest_stats(&forest));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], " Task     done  total    rate  depth");
        assert_eq!(lines[1], " A           2      4   50.0%      3");
        assert_eq!(lines[2], " 日本語      0      1    0.0%      1");
        assert_eq!(lines[3], " Total       2      5   40.0%      3");
    }

    #[test]
    fn detail_lists_parent_and_subtree() {
        let forest = sample();
        let c = forest.find(&"c".into()).unwrap();
        let out = render_task_detail(&forest, c);
        assert!(out.contains("title:       C\n"));
        assert!(out.contains("status:      open\n"));
        assert!(out.contains("parent:      a  A\n"));
        assert!(out.contains("depth:       2\n"));
        assert!(out.ends_with("[ ] c  C\n  [x] d  D\n"));
    }
}
