use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tt",
    about = concat!("tasktree v", env!("CARGO_PKG_VERSION"), " - a to-do list that nests"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a root task, or a subtask with --parent
    Add(AddArgs),
    /// Add a subtask under an existing task
    Sub(SubArgs),
    /// Show the task tree
    List(ListArgs),
    /// Show one task with its subtasks
    Show(IdArg),
    /// Change a task's title
    Title(TitleArgs),
    /// Change a task's description
    Desc(DescArgs),
    /// Toggle a task between done and not done
    Toggle(IdArg),
    /// Delete a task and all of its subtasks
    Rm(IdArg),
    /// Move a task among its siblings, or under another parent
    Mv(MvArgs),
    /// Set the full order of root tasks (or of one task's subtasks)
    Reorder(ReorderArgs),
    /// Show completion statistics
    Stats(StatsArgs),
    /// List titles in pre-order or level order
    Walk(WalkArgs),
    /// Search titles and descriptions by regex
    Search(SearchArgs),
    /// Export all tasks as indented JSON
    Export(ExportArgs),
    /// Show the recovery log of snapshots that failed to save
    Recovery,
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID (a unique prefix is enough)
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Optional description
    #[arg(long)]
    pub desc: Option<String>,
    /// Add as the last subtask of this task instead of as a root
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task ID
    pub parent: String,
    /// Subtask title
    pub title: String,
    /// Optional description
    #[arg(long)]
    pub desc: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only show the subtree under this task
    pub id: Option<String>,
    /// Hide completed tasks (and their subtasks)
    #[arg(long)]
    pub open: bool,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Task ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct DescArgs {
    /// Task ID
    pub id: String,
    /// New description (empty clears it)
    pub text: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID
    pub id: String,
    /// Move to the first position
    #[arg(long)]
    pub top: bool,
    /// Move to the last position
    #[arg(long)]
    pub bottom: bool,
    /// Move directly after this sibling
    #[arg(long)]
    pub after: Option<String>,
    /// Move to this position (0-indexed)
    #[arg(long)]
    pub index: Option<usize>,
    /// Reparent under this task (appended last)
    #[arg(long)]
    pub parent: Option<String>,
    /// Promote to a root task
    #[arg(long)]
    pub root: bool,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Reorder this task's subtasks instead of the roots
    #[arg(long)]
    pub parent: Option<String>,
    /// Every sibling ID, in the new order
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Only count the subtree under this task
    pub id: Option<String>,
}

#[derive(Args)]
pub struct WalkArgs {
    /// Walk only the subtree under this task
    pub id: Option<String>,
    /// Breadth-first instead of depth-first
    #[arg(long)]
    pub level: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern to search for
    pub pattern: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Directory to write the export file into
    #[arg(long)]
    pub out: Option<String>,
    /// File name (default from config, usually tasks.json)
    #[arg(long)]
    pub name: Option<String>,
    /// Print to stdout instead of writing a file
    #[arg(long, conflicts_with = "out")]
    pub stdout: bool,
}
