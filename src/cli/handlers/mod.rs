use std::path::{Path, PathBuf};

use regex::Regex;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::export::{self, FileSink, WriterSink};
use crate::io::lock::{DEFAULT_LOCK_TIMEOUT, StoreLock};
use crate::io::recovery::{self, RecoveryEntry};
use crate::io::store::{self, FileStore, KvStore, StoreError};
use crate::model::config::Config;
use crate::model::forest::Forest;
use crate::model::task::{TaskId, TaskPatch};
use crate::ops::task_ops::{self, InsertPosition, TaskError};
use crate::ops::{search, stats, traversal};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let mut session = Session::open(cli.data_dir.as_deref(), config);

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&session, args, json),
        Commands::Show(args) => cmd_show(&session, args, json),
        Commands::Stats(args) => cmd_stats(&session, args, json),
        Commands::Walk(args) => cmd_walk(&session, args, json),
        Commands::Search(args) => cmd_search(&session, args, json),
        Commands::Export(args) => cmd_export(&session, args),
        Commands::Recovery => cmd_recovery(&session),

        // Write commands
        Commands::Add(args) => {
            let parent = args.parent;
            cmd_add(&mut session, parent.as_deref(), &args.title, args.desc, json)
        }
        Commands::Sub(args) => {
            cmd_add(&mut session, Some(args.parent.as_str()), &args.title, args.desc, json)
        }
        Commands::Title(args) => cmd_title(&mut session, args),
        Commands::Desc(args) => cmd_desc(&mut session, args),
        Commands::Toggle(args) => cmd_toggle(&mut session, args, json),
        Commands::Rm(args) => cmd_rm(&mut session, args, json),
        Commands::Mv(args) => cmd_mv(&mut session, args),
        Commands::Reorder(args) => cmd_reorder(&mut session, args),
    }
}

// ---------------------------------------------------------------------------
// Session: one store, one key
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    store: FileStore,
}

impl Session {
    /// Data dir precedence: `-D` flag, then `storage.dir`, then the XDG default.
    fn open(data_dir: Option<&str>, config: Config) -> Self {
        let dir = data_dir
            .map(PathBuf::from)
            .or_else(|| config.storage.dir.clone())
            .unwrap_or_else(config_io::default_data_dir);
        tracing::debug!(dir = %dir.display(), key = %config.storage.key, "opening store");
        Session {
            store: FileStore::new(dir),
            config,
        }
    }

    fn key(&self) -> &str {
        &self.config.storage.key
    }

    fn data_dir(&self) -> &Path {
        self.store.dir()
    }

    fn load(&self) -> Result<Forest, StoreError> {
        store::load_forest(&self.store, self.key())
    }

    /// Load, apply `f`, save. The store lock is held throughout. Nothing is
    /// written when `f` fails.
    fn update<T>(
        &mut self,
        f: impl FnOnce(&mut Forest) -> Result<T, TaskError>,
    ) -> Result<(T, Forest), Box<dyn std::error::Error>> {
        let _lock = StoreLock::acquire(self.data_dir(), DEFAULT_LOCK_TIMEOUT)?;
        let mut forest = self.load()?;
        let value = f(&mut forest)?;
        self.save(&forest)?;
        Ok((value, forest))
    }

    fn save(&mut self, forest: &Forest) -> Result<(), StoreError> {
        let key = self.config.storage.key.clone();
        let data_dir = self.store.dir().to_path_buf();
        save_or_recover(
            &mut self.store,
            &key,
            forest,
            &data_dir,
            &recovery::fallback_recovery_dir(),
        )
    }
}

/// Save `forest`; when the store refuses, keep the snapshot in the recovery
/// log (under `data_dir`, else `fallback`) and return the store's error.
fn save_or_recover(
    store: &mut impl KvStore,
    key: &str,
    forest: &Forest,
    data_dir: &Path,
    fallback: &Path,
) -> Result<(), StoreError> {
    let Err(e) = store::save_forest(store, key, forest) else {
        return Ok(());
    };
    tracing::error!(key, error = %e, "failed to save tasks");
    if let Ok(snapshot) = store::serialize_forest(forest) {
        let entry = RecoveryEntry::new("save failed", snapshot)
            .field("Key", key)
            .field("Data dir", data_dir.display().to_string())
            .field("Error", e.to_string());
        recovery::log_recovery_or_fallback(data_dir, fallback, entry);
    }
    Err(e)
}

fn resolve_opt(forest: &Forest, input: Option<&str>) -> Result<Option<TaskId>, TaskError> {
    input.map(|s| task_ops::resolve_id(forest, s)).transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(
    session: &Session,
    args: ListArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let forest = session.load()?;
    let root = resolve_opt(&forest, args.id.as_deref())?;

    if json {
        let tasks = match &root {
            Some(id) => forest.subtree(id).into_iter().collect::<Vec<_>>(),
            None => forest.to_tasks(),
        };
        return print_json(&tasks);
    }

    if forest.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    print!("{}", render_tree(&forest, root.as_ref(), args.open));
    Ok(())
}

fn cmd_show(session: &Session, args: IdArg, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let forest = session.load()?;
    let id = task_ops::resolve_id(&forest, &args.id)?;
    let task = forest.find(&id).ok_or(TaskError::NotFound(id.clone()))?;

    if json {
        return print_json(&task.to_task());
    }
    print!("{}", render_task_detail(&forest, task));
    Ok(())
}

fn cmd_stats(
    session: &Session,
    args: StatsArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let forest = session.load()?;

    if let Some(input) = args.id {
        let id = task_ops::resolve_id(&forest, &input)?;
        let s = stats::task_stats(&forest, &id);
        if json {
            return print_json(&s);
        }
        print!("{}", render_stats(&s));
        return Ok(());
    }

    let totals = stats::forest_stats(&forest);
    let per_root: Vec<(String, TaskId, stats::TaskStats)> = stats::root_stats(&forest)
        .into_iter()
        .map(|(id, s)| {
            let title = forest.find(&id).map(|t| t.title().to_string()).unwrap_or_default();
            (title, id, s)
        })
        .collect();

    if json {
        let output = StatsJson {
            totals,
            roots: per_root
                .into_iter()
                .map(|(title, id, stats)| RootStatsJson { id, title, stats })
                .collect(),
        };
        return print_json(&output);
    }

    if forest.is_empty() {
        print!("{}", render_stats(&totals));
        return Ok(());
    }
    let rows: Vec<(String, stats::TaskStats)> =
        per_root.into_iter().map(|(title, _, s)| (title, s)).collect();
    print!("{}", render_stats_table(&rows, &totals));
    Ok(())
}

fn cmd_walk(
    session: &Session,
    args: WalkArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let forest = session.load()?;
    let titles = match resolve_opt(&forest, args.id.as_deref())? {
        Some(id) if args.level => traversal::level_order(&forest, &id),
        Some(id) => traversal::pre_order(&forest, &id),
        None if args.level => traversal::forest_level_order(&forest),
        None => traversal::forest_pre_order(&forest),
    };

    if json {
        return print_json(&titles);
    }
    for title in titles {
        println!("{}", title);
    }
    Ok(())
}

fn cmd_search(
    session: &Session,
    args: SearchArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let re = Regex::new(&args.pattern)
        .map_err(|e| format!("invalid regex '{}': {}", args.pattern, e))?;
    let forest = session.load()?;
    let hits = search::search(&forest, &re);

    if json {
        let output: Vec<SearchHitJson> =
            hits.iter().map(|h| search_hit_to_json(&forest, h)).collect();
        return print_json(&output);
    }
    if hits.is_empty() {
        println!("no matches");
        return Ok(());
    }
    print!("{}", render_search_hits(&forest, &hits));
    Ok(())
}

fn cmd_export(session: &Session, args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let forest = session.load()?;
    let file_name = args
        .name
        .unwrap_or_else(|| session.config.export.file_name.clone());

    let result = if args.stdout {
        let mut sink = WriterSink::new(std::io::stdout().lock());
        export::export_forest(&forest, &file_name, &mut sink)
    } else {
        let dir = args
            .out
            .map(PathBuf::from)
            .or_else(|| session.config.export.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut sink = FileSink::new(dir);
        export::export_forest(&forest, &file_name, &mut sink)
    };

    match result {
        Ok(Some(path)) => {
            println!("exported {} tasks to {}", forest.len(), path.display());
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::error!(error = %e, "export failed");
            Err(e.into())
        }
    }
}

fn cmd_recovery(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let fallback = recovery::fallback_recovery_dir();
    let mut found = false;
    for dir in [session.data_dir(), fallback.as_path()] {
        if let Some(log) = recovery::read_recovery_log(dir) {
            if found {
                println!();
            }
            println!("# {}", recovery::recovery_log_path(dir).display());
            print!("{}", log);
            found = true;
        }
    }
    if !found {
        println!("recovery log is empty");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(
    session: &mut Session,
    parent: Option<&str>,
    title: &str,
    desc: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let description = desc.unwrap_or_default();
    let (id, forest) = session.update(|forest| match resolve_opt(forest, parent)? {
        Some(parent_id) => task_ops::add_child(forest, &parent_id, title, &description),
        None => task_ops::add_root(forest, title, &description),
    })?;

    if json {
        return print_json(&forest.subtree(&id));
    }
    println!("added {}  {}", id.short(), title.trim());
    Ok(())
}

fn cmd_title(session: &mut Session, args: TitleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (id, _) = session.update(|forest| {
        let id = task_ops::resolve_id(forest, &args.id)?;
        task_ops::edit_task(forest, &id, TaskPatch::title(args.title.as_str()))?;
        Ok(id)
    })?;
    println!("renamed {}", id.short());
    Ok(())
}

fn cmd_desc(session: &mut Session, args: DescArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (id, _) = session.update(|forest| {
        let id = task_ops::resolve_id(forest, &args.id)?;
        task_ops::edit_task(forest, &id, TaskPatch::description(args.text.as_str()))?;
        Ok(id)
    })?;
    println!("updated {}", id.short());
    Ok(())
}

fn cmd_toggle(
    session: &mut Session,
    args: IdArg,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ((id, completed), forest) = session.update(|forest| {
        let id = task_ops::resolve_id(forest, &args.id)?;
        let completed = task_ops::toggle_task(forest, &id)?;
        Ok((id, completed))
    })?;

    if json {
        return print_json(&forest.subtree(&id));
    }
    let title = forest.find(&id).map(|t| t.title()).unwrap_or_default();
    let verb = if completed { "done" } else { "reopened" };
    println!("{} {}  {}", verb, id.short(), title);
    Ok(())
}

fn cmd_rm(
    session: &mut Session,
    args: IdArg,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (removed, _) = session.update(|forest| {
        let id = task_ops::resolve_id(forest, &args.id)?;
        task_ops::delete_task(forest, &id)
    })?;

    if json {
        return print_json(&removed);
    }
    let below = removed.subtask_count();
    if below > 0 {
        println!(
            "deleted {}  {} (and {} subtask{})",
            removed.id.short(),
            removed.title,
            below,
            if below == 1 { "" } else { "s" }
        );
    } else {
        println!("deleted {}  {}", removed.id.short(), removed.title);
    }
    Ok(())
}

fn cmd_mv(session: &mut Session, args: MvArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (id, _) = session.update(|forest| {
        let id = task_ops::resolve_id(forest, &args.id)?;
        if args.root {
            task_ops::reparent_task(forest, &id, None)?;
            return Ok(id);
        }
        if let Some(parent) = &args.parent {
            let parent_id = task_ops::resolve_id(forest, parent)?;
            task_ops::reparent_task(forest, &id, Some(&parent_id))?;
            return Ok(id);
        }
        let position = if args.top {
            InsertPosition::Top
        } else if args.bottom {
            InsertPosition::Bottom
        } else if let Some(after) = &args.after {
            InsertPosition::After(task_ops::resolve_id(forest, after)?)
        } else if let Some(index) = args.index {
            InsertPosition::Index(index)
        } else {
            return Err(TaskError::InvalidInput(
                "mv needs one of --top, --bottom, --after, --index, --parent or --root".into(),
            ));
        };
        task_ops::move_task(forest, &id, position)?;
        Ok(id)
    })?;
    println!("moved {}", id.short());
    Ok(())
}

fn cmd_reorder(session: &mut Session, args: ReorderArgs) -> Result<(), Box<dyn std::error::Error>> {
    session.update(|forest| {
        let order = args
            .ids
            .iter()
            .map(|s| match task_ops::resolve_id(forest, s) {
                Err(TaskError::NotFound(id)) => {
                    Err(TaskError::InvalidOrder(format!("{} is not a sibling here", id)))
                }
                other => other,
            })
            .collect::<Result<Vec<_>, _>>()?;
        match resolve_opt(forest, args.parent.as_deref())? {
            Some(parent_id) => task_ops::reorder_children(forest, &parent_id, &order),
            None => task_ops::reorder_roots(forest, &order),
        }
    })?;
    println!("reordered {} tasks", args.ids.len());
    Ok(())
}
