use anyhow::{anyhow, bail, Context};
use clap::Parser;
use colored::Colorize;
use serde::Deserialize;
use sitemap_editor::sitemap_model::{path, Entry, EntryId, SitemapTree};
use sitemap_editor::{
    EditorConfig, EntryEdit, InMemoryAuthority, MoveTarget, NewEntryRequest, NullView,
    SitemapController,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Replay a script of sitemap edits against an in-memory authority
#[derive(Parser, Debug)]
#[command(name = "sitemap-replay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Sitemap tree as JSON (a serialized tree or a bare root entry)
    #[arg(short, long)]
    tree: PathBuf,

    /// Script of edit steps as a JSON array
    #[arg(short, long)]
    script: PathBuf,

    /// Directory containing sitemap-editor.config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User the session edits as
    #[arg(short, long, default_value = "editor")]
    user: String,

    /// Log rejected steps and continue instead of stopping
    #[arg(long)]
    keep_going: bool,

    /// Write the resulting state here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TreeInput {
    Tree(SitemapTree),
    Root(Entry),
}

/// One scripted edit. Entries are addressed by site path.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    Edit {
        path: String,
        edit: EntryEdit,
    },
    Rename {
        path: String,
        name: String,
    },
    Move {
        path: String,
        parent: String,
        position: usize,
        #[serde(default)]
        name: Option<String>,
    },
    Create {
        parent: String,
        entry: NewEntryRequest,
    },
    Delete {
        path: String,
    },
    /// Restore the deleted entry that lived at `path`
    Undelete {
        path: String,
    },
    Bump {
        path: String,
    },
    AddToNavigation {
        path: String,
        parent: String,
        position: usize,
    },
    RemoveFromNavigation {
        path: String,
    },
    ClearModified,
    ClearDeleted,
    Undo,
    Redo,
    EnsureLoaded {
        path: String,
    },
    CreateSubSitemap {
        path: String,
    },
    MergeSubSitemap {
        path: String,
    },
}

impl Step {
    fn label(&self) -> String {
        match self {
            Step::Edit { path, .. } => format!("edit {}", path),
            Step::Rename { path, name } => format!("rename {} to {}", path, name),
            Step::Move { path, parent, position, .. } => {
                format!("move {} to {}@{}", path, parent, position)
            }
            Step::Create { parent, entry } => format!("create {}{}", parent, entry.name),
            Step::Delete { path } => format!("delete {}", path),
            Step::Undelete { path } => format!("undelete {}", path),
            Step::Bump { path } => format!("bump {}", path),
            Step::AddToNavigation { path, .. } => format!("add {} to navigation", path),
            Step::RemoveFromNavigation { path } => format!("remove {} from navigation", path),
            Step::ClearModified => "clear modified".to_string(),
            Step::ClearDeleted => "clear deleted".to_string(),
            Step::Undo => "undo".to_string(),
            Step::Redo => "redo".to_string(),
            Step::EnsureLoaded { path } => format!("load {}", path),
            Step::CreateSubSitemap { path } => format!("create sub-sitemap at {}", path),
            Step::MergeSubSitemap { path } => format!("merge sub-sitemap at {}", path),
        }
    }
}

type Controller = SitemapController<InMemoryAuthority, NullView>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(dir) => EditorConfig::load(dir)?,
        None => EditorConfig::default(),
    };
    let tree = read_tree(&cli.tree)?;
    let script = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("Failed to read script {}", cli.script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&script).context("Invalid script")?;

    let authority = InMemoryAuthority::new(tree.clone(), cli.user.clone());
    let mut controller = SitemapController::new(authority, NullView, tree, config);

    let mut failed = 0;
    for (index, step) in steps.iter().enumerate() {
        let label = step.label();
        match run_step(&mut controller, step).await {
            Ok(true) => eprintln!("  {} {}", "✓".green(), label),
            Ok(false) => eprintln!("  {} {} (nothing to do)", "-".yellow(), label),
            Err(err) if cli.keep_going => {
                failed += 1;
                eprintln!("  {} {}: {}", "✗".red(), label, err);
            }
            Err(err) => return Err(err.context(format!("Step {} ({}) failed", index + 1, label))),
        }
    }

    let output = serde_json::to_string_pretty(controller.state())?;
    match &cli.output {
        Some(file) => std::fs::write(file, output)
            .with_context(|| format!("Failed to write {}", file.display()))?,
        None => println!("{}", output),
    }

    eprintln!();
    if failed > 0 {
        eprintln!(
            "{} {} steps, {} rejected",
            "Replayed".yellow().bold(),
            steps.len(),
            failed
        );
    } else {
        eprintln!("{} {} steps", "Replayed".green().bold(), steps.len());
    }
    Ok(())
}

fn read_tree(file: &Path) -> anyhow::Result<SitemapTree> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read tree {}", file.display()))?;
    let input: TreeInput = serde_json::from_str(&content).context("Invalid tree")?;
    let tree = match input {
        TreeInput::Tree(tree) => tree,
        TreeInput::Root(root) => SitemapTree::new(root),
    };
    if let Some(problem) = tree.find_inconsistency() {
        bail!("Inconsistent tree: {}", problem);
    }
    Ok(tree)
}

async fn run_step(controller: &mut Controller, step: &Step) -> anyhow::Result<bool> {
    let done = match step {
        Step::Edit { path, edit } => {
            let id = resolve(controller, path).await?;
            controller.edit_entry(id, edit.clone()).await?
        }
        Step::Rename { path, name } => {
            let id = resolve(controller, path).await?;
            controller.rename(id, name.clone()).await?
        }
        Step::Move {
            path,
            parent,
            position,
            name,
        } => {
            let id = resolve(controller, path).await?;
            let mut target = MoveTarget::new(parent.clone(), *position);
            if let Some(name) = name {
                target = target.renamed(name.clone());
            }
            controller.move_entry(id, target).await?
        }
        Step::Create { parent, entry } => {
            let parent_id = resolve(controller, parent).await?;
            controller
                .create_sub_entry(parent_id, entry.clone())
                .await?
                .is_some()
        }
        Step::Delete { path } => {
            let id = resolve(controller, path).await?;
            controller.delete(id).await?
        }
        Step::Undelete { path } => {
            let id = controller
                .clipboard()
                .deleted()
                .iter()
                .find(|entry| entry.site_path == *path)
                .map(|entry| entry.id)
                .ok_or_else(|| anyhow!("{} is not in the deleted list", path))?;
            controller.undelete(id).await?
        }
        Step::Bump { path } => {
            let id = resolve(controller, path).await?;
            controller.bump_detail_page(id).await?
        }
        Step::AddToNavigation {
            path,
            parent,
            position,
        } => {
            let id = resolve(controller, path).await?;
            controller
                .add_to_navigation(id, MoveTarget::new(parent.clone(), *position))
                .await?
        }
        Step::RemoveFromNavigation { path } => {
            let id = resolve(controller, path).await?;
            controller.remove_from_navigation(id).await?
        }
        Step::ClearModified => controller.clear_modified().await?,
        Step::ClearDeleted => controller.clear_deleted().await?,
        Step::Undo => controller.undo().await?,
        Step::Redo => controller.redo().await?,
        Step::EnsureLoaded { path } => {
            controller.ensure_loaded(path).await?;
            true
        }
        Step::CreateSubSitemap { path } => {
            let id = resolve(controller, path).await?;
            controller.create_sub_sitemap(id).await?
        }
        Step::MergeSubSitemap { path } => {
            let id = resolve(controller, path).await?;
            controller.merge_sub_sitemap(id).await?
        }
    };
    Ok(done)
}

/// Id of the entry at `site_path`, loading its ancestors if needed
async fn resolve(controller: &mut Controller, site_path: &str) -> anyhow::Result<EntryId> {
    if let Some(entry) = controller.lookup(site_path) {
        return Ok(entry.id);
    }
    if let Some(parent) = path::parent_path(site_path) {
        controller.ensure_loaded(&parent).await?;
    }
    controller
        .lookup(site_path)
        .map(|entry| entry.id)
        .ok_or_else(|| anyhow!("No entry at {}", site_path))
}
