//! Dhammagraph CLI
//!
//! Command-line interface for:
//! - Seeding a graph snapshot from the source workbook (`seed`)
//! - Checking a snapshot against the graph invariants (`validate`)
//! - Walking the graph the way the reader UI does (`navigate`, `search`, `lists`, `show`)

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dhammagraph_ingest::{CorrectionTable, EssayDir, GraphLoader, Workbook};
use dhammagraph_nav::{
    emphasis_spans, list_summaries, BreadcrumbTrail, NameSearch, NavigateResponse, NavigationEngine,
    Span, StoreSearch,
};
use dhammagraph_store::{validate, EntityKind, GraphSnapshot, NodeSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{GraphConfig, Overrides};

#[derive(Parser)]
#[command(name = "dhammagraph")]
#[command(author, version, about = "Dhammagraph: navigable graph of Buddhist teaching lists")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON config file; flags given here override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Graph snapshot file
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    List,
    Dhamma,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::List => EntityKind::List,
            KindArg::Dhamma => EntityKind::Dhamma,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Full reseed: parse the workbook, resolve, correct, verify and write the snapshot.
    ///
    /// The previous snapshot is replaced only if the new graph passes
    /// verification.
    Seed {
        /// Source workbook (JSON)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Correction table (JSON)
        #[arg(long, conflicts_with = "no_corrections")]
        corrections: Option<PathBuf>,
        /// Seed without any correction table
        #[arg(long)]
        no_corrections: bool,
        /// Directory of `{slug}.md` essays
        #[arg(long)]
        essays: Option<PathBuf>,
        /// Skip Pali-fragment cross-reference detection
        #[arg(long)]
        no_cross_references: bool,
    },

    /// Run every named check and report warnings
    Validate,

    /// Show the four-way neighbors of a node
    Navigate {
        /// Node id
        id: String,
        /// Ids visited before this one, oldest first
        #[arg(long, value_delimiter = ',')]
        trail: Vec<String>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search Lists and Dhammas by English or Pali name
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },

    /// Every List with its item count
    Lists,

    /// Show one node by slug
    Show {
        slug: String,
        #[arg(long, value_enum, default_value = "dhamma")]
        kind: KindArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let overrides = match &cli.command {
        Commands::Seed {
            source,
            corrections,
            no_corrections,
            essays,
            no_cross_references,
        } => Overrides {
            source: source.clone(),
            corrections: corrections.clone(),
            no_corrections: *no_corrections,
            essays_dir: essays.clone(),
            snapshot: cli.global.snapshot.clone(),
            no_cross_references: *no_cross_references,
        },
        _ => Overrides {
            snapshot: cli.global.snapshot.clone(),
            ..Overrides::default()
        },
    };
    let config = GraphConfig::resolve(cli.global.config.as_deref(), overrides)?;
    tracing::debug!(?config, "resolved configuration");

    match cli.command {
        Commands::Seed { .. } => cmd_seed(&config),
        Commands::Validate => cmd_validate(&config),
        Commands::Navigate { id, trail, json } => cmd_navigate(&config, &id, &trail, json).await,
        Commands::Search { query, json } => cmd_search(&config, &query, json).await,
        Commands::Lists => cmd_lists(&config).await,
        Commands::Show { slug, kind } => cmd_show(&config, &slug, kind.into()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_snapshot(config: &GraphConfig) -> Result<Arc<GraphSnapshot>> {
    let snapshot = GraphSnapshot::load(&config.snapshot)
        .with_context(|| format!("loading snapshot {}", config.snapshot.display()))?;
    Ok(Arc::new(snapshot))
}

fn cmd_seed(config: &GraphConfig) -> Result<()> {
    println!("{} {}", "Seeding".green().bold(), config.source.display());

    let workbook = Workbook::load(&config.source)
        .with_context(|| format!("reading workbook {}", config.source.display()))?;
    let mut loader = GraphLoader::new(config.loader_config());
    if let Some(path) = &config.corrections {
        let table = CorrectionTable::load(path)
            .with_context(|| format!("reading corrections {}", path.display()))?;
        loader = loader.with_corrections(table);
    }
    if let Some(dir) = &config.essays_dir {
        loader = loader.with_essays(EssayDir::new(dir));
    }

    if let Some(parent) = config.snapshot.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let summary = loader
        .seed_file(&workbook, &config.snapshot)
        .context("graph load failed; previous snapshot kept")?;

    println!("  Generation: {}", summary.generation.to_string().cyan());
    println!("  Lists: {}", summary.lists);
    println!("  Dhammas: {}", summary.dhammas);
    println!(
        "  Downstream edges: {} ({} from column co-occurrence)",
        summary.downstream_edges, summary.cooccurrence_edges
    );
    println!("  Upstream edges: {}", summary.upstream_edges);
    println!("  Cross-references: {}", summary.cross_references);
    println!("  Essays: {}", summary.essays);
    if summary.corrections.changed() {
        let c = &summary.corrections;
        println!(
            "  Corrections: {} broad edges narrowed into {} member edges, {} skipped",
            c.broad_edges_removed, c.member_edges_added, c.skipped_edges_removed
        );
    }
    eprintln!(
        "{} {}",
        "wrote".green().bold(),
        config.snapshot.display().to_string().bold()
    );
    Ok(())
}

fn cmd_validate(config: &GraphConfig) -> Result<()> {
    println!("{} {}", "Validating".green().bold(), config.snapshot.display());
    let snapshot = open_snapshot(config)?;
    let report = validate(&snapshot);

    for check in &report.checks {
        let mark = if check.passed { "ok".green().bold() } else { "FAIL".red().bold() };
        println!("  {mark} {}: {}", check.name, check.detail);
    }
    for warning in &report.warnings {
        println!("  {} {warning}", "warn".yellow().bold());
    }

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{failed} of {} checks failed", report.checks.len());
    }
    println!("{}", "Valid.".green());
    Ok(())
}

async fn cmd_navigate(config: &GraphConfig, id: &str, trail_ids: &[String], json: bool) -> Result<()> {
    let snapshot = open_snapshot(config)?;
    let engine = NavigationEngine::new(Arc::clone(&snapshot));
    let mut trail = BreadcrumbTrail::with_limit(config.breadcrumb_limit);

    for earlier in trail_ids {
        engine
            .navigate_with_trail(earlier, &mut trail)
            .await
            .with_context(|| format!("trail entry {earlier}"))?;
    }
    let response = engine.navigate_with_trail(id, &mut trail).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_navigation(&response);
    }
    Ok(())
}

fn label(node: &NodeSummary) -> String {
    format!("{} {} [{}]", node.kind.to_string().dimmed(), node.name.cyan(), node.id)
}

fn print_navigation(response: &NavigateResponse) {
    let current = &response.current;
    println!("{} {}", current.name.bold(), current.pali_name.italic());
    println!("  {} {}", current.kind.to_string().dimmed(), current.id);
    if let Some(description) = &current.description {
        println!("  {description}");
    }

    let single = |name: &str, node: &Option<NodeSummary>| match node {
        Some(node) => println!("  {:<6}{}", name.yellow(), label(node)),
        None => println!("  {:<6}{}", name.yellow(), "-".dimmed()),
    };
    single("up", &response.up);
    single("down", &response.down);
    for (name, nodes) in [("left", &response.left), ("right", &response.right)] {
        println!("  {} ({})", name.yellow(), nodes.len());
        for node in nodes {
            println!("    {}", label(node));
        }
    }

    if !response.breadcrumbs.is_empty() {
        let trail: Vec<&str> = response.breadcrumbs.iter().map(|n| n.name.as_str()).collect();
        println!("  {} {}", "trail".yellow(), trail.join(" > "));
    }
    if let Some(essay) = &current.essay {
        println!();
        println!("{}", render_essay(essay));
    }
}

fn render_essay(text: &str) -> String {
    emphasis_spans(text)
        .into_iter()
        .map(|span| match span {
            Span::Plain(text) => text.to_string(),
            Span::Emphasis(term) => term.italic().to_string(),
        })
        .collect()
}

async fn cmd_search(config: &GraphConfig, query: &str, json: bool) -> Result<()> {
    let snapshot = open_snapshot(config)?;
    let search = StoreSearch::new(snapshot).with_min_query_len(config.search_min_len);
    let results = search.search(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("{}", "No matches.".dimmed());
    }
    for result in &results {
        println!(
            "{:<7} {} {} [{}]",
            result.kind.to_string().dimmed(),
            result.name.cyan(),
            result.pali_name.italic(),
            result.id
        );
    }
    Ok(())
}

async fn cmd_lists(config: &GraphConfig) -> Result<()> {
    let snapshot = open_snapshot(config)?;
    for list in list_summaries(snapshot.as_ref()).await? {
        println!(
            "{:>3}  {} {} ({})",
            list.item_count,
            list.name.cyan(),
            list.pali_name.italic(),
            list.slug.dimmed()
        );
    }
    Ok(())
}

fn cmd_show(config: &GraphConfig, slug: &str, kind: EntityKind) -> Result<()> {
    let snapshot = open_snapshot(config)?;
    match kind {
        EntityKind::List => {
            let list = snapshot
                .list_by_slug(slug)
                .ok_or_else(|| anyhow!("no list with slug `{slug}`"))?;
            println!("{} {}", list.name.bold(), list.pali_name.italic());
            println!("  id: {}", list.id);
            if let Some(description) = &list.description {
                println!("  {description}");
            }
            println!("  Items: {}", list.item_count);
            for &id in &list.children {
                if let Some(d) = snapshot.dhamma(id) {
                    println!("    {:>2}. {} {}", d.position_in_list, d.name.cyan(), d.pali_name.italic());
                }
            }
            println!("  Zoomed into from: {}", list.upstream_from.len());
        }
        EntityKind::Dhamma => {
            let dhamma = snapshot
                .dhamma_by_slug(slug)
                .ok_or_else(|| anyhow!("no dhamma with slug `{slug}`"))?;
            println!("{} {}", dhamma.name.bold(), dhamma.pali_name.italic());
            println!("  id: {}", dhamma.id);
            if let Some(parent) = snapshot.list(dhamma.parent_list_id) {
                println!("  In: {} (position {})", parent.name.cyan(), dhamma.position_in_list);
            }
            for target in &dhamma.downstream {
                let name = match target.target_kind {
                    EntityKind::List => snapshot.list(target.target_id).map(|l| l.name.as_str()),
                    EntityKind::Dhamma => snapshot.dhamma(target.target_id).map(|d| d.name.as_str()),
                };
                println!(
                    "  {} {} {}",
                    "->".yellow(),
                    target.target_kind.to_string().dimmed(),
                    name.unwrap_or("?")
                );
            }
            for &id in &dhamma.cross_references {
                if let Some(other) = snapshot.dhamma(id) {
                    println!("  {} {}", "see also".yellow(), other.name.cyan());
                }
            }
            if let Some(notes) = &dhamma.notes {
                println!("  Notes: {notes}");
            }
            if let Some(essay) = &dhamma.essay {
                println!();
                println!("{}", render_essay(essay));
            }
        }
    }
    Ok(())
}
