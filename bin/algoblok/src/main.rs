//! AlgoBlok CLI: compile strategy graphs, run them against the backtest
//! backend and manage the saved strategy/script library.
//!
//! Commands:
//! - `compile`: validate a graph file and print the compiled strategy
//! - `backtest`: compile and backtest a graph file
//! - `optimize`: compile and optimize a graph file, optionally writing the
//!   best parameters back into it
//! - `library strategies|scripts`: list, save, load and delete saved entries

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use backend::{run_backtest, run_optimization, HttpBackend};
use common::{Config, Graph, RunSettings};
use library::{Library, StrategySnapshot};
use strategy::{apply_best_params, compile};

#[derive(Parser)]
#[command(name = "algoblok", about = "AlgoBlok: block-based trading strategy toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a strategy graph and print the compiled strategy as JSON.
    Compile {
        /// Graph JSON file (`{"nodes": [...], "edges": [...]}`).
        graph: PathBuf,
    },
    /// Backtest a strategy graph on the remote backend.
    Backtest {
        graph: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Optimize a strategy graph's parameters on the remote backend.
    Optimize {
        graph: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Write the best parameters back into the graph file.
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Saved strategies and scripts.
    Library {
        #[command(subcommand)]
        target: LibraryTarget,
    },
}

#[derive(Args)]
struct RunArgs {
    /// TOML file with symbol, timeframe, start_date and end_date.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Market symbol (e.g. BTC/USDT).
    #[arg(long)]
    symbol: Option<String>,

    /// Candle timeframe (e.g. 1h, 4h, 1d).
    #[arg(long)]
    timeframe: Option<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum LibraryTarget {
    /// Saved strategy snapshots.
    Strategies {
        #[command(subcommand)]
        action: StrategyAction,
    },
    /// Saved scripts.
    Scripts {
        #[command(subcommand)]
        action: ScriptAction,
    },
}

#[derive(Subcommand)]
enum StrategyAction {
    List,
    /// Save a graph file under a name.
    Save {
        name: String,
        graph: PathBuf,

        /// File holding the editor's script text to store alongside the graph.
        #[arg(long)]
        script: Option<PathBuf>,
    },
    /// Print a saved strategy, or write its graph to `--out`.
    Load {
        id: String,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum ScriptAction {
    List,
    /// Save a script file under a name, replacing any script with that name.
    Save {
        name: String,
        file: PathBuf,

        /// Graph file whose nodes built from this script are updated in place.
        #[arg(long)]
        refresh: Option<PathBuf>,
    },
    Show {
        id: String,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    run(cli.command).await
}

/// `compile` is offline and never reads the environment.
async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Compile { graph } => {
            let graph = read_graph(&graph)?;
            let compiled = compile(&graph)?;
            println!("{}", serde_json::to_string_pretty(&compiled)?);
        }
        Commands::Backtest { graph, run } => {
            let compiled = compile(&read_graph(&graph)?)?;
            let settings = run.resolve()?;
            let backend = http_backend(&Config::from_env()?)?;
            let result = run_backtest(&backend, &compiled, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Optimize { graph: path, run, apply } => {
            let mut graph = read_graph(&path)?;
            let compiled = compile(&graph)?;
            let settings = run.resolve()?;
            let backend = http_backend(&Config::from_env()?)?;
            let result = run_optimization(&backend, &compiled, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if apply {
                let written = apply_best_params(&mut graph, &result.best_params);
                write_json(&path, &graph)?;
                info!(path = %path.display(), written, "Applied best parameters");
            }
        }
        Commands::Library { target } => {
            // ── Database ──────────────────────────────────────────────────────
            let cfg = Config::from_env()?;
            let lib = Library::connect(&cfg.database_url)
                .await
                .with_context(|| format!("failed to open library at {}", cfg.database_url))?;
            match target {
                LibraryTarget::Strategies { action } => strategies(&lib, action).await?,
                LibraryTarget::Scripts { action } => scripts(&lib, action).await?,
            }
        }
    }

    Ok(())
}

impl RunArgs {
    /// Settings file (or defaults) with individual flags layered on top.
    fn resolve(self) -> Result<RunSettings> {
        let mut settings = match &self.settings {
            Some(path) => RunSettings::load(path)?,
            None => RunSettings::default(),
        };
        if let Some(symbol) = self.symbol {
            settings.symbol = symbol;
        }
        if let Some(timeframe) = self.timeframe {
            settings.timeframe = timeframe;
        }
        if let Some(start) = self.start {
            settings.start_date = start;
        }
        if let Some(end) = self.end {
            settings.end_date = end;
        }
        Ok(settings)
    }
}

async fn strategies(lib: &Library, action: StrategyAction) -> Result<()> {
    match action {
        StrategyAction::List => {
            for entry in lib.list_strategies().await? {
                println!("{}  {}  {}", entry.id, entry.saved_at.to_rfc3339(), entry.name);
            }
        }
        StrategyAction::Save { name, graph, script } => {
            let script_text = match script {
                Some(path) => read_text(&path)?,
                None => String::new(),
            };
            let snapshot = StrategySnapshot::from_graph(&read_graph(&graph)?, script_text);
            let saved = lib.save_strategy(&name, &snapshot).await?;
            println!("{}", saved.id);
        }
        StrategyAction::Load { id, out } => {
            let saved = lib.load_strategy(&id).await?;
            match out {
                Some(path) => write_json(&path, &saved.snapshot.into_graph())?,
                None => println!("{}", serde_json::to_string_pretty(&saved)?),
            }
        }
        StrategyAction::Delete { id } => lib.delete_strategy(&id).await?,
    }
    Ok(())
}

async fn scripts(lib: &Library, action: ScriptAction) -> Result<()> {
    match action {
        ScriptAction::List => {
            for script in lib.list_scripts().await? {
                let params: Vec<String> = script
                    .params
                    .iter()
                    .map(|p| format!("{}={}", p.name, p.value))
                    .collect();
                println!("{}  {}  [{}]", script.id, script.name, params.join(", "));
            }
        }
        ScriptAction::Save { name, file, refresh } => {
            let saved = lib.save_script(&name, &read_text(&file)?).await?;
            if let Some(path) = refresh {
                let mut graph = read_graph(&path)?;
                let refreshed = saved.refresh_nodes(&mut graph);
                write_json(&path, &graph)?;
                info!(path = %path.display(), refreshed, "Refreshed script nodes");
            }
            println!("{}", saved.id);
        }
        ScriptAction::Show { id } => {
            let script = lib.get_script(&id).await?;
            println!("{}", serde_json::to_string_pretty(&script)?);
        }
        ScriptAction::Rename { id, name } => lib.rename_script(&id, &name).await?,
        ScriptAction::Delete { id } => lib.delete_script(&id).await?,
    }
    Ok(())
}

fn http_backend(cfg: &Config) -> Result<HttpBackend> {
    info!(url = %cfg.backend_url, "Using backend");
    Ok(HttpBackend::new(
        cfg.backend_url.clone(),
        Duration::from_secs(cfg.request_timeout_secs),
    )?)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_graph(path: &Path) -> Result<Graph> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a valid graph document", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
