//! 游戏化引擎命令行
//!
//! 以 JSON 文件为输入执行引擎的各项计算，结果以 JSON 输出到 stdout，
//! 日志输出到 stderr。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gamification_engine::{
    ActionContext, GamificationEngine, LeaderboardEntry, LeaderboardPeriod, RuleCatalog,
};
use gamification_shared::config::AppConfig;
use gamification_shared::observability::{self, ObservabilityGuard};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const SERVICE_NAME: &str = "gamification-cli";

#[derive(Parser)]
#[command(name = "gamification")]
#[command(about = "Points, badges, levels and leaderboards for program students")]
#[command(version)]
struct Cli {
    /// JSON catalog file (overrides catalog.path from config)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Print the Prometheus metrics snapshot to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the points an action is worth
    Points {
        /// Action token, e.g. assignment_submitted_early
        action: String,

        /// Event context as a JSON object
        #[arg(long)]
        context: Option<String>,
    },

    /// List badges a user newly qualifies for
    Badges {
        /// JSON file holding one leaderboard entry
        #[arg(long)]
        user: PathBuf,

        action: String,

        #[arg(long)]
        context: Option<String>,
    },

    /// Rank leaderboard entries and compute aggregate statistics
    Leaderboard {
        /// JSON file holding an array of leaderboard entries
        #[arg(long)]
        entries: PathBuf,

        /// all-time, weekly or monthly
        #[arg(long, default_value = "all-time")]
        period: LeaderboardPeriod,

        /// Only rank members of this cohort
        #[arg(long)]
        cohort: Option<String>,
    },

    /// Show the level and progress for an experience total
    Level {
        #[arg(allow_negative_numbers = true)]
        experience: i64,
    },

    /// Export the active catalog as JSON
    Catalog,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 配置加载失败时回退默认配置，不影响命令执行
    let mut config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if cli.print_metrics {
        config.observability.metrics_enabled = true;
    }
    if let Some(path) = cli.catalog.clone() {
        config.catalog.path = Some(path);
    }

    // 可观测性初始化失败不影响计算结果的输出
    let guard = observability::init(&config.observability).unwrap_or_else(|e| {
        eprintln!("Failed to initialize observability: {}", e);
        ObservabilityGuard::empty()
    });

    let catalog = RuleCatalog::load(&config.catalog).context("failed to load rule catalog")?;
    let engine = GamificationEngine::new(Arc::new(catalog));
    info!(environment = %config.environment, "Gamification engine ready");

    run(&engine, cli.command)?;

    if cli.print_metrics {
        if let Some(snapshot) = guard.render_metrics() {
            eprintln!("{}", snapshot);
        }
    }

    Ok(())
}

fn run(engine: &GamificationEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Points { action, context } => {
            let context = parse_context(context.as_deref())?;
            let breakdown = engine.points().compute_breakdown(&[action], &context);
            print_json(&breakdown)
        }
        Commands::Badges {
            user,
            action,
            context,
        } => {
            let user: LeaderboardEntry = read_json(&user)?;
            let context = parse_context(context.as_deref())?;
            let badges = engine.badges().eligible_badges(&user, &action, &context);
            print_json(&badges)
        }
        Commands::Leaderboard {
            entries,
            period,
            cohort,
        } => {
            let entries: Vec<LeaderboardEntry> = read_json(&entries)?;
            let ranker = engine.ranker();
            let ranked = match cohort.as_deref() {
                Some(cohort) => ranker.rank_cohort(&entries, cohort, period),
                None => ranker.rank_by(&entries, period),
            };
            let stats = ranker.leaderboard_stats(&ranked);
            print_json(&json!({
                "period": period,
                "entries": ranked,
                "stats": stats,
            }))
        }
        Commands::Level { experience } => print_json(&engine.ranker().level_progress(experience)),
        Commands::Catalog => print_json(&engine.catalog().to_definition()),
    }
}

fn parse_context(raw: Option<&str>) -> Result<ActionContext> {
    match raw {
        Some(raw) => ActionContext::from_json(raw).context("--context must be valid JSON"),
        None => Ok(ActionContext::empty()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
