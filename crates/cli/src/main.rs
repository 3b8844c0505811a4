//! Odds Screener: backtest away-win rules on history and screen today's fixtures
//!
//! Usage:
//!   odds-screener backtest --history past.csv             # evaluate the rule bank
//!   odds-screener run --history past.csv --today day.csv  # evaluate, promote, screen
//!   odds-screener screen --today day.csv --rules-from report.json

mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use engine::{
    evaluate_history, run_pipeline, DailyScreener, EvaluationReport, FeatureEngine, MatchDataset,
    RuleBank, ScreenerConfig,
};
use ingest::{LeagueAllowList, LeagueFilterOutcome};
use tracing::{error, info, warn};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "odds-screener")]
#[command(about = "Away-win rule backtesting and daily fixture screening", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest every rule on historical results and report promotions
    Backtest {
        /// Historical matches (.csv or .xlsx)
        #[arg(long)]
        history: PathBuf,
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Backtest on history, then screen today's fixtures with the promoted rules
    Run {
        /// Historical matches (.csv or .xlsx)
        #[arg(long)]
        history: PathBuf,
        /// Today's fixtures (.csv or .xlsx)
        #[arg(long)]
        today: PathBuf,
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Screen today's fixtures with rules promoted elsewhere
    Screen {
        /// Today's fixtures (.csv or .xlsx)
        #[arg(long)]
        today: PathBuf,
        /// Rule names to apply (comma-separated)
        #[arg(long, value_delimiter = ',')]
        promoted: Vec<String>,
        /// Take the promoted rules from a JSON report exported by `backtest` or `run`
        #[arg(long, conflicts_with = "promoted")]
        rules_from: Option<PathBuf>,
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the rule bank, or write it out as JSON
    Rules {
        /// Rule bank JSON (default: built-in grid)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Write the bank to this path instead of listing it
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List the derived feature catalogue
    Features,
}

#[derive(Args)]
struct InputArgs {
    /// Rule bank JSON (default: $SCREENER_RULES_PATH, else the built-in grid)
    #[arg(long)]
    rules: Option<PathBuf>,
    /// League allow-list, one name per line (default: $SCREENER_LEAGUES_PATH, else built-in)
    #[arg(long)]
    leagues: Option<PathBuf>,
    /// Keep every league
    #[arg(long, conflicts_with = "leagues")]
    no_league_filter: bool,
    /// Run configuration JSON (default: $SCREENER_CONFIG_PATH, else defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Order each batch by kickoff before evaluating
    #[arg(long)]
    sort_by_time: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Number of rules shown in the summary tables
    #[arg(long, default_value_t = 25)]
    show: usize,
    /// Optional JSON export path
    #[arg(long)]
    export: Option<PathBuf>,
}

/// Everything a batch run needs besides the data itself
struct Setup {
    engine: FeatureEngine,
    bank: RuleBank,
    config: ScreenerConfig,
    leagues: Option<LeagueAllowList>,
    sort_by_time: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,ingest=debug,odds_screener=debug")
    } else {
        EnvFilter::new("info,engine=info,ingest=info,odds_screener=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Backtest {
            history,
            inputs,
            output,
        } => cmd_backtest(&history, inputs, output)?,
        Commands::Run {
            history,
            today,
            inputs,
            output,
        } => cmd_run(&history, &today, inputs, output)?,
        Commands::Screen {
            today,
            promoted,
            rules_from,
            inputs,
            output,
        } => cmd_screen(&today, promoted, rules_from, inputs, output)?,
        Commands::Rules { rules, export } => cmd_rules(rules, export)?,
        Commands::Features => cmd_features(),
    }

    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

/// Explicit flag first, then the environment variable
fn path_or_env(flag: Option<PathBuf>, var: &str) -> Option<PathBuf> {
    flag.or_else(|| std::env::var(var).ok().filter(|v| !v.is_empty()).map(PathBuf::from))
}

fn load_bank(path: Option<PathBuf>, engine: &FeatureEngine) -> anyhow::Result<RuleBank> {
    match path_or_env(path, "SCREENER_RULES_PATH") {
        Some(path) => ingest::load_rule_bank(&path, engine.catalog())
            .with_context(|| format!("Failed to load rule bank {}", path.display())),
        None => {
            let bank = RuleBank::standard();
            info!(rules = bank.len(), "Using built-in rule grid");
            Ok(bank)
        }
    }
}

impl Setup {
    fn load(inputs: InputArgs) -> anyhow::Result<Self> {
        let engine = FeatureEngine::default();
        let bank = load_bank(inputs.rules, &engine)?;

        let config = match path_or_env(inputs.config, "SCREENER_CONFIG_PATH") {
            Some(path) => ingest::load_config(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ScreenerConfig::default(),
        };

        let leagues = if inputs.no_league_filter {
            None
        } else {
            match path_or_env(inputs.leagues, "SCREENER_LEAGUES_PATH") {
                Some(path) => Some(
                    LeagueAllowList::from_file(&path)
                        .with_context(|| format!("Failed to load leagues {}", path.display()))?,
                ),
                None => Some(LeagueAllowList::standard()),
            }
        };

        Ok(Self {
            engine,
            bank,
            config,
            leagues,
            sort_by_time: inputs.sort_by_time,
        })
    }

    /// Read one batch and apply the league filter and optional kickoff ordering
    fn load_batch(&self, label: &str, path: &Path) -> anyhow::Result<MatchDataset> {
        let mut dataset = ingest::load_dataset(path)
            .with_context(|| format!("Failed to load {} data from {}", label, path.display()))?;

        if let Some(leagues) = &self.leagues {
            match leagues.filter(&mut dataset) {
                LeagueFilterOutcome::Filtered { kept, removed } => {
                    println!("{label}: {kept} rows kept, {removed} outside the league allow-list");
                }
                LeagueFilterOutcome::NoLeagueColumn => {
                    println!("{label}: no League column, league filter skipped");
                }
            }
        }
        if dataset.is_empty() {
            println!("{label}: no rows to process");
        }
        if self.sort_by_time {
            dataset.sort_chronologically();
        }
        Ok(dataset)
    }

    /// Like `load_batch` but reports the failure and carries on without the batch
    fn load_batch_isolated(&self, label: &str, path: &Path) -> Option<MatchDataset> {
        match self.load_batch(label, path) {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                let message = format!("{e:#}");
                error!(batch = label, error = %message, "Batch not loaded");
                println!("{label}: {message}");
                None
            }
        }
    }

    fn print_header(&self) {
        println!("\n=== Odds Screener v{} ===", APP_VERSION);
        println!(
            "Rules: {} (fingerprint {}) | Min away odds: {} | Windows: {}/{}",
            self.bank.len(),
            &self.bank.fingerprint()[..12],
            self.config.min_away_odds,
            self.config.promotion.short_window,
            self.config.promotion.long_window,
        );
        println!(
            "Leagues: {}",
            match &self.leagues {
                Some(l) => format!("{} allowed", l.len()),
                None => "no filter".to_string(),
            }
        );
        println!();
    }
}

fn write_export<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("\nResults exported to {}", path.display());
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_backtest(history: &Path, inputs: InputArgs, output: OutputArgs) -> anyhow::Result<()> {
    let setup = Setup::load(inputs)?;
    setup.print_header();

    let dataset = setup.load_batch("History", history)?;
    let report = evaluate_history(&setup.engine, &dataset, &setup.bank, &setup.config)?;

    display::print_evaluation(&report, output.show);

    if let Some(path) = output.export {
        write_export(&path, &report)?;
    }
    Ok(())
}

fn cmd_run(
    history: &Path,
    today: &Path,
    inputs: InputArgs,
    output: OutputArgs,
) -> anyhow::Result<()> {
    let setup = Setup::load(inputs)?;
    setup.print_header();

    let history = setup.load_batch_isolated("History", history);
    let today = setup.load_batch_isolated("Today", today);

    let report = run_pipeline(
        &setup.engine,
        history.as_ref(),
        today.as_ref(),
        &setup.bank,
        &setup.config,
    );

    if let Some(evaluation) = &report.evaluation {
        display::print_evaluation(evaluation, output.show);
    }
    if let Some(screen) = &report.screen {
        let has_league = today.as_ref().is_some_and(|d| d.schema.has_league);
        display::print_screen(screen, has_league);
    }
    display::print_messages(&report.messages);

    if let Some(path) = output.export {
        write_export(&path, &report)?;
    }
    Ok(())
}

/// Promoted rule names from an exported evaluation or pipeline report
fn promoted_from_report(path: &Path, bank: &RuleBank) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let value = match value.get("evaluation").cloned() {
        Some(serde_json::Value::Null) => {
            anyhow::bail!("{} holds no rule evaluation", path.display())
        }
        Some(evaluation) => evaluation,
        None => value,
    };
    let report: EvaluationReport = serde_json::from_value(value)
        .with_context(|| format!("{} is not an exported report", path.display()))?;

    if report.rule_bank_fingerprint != bank.fingerprint() {
        warn!(
            report = %report.rule_bank_fingerprint,
            bank = %bank.fingerprint(),
            "Report was produced with a different rule bank"
        );
    }
    Ok(report.promoted)
}

fn cmd_screen(
    today: &Path,
    promoted: Vec<String>,
    rules_from: Option<PathBuf>,
    inputs: InputArgs,
    output: OutputArgs,
) -> anyhow::Result<()> {
    let setup = Setup::load(inputs)?;
    setup.print_header();

    let promoted = match rules_from {
        Some(path) => promoted_from_report(&path, &setup.bank)?,
        None => promoted,
    };
    println!("Promoted rules: {}", promoted.len());

    let dataset = setup.load_batch("Today", today)?;
    let screen = DailyScreener::new(&setup.engine, setup.config.screen_min_away_odds)
        .screen(&dataset, &setup.bank, &promoted)?;

    display::print_screen(&screen, dataset.schema.has_league);

    if let Some(path) = output.export {
        write_export(&path, &screen)?;
    }
    Ok(())
}

fn cmd_rules(rules: Option<PathBuf>, export: Option<PathBuf>) -> anyhow::Result<()> {
    let engine = FeatureEngine::default();
    let bank = load_bank(rules, &engine)?;

    if let Some(path) = export {
        std::fs::write(&path, bank.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} rules written to {}", bank.len(), path.display());
        return Ok(());
    }

    display::print_rules(&bank);
    Ok(())
}

fn cmd_features() {
    display::print_features(FeatureEngine::default().catalog());
}
