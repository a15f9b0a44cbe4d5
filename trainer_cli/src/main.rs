use chrono::{Local, Timelike, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use trainer_core::*;

#[derive(Parser)]
#[command(name = "icdtrain")]
#[command(about = "ICD-11 transition training companion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List training modules with progress and prerequisite status
    Modules,

    /// Record progress on a module (fraction between 0 and 1)
    Progress {
        /// Module id, e.g. icd11-basics
        module_id: String,

        /// Completion fraction; 1 marks the module complete
        fraction: f64,

        /// Record progress even if prerequisites are incomplete
        #[arg(long)]
        force: bool,
    },

    /// Show learning insights derived from training history
    Insights,

    /// Recommend the next modules to study (default)
    Recommend {
        /// Number of modules to show (defaults to config value)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        top: Option<u64>,
    },

    /// Roll up WAL sessions to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

/// File locations under the data directory
struct DataPaths {
    wal_dir: PathBuf,
    wal: PathBuf,
    state: PathBuf,
    csv: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            wal: wal_dir.join("training_sessions.wal"),
            state: wal_dir.join("state.json"),
            csv: data_dir.join("sessions.csv"),
            wal_dir,
        }
    }
}

fn main() -> Result<()> {
    trainer_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);

    match cli.command {
        Some(Commands::Modules) => cmd_modules(&paths),
        Some(Commands::Progress {
            module_id,
            fraction,
            force,
        }) => cmd_progress(&paths, &module_id, fraction, force),
        Some(Commands::Insights) => cmd_insights(&paths, &config),
        Some(Commands::Recommend { top }) => {
            let top_n = top.map_or(config.recommendations.top_n, |n| n as usize);
            cmd_recommend(&paths, &config, top_n)
        }
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&paths, cleanup),
        None => cmd_recommend(&paths, &config, config.recommendations.top_n),
    }
}

/// Catalog with stored progress applied, after validating it
fn load_catalog(state: &ProgressState) -> Result<Catalog> {
    let catalog = get_default_catalog().with_progress(&state.progress);
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

/// Closed sessions plus in-progress ones, restricted to the configured window
fn load_snapshot(paths: &DataPaths, config: &Config, state: &ProgressState) -> Result<Vec<TrainingSession>> {
    let closed = load_history(&paths.wal, &paths.csv, config.analysis.history_days)?;
    Ok(state.history_snapshot(&closed))
}

fn cmd_modules(paths: &DataPaths) -> Result<()> {
    let state = ProgressState::load(&paths.state)?;
    let catalog = load_catalog(&state)?;

    println!();
    for module in &catalog.modules {
        let marker = if module.is_complete() {
            "✓"
        } else if is_accessible(module, &catalog.modules) {
            " "
        } else {
            "🔒"
        };

        println!(
            "[{}] {:<24} {:<22} {:>3.0}%  {} · {}",
            marker,
            module.id,
            module.title,
            module.progress * 100.0,
            module.kind,
            module.duration_label
        );

        let missing = missing_prerequisites(module, &catalog.modules);
        if !module.is_complete() && !missing.is_empty() {
            println!("      requires: {}", missing.join(", "));
        }
    }
    println!();

    Ok(())
}

fn cmd_progress(paths: &DataPaths, module_id: &str, fraction: f64, force: bool) -> Result<()> {
    std::fs::create_dir_all(&paths.wal_dir)?;

    // Held until the state is saved so concurrent updates are not lost
    let _guard = ProgressState::lock(&paths.state)?;
    let mut state = ProgressState::load(&paths.state)?;
    let catalog = load_catalog(&state)?;

    let module = catalog
        .get(module_id)
        .ok_or_else(|| Error::UnknownModule(module_id.to_string()))?;

    if !is_accessible(module, &catalog.modules) {
        let missing = missing_prerequisites(module, &catalog.modules).join(", ");
        if !force {
            return Err(Error::Progress(format!(
                "{} is locked until these are complete: {}",
                module_id, missing
            )));
        }
        tracing::warn!("Recording progress on locked module {} (missing {})", module_id, missing);
    }

    let title = module.title.clone();
    let was_complete = module.is_complete();
    let closed = record_progress(&mut state, module_id, fraction, Utc::now())?;

    // Append before saving state so a completed session is never lost
    if let Some(ref session) = closed {
        let mut sink = JsonlSink::new(&paths.wal);
        sink.append(session)?;
    }
    state.save(&paths.state)?;

    match closed {
        Some(session) => {
            println!("\n✓ Completed {}!", title);
            if let Some(seconds) = session.duration_seconds() {
                println!("  Session length: {} min", (seconds / 60.0).round() as i64);
            }
        }
        None if was_complete && fraction >= 1.0 => {
            println!("\n✓ {} is already complete", title);
        }
        None => println!("\n✓ Progress saved: {} at {:.0}%", title, fraction * 100.0),
    }

    Ok(())
}

fn cmd_insights(paths: &DataPaths, config: &Config) -> Result<()> {
    let state = ProgressState::load(&paths.state)?;
    let catalog = load_catalog(&state)?;
    let history = load_snapshot(paths, config, &state)?;

    let pattern = analyze_with_source(&history, &Local, &catalog, config.analysis.category_source);
    let week = weekly_progress(&history, Local::now().date_naive(), &Local);

    display_pattern(&pattern, history.len());

    println!("  Weekly study time");
    for day in &week {
        let bar = "█".repeat((day.hours * 4.0).round() as usize);
        println!("    {}  {:>4.1}h {}", day.label, day.hours, bar);
    }
    println!();

    Ok(())
}

fn cmd_recommend(paths: &DataPaths, config: &Config, top_n: usize) -> Result<()> {
    let state = ProgressState::load(&paths.state)?;
    let catalog = load_catalog(&state)?;
    let history = load_snapshot(paths, config, &state)?;

    let pattern = analyze_with_source(&history, &Local, &catalog, config.analysis.category_source);
    let recommended = recommend_from_catalog(&catalog, &pattern, top_n);

    if recommended.is_empty() {
        println!("\n✓ All modules complete. Nothing left to recommend.");
        return Ok(());
    }

    println!("\nRecommended for a {} learner:", pattern.learning_style);
    for (rank, module) in recommended.iter().enumerate() {
        let lock = if is_accessible(module, &catalog.modules) {
            String::new()
        } else {
            format!(
                "  (locked: finish {})",
                missing_prerequisites(module, &catalog.modules).join(", ")
            )
        };
        println!(
            "  {}. {} [{}]  score {:.2}{}",
            rank + 1,
            module.title,
            module.id,
            score_module(module, &pattern),
            lock
        );
    }

    if let Some(next) = next_recommended(&recommended) {
        println!(
            "\n  → Up next: {} around {:02}:00",
            next.title,
            pattern.preferred_time_of_day.hour()
        );
    }
    println!();

    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = trainer_core::csv_rollup::wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} sessions to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = trainer_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn display_pattern(pattern: &TrainingPattern, session_count: usize) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  LEARNING INSIGHTS");
    println!("╰─────────────────────────────────────────╯");
    println!();

    if session_count == 0 {
        println!("  No training history yet. Showing defaults.");
        println!();
    }

    println!("  Learning style: {}", pattern.learning_style);
    println!("  {}", pattern.learning_style.description());
    println!();
    println!(
        "  Best time to study: {}",
        pattern.preferred_time_of_day.format("%H:%M")
    );
    println!(
        "  Typical session: {} minutes",
        (pattern.average_session_seconds / 60.0) as i64
    );
    println!(
        "  Completion rate: {:.0}% of {} sessions",
        pattern.completion_rate * 100.0,
        session_count
    );
    println!();
    println!("  Strengths:  {}", join_or_none(&pattern.strengths));
    println!("  Weaknesses: {}", join_or_none(&pattern.weaknesses));
    println!();
}

fn join_or_none<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "none yet".to_string()
    } else {
        joined.join(", ")
    }
}
