use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use setlog_core::catalog::validate_templates;
use setlog_core::plan::group_key;
use setlog_core::stats::CategoryLoad;
use setlog_core::suggest::WorkoutSection;
use setlog_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "setlog")]
#[command(about = "Volume-based workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty library, or one seeded with starter exercises
    Init {
        /// Add the starter exercises and their muscle group budgets
        #[arg(long)]
        starter: bool,

        /// Replace an existing library
        #[arg(long)]
        force: bool,
    },

    /// Add an exercise
    Add {
        name: String,

        /// strength, endurance, mobility or nsuns
        #[arg(long)]
        category: Category,

        /// Muscle group the exercise trains
        #[arg(long)]
        group: String,

        /// Weight within the muscle group budget (0-3)
        #[arg(long, default_value_t = 1)]
        priority: u8,

        /// Target sets per training interval, used when the group has no budget
        #[arg(long, default_value_t = 0)]
        sets: u32,

        /// Target distance (km) per training interval, endurance only
        #[arg(long)]
        distance: Option<f64>,

        /// One-rep max, nsuns only
        #[arg(long)]
        one_rep_max: Option<f64>,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Remove an exercise and its history
    Remove { exercise: String },

    /// List exercises with their remaining volume
    List {
        #[arg(long)]
        category: Option<Category>,

        /// Override the configured volume policy (decayed, hard_window)
        #[arg(long)]
        policy: Option<VolumePolicy>,
    },

    /// Log a workout entry against an exercise
    Log {
        exercise: String,

        #[arg(long)]
        sets: Option<f64>,

        #[arg(long)]
        reps: Option<f64>,

        #[arg(long)]
        weight: Option<f64>,

        /// Kilometres, endurance only
        #[arg(long)]
        distance: Option<f64>,

        /// Minutes, endurance only
        #[arg(long)]
        time: Option<f64>,

        /// Average heart rate, endurance only
        #[arg(long)]
        heart_rate: Option<f64>,

        /// Date the workout as this many days ago
        #[arg(long, default_value_t = 0)]
        days_ago: u32,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Show recent history for an exercise
    History {
        exercise: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Set an exercise's priority and rebalance its muscle group
    Priority { exercise: String, priority: u8 },

    /// Set a muscle group's set budget and rebalance it
    Budget {
        category: Category,
        group: String,
        sets: u32,
    },

    /// Suggest a workout from outstanding volume
    Suggest {
        /// Drop these exercises and pull in the next-ranked alternatives
        #[arg(long)]
        replace: Vec<String>,

        #[arg(long)]
        policy: Option<VolumePolicy>,

        /// Print the suggestion as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show target vs. actual load for the training interval
    Stats {
        /// Step export to include (defaults to <data_dir>/steps.json)
        #[arg(long)]
        steps: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the library to a portable JSON document
    Export { path: PathBuf },

    /// Replace the library with an exported JSON document
    Import { path: PathBuf },

    /// Write the workout history to CSV
    ExportCsv {
        /// Defaults to <data_dir>/history.csv
        path: Option<PathBuf>,
    },

    /// Show or set the training interval in days
    Interval { days: Option<u32> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setlog_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let library_path = data_dir.join("library.json");

    match cli.command {
        Commands::Init { starter, force } => cmd_init(&library_path, &config, starter, force),
        Commands::Add {
            name,
            category,
            group,
            priority,
            sets,
            distance,
            one_rep_max,
            description,
        } => {
            let kind = match category {
                Category::Strength => ExerciseKind::Strength,
                Category::Mobility => ExerciseKind::Mobility,
                Category::Endurance => ExerciseKind::Endurance {
                    distance: distance.ok_or_else(|| {
                        Error::Validation("endurance exercises need --distance".into())
                    })?,
                },
                Category::Nsuns => ExerciseKind::Nsuns {
                    one_rep_max: one_rep_max.ok_or_else(|| {
                        Error::Validation("nsuns exercises need --one-rep-max".into())
                    })?,
                    workout: Vec::new(),
                },
            };
            let exercise = Exercise::new(name, group, kind)
                .with_priority(priority)
                .with_weekly_sets(sets)
                .with_description(description);

            let library = Library::update(&library_path, |library| {
                library.add_exercise(exercise).map(|_| ())
            })?;
            if let Some(added) = library.exercises.last() {
                println!(
                    "✓ Added {} exercise '{}' (target {})",
                    added.category(),
                    added.name,
                    format_target(added)
                );
            }
            Ok(())
        }
        Commands::Remove { exercise } => {
            let mut removed = None;
            Library::update(&library_path, |library| {
                let id = library.find_exercise(&exercise)?.id;
                removed = Some(library.remove_exercise(id)?);
                Ok(())
            })?;
            if let Some(removed) = removed {
                println!("✓ Removed '{}' and its history", removed.name);
            }
            Ok(())
        }
        Commands::List { category, policy } => {
            let library = Library::load(&library_path)?;
            cmd_list(&library, &config, category, policy)
        }
        Commands::Log {
            exercise,
            sets,
            reps,
            weight,
            distance,
            time,
            heart_rate,
            days_ago,
            notes,
        } => {
            let mut logged = None;
            Library::update(&library_path, |library| {
                let target = library.find_exercise(&exercise)?;
                let record = match target.category().record_category() {
                    Category::Endurance => EntryRecord::Endurance {
                        distance: distance.ok_or_else(|| {
                            Error::Validation(format!("'{}' needs --distance", target.name))
                        })?,
                        time: time.unwrap_or(0.0),
                        avg_heart_rate: heart_rate,
                    },
                    Category::Mobility => EntryRecord::mobility(sets.ok_or_else(|| {
                        Error::Validation(format!("'{}' needs --sets", target.name))
                    })?),
                    _ => EntryRecord::strength(
                        sets.ok_or_else(|| {
                            Error::Validation(format!("'{}' needs --sets", target.name))
                        })?,
                        reps.unwrap_or(0.0),
                        weight.unwrap_or(0.0),
                    ),
                };
                let date = Utc::now() - Duration::days(i64::from(days_ago));
                let entry = HistoryEntry::new(date, record).with_notes(notes);
                let volume = entry.volume();
                let (id, name) = (target.id, target.name.clone());
                library.log_entry(id, entry)?;
                logged = Some((name, volume));
                Ok(())
            })?;
            if let Some((name, volume)) = logged {
                println!("✓ Logged {} for '{}'", format_amount(volume), name);
            }
            Ok(())
        }
        Commands::History { exercise, limit } => {
            let library = Library::load(&library_path)?;
            let target = library.find_exercise(&exercise)?;
            let entries = library.recent_history(target.id);
            if entries.is_empty() {
                println!("No history for '{}'", target.name);
                return Ok(());
            }
            println!("History for '{}':", target.name);
            for entry in entries.into_iter().take(limit) {
                let notes = if entry.notes.is_empty() {
                    String::new()
                } else {
                    format!("  ({})", entry.notes)
                };
                println!(
                    "  {}  {}{}",
                    entry.date.format("%Y-%m-%d %H:%M"),
                    describe_record(&entry.record),
                    notes
                );
            }
            Ok(())
        }
        Commands::Priority {
            exercise,
            priority,
        } => {
            let library = Library::update(&library_path, |library| {
                let id = library.find_exercise(&exercise)?.id;
                library.set_priority(id, priority)
            })?;
            let updated = library.find_exercise(&exercise)?;
            println!(
                "✓ '{}' priority {}, target {}",
                updated.name,
                updated.priority,
                format_target(updated)
            );
            Ok(())
        }
        Commands::Budget {
            category,
            group,
            sets,
        } => {
            let library = Library::update(&library_path, |library| {
                library.set_budget(category, &group, sets)
            })?;
            println!("✓ {} '{}' budget set to {} sets", category, group, sets);
            let key = group_key(&group);
            for exercise in library
                .exercises
                .iter()
                .filter(|e| e.category() == category && group_key(&e.muscle_group) == key)
            {
                println!(
                    "  {:<28} priority {}  {} sets",
                    exercise.name, exercise.priority, exercise.weekly_sets
                );
            }
            Ok(())
        }
        Commands::Suggest {
            replace,
            policy,
            json,
        } => {
            let library = Library::load(&library_path)?;
            cmd_suggest(&library, &config, &replace, policy, json)
        }
        Commands::Stats { steps, json } => {
            let library = Library::load(&library_path)?;
            let steps_path = steps.unwrap_or_else(|| data_dir.join("steps.json"));
            cmd_stats(&library, &config, &steps_path, json)
        }
        Commands::Export { path } => {
            let library = Library::load(&library_path)?;
            library.export_document(&path)?;
            println!(
                "✓ Exported {} exercises to {}",
                library.exercises.len(),
                path.display()
            );
            Ok(())
        }
        Commands::Import { path } => {
            let library = Library::import_document(&path)?;
            library.save(&library_path)?;
            println!(
                "✓ Imported {} exercises from {}",
                library.exercises.len(),
                path.display()
            );
            Ok(())
        }
        Commands::ExportCsv { path } => {
            let library = Library::load(&library_path)?;
            let csv_path = path.unwrap_or_else(|| data_dir.join("history.csv"));
            let count = export_history_csv(&library, &csv_path)?;
            println!("✓ Wrote {} entries to CSV", count);
            println!("  CSV: {}", csv_path.display());
            Ok(())
        }
        Commands::Interval { days } => {
            let library = match days {
                Some(days) => {
                    let interval = TrainingInterval::new(days)?;
                    Library::update(&library_path, |library| {
                        library.set_training_interval(interval);
                        Ok(())
                    })?
                }
                None => Library::load(&library_path)?,
            };
            println!(
                "Training interval: {} days",
                library.training_interval().days()
            );
            Ok(())
        }
    }
}

fn cmd_init(library_path: &Path, config: &Config, starter: bool, force: bool) -> Result<()> {
    if library_path.exists() && !force {
        let existing = Library::load(library_path)?;
        if !existing.exercises.is_empty() {
            return Err(Error::Validation(format!(
                "{} already holds {} exercises; pass --force to replace it",
                library_path.display(),
                existing.exercises.len()
            )));
        }
    }

    let mut library = Library::new(store::Settings {
        training_interval: config.training.interval()?,
    });

    if starter {
        let templates = starter_templates();
        let plan = default_plan();
        let errors = validate_templates(templates, &plan);
        if !errors.is_empty() {
            eprintln!("Starter catalog validation errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            return Err(Error::Other("Invalid starter catalog".into()));
        }
        library.exercises = onboard(templates, &plan);
        library.plan = plan;
    }

    library.save(library_path)?;
    println!(
        "✓ Created library with {} exercises ({}-day interval)",
        library.exercises.len(),
        library.training_interval().days()
    );
    println!("  Library: {}", library_path.display());
    Ok(())
}

fn ledger_for(library: &Library, config: &Config, policy: Option<VolumePolicy>) -> VolumeLedger {
    VolumeLedger::new(
        library.training_interval(),
        policy.unwrap_or(config.training.policy),
        Utc::now(),
    )
    .with_decay(config.training.decay())
}

fn cmd_list(
    library: &Library,
    config: &Config,
    category: Option<Category>,
    policy: Option<VolumePolicy>,
) -> Result<()> {
    let ledger = ledger_for(library, config, policy);
    let remaining = ledger.remaining_for_all(&library.exercises, &library.history);

    let mut shown = 0;
    for section in Category::ALL {
        if category.is_some_and(|c| c != section) {
            continue;
        }
        let mut members: Vec<&Exercise> = library
            .exercises
            .iter()
            .filter(|e| e.category() == section)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.sort_by(|a, b| {
            a.muscle_group
                .to_lowercase()
                .cmp(&b.muscle_group.to_lowercase())
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.name.cmp(&b.name))
        });

        println!("{}:", section.as_str().to_uppercase());
        for exercise in members {
            let left = remaining.get(&exercise.id).copied().unwrap_or(0.0);
            println!(
                "  {:<28} {:<12} p{}  target {:<8} remaining {}",
                exercise.name,
                exercise.muscle_group,
                exercise.priority,
                format_target(exercise),
                format_amount(left.max(0.0))
            );
            shown += 1;
        }
    }

    if shown == 0 {
        println!("No exercises. Run `setlog init --starter` or `setlog add`.");
    }
    Ok(())
}

fn cmd_suggest(
    library: &Library,
    config: &Config,
    replace: &[String],
    policy: Option<VolumePolicy>,
    json: bool,
) -> Result<()> {
    let ledger = ledger_for(library, config, policy);
    let mut workout = suggest_workout(
        &library.exercises,
        &library.history,
        &ledger,
        &config.suggestions,
    );

    for name in replace {
        let exercise = library.find_exercise(name)?;
        match workout.remove_and_replace(exercise.id)? {
            Some(next) => tracing::info!("Replaced '{}' with '{}'", exercise.name, next.name),
            None => tracing::info!("Removed '{}', no alternative left", exercise.name),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&workout)?);
        return Ok(());
    }

    if workout.is_empty() {
        println!("Nothing due. All volume targets are met for this interval.");
        return Ok(());
    }

    for section in &workout.sections {
        display_section(section);
    }
    Ok(())
}

fn display_section(section: &WorkoutSection) {
    println!("{}:", section.category.as_str().to_uppercase());
    for pick in &section.picks {
        let unit = if section.category == Category::Endurance {
            "km"
        } else {
            "sets"
        };
        println!(
            "  → {:<28} {} {}  ({} left)",
            pick.name,
            format_amount(pick.amount),
            unit,
            format_amount(pick.remaining)
        );
    }
}

fn cmd_stats(library: &Library, config: &Config, steps_path: &Path, json: bool) -> Result<()> {
    let steps = load_step_series(steps_path, config.steps.daily_goal);
    let report = load_report(
        &library.exercises,
        &library.history,
        library.training_interval(),
        Utc::now(),
        steps.as_ref(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Last {} days:", report.interval_days);
    for load in &report.categories {
        display_load(load);
    }
    if let Some(steps) = &report.steps {
        println!(
            "  {:<10} {:>8.0} / {:<8.0} {}",
            "steps",
            steps.actual_steps,
            steps.target_steps,
            format_completion(steps.completion)
        );
    }
    println!("Combined score: {}%", report.combined_score);
    Ok(())
}

fn display_load(load: &CategoryLoad) {
    println!(
        "  {:<10} {:>8} / {:<8} {}",
        load.category.to_string(),
        format_amount(load.actual_load),
        format_amount(load.target_load),
        format_completion(load.completion)
    );
}

fn format_completion(completion: Option<f64>) -> String {
    match completion {
        Some(percent) => format!("{:.0}%", percent),
        None => "n/a".to_string(),
    }
}

fn format_target(exercise: &Exercise) -> String {
    match exercise.kind {
        ExerciseKind::Endurance { distance } => format!("{} km", format_amount(distance)),
        _ => format!("{} sets", exercise.weekly_sets),
    }
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn describe_record(record: &EntryRecord) -> String {
    match record {
        EntryRecord::Strength { sets, reps, weight } => format!(
            "{} sets × {} reps @ {}",
            format_amount(*sets),
            format_amount(*reps),
            format_amount(*weight)
        ),
        EntryRecord::Endurance {
            distance,
            time,
            avg_heart_rate,
        } => {
            let mut text = format!("{} km in {} min", format_amount(*distance), format_amount(*time));
            if let Some(hr) = avg_heart_rate {
                text.push_str(&format!(", avg HR {:.0}", hr));
            }
            text
        }
        EntryRecord::Mobility { sets } => format!("{} sets", format_amount(*sets)),
    }
}
