use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use console::style;
use labprogress::progression::achievements::standard_rules;
use labprogress::progression::report::ProgressReport;
use labprogress::{
    ActivityEvent, Config, EngineOptions, EventType, ProgressionEngine, ProgressionSnapshot,
    SnapshotSource, SqliteBackend,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Progression and achievement engine for security labs.
#[derive(Parser, Debug)]
#[command(name = "labprogress", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an activity event and print the refreshed snapshot.
    Record {
        #[arg(long)]
        user: String,
        /// lab_completed, tool_used or daily_checkin
        #[arg(long = "type")]
        event_type: String,
        /// Lab or tool id (omit for check-ins).
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        points: i64,
        /// RFC 3339 timestamp; defaults to now.
        #[arg(long)]
        at: Option<String>,
        /// Event id; reusing one makes a retry record the event at most once.
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the current snapshot without changing anything.
    Snapshot {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the full progress report.
    Report {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Dump a user's events as JSON lines.
    Export {
        #[arg(long)]
        user: String,
        /// RFC 3339 lower bound (inclusive).
        #[arg(long)]
        since: Option<String>,
    },
    /// Set the IANA timezone used for a user's day boundaries.
    Timezone {
        #[arg(long)]
        user: String,
        #[arg(long)]
        tz: String,
    },
    /// List achievement rules.
    Achievements,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the JSON Schema of the configuration file.
    Schema,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("labprogress=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let now = Utc::now();

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config).context("rendering config")?);
            }
            ConfigAction::Schema => println!("{}", Config::json_schema()?),
        },
        Command::Achievements => {
            for rule in standard_rules() {
                println!(
                    "{:<16} {:>4} pts  {}: {}",
                    style(rule.id).bold(),
                    rule.points_awarded,
                    rule.name,
                    rule.description
                );
            }
        }
        Command::Record {
            user,
            event_type,
            subject,
            points,
            at,
            id,
            json,
        } => {
            let engine = open_engine(&config)?;
            let event_type: EventType = event_type.parse()?;
            let occurred_at = at.as_deref().map(parse_time).transpose()?.unwrap_or(now);
            let mut event = ActivityEvent::new(user, event_type, subject, points, occurred_at);
            if let Some(id) = id {
                event.id = id;
            }
            let refresh = engine.record_event(&event, now).map_err(|e| {
                if e.is_retryable() {
                    anyhow::anyhow!(
                        "{e}\nretry with --id {} to record the event at most once",
                        event.id
                    )
                } else {
                    e.into()
                }
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&refresh)?);
            } else {
                for id in &refresh.newly_earned {
                    println!("{} {}", style("Achievement unlocked:").green().bold(), id);
                }
                print_snapshot(&refresh.snapshot);
            }
        }
        Command::Snapshot { user, json } => {
            let engine = open_engine(&config)?;
            let (snapshot, source) = engine.get_snapshot_with_fallback(&user, now)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                if source == SnapshotSource::Cached {
                    println!("{}", style("store unavailable, showing cached progress").yellow());
                }
                print_snapshot(&snapshot);
            }
        }
        Command::Report { user, json } => {
            let engine = open_engine(&config)?;
            let report = engine.progress_report(&user, now)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Export { user, since } => {
            let engine = open_engine(&config)?;
            let since = since.as_deref().map(parse_time).transpose()?;
            for event in engine.export(&user, since)? {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        Command::Timezone { user, tz } => {
            let engine = open_engine(&config)?;
            engine.set_timezone(&user, &tz)?;
            println!("timezone for {user} set to {tz}");
        }
    }
    Ok(())
}

fn open_engine(config: &Config) -> Result<ProgressionEngine> {
    let db_dir = config.storage.resolved_db_dir()?;
    let backend = SqliteBackend::open(
        &db_dir,
        config.storage.writer_queue_capacity,
        config.storage.io_timeout(),
    )
    .with_context(|| format!("opening progression store in {}", db_dir.display()))?;
    Ok(ProgressionEngine::with_backend(
        Arc::new(backend),
        EngineOptions::from_config(config)?,
    ))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid RFC 3339 timestamp: {raw}"))?
        .with_timezone(&Utc))
}

fn print_snapshot(s: &ProgressionSnapshot) {
    println!("{}", style(&s.user_id).bold());
    println!(
        "  points       {} (+{} from achievements)",
        s.total_points, s.achievement_points
    );
    println!("  streak       {} days", s.current_streak_days);
    println!("  skill level  {}", s.skill_level);
    println!("  labs         {}", s.labs_completed.len());
    println!("  tools        {}", s.tools_used.len());
    if !s.earned_achievement_ids.is_empty() {
        let ids: Vec<&str> = s.earned_achievement_ids.iter().map(String::as_str).collect();
        println!("  achievements {}", ids.join(", "));
    }
}

fn print_report(r: &ProgressReport) {
    print_snapshot(&r.snapshot);
    println!("  labs done    {}/{}", r.catalog_labs_completed, r.labs_total);
    let tier = &r.tier_progress;
    match tier.next {
        Some(next) => println!("  next tier    {next} ({}%)", tier.percent),
        None => println!("  next tier    top tier reached"),
    }
    if let Some(goal) = r.next_goal {
        println!(
            "  next goal    complete {} labs, {} more to go",
            goal.target_labs, goal.remaining
        );
    }
    println!("{}", style("Achievements").bold());
    for a in &r.achievements {
        let mark = if a.earned {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!("  {mark} {:<16} {:>4} pts  {}", a.name, a.points, a.description);
    }
    if !r.recent_activity.is_empty() {
        println!("{}", style("Recent activity").bold());
        for e in &r.recent_activity {
            println!(
                "  {}  {:<14} {:<20} +{} pts",
                e.occurred_at.format("%Y-%m-%d %H:%M"),
                e.event_type,
                e.subject_id.as_deref().unwrap_or("-"),
                e.points
            );
        }
    }
}
