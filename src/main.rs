//! # Outreach — candidate outreach sequencer
//!
//! Tracks job candidates and drives a staged outreach email sequence per
//! candidate (welcome on day 0, follow-ups on day 2 and day 5 by default).
//!
//! Usage:
//!   outreach add "Jane Doe" jane@example.com "Staff Engineer"
//!   outreach trigger 1                 # schedule Jane's sequence from now
//!   outreach tick                      # process everything currently due
//!   outreach run                       # poll on an interval until killed
//!   outreach history 1                 # delivery log for candidate 1
//!   outreach stats                     # dashboard counts

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use outreach_core::traits::SystemClock;
use outreach_core::{OutreachConfig, SequenceDefinition};
use outreach_scheduler::{Dispatcher, OutreachDb, Sequencer};

#[derive(Parser)]
#[command(
    name = "outreach",
    version,
    about = "Candidate outreach sequencer — staged recruitment emails on a schedule"
)]
struct Cli {
    /// Config file (default: ~/.outreach/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Database path override
    #[arg(long)]
    db_path: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a candidate
    Add {
        name: String,
        email: String,
        position: String,
    },
    /// List all candidates
    List,
    /// Schedule the outreach sequence for a candidate, anchored at now
    Trigger { candidate_id: i64 },
    /// Process every email currently due, then exit
    Tick,
    /// Poll for due emails on the configured interval until killed
    Run,
    /// Show the delivery log for a candidate
    History { candidate_id: i64 },
    /// Show queue counts (per candidate, or the whole dashboard)
    Stats { candidate_id: Option<i64> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "outreach=debug,outreach_scheduler=debug,outreach_mailer=debug"
    } else {
        "outreach=info,outreach_scheduler=info,outreach_mailer=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => OutreachConfig::load_from(Path::new(&expand(path)))?,
        None => OutreachConfig::load()?,
    };
    let db_path = expand(cli.db_path.as_deref().unwrap_or(&config.db_path));

    let db = Arc::new(OutreachDb::open(Path::new(&db_path))?);
    let definition = SequenceDefinition::builtin(config.sequence.delay_days.as_deref());

    match cli.command {
        Command::Add { name, email, position } => {
            let id = db.add_candidate(&name, &email, &position)?;
            println!("✅ Added candidate: {name} ({email}) - ID: {id}");
        }
        Command::List => {
            let candidates = db.list_candidates()?;
            if candidates.is_empty() {
                println!("No candidates yet. Add one with `outreach add`.");
            }
            for c in candidates {
                println!("{:>4}  {}  <{}>  {}  [{}]", c.id, c.name, c.email, c.position, c.status);
            }
        }
        Command::Trigger { candidate_id } => {
            let sequencer = Sequencer::new(definition);
            let tasks = sequencer.trigger_and_enqueue(&db, candidate_id, Utc::now())?;
            println!("📅 Scheduled {} emails:", tasks.len());
            for task in tasks {
                println!(
                    "   #{} {} — {}",
                    task.sequence_index,
                    task.scheduled_for.format("%Y-%m-%d %H:%M UTC"),
                    task.subject
                );
            }
        }
        Command::Tick => {
            let mailer = outreach_mailer::from_config(&config.smtp);
            let dispatcher = Dispatcher::new(db, mailer, definition);
            let report = dispatcher.tick(Utc::now()).await?;
            if report.is_empty() {
                println!("📭 No pending emails to process");
            } else {
                println!(
                    "📤 Processed {} emails: {} sent, {} failed",
                    report.attempted, report.sent, report.failed
                );
            }
        }
        Command::Run => {
            let mailer = outreach_mailer::from_config(&config.smtp);
            let dispatcher = Dispatcher::new(db, mailer, definition);
            dispatcher
                .run(&SystemClock, Duration::from_secs(config.poll_interval_secs))
                .await;
        }
        Command::History { candidate_id } => {
            let history = db.history(candidate_id)?;
            if history.is_empty() {
                println!("No delivery attempts for candidate {candidate_id} yet.");
            }
            for entry in history {
                let outcome = entry.outcome.as_str();
                let detail = entry
                    .error_detail
                    .map(|d| format!(" — {d}"))
                    .unwrap_or_default();
                println!(
                    "{}  email #{}  {}{}",
                    entry.attempted_at.format("%Y-%m-%d %H:%M UTC"),
                    entry.sequence_index,
                    outcome,
                    detail
                );
            }
        }
        Command::Stats { candidate_id } => match candidate_id {
            Some(id) => {
                let candidate = db.get_candidate(id)?;
                let stats = db.candidate_stats(id)?;
                println!("{} <{}>", candidate.name, candidate.email);
                println!(
                    "   pending: {}  sent: {}  failed: {}",
                    stats.pending, stats.sent, stats.failed
                );
            }
            None => {
                let stats = db.global_stats()?;
                println!("📊 Outreach dashboard");
                println!(
                    "   Candidates: {} ({} active)",
                    stats.candidates, stats.active_candidates
                );
                println!(
                    "   Queue: {} pending, {} sent, {} failed",
                    stats.pending, stats.sent, stats.failed
                );
                println!("   Delivery attempts logged: {}", stats.attempts);
            }
        },
    }

    Ok(())
}

fn expand(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}
