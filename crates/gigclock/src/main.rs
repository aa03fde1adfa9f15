//! gigclock - attendance tracking for gig workers
//!
//! This is the command-line driver. It wires together:
//! - Configuration loading (sites, shift thresholds, verification policy)
//! - Store initialization
//! - Device collaborators (position fix, identity verification)
//! - The attendance engine

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use gigclock_api::{AttendanceEvent, Coordinate, EventKind, StatusFilter};
use gigclock_config::{Policy, load_config};
use gigclock_core::{AttendanceEngine, format_distance, is_within_range};
use gigclock_device_api::{FixedLocation, ScriptedVerifier, locate_within, verify_within};
use gigclock_store::{SqliteStore, Store};
use gigclock_util::{
    DATABASE_FILENAME, SiteId, WorkerId, YearMonth, default_config_path,
    format_clock_time, format_datetime_full, local_date,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// gigclock - Geofenced, identity-verified attendance for gig workers
#[derive(Parser, Debug)]
#[command(name = "gigclock")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/gigclock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set GIGCLOCK_DATA_DIR env var)
    #[arg(short, long, env = "GIGCLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Worker whose attendance is tracked
    #[arg(short, long, env = "GIGCLOCK_WORKER", default_value = "default")]
    worker: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show today's state and events
    Status {
        /// Site to report against (default: configured default site)
        #[arg(long)]
        site: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check in at a site
    CheckIn(PunchArgs),

    /// Check out from a site
    CheckOut(PunchArgs),

    /// Show attendance grouped by day for a month
    History {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<YearMonth>,

        /// Only days with an event of this status (all, normal, late, early)
        #[arg(long, default_value = "all")]
        filter: StatusFilter,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show monthly statistics
    Stats {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<YearMonth>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the distance from a position to a site
    Distance {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[arg(long)]
        site: Option<String>,
    },

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(clap::Args, Debug)]
struct PunchArgs {
    /// Current latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Current longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Site to check in at (default: configured default site)
    #[arg(long)]
    site: Option<String>,

    /// Identity verification outcome to feed the gate (default: no attempt)
    #[arg(long, value_enum, default_value_t = VerifyMode::Skip)]
    verify: VerifyMode,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum VerifyMode {
    /// Verification succeeds
    Pass,
    /// Verification fails
    Fail,
    /// Do not attempt verification
    Skip,
}

/// Loaded configuration and opened store
struct App {
    policy: Policy,
    store: Arc<dyn Store>,
    worker: WorkerId,
}

impl App {
    fn open(args: &Args) -> Result<Self> {
        let policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            site_count = policy.sites.len(),
            "Configuration loaded"
        );

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        if !store.is_healthy() {
            bail!("Database {:?} is not usable", db_path);
        }
        debug!(db_path = %db_path.display(), "Store initialized");

        Ok(Self {
            policy,
            store,
            worker: WorkerId::new(args.worker.clone()),
        })
    }

    fn engine(&self, site: Option<&str>, now: DateTime<Utc>) -> Result<AttendanceEngine> {
        let requested = site.map(SiteId::new);
        let site = self
            .policy
            .resolve_site(requested.as_ref())
            .ok_or_else(|| match &requested {
                Some(id) => anyhow!("Unknown site '{}'", id),
                None => anyhow!("No sites configured"),
            })?
            .clone();

        AttendanceEngine::new(
            self.worker.clone(),
            self.store.clone(),
            site,
            self.policy.verification_required,
            now,
        )
        .context("Failed to load attendance state")
    }
}

fn print_event(event: &AttendanceEvent) {
    let local = event.timestamp.with_timezone(&Local);
    println!(
        "  {}  {:<9} {:<6} {:>7}{}",
        format_clock_time(&local),
        event.kind,
        event.status,
        format_distance(event.distance_meters),
        if event.verified { "  verified" } else { "" }
    );
}

fn status(app: &App, site: Option<&str>, json: bool, now: DateTime<Utc>) -> Result<()> {
    let engine = app.engine(site, now)?;
    let status = engine.status(now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Worker: {}", status.worker_id);
    println!("Site:   {} ({})", engine.site().label, engine.site().id);
    println!("Date:   {}", format_datetime_full(&now.with_timezone(&Local)));
    println!("State:  {}", status.state);
    match status.next_intent {
        Some(intent) => println!("Next:   {}", intent),
        None => println!("Next:   nothing more today"),
    }

    if !status.today.is_empty() {
        println!();
        println!("Today:");
        for event in &status.today {
            print_event(event);
        }
    }
    Ok(())
}

async fn punch(app: &App, intent: EventKind, args: &PunchArgs, now: DateTime<Utc>) -> Result<()> {
    let mut engine = app.engine(args.site.as_deref(), now)?;
    let service = &app.policy.service;

    let provider = FixedLocation::new(Coordinate::new(args.lat, args.lon)?);
    let current = match locate_within(&provider, service.location_timeout).await {
        Ok(coordinate) => Some(coordinate),
        Err(e) => {
            warn!(error = %e, "No position fix");
            None
        }
    };

    if args.verify != VerifyMode::Skip {
        engine.begin_verification()?;
        let verifier = ScriptedVerifier::new([args.verify == VerifyMode::Pass]);
        let success = match verify_within(&verifier, service.verification_timeout).await {
            Ok(success) => success,
            Err(e) => {
                warn!(error = %e, "Verification did not complete");
                false
            }
        };
        engine.resolve_verification(success, now)?;
    }

    let eligibility = engine.eligibility(current.as_ref());
    debug!(?eligibility, "Eligibility evaluated");

    let Some(current) = current else {
        engine.abandon_verification(now);
        bail!("Cannot {}: current location is unavailable", intent);
    };

    match engine.transition(intent, current, now) {
        Ok(event) => {
            println!("Recorded {} at {}", event.kind, engine.site().label);
            print_event(&event);
            Ok(())
        }
        Err(e) => {
            engine.abandon_verification(now);
            if !eligibility.reasons.is_empty() {
                eprintln!("Not eligible:");
                for reason in &eligibility.reasons {
                    eprintln!("  - {}", reason);
                }
            }
            Err(e).with_context(|| format!("Cannot {}", intent))
        }
    }
}

fn history(app: &App, month: YearMonth, filter: StatusFilter, json: bool, now: DateTime<Utc>) -> Result<()> {
    let engine = app.engine(None, now)?;
    let groups = engine.day_groups(month.date_range(), filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    println!("Attendance for {} ({})", month, app.worker);
    if groups.is_empty() {
        println!();
        println!("No records");
    }
    for group in &groups {
        println!();
        println!(
            "{}  {:.1}h  {}",
            group.date.format("%Y-%m-%d %a"),
            group.worked_hours,
            group.day_status
        );
        for event in &group.events {
            print_event(event);
        }
    }

    let today = local_date(&now);
    let prev = month.prev().map(|m| m.to_string()).unwrap_or_else(|| "-".into());
    let next = month.next_until(today).map(|m| m.to_string()).unwrap_or_else(|| "-".into());
    println!();
    println!("Previous: {}  Next: {}", prev, next);
    Ok(())
}

fn stats(app: &App, month: YearMonth, json: bool, now: DateTime<Utc>) -> Result<()> {
    let engine = app.engine(None, now)?;
    let stats = engine.month_stats(month)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Statistics for {} ({})", month, app.worker);
    println!("  Work days:   {}", stats.work_days);
    println!("  Total hours: {:.1}", stats.total_hours);
    println!("  Late:        {}", stats.late_count);
    println!("  Early leave: {}", stats.early_count);
    Ok(())
}

fn distance(app: &App, lat: f64, lon: f64, site: Option<&str>, now: DateTime<Utc>) -> Result<()> {
    let engine = app.engine(site, now)?;
    let current = Coordinate::new(lat, lon)?;
    let site = engine.site();

    println!(
        "{} from {} (allowed within {})",
        format_distance(gigclock_core::distance(&current, &site.coordinate)),
        site.label,
        format_distance(site.allowed_radius_meters)
    );
    if is_within_range(&current, site) {
        println!("In range");
    } else {
        println!("Out of range");
    }
    Ok(())
}

fn audit(app: &App, limit: usize) -> Result<()> {
    for entry in app.store.get_recent_audits(limit)? {
        println!(
            "{}  {}",
            format_datetime_full(&entry.timestamp.with_timezone(&Local)),
            serde_json::to_string(&entry.event)?
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "gigclock starting");

    let app = App::open(&args)?;
    let now = gigclock_util::now().with_timezone(&Utc);
    let this_month = YearMonth::of(local_date(&now));

    match &args.command {
        Commands::Status { site, json } => status(&app, site.as_deref(), *json, now),
        Commands::CheckIn(punch_args) => punch(&app, EventKind::CheckIn, punch_args, now).await,
        Commands::CheckOut(punch_args) => punch(&app, EventKind::CheckOut, punch_args, now).await,
        Commands::History { month, filter, json } => {
            history(&app, month.unwrap_or(this_month), *filter, *json, now)
        }
        Commands::Stats { month, json } => stats(&app, month.unwrap_or(this_month), *json, now),
        Commands::Distance { lat, lon, site } => distance(&app, *lat, *lon, site.as_deref(), now),
        Commands::Audit { limit } => audit(&app, *limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punch_args(argv: &[&str]) -> PunchArgs {
        match Args::try_parse_from(argv).unwrap().command {
            Commands::CheckIn(punch) | Commands::CheckOut(punch) => punch,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verification_is_not_attempted_by_default() {
        let punch = punch_args(&["gigclock", "check-in", "--lat", "1.0", "--lon", "2.0"]);
        assert_eq!(punch.verify, VerifyMode::Skip);
        assert_eq!(punch.lat, 1.0);
        assert_eq!(punch.lon, 2.0);
    }

    #[test]
    fn verification_outcome_is_explicit() {
        let punch = punch_args(&["gigclock", "check-out", "--lat", "1.0", "--lon", "2.0", "--verify", "pass"]);
        assert_eq!(punch.verify, VerifyMode::Pass);

        let punch = punch_args(&["gigclock", "check-in", "--lat", "-1.5", "--lon", "2.0", "--verify", "fail"]);
        assert_eq!(punch.verify, VerifyMode::Fail);
        assert_eq!(punch.lat, -1.5);
    }
}
