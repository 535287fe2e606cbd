use std::{path::PathBuf, process::ExitCode};

use chrono::{DateTime, Utc};
use clap::Parser;
use eventlens::{
    config::{self, LifecycleConfig},
    db::DbPool,
    jobs::{JobKind, LifecycleRunner, RunReport},
    observability,
    services::{create_blob_storage, create_face_collection_service, create_notification_sender},
};

/// CLI arguments for the EventLens lifecycle jobs
#[derive(Parser, Debug)]
#[command(version, about = "EventLens event lifecycle jobs", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (built-in defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run lifecycle jobs once and exit
    ///
    /// Meant to be triggered by an external scheduler. Exits non-zero only
    /// when a job could not scan for candidate events.
    Run {
        /// Which job to run
        #[arg(value_enum)]
        job: JobArg,
        /// Evaluate deadlines at this instant instead of now (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Log what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Print run reports as JSON to stdout
        #[arg(long)]
        json: bool,
    },
    /// Loop every enabled job on its configured interval until Ctrl-C
    Worker,
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to ./eventlens.toml)
        #[arg(short, long)]
        output: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Load and validate the configuration, then print a summary
    CheckConfig,
    /// Show enabled compile-time features
    Features,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum JobArg {
    GracePeriod,
    Retention,
    All,
}

impl JobArg {
    fn kinds(self) -> &'static [JobKind] {
        match self {
            Self::GracePeriod => &[JobKind::GracePeriod],
            Self::Retention => &[JobKind::Retention],
            Self::All => &JobKind::ALL,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Command::Run {
            job,
            now,
            dry_run,
            json,
        } => run_jobs(args.config.as_deref(), job, now, dry_run, json).await,
        Command::Worker => run_worker(args.config.as_deref()).await,
        Command::Init { output, force } => {
            run_init(output, force);
            ExitCode::SUCCESS
        }
        Command::CheckConfig => {
            run_check_config(args.config.as_deref());
            ExitCode::SUCCESS
        }
        Command::Features => {
            run_features();
            ExitCode::SUCCESS
        }
    }
}

/// Load the config file, or fall back to defaults when none was given.
fn load_config(path: Option<&str>) -> LifecycleConfig {
    let Some(path) = path else {
        return LifecycleConfig::default();
    };

    match LifecycleConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

/// Initialize logging and metrics, connect every collaborator, and build the
/// runner.
async fn build_runner(config: &LifecycleConfig) -> LifecycleRunner {
    if let Err(e) = observability::init_tracing(&config.observability.logging) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        eprintln!("Failed to initialize metrics: {}", e);
        std::process::exit(1);
    }

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    let blobs = match create_blob_storage(&config.storage.blobs).await {
        Ok(blobs) => blobs,
        Err(e) => {
            eprintln!("Failed to initialize blob storage: {}", e);
            std::process::exit(1);
        }
    };
    let faces = match create_face_collection_service(&config.face_index) {
        Ok(faces) => faces,
        Err(e) => {
            eprintln!("Failed to initialize face index client: {}", e);
            std::process::exit(1);
        }
    };
    let notifier = match create_notification_sender(&config.notifications) {
        Ok(notifier) => notifier,
        Err(e) => {
            eprintln!("Failed to initialize notification sender: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        database = db.backend_name(),
        blobs = blobs.backend_name(),
        face_index = faces.backend_name(),
        notifications = notifier.backend_name(),
        "Lifecycle runner initialized"
    );

    LifecycleRunner::new(&db, blobs, faces, notifier, config.jobs.clone())
}

async fn run_jobs(
    config_path: Option<&str>,
    job: JobArg,
    now: Option<DateTime<Utc>>,
    dry_run: bool,
    json: bool,
) -> ExitCode {
    let mut config = load_config(config_path);
    if dry_run {
        config.jobs.set_dry_run();
    }
    let runner = build_runner(&config).await;
    let now = now.unwrap_or_else(Utc::now);

    let mut reports: Vec<RunReport> = Vec::new();
    let mut scan_failed = false;
    for &kind in job.kinds() {
        match runner.run_once(kind, now).await {
            Ok(report) => reports.push(report),
            Err(_) => scan_failed = true,
        }
    }

    if json {
        match serde_json::to_string_pretty(&reports) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("Failed to serialize run reports: {}", e),
        }
    }

    if scan_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run_worker(config_path: Option<&str>) -> ExitCode {
    let config = load_config(config_path);
    let runner = build_runner(&config).await;

    tracing::info!("Starting lifecycle worker");
    tokio::select! {
        _ = runner.run_workers() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return ExitCode::FAILURE;
            }
            tracing::info!("Shutdown signal received, stopping lifecycle worker");
        }
    }
    ExitCode::SUCCESS
}

/// Create a default configuration file.
fn run_init(output: Option<String>, force: bool) {
    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("eventlens.toml"));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, config::DEFAULT_CONFIG_TOML) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("To run both jobs once, run:");
    println!("  eventlens run all --config {}", output_path.display());
}

fn run_check_config(config_path: Option<&str>) {
    let config = load_config(config_path);
    let source = config_path.unwrap_or("<built-in defaults>");
    let database = if config.database.is_memory() {
        "memory"
    } else {
        "sqlite"
    };
    let grace = &config.jobs.grace_period;
    let retention = &config.jobs.retention;

    println!("Configuration OK: {}", source);
    println!();
    println!("  database        {}", database);
    println!("  blob storage    {:?}", config.storage.blobs.backend);
    println!("  face index      {}", config.face_index.backend_name());
    println!("  notifications   {}", config.notifications.backend_name());
    println!();
    println!(
        "  grace_period    enabled={} every {}h dry_run={} session_batch={} notify={}",
        grace.enabled,
        grace.interval_hours,
        grace.dry_run,
        grace.session_batch_size,
        grace.notify_organizer
    );
    println!(
        "  retention       enabled={} every {}h dry_run={} blob_batch={} photo_batch={}",
        retention.enabled,
        retention.interval_hours,
        retention.dry_run,
        retention.blob_batch_size,
        retention.photo_batch_size
    );
}

/// Print enabled compile-time features.
fn run_features() {
    let version = env!("CARGO_PKG_VERSION");

    let features: &[(&str, &str, bool)] = &[
        (
            "database-sqlite",
            "Databases",
            cfg!(feature = "database-sqlite"),
        ),
        ("s3-storage", "Storage", cfg!(feature = "s3-storage")),
        ("prometheus", "Observability", cfg!(feature = "prometheus")),
    ];

    println!("EventLens v{}", version);
    println!();

    let mut current_category = "";
    for (name, category, enabled) in features {
        if *category != current_category {
            if !current_category.is_empty() {
                println!();
            }
            println!("{}:", category);
            current_category = category;
        }
        let marker = if *enabled { "+" } else { "-" };
        println!("  {} {}", marker, name);
    }
}
