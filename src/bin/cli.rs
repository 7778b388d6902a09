//! bucketsync CLI
//!
//! Command-line interface for bucket and object operations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucketsync::bucket::{provision_bucket, WaitPolicy};
use bucketsync::config::{expand_path, Settings, SettingsOverrides};
use bucketsync::error::Result;
use bucketsync::objects::{delete_file, download_file, list_files, upload_file_if_absent};
use bucketsync::storage::S3Store;
use bucketsync::sync::synchronize_with_summary;
use bucketsync::types::{EnsureOutcome, OpReport};

#[derive(Parser)]
#[command(name = "bucketsync")]
#[command(about = "S3 bucket automation: create buckets, sync folders, manage objects")]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, env = "BUCKETSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Region for the client and for new buckets
    #[arg(long, env = "BUCKETSYNC_REGION")]
    region: Option<String>,

    /// Main bucket
    #[arg(long, env = "BUCKETSYNC_PRIMARY_BUCKET")]
    primary_bucket: Option<String>,

    /// Backup bucket (default target of `sync`)
    #[arg(long, env = "BUCKETSYNC_BACKUP_BUCKET")]
    backup_bucket: Option<String>,

    /// Custom S3 endpoint (R2, MinIO)
    #[arg(long, env = "BUCKETSYNC_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "BUCKETSYNC_FORCE_PATH_STYLE")]
    force_path_style: bool,

    /// Per-operation timeout in seconds
    #[arg(long, env = "BUCKETSYNC_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a bucket if it does not exist
    CreateBucket {
        /// Bucket name (defaults to the primary bucket)
        #[arg(short, long)]
        bucket: Option<String>,
        /// Grant anonymous read/write/delete on all objects (dangerous)
        #[arg(long)]
        public: bool,
    },
    /// Create both the primary and the backup bucket
    Setup {
        /// Grant anonymous read/write/delete on all objects (dangerous)
        #[arg(long)]
        public: bool,
    },
    /// Upload every file of a folder that is not in the bucket yet
    Sync {
        /// Bucket name (defaults to the backup bucket)
        #[arg(short, long)]
        bucket: Option<String>,
        /// Local folder
        #[arg(short, long, env = "BUCKETSYNC_SYNC_DIR")]
        dir: Option<String>,
    },
    /// Upload one file unless the key already exists
    Upload {
        /// Local file
        #[arg(short, long, env = "BUCKETSYNC_LOCAL_FILE_PATH")]
        file: Option<String>,
        /// Object key (defaults to the file name)
        #[arg(short, long, env = "BUCKETSYNC_OBJECT_NAME")]
        key: Option<String>,
        /// Bucket name (defaults to the primary bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// List the objects in a bucket
    List {
        /// Bucket name (defaults to the primary bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// Delete one object
    Delete {
        /// Object key
        key: String,
        /// Bucket name (defaults to the primary bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// Download one object
    Download {
        /// Object key
        key: String,
        /// Destination path
        dest: String,
        /// Bucket name (defaults to the primary bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply(SettingsOverrides {
        primary_bucket: cli.primary_bucket,
        backup_bucket: cli.backup_bucket,
        region: cli.region,
        endpoint_url: cli.endpoint_url,
        force_path_style: cli.force_path_style.then_some(true),
        timeout_secs: cli.timeout_secs,
        ..Default::default()
    });
    settings.validate()?;

    let json = cli.json;
    let wait = WaitPolicy {
        max_attempts: settings.wait_attempts,
        delay: settings.wait_delay(),
    };

    match cli.command {
        Commands::CreateBucket { bucket, public } => {
            let bucket = bucket_or(bucket, settings.primary_bucket())?;
            let store = S3Store::connect(&settings).await;
            let region = settings
                .region
                .clone()
                .unwrap_or_else(|| store.region().to_string());
            create_one(&store, &bucket, &region, public, wait, json).await;
        }

        Commands::Setup { public } => {
            let buckets = [
                settings.primary_bucket()?.to_string(),
                settings.backup_bucket()?.to_string(),
            ];
            let store = S3Store::connect(&settings).await;
            let region = settings
                .region
                .clone()
                .unwrap_or_else(|| store.region().to_string());
            for bucket in &buckets {
                create_one(&store, bucket, &region, public, wait, json).await;
            }
        }

        Commands::Sync { bucket, dir } => {
            let bucket = bucket_or(bucket, settings.backup_bucket())?;
            let dir = match dir {
                Some(d) => expand_path(&d),
                None => settings.sync_dir()?,
            };
            let store = S3Store::connect(&settings).await;

            if !json {
                println!("Starting upload of daily documents…");
            }
            let (outcomes, summary) = synchronize_with_summary(&store, &bucket, &dir).await?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "outcomes": outcomes,
                        "summary": summary,
                    }))?
                );
            } else {
                if summary.listing_failed {
                    println!(
                        "Warning: could not list bucket '{}'; treated it as empty and attempted every file.",
                        bucket
                    );
                }
                for outcome in &outcomes {
                    println!("{}", outcome);
                }
                println!(
                    "{} files: {} uploaded, {} skipped, {} failed.",
                    summary.total(),
                    summary.uploaded,
                    summary.skipped,
                    summary.failed
                );
            }
        }

        Commands::Upload { file, key, bucket } => {
            let bucket = bucket_or(bucket, settings.primary_bucket())?;
            let file = match file {
                Some(f) => expand_path(&f),
                None => settings.local_file_path()?,
            };
            let key = key.or_else(|| settings.object_name.clone());
            let store = S3Store::connect(&settings).await;

            let report = upload_file_if_absent(&store, &bucket, &file, key.as_deref()).await;
            print_report(&report, json)?;
        }

        Commands::List { bucket } => {
            let bucket = bucket_or(bucket, settings.primary_bucket())?;
            let store = S3Store::connect(&settings).await;

            let listing = list_files(&store, &bucket).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("{}", listing.message);
            }
        }

        Commands::Delete { key, bucket } => {
            let bucket = bucket_or(bucket, settings.primary_bucket())?;
            let store = S3Store::connect(&settings).await;

            let report = delete_file(&store, &bucket, &key).await;
            print_report(&report, json)?;
        }

        Commands::Download { key, dest, bucket } => {
            let bucket = bucket_or(bucket, settings.primary_bucket())?;
            let store = S3Store::connect(&settings).await;

            let report = download_file(&store, &bucket, &key, &expand_path(&dest)).await;
            print_report(&report, json)?;
        }
    }

    Ok(())
}

/// Provision one bucket, printing the outcome instead of failing the command
async fn create_one(
    store: &S3Store,
    bucket: &str,
    region: &str,
    public: bool,
    wait: WaitPolicy,
    json: bool,
) {
    let result = provision_bucket(store, bucket, Some(region), public, wait).await;

    if json {
        let value = match &result {
            Ok(outcome) => json!({ "bucket": bucket, "outcome": outcome, "public": public }),
            Err(e) => json!({ "bucket": bucket, "error": e.to_string() }),
        };
        println!("{}", value);
        return;
    }

    match result {
        Ok(EnsureOutcome::AlreadyExists) => println!("Bucket '{}' already exists.", bucket),
        Ok(EnsureOutcome::Created) => {
            println!("Bucket '{}' created and is now available.", bucket)
        }
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    }
    if public {
        println!(
            "Public read/write/delete policy applied to bucket '{}'.",
            bucket
        );
    }
}

fn bucket_or(explicit: Option<String>, configured: Result<&str>) -> Result<String> {
    match explicit {
        Some(bucket) => Ok(bucket),
        None => configured.map(String::from),
    }
}

fn print_report(report: &OpReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("{}", report.message);
    }
    Ok(())
}
