//! signbatch CLI
//!
//! Command-line front end for the batch signing engine: verification,
//! signing with or without timestamping, timestamp-only runs, and
//! self-signed certificate generation via the external tool pipeline.

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use signbatch::{
    BatchConfiguration, BatchWorkflow, CertificateGenerator, CertificateRef, CertificateRequest,
    ConfigManager, NoPrompt, Operation, Outcome, OutcomeSink, PasswordPrompt, PfxPassword, Report,
    SignError, SignatureStatus, StdinPrompt, SystemInvoker, TargetPath, Toolchain,
};

#[derive(Parser)]
#[command(name = "signbatch")]
#[command(about = "Batch code signing driven by external signing tools")]
#[command(long_about = "
signbatch - batch code-signing orchestration

Runs signtool-style external binaries over a batch of files. Verification
and plain signing fan out over a worker pool; anything that contacts a
timestamp authority runs one file at a time to respect TSA rate limits.

EXAMPLES:
    # Verify signatures on a directory's binaries
    signbatch verify build/*.exe build/*.dll

    # Sign and timestamp with an existing PFX (prompts for the password)
    signbatch sign --pfx release.pfx dist/app.exe dist/helper.dll

    # Sign without timestamping, eight workers
    signbatch --workers 8 sign --pfx release.pfx --no-timestamp dist/*.dll

    # Timestamp already-signed files
    signbatch timestamp dist/app.exe

    # Generate a self-signed certificate and PFX
    signbatch gen-cert --name \"Jane Dev\" --out-pfx key.pfx

ENVIRONMENT VARIABLES:
    SIGNBATCH_PFX_PASSWORD  PFX password (alternative to --password)
    RUST_LOG                Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Path to the configuration file (defaults to the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing the signing tools (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    tools_dir: Option<PathBuf>,

    /// Worker pool size for parallel operations (overrides config)
    #[arg(long, global = true, value_name = "N")]
    workers: Option<usize>,

    /// Per-invocation timeout in seconds (overrides config)
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify signatures on a batch of files (parallel)
    Verify {
        /// Files to verify
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },

    /// Sign a batch of files with a PFX certificate
    Sign {
        /// Files to sign
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// PFX certificate file
        #[arg(long, value_name = "PFX")]
        pfx: PathBuf,

        /// PFX password
        #[arg(long, env = "SIGNBATCH_PFX_PASSWORD", value_name = "PASSWORD")]
        password: Option<String>,

        /// Skip timestamping (enables parallel signing)
        #[arg(long)]
        no_timestamp: bool,

        /// Timestamp server to try first (overrides config)
        #[arg(long, value_name = "URL")]
        ts_url: Option<String>,

        /// Never prompt for a password; missing credentials skip the task
        #[arg(long)]
        non_interactive: bool,
    },

    /// Timestamp already-signed files (sequential)
    Timestamp {
        /// Files to timestamp
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Timestamp server to try first (overrides config)
        #[arg(long, value_name = "URL")]
        ts_url: Option<String>,
    },

    /// Generate a self-signed certificate and PFX container
    GenCert {
        /// Subject common name
        #[arg(long, value_name = "NAME")]
        name: String,

        /// Optional email merged into the subject
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,

        /// Output path for the PFX
        #[arg(long, value_name = "FILE")]
        out_pfx: PathBuf,

        /// Optional output path for the certificate
        #[arg(long, value_name = "FILE")]
        out_cer: Option<PathBuf>,

        /// Password protecting the generated key
        #[arg(long, env = "SIGNBATCH_PFX_PASSWORD", value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Write a default configuration file
    Init,
}

/// Sink that renders outcomes and the summary to the terminal.
struct ConsoleSink;

impl ConsoleSink {
    fn color(status: SignatureStatus) -> &'static str {
        match status {
            SignatureStatus::Trusted => "\x1b[1;32m",
            SignatureStatus::SelfSigned => "\x1b[1;33m",
            SignatureStatus::InvalidOrUnsigned | SignatureStatus::ToolError => "\x1b[1;31m",
            SignatureStatus::Skipped => "\x1b[1;36m",
        }
    }
}

impl OutcomeSink for ConsoleSink {
    fn on_outcome(&self, outcome: &Outcome) {
        let color = Self::color(outcome.status);
        println!(
            "{color}{} {}: {}\x1b[0m",
            outcome.status.symbol(),
            outcome.target.file_name(),
            outcome.status.label()
        );
        let mut details = Vec::new();
        if let Some(signer) = &outcome.signer {
            details.push(format!("signer: {signer}"));
        }
        if let Some(issuer) = &outcome.issuer {
            details.push(format!("issuer: {issuer}"));
        }
        if let Some(timestamp) = &outcome.timestamp {
            details.push(format!("timestamp: {timestamp}"));
        }
        if !details.is_empty() {
            println!("  {}", details.join(" | "));
        }
        if let Some(reason) = &outcome.reason {
            println!("  {reason}");
        }
    }

    fn on_summary(&self, report: &Report) {
        println!("{}", "=".repeat(60));
        for status in SignatureStatus::ALL {
            let count = report.counts.get(*status);
            if count > 0 {
                let color = Self::color(*status);
                println!("{color}  {}: {count}\x1b[0m", status.label());
            }
        }
    }
}

fn collect_targets(files: &[PathBuf]) -> Result<Vec<TargetPath>, SignError> {
    files
        .iter()
        .map(|f| TargetPath::new(f.clone()))
        .collect()
}

fn load_configuration(cli: &Cli) -> Result<BatchConfiguration, SignError> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_or_default()?;
    if let Some(tools_dir) = &cli.tools_dir {
        config.tools_dir = tools_dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.task_timeout_seconds = timeout;
    }
    Ok(config)
}

fn apply_ts_override(config: &mut BatchConfiguration, ts_url: Option<&String>) {
    if let Some(url) = ts_url {
        config.timestamp_servers.insert(0, url.clone());
    }
}

async fn run_batch(
    config: &BatchConfiguration,
    prompt: Arc<dyn PasswordPrompt>,
    files: &[PathBuf],
    operation: Operation,
    cert_ref: Option<CertificateRef>,
    password: Option<String>,
) -> Result<Report, SignError> {
    let targets = collect_targets(files)?;
    let workflow =
        BatchWorkflow::from_configuration(config, Arc::new(SystemInvoker::new()), prompt)?;

    if let (Some(cert), Some(password)) = (&cert_ref, password) {
        workflow
            .seed_password(cert, PfxPassword::new(password))
            .await;
    }

    workflow
        .run(&targets, operation, cert_ref.as_ref(), Arc::new(ConsoleSink))
        .await
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_configuration(&cli)?;

    let report = match &cli.command {
        Commands::Verify { files } => {
            Some(run_batch(&config, Arc::new(StdinPrompt), files, Operation::Verify, None, None).await?)
        }
        Commands::Sign {
            files,
            pfx,
            password,
            no_timestamp,
            ts_url,
            non_interactive,
        } => {
            apply_ts_override(&mut config, ts_url.as_ref());
            let operation = if *no_timestamp {
                Operation::SignOnly
            } else {
                Operation::SignAndTimestamp
            };
            let prompt: Arc<dyn PasswordPrompt> = if *non_interactive {
                Arc::new(NoPrompt)
            } else {
                Arc::new(StdinPrompt)
            };
            let cert_ref = CertificateRef::ExistingPfx(pfx.clone());
            Some(
                run_batch(
                    &config,
                    prompt,
                    files,
                    operation,
                    Some(cert_ref),
                    password.clone(),
                )
                .await?,
            )
        }
        Commands::Timestamp { files, ts_url } => {
            apply_ts_override(&mut config, ts_url.as_ref());
            Some(
                run_batch(
                    &config,
                    Arc::new(StdinPrompt),
                    files,
                    Operation::TimestampOnly,
                    None,
                    None,
                )
                .await?,
            )
        }
        Commands::GenCert {
            name,
            email,
            out_pfx,
            out_cer,
            password,
        } => {
            let request = CertificateRequest {
                subject_name: name.clone(),
                email: email.clone(),
                pfx_output: out_pfx.clone(),
                cer_output: out_cer.clone(),
                password: password.clone().map(PfxPassword::new),
            };
            let generator = CertificateGenerator::new(
                Toolchain::new(&config.tools_dir),
                Arc::new(SystemInvoker::new()),
                Duration::from_secs(config.task_timeout_seconds),
            );
            generator.generate(&request).await?;
            println!("Certificate written to {}", out_pfx.display());
            println!("Note: the generated certificate is self-signed and not issued by a recognized authority.");
            None
        }
        Commands::Config { action } => {
            let manager = match &cli.config {
                Some(path) => ConfigManager::with_path(path),
                None => ConfigManager::new()?,
            };
            match action {
                ConfigAction::Show => {
                    println!("Config file: {}", manager.config_path().display());
                    println!("{config:#?}");
                }
                ConfigAction::Init => {
                    manager.save(&BatchConfiguration::default())?;
                    println!("Wrote defaults to {}", manager.config_path().display());
                }
            }
            None
        }
    };

    if let Some(report) = report {
        if report.counts.tool_error > 0 {
            std::process::exit(1);
        }
    }
    Ok(())
}
