use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{default_logging_config, AppConfig, CliArgs};
use student_portal::config::StudentPortalConfig;
use student_portal::StudentPortal;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Student Portal Server - read-only API over the student data table
#[derive(Parser)]
#[command(name = "portal-server")]
#[command(about = "Student Portal Server - read-only API over the student data table")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Serve rows from `student_portal.fixture_path` instead of Supabase
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // SUPABASE_* and APP__* may come from a local .env
    let dotenv = dotenvy::dotenv().ok();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_else(default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Student Portal Server starting");
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args),
    }
}

/// `api_ingress` section; `--port` or a missing `bind_addr` binds to
/// `server.host:server.port`.
fn ingress_config(config: &AppConfig, args: &CliArgs) -> Result<ApiIngressConfig> {
    let mut cfg: ApiIngressConfig = config.module_config("api_ingress")?;
    if args.port.is_some() || cfg.bind_addr.is_none() {
        cfg.bind_addr = Some(format!("{}:{}", config.server.host, config.server.port));
    }
    Ok(cfg)
}

fn build_portal(config: &AppConfig, args: &CliArgs) -> Result<StudentPortal> {
    let portal_cfg: StudentPortalConfig = config.module_config("student_portal")?;

    if args.mock {
        tracing::warn!("--mock: serving in-memory rows, Supabase is not contacted");
        return StudentPortal::with_fixture(&portal_cfg);
    }

    let store = config.resolved_store();
    store.validate()?;
    StudentPortal::with_supabase(&store.url, &store.service_role_key, &portal_cfg)
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let portal = build_portal(&config, &args).context("failed to initialize student_portal")?;
    let ingress = ApiIngress::new(ingress_config(&config, &args)?)
        .with_health(portal.health())
        .with_openapi(portal.openapi());

    let router = ingress.build_router(portal.register_rest(axum::Router::new()));

    let cancel = CancellationToken::new();
    let signals = modkit::runtime::cancel_on_shutdown(cancel.clone());

    let result = ingress.serve(router, cancel.clone()).await;
    cancel.cancel();
    let _ = signals.await;
    tracing::info!("Student Portal Server stopped");
    result
}

fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    let ingress = ingress_config(&config, &args)?;
    let portal: StudentPortalConfig = config.module_config("student_portal")?;

    if args.mock {
        StudentPortal::with_fixture(&portal)?;
    } else {
        config.resolved_store().validate()?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("bind_addr: {}", ingress.bind_addr());
    println!("table: {}", portal.table);

    let logging = config.logging.clone().unwrap_or_else(default_logging_config);
    let mut files: Vec<_> =
        runtime::logging::planned_log_files(&logging, Path::new(&config.server.home_dir))
            .into_iter()
            .collect();
    files.sort();
    for (subsystem, path) in files {
        println!("log[{subsystem}]: {}", path.display());
    }

    Ok(())
}
