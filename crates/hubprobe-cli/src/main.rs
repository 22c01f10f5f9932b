//! hubprobe CLI - diagnose the friends and game-room edge functions
//!
//! Runs probe suites against a live project and prints what broke.

mod render;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{Confirm, Input, Password};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hubprobe::config::load_env_file;
use hubprobe::{ProbeConfig, ProbeContext, RunSummary, Suite};

#[derive(Parser)]
#[command(name = "hubprobe")]
#[command(about = "Diagnostic probes for the friends and game-room edge functions", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/hubprobe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dotenv file to load before reading the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Project URL (overrides config and environment)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Bearer token sent to the edge functions
    #[arg(long, global = true)]
    token: Option<String>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Skip confirmation for suites that change the remote schema
    #[arg(short, long, global = true)]
    yes: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reachability of both functions
    Connectivity,
    /// Friend request lifecycle
    Friends,
    /// Game room and invitation lifecycle
    Rooms,
    /// Invite and join between the two idle children
    Core,
    /// Regression checks for the schema, parsing and invitation fixes
    Fixes,
    /// Whether the manual join rewrite is deployed
    ManualJoin,
    /// join_requests to game_rooms relationship, end to end
    Schema,
    /// List children and the ones free to join a room
    Children,
    /// Sample join_requests and game_rooms over REST
    Tables,
    /// Ask the rooms function to describe its schema
    DebugSchema,
    /// Reload the schema cache, then re-check invitations
    ReloadSchema,
    /// Apply the foreign key migration, then re-check invitations
    FixSchema,
    /// Probe the clean and test-simple function variants
    Variants,
    /// Full backend pass (connectivity, friends, rooms)
    All,
    /// Prompt for project settings and save them
    Init,
    /// Show the effective configuration
    Config,
}

impl Commands {
    fn suites(&self) -> Option<Vec<Suite>> {
        let suite = match self {
            Commands::Connectivity => Suite::Connectivity,
            Commands::Friends => Suite::Friends,
            Commands::Rooms => Suite::Rooms,
            Commands::Core => Suite::Core,
            Commands::Fixes => Suite::Fixes,
            Commands::ManualJoin => Suite::ManualJoin,
            Commands::Schema => Suite::Schema,
            Commands::Children => Suite::Children,
            Commands::Tables => Suite::Tables,
            Commands::DebugSchema => Suite::DebugSchema,
            Commands::ReloadSchema => Suite::ReloadSchema,
            Commands::FixSchema => Suite::FixSchema,
            Commands::Variants => Suite::Variants,
            Commands::All => return Some(Suite::FULL_PASS.to_vec()),
            Commands::Init | Commands::Config => return None,
        };
        Some(vec![suite])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.suites() {
        Some(suites) => {
            let code = cmd_run(&cli, &suites).await?;
            std::process::exit(code);
        }
        None => match cli.command {
            Commands::Init => cmd_init(&cli),
            _ => cmd_config(&cli),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "hubprobe=debug" } else { "hubprobe=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(ProbeConfig::config_path()?),
    }
}

/// File, then environment, then flags
fn load_config(cli: &Cli) -> Result<ProbeConfig> {
    if let Some(env_file) = load_env_file(cli.env_file.as_deref())? {
        debug!(path = ?env_file, "Loaded env file");
    }

    let path = config_path(cli)?;
    let mut config = ProbeConfig::load_from(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    config.apply_env()?;

    config.apply_overrides(cli.url.as_deref(), cli.token.as_deref());
    Ok(config)
}

// ============================================
// Command Implementations
// ============================================

async fn cmd_run(cli: &Cli, suites: &[Suite]) -> Result<i32> {
    let config = load_config(cli)?;
    let ctx = ProbeContext::new(&config)?;

    if suites.iter().any(Suite::mutates_schema) && !cli.yes {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "This changes the schema of {}. Continue?",
                ctx.client.base_url()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation (pass --yes to skip)")?;
        if !proceed {
            bail!("Aborted");
        }
    }

    debug!(suites = ?suites, target = %ctx.client.base_url(), "Starting probe run");
    let mut summary = RunSummary::default();
    for suite in suites {
        if !cli.json {
            render::banner(*suite, ctx.client.base_url());
        }
        let report = suite.run(&ctx).await;
        if !cli.json {
            render::report(&report);
        }
        summary.push(report);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        render::summary(&summary);
    }

    Ok(summary.exit_code())
}

fn cmd_init(cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;
    let mut config = ProbeConfig::load_from(&path)?;

    let url: String = Input::new()
        .with_prompt("Project URL")
        .with_initial_text(config.project_url.clone().unwrap_or_default())
        .interact_text()
        .context("Failed to read project URL")?;
    config.project_url = Some(url.trim().to_string());
    // reject a bad URL before anything is written
    config.base_url()?;

    let key = Password::new()
        .with_prompt("Publishable key (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read publishable key")?;
    if !key.is_empty() {
        config.publishable_key = Some(key);
    }

    config.auth_token = Input::new()
        .with_prompt("Function auth token")
        .default(config.auth_token.clone())
        .interact_text()
        .context("Failed to read auth token")?;

    config.save_to(&path)?;
    println!("{} Configuration saved to {:?}", "✓".green(), path);

    println!("\n{}", "Next:".yellow());
    println!("  hubprobe connectivity");
    println!("  hubprobe all");

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    println!("{}", "Configuration:".bold());
    println!("  Path: {:?}", config_path(cli)?);
    println!(
        "  Project URL: {}",
        match config.base_url() {
            Ok(url) => url.cyan(),
            Err(_) => "Not set".red(),
        }
    );
    println!(
        "  Publishable Key: {}",
        match config.masked_key() {
            Some(key) => key.green(),
            None => "Not set".red(),
        }
    );
    println!("  Auth Token: {}", config.masked_auth_token().dimmed());
    println!(
        "  Timeout: {}",
        config
            .timeout_secs
            .map(|secs| format!("{}s", secs))
            .unwrap_or_else(|| "default".to_string())
    );

    let fixtures = &config.fixtures;
    println!("{}", "Fixtures:".bold());
    for (role, id) in [
        ("host", &fixtures.host),
        ("guest", &fixtures.guest),
        ("invitee", &fixtures.invitee),
        ("idle_host", &fixtures.idle_host),
        ("idle_friend", &fixtures.idle_friend),
        ("watched", &fixtures.watched),
    ] {
        println!("  {:<12} {}", role, id.dimmed());
    }

    Ok(())
}
