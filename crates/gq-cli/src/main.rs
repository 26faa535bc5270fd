//! GQ - LDAP directory entry relocation
//!
//! Moves and copies directory entries, optionally with their whole subtree,
//! within one LDAP server or between servers.

mod commands;
mod config;
mod progress;

use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gq")]
#[command(author = "GQ Team")]
#[command(version = gq_core::VERSION)]
#[command(about = "Move and copy LDAP directory entries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GQ_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "GQ_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress progress and informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Move an entry below a new parent, deleting the original
    Mv(TransferArgs),

    /// Copy an entry below a new parent
    Cp(TransferArgs),

    /// List configured servers
    Servers {
        /// Try to connect and bind to every server
        #[arg(long)]
        check: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct TransferArgs {
    /// DN of the entry to relocate
    source_dn: String,

    /// DN of the existing entry that becomes the new parent
    target_parent_dn: String,

    /// Server holding the source entry
    #[arg(short, long)]
    from: String,

    /// Server receiving the entry (defaults to --from)
    #[arg(short, long)]
    to: Option<String>,

    /// Include the entry's whole subtree
    #[arg(short, long)]
    recursive: bool,

    /// Permit source and target on different servers
    #[arg(short = 'x', long)]
    cross_server: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        config.logging.level = "debug".to_string();
    }

    // Initialize logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let ctx = CommandContext {
        config,
        output_format: cli.output,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Mv(args) => {
            commands::mv::execute(
                &ctx,
                &args.source_dn,
                &args.target_parent_dn,
                &args.from,
                args.to.as_deref(),
                args.recursive,
                args.cross_server,
            )
            .await?
        }
        Commands::Cp(args) => {
            commands::cp::execute(
                &ctx,
                &args.source_dn,
                &args.target_parent_dn,
                &args.from,
                args.to.as_deref(),
                args.recursive,
                args.cross_server,
            )
            .await?
        }
        Commands::Servers { check } => commands::servers::execute(&ctx, check).await?,
        Commands::Version => println!("gq {}", gq_core::VERSION),
    }

    Ok(())
}
