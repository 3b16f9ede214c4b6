use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use articlegen::cli::commands;

#[derive(Parser)]
#[command(name = "articlegen")]
#[command(
    version,
    about = "Research a topic with grounded search and draft a sourced article"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task for a topic and generate its article
    Create {
        #[arg(help = "Article topic (10-500 characters)")]
        topic: String,
        #[arg(long, default_value = "local", help = "Owner recorded on the task")]
        owner: String,
    },

    /// Resume a pending task, replaying completed steps
    Run {
        #[arg(help = "Task id")]
        id: String,
    },

    /// Show task status
    Status {
        #[arg(help = "Task id")]
        id: String,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Show a task's article and sources
    Show {
        #[arg(help = "Task id")]
        id: String,
    },

    /// List recent tasks
    List {
        #[arg(short = 'n', long, default_value = "20", help = "Maximum tasks to list")]
        limit: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31marticlegen encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let rt = Runtime::new()?;

    match cli.command {
        Commands::Create { topic, owner } => {
            rt.block_on(commands::create::run(&topic, &owner))?;
        }
        Commands::Run { id } => {
            rt.block_on(commands::run::run(&id))?;
        }
        Commands::Status { id, format } => {
            rt.block_on(commands::status::run(&id, &format))?;
        }
        Commands::Show { id } => {
            rt.block_on(commands::show::run(&id))?;
        }
        Commands::List { limit } => {
            rt.block_on(commands::list::run(limit))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(&format)?,
            ConfigAction::Path => commands::config::path()?,
        },
    }

    Ok(())
}
