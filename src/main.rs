use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use echo_studio::ai::AspectRatio;
use echo_studio::cli::CommandContext;
use echo_studio::cli::commands;

/// Parse aspect ratio from string
fn parse_aspect_ratio(s: &str) -> Result<AspectRatio, String> {
    s.parse::<AspectRatio>()
        .map_err(|e| format!("{}. Valid values: 1:1, 3:4, 4:3, 9:16, 16:9", e))
}

#[derive(Parser)]
#[command(name = "echo-studio")]
#[command(
    version,
    about = "Personality interview service that synthesizes partner profiles and portraits"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Config file replacing .echo-studio/config.toml")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, help = "Bind address (default from config)")]
        host: Option<String>,
        #[arg(long, short, help = "Port (default from config)")]
        port: Option<u16>,
    },

    /// Answer the partner questionnaire in the terminal
    Interview {
        #[arg(long, short, help = "Write answers (or the full result) to this file")]
        out: Option<PathBuf>,
        #[arg(long, help = "Generate the partner and portraits right away")]
        generate: bool,
    },

    /// Synthesize a partner profile from an answers file
    Partner {
        #[arg(long, short, help = "Answers JSON (array or {\"answers\": [...]})")]
        answers: PathBuf,
        #[arg(long, short, help = "Output file (default: stdout)")]
        out: Option<PathBuf>,
    },

    /// Synthesize an echo personality with a professional profile
    Personality {
        #[arg(long, short, help = "Answers JSON (array or {\"answers\": [...]})")]
        answers: PathBuf,
        #[arg(long, short, help = "Output file (default: stdout)")]
        out: Option<PathBuf>,
    },

    /// Generate portraits for a saved partner or personality
    Images {
        #[arg(long, short, help = "Partner or personality JSON")]
        profile: PathBuf,
        #[arg(long, short = 'n', help = "Number of images (1-4)")]
        count: Option<u8>,
        #[arg(long, value_parser = parse_aspect_ratio, help = "Aspect ratio: 1:1, 3:4, 4:3, 9:16, 16:9")]
        aspect_ratio: Option<AspectRatio>,
        #[arg(long, short, help = "Output file (default: stdout)")]
        out: Option<PathBuf>,
    },

    /// Show both provider chains and their credentials
    Providers {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
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
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
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
        eprintln!("\x1b[31mEcho Studio encountered an unexpected error:\x1b[0m");
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

        // Backtrace when RUST_BACKTRACE=1
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

    // stdout carries JSON results, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Show { global, format } => commands::config::show(*global, format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(*global, *force)?,
        }
        return Ok(());
    }

    let ctx = CommandContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::serve::run(ctx, host, port))?;
        }
        Commands::Interview { out, generate } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::interview::run(&ctx, out, generate))?;
        }
        Commands::Partner { answers, out } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::generate::partner(&ctx, &answers, out))?;
        }
        Commands::Personality { answers, out } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::generate::personality(&ctx, &answers, out))?;
        }
        Commands::Images {
            profile,
            count,
            aspect_ratio,
            out,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::generate::images(
                &ctx,
                &profile,
                count,
                aspect_ratio,
                out,
            ))?;
        }
        Commands::Providers { format } => {
            commands::providers::run(&ctx, &format)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
