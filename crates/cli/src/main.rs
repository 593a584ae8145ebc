mod inspect;
mod runner;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Paraph signature orchestration toolchain.
#[derive(Parser)]
#[command(name = "paraph", version, about = "Paraph signature orchestration for rental agreements")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "7070")]
        port: u16,
        /// Agreement fixture files to preload
        #[arg(long = "agreements")]
        agreements: Vec<PathBuf>,
        /// Provider configuration file (toml); without it the server
        /// runs against the built-in static providers
        #[arg(long)]
        providers: Option<PathBuf>,
    },

    /// Drive a full electronic signature session offline
    Run {
        /// Path to the agreement fixture (JSON)
        agreement: PathBuf,
        /// Signing party role (owner, tenant, agency)
        #[arg(long)]
        party: String,
        /// OTP code to submit (the simulated provider accepts 123456)
        #[arg(long, default_value = "123456")]
        otp: String,
        /// Phone number for enrollment
        #[arg(long, default_value = "+33 6 12 34 56 78")]
        phone: String,
        /// Photo file for enrollment; a placeholder is used when omitted
        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// Summarize an agreement fixture
    Inspect {
        /// Path to the agreement fixture (JSON)
        file: PathBuf,
    },

    /// Print the content digest of a photo or document file
    Digest {
        /// Path to the file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            agreements,
            providers,
        } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port, agreements, providers)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Run {
            agreement,
            party,
            otp,
            phone,
            photo,
        } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(runner::cmd_run(
                &agreement, &party, &otp, &phone,
                photo.as_deref(),
                cli.output,
                cli.quiet,
            )) {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Commands::Inspect { file } => {
            if let Err(e) = inspect::cmd_inspect(&file, cli.output) {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Commands::Digest { file } => {
            if let Err(e) = cmd_digest(&file, cli.output) {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// `paraph digest <file>` -- content digest of the raw bytes.
fn cmd_digest(file: &std::path::Path, output: OutputFormat) -> Result<(), String> {
    let bytes =
        std::fs::read(file).map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
    let digest = paraph_core::photo_digest(&bytes);
    match output {
        OutputFormat::Text => println!("{}", digest),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "file": file.display().to_string(), "digest": digest })
        ),
    }
    Ok(())
}
