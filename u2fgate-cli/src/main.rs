//! u2fgate CLI - FIDO U2F registration and authentication verification tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use commands::validate::PayloadKind;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error or unexpected verifier failure
  64  Usage error (invalid arguments or AppId)
  65  Invalid payload or rejected verification
  66  Input file not readable
  74  Output file not writable";

#[derive(Parser)]
#[command(name = "u2fgate")]
#[command(author, version, about = "Server-side FIDO U2F verification", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// AppId of the relying party (defaults to $U2F_APP_ID)
    #[arg(long, global = true, value_name = "URL")]
    app_id: Option<String>,

    /// Directory of PEM attestation roots (defaults to $U2F_ATTESTATION_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    attestation_dir: Option<PathBuf>,

    /// Only print machine-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a base64url payload for structural well-formedness
    Validate {
        /// Kind of payload
        #[arg(value_enum)]
        kind: PayloadKind,

        /// The base64url payload
        #[arg(value_name = "PAYLOAD", allow_hyphen_values = true)]
        payload: String,
    },

    /// Issue a registration challenge
    RegisterRequest {
        /// Write the request to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Verify a device's registration response
    VerifyRegistration {
        /// RegisterRequest JSON that was sent to the device
        #[arg(long, value_name = "FILE")]
        request: PathBuf,

        /// RegisterResponse JSON returned by the device
        #[arg(long, value_name = "FILE")]
        response: PathBuf,

        /// Write the registration to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Issue an authentication challenge for a registered device
    SignRequest {
        /// Registration JSON of the device
        #[arg(long, value_name = "FILE")]
        registration: PathBuf,

        /// Write the request to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Verify a device's sign response
    VerifyAuthentication {
        /// Registration JSON of the device
        #[arg(long, value_name = "FILE")]
        registration: PathBuf,

        /// SignRequest JSON that was sent to the device
        #[arg(long, value_name = "FILE")]
        request: PathBuf,

        /// SignResponse JSON returned by the device
        #[arg(long, value_name = "FILE")]
        response: PathBuf,

        /// Write the updated registration to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn init_tracing(quiet: bool, ansi: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("u2fgate=info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        app_id,
        attestation_dir,
        quiet,
        command,
        ..
    } = cli;
    let config = move || utils::load_config(app_id, attestation_dir);

    match command {
        Commands::Validate { kind, payload } => commands::validate::execute(kind, payload, quiet),
        Commands::RegisterRequest { output } => {
            commands::register::request(&config()?, output, quiet)
        }
        Commands::VerifyRegistration {
            request,
            response,
            output,
        } => commands::register::verify(&config()?, request, response, output, quiet),
        Commands::SignRequest {
            registration,
            output,
        } => commands::authenticate::request(&config()?, registration, output, quiet),
        Commands::VerifyAuthentication {
            registration,
            request,
            response,
            output,
        } => commands::authenticate::verify(
            &config()?,
            registration,
            request,
            response,
            output,
            quiet,
        ),
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let exit = ExitCode::error(exit_codes::USAGE_ERROR, e.to_string());
            eprint!("{}", exit.message.unwrap_or_default());
            std::process::exit(exit.code);
        }
        Err(e) => e.exit(),
    };

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.quiet, cli.color != ColorChoice::Never);

    let exit = match run(cli) {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
