// plandiff CLI - reconcile two versions of a plan workbook

mod changes;
mod exit_codes;
mod profile;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_DOCUMENT, EXIT_ERROR, EXIT_PROFILE_INVALID, EXIT_RECONCILE, EXIT_SAVE, EXIT_SUCCESS, EXIT_USAGE};
use profile::ProfileCommands;

#[derive(Parser)]
#[command(name = "plandiff")]
#[command(about = "Mark or copy what changed between two versions of a plan workbook")]
#[command(version)]
struct Cli {
    /// Log more to stderr (-v info, -vv debug). PLANDIFF_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Color every cell of TARGET that differs from REFERENCE
    #[command(after_help = "\
Examples:
  plandiff mark plan_v2.xlsx plan_v1.xlsx
  plandiff mark plan_v2.xlsx plan_v1.xlsx -o marked.xlsx --json
  plandiff mark plan_v2.xlsx plan_v1.xlsx --in-place --changes changes.csv
  plandiff mark plan_v2.xlsx plan_v1.xlsx --profile custom.toml")]
    Mark {
        /// Workbook to mark (the newer version)
        target: PathBuf,

        /// Workbook to compare against (never written)
        reference: PathBuf,

        /// Where to save the marked workbook
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Overwrite TARGET instead of saving beside it
        #[arg(long, conflicts_with = "output")]
        in_place: bool,

        /// Comparison profile (TOML); defaults to settings, then the built-in profile
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write every changed address to a CSV file (sheet,address,kind)
        #[arg(long)]
        changes: Option<PathBuf>,
    },

    /// Overwrite the profile's copy cells of TARGET with REFERENCE values
    #[command(after_help = "\
Examples:
  plandiff copy new_form.xlsx filled_plan.xlsx
  plandiff copy new_form.xlsx filled_plan.xlsx -o migrated.xlsx --json")]
    Copy {
        /// Workbook to fill in
        target: PathBuf,

        /// Workbook whose values are copied (never written)
        reference: PathBuf,

        /// Where to save the result
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Comparison profile (TOML); defaults to settings, then the built-in profile
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect and validate comparison profiles
    #[command(subcommand)]
    Profile(ProfileCommands),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("PLANDIFF_LOG").unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Mark { target, reference, output, in_place, profile, json, changes } => {
            run::cmd_mark(run::MarkArgs { target, reference, output, in_place, profile, json, changes })
        }
        Commands::Copy { target, reference, output, profile, json } => {
            run::cmd_copy(run::CopyArgs { target, reference, output, profile, json })
        }
        Commands::Profile(cmd) => profile::cmd_profile(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn profile(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PROFILE_INVALID, message: msg.into(), hint: None }
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self { code: EXIT_DOCUMENT, message: msg.into(), hint: None }
    }

    pub fn reconcile(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RECONCILE, message: msg.into(), hint: None }
    }

    pub fn save(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SAVE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
