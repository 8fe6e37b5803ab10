//! `plandiff profile` — inspect and validate comparison profiles.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use plandiff_config::Settings;
use plandiff_recon::{Profile, ReconError};

use crate::CliError;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Check that a profile parses and every address in it is valid
    #[command(after_help = "\
Examples:
  plandiff profile validate custom.toml")]
    Validate {
        /// Path to the profile TOML
        path: PathBuf,
    },

    /// Print the resolved profile (repeats expanded)
    #[command(after_help = "\
Examples:
  plandiff profile show --builtin
  plandiff profile show custom.toml --json")]
    Show {
        /// Path to the profile TOML
        #[arg(required_unless_present = "builtin")]
        path: Option<PathBuf>,

        /// Show the built-in plan profile
        #[arg(long, conflicts_with = "path")]
        builtin: bool,

        /// Print the resolved profile as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_profile(cmd: ProfileCommands) -> Result<(), CliError> {
    match cmd {
        ProfileCommands::Validate { path } => cmd_profile_validate(&path),
        ProfileCommands::Show { path, builtin: _, json } => {
            let profile = match path {
                Some(path) => load_profile_file(&path)?,
                None => builtin_profile()?,
            };
            cmd_profile_show(&profile, json)
        }
    }
}

/// `--profile`, then the settings' `profile.path`, then the built-in profile.
pub fn resolve_profile(flag: Option<&Path>, settings: &Settings) -> Result<Profile, CliError> {
    match flag.or(settings.profile_path.as_deref()) {
        Some(path) => load_profile_file(path),
        None => builtin_profile(),
    }
}

fn load_profile_file(path: &Path) -> Result<Profile, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read profile {}: {e}", path.display())))?;
    Profile::from_toml(&text).map_err(|e| profile_err(path, e))
}

fn builtin_profile() -> Result<Profile, CliError> {
    Profile::builtin().map_err(|e| CliError::profile(format!("built-in profile: {e}")))
}

fn profile_err(path: &Path, err: ReconError) -> CliError {
    CliError::profile(format!("{}: {err}", path.display()))
        .with_hint("run `plandiff profile show --builtin` for a working example")
}

fn cmd_profile_validate(path: &Path) -> Result<(), CliError> {
    let profile = load_profile_file(path)?;
    eprintln!("{}: ok ({} sheets)", path.display(), profile.sheets.len());
    Ok(())
}

fn cmd_profile_show(profile: &Profile, json: bool) -> Result<(), CliError> {
    if json {
        let json_str = serde_json::to_string_pretty(profile)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!(
        "profile {} (format {})",
        profile.name,
        profile.format_version.as_deref().unwrap_or("-")
    );
    for sheet in &profile.sheets {
        let mut parts = vec![
            format!("{} check", sheet.check.len()),
            format!("{} copy", sheet.copy.len()),
        ];
        if !sheet.indicators.is_empty() {
            parts.push(format!("{} indicators", sheet.indicators.len()));
        }
        if !sheet.text_cells.is_empty() {
            parts.push(format!("{} text cells", sheet.text_cells.len()));
        }
        if let Some(records) = &sheet.records {
            let (first, last) = records.window();
            parts.push(format!(
                "records from row {} over {}:{}",
                records.first_row,
                plandiff_core::number_to_column(first),
                plandiff_core::number_to_column(last)
            ));
        }
        if let Some(blocks) = &sheet.blocks {
            parts.push(format!("blocks labeled at {} every {} columns", blocks.label, blocks.interval));
        }
        if let Some(formulas) = &sheet.formulas {
            let columns: Vec<String> = formulas.columns.iter().map(|c| plandiff_core::number_to_column(*c)).collect();
            parts.push(format!("formulas in {} from row {}", columns.join(","), formulas.first_row));
        }
        println!("  {}: {}", sheet.name, parts.join(", "));
    }
    Ok(())
}
