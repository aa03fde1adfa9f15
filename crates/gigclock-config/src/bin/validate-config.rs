//! Config validation CLI tool
//!
//! Validates a gigclock configuration file and reports any errors.

use gigclock_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a gigclock configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match gigclock_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", gigclock_config::CURRENT_CONFIG_VERSION);
            println!(
                "  Verification: {}",
                if policy.verification_required { "required" } else { "optional" }
            );
            println!("  Sites: {}", policy.sites.len());

            if !policy.sites.is_empty() {
                println!();
                println!("Sites:");
                for site in &policy.sites {
                    let start = site
                        .schedule
                        .shift_start
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".into());
                    let end = site
                        .schedule
                        .shift_end
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "  - {} {} r={}m shift {}..{}: {}",
                        site.id, site.coordinate, site.allowed_radius_meters, start, end, site.label
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                gigclock_config::ConfigError::ReadError { source, .. } => {
                    eprintln!("Failed to read file: {}", source);
                }
                gigclock_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                gigclock_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                gigclock_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        gigclock_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
