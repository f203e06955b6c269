//! Command-line surface: `serve` (default), `doctor`, and `config`
//! utilities, mirroring the donor's `Cli`/`Command` split.

use clap::{Parser, Subcommand};

use vsg_domain::config::{Config, ConfigSeverity};

/// voicesurvey-gateway — a real-time voice-survey gateway.
#[derive(Debug, Parser)]
#[command(name = "voicesurvey-gateway", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as YAML.
    Show,
}

/// Parses and validates the config, printing any issues. Returns `true`
/// when valid (no fatal errors).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dumps the resolved config (with all defaults filled in) as YAML.
pub fn show(config: &Config) {
    match serde_yaml::to_string(config) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}

/// Runs diagnostic checks and prints a summary. Returns `Ok(true)` when
/// every check passes.
pub async fn doctor(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("voicesurvey-gateway doctor");
    println!("==========================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_upstream_url(&mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn print_check(name: &str, passed: bool, detail: impl AsRef<str>) {
    let mark = if passed { "ok" } else { "FAIL" };
    println!("[{mark}] {name}: {}", detail.as_ref());
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    let passed = error_count == 0;
    print_check(
        "Config validates",
        passed,
        if issues.is_empty() { "no issues".to_string() } else { format!("{} issue(s)", issues.len()) },
    );
    if !passed {
        *all_passed = false;
    }
}

fn check_upstream_url(all_passed: &mut bool) {
    let set = std::env::var("VSG_UPSTREAM_URL").is_ok();
    print_check(
        "VSG_UPSTREAM_URL set",
        set,
        if set { "configured" } else { "using placeholder upstream (demo only)" },
    );
    if !set {
        *all_passed = false;
    }
}
