use anyhow::Context;
use clap::Parser;
use dirpack_lib::Config;
use std::{collections::HashMap, env, fs};

mod fs_utils;
mod process;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pack a directory tree into a ZIP archive", long_about = None)]
pub struct Cli {
    /// Output archive path (can be defined via config/env)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Compression method [deflate|stored]
    #[arg(short, long)]
    pub format: Option<String>,

    /// Deflate level [fast|normal|maximum]
    #[arg(short, long)]
    pub level: Option<String>,

    /// Dry run (just list files and parameters)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Do not print archived entries
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub quiet: bool,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,

    /// Directory to archive
    #[arg()]
    pub source: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Step 1: Read environment
    let env_config = read_env(&env::vars().collect());

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = read_config_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let merged = Config::merge(env_config, file_config, cli_to_config(&cli));
    log::debug!("merged config: {merged:?}");

    // Generate YAML config if requested
    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(());
    }

    if let Some((code, message)) = missing_required(&merged) {
        eprintln!("Error: {message}");
        std::process::exit(code);
    }

    process::run(&merged)
}

/// Exit code and message for the first required setting that no layer
/// provided.
fn missing_required(config: &Config) -> Option<(i32, &'static str)> {
    if config.source.as_deref().unwrap_or("").is_empty() {
        return Some((
            2,
            "source directory (SOURCE argument, config:source or DIRPACK_SOURCE) is required",
        ));
    }
    if config.output.as_deref().unwrap_or("").is_empty() {
        return Some((
            3,
            "output path (--output, config:output or DIRPACK_OUTPUT) is required",
        ));
    }
    None
}

/// Reads environment variables prefixed with DIRPACK_
fn read_env(vars: &HashMap<String, String>) -> Config {
    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("DIRPACK_{}", $key)).cloned()
        };
    }

    Config {
        source: get_env!("SOURCE"),
        output: get_env!("OUTPUT"),
        config: get_env!("CONFIG"),
        format: get_env!("FORMAT"),
        level: get_env!("LEVEL"),
        dry: get_env!("DRY").map(|v| parse_flag(&v)),
        quiet: get_env!("QUIET").map(|v| parse_flag(&v)),
    }
}

fn parse_flag(v: &str) -> bool {
    v == "true" || v == "1" || v.eq_ignore_ascii_case("yes")
}

/// Reads YAML or JSON config from file
fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
    let lower = path.to_lowercase();
    let cfg = if lower.ends_with(".json") {
        serde_json::from_str(&content).with_context(|| format!("parsing JSON config {path}"))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("parsing YAML config {path}"))?
    };
    Ok(cfg)
}

/// Converts CLI struct into Config. Flags only count when set, so an
/// unset flag never overrides env or file.
fn cli_to_config(cli: &Cli) -> Config {
    Config {
        source: cli.source.clone(),
        output: cli.output.clone(),
        config: cli.config.clone(),
        format: cli.format.clone(),
        level: cli.level.clone(),
        dry: cli.dry.then_some(true),
        quiet: cli.quiet.then_some(true),
    }
}
