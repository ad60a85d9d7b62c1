//! Command line entry point.
//!
//! Loads settings from the environment (and `.env`), merges an optional
//! JSON config file and the flags, shows what will be scrubbed, asks for
//! confirmation and runs the scrub.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dialoguer::Confirm;

use wp_pii_scrub::config::{parse_custom_tables, parse_field_list, ScrubConfig, Settings};
use wp_pii_scrub::logging::init_logger;
use wp_pii_scrub::pipeline::{execute, prepare, RunContext, RunReport};
use wp_pii_scrub::security::masking::UrlPolicy;
use wp_pii_scrub::{MySqlStore, ScrubError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UrlMode {
    Always,
    NonEmpty,
}

impl From<UrlMode> for UrlPolicy {
    fn from(mode: UrlMode) -> Self {
        match mode {
            UrlMode::Always => UrlPolicy::Always,
            UrlMode::NonEmpty => UrlPolicy::NonEmpty,
        }
    }
}

#[derive(Parser)]
#[command(name = "wp-pii-scrub")]
#[command(about = "Scrub PII from a WordPress database copy")]
struct Cli {
    /// Extra usermeta keys, comma separated; `%` wildcards allowed
    #[arg(long)]
    userfields: Option<String>,

    /// Extra postmeta keys, comma separated; `%` wildcards allowed
    #[arg(long)]
    postfields: Option<String>,

    /// Custom tables as `table:col1,col2;other:col3`
    #[arg(long)]
    customtablefields: Option<String>,

    /// Contact-method usermeta keys registered by the site, comma separated
    #[arg(long)]
    contact_methods: Option<String>,

    /// Email domain whose identities are never scrubbed
    #[arg(long)]
    protected_domain: Option<String>,

    /// Table prefix (default from WP_TABLE_PREFIX, else `wp_`)
    #[arg(long)]
    prefix: Option<String>,

    #[arg(long, value_enum)]
    url_policy: Option<UrlMode>,

    /// Print the statements instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Allow running against a database marked live
    #[arg(long)]
    live: bool,

    /// JSON file with a run configuration; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Database URL (default from DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

fn main() -> ExitCode {
    // Read `.env` before the logger so RUST_LOG can live there too.
    let settings = Settings::from_env();
    init_logger();

    match run(Cli::parse(), settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<ScrubError>()
                .map(ScrubError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli, settings: Settings) -> Result<()> {
    let config = build_config(&cli, &settings)?;

    let database_url = cli
        .database_url
        .clone()
        .or(settings.database_url)
        .ok_or_else(|| ScrubError::Config("no database URL; set DATABASE_URL or pass --database-url".to_string()))?;

    let ctx = RunContext::new(&config);
    let mut store = MySqlStore::connect(&database_url)
        .map_err(ScrubError::from)
        .context("connecting to database")?;

    let plan = prepare(&mut store, &config, &ctx)?;
    if cli.format == OutputFormat::Text {
        for line in plan.summary_lines() {
            println!("{}", line);
        }
        println!();
    }

    let mut config = config;
    if !config.dry_run && !config.confirmed {
        config.confirmed = Confirm::new()
            .with_prompt("Are you sure you want to scrub all PII from the database?")
            .default(false)
            .interact()
            .context("reading confirmation")?;
    }

    let report = execute(&mut store, &config, &ctx, &plan)?;
    print_report(&report, cli.format)?;
    Ok(())
}

/// Merge config file, environment and flags, in rising precedence.
fn build_config(cli: &Cli, settings: &Settings) -> Result<ScrubConfig> {
    let mut config = match &cli.config {
        Some(path) => ScrubConfig::from_json_file(path)?,
        None => ScrubConfig::default(),
    };

    if let Some(prefix) = &settings.table_prefix {
        config.table_prefix = prefix.clone();
    }
    if let Some(domain) = &settings.protected_domain {
        config.protected_domain = Some(domain.clone());
    }
    config.environment_is_protected_target |= settings.live_environment;

    if let Some(raw) = &cli.userfields {
        config.extra_user_fields = parse_field_list(raw);
    }
    if let Some(raw) = &cli.postfields {
        config.extra_content_fields = parse_field_list(raw);
    }
    if let Some(raw) = &cli.customtablefields {
        config.custom_tables = parse_custom_tables(raw)?;
    }
    if let Some(raw) = &cli.contact_methods {
        config.contact_methods = parse_field_list(raw);
    }
    if let Some(domain) = &cli.protected_domain {
        config.protected_domain = Some(domain.clone());
    }
    if let Some(prefix) = &cli.prefix {
        config.table_prefix = prefix.clone();
    }
    if let Some(mode) = cli.url_policy {
        config.url_policy = mode.into();
    }
    config.dry_run |= cli.dry_run;
    config.confirmed |= cli.yes;
    config.allow_protected_target_override |= cli.live;

    Ok(config)
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(report).context("serializing report")?
        ),
    }
    Ok(())
}
