//! Command-line front end for mxnorm
//!
//! - Normalize addresses given as arguments or one per line on stdin
//! - Show the (cached) MX records of domains
//! - List the known mailbox providers

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mxnorm::{NormalizeResult, Normalizer, NormalizerConfig, PROVIDERS};
use mxnorm_common::internal;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Normalize email addresses using the mailbox provider behind their MX records
#[derive(Parser, Debug)]
#[command(name = "mxnorm")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a RON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name server to query instead of the system resolver (repeatable)
    #[arg(long = "name-server", value_name = "IP[:PORT]")]
    name_servers: Vec<String>,

    /// Maximum number of domains kept in the MX cache
    #[arg(long)]
    cache_limit: Option<usize>,

    /// Do not cache failed MX lookups
    #[arg(long)]
    no_cache_failures: bool,

    /// Seconds a failed MX lookup stays cached
    #[arg(long, value_name = "SECS")]
    failure_ttl: Option<u64>,

    /// DNS query timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log level for stderr output (overrides `LOG_LEVEL`)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize addresses (reads stdin when none are given)
    Normalize {
        /// Addresses, optionally in `"Name" <address>` form
        addresses: Vec<String>,
    },
    /// Show MX records for domains
    Mx {
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// List known mailbox providers
    Providers,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct MxOutput<'a> {
    domain: &'a str,
    records: Vec<mxnorm::MxRecord>,
    /// Seconds until the cached answer expires.
    ttl_remaining: Option<u64>,
}

#[derive(Serialize)]
struct ProviderOutput {
    name: &'static str,
    rules: String,
    mx_domains: &'static [&'static str],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    mxnorm_common::logging::init(cli.log_level.as_deref());

    let config = build_config(&cli)?;

    match &cli.command {
        Commands::Normalize { addresses } => {
            let normalizer = Normalizer::new(&config)?;

            if addresses.is_empty() {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Some(line) = lines.next_line().await? {
                    let line = line.trim();
                    if !line.is_empty() {
                        print_result(cli.format, &normalizer.normalize(line).await)?;
                    }
                }
            } else {
                for address in addresses {
                    print_result(cli.format, &normalizer.normalize(address).await)?;
                }
            }

            let stats = normalizer.cache().stats();
            internal!(
                level = DEBUG,
                "Cache: {} hit(s), {} miss(es), {} eviction(s), {} domain(s)",
                stats.hits,
                stats.misses,
                stats.evictions,
                stats.size
            );
        }
        Commands::Mx { domains } => {
            let normalizer = Normalizer::new(&config)?;

            for domain in domains {
                let records = normalizer.mx_records(domain).await;
                let ttl_remaining = normalizer
                    .cache()
                    .entry(&domain.to_ascii_lowercase())
                    .map(|info| info.remaining().as_secs());

                match cli.format {
                    Format::Json => println!(
                        "{}",
                        serde_json::to_string(&MxOutput {
                            domain,
                            records,
                            ttl_remaining,
                        })?
                    ),
                    Format::Text if records.is_empty() => println!("{domain}\t-"),
                    Format::Text => {
                        let ttl = ttl_remaining
                            .map_or_else(|| "-".to_string(), |secs| format!("{secs}s"));
                        for record in records {
                            println!("{domain}\t{record}\t{ttl}");
                        }
                    }
                }
            }
        }
        Commands::Providers => {
            for provider in PROVIDERS {
                match cli.format {
                    Format::Json => println!(
                        "{}",
                        serde_json::to_string(&ProviderOutput {
                            name: provider.name,
                            rules: provider.rules.to_string(),
                            mx_domains: provider.mx_domains,
                        })?
                    ),
                    Format::Text => println!(
                        "{}\t{}\t{}",
                        provider.name,
                        provider.rules,
                        provider.mx_domains.join(",")
                    ),
                }
            }
        }
    }

    Ok(())
}

fn print_result(format: Format, result: &NormalizeResult) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(result)?),
        Format::Text => println!(
            "{}\t{}\t{}",
            result.address(),
            result.normalized_address(),
            result.mailbox_provider().unwrap_or("-")
        ),
    }
    Ok(())
}

/// Configuration file, then command-line overrides.
fn build_config(cli: &Cli) -> anyhow::Result<NormalizerConfig> {
    let mut config = match find_config_file(cli.config.as_ref())? {
        Some(path) => {
            internal!(level = DEBUG, "Loading configuration from {}", path.display());
            NormalizerConfig::load(&path).map_err(|e| {
                anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
            })?
        }
        None => NormalizerConfig::default(),
    };

    if !cli.name_servers.is_empty() {
        config.dns.name_servers = Some(cli.name_servers.clone());
    }
    if let Some(limit) = cli.cache_limit {
        config.dns.cache_limit = limit;
    }
    if cli.no_cache_failures {
        config.dns.cache_failures = false;
    }
    if let Some(ttl) = cli.failure_ttl {
        config.dns.failure_ttl = ttl;
    }
    if let Some(timeout) = cli.timeout {
        config.dns.timeout_secs = timeout;
    }

    Ok(config)
}

/// Find the configuration file using the following precedence:
/// 1. `--config`
/// 2. `MXNORM_CONFIG` environment variable
/// 3. ./mxnorm.config.ron (current working directory)
///
/// Returns `None` when nothing is configured, in which case defaults apply.
fn find_config_file(explicit: Option<&PathBuf>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.clone()));
        }
        anyhow::bail!("Config file does not exist: {}", path.display());
    }

    if let Ok(env_path) = std::env::var("MXNORM_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "MXNORM_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let local = PathBuf::from("./mxnorm.config.ron");
    Ok(local.exists().then_some(local))
}
