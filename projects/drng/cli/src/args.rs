use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use drng::{Config, FetchPolicy};

/// drand mainnet chain hash
pub const MAINNET_CHAIN_HASH: &str =
    "8990e7a9aaed2ffed73dbd7092123d6f289930540d7651336225dc172e51b2ce";

#[derive(Debug, Parser)]
#[command(name = "drng")]
#[command(about = "Deterministic randomness seeded from the drand beacon", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: RngOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one of the given variants
    Choice {
        #[arg(required = true, num_args = 1.., value_name = "VARIANT")]
        variants: Vec<String>,
    },
    /// Print a uniform sample of SIZE lines read from FILE or stdin
    Sample {
        #[arg(value_name = "SIZE")]
        size: usize,
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Print a float in [0, 1)
    Float,
    /// Print an integer in [0, N)
    Int {
        #[arg(value_name = "N")]
        limit: u64,
    },
    /// Print the program version
    Version,
}

/// Options controlling where the seed comes from.
#[derive(Debug, Clone, Args)]
pub struct RngOptions {
    /// Network operation timeout, e.g. "10s", "1500ms" or "1m"
    #[arg(long, global = true, env = "DRNG_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// List of drand HTTP API URLs separated by space
    #[arg(
        long = "api-urls",
        global = true,
        env = "DRNG_API_URLS",
        default_value = "https://api.drand.sh https://drand.cloudflare.com",
        value_parser = parse_url_list
    )]
    pub api_urls: UrlList,

    /// Trust root of chain and reference to chain parameters
    #[arg(long = "chainhash", global = true, env = "DRNG_CHAINHASH", default_value = MAINNET_CHAIN_HASH, value_parser = parse_hex)]
    pub chain_hash: HexBytes,

    /// Use specific round number
    #[arg(long, global = true, env = "DRNG_ROUND", default_value_t = 0)]
    pub round: u64,

    /// Find round happened at TIME, in RFC 3339 format (e.g. "2006-01-02T15:04:05+07:00")
    #[arg(long = "round-at", global = true, env = "DRNG_ROUND_AT", value_name = "TIME", value_parser = parse_time)]
    pub round_at: Option<DateTime<Utc>>,

    /// Override seed by string
    #[arg(long, global = true, env = "DRNG_SEED")]
    pub seed: Option<String>,

    /// Override seed with byte array specified by hex-encoded string
    #[arg(long = "hex-seed", global = true, env = "DRNG_HEX_SEED")]
    pub hex_seed: Option<String>,

    /// Override default info BYTES (hex) supplied to HKDF function
    #[arg(long = "hkdf-info", global = true, env = "DRNG_HKDF_INFO", value_name = "BYTES", value_parser = parse_hex)]
    pub hkdf_info: Option<HexBytes>,

    /// Retry the randomness fetch on the next endpoint if the first one fails
    #[arg(long = "fetch-fallback", global = true, env = "DRNG_FETCH_FALLBACK")]
    pub fetch_fallback: bool,
}

/// Space separated list of URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlList(pub Vec<String>);

/// Hex-encoded byte string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl RngOptions {
    /// Beacon configuration described by these options.
    pub fn to_config(&self) -> Config {
        let mut config = Config::new()
            .with_round(self.round)
            .with_urls(self.api_urls.0.iter().cloned())
            .with_chain_hash(self.chain_hash.0.clone())
            .with_timeout(self.timeout);
        if let Some(at) = self.round_at {
            config = config.with_round_at(at);
        }
        if let Some(info) = &self.hkdf_info {
            config = config.with_hkdf_info(info.0.clone());
        }
        if self.fetch_fallback {
            config = config.with_fetch_policy(FetchPolicy::Fallback);
        }
        config
    }
}

fn parse_url_list(arg: &str) -> Result<UrlList, String> {
    Ok(UrlList(arg.split(' ').filter(|u| !u.is_empty()).map(str::to_string).collect()))
}

fn parse_hex(arg: &str) -> Result<HexBytes, String> {
    hex::decode(arg)
        .map(HexBytes)
        .map_err(|e| format!("invalid hex: {}", e))
}

fn parse_time(arg: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(arg)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 time: {}", e))
}

/// Parse a duration such as `10s`, `250ms`, `2m` or `1h`. Bare numbers are seconds.
pub fn parse_duration(arg: &str) -> Result<Duration, String> {
    let arg = arg.trim();
    let split = arg
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(arg.len());
    let (value, unit) = arg.split_at(split);
    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid duration: {:?}", arg))?;

    let scale = match unit {
        "ms" => 0.001,
        "" | "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        _ => return Err(format!("unknown duration unit {:?} in {:?}", unit, arg)),
    };
    Duration::try_from_secs_f64(value * scale).map_err(|e| format!("invalid duration: {}", e))
}
