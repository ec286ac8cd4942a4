use std::io::{self, BufRead, Write};

use anyhow::Context;
use drng::{Defaults, DeterministicRng, DrngError, ResultInfo, SeedOverride};
use drng_reservoir::Reservoir;
use thiserror::Error;
use tracing::warn;

use crate::args::RngOptions;

/// Failure of a command, carrying the process exit code.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Bad arguments or conflicting options
    #[error("{0}")]
    Usage(String),

    /// The generator could not be initialized
    #[error("initialization failed: {0:#}")]
    Init(anyhow::Error),

    /// The input file could not be opened
    #[error("unable to open input file: {0}")]
    Input(io::Error),

    /// Writing results failed
    #[error("write error: {0}")]
    Output(io::Error),
}

impl CommandError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Init(_) => 1,
            CommandError::Usage(_) => 2,
            CommandError::Input(_) => 3,
            CommandError::Output(_) => 4,
        }
    }
}

impl From<DrngError> for CommandError {
    fn from(error: DrngError) -> Self {
        if error.is_config() {
            CommandError::Usage(error.to_string())
        } else {
            CommandError::Init(error.into())
        }
    }
}

/// Build the generator, either from an explicit seed or from the beacon.
pub async fn make_rng(
    options: &RngOptions,
) -> Result<(DeterministicRng, ResultInfo), CommandError> {
    let seed = SeedOverride::from_options(options.seed.as_deref(), options.hex_seed.as_deref())?;

    if let Some(seed) = seed {
        let hkdf_info = options
            .hkdf_info
            .as_ref()
            .map(|info| info.0.clone())
            .unwrap_or_else(|| Defaults::standard().hkdf_info);
        return drng::from_seed(seed.entropy(), &hkdf_info)
            .context("RNG init failed")
            .map_err(CommandError::Init);
    }

    match drng::new(&options.to_config()).await {
        Ok(result) => Ok(result),
        Err(e) if e.is_config() => Err(e.into()),
        Err(e) => Err(CommandError::Init(
            anyhow::Error::new(e).context("RNG init failed"),
        )),
    }
}

/// Print the seed provenance as `Key: value` lines.
pub fn print_info(info: &ResultInfo, err: &mut dyn Write) -> Result<(), CommandError> {
    for (key, value) in info.pairs() {
        writeln!(err, "{}: {}", key, value).map_err(CommandError::Output)?;
    }
    Ok(())
}

/// Pick one variant. Variants are sorted first so their order on the
/// command line does not matter.
pub fn choice(
    rng: &mut DeterministicRng,
    mut variants: Vec<String>,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    if variants.is_empty() {
        return Err(CommandError::Usage(
            "Need at least one variant argument!".to_string(),
        ));
    }
    variants.sort();
    let picked = rng.select(&variants)?;
    writeln!(out, "{}", picked).map_err(CommandError::Output)
}

/// Reservoir-sample `size` lines of `input` and write them to `out`.
///
/// A line is only copied out of the read buffer when it gets a slot.
///
/// A read error stops consumption but the lines collected so far are still
/// written; the error is returned alongside.
pub fn sample<R: BufRead>(
    rng: &mut DeterministicRng,
    size: usize,
    mut input: R,
    out: &mut dyn Write,
) -> Result<Option<io::Error>, CommandError> {
    let mut reservoir = Reservoir::new(size, rng);
    let mut line = Vec::new();
    let mut read_error = None;

    loop {
        line.clear();
        match input.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => reservoir.add_with(|| trim_line_ending(&line).to_vec()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, lines = reservoir.seen(), "input read failed");
                read_error = Some(e);
                break;
            }
        }
    }

    for item in reservoir.items() {
        out.write_all(item)
            .and_then(|_| out.write_all(b"\n"))
            .map_err(CommandError::Output)?;
    }
    Ok(read_error)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub fn float(rng: &mut DeterministicRng, out: &mut dyn Write) -> Result<(), CommandError> {
    writeln!(out, "{:.6}", rng.random_float()).map_err(CommandError::Output)
}

pub fn int(
    rng: &mut DeterministicRng,
    limit: u64,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let value = rng.random_below(limit)?;
    writeln!(out, "{}", value).map_err(CommandError::Output)
}
