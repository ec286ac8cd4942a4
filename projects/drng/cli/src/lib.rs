pub mod args;
pub mod commands;

use std::fs::File;
use std::io::{self, BufReader, Write};

use args::{Cli, Command};
use commands::{make_rng, print_info, CommandError};

/// Run one command, writing results to `out` and provenance to `err`.
pub async fn run(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<(), CommandError> {
    match cli.command {
        Command::Version => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION")).map_err(CommandError::Output)
        }
        Command::Choice { variants } => {
            if variants.is_empty() {
                return Err(CommandError::Usage(
                    "Need at least one variant argument!".to_string(),
                ));
            }
            let (mut rng, info) = make_rng(&cli.options).await?;
            print_info(&info, err)?;
            commands::choice(&mut rng, variants, out)
        }
        Command::Sample { size, file } => {
            let read_error = match file {
                Some(path) => {
                    let input = BufReader::new(File::open(&path).map_err(CommandError::Input)?);
                    let (mut rng, info) = make_rng(&cli.options).await?;
                    print_info(&info, err)?;
                    commands::sample(&mut rng, size, input, out)?
                }
                None => {
                    let (mut rng, info) = make_rng(&cli.options).await?;
                    print_info(&info, err)?;
                    commands::sample(&mut rng, size, io::stdin().lock(), out)?
                }
            };
            if let Some(e) = read_error {
                writeln!(err, "read error: {}", e).map_err(CommandError::Output)?;
            }
            Ok(())
        }
        Command::Float => {
            let (mut rng, info) = make_rng(&cli.options).await?;
            print_info(&info, err)?;
            commands::float(&mut rng, out)
        }
        Command::Int { limit } => {
            if limit == 0 {
                return Err(CommandError::Usage("N can't be zero".to_string()));
            }
            let (mut rng, info) = make_rng(&cli.options).await?;
            print_info(&info, err)?;
            commands::int(&mut rng, limit, out)
        }
    }
}
