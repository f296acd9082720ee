//! mapper-fivetran - Singer inline mapper for Fivetran destinations
//!
//! Reads Singer messages from stdin (or `--input`), rewrites schemas and
//! records into the shape Fivetran destinations expect, and writes the
//! result to stdout. Logs go to stderr; set `RUST_LOG` to change verbosity.

use clap::{Parser, ValueEnum};
use fivetran_format::constants::MAPPER_NAME;
use fivetran_io::{
    execute_map, AboutFormat, AboutInfo, ConfigSource, InputSource, MapRequest, MapperConfig,
    OutputSink,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = MAPPER_NAME)]
#[command(about = "Singer inline mapper shaping streams for Fivetran destinations")]
#[command(version)]
struct Cli {
    /// Configuration JSON file, or ENV to read MAPPER_FIVETRAN_* variables.
    /// May be given more than once; later sources win.
    #[arg(long, value_name = "PATH|ENV")]
    config: Vec<ConfigSource>,
    /// Read messages from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,
    /// Print mapper metadata and exit
    #[arg(long)]
    about: bool,
    /// Format for --about
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

impl From<Format> for AboutFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => AboutFormat::Json,
            Format::Markdown => AboutFormat::Markdown,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if cli.about {
        println!("{}", AboutInfo::default().render(cli.format.into())?);
        return Ok(());
    }

    let config = MapperConfig::from_sources(&cli.config)?;
    let input = match cli.input {
        Some(path) => InputSource::Path(path),
        None => InputSource::Stdin,
    };

    let summary = execute_map(MapRequest {
        input,
        output: OutputSink::Stdout,
        config,
    })?;
    debug!(?summary, "done");
    Ok(())
}
